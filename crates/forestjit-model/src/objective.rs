//! Objective output transforms.
//!
//! Raw ensemble sums are link-space scores; the objective's inverse link
//! turns them into predictions. The transform is resolved from the model
//! header's objective name and applied elementwise after native execution.

use crate::error::ModelParseError;

/// Elementwise transform applied to raw ensemble outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Objective {
    /// Raw score passes through (regression objectives).
    Identity,
    /// `1 / (1 + e^-x)` (binary classification, cross-entropy).
    Sigmoid,
    /// `e^x` (count/positive regression: poisson, gamma, tweedie).
    Exp,
}

impl Objective {
    /// Resolve a transform from the header's objective identifier. Trailing
    /// parameters (e.g. `binary sigmoid:1`) are ignored; only the leading
    /// name selects the transform.
    pub fn from_name(name: &str) -> Result<Self, ModelParseError> {
        let head = name.split_whitespace().next().unwrap_or("");
        match head {
            "regression" | "regression_l2" | "l2" | "mean_squared_error" | "mse" | "l2_root"
            | "root_mean_squared_error" | "rmse" => Ok(Self::Identity),
            "regression_l1" | "l1" | "mean_absolute_error" | "mae" | "huber" | "fair"
            | "quantile" | "mape" => Ok(Self::Identity),
            "binary" | "cross_entropy" | "xentropy" => Ok(Self::Sigmoid),
            "poisson" | "gamma" | "tweedie" => Ok(Self::Exp),
            _ => Err(ModelParseError::UnknownObjective(name.to_string())),
        }
    }

    /// Apply the transform in place over a batch of raw outputs.
    pub fn transform(&self, out: &mut [f64]) {
        match self {
            Self::Identity => {}
            Self::Sigmoid => {
                for v in out.iter_mut() {
                    *v = 1.0 / (1.0 + (-*v).exp());
                }
            }
            Self::Exp => {
                for v in out.iter_mut() {
                    *v = v.exp();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_names_with_parameters() {
        assert_eq!(Objective::from_name("regression").unwrap(), Objective::Identity);
        assert_eq!(Objective::from_name("binary sigmoid:1").unwrap(), Objective::Sigmoid);
        assert_eq!(
            Objective::from_name("poisson max_delta_step:0.7").unwrap(),
            Objective::Exp
        );
    }

    #[test]
    fn rejects_unknown_objective() {
        assert!(matches!(
            Objective::from_name("lambdarank"),
            Err(ModelParseError::UnknownObjective(_))
        ));
    }

    #[test]
    fn sigmoid_maps_zero_to_half() {
        let mut out = [0.0, 2.0, -2.0];
        Objective::Sigmoid.transform(&mut out);
        assert!((out[0] - 0.5).abs() < 1e-12);
        assert!((out[1] - 1.0 / (1.0 + (-2.0f64).exp())).abs() < 1e-12);
        assert!((out[1] + out[2] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn identity_leaves_values_untouched() {
        let mut out = [1.5, -3.0];
        Objective::Identity.transform(&mut out);
        assert_eq!(out, [1.5, -3.0]);
    }
}
