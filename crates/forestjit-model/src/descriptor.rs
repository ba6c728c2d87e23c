//! Immutable model metadata.

use std::path::Path;

use crate::error::ModelParseError;
use crate::objective::Objective;
use crate::text::parse_descriptor;

/// Metadata parsed once from the model-file header. Never mutated for the
/// lifetime of the owning Model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDescriptor {
    /// Fixed feature dimension; bounds the feature count accepted at
    /// prediction time.
    pub num_features: usize,
    /// The raw objective identifier from the header, e.g. `binary sigmoid:1`.
    pub objective_name: String,
    /// The output transform resolved from `objective_name`.
    pub objective: Objective,
}

impl ModelDescriptor {
    /// Parse the descriptor from a model file, reading the header only.
    pub fn from_file(path: &Path) -> Result<Self, ModelParseError> {
        let text = std::fs::read_to_string(path)?;
        parse_descriptor(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_model_text;
    use std::io::Write;

    #[test]
    fn descriptor_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(sample_model_text().as_bytes()).unwrap();
        let descriptor = ModelDescriptor::from_file(file.path()).unwrap();
        assert_eq!(descriptor.num_features, 3);
        assert_eq!(descriptor.objective_name, "regression");
        assert_eq!(descriptor.objective, Objective::Identity);
    }
}
