//! Data types for the two program forms.

use serde::{Deserialize, Serialize};

/// A single node in a decision tree.
///
/// Child indices point into the owning tree's node vector and are required
/// to point strictly forward (`left > self`, `right > self`), which makes
/// every well-formed tree acyclic by construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Node {
    /// An internal split: go left when `feature <= threshold`. A NaN feature
    /// value follows the default direction.
    Branch {
        feature: u32,
        threshold: f64,
        default_left: bool,
        left: u32,
        right: u32,
    },
    /// A terminal node contributing `value` to the ensemble sum.
    Leaf { value: f64 },
}

/// One decision tree, root at index 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    /// A single-leaf tree. Mostly useful in tests.
    pub fn leaf(value: f64) -> Self {
        Self {
            nodes: vec![Node::Leaf { value }],
        }
    }

    /// Reference interpreter for one row. The JIT output must agree with
    /// this for every well-formed tree.
    pub fn evaluate(&self, row: &[f64]) -> f64 {
        let mut idx = 0usize;
        loop {
            match self.nodes[idx] {
                Node::Leaf { value } => return value,
                Node::Branch {
                    feature,
                    threshold,
                    default_left,
                    left,
                    right,
                } => {
                    let x = row[feature as usize];
                    let go_left = if x.is_nan() { default_left } else { x <= threshold };
                    idx = if go_left { left as usize } else { right as usize };
                }
            }
        }
    }
}

/// The unoptimized program form: one evaluation routine per tree, summed
/// (together with `base_score`) by a conceptual root routine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestIr {
    pub num_features: u32,
    pub base_score: f64,
    pub trees: Vec<Tree>,
}

impl ForestIr {
    /// Reference interpreter for one row, including the base score.
    /// Accumulates left to right, matching the compiled code's add order.
    pub fn evaluate(&self, row: &[f64]) -> f64 {
        self.trees
            .iter()
            .fold(self.base_score, |acc, t| acc + t.evaluate(row))
    }
}

/// One tree after optimization. `inline` trees are flattened into the body
/// of the entry routine; the rest are emitted as separate local routines
/// called from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub tree: Tree,
    pub inline: bool,
}

/// The optimized, target-specialized program form.
///
/// Semantically equivalent to the [`ForestIr`] it was derived from, but with
/// unreachable nodes pruned, constant branches collapsed, inlining decided
/// per tree, and the host target triple stamped on. The `objective` field is
/// advisory only: restoring a persisted program never reconstructs the
/// objective transform from it (that always comes from the original model's
/// descriptor).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizedIr {
    pub target: String,
    pub objective: String,
    pub num_features: u32,
    pub base_score: f64,
    pub segments: Vec<Segment>,
}

impl OptimizedIr {
    /// Reference interpreter for one row, including the base score.
    /// Accumulates left to right, matching the compiled code's add order.
    pub fn evaluate(&self, row: &[f64]) -> f64 {
        self.segments
            .iter()
            .fold(self.base_score, |acc, s| acc + s.tree.evaluate(row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump(feature: u32, threshold: f64, left: f64, right: f64) -> Tree {
        Tree {
            nodes: vec![
                Node::Branch {
                    feature,
                    threshold,
                    default_left: true,
                    left: 1,
                    right: 2,
                },
                Node::Leaf { value: left },
                Node::Leaf { value: right },
            ],
        }
    }

    #[test]
    fn evaluate_follows_split_direction() {
        let t = stump(0, 0.5, 1.0, 2.0);
        assert_eq!(t.evaluate(&[0.25]), 1.0);
        assert_eq!(t.evaluate(&[0.5]), 1.0); // boundary goes left
        assert_eq!(t.evaluate(&[0.75]), 2.0);
    }

    #[test]
    fn evaluate_routes_nan_to_default() {
        let t = stump(0, 0.5, 1.0, 2.0);
        assert_eq!(t.evaluate(&[f64::NAN]), 1.0);

        let mut t = stump(0, 0.5, 1.0, 2.0);
        if let Node::Branch { default_left, .. } = &mut t.nodes[0] {
            *default_left = false;
        }
        assert_eq!(t.evaluate(&[f64::NAN]), 2.0);
    }

    #[test]
    fn forest_sums_trees_and_base_score() {
        let ir = ForestIr {
            num_features: 1,
            base_score: 0.5,
            trees: vec![Tree::leaf(1.0), stump(0, 0.0, -1.0, 1.0)],
        };
        assert_eq!(ir.evaluate(&[1.0]), 0.5 + 1.0 + 1.0);
        assert_eq!(ir.evaluate(&[-1.0]), 0.5 + 1.0 - 1.0);
    }
}
