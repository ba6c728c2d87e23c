//! Structural well-formedness checks.
//!
//! Verification runs before optimization and again when a persisted program
//! is restored, so an ill-formed program can never reach the code generator.

use thiserror::Error;

use crate::program::{ForestIr, Node, Tree};

/// A program violated the representation's well-formedness rules.
///
/// This is fatal for the Model that produced it: the upstream frontend (or a
/// persisted artifact) handed over a structurally broken program, and
/// retrying with the same input cannot succeed.
#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("program has no trees")]
    EmptyProgram,

    #[error("tree {tree} has no nodes")]
    EmptyTree { tree: usize },

    #[error("tree {tree}, node {node}: child index {child} out of range (tree has {len} nodes)")]
    ChildOutOfRange {
        tree: usize,
        node: usize,
        child: u32,
        len: usize,
    },

    #[error("tree {tree}, node {node}: child index {child} does not point forward")]
    BackwardChild { tree: usize, node: usize, child: u32 },

    #[error("tree {tree}, node {node}: feature {feature} out of range ({num_features} features)")]
    FeatureOutOfRange {
        tree: usize,
        node: usize,
        feature: u32,
        num_features: u32,
    },

    #[error("tree {tree}, node {node}: non-finite constant {value}")]
    NonFiniteConstant { tree: usize, node: usize, value: f64 },
}

/// Verify an unoptimized program.
pub fn verify_forest(ir: &ForestIr) -> Result<(), VerificationError> {
    verify_trees(&ir.trees, ir.num_features)?;
    if !ir.base_score.is_finite() {
        return Err(VerificationError::NonFiniteConstant {
            tree: 0,
            node: 0,
            value: ir.base_score,
        });
    }
    Ok(())
}

/// Verify a tree list against a feature dimension. Child indices must point
/// strictly forward (which rules out cycles), features must be in range and
/// every threshold and leaf value must be finite. Unreachable nodes are
/// legal here; the optimizer prunes them.
pub fn verify_trees(trees: &[Tree], num_features: u32) -> Result<(), VerificationError> {
    if trees.is_empty() {
        return Err(VerificationError::EmptyProgram);
    }
    for (ti, t) in trees.iter().enumerate() {
        if t.nodes.is_empty() {
            return Err(VerificationError::EmptyTree { tree: ti });
        }
        let len = t.nodes.len();
        for (ni, node) in t.nodes.iter().enumerate() {
            match *node {
                Node::Leaf { value } => {
                    if !value.is_finite() {
                        return Err(VerificationError::NonFiniteConstant {
                            tree: ti,
                            node: ni,
                            value,
                        });
                    }
                }
                Node::Branch {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    if feature >= num_features {
                        return Err(VerificationError::FeatureOutOfRange {
                            tree: ti,
                            node: ni,
                            feature,
                            num_features,
                        });
                    }
                    if !threshold.is_finite() {
                        return Err(VerificationError::NonFiniteConstant {
                            tree: ti,
                            node: ni,
                            value: threshold,
                        });
                    }
                    for child in [left, right] {
                        if child as usize >= len {
                            return Err(VerificationError::ChildOutOfRange {
                                tree: ti,
                                node: ni,
                                child,
                                len,
                            });
                        }
                        if child as usize <= ni {
                            return Err(VerificationError::BackwardChild {
                                tree: ti,
                                node: ni,
                                child,
                            });
                        }
                    }
                }
            }
        }
    }
    Ok(())
}
