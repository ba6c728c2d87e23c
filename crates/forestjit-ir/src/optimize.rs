//! The fixed optimization pipeline.
//!
//! The pipeline configuration never varies at runtime: the programs we
//! compile are always the same shape (many small, similar branching
//! routines), so the pass order and the inlining threshold are constants
//! tuned for that shape. Same input plus this fixed configuration yields a
//! semantically equivalent output; byte-identical output across host targets
//! is not promised.

use crate::program::{ForestIr, Node, OptimizedIr, Segment, Tree};
use crate::verify::{verify_forest, VerificationError};

/// Trees with at most this many nodes are flattened into the entry routine.
/// Per-tree evaluation routines are tiny and benefit from being inlined into
/// the top-level batch loop; only unusually deep trees stay out-of-line.
pub const DEFAULT_INLINE_THRESHOLD: usize = 30;

/// Optimizer configuration. Fixed apart from the target triple, which is a
/// property of the host, not a tuning knob.
#[derive(Debug, Clone)]
pub struct OptimizeConfig {
    pub inline_threshold: usize,
    pub target: String,
}

impl OptimizeConfig {
    pub fn for_target(target: impl Into<String>) -> Self {
        Self {
            inline_threshold: DEFAULT_INLINE_THRESHOLD,
            target: target.into(),
        }
    }
}

/// Run the fixed pass pipeline over an unoptimized program.
///
/// Passes, in order: verification (fail fast), unreachable-node pruning,
/// constant-branch collapsing, per-tree inlining selection, host-target
/// stamping. `objective` is recorded on the artifact for diagnostics only.
pub fn optimize(
    ir: &ForestIr,
    objective: &str,
    config: &OptimizeConfig,
) -> Result<OptimizedIr, VerificationError> {
    verify_forest(ir)?;

    let segments = ir
        .trees
        .iter()
        .map(|t| {
            let tree = collapse_constant_branches(&prune_unreachable(t));
            let inline = tree.nodes.len() <= config.inline_threshold;
            Segment { tree, inline }
        })
        .collect();

    Ok(OptimizedIr {
        target: config.target.clone(),
        objective: objective.to_string(),
        num_features: ir.num_features,
        base_score: ir.base_score,
        segments,
    })
}

/// Drop nodes not reachable from the root, remapping child indices. Node
/// order is preserved, so the forward-only child invariant survives.
fn prune_unreachable(tree: &Tree) -> Tree {
    let len = tree.nodes.len();
    let mut reachable = vec![false; len];
    let mut stack = vec![0usize];
    while let Some(idx) = stack.pop() {
        if reachable[idx] {
            continue;
        }
        reachable[idx] = true;
        if let Node::Branch { left, right, .. } = tree.nodes[idx] {
            stack.push(left as usize);
            stack.push(right as usize);
        }
    }

    if reachable.iter().all(|&r| r) {
        return tree.clone();
    }

    let mut remap = vec![u32::MAX; len];
    let mut next = 0u32;
    for (idx, &r) in reachable.iter().enumerate() {
        if r {
            remap[idx] = next;
            next += 1;
        }
    }

    let nodes = tree
        .nodes
        .iter()
        .enumerate()
        .filter(|(idx, _)| reachable[*idx])
        .map(|(_, node)| match *node {
            Node::Leaf { value } => Node::Leaf { value },
            Node::Branch {
                feature,
                threshold,
                default_left,
                left,
                right,
            } => Node::Branch {
                feature,
                threshold,
                default_left,
                left: remap[left as usize],
                right: remap[right as usize],
            },
        })
        .collect();
    Tree { nodes }
}

/// Replace branches whose two children are leaves with the same value by a
/// single leaf. Scanning in reverse index order cascades the collapse up the
/// tree in one pass (children always sit at higher indices than parents).
fn collapse_constant_branches(tree: &Tree) -> Tree {
    let mut nodes = tree.nodes.clone();
    for idx in (0..nodes.len()).rev() {
        if let Node::Branch { left, right, .. } = nodes[idx] {
            let lv = match nodes[left as usize] {
                Node::Leaf { value } => Some(value),
                _ => None,
            };
            let rv = match nodes[right as usize] {
                Node::Leaf { value } => Some(value),
                _ => None,
            };
            if let (Some(lv), Some(rv)) = (lv, rv) {
                if lv == rv {
                    nodes[idx] = Node::Leaf { value: lv };
                }
            }
        }
    }
    // Collapsing orphans former children; prune them away.
    prune_unreachable(&Tree { nodes })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> OptimizeConfig {
        OptimizeConfig::for_target("x86_64-test")
    }

    fn branch(feature: u32, threshold: f64, left: u32, right: u32) -> Node {
        Node::Branch {
            feature,
            threshold,
            default_left: true,
            left,
            right,
        }
    }

    #[test]
    fn optimize_preserves_semantics() {
        let ir = ForestIr {
            num_features: 2,
            base_score: 0.25,
            trees: vec![
                Tree {
                    nodes: vec![
                        branch(0, 1.0, 1, 2),
                        Node::Leaf { value: -1.0 },
                        branch(1, 2.0, 3, 4),
                        Node::Leaf { value: 0.5 },
                        Node::Leaf { value: 1.5 },
                    ],
                },
                Tree::leaf(2.0),
            ],
        };
        let opt = optimize(&ir, "regression", &config()).unwrap();
        for row in [[0.0, 0.0], [2.0, 1.0], [2.0, 3.0], [f64::NAN, 5.0]] {
            assert_eq!(opt.evaluate(&row), ir.evaluate(&row));
        }
        assert_eq!(opt.target, "x86_64-test");
        assert_eq!(opt.objective, "regression");
    }

    #[test]
    fn prunes_unreachable_nodes() {
        // Node 3 is never referenced.
        let ir = ForestIr {
            num_features: 1,
            base_score: 0.0,
            trees: vec![Tree {
                nodes: vec![
                    branch(0, 0.0, 1, 2),
                    Node::Leaf { value: 1.0 },
                    Node::Leaf { value: 2.0 },
                    Node::Leaf { value: 99.0 },
                ],
            }],
        };
        let opt = optimize(&ir, "regression", &config()).unwrap();
        assert_eq!(opt.segments[0].tree.nodes.len(), 3);
        assert_eq!(opt.evaluate(&[-1.0]), 1.0);
        assert_eq!(opt.evaluate(&[1.0]), 2.0);
    }

    #[test]
    fn collapses_constant_branches_recursively() {
        // Both leaves of the inner branch agree, and after collapsing, both
        // children of the root agree too; the whole tree becomes one leaf.
        let ir = ForestIr {
            num_features: 1,
            base_score: 0.0,
            trees: vec![Tree {
                nodes: vec![
                    branch(0, 0.0, 1, 2),
                    Node::Leaf { value: 7.0 },
                    branch(0, 5.0, 3, 4),
                    Node::Leaf { value: 7.0 },
                    Node::Leaf { value: 7.0 },
                ],
            }],
        };
        let opt = optimize(&ir, "regression", &config()).unwrap();
        assert_eq!(opt.segments[0].tree.nodes, vec![Node::Leaf { value: 7.0 }]);
    }

    #[test]
    fn inlining_respects_threshold() {
        let big = Tree {
            nodes: (0..16)
                .map(|i| branch(0, i as f64, 2 * i as u32 + 1, 2 * i as u32 + 2))
                .chain((0..17).map(|i| Node::Leaf { value: i as f64 }))
                .collect(),
        };
        let ir = ForestIr {
            num_features: 1,
            base_score: 0.0,
            trees: vec![Tree::leaf(1.0), big],
        };
        let mut cfg = config();
        cfg.inline_threshold = 10;
        let opt = optimize(&ir, "regression", &cfg).unwrap();
        assert!(opt.segments[0].inline);
        assert!(!opt.segments[1].inline);
    }

    #[test]
    fn rejects_malformed_input() {
        let ir = ForestIr {
            num_features: 1,
            base_score: 0.0,
            trees: vec![],
        };
        assert!(optimize(&ir, "regression", &config()).is_err());
    }
}
