//! Parser for the LightGBM text model format.
//!
//! Only what the compiler needs is parsed: the header (objective, feature
//! count, class count) and the tree blocks. Trailing sections (feature
//! importances, parameters) are skipped.
//!
//! Notable encoding details:
//! - split condition is `value <= threshold` (left on equality);
//! - child entries in `left_child`/`right_child` are split indices when
//!   non-negative and encode leaf index `-(c) - 1` when negative;
//! - `decision_type` is a bitfield: bit 0 marks a categorical split
//!   (unsupported here), bit 1 means missing values default left.

use std::collections::HashMap;
use std::str::FromStr;

use forestjit_ir::{ForestIr, Node, Tree};

use crate::descriptor::ModelDescriptor;
use crate::error::ModelParseError;
use crate::objective::Objective;

const CATEGORICAL_MASK: u32 = 1;
const DEFAULT_LEFT_MASK: u32 = 2;

/// Parse the descriptor from the header section only.
pub fn parse_descriptor(text: &str) -> Result<ModelDescriptor, ModelParseError> {
    let header = parse_header(text);

    if let Some(num_class) = header.get("num_class") {
        let n: usize = parse_scalar(num_class, "num_class")?;
        if n != 1 {
            return Err(ModelParseError::Unsupported(format!(
                "multiclass models (num_class={n}) are not supported"
            )));
        }
    }

    let max_feature_idx: usize = parse_scalar(
        header
            .get("max_feature_idx")
            .ok_or(ModelParseError::MissingField("max_feature_idx"))?,
        "max_feature_idx",
    )?;
    let objective_name = header
        .get("objective")
        .ok_or(ModelParseError::MissingField("objective"))?
        .to_string();
    let objective = Objective::from_name(&objective_name)?;

    Ok(ModelDescriptor {
        num_features: max_feature_idx + 1,
        objective_name,
        objective,
    })
}

/// Parse the full model into the unoptimized program form.
pub fn parse_forest(text: &str) -> Result<ForestIr, ModelParseError> {
    let descriptor = parse_descriptor(text)?;
    let mut trees = Vec::new();

    let mut lines = text.lines();
    while let Some(line) = lines.next() {
        let line = line.trim();
        if line == "end of trees" {
            break;
        }
        let Some(index) = line.strip_prefix("Tree=") else {
            continue;
        };
        let index: usize = parse_scalar(index, "Tree")?;

        let mut fields: HashMap<&str, &str> = HashMap::new();
        for line in lines.by_ref() {
            let line = line.trim();
            if line.is_empty() {
                break;
            }
            if let Some((key, value)) = line.split_once('=') {
                fields.insert(key, value);
            }
        }
        trees.push(build_tree(index, &fields)?);
    }

    if trees.is_empty() {
        return Err(ModelParseError::Malformed(
            "model file contains no trees".to_string(),
        ));
    }

    Ok(ForestIr {
        num_features: descriptor.num_features as u32,
        base_score: 0.0,
        trees,
    })
}

/// Header = every `key=value` line before the first `Tree=` block.
fn parse_header(text: &str) -> HashMap<&str, &str> {
    let mut header = HashMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.starts_with("Tree=") {
            break;
        }
        if let Some((key, value)) = line.split_once('=') {
            header.insert(key, value);
        }
    }
    header
}

fn build_tree(index: usize, fields: &HashMap<&str, &str>) -> Result<Tree, ModelParseError> {
    let require = |field: &'static str| {
        fields
            .get(field)
            .copied()
            .ok_or(ModelParseError::MissingTreeField { tree: index, field })
    };

    if let Some(is_linear) = fields.get("is_linear") {
        if is_linear.trim() != "0" {
            return Err(ModelParseError::Unsupported(format!(
                "tree {index} uses linear leaves"
            )));
        }
    }

    let num_leaves: usize = parse_scalar(require("num_leaves")?, "num_leaves")?;
    let leaf_value: Vec<f64> = parse_array(require("leaf_value")?, "leaf_value")?;
    if leaf_value.len() != num_leaves {
        return Err(ModelParseError::Malformed(format!(
            "tree {index}: expected {num_leaves} leaf values, found {}",
            leaf_value.len()
        )));
    }

    // A one-leaf tree is a bare constant; there are no split arrays.
    if num_leaves == 1 {
        return Ok(Tree::leaf(leaf_value[0]));
    }

    let num_splits = num_leaves - 1;
    let split_feature: Vec<u32> = parse_array(require("split_feature")?, "split_feature")?;
    let threshold: Vec<f64> = parse_array(require("threshold")?, "threshold")?;
    let decision_type: Vec<u32> = parse_array(require("decision_type")?, "decision_type")?;
    let left_child: Vec<i64> = parse_array(require("left_child")?, "left_child")?;
    let right_child: Vec<i64> = parse_array(require("right_child")?, "right_child")?;

    for (field, len) in [
        ("split_feature", split_feature.len()),
        ("threshold", threshold.len()),
        ("decision_type", decision_type.len()),
        ("left_child", left_child.len()),
        ("right_child", right_child.len()),
    ] {
        if len != num_splits {
            return Err(ModelParseError::Malformed(format!(
                "tree {index}: expected {num_splits} entries in `{field}`, found {len}"
            )));
        }
    }

    let splits = Splits {
        tree: index,
        split_feature: &split_feature,
        threshold: &threshold,
        decision_type: &decision_type,
        left_child: &left_child,
        right_child: &right_child,
        leaf_value: &leaf_value,
    };

    // Pre-order emission: a parent's slot is claimed before its children
    // are emitted, so child indices always point forward.
    let mut nodes = Vec::with_capacity(2 * num_splits + 1);
    let mut visited = vec![false; num_splits];
    splits.emit(0, &mut nodes, &mut visited)?;
    Ok(Tree { nodes })
}

struct Splits<'a> {
    tree: usize,
    split_feature: &'a [u32],
    threshold: &'a [f64],
    decision_type: &'a [u32],
    left_child: &'a [i64],
    right_child: &'a [i64],
    leaf_value: &'a [f64],
}

impl Splits<'_> {
    fn emit(
        &self,
        node_ref: i64,
        out: &mut Vec<Node>,
        visited: &mut [bool],
    ) -> Result<u32, ModelParseError> {
        if node_ref < 0 {
            let leaf = (-node_ref - 1) as usize;
            let value = *self.leaf_value.get(leaf).ok_or_else(|| {
                ModelParseError::Malformed(format!(
                    "tree {}: leaf index {leaf} out of range",
                    self.tree
                ))
            })?;
            out.push(Node::Leaf { value });
            return Ok(out.len() as u32 - 1);
        }

        let split = node_ref as usize;
        if split >= self.split_feature.len() || visited[split] {
            return Err(ModelParseError::Malformed(format!(
                "tree {}: split index {split} is out of range or forms a cycle",
                self.tree
            )));
        }
        visited[split] = true;

        if self.decision_type[split] & CATEGORICAL_MASK != 0 {
            return Err(ModelParseError::Unsupported(format!(
                "tree {} uses categorical splits",
                self.tree
            )));
        }

        let slot = out.len();
        out.push(Node::Leaf { value: 0.0 }); // placeholder until children exist
        let left = self.emit(self.left_child[split], out, visited)?;
        let right = self.emit(self.right_child[split], out, visited)?;
        out[slot] = Node::Branch {
            feature: self.split_feature[split],
            threshold: self.threshold[split],
            default_left: self.decision_type[split] & DEFAULT_LEFT_MASK != 0,
            left,
            right,
        };
        Ok(slot as u32)
    }
}

fn parse_scalar<T: FromStr>(value: &str, field: &str) -> Result<T, ModelParseError> {
    value
        .trim()
        .parse()
        .map_err(|_| ModelParseError::Malformed(format!("cannot parse `{field}` value `{value}`")))
}

fn parse_array<T: FromStr>(value: &str, field: &str) -> Result<Vec<T>, ModelParseError> {
    value
        .split_whitespace()
        .map(|v| {
            v.parse().map_err(|_| {
                ModelParseError::Malformed(format!("cannot parse `{field}` entry `{v}`"))
            })
        })
        .collect()
}
