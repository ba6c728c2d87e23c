//! Model-file handling for forestjit.
//!
//! This crate owns everything that reads the serialized ensemble: descriptor
//! extraction from the text-format header, the tree parser that translates
//! the model into the unoptimized program form, and the objective table that
//! maps the header's objective name to an elementwise output transform.
//!
//! # Format Overview
//!
//! The supported model format is LightGBM's text format, which has three
//! sections:
//! 1. **Header**: `key=value` metadata (objective, feature count, class count)
//! 2. **Trees**: one `Tree=N` block per tree (splits, children, leaf values)
//! 3. **Footer**: feature importances and parameters, skipped during parsing

mod descriptor;
mod error;
mod frontend;
mod objective;
mod text;

pub mod testing;

pub use descriptor::ModelDescriptor;
pub use error::ModelParseError;
pub use frontend::{FrontendAdapter, TextModelFrontend};
pub use objective::Objective;
pub use text::{parse_descriptor, parse_forest};
