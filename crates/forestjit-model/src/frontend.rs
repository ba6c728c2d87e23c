//! The frontend seam: model file in, unoptimized program out.

use std::path::Path;

use forestjit_ir::ForestIr;
use tracing::debug;

use crate::error::ModelParseError;
use crate::text::parse_forest;

/// Converts a model file into the unoptimized program representation.
///
/// The owning Model memoizes the result, so an adapter is invoked at most
/// once per Model instance. The trait exists so tests can substitute a
/// counting or failing adapter.
pub trait FrontendAdapter {
    fn build_ir(&self, model_file: &Path) -> Result<ForestIr, ModelParseError>;
}

/// Default adapter: parses the LightGBM text format.
#[derive(Debug, Default)]
pub struct TextModelFrontend;

impl FrontendAdapter for TextModelFrontend {
    fn build_ir(&self, model_file: &Path) -> Result<ForestIr, ModelParseError> {
        let text = std::fs::read_to_string(model_file)?;
        let ir = parse_forest(&text)?;
        debug!(
            trees = ir.trees.len(),
            num_features = ir.num_features,
            "built frontend representation"
        );
        Ok(ir)
    }
}
