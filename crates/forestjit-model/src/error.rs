//! Error type for model-file parsing.

use thiserror::Error;

/// The model file could not be parsed.
#[derive(Debug, Error)]
pub enum ModelParseError {
    #[error("failed to read model file: {0}")]
    Io(#[from] std::io::Error),

    #[error("model header is missing required field `{0}`")]
    MissingField(&'static str),

    #[error("tree {tree} is missing required field `{field}`")]
    MissingTreeField { tree: usize, field: &'static str },

    #[error("malformed model file: {0}")]
    Malformed(String),

    #[error("unknown objective `{0}`")]
    UnknownObjective(String),

    #[error("unsupported model: {0}")]
    Unsupported(String),
}
