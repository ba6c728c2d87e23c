//! Error types for forestjit.

use thiserror::Error;

/// Main error type for forestjit operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Caller-supplied prediction input has the wrong shape. Recoverable by
    /// the caller; nothing was compiled or invoked.
    #[error("invalid input shape: {0}")]
    InvalidShape(String),

    /// The model file could not be parsed.
    #[error(transparent)]
    ModelParse(#[from] forestjit_model::ModelParseError),

    /// The frontend produced a structurally broken program. Fatal for this
    /// Model instance.
    #[error(transparent)]
    Verification(#[from] forestjit_ir::VerificationError),

    /// A persisted optimized-program blob could not be restored. Fatal for
    /// the restore call; the caller may fall back to full recompilation.
    #[error("cannot restore persisted program: {0}")]
    MalformedPersistedForm(#[from] forestjit_ir::PersistError),

    /// The compiled module lacks the expected entry symbol, which indicates
    /// an incompatible optimized program. Fatal.
    #[error("compiled module does not expose entry symbol `{0}`")]
    SymbolResolution(String),

    /// Native code generation failed. Fatal for this program; retrying with
    /// the same input cannot succeed.
    #[error("native code generation failed: {0}")]
    Codegen(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<cranelift_module::ModuleError> for Error {
    fn from(e: cranelift_module::ModuleError) -> Self {
        Error::Codegen(e.to_string())
    }
}

/// Result type alias for forestjit operations.
pub type Result<T> = std::result::Result<T, Error>;
