//! Textual persistence of the optimized program form.
//!
//! The on-disk grammar is versioned JSON. A persisted program captures the
//! decision logic only: restoring it does not reconstruct the objective
//! transform, which the owning Model re-derives from its descriptor.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::program::OptimizedIr;
use crate::verify::{verify_trees, VerificationError};

/// Version stamp written into every persisted program.
pub const FORMAT_VERSION: u32 = 1;

/// A persisted optimized-program blob could not be decoded.
///
/// Fatal for the restore call; the caller can fall back to recompiling from
/// the original model file.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("persisted program is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unsupported persisted-format version {found} (this build reads version {expected})")]
    VersionMismatch { found: u32, expected: u32 },

    #[error("persisted program is structurally malformed: {0}")]
    Malformed(#[from] VerificationError),
}

#[derive(Serialize, Deserialize)]
struct PersistedProgram {
    version: u32,
    program: OptimizedIr,
}

/// Serialize an optimized program to its textual grammar.
pub fn encode(program: &OptimizedIr) -> String {
    let wrapper = PersistedProgram {
        version: FORMAT_VERSION,
        program: program.clone(),
    };
    // OptimizedIr contains only maps, sequences and numbers; serialization
    // cannot fail.
    serde_json::to_string_pretty(&wrapper).expect("optimized program serializes to JSON")
}

/// Parse a persisted blob back into an optimized program.
///
/// The parsed program is re-verified before it is handed back, so a
/// syntactically valid but structurally broken blob is rejected here rather
/// than reaching the code generator.
pub fn decode(text: &str) -> Result<OptimizedIr, PersistError> {
    let wrapper: PersistedProgram = serde_json::from_str(text)?;
    if wrapper.version != FORMAT_VERSION {
        return Err(PersistError::VersionMismatch {
            found: wrapper.version,
            expected: FORMAT_VERSION,
        });
    }
    let program = wrapper.program;
    let trees: Vec<_> = program.segments.iter().map(|s| s.tree.clone()).collect();
    verify_trees(&trees, program.num_features)?;
    Ok(program)
}
