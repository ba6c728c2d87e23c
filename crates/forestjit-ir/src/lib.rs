//! Program representations for forestjit.
//!
//! A trained ensemble passes through two forms on its way to native code:
//! the unoptimized [`ForestIr`] produced by the model frontend, and the
//! [`OptimizedIr`] produced by the fixed optimizer pipeline. The optimized
//! form is what the JIT engine lowers to machine code, and it is the only
//! form that can be persisted to disk and restored to skip recompilation.

mod optimize;
mod persist;
mod program;
mod verify;

pub use optimize::{optimize, OptimizeConfig, DEFAULT_INLINE_THRESHOLD};
pub use persist::{decode, encode, PersistError, FORMAT_VERSION};
pub use program::{ForestIr, Node, OptimizedIr, Segment, Tree};
pub use verify::{verify_forest, verify_trees, VerificationError};
