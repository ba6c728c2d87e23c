//! Native compilation and batched prediction for decision-tree ensembles.
//!
//! A [`Model`] is opened from a serialized ensemble description and moves
//! lazily through a compile pipeline: the frontend builds an unoptimized
//! program, the optimizer specializes it to the host, and the Cranelift JIT
//! engine turns it into a native entry point that evaluates the whole
//! ensemble over a batch of rows. Every pipeline stage is cached on the
//! Model, so compilation happens at most once per instance no matter how
//! often it is requested.
//!
//! ```no_run
//! use forestjit::Model;
//!
//! # fn main() -> forestjit::Result<()> {
//! let mut model = Model::open("model.txt")?;
//! let predictions = model.predict(&[[1.0, 2.0, 3.0]])?;
//! assert_eq!(predictions.len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! The optimized program form can be persisted with
//! [`Model::persist_optimized_ir`] and restored on a fresh Model with
//! [`Model::restore_optimized_ir`] to skip the frontend and optimizer
//! entirely on later runs.

mod error;
pub mod jit;
mod model;
mod predict;

pub use error::{Error, Result};
pub use jit::{EntryPoint, JitEngine, ENTRY_SYMBOL};
pub use model::Model;

pub use forestjit_ir::{
    optimize, ForestIr, Node, OptimizeConfig, OptimizedIr, Segment, Tree, VerificationError,
};
pub use forestjit_model::{
    FrontendAdapter, ModelDescriptor, ModelParseError, Objective, TextModelFrontend,
};
