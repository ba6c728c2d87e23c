//! Cranelift-backed native compilation of optimized forest programs.
//!
//! [`JitEngine`] owns the JIT module (and thus the executable memory) and is
//! reusable for any number of linked programs over its lifetime. Lowering a
//! program produces a single exported entry routine per link;
//! [`EntryPoint`] wraps its resolved address behind the fixed native
//! calling convention.

mod codegen;
mod engine;
mod entry;

#[cfg(test)]
mod tests;

pub use engine::JitEngine;
pub use entry::{EntryPoint, ENTRY_SYMBOL};
