//! The JIT engine: host-target detection, code generation, symbol resolution.

use std::collections::HashMap;

use cranelift_codegen::ir::types::I64;
use cranelift_codegen::settings::{self, Configurable};
use cranelift_jit::{JITBuilder, JITModule};
use cranelift_module::{FuncId, Module};
use forestjit_ir::OptimizedIr;
use tracing::debug;

use crate::error::{Error, Result};
use crate::jit::codegen;

/// A reusable JIT compilation engine bound to the host CPU.
///
/// The engine owns the executable memory backing every program it has
/// linked; resolved entry addresses stay valid for as long as the engine
/// (in practice: the owning Model) is alive. Linking a second program does
/// not invalidate the first, but [`JitEngine::resolve_symbol`] always
/// answers for the most recently linked one.
pub struct JitEngine {
    module: JITModule,
    symbols: HashMap<String, FuncId>,
    generation: u32,
    finalized: bool,
}

impl JitEngine {
    /// Create an engine for JIT code generation on the host CPU.
    ///
    /// Fails if the host ISA is unsupported by the native code generator.
    pub fn new() -> Result<Self> {
        let mut flag_builder = settings::builder();
        flag_builder
            .set("use_colocated_libcalls", "false")
            .map_err(|e| Error::Codegen(e.to_string()))?;
        flag_builder
            .set("is_pic", "false")
            .map_err(|e| Error::Codegen(e.to_string()))?;
        flag_builder
            .set("opt_level", "speed")
            .map_err(|e| Error::Codegen(e.to_string()))?;
        let isa_builder =
            cranelift_native::builder().map_err(|e| Error::Codegen(e.to_string()))?;
        let isa = isa_builder
            .finish(settings::Flags::new(flag_builder))
            .map_err(|e| Error::Codegen(e.to_string()))?;

        let module = JITModule::new(JITBuilder::with_isa(
            isa,
            cranelift_module::default_libcall_names(),
        ));
        if module.target_config().pointer_type() != I64 {
            return Err(Error::Codegen(
                "only 64-bit hosts are supported".to_string(),
            ));
        }
        debug!(triple = %module.isa().triple(), "created JIT engine");

        Ok(Self {
            module,
            symbols: HashMap::new(),
            generation: 0,
            finalized: false,
        })
    }

    /// The target triple of the host this process runs on.
    pub fn host_triple() -> Result<String> {
        let isa_builder =
            cranelift_native::builder().map_err(|e| Error::Codegen(e.to_string()))?;
        Ok(isa_builder.triple().to_string())
    }

    /// Generate native code for `program`, allocate executable memory and
    /// run target-required finalization.
    ///
    /// Failure is fatal for this program: retrying with the same input
    /// cannot succeed.
    pub fn link_and_finalize(&mut self, program: &OptimizedIr) -> Result<()> {
        let symbols = codegen::define_program(&mut self.module, program, self.generation)?;
        self.module.finalize_definitions()?;
        self.generation += 1;
        self.finalized = true;
        debug!(
            generation = self.generation,
            segments = program.segments.len(),
            "linked and finalized program"
        );
        self.symbols = symbols;
        Ok(())
    }

    /// Machine address of a named entry point in the most recently linked
    /// program, or `None` if the symbol is absent.
    pub fn resolve_symbol(&self, name: &str) -> Option<*const u8> {
        if !self.finalized {
            return None;
        }
        self.symbols
            .get(name)
            .map(|id| self.module.get_finalized_function(*id))
    }
}

impl std::fmt::Debug for JitEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JitEngine")
            .field("generation", &self.generation)
            .field("finalized", &self.finalized)
            .finish_non_exhaustive()
    }
}
