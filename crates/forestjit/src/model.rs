//! The Model state machine: lazy, monotonic compile pipeline.

use std::path::{Path, PathBuf};

use forestjit_ir::{decode, encode, optimize, ForestIr, OptimizeConfig, OptimizedIr};
use forestjit_model::{FrontendAdapter, ModelDescriptor, TextModelFrontend};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::jit::{EntryPoint, JitEngine, ENTRY_SYMBOL};
use crate::predict;

/// A trained ensemble, compiled lazily to a native batch-prediction routine.
///
/// The pipeline runs `Fresh → FrontendBuilt → Optimized → Compiled`; each
/// stage's output is cached on this instance the first time it is produced
/// and reused afterwards, so [`Model::compile`] is idempotent and the
/// frontend and optimizer run at most once per Model. `Optimized` is also
/// reachable directly from `Fresh` through
/// [`Model::restore_optimized_ir`], which skips the frontend entirely.
///
/// All state transitions take `&mut self`; sharing a Model across threads
/// therefore requires an external lock, which also serializes first-time
/// compilation. The engine and entry point live exactly as long as the
/// Model; dropping it releases the executable memory with it.
pub struct Model {
    model_file: PathBuf,
    descriptor: ModelDescriptor,
    frontend: Box<dyn FrontendAdapter>,

    frontend_ir: Option<ForestIr>,
    optimized_ir: Option<OptimizedIr>,
    engine: Option<JitEngine>,
    entry: Option<EntryPoint>,
}

impl Model {
    /// Open a model file with the default text-format frontend. Only the
    /// descriptor is parsed here; everything else happens lazily.
    pub fn open(model_file: impl Into<PathBuf>) -> Result<Self> {
        Self::with_frontend(model_file, TextModelFrontend)
    }

    /// Open a model file with a caller-supplied frontend adapter.
    pub fn with_frontend(
        model_file: impl Into<PathBuf>,
        frontend: impl FrontendAdapter + 'static,
    ) -> Result<Self> {
        let model_file = model_file.into();
        let descriptor = ModelDescriptor::from_file(&model_file)?;
        debug!(
            model_file = %model_file.display(),
            num_features = descriptor.num_features,
            objective = %descriptor.objective_name,
            "opened model"
        );
        Ok(Self {
            model_file,
            descriptor,
            frontend: Box::new(frontend),
            frontend_ir: None,
            optimized_ir: None,
            engine: None,
            entry: None,
        })
    }

    pub fn descriptor(&self) -> &ModelDescriptor {
        &self.descriptor
    }

    /// The fixed feature dimension accepted by `predict`.
    pub fn num_feature(&self) -> usize {
        self.descriptor.num_features
    }

    /// Whether the native entry point has been built.
    pub fn is_compiled(&self) -> bool {
        self.entry.is_some()
    }

    /// The unoptimized program form, building it on first call.
    pub fn frontend_ir(&mut self) -> Result<&ForestIr> {
        if self.frontend_ir.is_none() {
            let ir = self.frontend.build_ir(&self.model_file)?;
            info!(trees = ir.trees.len(), "built frontend representation");
            self.frontend_ir = Some(ir);
        }
        Ok(self.frontend_ir.as_ref().expect("populated above"))
    }

    /// The optimized program form, running the optimizer on first call
    /// (unless a persisted form was restored earlier).
    pub fn optimized_ir(&mut self) -> Result<&OptimizedIr> {
        if self.optimized_ir.is_none() {
            let config = OptimizeConfig::for_target(JitEngine::host_triple()?);
            let objective = self.descriptor.objective_name.clone();
            let optimized = optimize(self.frontend_ir()?, &objective, &config)?;
            info!(target = %config.target, "optimized program");
            self.optimized_ir = Some(optimized);
        }
        Ok(self.optimized_ir.as_ref().expect("populated above"))
    }

    /// Restore a previously persisted optimized program, bypassing the
    /// frontend and optimizer.
    ///
    /// On failure the cached state is left exactly as it was. On success
    /// any previously cached optimized form is replaced (last-write-wins);
    /// this is the escape hatch for skipping recompilation cost. Note that
    /// a Model that has already compiled keeps its existing entry point.
    pub fn restore_optimized_ir(&mut self, source: &Path) -> Result<()> {
        let text = std::fs::read_to_string(source)?;
        let program = decode(&text)?;
        info!(source = %source.display(), "restored optimized representation");
        self.optimized_ir = Some(program);
        Ok(())
    }

    /// Serialize the optimized program form to `destination`.
    ///
    /// The persisted file captures the decision logic only; the objective
    /// transform is re-derived from the original model's descriptor on
    /// reload, so keep the artifact paired with the model file it came
    /// from.
    pub fn persist_optimized_ir(&mut self, destination: &Path) -> Result<()> {
        let text = encode(self.optimized_ir()?);
        std::fs::write(destination, text)?;
        info!(destination = %destination.display(), "persisted optimized representation");
        Ok(())
    }

    /// Compile the model to native code. Idempotent: this can be called any
    /// number of times but compiles at most once; every call after the
    /// first returns immediately.
    pub fn compile(&mut self) -> Result<()> {
        if self.entry.is_some() {
            return Ok(());
        }

        if self.engine.is_none() {
            self.engine = Some(JitEngine::new()?);
        }
        self.optimized_ir()?;

        // Disjoint field borrows: the program is read while the engine
        // links it.
        let program = self.optimized_ir.as_ref().expect("ensured above");
        let engine = self.engine.as_mut().expect("ensured above");
        engine.link_and_finalize(program)?;
        let addr = engine
            .resolve_symbol(ENTRY_SYMBOL)
            .ok_or_else(|| Error::SymbolResolution(ENTRY_SYMBOL.to_string()))?;
        self.entry = Some(EntryPoint::new(addr, self.descriptor.num_features));
        info!("compiled native entry point");
        Ok(())
    }

    /// Predict one output per input row.
    ///
    /// Each row must have exactly `num_feature()` values; otherwise
    /// [`Error::InvalidShape`] is returned before anything is compiled or
    /// invoked. Compiles on first use.
    pub fn predict<R: AsRef<[f64]>>(&mut self, rows: &[R]) -> Result<Vec<f64>> {
        let (input, n) = predict::flatten_rows(rows, self.descriptor.num_features)?;
        self.predict_buffer(&input, n)
    }

    /// Predict over a flat row-major buffer. The length must be a multiple
    /// of `num_feature()`.
    pub fn predict_row_major(&mut self, values: &[f64]) -> Result<Vec<f64>> {
        let n = predict::validate_row_major(values, self.descriptor.num_features)?;
        self.predict_buffer(values, n)
    }

    fn predict_buffer(&mut self, input: &[f64], rows: usize) -> Result<Vec<f64>> {
        self.compile()?;
        let mut output = vec![0.0; rows];
        if rows > 0 {
            let entry = self.entry.as_ref().expect("compile() sets the entry");
            entry.invoke(input, &mut output);
        }
        self.descriptor.objective.transform(&mut output);
        Ok(output)
    }
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("model_file", &self.model_file)
            .field("descriptor", &self.descriptor)
            .field("frontend_built", &self.frontend_ir.is_some())
            .field("optimized", &self.optimized_ir.is_some())
            .field("compiled", &self.entry.is_some())
            .finish_non_exhaustive()
    }
}
