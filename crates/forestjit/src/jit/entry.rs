//! The native ABI boundary.

/// Well-known name of the batch evaluation routine in every compiled
/// program.
pub const ENTRY_SYMBOL: &str = "forest_root";

/// The fixed native calling convention of the entry routine. The callee
/// reads exactly `count * num_features` doubles from `input` (row-major,
/// row `i` at `input[i * num_features ..]`) and writes exactly `count`
/// doubles to `output`. No return value.
type EntryFn = unsafe extern "C" fn(input: *const f64, count: i32, output: *mut f64);

/// A resolved machine address bound to the fixed entry signature.
///
/// This is the safety-critical seam of the whole system: a buffer-sizing
/// mismatch at the native boundary is undefined behavior, not a recoverable
/// error, so [`EntryPoint::invoke`] checks the contract on the managed side
/// before crossing it.
///
/// The pointer stays valid for the lifetime of the engine that produced it;
/// the owning Model keeps both alive together.
pub struct EntryPoint {
    ptr: *const u8,
    num_features: usize,
}

// SAFETY: the compiled routine is pure numeric code over its argument
// buffers, with no internal mutable state; codegen emits only loads of
// `input`, arithmetic, and stores to `output`.
unsafe impl Send for EntryPoint {}
unsafe impl Sync for EntryPoint {}

impl EntryPoint {
    pub(crate) fn new(ptr: *const u8, num_features: usize) -> Self {
        Self { ptr, num_features }
    }

    /// Invoke the compiled routine over a batch.
    ///
    /// `input` must hold `output.len() * num_features` values, row-major.
    ///
    /// # Panics
    ///
    /// Panics if the buffer sizes do not satisfy the native contract or the
    /// row count exceeds `i32::MAX`.
    pub fn invoke(&self, input: &[f64], output: &mut [f64]) {
        let rows = output.len();
        assert_eq!(
            input.len(),
            rows * self.num_features,
            "input buffer must hold rows * num_features values"
        );
        assert!(i32::try_from(rows).is_ok(), "batch too large for i32 count");

        let f: EntryFn = unsafe { std::mem::transmute(self.ptr) };
        // SAFETY: buffer sizes were checked against the fixed ABI contract
        // above; the routine reads input and writes output, nothing else.
        unsafe { f(input.as_ptr(), rows as i32, output.as_mut_ptr()) }
    }
}

impl std::fmt::Debug for EntryPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryPoint")
            .field("num_features", &self.num_features)
            .finish_non_exhaustive()
    }
}
