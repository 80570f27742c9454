// Errors for the LCG engine.
//
// Both variants are caller misuse, detected before the state is touched. A
// failed call never advances the generator.

/// Invalid argument to a draw operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LcgError {
    /// Requested bit width is outside what the operation supports.
    #[error("bit width {bits} outside supported range {min}..={max}")]
    InvalidBitWidth {
        /// The width that was requested.
        bits: u32,
        /// Smallest accepted width.
        min: u32,
        /// Largest accepted width.
        max: u32,
    },
    /// Bound is zero or not a power of two.
    #[error("bound {bound} is not a power of two")]
    UnsupportedBound {
        /// The rejected bound.
        bound: u64,
    },
}
