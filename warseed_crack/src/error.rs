// Error taxonomy for the cracker.
//
// Every variant is a local input-validation failure raised before any search
// starts. None of them are transient and none are retried. An infeasible
// search is not an error: it shows up as a bounded partial `ScanReport`.

use warseed_lcg::LcgError;

#[derive(Debug, thiserror::Error)]
pub enum CrackError {
    /// A draw width outside `min..=max`.
    #[error("bit width {bits} outside supported range {min}..={max}")]
    InvalidBitWidth { bits: u32, min: u32, max: u32 },
    /// A bound that is zero or not a power of two.
    #[error("bound {bound} is not a power of two; convert it before cracking")]
    UnsupportedBound { bound: u64 },
    /// A negative distance between two observations.
    #[error("step count {steps} is negative")]
    InvalidStepCount { steps: i64 },
    /// An observed value that does not fit in its declared width.
    #[error("observed value {value} does not fit in {bits} bits")]
    ValueOutOfRange { value: u64, bits: u32 },
    /// A draw index past the end of an observation sequence.
    #[error("draw index {index} out of range for a sequence of {len} draws")]
    SequenceIndex { index: usize, len: usize },
    /// A draw that was expected to carry an observed value but does not.
    #[error("draw {index} has no observed value")]
    UnobservedDraw { index: usize },
    /// Observations must be given in sequence order.
    #[error("draw {second} does not come after draw {first}")]
    OutOfOrder { first: usize, second: usize },
    /// A configuration value that parsed but makes no sense.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The rayon pool for a parallel scan could not be created.
    #[error("could not build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    /// Malformed JSON in a config file, or a value that failed to encode.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// A config file that could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LcgError> for CrackError {
    fn from(e: LcgError) -> Self {
        match e {
            LcgError::InvalidBitWidth { bits, min, max } => {
                Self::InvalidBitWidth { bits, min, max }
            }
            LcgError::UnsupportedBound { bound } => Self::UnsupportedBound { bound },
        }
    }
}
