use thiserror::Error;

/// Errors produced by the waveform feature-extraction pipeline.
///
/// Only malformed configuration (`InvalidFilterSpec`, `UnknownStrategy`
/// under a `Fail` policy) propagates as a hard failure. `EmptyWindow` is
/// internal: a single unlocatable wave or cycle is skipped and processing
/// of the remaining items continues.
#[derive(Debug, Error)]
pub enum CardioError {
    /// Malformed band/frequency combination handed to the filter stage.
    #[error("invalid filter spec: {0}")]
    InvalidFilterSpec(String),

    /// Unsupported segmenter tag with no fallback allowed.
    #[error("unknown segmenter strategy `{0}`")]
    UnknownStrategy(String),

    /// Too few discrete points for a cubic spline fit.
    #[error("insufficient data: need at least {needed} points, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// A search sub-window contained no samples.
    #[error("empty search window")]
    EmptyWindow,
}

pub type Result<T> = std::result::Result<T, CardioError>;
