pub mod beats;
pub mod detectors;
pub mod error;
pub mod filter;
pub mod interpolate;
pub mod metrics;
pub mod pipeline;
pub mod signal;
pub mod waves;

pub use beats::*;
pub use detectors::{
    refine_peaks, segment_beats, OnUnknownStrategy, Segmenter, SegmenterKind,
};
pub use error::{CardioError, Result};
pub use filter::{filter_signal, FilterBand, FilterFamily};
pub use interpolate::{densify, CubicSpline};
pub use metrics::*;
pub use pipeline::{process, EcgAnalysis, ProcessConfig};
pub use signal::*;
pub use waves::{classify_phase, locate_waves};
