//! Summary metrics computed from beat-to-beat interval series.

pub mod hrv;

pub use hrv::{hrv_time, HRVTime};
