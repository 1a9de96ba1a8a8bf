use serde::{Deserialize, Serialize};

/// Basic typed time series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    /// Uniform sampling frequency in Hz
    pub fs: f64,
    /// Samples
    pub data: Vec<f64>,
}

impl Signal {
    pub fn new(fs: f64, data: Vec<f64>) -> Self {
        Self { fs, data }
    }
    pub fn len(&self) -> usize {
        self.data.len()
    }
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
    pub fn duration(&self) -> f64 {
        self.data.len() as f64 / self.fs
    }
}

/// Point events on a timeline (e.g., R-peak indices), strictly ascending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Events {
    pub indices: Vec<usize>,
}

impl Events {
    pub fn from_indices(indices: Vec<usize>) -> Self {
        Self { indices }
    }
    pub fn len(&self) -> usize {
        self.indices.len()
    }
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// RR intervals (seconds)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RRSeries {
    pub rr: Vec<f64>,
}

impl RRSeries {
    pub fn from_events(events: &Events, fs: f64) -> Self {
        let mut rr = Vec::new();
        for w in events.indices.windows(2) {
            let dt = (w[1] as f64 - w[0] as f64) / fs;
            rr.push(dt);
        }
        Self { rr }
    }
}

/// One fixed-width heartbeat window around an R-peak.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cycle {
    /// Anchoring R-peak, in samples of the source signal.
    pub rpeak: usize,
    /// Index of the first sample of the window in the source signal.
    pub start: usize,
    pub samples: Vec<f64>,
}

/// Instantaneous heart rate, one value per consecutive beat pair.
///
/// Each rate is anchored at the later beat of its pair, so `indices` and
/// `bpm` always have equal length and `indices` is strictly ascending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateSeries {
    /// Sample index of the later beat of each pair.
    pub indices: Vec<usize>,
    /// Instantaneous rate in beats per minute.
    pub bpm: Vec<f64>,
}

impl RateSeries {
    pub fn len(&self) -> usize {
        self.bpm.len()
    }
    pub fn is_empty(&self) -> bool {
        self.bpm.is_empty()
    }
}

/// An irregular series densified onto the integer sample grid.
///
/// `values[i]` is the interpolated value at source index `start + i`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseSeries {
    pub start: usize,
    pub values: Vec<f64>,
}

/// P, Q and T wave peak locations between detected R-peaks.
///
/// The three sequences are independent: boundary cycles contribute no wave,
/// so each may be shorter than the R-peak set. Callers correlate entries by
/// the nearest preceding or following R-peak.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WaveSet {
    pub p: Vec<usize>,
    pub q: Vec<usize>,
    pub t: Vec<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rr_from_events() {
        let events = Events::from_indices(vec![100, 350, 600]);
        let rr = RRSeries::from_events(&events, 250.0);
        assert_eq!(rr.rr.len(), 2);
        assert!((rr.rr[0] - 1.0).abs() < 1e-12);
        assert!((rr.rr[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn signal_duration() {
        let sig = Signal::new(250.0, vec![0.0; 500]);
        assert!((sig.duration() - 2.0).abs() < 1e-12);
    }
}
