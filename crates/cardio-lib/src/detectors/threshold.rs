//! Envelope-based segmenter strategies: an adaptive dual-threshold
//! detector over a moving-window integration of the squared derivative,
//! and a plain detrended local-maximum picker.

use serde::{Deserialize, Serialize};

use crate::filter::design::{butterworth_prototype, design_iir};
use crate::filter::{sos_filtfilt, FilterBand};
use crate::signal::Signal;

use super::Segmenter;

/// Adaptive signal/noise threshold detector over an integrated envelope.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AdaptiveThresholdSegmenter {
    /// Lower cutoff of the band stage (Hz).
    pub lowcut_hz: f64,
    /// Upper cutoff of the band stage (Hz).
    pub highcut_hz: f64,
    /// Moving window integration length (seconds).
    pub integration_window_s: f64,
    /// Minimum physiological beat distance / refractory period (seconds).
    pub min_rr_s: f64,
    /// Scale between noise and signal envelopes for the adaptive threshold.
    pub threshold_scale: f64,
    /// How far back to search (seconds) for the waveform peak after a
    /// detection.
    pub search_back_s: f64,
}

impl Default for AdaptiveThresholdSegmenter {
    fn default() -> Self {
        Self {
            lowcut_hz: 5.0,
            highcut_hz: 15.0,
            integration_window_s: 0.150,
            min_rr_s: 0.200,
            threshold_scale: 0.6,
            search_back_s: 0.150,
        }
    }
}

impl Segmenter for AdaptiveThresholdSegmenter {
    fn candidates(&self, signal: &Signal) -> Vec<usize> {
        if signal.len() < 3 {
            return Vec::new();
        }
        let fs = signal.fs;
        let nyquist = fs / 2.0;

        let lowpass = design_iir(
            &butterworth_prototype(1),
            &[self.highcut_hz / nyquist],
            FilterBand::Lowpass,
        );
        let highpass = design_iir(
            &butterworth_prototype(1),
            &[self.lowcut_hz / nyquist],
            FilterBand::Highpass,
        );
        let low = sos_filtfilt(&lowpass, &signal.data);
        let banded = sos_filtfilt(&highpass, &low);

        // Squared derivative, integrated over a trailing moving window.
        let squared: Vec<f64> = banded.windows(2).map(|w| (w[1] - w[0]).powi(2)).collect();
        let win = ((self.integration_window_s * fs).round() as usize).max(1);
        let mut envelope = vec![0.0; squared.len()];
        let mut acc = 0.0;
        for (i, &sample) in squared.iter().enumerate() {
            acc += sample;
            if i >= win {
                acc -= squared[i - win];
            }
            envelope[i] = acc / win as f64;
        }

        self.pick_peaks(&banded, &envelope, fs)
    }
}

impl AdaptiveThresholdSegmenter {
    fn pick_peaks(&self, banded: &[f64], envelope: &[f64], fs: f64) -> Vec<usize> {
        if banded.is_empty() || envelope.is_empty() {
            return Vec::new();
        }

        let refractory = ((self.min_rr_s * fs).round() as usize).max(1);
        let search = ((self.search_back_s * fs).round() as usize).max(1);

        let init = envelope.len().min((fs as usize).max(1));
        let avg = envelope[..init].iter().sum::<f64>() / init as f64;
        let mut signal_level = avg;
        let mut noise_level = avg * 0.5;
        let mut threshold =
            noise_level + self.threshold_scale * (signal_level - noise_level).max(0.0);
        let mut last_detection = 0usize;
        let mut peaks = Vec::new();

        for (i, &sample) in envelope.iter().enumerate() {
            let refractory_ok = peaks.is_empty() || i - last_detection >= refractory;
            if sample >= threshold && refractory_ok {
                // Search back over the banded waveform for the sharpest
                // deflection preceding the envelope crossing.
                let start = i.saturating_sub(search);
                let end = i.min(banded.len() - 1);
                let mut idx = start;
                let mut max_val = f64::MIN;
                for (j, &v) in banded.iter().enumerate().take(end + 1).skip(start) {
                    if v > max_val {
                        max_val = v;
                        idx = j;
                    }
                }
                peaks.push(idx);
                last_detection = i;
                signal_level = 0.125 * sample + 0.875 * signal_level;
            } else {
                noise_level = 0.125 * sample + 0.875 * noise_level;
            }
            threshold =
                noise_level + self.threshold_scale * (signal_level - noise_level).max(0.0);
        }

        peaks.sort_unstable();
        peaks.dedup();
        peaks
    }
}

/// Detrended local-maximum picker with a minimum gap. The simplest
/// strategy; useful as a cross-check on clean recordings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LocalMaxSegmenter {
    /// Minimum distance between reported peaks (seconds).
    pub min_rr_s: f64,
    /// Detrending window (seconds).
    pub detrend_window_s: f64,
}

impl Default for LocalMaxSegmenter {
    fn default() -> Self {
        Self {
            min_rr_s: 0.300,
            detrend_window_s: 0.150,
        }
    }
}

impl Segmenter for LocalMaxSegmenter {
    fn candidates(&self, signal: &Signal) -> Vec<usize> {
        let data = &signal.data;
        if data.len() < 3 {
            return Vec::new();
        }
        let min_gap = ((self.min_rr_s * signal.fs).max(1.0)) as usize;
        let win = ((self.detrend_window_s * signal.fs) as usize).max(1);

        let mut baseline = vec![0.0; data.len()];
        let mut acc = 0.0;
        for i in 0..data.len() {
            acc += data[i];
            if i >= win {
                acc -= data[i - win];
            }
            baseline[i] = acc / win as f64;
        }

        let mut peaks = Vec::new();
        let mut last_idx = 0usize;
        for i in 1..data.len() - 1 {
            let y = data[i] - baseline[i];
            if y > 0.0
                && y > (data[i - 1] - baseline[i - 1])
                && y > (data[i + 1] - baseline[i + 1])
                && (peaks.is_empty() || (i - last_idx) >= min_gap)
            {
                peaks.push(i);
                last_idx = i;
            }
        }
        peaks
    }
}
