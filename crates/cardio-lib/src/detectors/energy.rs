//! Adaptive Shannon-energy beat segmenter.
//!
//! Detects QRS energy bursts through a nonlinear transform of the squared
//! first difference of a narrow-band signal, with windowed median
//! estimation of the rectification threshold and normalizer. The medians
//! make the threshold robust to noise bursts that would skew a single
//! global std/max. Candidates mark energy maxima, not exact R samples, and
//! must be refined against the waveform afterwards.

use serde::{Deserialize, Serialize};

use crate::filter::design::{butterworth_prototype, design_iir};
use crate::filter::{gaussian_smooth, moving_average_same, sos_filtfilt, FilterBand};
use crate::signal::Signal;

use super::Segmenter;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EnergySegmenter {
    /// Length of each threshold-estimation window (seconds).
    pub window_size_s: f64,
    /// Lower edge of the narrow-band stage (Hz).
    pub lfreq_hz: f64,
    /// Upper edge of the narrow-band stage (Hz).
    pub hfreq_hz: f64,
}

impl Default for EnergySegmenter {
    fn default() -> Self {
        Self {
            window_size_s: 5.0,
            lfreq_hz: 5.0,
            hfreq_hz: 15.0,
        }
    }
}

impl Segmenter for EnergySegmenter {
    fn candidates(&self, signal: &Signal) -> Vec<usize> {
        if signal.len() < 3 {
            return Vec::new();
        }
        let fs = signal.fs;
        let nyquist = fs / 2.0;

        // Sequential first-order zero-phase lowpass then highpass, not a
        // combined bandpass.
        let lowpass = design_iir(
            &butterworth_prototype(1),
            &[self.hfreq_hz / nyquist],
            FilterBand::Lowpass,
        );
        let highpass = design_iir(
            &butterworth_prototype(1),
            &[self.lfreq_hz / nyquist],
            FilterBand::Highpass,
        );
        let low = sos_filtfilt(&lowpass, &signal.data);
        let band = sos_filtfilt(&highpass, &low);

        // Power of the derivative.
        let mut power: Vec<f64> = band.windows(2).map(|w| (w[1] - w[0]).powi(2)).collect();

        let window = (self.window_size_s * fs) as usize;
        let mut thresholds = Vec::new();
        let mut max_powers = Vec::new();
        if window >= 1 {
            for chunk in power.chunks_exact(window) {
                thresholds.push(0.5 * population_std(chunk));
                max_powers.push(slice_max(chunk));
            }
        }
        let (threshold, max_power) = if thresholds.is_empty() {
            // Signal shorter than one estimation window: fall back to the
            // whole-series statistics.
            log::warn!(
                "energy segmenter: signal shorter than one {:.1}s window, using global statistics",
                self.window_size_s
            );
            (0.5 * population_std(&power), slice_max(&power))
        } else {
            (median(&mut thresholds), median(&mut max_powers))
        };
        if !(max_power > 0.0) {
            return Vec::new();
        }

        // Rectify, normalize and clip to [0, 1].
        for v in power.iter_mut() {
            *v = if *v < threshold {
                0.0
            } else {
                (*v / max_power).min(1.0)
            };
        }

        // Bounded Shannon energy of the squared series.
        let energy: Vec<f64> = power
            .iter()
            .map(|&v| {
                let sq = v * v;
                let e = -sq * sq.max(1e-6).ln();
                if e > 0.0 {
                    e
                } else {
                    0.0
                }
            })
            .collect();

        let mean_window = (fs * 0.125 + 1.0) as usize;
        let smoothed = moving_average_same(&energy, mean_window);
        let smoothed = gaussian_smooth(&smoothed, fs / 8.0);

        // Positive-to-negative crossings of the first difference mark local
        // maxima of the smoothed energy; shift back one sample for the
        // differencing offset.
        let diff: Vec<f64> = smoothed.windows(2).map(|w| w[1] - w[0]).collect();
        let mut peaks = Vec::new();
        for i in 1..diff.len().saturating_sub(1) {
            if diff[i] > 0.0 && diff[i + 1] < 0.0 {
                peaks.push(i - 1);
            }
        }
        peaks
    }
}

fn population_std(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mean = data.iter().sum::<f64>() / data.len() as f64;
    let var = data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / data.len() as f64;
    var.sqrt()
}

fn slice_max(data: &[f64]) -> f64 {
    data.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

fn median(data: &mut [f64]) -> f64 {
    data.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = data.len();
    if n % 2 == 1 {
        data[n / 2]
    } else {
        0.5 * (data[n / 2 - 1] + data[n / 2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::test_support::synthetic_ecg;

    #[test]
    fn median_of_odd_and_even_slices() {
        assert!((median(&mut [3.0, 1.0, 2.0]) - 2.0).abs() < 1e-12);
        assert!((median(&mut [4.0, 1.0, 3.0, 2.0]) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn population_std_matches_hand_computation() {
        let data = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((population_std(&data) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn finds_one_burst_per_beat() {
        let fs = 250.0;
        let beats = [0.5, 1.3, 2.1, 2.9, 3.7, 4.5, 5.3, 6.1, 6.9, 7.7, 8.5, 9.3];
        let sig = synthetic_ecg(fs, &beats, 10.5);
        let candidates = EnergySegmenter::default().candidates(&sig);
        assert_eq!(candidates.len(), beats.len(), "{candidates:?}");
        // Every candidate lies within 100 ms of a true beat.
        for &c in &candidates {
            let t = c as f64 / fs;
            let nearest = beats
                .iter()
                .map(|b| (b - t).abs())
                .fold(f64::INFINITY, f64::min);
            assert!(nearest < 0.1, "candidate at {t:.3}s");
        }
    }

    #[test]
    fn short_signal_does_not_panic() {
        let sig = Signal::new(250.0, vec![0.0, 1.0, 0.0, -1.0, 0.0]);
        let _ = EnergySegmenter::default().candidates(&sig);
    }

    #[test]
    fn flat_signal_yields_no_candidates() {
        let sig = Signal::new(250.0, vec![0.0; 2000]);
        assert!(EnergySegmenter::default().candidates(&sig).is_empty());
    }
}
