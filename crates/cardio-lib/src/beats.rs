//! Cardiac cycle extraction and instantaneous heart-rate estimation.

use crate::signal::{Cycle, RateSeries, Signal};

/// Slice one fixed-width window per R-peak out of the signal.
///
/// Each window spans `before_s` seconds before to `after_s` seconds after
/// its peak. Peaks whose window would cross a signal edge are dropped
/// silently, so the result may hold fewer cycles than peaks. Ordering
/// follows the peak order.
pub fn extract_cycles(signal: &Signal, peaks: &[usize], before_s: f64, after_s: f64) -> Vec<Cycle> {
    let before = (before_s * signal.fs).round() as usize;
    let after = (after_s * signal.fs).round() as usize;
    let n = signal.len();

    let mut cycles = Vec::with_capacity(peaks.len());
    for &p in peaks {
        if p < before || p + after > n {
            continue;
        }
        let start = p - before;
        cycles.push(Cycle {
            rpeak: p,
            start,
            samples: signal.data[start..p + after].to_vec(),
        });
    }
    cycles
}

/// Instantaneous rate in beats per minute for each consecutive beat pair,
/// anchored at the later beat, smoothed with a centered moving mean.
pub fn estimate_rate(peaks: &[usize], fs: f64, smoothing_window: usize) -> RateSeries {
    let mut indices = Vec::new();
    let mut bpm = Vec::new();
    for w in peaks.windows(2) {
        let delta = w[1].saturating_sub(w[0]);
        if delta == 0 {
            continue;
        }
        indices.push(w[1]);
        bpm.push(fs * 60.0 / delta as f64);
    }

    if smoothing_window > 1 && bpm.len() > 1 {
        bpm = smooth_centered(&bpm, smoothing_window);
    }

    RateSeries { indices, bpm }
}

/// Centered moving mean; the window shrinks at the edges instead of
/// padding.
fn smooth_centered(x: &[f64], win: usize) -> Vec<f64> {
    let n = x.len();
    let half = win / 2;
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let lo = i.saturating_sub(half);
        let hi = (i + half + 1).min(n);
        let sum: f64 = x[lo..hi].iter().sum();
        out.push(sum / (hi - lo) as f64);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_signal(fs: f64, n: usize) -> Signal {
        Signal::new(fs, (0..n).map(|i| i as f64).collect())
    }

    #[test]
    fn cycles_have_fixed_width_and_edge_peaks_are_dropped() {
        let fs = 250.0;
        let sig = ramp_signal(fs, 1000);
        // 0.2s before = 50 samples, 0.4s after = 100 samples.
        let peaks = [10, 300, 600, 980];
        let cycles = extract_cycles(&sig, &peaks, 0.2, 0.4);
        assert_eq!(cycles.len(), 2);
        for c in &cycles {
            assert_eq!(c.samples.len(), 150);
            assert_eq!(c.rpeak - c.start, 50);
        }
        assert_eq!(cycles[0].rpeak, 300);
        assert_eq!(cycles[1].rpeak, 600);
    }

    #[test]
    fn cycle_samples_come_from_the_window() {
        let fs = 250.0;
        let sig = ramp_signal(fs, 1000);
        let cycles = extract_cycles(&sig, &[500], 0.2, 0.4);
        assert_eq!(cycles[0].samples[0], 450.0);
        assert_eq!(*cycles[0].samples.last().unwrap(), 599.0);
    }

    #[test]
    fn rate_is_anchored_at_the_later_beat() {
        let fs = 1000.0;
        // 1 s apart -> 60 bpm throughout; smoothing is then a no-op.
        let peaks = [100, 1100, 2100, 3100];
        let rate = estimate_rate(&peaks, fs, 3);
        assert_eq!(rate.indices, vec![1100, 2100, 3100]);
        for v in &rate.bpm {
            assert!((v - 60.0).abs() < 1e-9);
        }
    }

    #[test]
    fn rate_values_follow_interval_lengths() {
        let fs = 250.0;
        // 0.5 s then 1.0 s intervals -> 120 and 60 bpm before smoothing.
        let peaks = [0, 125, 375];
        let rate = estimate_rate(&peaks, fs, 1);
        assert_eq!(rate.bpm.len(), 2);
        assert!((rate.bpm[0] - 120.0).abs() < 1e-9);
        assert!((rate.bpm[1] - 60.0).abs() < 1e-9);
    }

    #[test]
    fn coincident_beats_are_skipped() {
        let rate = estimate_rate(&[100, 100, 200], 250.0, 1);
        assert_eq!(rate.bpm.len(), 1);
    }

    #[test]
    fn fewer_than_two_beats_gives_empty_series() {
        assert!(estimate_rate(&[42], 250.0, 3).is_empty());
        assert!(estimate_rate(&[], 250.0, 3).is_empty());
    }
}
