//! P/Q/T wave localization and systole/diastole labeling.

use crate::error::{CardioError, Result};
use crate::signal::{Signal, WaveSet};

/// Locate P, Q and T wave peaks between consecutive R-peaks.
///
/// Sub-windows are proportional to each inter-beat interval: T is the
/// maximum in `[R + quarter, R + half)` of the interval after its R-peak,
/// P the maximum in `[R - half, R - quarter)` before it, and Q the minimum
/// between each P and the next R-peak. Empty sub-windows (signal
/// boundaries, degenerate intervals) skip that wave; one bad cycle never
/// aborts the rest.
pub fn locate_waves(signal: &Signal, r_peaks: &[usize]) -> WaveSet {
    let data = &signal.data;
    let n = data.len();
    let mut waves = WaveSet::default();

    for w in r_peaks.windows(2) {
        let (r, next) = (w[0], w[1]);
        if next <= r {
            continue;
        }
        let middle = (next - r) as f64 / 2.0;
        let quarter = middle / 2.0;

        let lo = ((r as f64 + quarter) as usize).min(n);
        let hi = ((r as f64 + middle) as usize).min(n);
        if let Ok(t) = argmax(&data[lo..hi]) {
            waves.t.push(lo + t);
        }
    }

    for w in r_peaks.windows(2) {
        let (prev, r) = (w[0], w[1]);
        if r <= prev {
            continue;
        }
        let middle = (r - prev) as f64 / 2.0;
        let quarter = middle / 2.0;

        let lo = ((r as f64 - middle).max(0.0) as usize).min(n);
        let hi = ((r as f64 - quarter).max(0.0) as usize).min(n);
        if let Ok(p) = argmax(&data[lo..hi]) {
            waves.p.push(lo + p);
        }
    }

    for &p in &waves.p {
        // First R-peak strictly after this P wave.
        let Some(&next_r) = r_peaks.iter().find(|&&r| r > p) else {
            continue;
        };
        let hi = next_r.min(n);
        if let Ok(q) = argmin(&data[p.min(n)..hi]) {
            waves.q.push(p + q);
        }
    }

    waves
}

fn argmax(window: &[f64]) -> Result<usize> {
    window
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
        .ok_or(CardioError::EmptyWindow)
}

fn argmin(window: &[f64]) -> Result<usize> {
    window
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
        .ok_or(CardioError::EmptyWindow)
}

/// Label every sample as systole (1) or diastole (0).
///
/// The state starts at diastole, switches to systole one sample after each
/// R-peak and back one sample after each T wave, applied in raw index
/// order; when an R and a T mark the same sample the T wins. An R-peak
/// with no later T wave leaves the trailing samples in diastole, and
/// out-of-range indices are ignored. A paired T that does not follow its R
/// is logged as a detection inconsistency but still applied.
pub fn classify_phase(len: usize, r_peaks: &[usize], t_waves: &[usize]) -> Vec<u8> {
    for (i, (&r, &t)) in r_peaks.iter().zip(t_waves.iter()).enumerate() {
        if t <= r {
            log::warn!("phase labels: T wave {t} does not follow its R-peak {r} (pair {i})");
        }
    }

    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        None,
        R,
        T,
    }

    let mut marks = vec![Mark::None; len];
    let last_t = t_waves.iter().filter(|&&t| t < len).max().copied();
    for &r in r_peaks {
        // Trailing R-peaks with no T to close the interval stay diastole.
        if r < len && last_t.is_some_and(|t| r < t) {
            marks[r] = Mark::R;
        }
    }
    for &t in t_waves {
        if t < len {
            marks[t] = Mark::T;
        }
    }

    let mut out = Vec::with_capacity(len);
    let mut current = 0u8;
    for i in 0..len {
        if i > 0 {
            match marks[i - 1] {
                Mark::R => current = 1,
                Mark::T => current = 0,
                Mark::None => {}
            }
        }
        out.push(current);
    }
    out
}
