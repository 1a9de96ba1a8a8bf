//! Beat detection: pluggable segmenter strategies plus peak refinement.

pub mod energy;
pub mod threshold;

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CardioError, Result};
use crate::signal::Signal;

pub use energy::EnergySegmenter;
pub use threshold::{AdaptiveThresholdSegmenter, LocalMaxSegmenter};

/// A beat segmentation strategy.
///
/// Returns ascending candidate beat indices. Candidates locate the burst
/// of QRS energy, not necessarily the exact R sample; run them through
/// [`refine_peaks`] before treating them as R-peaks.
pub trait Segmenter {
    fn candidates(&self, signal: &Signal) -> Vec<usize>;
}

/// The available segmenter strategies as a tagged variant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum SegmenterKind {
    Energy(EnergySegmenter),
    AdaptiveThreshold(AdaptiveThresholdSegmenter),
    LocalMax(LocalMaxSegmenter),
}

impl Default for SegmenterKind {
    fn default() -> Self {
        Self::Energy(EnergySegmenter::default())
    }
}

impl Segmenter for SegmenterKind {
    fn candidates(&self, signal: &Signal) -> Vec<usize> {
        match self {
            Self::Energy(s) => s.candidates(signal),
            Self::AdaptiveThreshold(s) => s.candidates(signal),
            Self::LocalMax(s) => s.candidates(signal),
        }
    }
}

impl FromStr for SegmenterKind {
    type Err = CardioError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "energy" => Ok(Self::Energy(EnergySegmenter::default())),
            "adaptive-threshold" => {
                Ok(Self::AdaptiveThreshold(AdaptiveThresholdSegmenter::default()))
            }
            "local-max" => Ok(Self::LocalMax(LocalMaxSegmenter::default())),
            other => Err(CardioError::UnknownStrategy(other.to_string())),
        }
    }
}

/// What to do when a strategy tag is not recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OnUnknownStrategy {
    /// Propagate [`CardioError::UnknownStrategy`].
    Fail,
    /// Log a warning and run the default energy segmenter.
    UseDefault,
}

/// Locate candidate beats with the strategy named by `tag`.
pub fn segment_beats(
    signal: &Signal,
    tag: &str,
    on_unknown: OnUnknownStrategy,
) -> Result<Vec<usize>> {
    let kind = match tag.parse::<SegmenterKind>() {
        Ok(kind) => kind,
        Err(err) => match on_unknown {
            OnUnknownStrategy::Fail => return Err(err),
            OnUnknownStrategy::UseDefault => {
                log::warn!("unknown segmenter `{tag}`, falling back to the energy segmenter");
                SegmenterKind::default()
            }
        },
    };
    Ok(kind.candidates(signal))
}

/// Snap candidate indices to the waveform maximum within +/- `tolerance_s`.
///
/// Output is strictly ascending with duplicates collapsed, so it may be
/// shorter than the input.
pub fn refine_peaks(signal: &Signal, candidates: &[usize], tolerance_s: f64) -> Vec<usize> {
    let n = signal.len();
    if n == 0 {
        return Vec::new();
    }
    let tol = (tolerance_s * signal.fs) as usize;

    let mut refined: Vec<usize> = candidates
        .iter()
        .filter(|&&c| c < n)
        .map(|&c| {
            let lo = c.saturating_sub(tol);
            let hi = (c + tol + 1).min(n);
            let mut best = lo;
            let mut best_val = f64::NEG_INFINITY;
            for (i, &v) in signal.data[lo..hi].iter().enumerate() {
                if v > best_val {
                    best_val = v;
                    best = lo + i;
                }
            }
            best
        })
        .collect();

    refined.sort_unstable();
    refined.dedup();
    refined
}


#[cfg(test)]
mod tests {
    use super::*;
    use test_support::synthetic_ecg;

    #[test]
    fn refine_snaps_to_local_maximum() {
        let fs = 250.0;
        let sig = synthetic_ecg(fs, &[1.0], 2.0);
        let true_peak = (1.0 * fs) as usize;
        // Candidates deliberately early and late.
        let refined = refine_peaks(&sig, &[true_peak - 8, true_peak + 8], 0.05);
        assert_eq!(refined, vec![true_peak]);
    }

    #[test]
    fn refine_output_is_ascending_and_unique() {
        let fs = 250.0;
        let sig = synthetic_ecg(fs, &[0.5, 1.3, 2.1], 3.0);
        // Unordered, duplicated, out-of-range candidates.
        let candidates = vec![540, 120, 120, 330, 5000];
        let refined = refine_peaks(&sig, &candidates, 0.05);
        for w in refined.windows(2) {
            assert!(w[0] < w[1], "{refined:?}");
        }
    }

    #[test]
    fn unknown_strategy_fails_or_falls_back() {
        let sig = synthetic_ecg(250.0, &[0.5, 1.3], 2.0);
        let err = segment_beats(&sig, "wavelet", OnUnknownStrategy::Fail).unwrap_err();
        assert!(matches!(err, CardioError::UnknownStrategy(_)));
        let peaks = segment_beats(&sig, "wavelet", OnUnknownStrategy::UseDefault).unwrap();
        assert!(!peaks.is_empty());
    }

    #[test]
    fn known_tags_parse() {
        assert!("energy".parse::<SegmenterKind>().is_ok());
        assert!("adaptive-threshold".parse::<SegmenterKind>().is_ok());
        assert!("local-max".parse::<SegmenterKind>().is_ok());
    }

    #[test]
    fn detection_survives_additive_noise() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let fs = 250.0;
        let beats = [0.5, 1.3, 2.1, 2.9, 3.7];
        let mut sig = synthetic_ecg(fs, &beats, 4.2);
        let mut rng = StdRng::seed_from_u64(7);
        for v in &mut sig.data {
            *v += rng.gen_range(-0.05..0.05);
        }

        let candidates = segment_beats(&sig, "energy", OnUnknownStrategy::Fail).unwrap();
        let refined = refine_peaks(&sig, &candidates, 0.05);
        let tol = (0.1 * fs) as isize;
        for &b in &beats {
            let target = (b * fs) as isize;
            assert!(
                refined.iter().any(|&p| (p as isize - target).abs() <= tol),
                "beat at {b}s missed: {refined:?}"
            );
        }
    }

    #[test]
    fn segment_and_refine_recover_known_r_locations() {
        // 1000 Hz beats at known indices; the full detection chain must
        // land within 5 samples of each.
        let fs = 1000.0;
        let beats = [0.1, 1.1, 2.1, 3.1];
        let sig = synthetic_ecg(fs, &beats, 4.0);
        let candidates = segment_beats(&sig, "energy", OnUnknownStrategy::Fail).unwrap();
        let refined = refine_peaks(&sig, &candidates, 0.05);
        assert_eq!(refined.len(), 4, "{refined:?}");
        for (r, b) in refined.iter().zip(beats.iter()) {
            let expected = (b * fs) as isize;
            assert!(
                (*r as isize - expected).abs() <= 5,
                "peak {r} vs expected {expected}"
            );
        }
    }
}
