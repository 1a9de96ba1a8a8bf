//! End-to-end ECG processing: filtering, beat detection, cycle and rate
//! extraction, wave delineation and phase labeling in one call.

use serde::{Deserialize, Serialize};

use crate::beats::{estimate_rate, extract_cycles};
use crate::detectors::{refine_peaks, segment_beats, OnUnknownStrategy};
use crate::error::{CardioError, Result};
use crate::filter::{filter_signal, FilterBand, FilterFamily};
use crate::interpolate::densify;
use crate::metrics::{hrv_time, HRVTime};
use crate::signal::{Cycle, Events, RRSeries, Signal, WaveSet};
use crate::waves::{classify_phase, locate_waves};

/// Tunable knobs of [`process`]. `Default` gives the standard clinical
/// pre-processing: a zero-phase FIR bandpass at 3-45 Hz with order
/// `0.3 * fs`, the Shannon-energy segmenter, and 50 ms peak refinement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessConfig {
    pub family: FilterFamily,
    pub band: FilterBand,
    /// Cutoff frequencies in Hz; one for lowpass/highpass, two for bands.
    pub cutoffs_hz: Vec<f64>,
    /// Filter order as a fraction of the sampling rate.
    pub order_fraction: f64,
    /// Segmenter strategy tag, resolved through [`segment_beats`].
    pub segmenter: String,
    pub on_unknown: OnUnknownStrategy,
    /// Half-width of the peak refinement window (seconds).
    pub refine_tolerance_s: f64,
    /// Cycle window before each R-peak (seconds).
    pub cycle_before_s: f64,
    /// Cycle window after each R-peak (seconds).
    pub cycle_after_s: f64,
    /// Moving-mean width over the beat-to-beat rate values.
    pub rate_smoothing: usize,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            family: FilterFamily::Fir,
            band: FilterBand::Bandpass,
            cutoffs_hz: vec![3.0, 45.0],
            order_fraction: 0.3,
            segmenter: "energy".to_string(),
            on_unknown: OnUnknownStrategy::Fail,
            refine_tolerance_s: 0.05,
            cycle_before_s: 0.2,
            cycle_after_s: 0.4,
            rate_smoothing: 3,
        }
    }
}

/// Everything [`process`] extracts from one recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EcgAnalysis {
    /// The filtered signal the downstream stages ran on.
    pub filtered: Signal,
    /// Refined R-peak sample indices, strictly ascending.
    pub r_peaks: Vec<usize>,
    pub cycles: Vec<Cycle>,
    /// Per-sample heart rate in bpm, same length as the input signal.
    /// Samples outside the interpolable beat span are NaN.
    pub heart_rate: Vec<f64>,
    pub waves: WaveSet,
    /// Per-sample systole (1) / diastole (0) labels.
    pub phase: Vec<u8>,
    pub rr: RRSeries,
    pub hrv: HRVTime,
}

/// Run the full analysis chain on a raw single-lead recording.
///
/// Stages that need more beats than the recording offers degrade instead
/// of failing: too few beats for rate interpolation leaves `heart_rate`
/// all-NaN, and wave delineation of fewer than two beats yields empty
/// wave sets. Filter misconfiguration and unknown segmenter tags (under
/// [`OnUnknownStrategy::Fail`]) are the only hard errors.
pub fn process(signal: &Signal, config: &ProcessConfig) -> Result<EcgAnalysis> {
    let filtered = filter_signal(
        signal,
        config.family,
        config.band,
        &config.cutoffs_hz,
        config.order_fraction,
    )?;

    let candidates = segment_beats(&filtered, &config.segmenter, config.on_unknown)?;
    let r_peaks = refine_peaks(&filtered, &candidates, config.refine_tolerance_s);

    let cycles = extract_cycles(
        &filtered,
        &r_peaks,
        config.cycle_before_s,
        config.cycle_after_s,
    );

    let rate = estimate_rate(&r_peaks, filtered.fs, config.rate_smoothing);
    let mut heart_rate = vec![f64::NAN; filtered.len()];
    match densify(&rate) {
        Ok(dense) => {
            let end = (dense.start + dense.values.len()).min(heart_rate.len());
            let len = end.saturating_sub(dense.start);
            heart_rate[dense.start..end].copy_from_slice(&dense.values[..len]);
        }
        Err(CardioError::InsufficientData { needed, got }) => {
            log::warn!("heart rate needs {needed} beat intervals, got {got}; leaving NaN");
        }
        Err(err) => return Err(err),
    }

    let waves = locate_waves(&filtered, &r_peaks);
    let phase = classify_phase(filtered.len(), &r_peaks, &waves.t);

    let rr = RRSeries::from_events(&Events::from_indices(r_peaks.clone()), filtered.fs);
    let hrv = hrv_time(&rr);

    Ok(EcgAnalysis {
        filtered,
        r_peaks,
        cycles,
        heart_rate,
        waves,
        phase,
        rr,
        hrv,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::test_support::synthetic_ecg;

    fn regular_recording(fs: f64, n_beats: usize, rr_s: f64) -> (Signal, Vec<f64>) {
        let beats: Vec<f64> = (0..n_beats).map(|i| 0.5 + i as f64 * rr_s).collect();
        let duration = beats.last().copied().unwrap_or(0.0) + 0.5;
        (synthetic_ecg(fs, &beats, duration), beats)
    }

    #[test]
    fn full_chain_on_a_clean_recording() {
        let fs = 250.0;
        let (sig, beats) = regular_recording(fs, 10, 0.8);
        let analysis = process(&sig, &ProcessConfig::default()).unwrap();

        assert_eq!(analysis.filtered.len(), sig.len());
        assert_eq!(analysis.r_peaks.len(), beats.len());
        for (r, b) in analysis.r_peaks.iter().zip(beats.iter()) {
            let expected = (b * fs) as isize;
            assert!((*r as isize - expected).abs() <= 5, "peak {r} vs {expected}");
        }

        // Every interior beat gets a fixed-width cycle.
        assert!(!analysis.cycles.is_empty());
        let width = ((0.2 + 0.4) * fs).round() as usize;
        for c in &analysis.cycles {
            assert_eq!(c.samples.len(), width);
        }

        // Dense rate covers the beat span with values near 75 bpm
        // (0.8 s intervals) and is NaN outside it.
        assert_eq!(analysis.heart_rate.len(), sig.len());
        assert!(analysis.heart_rate[0].is_nan());
        let mid = analysis.r_peaks[4];
        assert!(
            (analysis.heart_rate[mid] - 75.0).abs() < 5.0,
            "rate {}",
            analysis.heart_rate[mid]
        );

        assert_eq!(analysis.phase.len(), sig.len());
        assert!(analysis.phase.iter().all(|&v| v == 0 || v == 1));

        assert_eq!(analysis.rr.rr.len(), beats.len() - 1);
        assert_eq!(analysis.hrv.n, beats.len() - 1);
        assert!((analysis.hrv.avnn - 0.8).abs() < 0.02);
    }

    #[test]
    fn too_few_beats_leaves_rate_nan_but_succeeds() {
        let fs = 250.0;
        let (sig, beats) = regular_recording(fs, 3, 0.8);
        let analysis = process(&sig, &ProcessConfig::default()).unwrap();
        assert_eq!(analysis.r_peaks.len(), beats.len());
        assert!(analysis.heart_rate.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn unknown_segmenter_honors_the_policy() {
        let fs = 250.0;
        let (sig, _) = regular_recording(fs, 6, 0.8);

        let strict = ProcessConfig {
            segmenter: "wavelet".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            process(&sig, &strict),
            Err(CardioError::UnknownStrategy(_))
        ));

        let lenient = ProcessConfig {
            on_unknown: OnUnknownStrategy::UseDefault,
            ..strict
        };
        let analysis = process(&sig, &lenient).unwrap();
        assert!(!analysis.r_peaks.is_empty());
    }

    #[test]
    fn config_round_trips_through_json() {
        let cfg = ProcessConfig {
            segmenter: "adaptive-threshold".to_string(),
            cutoffs_hz: vec![0.5, 40.0],
            ..Default::default()
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let back: ProcessConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.segmenter, cfg.segmenter);
        assert_eq!(back.cutoffs_hz, cfg.cutoffs_hz);
        assert_eq!(back.family, cfg.family);
    }

    #[test]
    fn bad_filter_spec_is_a_hard_error() {
        let fs = 250.0;
        let (sig, _) = regular_recording(fs, 6, 0.8);
        let cfg = ProcessConfig {
            cutoffs_hz: vec![200.0, 300.0],
            ..Default::default()
        };
        assert!(matches!(
            process(&sig, &cfg),
            Err(CardioError::InvalidFilterSpec(_))
        ));
    }
}
