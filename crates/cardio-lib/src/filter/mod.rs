//! Generic digital filtering of 1-D sampled signals.

pub mod apply;
pub mod design;

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CardioError, Result};
use crate::signal::Signal;

pub use apply::{filtfilt, gaussian_smooth, lfilter, moving_average_same, sos_filtfilt};
pub use design::{design_fir, design_iir, Section, Zpk};

/// Supported filter families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterFamily {
    /// Finite impulse response, windowed-sinc with a Hamming window.
    Fir,
    Butterworth,
    Cheby1,
    Cheby2,
    Elliptic,
    Bessel,
    /// Pass the signal through unchanged.
    None,
}

impl FromStr for FilterFamily {
    type Err = CardioError;

    /// Unrecognized tags are rejected with
    /// [`CardioError::InvalidFilterSpec`] instead of silently passing the
    /// signal through; callers that want passthrough say `"none"`
    /// explicitly.
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "fir" => Ok(Self::Fir),
            "butter" | "butterworth" => Ok(Self::Butterworth),
            "cheby1" => Ok(Self::Cheby1),
            "cheby2" => Ok(Self::Cheby2),
            "ellip" | "elliptic" => Ok(Self::Elliptic),
            "bessel" => Ok(Self::Bessel),
            "none" => Ok(Self::None),
            other => Err(CardioError::InvalidFilterSpec(format!(
                "unknown filter family `{other}`"
            ))),
        }
    }
}

/// Band type of a filtering stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterBand {
    Lowpass,
    Highpass,
    Bandpass,
    Bandstop,
}

impl FilterBand {
    fn cutoff_count(self) -> usize {
        match self {
            Self::Lowpass | Self::Highpass => 1,
            Self::Bandpass | Self::Bandstop => 2,
        }
    }
}

impl FromStr for FilterBand {
    type Err = CardioError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "lowpass" => Ok(Self::Lowpass),
            "highpass" => Ok(Self::Highpass),
            "bandpass" => Ok(Self::Bandpass),
            "bandstop" => Ok(Self::Bandstop),
            other => Err(CardioError::InvalidFilterSpec(format!(
                "unknown band type `{other}`"
            ))),
        }
    }
}

/// Validate cutoffs against the band type and normalize them to Nyquist.
fn normalized_cutoffs(band: FilterBand, cutoffs: &[f64], fs: f64) -> Result<Vec<f64>> {
    let expected = band.cutoff_count();
    if cutoffs.len() != expected {
        return Err(CardioError::InvalidFilterSpec(format!(
            "{band:?} requires {expected} cutoff frequency(ies), got {}",
            cutoffs.len()
        )));
    }
    let nyquist = fs / 2.0;
    for &f in cutoffs {
        if !(f > 0.0 && f < nyquist) {
            return Err(CardioError::InvalidFilterSpec(format!(
                "cutoff {f} Hz outside (0, {nyquist}) Hz"
            )));
        }
    }
    if expected == 2 && cutoffs[0] >= cutoffs[1] {
        return Err(CardioError::InvalidFilterSpec(format!(
            "low cutoff {} Hz must be below high cutoff {} Hz",
            cutoffs[0], cutoffs[1]
        )));
    }
    Ok(cutoffs.iter().map(|&f| f / nyquist).collect())
}

/// Zero-phase filtering of a signal.
///
/// The filter order is `floor(order_fraction * fs)`. `FilterFamily::None`
/// returns the input unchanged. Output length always equals input length;
/// malformed band/cutoff combinations fail with
/// [`CardioError::InvalidFilterSpec`].
pub fn filter_signal(
    signal: &Signal,
    family: FilterFamily,
    band: FilterBand,
    cutoffs: &[f64],
    order_fraction: f64,
) -> Result<Signal> {
    if family == FilterFamily::None {
        return Ok(signal.clone());
    }
    let wn = normalized_cutoffs(band, cutoffs, signal.fs)?;
    let order = (order_fraction * signal.fs).floor() as usize;
    if order == 0 {
        return Err(CardioError::InvalidFilterSpec(format!(
            "order fraction {order_fraction} yields a zero-order filter at {} Hz",
            signal.fs
        )));
    }
    if signal.is_empty() {
        return Ok(signal.clone());
    }

    let data = match family {
        FilterFamily::Fir => {
            let b = design_fir(order, &wn, band);
            filtfilt(&b, &[1.0], &signal.data)
        }
        FilterFamily::Butterworth => {
            let sos = design_iir(&design::butterworth_prototype(order), &wn, band);
            sos_filtfilt(&sos, &signal.data)
        }
        FilterFamily::Cheby1 => {
            let sos = design_iir(&design::cheby1_prototype(order), &wn, band);
            sos_filtfilt(&sos, &signal.data)
        }
        FilterFamily::Cheby2 => {
            let sos = design_iir(&design::cheby2_prototype(order), &wn, band);
            sos_filtfilt(&sos, &signal.data)
        }
        FilterFamily::Elliptic => {
            let sos = design_iir(&design::elliptic_prototype(order), &wn, band);
            sos_filtfilt(&sos, &signal.data)
        }
        FilterFamily::Bessel => {
            let sos = design_iir(&design::bessel_prototype(order), &wn, band);
            sos_filtfilt(&sos, &signal.data)
        }
        FilterFamily::None => unreachable!(),
    };

    Ok(Signal::new(signal.fs, data))
}
