//! Analog prototype generation and digital filter design.
//!
//! Lowpass prototypes (cutoff = 1 rad/s) in zero/pole/gain form for
//! Butterworth, Chebyshev I/II, elliptic and Bessel families, plus the
//! lp->lp/hp/bp/bs frequency transforms, the bilinear transform and the
//! conversion to second-order sections. FIR design uses the windowed-sinc
//! method with a Hamming window.

use num_complex::Complex64;
use std::f64::consts::PI;

use super::FilterBand;

/// Passband ripple (dB) used by the Chebyshev I and elliptic prototypes.
const PASSBAND_RIPPLE_DB: f64 = 1.0;
/// Stopband attenuation (dB) used by the Chebyshev II and elliptic prototypes.
const STOPBAND_ATTEN_DB: f64 = 40.0;

/// A filter in zero/pole/gain form.
#[derive(Debug, Clone)]
pub struct Zpk {
    pub zeros: Vec<Complex64>,
    pub poles: Vec<Complex64>,
    pub gain: f64,
}

/// One second-order section, normalized so a0 = 1.
#[derive(Debug, Clone, Copy)]
pub struct Section {
    pub b: [f64; 3],
    pub a: [f64; 3],
}

// ---------------------------------------------------------------------------
// Analog lowpass prototypes
// ---------------------------------------------------------------------------

/// Butterworth poles, evenly spaced on the left half of the unit circle.
pub fn butterworth_prototype(order: usize) -> Zpk {
    let n = order;
    let mut poles = Vec::with_capacity(n);
    for k in 0..n {
        let angle = PI * (2 * k + n + 1) as f64 / (2 * n) as f64;
        poles.push(Complex64::new(angle.cos(), angle.sin()));
    }
    Zpk {
        zeros: Vec::new(),
        poles,
        gain: 1.0,
    }
}

/// Chebyshev type I prototype: equiripple passband, monotonic stopband.
pub fn cheby1_prototype(order: usize) -> Zpk {
    let n = order;
    let eps = (10.0_f64.powf(PASSBAND_RIPPLE_DB / 10.0) - 1.0).sqrt();
    let mu = (1.0 / eps).asinh() / n as f64;

    let mut poles = Vec::with_capacity(n);
    for k in 0..n {
        let theta = PI * (2 * k + 1) as f64 / (2 * n) as f64;
        poles.push(Complex64::new(
            -mu.sinh() * theta.sin(),
            mu.cosh() * theta.cos(),
        ));
    }

    let mut gain = poles.iter().map(|p| p.norm()).product::<f64>();
    // Even orders sit at the ripple floor at DC; odd orders peak at 1.
    if n % 2 == 0 {
        gain /= (1.0 + eps * eps).sqrt();
    }

    Zpk {
        zeros: Vec::new(),
        poles,
        gain,
    }
}

/// Chebyshev type II prototype: monotonic passband, equiripple stopband.
pub fn cheby2_prototype(order: usize) -> Zpk {
    let n = order;
    let de = 1.0 / (10.0_f64.powf(STOPBAND_ATTEN_DB / 10.0) - 1.0).sqrt();
    let mu = (1.0 / de).asinh() / n as f64;

    let mut poles = Vec::with_capacity(n);
    let mut zeros = Vec::new();
    for k in 0..n {
        let theta = PI * (2 * k + 1) as f64 / (2 * n) as f64;
        let p = Complex64::new(-mu.sinh() * theta.sin(), mu.cosh() * theta.cos());
        // Type II poles are the inverted type I poles.
        poles.push(p.conj() / p.norm_sqr());

        // Zeros on the imaginary axis at 1/cos(theta), skipping theta = pi/2.
        if theta.cos().abs() > 1e-10 && k < (n + 1) / 2 {
            let z_im = 1.0 / theta.cos();
            zeros.push(Complex64::new(0.0, z_im));
            zeros.push(Complex64::new(0.0, -z_im));
        }
    }

    // Normalize for unit DC gain: k = prod(-p) / prod(-z), real for the
    // conjugate-paired roots above.
    let num: f64 = zeros.iter().map(|z| z.norm()).product();
    let den: f64 = poles.iter().map(|p| p.norm()).product();
    let gain = den / num;

    Zpk { zeros, poles, gain }
}

/// Elliptic prototype approximated as Chebyshev I poles plus imaginary-axis
/// zeros placed by the selectivity factor. A full implementation would need
/// elliptic integrals; the approximation keeps the equiripple passband and
/// the sharpened transition.
pub fn elliptic_prototype(order: usize) -> Zpk {
    let n = order;
    let eps_p = (10.0_f64.powf(PASSBAND_RIPPLE_DB / 10.0) - 1.0).sqrt();
    let eps_s = (10.0_f64.powf(STOPBAND_ATTEN_DB / 10.0) - 1.0).sqrt();
    let selectivity = eps_p / eps_s;

    let mu = (1.0 / eps_p).asinh() / n as f64;
    let mut poles = Vec::with_capacity(n);
    let mut zeros = Vec::new();
    for k in 0..n {
        let theta = PI * (2 * k + 1) as f64 / (2 * n) as f64;
        poles.push(Complex64::new(
            -mu.sinh() * theta.sin(),
            mu.cosh() * theta.cos(),
        ));
    }
    for k in 0..n / 2 {
        let theta = PI * (2 * k + 1) as f64 / (2 * n) as f64;
        let z_im = 1.0 / (selectivity * theta.sin());
        zeros.push(Complex64::new(0.0, z_im));
        zeros.push(Complex64::new(0.0, -z_im));
    }

    let mut gain: f64 = poles.iter().map(|p| p.norm()).product();
    for z in &zeros {
        let m = z.norm();
        if m > 1e-10 {
            gain /= m;
        }
    }
    if n % 2 == 0 {
        gain /= (1.0 + eps_p * eps_p).sqrt();
    }

    Zpk { zeros, poles, gain }
}

/// Bessel-Thomson prototype: maximally flat group delay.
///
/// Pole positions are tabulated through order 8; higher orders use an
/// asymptotic approximation.
pub fn bessel_prototype(order: usize) -> Zpk {
    let table: Vec<(f64, f64)> = match order {
        1 => vec![(-1.0, 0.0)],
        2 => vec![(-1.1016, 0.6368), (-1.1016, -0.6368)],
        3 => vec![(-1.0509, 0.9991), (-1.0509, -0.9991), (-1.3226, 0.0)],
        4 => vec![
            (-0.9952, 1.2571),
            (-0.9952, -1.2571),
            (-1.3700, 0.4102),
            (-1.3700, -0.4102),
        ],
        5 => vec![
            (-0.9576, 1.4711),
            (-0.9576, -1.4711),
            (-1.3808, 0.7179),
            (-1.3808, -0.7179),
            (-1.5023, 0.0),
        ],
        6 => vec![
            (-0.9306, 1.6618),
            (-0.9306, -1.6618),
            (-1.3818, 0.9714),
            (-1.3818, -0.9714),
            (-1.5714, 0.3213),
            (-1.5714, -0.3213),
        ],
        7 => vec![
            (-0.9098, 1.8364),
            (-0.9098, -1.8364),
            (-1.3789, 1.1915),
            (-1.3789, -1.1915),
            (-1.6120, 0.5896),
            (-1.6120, -0.5896),
            (-1.6843, 0.0),
        ],
        8 => vec![
            (-0.8928, 1.9983),
            (-0.8928, -1.9983),
            (-1.3738, 1.3884),
            (-1.3738, -1.3884),
            (-1.6369, 0.8227),
            (-1.6369, -0.8227),
            (-1.7574, 0.2728),
            (-1.7574, -0.2728),
        ],
        n => {
            let r = 1.0 + 0.5 / n as f64;
            (0..n)
                .map(|k| {
                    let theta = PI * (2 * k + 1) as f64 / (2 * n) as f64;
                    (-r * theta.sin(), r * theta.cos())
                })
                .collect()
        }
    };

    let poles: Vec<Complex64> = table
        .into_iter()
        .map(|(re, im)| Complex64::new(re, im))
        .collect();
    let gain = poles.iter().map(|p| p.norm()).product();

    Zpk {
        zeros: Vec::new(),
        poles,
        gain,
    }
}

// ---------------------------------------------------------------------------
// Frequency transforms (analog, zpk form)
// ---------------------------------------------------------------------------

/// s -> s / w0
fn lp_to_lp(proto: &Zpk, w0: f64) -> Zpk {
    let degree = proto.poles.len() as i32 - proto.zeros.len() as i32;
    Zpk {
        zeros: proto.zeros.iter().map(|&z| z * w0).collect(),
        poles: proto.poles.iter().map(|&p| p * w0).collect(),
        gain: proto.gain * w0.powi(degree),
    }
}

/// s -> w0 / s
fn lp_to_hp(proto: &Zpk, w0: f64) -> Zpk {
    let w0c = Complex64::new(w0, 0.0);
    let mut zeros: Vec<Complex64> = proto.zeros.iter().map(|&z| w0c / z).collect();
    // Degree difference becomes zeros at the origin.
    zeros.resize(proto.poles.len(), Complex64::new(0.0, 0.0));
    let poles: Vec<Complex64> = proto.poles.iter().map(|&p| w0c / p).collect();

    let num: Complex64 = proto.zeros.iter().map(|&z| -z).product();
    let den: Complex64 = proto.poles.iter().map(|&p| -p).product();
    let gain = proto.gain * (num / den).re;

    Zpk { zeros, poles, gain }
}

/// s -> (s^2 + w0^2) / (bw * s); every root splits into a pair.
fn lp_to_bp(proto: &Zpk, w0: f64, bw: f64) -> Zpk {
    let split = |s: Complex64| -> (Complex64, Complex64) {
        let half = s * bw / 2.0;
        let disc = (half * half - Complex64::new(w0 * w0, 0.0)).sqrt();
        (half + disc, half - disc)
    };

    let mut zeros = Vec::with_capacity(2 * proto.poles.len());
    for &z in &proto.zeros {
        let (a, b) = split(z);
        zeros.push(a);
        zeros.push(b);
    }
    zeros.resize(
        proto.zeros.len() + proto.poles.len(),
        Complex64::new(0.0, 0.0),
    );

    let mut poles = Vec::with_capacity(2 * proto.poles.len());
    for &p in &proto.poles {
        let (a, b) = split(p);
        poles.push(a);
        poles.push(b);
    }

    let degree = proto.poles.len() as i32 - proto.zeros.len() as i32;
    Zpk {
        zeros,
        poles,
        gain: proto.gain * bw.powi(degree),
    }
}

/// s -> bw * s / (s^2 + w0^2)
fn lp_to_bs(proto: &Zpk, w0: f64, bw: f64) -> Zpk {
    let split = |s: Complex64| -> (Complex64, Complex64) {
        let inv = Complex64::new(bw, 0.0) / s / 2.0;
        let disc = (inv * inv - Complex64::new(w0 * w0, 0.0)).sqrt();
        (inv + disc, inv - disc)
    };

    let mut zeros = Vec::with_capacity(2 * proto.poles.len());
    for &z in &proto.zeros {
        let (a, b) = split(z);
        zeros.push(a);
        zeros.push(b);
    }
    // Degree difference becomes zero pairs at +/- j*w0.
    for _ in proto.zeros.len()..proto.poles.len() {
        zeros.push(Complex64::new(0.0, w0));
        zeros.push(Complex64::new(0.0, -w0));
    }

    let mut poles = Vec::with_capacity(2 * proto.poles.len());
    for &p in &proto.poles {
        let (a, b) = split(p);
        poles.push(a);
        poles.push(b);
    }

    let num: Complex64 = proto.zeros.iter().map(|&z| -z).product();
    let den: Complex64 = proto.poles.iter().map(|&p| -p).product();
    let gain = proto.gain * (num / den).re;

    Zpk { zeros, poles, gain }
}

// ---------------------------------------------------------------------------
// Bilinear transform
// ---------------------------------------------------------------------------

/// Map an analog zpk filter onto the unit circle, z = (2fs + s)/(2fs - s).
fn bilinear(analog: &Zpk, fs: f64) -> Zpk {
    let fs2 = Complex64::new(2.0 * fs, 0.0);
    let map = |s: Complex64| (fs2 + s) / (fs2 - s);

    let mut zeros: Vec<Complex64> = analog.zeros.iter().map(|&z| map(z)).collect();
    let poles: Vec<Complex64> = analog.poles.iter().map(|&p| map(p)).collect();
    // Zeros at infinity map to z = -1.
    zeros.resize(analog.poles.len(), Complex64::new(-1.0, 0.0));

    let num: Complex64 = analog.zeros.iter().map(|&z| fs2 - z).product();
    let den: Complex64 = analog.poles.iter().map(|&p| fs2 - p).product();
    let gain = analog.gain * (num / den).re;

    Zpk { zeros, poles, gain }
}

/// Pre-warp a normalized critical frequency for the bilinear transform.
fn prewarp(wn: f64, fs: f64) -> f64 {
    2.0 * fs * (PI * wn / 2.0).tan()
}

// ---------------------------------------------------------------------------
// Second-order sections
// ---------------------------------------------------------------------------

/// Split roots into conjugate pairs and leftover real roots.
///
/// Complex roots are assumed to arrive in conjugate pairs (the prototypes
/// and transforms above construct them that way); only the positive-imag
/// half is kept.
fn split_roots(roots: &[Complex64]) -> (Vec<Complex64>, Vec<f64>) {
    const TOL: f64 = 1e-8;
    let mut complex: Vec<Complex64> = roots
        .iter()
        .filter(|r| r.im > TOL)
        .copied()
        .collect();
    let mut real: Vec<f64> = roots
        .iter()
        .filter(|r| r.im.abs() <= TOL)
        .map(|r| r.re)
        .collect();
    complex.sort_by(|a, b| {
        b.im.partial_cmp(&a.im)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.re.partial_cmp(&b.re).unwrap_or(std::cmp::Ordering::Equal))
    });
    real.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    (complex, real)
}

/// Convert a digital zpk filter to cascaded second-order sections.
///
/// Conjugate pole pairs form biquads; leftover real poles are paired two at
/// a time, with at most one first-order trailing section. Zeros are consumed
/// the same way and the overall gain folds into the first section.
pub fn zpk_to_sos(digital: &Zpk) -> Vec<Section> {
    let (mut cz, mut rz) = split_roots(&digital.zeros);
    let (mut cp, mut rp) = split_roots(&digital.poles);

    let mut next_pair = |complex: &mut Vec<Complex64>, real: &mut Vec<f64>| -> Option<[f64; 3]> {
        if let Some(c) = complex.pop() {
            // c and conj(c): (x - c)(x - conj(c)) = x^2 - 2 Re(c) x + |c|^2
            Some([1.0, -2.0 * c.re, c.norm_sqr()])
        } else if real.len() >= 2 {
            let r2 = real.pop().unwrap_or(0.0);
            let r1 = real.pop().unwrap_or(0.0);
            Some([1.0, -(r1 + r2), r1 * r2])
        } else if let Some(r) = real.pop() {
            Some([1.0, -r, 0.0])
        } else {
            None
        }
    };

    let mut sections = Vec::new();
    loop {
        let a = next_pair(&mut cp, &mut rp);
        let b = next_pair(&mut cz, &mut rz);
        match (a, b) {
            (None, None) => break,
            (a, b) => sections.push(Section {
                b: b.unwrap_or([1.0, 0.0, 0.0]),
                a: a.unwrap_or([1.0, 0.0, 0.0]),
            }),
        }
    }

    if sections.is_empty() {
        sections.push(Section {
            b: [1.0, 0.0, 0.0],
            a: [1.0, 0.0, 0.0],
        });
    }
    for coeff in sections[0].b.iter_mut() {
        *coeff *= digital.gain;
    }
    sections
}

/// Design a digital IIR filter as second-order sections.
///
/// `wn` holds one or two critical frequencies normalized to Nyquist (0..1).
/// The prototype is pre-warped, frequency-transformed and mapped with the
/// bilinear transform at the normalized rate fs = 2.
pub fn design_iir(prototype: &Zpk, wn: &[f64], band: FilterBand) -> Vec<Section> {
    let fs = 2.0;
    let warped: Vec<f64> = wn.iter().map(|&w| prewarp(w, fs)).collect();

    let analog = match band {
        FilterBand::Lowpass => lp_to_lp(prototype, warped[0]),
        FilterBand::Highpass => lp_to_hp(prototype, warped[0]),
        FilterBand::Bandpass => {
            let w0 = (warped[0] * warped[1]).sqrt();
            lp_to_bp(prototype, w0, warped[1] - warped[0])
        }
        FilterBand::Bandstop => {
            let w0 = (warped[0] * warped[1]).sqrt();
            lp_to_bs(prototype, w0, warped[1] - warped[0])
        }
    };

    zpk_to_sos(&bilinear(&analog, fs))
}

// ---------------------------------------------------------------------------
// FIR design (windowed sinc, Hamming)
// ---------------------------------------------------------------------------

fn hamming(taps: usize) -> Vec<f64> {
    if taps == 1 {
        return vec![1.0];
    }
    (0..taps)
        .map(|k| 0.54 - 0.46 * (2.0 * PI * k as f64 / (taps - 1) as f64).cos())
        .collect()
}

/// Windowed-sinc lowpass kernel with unity DC gain. `fc` is in cycles per
/// sample (cutoff_hz / fs).
fn fir_lowpass(taps: usize, fc: f64) -> Vec<f64> {
    let window = hamming(taps);
    let mid = (taps - 1) as f64 / 2.0;
    let mut h: Vec<f64> = (0..taps)
        .map(|k| {
            let m = k as f64 - mid;
            let x = 2.0 * fc * m;
            let sinc = if x.abs() < 1e-12 {
                1.0
            } else {
                (PI * x).sin() / (PI * x)
            };
            2.0 * fc * sinc * window[k]
        })
        .collect();
    let sum: f64 = h.iter().sum();
    if sum.abs() > 1e-30 {
        for v in h.iter_mut() {
            *v /= sum;
        }
    }
    h
}

/// Spectral inversion; requires an odd tap count.
fn invert(mut h: Vec<f64>) -> Vec<f64> {
    for v in h.iter_mut() {
        *v = -*v;
    }
    let mid = h.len() / 2;
    h[mid] += 1.0;
    h
}

/// Windowed-sinc FIR kernel for the requested band. `wn` is normalized to
/// Nyquist (0..1). Highpass and bandstop kernels force an odd tap count.
pub fn design_fir(order: usize, wn: &[f64], band: FilterBand) -> Vec<f64> {
    let mut taps = order.max(3);
    if matches!(band, FilterBand::Highpass | FilterBand::Bandstop) && taps % 2 == 0 {
        taps += 1;
    }

    match band {
        FilterBand::Lowpass => fir_lowpass(taps, wn[0] / 2.0),
        FilterBand::Highpass => invert(fir_lowpass(taps, wn[0] / 2.0)),
        FilterBand::Bandpass => {
            let low = fir_lowpass(taps, wn[0] / 2.0);
            let high = fir_lowpass(taps, wn[1] / 2.0);
            high.iter().zip(&low).map(|(h, l)| h - l).collect()
        }
        FilterBand::Bandstop => {
            let low = fir_lowpass(taps, wn[0] / 2.0);
            let high = fir_lowpass(taps, wn[1] / 2.0);
            invert(high.iter().zip(&low).map(|(h, l)| h - l).collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::apply::sos_filtfilt;

    #[test]
    fn butterworth_poles_in_left_half_plane() {
        let proto = butterworth_prototype(4);
        assert_eq!(proto.poles.len(), 4);
        for p in &proto.poles {
            assert!(p.re < 0.0, "unstable pole {p}");
        }
    }

    #[test]
    fn first_order_lowpass_matches_known_coefficients() {
        // butter(1, 0.5) in normalized form: b = [0.5, 0.5], a = [1, 0].
        let sos = design_iir(&butterworth_prototype(1), &[0.5], FilterBand::Lowpass);
        assert_eq!(sos.len(), 1);
        let s = &sos[0];
        assert!((s.b[0] - 0.5).abs() < 1e-9, "b0 = {}", s.b[0]);
        assert!((s.b[1] - 0.5).abs() < 1e-9, "b1 = {}", s.b[1]);
        assert!(s.a[1].abs() < 1e-9, "a1 = {}", s.a[1]);
    }

    #[test]
    fn lowpass_passes_dc_and_rejects_nyquist() {
        let sos = design_iir(&butterworth_prototype(4), &[0.2], FilterBand::Lowpass);
        let n = 512;
        let dc: Vec<f64> = vec![1.0; n];
        let nyq: Vec<f64> = (0..n).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let dc_out = sos_filtfilt(&sos, &dc);
        let nyq_out = sos_filtfilt(&sos, &nyq);
        assert!((dc_out[n / 2] - 1.0).abs() < 1e-3);
        assert!(nyq_out[n / 2].abs() < 1e-3);
    }

    #[test]
    fn every_family_passes_dc_at_unit_gain() {
        // Odd orders for the equiripple-passband families; their even
        // orders legitimately sit at the ripple floor at DC.
        let cases = [
            (
                design_iir(&butterworth_prototype(4), &[0.3], FilterBand::Lowpass),
                "butterworth",
            ),
            (
                design_iir(&cheby1_prototype(3), &[0.3], FilterBand::Lowpass),
                "cheby1",
            ),
            (
                design_iir(&cheby2_prototype(4), &[0.3], FilterBand::Lowpass),
                "cheby2",
            ),
            (
                design_iir(&elliptic_prototype(3), &[0.3], FilterBand::Lowpass),
                "elliptic",
            ),
            (
                design_iir(&bessel_prototype(4), &[0.3], FilterBand::Lowpass),
                "bessel",
            ),
        ];
        let dc = vec![1.0; 512];
        for (sos, name) in cases {
            let out = sos_filtfilt(&sos, &dc);
            assert!(
                (out[256] - 1.0).abs() < 1e-6,
                "{name}: dc gain {}",
                out[256]
            );
        }
    }

    #[test]
    fn cheby2_bandpass_preserves_in_band_tone() {
        let fs = 250.0;
        let nyquist = fs / 2.0;
        let sos = design_iir(
            &cheby2_prototype(4),
            &[3.0 / nyquist, 45.0 / nyquist],
            FilterBand::Bandpass,
        );
        let n = 2000;
        let tone: Vec<f64> = (0..n)
            .map(|i| (2.0 * PI * 10.0 * i as f64 / fs).sin())
            .collect();
        let out = sos_filtfilt(&sos, &tone);
        let rms = |x: &[f64]| (x.iter().map(|v| v * v).sum::<f64>() / x.len() as f64).sqrt();
        let ratio = rms(&out[400..1600]) / rms(&tone[400..1600]);
        assert!(
            ratio > 0.7 && ratio < 1.3,
            "in-band gain {ratio}"
        );
    }

    #[test]
    fn highpass_rejects_dc() {
        let sos = design_iir(&butterworth_prototype(2), &[0.1], FilterBand::Highpass);
        let dc: Vec<f64> = vec![1.0; 512];
        let out = sos_filtfilt(&sos, &dc);
        assert!(out[256].abs() < 1e-6, "dc leak {}", out[256]);
    }

    #[test]
    fn fir_highpass_forces_odd_taps() {
        let h = design_fir(10, &[0.2], FilterBand::Highpass);
        assert_eq!(h.len() % 2, 1);
        // DC gain of a highpass kernel is ~0.
        let dc: f64 = h.iter().sum();
        assert!(dc.abs() < 1e-6, "dc gain {dc}");
    }

    #[test]
    fn fir_lowpass_unity_dc_gain() {
        let h = design_fir(33, &[0.3], FilterBand::Lowpass);
        let dc: f64 = h.iter().sum();
        assert!((dc - 1.0).abs() < 1e-9);
    }
}
