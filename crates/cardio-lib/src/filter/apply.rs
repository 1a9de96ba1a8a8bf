//! Filter application: direct-form transfer functions, cascaded
//! second-order sections and the zero-phase forward-backward variants,
//! plus the smoothing kernels the detectors build on.

use super::design::Section;

/// Apply an IIR/FIR transfer function using direct form II transposed.
///
/// `a[0]` is assumed to be 1 (the design routines normalize).
pub fn lfilter(b: &[f64], a: &[f64], x: &[f64]) -> Vec<f64> {
    let nfilt = b.len().max(a.len());
    let mut b_pad = vec![0.0; nfilt];
    let mut a_pad = vec![0.0; nfilt];
    b_pad[..b.len()].copy_from_slice(b);
    a_pad[..a.len()].copy_from_slice(a);

    let state_len = nfilt.saturating_sub(1);
    let mut z = vec![0.0; state_len];
    let mut y = Vec::with_capacity(x.len());

    for &xn in x {
        let yn = b_pad[0] * xn + if state_len > 0 { z[0] } else { 0.0 };
        y.push(yn);
        for i in 0..state_len {
            let next = if i + 1 < state_len { z[i + 1] } else { 0.0 };
            z[i] = b_pad[i + 1] * xn - a_pad[i + 1] * yn + next;
        }
    }
    y
}

/// Run one second-order section over the input (direct form II transposed).
fn section_filter(s: &Section, x: &[f64]) -> Vec<f64> {
    let mut z1 = 0.0;
    let mut z2 = 0.0;
    let mut y = Vec::with_capacity(x.len());
    for &xn in x {
        let yn = s.b[0] * xn + z1;
        z1 = s.b[1] * xn - s.a[1] * yn + z2;
        z2 = s.b[2] * xn - s.a[2] * yn;
        y.push(yn);
    }
    y
}

/// Run the full cascade once, forward.
pub fn sos_filter(sections: &[Section], x: &[f64]) -> Vec<f64> {
    let mut y = x.to_vec();
    for s in sections {
        y = section_filter(s, &y);
    }
    y
}

/// Odd (antisymmetric) reflection padding on both ends.
fn pad_odd(x: &[f64], padlen: usize) -> Vec<f64> {
    let n = x.len();
    let mut out = Vec::with_capacity(n + 2 * padlen);
    for i in (1..=padlen).rev() {
        out.push(2.0 * x[0] - x[i]);
    }
    out.extend_from_slice(x);
    for i in 1..=padlen {
        out.push(2.0 * x[n - 1] - x[n - 1 - i]);
    }
    out
}

fn filtfilt_with(apply: impl Fn(&[f64]) -> Vec<f64>, x: &[f64], padlen: usize) -> Vec<f64> {
    let n = x.len();
    if n == 0 {
        return Vec::new();
    }
    let padlen = padlen.min(n - 1);
    let padded = pad_odd(x, padlen);

    let forward = apply(&padded);
    let reversed: Vec<f64> = forward.into_iter().rev().collect();
    let backward = apply(&reversed);
    let mut y: Vec<f64> = backward.into_iter().rev().collect();

    y.drain(..padlen);
    y.truncate(n);
    y
}

/// Zero-phase forward-backward filtering of a transfer function.
pub fn filtfilt(b: &[f64], a: &[f64], x: &[f64]) -> Vec<f64> {
    let padlen = 3 * b.len().max(a.len());
    filtfilt_with(|seg| lfilter(b, a, seg), x, padlen)
}

/// Zero-phase forward-backward filtering of a section cascade.
pub fn sos_filtfilt(sections: &[Section], x: &[f64]) -> Vec<f64> {
    let padlen = 3 * (2 * sections.len() + 1);
    filtfilt_with(|seg| sos_filter(sections, seg), x, padlen)
}

/// Centered moving average ('same' convolution with a uniform kernel).
pub fn moving_average_same(x: &[f64], win: usize) -> Vec<f64> {
    if x.is_empty() || win <= 1 {
        return x.to_vec();
    }
    let n = x.len();
    let half_left = (win - 1) / 2;
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        // Kernel tap k multiplies x[i + half_left - k]; clip to bounds.
        let lo = i.saturating_sub(win - 1 - half_left);
        let hi = (i + half_left).min(n - 1);
        let sum: f64 = x[lo..=hi].iter().sum();
        out.push(sum / win as f64);
    }
    out
}

/// Gaussian smoothing with reflected boundaries.
///
/// Kernel radius is `4*sigma + 0.5` truncated, matching the common
/// truncate-at-four-sigma convention.
pub fn gaussian_smooth(x: &[f64], sigma: f64) -> Vec<f64> {
    let n = x.len();
    if n == 0 || sigma <= 0.0 {
        return x.to_vec();
    }
    let radius = (4.0 * sigma + 0.5) as usize;
    let mut kernel = Vec::with_capacity(2 * radius + 1);
    for k in 0..=2 * radius {
        let d = k as f64 - radius as f64;
        kernel.push((-0.5 * (d / sigma).powi(2)).exp());
    }
    let sum: f64 = kernel.iter().sum();
    for v in kernel.iter_mut() {
        *v /= sum;
    }

    // Reflect indexing: ... x[1] x[0] | x[0] x[1] ... x[n-1] | x[n-1] x[n-2] ...
    let reflect = |idx: isize| -> usize {
        let period = 2 * n as isize;
        let mut i = idx.rem_euclid(period);
        if i >= n as isize {
            i = period - 1 - i;
        }
        i as usize
    };

    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let mut acc = 0.0;
        for (k, &w) in kernel.iter().enumerate() {
            let idx = i as isize + k as isize - radius as isize;
            acc += w * x[reflect(idx)];
        }
        out.push(acc);
    }
    out
}
