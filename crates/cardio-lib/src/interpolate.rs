//! Discrete-to-continuous interpolation.
//!
//! An interpolating natural cubic spline (zero smoothing: the curve passes
//! through every input point exactly) densifies irregularly-timed series
//! such as beat-to-beat heart rate onto the integer sample grid.

use crate::error::{CardioError, Result};
use crate::signal::{DenseSeries, RateSeries};

/// Minimum number of points for a degree-3 spline fit.
pub const MIN_SPLINE_POINTS: usize = 4;

/// A fitted natural cubic spline over strictly increasing knots.
#[derive(Debug, Clone)]
pub struct CubicSpline {
    x: Vec<f64>,
    y: Vec<f64>,
    /// Per-interval polynomial coefficients: y + b*t + c*t^2 + d*t^3 with
    /// t the offset from the left knot.
    b: Vec<f64>,
    c: Vec<f64>,
    d: Vec<f64>,
}

impl CubicSpline {
    /// Fit an interpolating spline. Fails with
    /// [`CardioError::InsufficientData`] for fewer than
    /// [`MIN_SPLINE_POINTS`] points.
    pub fn fit(x: &[f64], y: &[f64]) -> Result<Self> {
        let n = x.len().min(y.len());
        if n < MIN_SPLINE_POINTS {
            return Err(CardioError::InsufficientData {
                needed: MIN_SPLINE_POINTS,
                got: n,
            });
        }
        let x = &x[..n];
        let y = &y[..n];

        let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();

        // Natural boundary: second derivative zero at both ends. Interior
        // rows follow the spline continuity conditions; solved with the
        // Thomas algorithm.
        let mut lower = vec![0.0; n];
        let mut diag = vec![0.0; n];
        let mut upper = vec![0.0; n];
        let mut rhs = vec![0.0; n];

        diag[0] = 1.0;
        diag[n - 1] = 1.0;
        for i in 1..n - 1 {
            lower[i] = h[i - 1];
            diag[i] = 2.0 * (h[i - 1] + h[i]);
            upper[i] = h[i];
            rhs[i] = 3.0 * ((y[i + 1] - y[i]) / h[i] - (y[i] - y[i - 1]) / h[i - 1]);
        }

        let c = solve_tridiagonal(&lower, &diag, &upper, &rhs);

        let mut b = vec![0.0; n - 1];
        let mut d = vec![0.0; n - 1];
        for i in 0..n - 1 {
            b[i] = (y[i + 1] - y[i]) / h[i] - h[i] * (2.0 * c[i] + c[i + 1]) / 3.0;
            d[i] = (c[i + 1] - c[i]) / (3.0 * h[i]);
        }

        Ok(Self {
            x: x.to_vec(),
            y: y.to_vec(),
            b,
            c,
            d,
        })
    }

    /// Evaluate at `xi`; outside the knot span the end polynomials
    /// extrapolate.
    pub fn evaluate(&self, xi: f64) -> f64 {
        let i = self.interval(xi);
        let t = xi - self.x[i];
        self.y[i] + self.b[i] * t + self.c[i] * t * t + self.d[i] * t * t * t
    }

    fn interval(&self, xi: f64) -> usize {
        let n = self.x.len();
        if xi <= self.x[0] {
            return 0;
        }
        if xi >= self.x[n - 1] {
            return n - 2;
        }
        // Binary search for the left knot.
        let mut lo = 0;
        let mut hi = n - 1;
        while hi - lo > 1 {
            let mid = (lo + hi) / 2;
            if self.x[mid] <= xi {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        lo
    }
}

/// Thomas algorithm for a tridiagonal system; `diag` is never zero for the
/// spline matrices built above.
fn solve_tridiagonal(lower: &[f64], diag: &[f64], upper: &[f64], rhs: &[f64]) -> Vec<f64> {
    let n = diag.len();
    let mut c_prime = vec![0.0; n];
    let mut d_prime = vec![0.0; n];

    c_prime[0] = upper[0] / diag[0];
    d_prime[0] = rhs[0] / diag[0];
    for i in 1..n {
        let m = diag[i] - lower[i] * c_prime[i - 1];
        c_prime[i] = upper[i] / m;
        d_prime[i] = (rhs[i] - lower[i] * d_prime[i - 1]) / m;
    }

    let mut x = vec![0.0; n];
    x[n - 1] = d_prime[n - 1];
    for i in (0..n - 1).rev() {
        x[i] = d_prime[i] - c_prime[i] * x[i + 1];
    }
    x
}

/// Densify a discrete rate series onto the integer sample grid.
///
/// The spline is evaluated at every integer index from the first anchor up
/// to (excluding) the last, covering that span only; callers pad the
/// remaining signal edges themselves.
pub fn densify(series: &RateSeries) -> Result<DenseSeries> {
    let n = series.len().min(series.indices.len());
    if n < MIN_SPLINE_POINTS {
        return Err(CardioError::InsufficientData {
            needed: MIN_SPLINE_POINTS,
            got: n,
        });
    }

    let start = series.indices[0];
    let x: Vec<f64> = series.indices[..n]
        .iter()
        .map(|&i| (i - start) as f64)
        .collect();
    let spline = CubicSpline::fit(&x, &series.bpm[..n])?;

    let span = series.indices[n - 1] - start;
    let values = (0..span).map(|t| spline.evaluate(t as f64)).collect();

    Ok(DenseSeries { start, values })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn spline_reproduces_knot_values_exactly() {
        let x = [0.0, 3.0, 7.0, 12.0, 20.0, 21.5];
        let y = [4.0, 5.0, 1.0, 2.0, -3.0, 0.5];
        let spline = CubicSpline::fit(&x, &y).unwrap();
        for (xi, yi) in x.iter().zip(y.iter()) {
            assert_close(spline.evaluate(*xi), *yi, 1e-9);
        }
    }

    #[test]
    fn spline_is_linear_for_linear_data() {
        let x = [0.0, 1.0, 2.0, 3.0, 4.0];
        let y: Vec<f64> = x.iter().map(|v| 2.0 * v + 1.0).collect();
        let spline = CubicSpline::fit(&x, &y).unwrap();
        assert_close(spline.evaluate(0.5), 2.0, 1e-9);
        assert_close(spline.evaluate(2.7), 6.4, 1e-9);
    }

    #[test]
    fn too_few_points_is_an_error() {
        let err = CubicSpline::fit(&[0.0, 1.0, 2.0], &[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(
            err,
            CardioError::InsufficientData { needed: 4, got: 3 }
        ));
    }

    #[test]
    fn densify_covers_first_to_last_anchor() {
        let series = RateSeries {
            indices: vec![100, 350, 600, 850, 1100],
            bpm: vec![60.0, 62.0, 58.0, 61.0, 60.0],
        };
        let dense = densify(&series).unwrap();
        assert_eq!(dense.start, 100);
        assert_eq!(dense.values.len(), 1000);
        // The dense grid hits every anchor except the excluded last one.
        assert_close(dense.values[0], 60.0, 1e-9);
        assert_close(dense.values[250], 62.0, 1e-9);
        assert_close(dense.values[500], 58.0, 1e-9);
        assert_close(dense.values[750], 61.0, 1e-9);
    }

    #[test]
    fn densify_with_three_beats_fails() {
        let series = RateSeries {
            indices: vec![100, 350, 600],
            bpm: vec![60.0, 62.0, 58.0],
        };
        assert!(matches!(
            densify(&series),
            Err(CardioError::InsufficientData { .. })
        ));
    }
}
