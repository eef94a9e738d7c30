use crate::CoreError;

/// Floating point type used throughout the workspace.
pub type Real = f64;

/// Absolute/relative tolerance pair.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, CoreError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CoreError::NonFinite { what, value: v })
    }
}

/// Finite and `>= 0`. Rates and drive amplitudes go through this.
pub fn ensure_non_negative(v: Real, what: &'static str) -> Result<Real, CoreError> {
    let v = ensure_finite(v, what)?;
    if v < 0.0 {
        return Err(CoreError::Negative { what, value: v });
    }
    Ok(v)
}

/// Trapezoid rule over a nonuniform grid.
///
/// Returns 0 for fewer than two samples. Lengths must match.
pub fn trapz(y: &[Real], x: &[Real]) -> Result<Real, CoreError> {
    if y.len() != x.len() {
        return Err(CoreError::InvalidArg {
            what: "trapz: unequal array lengths",
        });
    }
    Ok(x.windows(2)
        .zip(y.windows(2))
        .map(|(xs, ys)| (xs[1] - xs[0]) * (ys[0] + ys[1]) / 2.0)
        .sum())
}

/// `n` evenly spaced points from `start` to `end` inclusive.
pub fn linspace(start: Real, end: Real, n: usize) -> Vec<Real> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let delta = (end - start) / (n - 1) as Real;
            let mut points: Vec<Real> = (0..n).map(|i| start + i as Real * delta).collect();
            // Ensure exact endpoint
            points[n - 1] = end;
            points
        }
    }
}

/// `n` logarithmically spaced points from `start` to `end` inclusive.
///
/// Both bounds must be strictly positive.
pub fn logspace(start: Real, end: Real, n: usize) -> Result<Vec<Real>, CoreError> {
    if start <= 0.0 || end <= 0.0 {
        return Err(CoreError::InvalidArg {
            what: "logspace bounds must be strictly positive",
        });
    }
    let mut points: Vec<Real> = linspace(start.ln(), end.ln(), n)
        .into_iter()
        .map(Real::exp)
        .collect();
    if let Some(first) = points.first_mut() {
        *first = start;
    }
    if n > 1 {
        points[n - 1] = end;
    }
    Ok(points)
}
