//! Matrix-exponential propagation.
//!
//! `P(t) = exp(W t) P0`, evaluated independently for every requested time
//! with nalgebra's scaling-and-squaring Pade exponential. Exact for a
//! constant generator up to the exponential's own rounding, which grows
//! with `|W t|`.

use nalgebra::{DMatrix, DVector};

/// `exp(W t) P0`; `t == 0` returns `P0` unchanged.
pub fn propagate(w: &DMatrix<f64>, p0: &DVector<f64>, t: f64) -> DVector<f64> {
    if t == 0.0 {
        return p0.clone();
    }
    (w * t).exp() * p0
}

/// `integral_0^T exp(W s) P0 ds` from the augmented generator
///
/// ```text
/// exp([[W T, P0 T], [0, 0]]) = [[exp(W T), integral], [0, 1]]
/// ```
pub fn integrate(w: &DMatrix<f64>, p0: &DVector<f64>, t_end: f64) -> DVector<f64> {
    let n = w.nrows();
    if t_end == 0.0 {
        return DVector::zeros(n);
    }
    let mut augmented = DMatrix::zeros(n + 1, n + 1);
    augmented.view_mut((0, 0), (n, n)).copy_from(&(w * t_end));
    augmented.view_mut((0, n), (n, 1)).copy_from(&(p0 * t_end));
    let exp = augmented.exp();
    exp.column(n).rows(0, n).into_owned()
}
