//! Adaptive explicit integration of `dP/dt = W(t) P`.

use nalgebra::{DMatrix, DVector};
use tracing::debug;

use crate::config::OdeConfig;
use crate::error::{SolverError, SolverResult};

/// Right-hand side of a linear rate equation.
pub trait RateSystem {
    /// Number of states.
    fn dim(&self) -> usize;

    /// `dP/dt` at time `t` (s).
    fn rhs(&self, t: f64, p: &DVector<f64>) -> SolverResult<DVector<f64>>;
}

/// A constant generator (s^-1).
impl RateSystem for DMatrix<f64> {
    fn dim(&self) -> usize {
        self.nrows()
    }

    fn rhs(&self, _t: f64, p: &DVector<f64>) -> SolverResult<DVector<f64>> {
        Ok(self * p)
    }
}

/// Generator that varies in time, e.g. a pulsed laser or microwave drive.
///
/// The closure receives the time in seconds and returns `W(t)` in s^-1.
pub struct TimeDependentGenerator<F> {
    dim: usize,
    generator: F,
}

impl<F> TimeDependentGenerator<F>
where
    F: Fn(f64) -> DMatrix<f64>,
{
    pub fn new(dim: usize, generator: F) -> Self {
        Self { dim, generator }
    }
}

impl<F> RateSystem for TimeDependentGenerator<F>
where
    F: Fn(f64) -> DMatrix<f64>,
{
    fn dim(&self) -> usize {
        self.dim
    }

    fn rhs(&self, t: f64, p: &DVector<f64>) -> SolverResult<DVector<f64>> {
        let w = (self.generator)(t);
        if w.nrows() != self.dim || w.ncols() != self.dim {
            return Err(SolverError::DimensionMismatch {
                what: "time-dependent generator",
                expected: self.dim,
                actual: if w.nrows() != self.dim { w.nrows() } else { w.ncols() },
            });
        }
        Ok(w * p)
    }
}

// Dormand-Prince 5(4) tableau.
const C2: f64 = 1.0 / 5.0;
const C3: f64 = 3.0 / 10.0;
const C4: f64 = 4.0 / 5.0;
const C5: f64 = 8.0 / 9.0;

const A21: f64 = 1.0 / 5.0;
const A31: f64 = 3.0 / 40.0;
const A32: f64 = 9.0 / 40.0;
const A41: f64 = 44.0 / 45.0;
const A42: f64 = -56.0 / 15.0;
const A43: f64 = 32.0 / 9.0;
const A51: f64 = 19372.0 / 6561.0;
const A52: f64 = -25360.0 / 2187.0;
const A53: f64 = 64448.0 / 6561.0;
const A54: f64 = -212.0 / 729.0;
const A61: f64 = 9017.0 / 3168.0;
const A62: f64 = -355.0 / 33.0;
const A63: f64 = 46732.0 / 5247.0;
const A64: f64 = 49.0 / 176.0;
const A65: f64 = -5103.0 / 18656.0;

// Fifth-order weights (also the last stage row, FSAL).
const B1: f64 = 35.0 / 384.0;
const B3: f64 = 500.0 / 1113.0;
const B4: f64 = 125.0 / 192.0;
const B5: f64 = -2187.0 / 6784.0;
const B6: f64 = 11.0 / 84.0;

// Fifth minus fourth order weights.
const E1: f64 = 71.0 / 57600.0;
const E3: f64 = -71.0 / 16695.0;
const E4: f64 = 71.0 / 1920.0;
const E5: f64 = -17253.0 / 339200.0;
const E6: f64 = 22.0 / 525.0;
const E7: f64 = -1.0 / 40.0;

const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 5.0;

/// One trial step.
struct Step {
    y: DVector<f64>,
    /// Derivative at the new point; the next step's first stage.
    k7: DVector<f64>,
    err: DVector<f64>,
}

/// Dormand-Prince 5(4) with first-same-as-last reuse.
#[derive(Clone, Debug)]
pub struct DormandPrince45;

impl DormandPrince45 {
    fn step<S: RateSystem + ?Sized>(
        &self,
        sys: &S,
        t: f64,
        y: &DVector<f64>,
        k1: &DVector<f64>,
        h: f64,
    ) -> SolverResult<Step> {
        let k2 = sys.rhs(t + C2 * h, &(y + k1 * (h * A21)))?;
        let k3 = sys.rhs(t + C3 * h, &(y + (k1 * A31 + &k2 * A32) * h))?;
        let k4 = sys.rhs(t + C4 * h, &(y + (k1 * A41 + &k2 * A42 + &k3 * A43) * h))?;
        let k5 = sys.rhs(
            t + C5 * h,
            &(y + (k1 * A51 + &k2 * A52 + &k3 * A53 + &k4 * A54) * h),
        )?;
        let k6 = sys.rhs(
            t + h,
            &(y + (k1 * A61 + &k2 * A62 + &k3 * A63 + &k4 * A64 + &k5 * A65) * h),
        )?;
        let y_new = y + (k1 * B1 + &k3 * B3 + &k4 * B4 + &k5 * B5 + &k6 * B6) * h;
        let k7 = sys.rhs(t + h, &y_new)?;
        let err = (k1 * E1 + &k3 * E3 + &k4 * E4 + &k5 * E5 + &k6 * E6 + &k7 * E7) * h;
        Ok(Step { y: y_new, k7, err })
    }

    /// Integrate from `t = 0` and sample at every `t_eval` (any order, all
    /// `>= 0`). Samples are returned in the order of `t_eval`.
    pub fn integrate<S: RateSystem + ?Sized>(
        &self,
        sys: &S,
        p0: &DVector<f64>,
        t_eval: &[f64],
        cfg: &OdeConfig,
    ) -> SolverResult<Vec<DVector<f64>>> {
        let mut order: Vec<usize> = (0..t_eval.len()).collect();
        order.sort_by(|&a, &b| t_eval[a].total_cmp(&t_eval[b]));

        let mut out = vec![DVector::zeros(0); t_eval.len()];
        let mut t = 0.0;
        let mut y = p0.clone();
        let mut k1 = sys.rhs(t, &y)?;
        let mut h = match cfg.h_init {
            Some(h) => h,
            None => initial_step(&y, &k1, cfg),
        };
        let mut accepted = 0usize;
        let mut rejected = 0usize;

        for idx in order {
            let target = t_eval[idx];
            while t < target {
                if accepted + rejected >= cfg.max_steps {
                    return Err(SolverError::ConvergenceFailed {
                        what: format!(
                            "step budget of {} exhausted at t = {t:e} s",
                            cfg.max_steps
                        ),
                    });
                }
                let remaining = target - t;
                let lands = h >= remaining;
                let h_try = if lands { remaining } else { h };

                let step = self.step(sys, t, &y, &k1, h_try)?;
                let err = error_norm(&step.err, &y, &step.y, cfg);
                if !err.is_finite() {
                    return Err(SolverError::NumericalInstability {
                        what: format!("non-finite error estimate at t = {t:e} s"),
                    });
                }

                if err <= 1.0 {
                    t = if lands { target } else { t + h_try };
                    y = step.y;
                    k1 = step.k7;
                    accepted += 1;
                    let factor = if err == 0.0 {
                        MAX_FACTOR
                    } else {
                        (cfg.safety * err.powf(-0.2)).clamp(MIN_FACTOR, MAX_FACTOR)
                    };
                    // A short landing step says nothing about the free step size.
                    h = if lands { h.max(h_try * factor) } else { h_try * factor };
                } else {
                    rejected += 1;
                    h = h_try * (cfg.safety * err.powf(-0.2)).max(MIN_FACTOR);
                    if h < cfg.h_min {
                        return Err(SolverError::ConvergenceFailed {
                            what: format!("step size {h:e} s below minimum at t = {t:e} s"),
                        });
                    }
                }
            }
            out[idx] = y.clone();
        }

        debug!(accepted, rejected, t_end = t, "Dormand-Prince integration finished");
        Ok(out)
    }
}

/// RMS of the error scaled by `atol + rtol * max(|y|, |y_new|)`.
fn error_norm(err: &DVector<f64>, y: &DVector<f64>, y_new: &DVector<f64>, cfg: &OdeConfig) -> f64 {
    let n = err.len();
    if n == 0 {
        return 0.0;
    }
    let sum: f64 = (0..n)
        .map(|i| {
            let scale = cfg.atol + cfg.rtol * y[i].abs().max(y_new[i].abs());
            (err[i] / scale).powi(2)
        })
        .sum();
    (sum / n as f64).sqrt()
}

/// Initial step from the ratio of state to slope magnitude.
fn initial_step(y: &DVector<f64>, f: &DVector<f64>, cfg: &OdeConfig) -> f64 {
    let n = y.len().max(1) as f64;
    let (mut d0, mut d1) = (0.0, 0.0);
    for i in 0..y.len() {
        let scale = cfg.atol + cfg.rtol * y[i].abs();
        d0 += (y[i] / scale).powi(2);
        d1 += (f[i] / scale).powi(2);
    }
    let (d0, d1) = ((d0 / n).sqrt(), (d1 / n).sqrt());
    if d0 < 1e-5 || d1 < 1e-5 {
        1e-6
    } else {
        0.01 * d0 / d1
    }
}
