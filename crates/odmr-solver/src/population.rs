//! Conservation and positivity checks applied to solver output.

use nalgebra::DVector;
use tracing::debug;

use crate::config::PopulationPolicy;
use crate::error::{SolverError, SolverResult};

/// Invariants of an initial population vector that every output sample
/// is checked against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reference {
    /// `sum(P0)`
    pub sum: f64,
    /// `|P0|_1`
    pub l1: f64,
    /// False when `P0` itself has negative components
    pub check_negative: bool,
}

impl Reference {
    pub fn of(p0: &DVector<f64>) -> Self {
        Self {
            sum: p0.sum(),
            l1: p0.iter().map(|v| v.abs()).sum(),
            check_negative: p0.iter().all(|&v| v >= 0.0),
        }
    }
}

impl PopulationPolicy {
    /// Check one output sample against the reference; clamps tolerated
    /// negative components in place.
    pub fn apply(&self, p: &mut DVector<f64>, reference: &Reference) -> SolverResult<()> {
        if let Some(bad) = p.iter().find(|v| !v.is_finite()) {
            return Err(SolverError::NumericalInstability {
                what: format!("non-finite population component {bad}"),
            });
        }

        let drift = (p.sum() - reference.sum).abs();
        let allowed = self.sum_rel_tol * reference.sum.abs().max(1.0);
        if drift > allowed {
            return Err(SolverError::NumericalInstability {
                what: format!(
                    "total population drifted by {drift:e} (sum {:e}, expected {:e})",
                    p.sum(),
                    reference.sum
                ),
            });
        }

        if !reference.check_negative {
            return Ok(());
        }

        let floor = -self.negativity_tol * reference.l1;
        let mut clamped = 0usize;
        for (i, v) in p.iter_mut().enumerate() {
            if *v >= 0.0 {
                continue;
            }
            if *v < floor {
                return Err(SolverError::NumericalInstability {
                    what: format!("population of state {i} is {v:e}, below {floor:e}"),
                });
            }
            if self.clamp_negative {
                *v = 0.0;
                clamped += 1;
            }
        }
        if clamped > 0 {
            debug!(clamped, "Clamped small negative populations to zero");
        }
        Ok(())
    }
}
