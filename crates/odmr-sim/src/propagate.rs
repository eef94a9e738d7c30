//! Choice of propagation route for sampled protocols.

use nalgebra::{DMatrix, DVector};
use odmr_solver::{RateSolver, SolverResult, Trajectory};

/// How a protocol turns `(W, P0, times)` into a trajectory.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Propagator {
    /// Matrix exponential per sample (default; exact for constant drives).
    #[default]
    Expm,
    /// Adaptive Dormand-Prince integration. Explicit, so long windows on
    /// stiff generators cost many steps.
    Ode,
}

impl Propagator {
    pub fn propagate(
        self,
        solver: &RateSolver,
        w: &DMatrix<f64>,
        p0: &DVector<f64>,
        times: &[f64],
    ) -> SolverResult<Trajectory> {
        match self {
            Propagator::Expm => solver.solve_expm(w, p0, times),
            Propagator::Ode => solver.solve_ode(w, p0, times),
        }
    }
}
