//! Entry point tying validation, propagation and population checks together.

use nalgebra::{DMatrix, DVector};
use tracing::debug;

use crate::config::SolverConfig;
use crate::error::{SolverError, SolverResult};
use crate::expm;
use crate::ode::{DormandPrince45, RateSystem};
use crate::population::Reference;
use crate::steady;
use crate::trajectory::Trajectory;

/// Solves `dP/dt = W P` for generators built in s^-1, times in seconds.
///
/// Stateless apart from its configuration; one solver can serve many
/// systems and threads.
#[derive(Debug, Clone, Default)]
pub struct RateSolver {
    config: SolverConfig,
}

impl RateSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Propagate with the matrix exponential, one evaluation per time.
    pub fn solve_expm(
        &self,
        w: &DMatrix<f64>,
        p0: &DVector<f64>,
        t_eval: &[f64],
    ) -> SolverResult<Trajectory> {
        check_generator(w)?;
        check_initial(w.nrows(), p0)?;
        check_times(t_eval)?;
        let reference = Reference::of(p0);

        let mut populations = Vec::with_capacity(t_eval.len());
        for &t in t_eval {
            let mut p = expm::propagate(w, p0, t);
            self.config.population.apply(&mut p, &reference)?;
            populations.push(p);
        }
        debug!(n_states = w.nrows(), n_times = t_eval.len(), "Matrix-exponential propagation");
        Ok(Trajectory::new(t_eval.to_vec(), populations))
    }

    /// Propagate a constant generator with adaptive Dormand-Prince steps.
    ///
    /// The integrator is explicit: its step size is bounded by the fastest
    /// rate in `w`. On stiff generators (rates spanning several decades, as
    /// in the seven-level presets) long horizons exhaust
    /// [`OdeConfig::max_steps`](crate::OdeConfig) and fail with
    /// [`SolverError::ConvergenceFailed`]. Use [`RateSolver::solve_expm`]
    /// for those; this route suits short windows and cross-checks.
    pub fn solve_ode(
        &self,
        w: &DMatrix<f64>,
        p0: &DVector<f64>,
        t_eval: &[f64],
    ) -> SolverResult<Trajectory> {
        check_generator(w)?;
        self.solve_ode_system(w, p0, t_eval)
    }

    /// Propagate any [`RateSystem`], including time-dependent generators.
    pub fn solve_ode_system<S: RateSystem + ?Sized>(
        &self,
        system: &S,
        p0: &DVector<f64>,
        t_eval: &[f64],
    ) -> SolverResult<Trajectory> {
        check_initial(system.dim(), p0)?;
        check_times(t_eval)?;
        let reference = Reference::of(p0);

        let mut populations = DormandPrince45.integrate(system, p0, t_eval, &self.config.ode)?;
        for p in &mut populations {
            self.config.population.apply(p, &reference)?;
        }
        Ok(Trajectory::new(t_eval.to_vec(), populations))
    }

    /// Unique stationary distribution, normalised to 1.
    pub fn steady_state(&self, w: &DMatrix<f64>) -> SolverResult<DVector<f64>> {
        check_generator(w)?;
        steady::null_vector(w, &self.config)
    }

    /// Exact `integral_0^T P(t) dt` for a constant generator.
    pub fn integrated_populations(
        &self,
        w: &DMatrix<f64>,
        p0: &DVector<f64>,
        t_end: f64,
    ) -> SolverResult<DVector<f64>> {
        check_generator(w)?;
        check_initial(w.nrows(), p0)?;
        check_times(&[t_end])?;
        let integral = expm::integrate(w, p0, t_end);
        if integral.iter().any(|v| !v.is_finite()) {
            return Err(SolverError::NumericalInstability {
                what: "non-finite time-integrated population".to_string(),
            });
        }
        Ok(integral)
    }
}

fn check_generator(w: &DMatrix<f64>) -> SolverResult<()> {
    if w.nrows() != w.ncols() {
        return Err(SolverError::InvalidArg {
            what: format!("generator must be square, got {}x{}", w.nrows(), w.ncols()),
        });
    }
    if w.nrows() == 0 {
        return Err(SolverError::InvalidArg {
            what: "generator has no states".to_string(),
        });
    }
    if w.iter().any(|v| !v.is_finite()) {
        return Err(SolverError::InvalidArg {
            what: "generator has non-finite entries".to_string(),
        });
    }
    Ok(())
}

fn check_initial(n: usize, p0: &DVector<f64>) -> SolverResult<()> {
    if p0.len() != n {
        return Err(SolverError::DimensionMismatch {
            what: "initial population",
            expected: n,
            actual: p0.len(),
        });
    }
    if p0.iter().any(|v| !v.is_finite()) {
        return Err(SolverError::InvalidArg {
            what: "initial population has non-finite entries".to_string(),
        });
    }
    Ok(())
}

fn check_times(t_eval: &[f64]) -> SolverResult<()> {
    if let Some(&t) = t_eval.iter().find(|t| !t.is_finite() || **t < 0.0) {
        return Err(SolverError::InvalidArg {
            what: format!("evaluation time {t} must be finite and >= 0"),
        });
    }
    Ok(())
}
