//! Spin polarisation buildup under continuous optical pumping.

use nalgebra::DVector;
use odmr_model::{RateParams, SpinSystem};
use odmr_solver::{RateSolver, Trajectory};
use tracing::{debug, trace};

use crate::drive::Drive;
use crate::error::SimResult;
use crate::grid::{LOG_TIME_FLOOR_S, TimeGrid};
use crate::initial::InitialState;
use crate::propagate::Propagator;

/// Options for initialization runs.
#[derive(Debug, Clone, PartialEq)]
pub struct InitializationOptions {
    /// Sample times (default: log grid 1 ns .. 0.1 s, 1000 points)
    pub grid: TimeGrid,
    pub initial: InitialState,
    /// Extra dynamic-parameter bindings for custom models
    pub extra: RateParams,
    pub propagator: Propagator,
}

impl Default for InitializationOptions {
    fn default() -> Self {
        Self {
            grid: TimeGrid::log(LOG_TIME_FLOOR_S, 1e-1, 1000),
            initial: InitialState::Default,
            extra: RateParams::new(),
            propagator: Propagator::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InitializationResult {
    pub trajectory: Trajectory,
    /// Total population at each sample; stays at `sum(P0)` for a valid generator
    pub totals: Vec<f64>,
    pub drive: Drive,
    pub initial: DVector<f64>,
}

impl InitializationResult {
    /// Largest `|total(t) - sum(P0)|` over the run.
    pub fn max_total_deviation(&self) -> f64 {
        let reference = self.initial.sum();
        self.totals
            .iter()
            .map(|total| (total - reference).abs())
            .fold(0.0, f64::max)
    }
}

pub struct InitializationSimulation<'a> {
    system: &'a SpinSystem,
    solver: RateSolver,
}

impl<'a> InitializationSimulation<'a> {
    pub fn new(system: &'a SpinSystem) -> Self {
        Self {
            system,
            solver: RateSolver::default(),
        }
    }

    pub fn with_solver(mut self, solver: RateSolver) -> Self {
        self.solver = solver;
        self
    }

    pub fn run(&self, drive: Drive, opts: &InitializationOptions) -> SimResult<InitializationResult> {
        let times = opts.grid.points()?;
        let p0 = opts.initial.resolve(self.system)?;
        let params = drive.params(self.system.drive_names(), &opts.extra);
        let w = self.system.model().build_rate_matrix(&params)?;

        let trajectory = opts.propagator.propagate(&self.solver, &w, &p0, &times)?;
        let totals = trajectory.totals();
        let result = InitializationResult {
            trajectory,
            totals,
            drive,
            initial: p0,
        };
        debug!(
            gamma = drive.gamma,
            n_times = times.len(),
            max_total_deviation = result.max_total_deviation(),
            "Initialization run"
        );
        Ok(result)
    }

    /// One independent run per gamma, in order.
    pub fn run_sweep_gamma(
        &self,
        gammas: &[f64],
        kmw_minus: f64,
        kmw_plus: f64,
        opts: &InitializationOptions,
    ) -> SimResult<Vec<InitializationResult>> {
        gammas
            .iter()
            .map(|&gamma| {
                trace!(gamma, "Initialization sweep point");
                self.run(Drive::new(gamma, kmw_minus, kmw_plus), opts)
            })
            .collect()
    }
}
