//! Fluorescence transient after the laser switches on.

use std::collections::BTreeMap;

use nalgebra::DVector;
use odmr_model::{RateParams, SpinSystem};
use odmr_solver::{RateSolver, Trajectory, photon_emission};
use tracing::{debug, trace};

use crate::drive::Drive;
use crate::error::{SimError, SimResult};
use crate::grid::TimeGrid;
use crate::initial::InitialState;
use crate::propagate::Propagator;

/// Options for readout runs.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadoutOptions {
    /// Sample times (default: linear 0 .. 10 us, 1000 points)
    pub grid: TimeGrid,
    pub extra: RateParams,
    pub propagator: Propagator,
}

impl Default for ReadoutOptions {
    fn default() -> Self {
        Self {
            grid: TimeGrid::linear(0.0, 1e-5, 1000),
            extra: RateParams::new(),
            propagator: Propagator::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReadoutResult {
    pub trajectory: Trajectory,
    /// Summed excited-state population at each sample
    pub es_total: Vec<f64>,
    /// Radiative emission rate (s^-1), when the system declares radiative rates
    pub photon_rate: Option<Vec<f64>>,
    pub initial: DVector<f64>,
    pub gamma: f64,
}

impl ReadoutResult {
    pub fn peak_es_total(&self) -> f64 {
        self.es_total.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Time (s) of the excited-population maximum.
    pub fn peak_time(&self) -> Option<f64> {
        let (k, _) = self
            .es_total
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))?;
        self.trajectory.times().get(k).copied()
    }
}

pub struct ReadoutSimulation<'a> {
    system: &'a SpinSystem,
    solver: RateSolver,
}

impl<'a> ReadoutSimulation<'a> {
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

    /// Laser at `gamma` (MHz), microwave off, starting from `initial`.
    pub fn run(
        &self,
        gamma: f64,
        initial: &InitialState,
        opts: &ReadoutOptions,
    ) -> SimResult<ReadoutResult> {
        let excited = self.system.excited_states();
        if excited.is_empty() {
            return Err(SimError::Unsupported {
                what: "readout needs declared excited states".to_string(),
            });
        }
        let times = opts.grid.points()?;
        let p0 = initial.resolve(self.system)?;
        let params = Drive::optical(gamma).params(self.system.drive_names(), &opts.extra);
        let w = self.system.model().build_rate_matrix(&params)?;

        let trajectory = opts.propagator.propagate(&self.solver, &w, &p0, &times)?;
        let es_total = trajectory.sum_over(excited);
        let photon_rate = match self.system.radiative_rates() {
            Some(rates) => Some(photon_emission(&trajectory, excited, rates)?),
            None => None,
        };
        let result = ReadoutResult {
            trajectory,
            es_total,
            photon_rate,
            initial: p0,
            gamma,
        };
        debug!(gamma, peak_es_total = result.peak_es_total(), "Readout run");
        Ok(result)
    }

    /// One readout per canonical starting state, keyed by its label.
    pub fn run_comparison(
        &self,
        gamma: f64,
        opts: &ReadoutOptions,
    ) -> SimResult<BTreeMap<String, ReadoutResult>> {
        let states = self.system.readout_states();
        if states.is_empty() {
            return Err(SimError::Unsupported {
                what: "system declares no readout states to compare".to_string(),
            });
        }
        let mut results = BTreeMap::new();
        for (label, index) in states {
            trace!(label = label.as_str(), "Readout comparison run");
            let result = self.run(gamma, &InitialState::Index(*index), opts)?;
            results.insert(label.clone(), result);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use odmr_model::{GAMMA, RateModel};

    fn two_level() -> SpinSystem {
        let mut model = RateModel::with_labels(["g", "e"]).unwrap();
        model.set_rates([((1, 0), 10.0)]).unwrap();
        model.add_dynamic_rate(GAMMA, 0, 1).unwrap();
        SpinSystem::new(model)
            .with_ground_states([0])
            .unwrap()
            .with_excited_states([1])
            .unwrap()
    }

    #[test]
    fn excited_population_rises_to_balance() {
        let system = two_level();
        let sim = ReadoutSimulation::new(&system);
        let result = sim
            .run(10.0, &InitialState::from("g"), &ReadoutOptions::default())
            .unwrap();
        assert_eq!(result.es_total[0], 0.0);
        // Equal up and down rates: half the population ends up excited.
        assert!((result.es_total.last().unwrap() - 0.5).abs() < 1e-9);
        assert!(result.photon_rate.is_none());
        assert!(result.peak_time().unwrap() > 0.0);
    }

    #[test]
    fn photon_rate_uses_radiative_rates() {
        let system = two_level().with_radiative_rates(vec![10.0]).unwrap();
        let sim = ReadoutSimulation::new(&system);
        let result = sim
            .run(10.0, &InitialState::Index(0), &ReadoutOptions::default())
            .unwrap();
        let photons = result.photon_rate.unwrap();
        let last = photons.last().unwrap();
        assert!((last - 0.5 * 10.0e6).abs() < 1e-2);
    }

    #[test]
    fn comparison_needs_readout_states() {
        let system = two_level();
        let sim = ReadoutSimulation::new(&system);
        assert!(matches!(
            sim.run_comparison(1.0, &ReadoutOptions::default()),
            Err(SimError::Unsupported { .. })
        ));
    }

    #[test]
    fn readout_needs_excited_states() {
        let system = SpinSystem::new(RateModel::new(2).unwrap());
        let sim = ReadoutSimulation::new(&system);
        assert!(matches!(
            sim.run(1.0, &InitialState::Default, &ReadoutOptions::default()),
            Err(SimError::Unsupported { .. })
        ));
    }
}
