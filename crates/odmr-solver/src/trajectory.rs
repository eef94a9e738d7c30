//! Sampled population trajectories.

use nalgebra::{DMatrix, DVector};
use odmr_core::{mhz_to_per_second, seconds_to_ns};

use crate::error::{SolverError, SolverResult};

/// Populations sampled at the requested times, in the caller's order.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    times: Vec<f64>,
    populations: Vec<DVector<f64>>,
}

impl Trajectory {
    pub(crate) fn new(times: Vec<f64>, populations: Vec<DVector<f64>>) -> Self {
        debug_assert_eq!(times.len(), populations.len());
        Self { times, populations }
    }

    /// Sample times in seconds.
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Sample times in nanoseconds.
    pub fn times_ns(&self) -> Vec<f64> {
        self.times.iter().map(|&t| seconds_to_ns(t)).collect()
    }

    pub fn populations(&self) -> &[DVector<f64>] {
        &self.populations
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn n_states(&self) -> usize {
        self.populations.first().map_or(0, |p| p.len())
    }

    /// Population vector at sample `k`.
    pub fn state_at(&self, k: usize) -> Option<&DVector<f64>> {
        self.populations.get(k)
    }

    pub fn final_state(&self) -> Option<&DVector<f64>> {
        self.populations.last()
    }

    /// Time series of one state's population; `None` when `state` is out of range.
    pub fn population(&self, state: usize) -> Option<Vec<f64>> {
        if state >= self.n_states() {
            return None;
        }
        Some(self.populations.iter().map(|p| p[state]).collect())
    }

    /// Time series of the summed population over a set of states.
    ///
    /// # Panics
    ///
    /// Panics if any index in `states` is `>= self.n_states()`.
    pub fn sum_over(&self, states: &[usize]) -> Vec<f64> {
        self.populations
            .iter()
            .map(|p| states.iter().map(|&i| p[i]).sum())
            .collect()
    }

    /// Total population at each sample.
    pub fn totals(&self) -> Vec<f64> {
        self.populations.iter().map(|p| p.sum()).collect()
    }

    /// `(n_times x n_states)` matrix, one row per sample.
    pub fn to_matrix(&self) -> DMatrix<f64> {
        DMatrix::from_fn(self.len(), self.n_states(), |k, i| self.populations[k][i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, &DVector<f64>)> {
        self.times.iter().copied().zip(self.populations.iter())
    }
}

/// Photon emission rate (s^-1 per emitter) along a trajectory: the excited
/// populations weighted by their radiative decay rates (MHz).
pub fn photon_emission(
    trajectory: &Trajectory,
    excited: &[usize],
    radiative_rates_mhz: &[f64],
) -> SolverResult<Vec<f64>> {
    if excited.len() != radiative_rates_mhz.len() {
        return Err(SolverError::DimensionMismatch {
            what: "radiative rates",
            expected: excited.len(),
            actual: radiative_rates_mhz.len(),
        });
    }
    let n = trajectory.n_states();
    if let Some(&bad) = excited.iter().find(|&&i| i >= n) {
        return Err(SolverError::InvalidArg {
            what: format!("excited state {bad} out of range for {n} states"),
        });
    }
    let rates: Vec<f64> = radiative_rates_mhz
        .iter()
        .map(|&k| mhz_to_per_second(k))
        .collect();
    Ok(trajectory
        .populations
        .iter()
        .map(|p| excited.iter().zip(&rates).map(|(&i, &k)| k * p[i]).sum())
        .collect())
}
