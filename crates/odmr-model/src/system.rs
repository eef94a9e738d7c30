//! Rate model annotated for optical/microwave protocols.

use std::collections::BTreeMap;

use nalgebra::DVector;
use odmr_core::ensure_non_negative;

use crate::error::{ModelError, ModelResult};
use crate::model::RateModel;
use crate::params::{GAMMA, KMW_MINUS, KMW_PLUS, RateParams};

/// Names of the dynamic parameters the protocols drive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveNames {
    pub gamma: String,
    pub kmw_minus: String,
    pub kmw_plus: String,
}

impl Default for DriveNames {
    fn default() -> Self {
        Self {
            gamma: GAMMA.to_string(),
            kmw_minus: KMW_MINUS.to_string(),
            kmw_plus: KMW_PLUS.to_string(),
        }
    }
}

impl DriveNames {
    /// Bind optical and microwave rates (MHz) under these names.
    pub fn params(&self, gamma: f64, kmw_minus: f64, kmw_plus: f64) -> RateParams {
        RateParams::new()
            .with(self.gamma.as_str(), gamma)
            .with(self.kmw_minus.as_str(), kmw_minus)
            .with(self.kmw_plus.as_str(), kmw_plus)
    }
}

/// A [`RateModel`] plus the metadata the simulation protocols need:
/// which states are ground/excited, which parameters are the drives,
/// and which symbolic labels name which states.
///
/// Immutable once built; share it by reference across simulations.
#[derive(Debug, Clone, PartialEq)]
pub struct SpinSystem {
    model: RateModel,
    ground_states: Vec<usize>,
    excited_states: Vec<usize>,
    drive_names: DriveNames,
    aliases: BTreeMap<String, usize>,
    readout_states: Vec<(String, usize)>,
    radiative_rates: Option<Vec<f64>>,
}

impl SpinSystem {
    pub fn new(model: RateModel) -> Self {
        Self {
            model,
            ground_states: Vec::new(),
            excited_states: Vec::new(),
            drive_names: DriveNames::default(),
            aliases: BTreeMap::new(),
            readout_states: Vec::new(),
            radiative_rates: None,
        }
    }

    pub fn with_ground_states<I>(mut self, states: I) -> ModelResult<Self>
    where
        I: IntoIterator<Item = usize>,
    {
        self.ground_states = self.checked_indices(states)?;
        Ok(self)
    }

    /// Replaces the excited manifold. Clears radiative rates, which are
    /// per excited state.
    pub fn with_excited_states<I>(mut self, states: I) -> ModelResult<Self>
    where
        I: IntoIterator<Item = usize>,
    {
        self.excited_states = self.checked_indices(states)?;
        self.radiative_rates = None;
        Ok(self)
    }

    pub fn with_drive_names(mut self, names: DriveNames) -> Self {
        self.drive_names = names;
        self
    }

    /// Register a case-insensitive symbolic name for a state.
    pub fn with_alias(mut self, alias: impl Into<String>, index: usize) -> ModelResult<Self> {
        self.model.check_index(index)?;
        self.aliases.insert(alias.into().to_lowercase(), index);
        Ok(self)
    }

    /// Add a canonical readout starting state (also registered as an alias).
    pub fn with_readout_state(mut self, label: impl Into<String>, index: usize) -> ModelResult<Self> {
        let label = label.into();
        self = self.with_alias(label.clone(), index)?;
        self.readout_states.push((label, index));
        Ok(self)
    }

    /// Radiative decay rates (MHz), one per excited state in order.
    pub fn with_radiative_rates(mut self, rates: Vec<f64>) -> ModelResult<Self> {
        if rates.len() != self.excited_states.len() {
            return Err(ModelError::DimensionMismatch {
                expected: self.excited_states.len(),
                actual: rates.len(),
            });
        }
        for &rate in &rates {
            ensure_non_negative(rate, "radiative rate")?;
        }
        self.radiative_rates = Some(rates);
        Ok(self)
    }

    pub fn model(&self) -> &RateModel {
        &self.model
    }

    pub fn n_states(&self) -> usize {
        self.model.n_states()
    }

    pub fn ground_states(&self) -> &[usize] {
        &self.ground_states
    }

    pub fn excited_states(&self) -> &[usize] {
        &self.excited_states
    }

    pub fn drive_names(&self) -> &DriveNames {
        &self.drive_names
    }

    pub fn readout_states(&self) -> &[(String, usize)] {
        &self.readout_states
    }

    pub fn radiative_rates(&self) -> Option<&[f64]> {
        self.radiative_rates.as_deref()
    }

    pub fn aliases(&self) -> impl Iterator<Item = (&str, usize)> {
        self.aliases.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Resolve a symbolic name: registered aliases first (case-insensitive),
    /// then exact model labels.
    pub fn resolve_label(&self, label: &str) -> ModelResult<usize> {
        if let Some(&index) = self.aliases.get(&label.to_lowercase()) {
            return Ok(index);
        }
        self.model.state_index(label)
    }

    /// Equal population over the ground manifold.
    ///
    /// Without declared ground states, the first half of the states is
    /// treated as ground (state 0 for a one-state model).
    pub fn default_initial_state(&self) -> DVector<f64> {
        let n = self.n_states();
        let ground: Vec<usize> = if self.ground_states.is_empty() {
            (0..(n / 2).max(1)).collect()
        } else {
            self.ground_states.clone()
        };
        let weight = 1.0 / ground.len() as f64;
        let mut p0 = DVector::zeros(n);
        for index in ground {
            p0[index] = weight;
        }
        p0
    }

    /// Total excited-state population of one population vector.
    ///
    /// # Panics
    ///
    /// Panics if `population` is shorter than the model's state count.
    pub fn excited_population(&self, population: &DVector<f64>) -> f64 {
        self.excited_states.iter().map(|&i| population[i]).sum()
    }

    fn checked_indices<I>(&self, states: I) -> ModelResult<Vec<usize>>
    where
        I: IntoIterator<Item = usize>,
    {
        let mut out = Vec::new();
        for index in states {
            self.model.check_index(index)?;
            if !out.contains(&index) {
                out.push(index);
            }
        }
        Ok(out)
    }
}
