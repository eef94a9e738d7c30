//! Rate table and generator assembly.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use nalgebra::{DMatrix, DVector};
use odmr_core::{ensure_finite, ensure_non_negative, mhz_to_per_second};

use crate::error::{ModelError, ModelResult};
use crate::params::RateParams;

/// A dynamic slot: the rate is `coefficient * params[name]` at build time.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicSlot {
    pub name: String,
    pub coefficient: f64,
}

/// Where the rate of one directed transition comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum RateSource {
    /// Fixed rate in MHz.
    Static(f64),
    /// Rate bound to a named runtime parameter.
    Dynamic(DynamicSlot),
}

impl RateSource {
    fn kind(&self) -> &'static str {
        match self {
            RateSource::Static(_) => "static",
            RateSource::Dynamic(_) => "dynamic",
        }
    }
}

/// What `build_rate_matrix` does with a registered parameter that the
/// caller did not bind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnboundPolicy {
    /// Missing parameters contribute a rate of 0 (sweeps may omit unused drives).
    #[default]
    DefaultZero,
    /// Missing parameters are an error.
    Strict,
}

/// N-level rate-equation model.
///
/// Holds the state space, a table of directed transition rates (static or
/// dynamic) and produces a fresh generator matrix per parameter binding.
/// Convention: `W[(to, from)]` is the rate `from -> to` and each column sums
/// to zero, so `dP/dt = W P` conserves total population.
///
/// Building takes `&self`; a model can be shared read-only across threads.
#[derive(Debug, Clone, PartialEq)]
pub struct RateModel {
    labels: Vec<String>,
    rates: BTreeMap<(usize, usize), RateSource>,
    unbound_policy: UnboundPolicy,
}

impl RateModel {
    /// Model with `n_states` states labelled `"State 0"`, `"State 1"`, ...
    pub fn new(n_states: usize) -> ModelResult<Self> {
        Self::with_labels((0..n_states).map(|i| format!("State {i}")))
    }

    /// Model whose state count is the number of labels. Labels must be unique.
    pub fn with_labels<I, S>(labels: I) -> ModelResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() {
            return Err(ModelError::InvalidStateSpace {
                what: "model must have at least one state".to_string(),
            });
        }
        let mut seen = HashSet::new();
        for label in &labels {
            if !seen.insert(label.as_str()) {
                return Err(ModelError::InvalidStateSpace {
                    what: format!("duplicate state label '{label}'"),
                });
            }
        }
        Ok(Self {
            labels,
            rates: BTreeMap::new(),
            unbound_policy: UnboundPolicy::default(),
        })
    }

    /// Set the unbound-parameter policy.
    pub fn with_unbound_policy(mut self, policy: UnboundPolicy) -> Self {
        self.unbound_policy = policy;
        self
    }

    pub fn unbound_policy(&self) -> UnboundPolicy {
        self.unbound_policy
    }

    pub fn n_states(&self) -> usize {
        self.labels.len()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// Index of the state carrying `label`.
    pub fn state_index(&self, label: &str) -> ModelResult<usize> {
        self.labels
            .iter()
            .position(|l| l == label)
            .ok_or_else(|| ModelError::UnknownLabel {
                label: label.to_string(),
            })
    }

    /// Install a static rate (MHz). Overwrites a prior static entry.
    pub fn set_rate(&mut self, from: usize, to: usize, rate_mhz: f64) -> ModelResult<()> {
        self.check_transition(from, to)?;
        let rate = ensure_non_negative(rate_mhz, "static rate").map_err(|_| {
            ModelError::InvalidRate {
                what: format!("static rate {from} -> {to}"),
                value: rate_mhz,
            }
        })?;
        if let Some(RateSource::Dynamic(_)) = self.rates.get(&(from, to)) {
            return Err(ModelError::DuplicateBinding {
                from,
                to,
                existing: "dynamic",
            });
        }
        self.rates.insert((from, to), RateSource::Static(rate));
        Ok(())
    }

    /// Install several static rates. Stops at the first invalid entry.
    pub fn set_rates<I>(&mut self, entries: I) -> ModelResult<()>
    where
        I: IntoIterator<Item = ((usize, usize), f64)>,
    {
        for ((from, to), rate) in entries {
            self.set_rate(from, to, rate)?;
        }
        Ok(())
    }

    /// Bind `(from, to)` to the runtime parameter `name` with unit coefficient.
    pub fn add_dynamic_rate(
        &mut self,
        name: impl Into<String>,
        from: usize,
        to: usize,
    ) -> ModelResult<()> {
        self.add_scaled_dynamic_rate(name, from, to, 1.0)
    }

    /// Bind `(from, to)` to `coefficient * params[name]`.
    ///
    /// One name may drive several pairs; one pair has at most one source.
    pub fn add_scaled_dynamic_rate(
        &mut self,
        name: impl Into<String>,
        from: usize,
        to: usize,
        coefficient: f64,
    ) -> ModelResult<()> {
        self.check_transition(from, to)?;
        let name = name.into();
        let coefficient = ensure_non_negative(coefficient, "coefficient").map_err(|_| {
            ModelError::InvalidRate {
                what: format!("coefficient of '{name}' on {from} -> {to}"),
                value: coefficient,
            }
        })?;
        if let Some(existing) = self.rates.get(&(from, to)) {
            return Err(ModelError::DuplicateBinding {
                from,
                to,
                existing: existing.kind(),
            });
        }
        self.rates.insert(
            (from, to),
            RateSource::Dynamic(DynamicSlot { name, coefficient }),
        );
        Ok(())
    }

    /// Remove whatever rate source `(from, to)` has.
    pub fn remove_rate(&mut self, from: usize, to: usize) -> Option<RateSource> {
        self.rates.remove(&(from, to))
    }

    pub fn rate_source(&self, from: usize, to: usize) -> Option<&RateSource> {
        self.rates.get(&(from, to))
    }

    /// All rate entries in `(from, to)` order.
    pub fn rates(&self) -> impl Iterator<Item = ((usize, usize), &RateSource)> {
        self.rates.iter().map(|(pair, source)| (*pair, source))
    }

    /// Names of all registered dynamic parameters.
    pub fn dynamic_parameters(&self) -> BTreeSet<&str> {
        self.rates
            .values()
            .filter_map(|source| match source {
                RateSource::Dynamic(slot) => Some(slot.name.as_str()),
                RateSource::Static(_) => None,
            })
            .collect()
    }

    /// Generator in s^-1 (rates converted from MHz).
    pub fn build_rate_matrix(&self, params: &RateParams) -> ModelResult<DMatrix<f64>> {
        self.assemble(params, mhz_to_per_second)
    }

    /// Generator in MHz, exactly as the rates were specified.
    pub fn build_rate_matrix_mhz(&self, params: &RateParams) -> ModelResult<DMatrix<f64>> {
        self.assemble(params, |rate| rate)
    }

    fn assemble(&self, params: &RateParams, convert: fn(f64) -> f64) -> ModelResult<DMatrix<f64>> {
        let n = self.n_states();
        let mut w = DMatrix::zeros(n, n);

        for (&(from, to), source) in &self.rates {
            let rate_mhz = match source {
                RateSource::Static(rate) => *rate,
                RateSource::Dynamic(slot) => slot.coefficient * self.resolve(&slot.name, params)?,
            };
            w[(to, from)] += convert(rate_mhz);
        }

        // Diagonal = -(total outgoing rate) so that columns sum to zero
        for i in 0..n {
            let outgoing: f64 = (0..n).filter(|&j| j != i).map(|j| w[(j, i)]).sum();
            w[(i, i)] = -outgoing;
        }

        if tracing::enabled!(tracing::Level::TRACE) {
            let registered = self.dynamic_parameters();
            for (name, _) in params.iter().filter(|(name, _)| !registered.contains(name)) {
                tracing::trace!(parameter = name, "ignoring parameter not registered on model");
            }
        }
        tracing::debug!(n_states = n, entries = self.rates.len(), "built rate matrix");
        Ok(w)
    }

    fn resolve(&self, name: &str, params: &RateParams) -> ModelResult<f64> {
        match params.get(name) {
            Some(value) => {
                ensure_non_negative(value, "parameter").map_err(|_| ModelError::InvalidRate {
                    what: format!("parameter '{name}'"),
                    value,
                })
            }
            None => match self.unbound_policy {
                UnboundPolicy::DefaultZero => Ok(0.0),
                UnboundPolicy::Strict => Err(ModelError::UnboundParameter {
                    name: name.to_string(),
                }),
            },
        }
    }

    /// Unit population vector at `index`.
    pub fn get_initial_state(&self, index: usize) -> ModelResult<DVector<f64>> {
        self.check_index(index)?;
        let mut p0 = DVector::zeros(self.n_states());
        p0[index] = 1.0;
        Ok(p0)
    }

    /// Vector with the given weights placed at their indices, zero elsewhere.
    ///
    /// Weights are used as given; this never renormalises. A repeated index
    /// keeps its last weight.
    pub fn get_mixed_initial_state<I>(&self, weights: I) -> ModelResult<DVector<f64>>
    where
        I: IntoIterator<Item = (usize, f64)>,
    {
        let mut p0 = DVector::zeros(self.n_states());
        for (index, weight) in weights {
            self.check_index(index)?;
            p0[index] = ensure_finite(weight, "population weight")?;
        }
        Ok(p0)
    }

    /// Like [`get_mixed_initial_state`](Self::get_mixed_initial_state), then
    /// explicitly rescaled to sum 1. Fails if the weights sum to `<= 0`.
    pub fn normalized_mixed_initial_state<I>(&self, weights: I) -> ModelResult<DVector<f64>>
    where
        I: IntoIterator<Item = (usize, f64)>,
    {
        let p0 = self.get_mixed_initial_state(weights)?;
        let total = p0.sum();
        if total <= 0.0 {
            return Err(ModelError::InvalidRate {
                what: "total population weight".to_string(),
                value: total,
            });
        }
        Ok(p0 / total)
    }

    /// Check a caller-supplied population vector against the state count.
    pub fn validate_population(&self, population: &DVector<f64>) -> ModelResult<()> {
        if population.len() != self.n_states() {
            return Err(ModelError::DimensionMismatch {
                expected: self.n_states(),
                actual: population.len(),
            });
        }
        for &value in population.iter() {
            ensure_finite(value, "population")?;
        }
        Ok(())
    }

    pub(crate) fn check_index(&self, index: usize) -> ModelResult<()> {
        if index >= self.n_states() {
            return Err(ModelError::StateOutOfRange {
                index,
                n_states: self.n_states(),
            });
        }
        Ok(())
    }

    fn check_transition(&self, from: usize, to: usize) -> ModelResult<()> {
        let n = self.n_states();
        if from >= n {
            return Err(ModelError::InvalidTransition {
                from,
                to,
                reason: "from_state out of range",
            });
        }
        if to >= n {
            return Err(ModelError::InvalidTransition {
                from,
                to,
                reason: "to_state out of range",
            });
        }
        if from == to {
            return Err(ModelError::InvalidTransition {
                from,
                to,
                reason: "self-transition",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::GAMMA;

    fn three_level() -> RateModel {
        let mut model = RateModel::with_labels(["Ground", "Excited", "Metastable"]).unwrap();
        model
            .set_rates([((1, 0), 50.0), ((1, 2), 10.0), ((2, 0), 5.0)])
            .unwrap();
        model
    }

    #[test]
    fn default_labels() {
        let model = RateModel::new(3).unwrap();
        assert_eq!(model.labels(), ["State 0", "State 1", "State 2"]);
        assert_eq!(model.state_index("State 2").unwrap(), 2);
        assert!(matches!(
            model.state_index("nope"),
            Err(ModelError::UnknownLabel { .. })
        ));
    }

    #[test]
    fn empty_and_duplicate_labels_rejected() {
        assert!(matches!(
            RateModel::new(0),
            Err(ModelError::InvalidStateSpace { .. })
        ));
        assert!(matches!(
            RateModel::with_labels(["A", "B", "A"]),
            Err(ModelError::InvalidStateSpace { .. })
        ));
    }

    #[test]
    fn set_rate_validates_pair() {
        let mut model = RateModel::new(3).unwrap();
        assert!(matches!(
            model.set_rate(1, 1, 1.0),
            Err(ModelError::InvalidTransition { .. })
        ));
        assert!(matches!(
            model.set_rate(0, 3, 1.0),
            Err(ModelError::InvalidTransition { .. })
        ));
        assert!(matches!(
            model.set_rate(0, 1, -1.0),
            Err(ModelError::InvalidRate { .. })
        ));
        assert!(matches!(
            model.set_rate(0, 1, f64::NAN),
            Err(ModelError::InvalidRate { .. })
        ));
    }

    #[test]
    fn set_rate_overwrites_static() {
        let mut model = RateModel::new(2).unwrap();
        model.set_rate(0, 1, 1.0).unwrap();
        model.set_rate(0, 1, 2.0).unwrap();
        assert_eq!(model.rate_source(0, 1), Some(&RateSource::Static(2.0)));
    }

    #[test]
    fn one_source_per_pair() {
        let mut model = RateModel::new(2).unwrap();
        model.set_rate(0, 1, 1.0).unwrap();
        assert!(matches!(
            model.add_dynamic_rate(GAMMA, 0, 1),
            Err(ModelError::DuplicateBinding {
                existing: "static",
                ..
            })
        ));

        model.add_dynamic_rate(GAMMA, 1, 0).unwrap();
        assert!(matches!(
            model.add_dynamic_rate("other", 1, 0),
            Err(ModelError::DuplicateBinding {
                existing: "dynamic",
                ..
            })
        ));
        assert!(matches!(
            model.set_rate(1, 0, 3.0),
            Err(ModelError::DuplicateBinding { .. })
        ));
    }

    #[test]
    fn columns_sum_to_zero() {
        let mut model = three_level();
        model.add_dynamic_rate(GAMMA, 0, 1).unwrap();
        let w = model
            .build_rate_matrix_mhz(&RateParams::new().with(GAMMA, 2.0))
            .unwrap();
        for col in 0..3 {
            assert!(w.column(col).sum().abs() < 1e-12);
        }
        assert_eq!(w[(1, 0)], 2.0);
        assert_eq!(w[(0, 0)], -2.0);
        assert_eq!(w[(1, 1)], -60.0);
    }

    #[test]
    fn per_second_matrix_is_scaled() {
        let model = three_level();
        let w_mhz = model.build_rate_matrix_mhz(&RateParams::new()).unwrap();
        let w_s = model.build_rate_matrix(&RateParams::new()).unwrap();
        assert!((&w_mhz * 1e6 - &w_s).abs().max() < 1e-6);
    }

    #[test]
    fn shared_name_drives_both_directions() {
        let mut model = RateModel::new(2).unwrap();
        model.add_dynamic_rate("kmw", 0, 1).unwrap();
        model.add_dynamic_rate("kmw", 1, 0).unwrap();
        assert_eq!(model.dynamic_parameters().len(), 1);

        let w = model
            .build_rate_matrix_mhz(&RateParams::new().with("kmw", 3.0))
            .unwrap();
        assert_eq!(w[(0, 1)], 3.0);
        assert_eq!(w[(1, 0)], 3.0);
    }

    #[test]
    fn scaled_dynamic_rate_applies_coefficient() {
        let mut model = RateModel::new(2).unwrap();
        model.add_scaled_dynamic_rate(GAMMA, 0, 1, 0.5).unwrap();
        let w = model
            .build_rate_matrix_mhz(&RateParams::new().with(GAMMA, 4.0))
            .unwrap();
        assert_eq!(w[(1, 0)], 2.0);
        assert!(model.add_scaled_dynamic_rate(GAMMA, 1, 0, -1.0).is_err());
    }

    #[test]
    fn unbound_parameter_policy() {
        let mut model = RateModel::new(2).unwrap();
        model.add_dynamic_rate(GAMMA, 0, 1).unwrap();

        let w = model.build_rate_matrix_mhz(&RateParams::new()).unwrap();
        assert_eq!(w[(1, 0)], 0.0);

        let strict = model.with_unbound_policy(UnboundPolicy::Strict);
        assert_eq!(
            strict.build_rate_matrix_mhz(&RateParams::new()),
            Err(ModelError::UnboundParameter {
                name: GAMMA.to_string()
            })
        );
        assert!(
            strict
                .build_rate_matrix_mhz(&RateParams::new().with(GAMMA, 0.0))
                .is_ok()
        );
    }

    #[test]
    fn negative_parameter_rejected() {
        let mut model = RateModel::new(2).unwrap();
        model.add_dynamic_rate(GAMMA, 0, 1).unwrap();
        assert!(matches!(
            model.build_rate_matrix(&RateParams::new().with(GAMMA, -0.1)),
            Err(ModelError::InvalidRate { .. })
        ));
    }

    #[test]
    fn initial_states() {
        let model = three_level();
        let p0 = model.get_initial_state(1).unwrap();
        assert_eq!(p0.as_slice(), &[0.0, 1.0, 0.0]);
        assert_eq!(
            model.get_initial_state(3),
            Err(ModelError::StateOutOfRange {
                index: 3,
                n_states: 3
            })
        );

        let mixed = model.get_mixed_initial_state([(0, 0.2), (2, 0.2)]).unwrap();
        assert_eq!(mixed.as_slice(), &[0.2, 0.0, 0.2]);

        let normalized = model
            .normalized_mixed_initial_state([(0, 0.2), (2, 0.2)])
            .unwrap();
        assert_eq!(normalized.as_slice(), &[0.5, 0.0, 0.5]);
        assert!(model.normalized_mixed_initial_state([(0, 0.0)]).is_err());
    }

    #[test]
    fn validate_population_checks_length() {
        let model = three_level();
        assert!(model.validate_population(&DVector::zeros(3)).is_ok());
        assert_eq!(
            model.validate_population(&DVector::zeros(4)),
            Err(ModelError::DimensionMismatch {
                expected: 3,
                actual: 4
            })
        );
    }

    #[test]
    fn remove_rate_returns_source() {
        let mut model = three_level();
        assert_eq!(model.remove_rate(1, 0), Some(RateSource::Static(50.0)));
        assert_eq!(model.remove_rate(1, 0), None);
        model.add_dynamic_rate(GAMMA, 1, 0).unwrap();
    }
}
