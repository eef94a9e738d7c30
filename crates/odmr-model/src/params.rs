//! Runtime values for dynamic rate slots.

use std::collections::BTreeMap;

/// Optical excitation rate (GS -> ES), MHz.
pub const GAMMA: &str = "gamma";
/// Microwave rate on the |0> <-> |-> transition, MHz.
pub const KMW_MINUS: &str = "kmw_minus";
/// Microwave rate on the |0> <-> |+> transition, MHz.
pub const KMW_PLUS: &str = "kmw_plus";

/// Named scalar bindings (MHz) resolved at matrix-build time.
///
/// Ordered so that debug output and iteration are deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateParams {
    values: BTreeMap<String, f64>,
}

impl RateParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style binding.
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.set(name, value);
        self
    }

    /// Bind (or rebind) a parameter.
    pub fn set(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for RateParams {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (name, value) in iter {
            params.set(name, value);
        }
        params
    }
}
