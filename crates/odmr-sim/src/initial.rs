//! Initial population given by name, index or explicit vector.

use nalgebra::DVector;
use odmr_model::SpinSystem;

use crate::error::{SimError, SimResult};

#[derive(Debug, Clone, PartialEq, Default)]
pub enum InitialState {
    /// The system's default: equal population over the ground manifold.
    #[default]
    Default,
    /// Symbolic label or alias, e.g. `"gs0"` or `"GS|->"`.
    Label(String),
    /// Unit population on one state.
    Index(usize),
    /// Caller-supplied population vector, used as given.
    Vector(DVector<f64>),
}

impl InitialState {
    /// Canonical population vector for `system`.
    pub fn resolve(&self, system: &SpinSystem) -> SimResult<DVector<f64>> {
        let model = system.model();
        match self {
            InitialState::Default => Ok(system.default_initial_state()),
            InitialState::Label(label) => {
                let index = system.resolve_label(label).map_err(|_| {
                    let mut known: Vec<&str> = system.aliases().map(|(name, _)| name).collect();
                    known.extend(model.labels().iter().map(String::as_str));
                    SimError::UnknownInitialState {
                        label: label.clone(),
                        available: known.join(", "),
                    }
                })?;
                Ok(model.get_initial_state(index)?)
            }
            InitialState::Index(index) => Ok(model.get_initial_state(*index)?),
            InitialState::Vector(p0) => {
                model.validate_population(p0)?;
                Ok(p0.clone())
            }
        }
    }
}

impl From<&str> for InitialState {
    fn from(label: &str) -> Self {
        InitialState::Label(label.to_string())
    }
}

impl From<String> for InitialState {
    fn from(label: String) -> Self {
        InitialState::Label(label)
    }
}

impl From<usize> for InitialState {
    fn from(index: usize) -> Self {
        InitialState::Index(index)
    }
}

impl From<DVector<f64>> for InitialState {
    fn from(p0: DVector<f64>) -> Self {
        InitialState::Vector(p0)
    }
}
