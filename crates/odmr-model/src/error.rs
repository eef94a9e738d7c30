//! Model construction and build errors.

use odmr_core::CoreError;
use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while wiring a rate model or building its generator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Self-transition or a state index outside `[0, N)`.
    #[error("Invalid transition {from} -> {to}: {reason}")]
    InvalidTransition {
        from: usize,
        to: usize,
        reason: &'static str,
    },

    /// The `(from, to)` pair already has a rate source.
    #[error("Transition {from} -> {to} already has a {existing} rate")]
    DuplicateBinding {
        from: usize,
        to: usize,
        existing: &'static str,
    },

    /// A registered dynamic parameter was not supplied under the strict policy.
    #[error("Dynamic parameter '{name}' is not bound")]
    UnboundParameter { name: String },

    /// Negative or non-finite rate, coefficient or parameter value.
    #[error("Invalid rate for {what}: {value}")]
    InvalidRate { what: String, value: f64 },

    #[error("State index {index} out of range for {n_states} states")]
    StateOutOfRange { index: usize, n_states: usize },

    #[error("Population vector has length {actual}, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid state space: {what}")]
    InvalidStateSpace { what: String },

    #[error("Unknown state label '{label}'")]
    UnknownLabel { label: String },

    #[error(transparent)]
    Core(#[from] CoreError),
}
