//! Error types for simulation protocols.

use odmr_core::CoreError;
use odmr_model::ModelError;
use odmr_solver::SolverError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: String },

    #[error("Unknown initial state '{label}'. Known labels: {available}")]
    UnknownInitialState { label: String, available: String },

    #[error("Unsupported: {what}")]
    Unsupported { what: String },

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Solver error: {0}")]
    Solver(#[from] SolverError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type SimResult<T> = Result<T, SimError>;
