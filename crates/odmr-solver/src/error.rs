//! Error types for solver operations.

use odmr_model::ModelError;
use thiserror::Error;

/// Errors raised while propagating or solving a generator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: String },

    #[error("Dimension mismatch for {what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The generator has more than one stationary distribution.
    #[error(
        "Steady state is not unique: null space has dimension {null_dim} (relative tolerance {tol:e})"
    )]
    DegenerateSteadyState { null_dim: usize, tol: f64 },

    #[error("Numerical instability: {what}")]
    NumericalInstability { what: String },

    #[error("Convergence failed: {what}")]
    ConvergenceFailed { what: String },

    #[error("Model error: {0}")]
    Model(#[from] ModelError),
}

pub type SolverResult<T> = Result<T, SolverError>;
