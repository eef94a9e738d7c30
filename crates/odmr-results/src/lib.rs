//! odmr-results: content-addressed run cache for study outputs.

pub mod hash;
pub mod store;
pub mod types;

pub use hash::{SOLVER_VERSION, compute_run_id};
pub use store::RunStore;
pub use types::*;

pub type ResultsResult<T> = Result<T, ResultsError>;

#[derive(thiserror::Error, Debug)]
pub enum ResultsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Run not found: {run_id}")]
    RunNotFound { run_id: String },

    #[error("Invalid path: {message}")]
    InvalidPath { message: String },

    #[error("Corrupt run {run_id}: {reason}")]
    Corrupt { run_id: String, reason: String },
}
