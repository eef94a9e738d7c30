//! odmr-project: study file format, validation and execution.
//!
//! A study names one model (catalog preset or custom N-level wiring),
//! optional solver overrides, and a list of runs to execute against it.

pub mod compile;
pub mod execute;
pub mod schema;
pub mod validate;

pub use compile::{CompiledStudy, compile_solver, compile_system};
pub use execute::{ContrastOutput, ContrastPoint, RunOutput, SeriesOutput};
pub use schema::*;
pub use validate::{LATEST_VERSION, ValidationError, validate_study};

use odmr_model::ModelError;
use odmr_presets::PresetError;
use odmr_sim::SimError;

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Unknown run '{id}'")]
    UnknownRun { id: String },

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Preset error: {0}")]
    Preset(#[from] PresetError),

    #[error("Simulation error: {0}")]
    Sim(#[from] SimError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn load_yaml(path: &std::path::Path) -> ProjectResult<StudyFile> {
    let content = std::fs::read_to_string(path)?;
    let study: StudyFile = serde_yaml::from_str(&content)?;
    validate_study(&study)?;
    Ok(study)
}

pub fn save_yaml(path: &std::path::Path, study: &StudyFile) -> ProjectResult<()> {
    validate_study(study)?;
    let content = serde_yaml::to_string(study)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load_json(path: &std::path::Path) -> ProjectResult<StudyFile> {
    let content = std::fs::read_to_string(path)?;
    let study: StudyFile = serde_json::from_str(&content)?;
    validate_study(&study)?;
    Ok(study)
}

pub fn save_json(path: &std::path::Path, study: &StudyFile) -> ProjectResult<()> {
    validate_study(study)?;
    let content = serde_json::to_string_pretty(study)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Load by extension: `.json` as JSON, anything else as YAML.
pub fn load_study(path: &std::path::Path) -> ProjectResult<StudyFile> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => load_json(path),
        _ => load_yaml(path),
    }
}
