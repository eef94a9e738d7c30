use odmr_model::ModelError;
use thiserror::Error;

pub type PresetResult<T> = Result<T, PresetError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PresetError {
    #[error("Unknown preset '{name}'. Available presets: {available}")]
    UnknownPreset { name: String, available: String },

    #[error("Unknown rate constant '{name}' (expected one of k41, k52, k63, k47, k57, k67, k71, k72, k73)")]
    UnknownRate { name: String },

    #[error(transparent)]
    Model(#[from] ModelError),
}
