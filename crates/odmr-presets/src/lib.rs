//! odmr-presets: the seven-level NV-like model and its literature rate sets.

pub mod catalog;
pub mod error;
pub mod seven_level;

pub use catalog::{PresetEntry, get_preset, get_preset_info, list_presets, normalize_name};
pub use error::{PresetError, PresetResult};
pub use seven_level::{LabelStyle, SevenLevelRates, seven_level_system};
