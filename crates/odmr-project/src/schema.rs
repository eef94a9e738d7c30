//! Study file schema definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StudyFile {
    pub version: u32,
    pub name: String,
    pub model: ModelDef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solver: Option<SolverDef>,
    #[serde(default)]
    pub runs: Vec<RunDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelDef {
    /// Catalog preset, optionally with some rate constants replaced.
    Preset {
        name: String,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        overrides: BTreeMap<String, f64>,
    },
    Custom(CustomModelDef),
}

/// Hand-wired N-level model. Rates in MHz.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CustomModelDef {
    /// State labels; `n_states` may be given instead.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_states: Option<usize>,
    #[serde(default)]
    pub rates: Vec<RateDef>,
    #[serde(default)]
    pub dynamic: Vec<DynamicRateDef>,
    #[serde(default)]
    pub ground_states: Vec<usize>,
    #[serde(default)]
    pub excited_states: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radiative_rates: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub aliases: BTreeMap<String, usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub readout_states: Vec<ReadoutStateDef>,
    /// Fail on unbound dynamic parameters instead of treating them as zero.
    #[serde(default)]
    pub strict_parameters: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RateDef {
    pub from: usize,
    pub to: usize,
    pub rate_mhz: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DynamicRateDef {
    pub name: String,
    pub from: usize,
    pub to: usize,
    #[serde(default = "default_coefficient")]
    pub coefficient: f64,
}

fn default_coefficient() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReadoutStateDef {
    pub label: String,
    pub index: usize,
}

/// Overrides on the default solver configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SolverDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub propagator: Option<PropagatorDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub null_space_tol: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub residual_tol: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negativity_tol: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sum_rel_tol: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clamp_negative: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rtol: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub atol: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_steps: Option<usize>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PropagatorDef {
    Expm,
    Ode,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunDef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub kind: RunKindDef,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunKindDef {
    Initialization {
        gamma: f64,
        #[serde(default)]
        kmw_minus: f64,
        #[serde(default)]
        kmw_plus: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        grid: Option<TimeGridDef>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        initial: Option<InitialStateDef>,
    },
    Readout {
        gamma: f64,
        initial: InitialStateDef,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        grid: Option<TimeGridDef>,
    },
    ReadoutComparison {
        gamma: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        grid: Option<TimeGridDef>,
    },
    Contrast {
        gamma: f64,
        #[serde(default)]
        kmw_minus: f64,
        #[serde(default)]
        kmw_plus: f64,
        #[serde(default)]
        method: ContrastMethodDef,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        initial: Option<InitialStateDef>,
    },
    GammaSweep {
        gammas: Vec<f64>,
        #[serde(default)]
        kmw_minus: f64,
        #[serde(default)]
        kmw_plus: f64,
        #[serde(default)]
        method: ContrastMethodDef,
    },
    Spectrum {
        gamma: f64,
        freq_center: f64,
        freq_width: f64,
        #[serde(default = "default_spectrum_points")]
        n_points: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        peak_freq_minus: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        peak_freq_plus: Option<f64>,
        linewidth: f64,
        kmw_amplitude: f64,
        #[serde(default)]
        lineshape: LineshapeDef,
        #[serde(default)]
        method: ContrastMethodDef,
    },
}

fn default_spectrum_points() -> usize {
    101
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TimeGridDef {
    pub t_min_s: f64,
    pub t_max_s: f64,
    pub n_points: usize,
    #[serde(default)]
    pub spacing: SpacingDef,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SpacingDef {
    #[default]
    Linear,
    Log,
}

/// Index, label/alias, or explicit population vector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum InitialStateDef {
    Index(usize),
    Label(String),
    Vector(Vec<f64>),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContrastMethodDef {
    #[default]
    SteadyState,
    Transient {
        t_max_s: f64,
    },
    TimeIntegrated {
        t_integration_s: f64,
        #[serde(default = "default_integration_points")]
        n_points: usize,
    },
}

fn default_integration_points() -> usize {
    odmr_sim::DEFAULT_INTEGRATION_POINTS
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LineshapeDef {
    #[default]
    Lorentzian,
    Gaussian,
}
