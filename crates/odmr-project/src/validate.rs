//! Study validation logic.

use std::collections::HashSet;

use odmr_presets::{SevenLevelRates, get_preset_info, seven_level};

use crate::schema::{
    ContrastMethodDef, CustomModelDef, InitialStateDef, ModelDef, RunDef, RunKindDef, SpacingDef,
    StudyFile, TimeGridDef,
};

pub const LATEST_VERSION: u32 = 1;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Duplicate ID: {id} in {context}")]
    DuplicateId { id: String, context: String },

    #[error("Missing reference: {id} in {context}")]
    MissingReference { id: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

fn invalid(field: impl Into<String>, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.into(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn check_rate(field: impl Into<String>, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(invalid(field, value, "must be finite and >= 0"));
    }
    Ok(())
}

fn check_index(field: impl Into<String>, index: usize, n_states: usize) -> Result<(), ValidationError> {
    if index >= n_states {
        return Err(invalid(
            field,
            index,
            &format!("state index out of range for {n_states} states"),
        ));
    }
    Ok(())
}

pub fn validate_study(study: &StudyFile) -> Result<(), ValidationError> {
    if study.version == 0 || study.version > LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: study.version,
        });
    }

    let n_states = validate_model(&study.model)?;

    if let Some(solver) = &study.solver {
        for (field, value) in [
            ("solver.null_space_tol", solver.null_space_tol),
            ("solver.residual_tol", solver.residual_tol),
            ("solver.negativity_tol", solver.negativity_tol),
            ("solver.sum_rel_tol", solver.sum_rel_tol),
            ("solver.rtol", solver.rtol),
            ("solver.atol", solver.atol),
        ] {
            if let Some(v) = value {
                if !v.is_finite() || v <= 0.0 {
                    return Err(invalid(field, v, "tolerance must be finite and > 0"));
                }
            }
        }
        if solver.max_steps == Some(0) {
            return Err(invalid("solver.max_steps", 0, "must be > 0"));
        }
    }

    let mut run_ids = HashSet::new();
    for run in &study.runs {
        if run.id.trim().is_empty() {
            return Err(invalid("run.id", "''", "must not be empty"));
        }
        if !run_ids.insert(&run.id) {
            return Err(ValidationError::DuplicateId {
                id: run.id.clone(),
                context: "runs".to_string(),
            });
        }
        validate_run(run, n_states)?;
    }

    Ok(())
}

/// Checks the model definition and returns its state count.
fn validate_model(model: &ModelDef) -> Result<usize, ValidationError> {
    match model {
        ModelDef::Preset { name, overrides } => {
            get_preset_info(name).map_err(|_| ValidationError::MissingReference {
                id: name.clone(),
                context: "preset catalog".to_string(),
            })?;
            let defaults = SevenLevelRates::default();
            for (key, &value) in overrides {
                if defaults.get(key).is_err() {
                    return Err(ValidationError::MissingReference {
                        id: key.clone(),
                        context: "preset rate constants".to_string(),
                    });
                }
                check_rate(format!("overrides.{key}"), value)?;
            }
            Ok(seven_level::N_STATES)
        }
        ModelDef::Custom(custom) => validate_custom(custom),
    }
}

fn validate_custom(custom: &CustomModelDef) -> Result<usize, ValidationError> {
    let n_states = match (custom.labels.len(), custom.n_states) {
        (0, None) => {
            return Err(invalid("model", "custom", "needs labels or n_states"));
        }
        (0, Some(n)) => n,
        (n, None) => n,
        (n, Some(m)) if n == m => n,
        (n, Some(m)) => {
            return Err(invalid(
                "model.n_states",
                m,
                &format!("does not match the {n} labels given"),
            ));
        }
    };
    if n_states == 0 {
        return Err(invalid("model.n_states", 0, "must be > 0"));
    }

    let mut labels = HashSet::new();
    for label in &custom.labels {
        if !labels.insert(label) {
            return Err(ValidationError::DuplicateId {
                id: label.clone(),
                context: "model.labels".to_string(),
            });
        }
    }

    let mut pairs = HashSet::new();
    for rate in &custom.rates {
        check_index("model.rates.from", rate.from, n_states)?;
        check_index("model.rates.to", rate.to, n_states)?;
        if rate.from == rate.to {
            return Err(invalid("model.rates", rate.from, "self-transition"));
        }
        check_rate(format!("model.rates[{}->{}]", rate.from, rate.to), rate.rate_mhz)?;
        if !pairs.insert((rate.from, rate.to)) {
            return Err(ValidationError::DuplicateId {
                id: format!("{}->{}", rate.from, rate.to),
                context: "model.rates".to_string(),
            });
        }
    }
    for slot in &custom.dynamic {
        if slot.name.trim().is_empty() {
            return Err(invalid("model.dynamic.name", "''", "must not be empty"));
        }
        check_index("model.dynamic.from", slot.from, n_states)?;
        check_index("model.dynamic.to", slot.to, n_states)?;
        if slot.from == slot.to {
            return Err(invalid("model.dynamic", slot.from, "self-transition"));
        }
        check_rate(format!("model.dynamic[{}].coefficient", slot.name), slot.coefficient)?;
        if !pairs.insert((slot.from, slot.to)) {
            return Err(ValidationError::DuplicateId {
                id: format!("{}->{}", slot.from, slot.to),
                context: "model.dynamic".to_string(),
            });
        }
    }

    for &index in &custom.ground_states {
        check_index("model.ground_states", index, n_states)?;
    }
    for &index in &custom.excited_states {
        check_index("model.excited_states", index, n_states)?;
    }
    if let Some(radiative) = &custom.radiative_rates {
        if radiative.len() != custom.excited_states.len() {
            return Err(invalid(
                "model.radiative_rates",
                radiative.len(),
                "needs one rate per excited state",
            ));
        }
        for &rate in radiative {
            check_rate("model.radiative_rates", rate)?;
        }
    }
    for (alias, &index) in &custom.aliases {
        check_index(format!("model.aliases.{alias}"), index, n_states)?;
    }
    for readout in &custom.readout_states {
        check_index(format!("model.readout_states.{}", readout.label), readout.index, n_states)?;
    }
    Ok(n_states)
}

fn validate_grid(run: &str, grid: &Option<TimeGridDef>) -> Result<(), ValidationError> {
    let Some(grid) = grid else {
        return Ok(());
    };
    let field = format!("runs.{run}.grid");
    if !grid.t_min_s.is_finite() || !grid.t_max_s.is_finite() || grid.t_min_s < 0.0 {
        return Err(invalid(&field, grid.t_min_s, "bounds must be finite and >= 0"));
    }
    if grid.t_max_s < grid.t_min_s {
        return Err(invalid(&field, grid.t_max_s, "t_max_s must be >= t_min_s"));
    }
    if grid.n_points == 0 || (grid.n_points == 1 && grid.t_max_s != grid.t_min_s) {
        return Err(invalid(&field, grid.n_points, "needs at least 2 points"));
    }
    if grid.spacing == SpacingDef::Log && grid.t_min_s <= 0.0 {
        return Err(invalid(&field, grid.t_min_s, "log spacing needs t_min_s > 0"));
    }
    Ok(())
}

fn validate_initial(
    run: &str,
    initial: Option<&InitialStateDef>,
    n_states: usize,
) -> Result<(), ValidationError> {
    match initial {
        Some(InitialStateDef::Index(index)) => {
            check_index(format!("runs.{run}.initial"), *index, n_states)
        }
        Some(InitialStateDef::Vector(p0)) => {
            if p0.len() != n_states {
                return Err(invalid(
                    format!("runs.{run}.initial"),
                    p0.len(),
                    &format!("population vector needs {n_states} entries"),
                ));
            }
            if p0.iter().any(|v| !v.is_finite()) {
                return Err(invalid(format!("runs.{run}.initial"), "vector", "entries must be finite"));
            }
            Ok(())
        }
        // Labels resolve against the compiled system.
        Some(InitialStateDef::Label(_)) | None => Ok(()),
    }
}

fn validate_method(run: &str, method: &ContrastMethodDef) -> Result<(), ValidationError> {
    match *method {
        ContrastMethodDef::SteadyState => Ok(()),
        ContrastMethodDef::Transient { t_max_s } => {
            if !t_max_s.is_finite() || t_max_s < 0.0 {
                return Err(invalid(format!("runs.{run}.method.t_max_s"), t_max_s, "must be >= 0"));
            }
            Ok(())
        }
        ContrastMethodDef::TimeIntegrated {
            t_integration_s,
            n_points,
        } => {
            if !t_integration_s.is_finite() || t_integration_s <= 0.0 {
                return Err(invalid(
                    format!("runs.{run}.method.t_integration_s"),
                    t_integration_s,
                    "must be > 0",
                ));
            }
            if n_points < 2 {
                return Err(invalid(format!("runs.{run}.method.n_points"), n_points, "must be >= 2"));
            }
            Ok(())
        }
    }
}

fn validate_run(run: &RunDef, n_states: usize) -> Result<(), ValidationError> {
    let id = run.id.as_str();
    match &run.kind {
        RunKindDef::Initialization {
            gamma,
            kmw_minus,
            kmw_plus,
            grid,
            initial,
        } => {
            check_rate(format!("runs.{id}.gamma"), *gamma)?;
            check_rate(format!("runs.{id}.kmw_minus"), *kmw_minus)?;
            check_rate(format!("runs.{id}.kmw_plus"), *kmw_plus)?;
            validate_grid(id, grid)?;
            validate_initial(id, initial.as_ref(), n_states)
        }
        RunKindDef::Readout {
            gamma,
            initial,
            grid,
        } => {
            check_rate(format!("runs.{id}.gamma"), *gamma)?;
            validate_grid(id, grid)?;
            validate_initial(id, Some(initial), n_states)
        }
        RunKindDef::ReadoutComparison { gamma, grid } => {
            check_rate(format!("runs.{id}.gamma"), *gamma)?;
            validate_grid(id, grid)
        }
        RunKindDef::Contrast {
            gamma,
            kmw_minus,
            kmw_plus,
            method,
            initial,
        } => {
            check_rate(format!("runs.{id}.gamma"), *gamma)?;
            check_rate(format!("runs.{id}.kmw_minus"), *kmw_minus)?;
            check_rate(format!("runs.{id}.kmw_plus"), *kmw_plus)?;
            validate_method(id, method)?;
            validate_initial(id, initial.as_ref(), n_states)
        }
        RunKindDef::GammaSweep {
            gammas,
            kmw_minus,
            kmw_plus,
            method,
        } => {
            if gammas.is_empty() {
                return Err(invalid(format!("runs.{id}.gammas"), "[]", "must not be empty"));
            }
            for &gamma in gammas {
                check_rate(format!("runs.{id}.gammas"), gamma)?;
            }
            check_rate(format!("runs.{id}.kmw_minus"), *kmw_minus)?;
            check_rate(format!("runs.{id}.kmw_plus"), *kmw_plus)?;
            validate_method(id, method)
        }
        RunKindDef::Spectrum {
            gamma,
            freq_center,
            freq_width,
            n_points,
            linewidth,
            kmw_amplitude,
            method,
            ..
        } => {
            check_rate(format!("runs.{id}.gamma"), *gamma)?;
            check_rate(format!("runs.{id}.kmw_amplitude"), *kmw_amplitude)?;
            if !freq_center.is_finite() {
                return Err(invalid(format!("runs.{id}.freq_center"), freq_center, "must be finite"));
            }
            check_rate(format!("runs.{id}.freq_width"), *freq_width)?;
            if *n_points == 0 {
                return Err(invalid(format!("runs.{id}.n_points"), n_points, "must be > 0"));
            }
            if !linewidth.is_finite() || *linewidth <= 0.0 {
                return Err(invalid(format!("runs.{id}.linewidth"), linewidth, "must be > 0"));
            }
            validate_method(id, method)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::*;
    use std::collections::BTreeMap;

    fn preset_study(runs: Vec<RunDef>) -> StudyFile {
        StudyFile {
            version: 1,
            name: "test".to_string(),
            model: ModelDef::Preset {
                name: "nv_bulk".to_string(),
                overrides: BTreeMap::new(),
            },
            solver: None,
            runs,
        }
    }

    fn contrast_run(id: &str) -> RunDef {
        RunDef {
            id: id.to_string(),
            name: None,
            kind: RunKindDef::Contrast {
                gamma: 0.1,
                kmw_minus: 1.0,
                kmw_plus: 0.0,
                method: ContrastMethodDef::SteadyState,
                initial: None,
            },
        }
    }

    #[test]
    fn accepts_simple_study() {
        validate_study(&preset_study(vec![contrast_run("a"), contrast_run("b")])).unwrap();
    }

    #[test]
    fn rejects_newer_version() {
        let mut study = preset_study(vec![]);
        study.version = LATEST_VERSION + 1;
        assert_eq!(
            validate_study(&study),
            Err(ValidationError::UnsupportedVersion {
                version: LATEST_VERSION + 1
            })
        );
    }

    #[test]
    fn rejects_duplicate_run_ids() {
        let study = preset_study(vec![contrast_run("a"), contrast_run("a")]);
        assert!(matches!(
            validate_study(&study),
            Err(ValidationError::DuplicateId { .. })
        ));
    }

    #[test]
    fn rejects_unknown_preset_and_override() {
        let mut study = preset_study(vec![]);
        study.model = ModelDef::Preset {
            name: "nope".to_string(),
            overrides: BTreeMap::new(),
        };
        assert!(matches!(
            validate_study(&study),
            Err(ValidationError::MissingReference { .. })
        ));

        study.model = ModelDef::Preset {
            name: "nv_bulk".to_string(),
            overrides: BTreeMap::from([("k99".to_string(), 1.0)]),
        };
        assert!(matches!(
            validate_study(&study),
            Err(ValidationError::MissingReference { .. })
        ));
    }

    #[test]
    fn rejects_bad_custom_wiring() {
        let mut custom = CustomModelDef {
            n_states: Some(2),
            rates: vec![RateDef {
                from: 0,
                to: 2,
                rate_mhz: 1.0,
            }],
            ..CustomModelDef::default()
        };
        let mut study = preset_study(vec![]);
        study.model = ModelDef::Custom(custom.clone());
        assert!(matches!(
            validate_study(&study),
            Err(ValidationError::InvalidValue { .. })
        ));

        custom.rates = vec![RateDef {
            from: 0,
            to: 1,
            rate_mhz: 1.0,
        }];
        custom.dynamic = vec![DynamicRateDef {
            name: "gamma".to_string(),
            from: 0,
            to: 1,
            coefficient: 1.0,
        }];
        study.model = ModelDef::Custom(custom);
        assert!(matches!(
            validate_study(&study),
            Err(ValidationError::DuplicateId { .. })
        ));
    }

    #[test]
    fn rejects_non_positive_grids() {
        let run = RunDef {
            id: "init".to_string(),
            name: None,
            kind: RunKindDef::Initialization {
                gamma: 0.1,
                kmw_minus: 0.0,
                kmw_plus: 0.0,
                grid: Some(TimeGridDef {
                    t_min_s: 0.0,
                    t_max_s: 1e-3,
                    n_points: 100,
                    spacing: SpacingDef::Log,
                }),
                initial: None,
            },
        };
        assert!(matches!(
            validate_study(&preset_study(vec![run])),
            Err(ValidationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn rejects_wrong_length_initial_vector() {
        let run = RunDef {
            id: "r".to_string(),
            name: None,
            kind: RunKindDef::Readout {
                gamma: 1.0,
                initial: InitialStateDef::Vector(vec![1.0, 0.0]),
                grid: None,
            },
        };
        assert!(validate_study(&preset_study(vec![run])).is_err());
    }
}
