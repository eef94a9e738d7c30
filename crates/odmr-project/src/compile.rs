//! Turns a validated study into a runnable system and solver.

use nalgebra::DVector;
use odmr_model::{RateModel, SpinSystem, UnboundPolicy};
use odmr_presets::{get_preset_info, seven_level_system};
use odmr_sim::{ContrastMethod, InitialState, Lineshape, Propagator, Spacing, TimeGrid};
use odmr_solver::{RateSolver, SolverConfig};
use tracing::debug;

use crate::ProjectResult;
use crate::schema::{
    ContrastMethodDef, CustomModelDef, InitialStateDef, LineshapeDef, ModelDef, PropagatorDef,
    SolverDef, SpacingDef, StudyFile, TimeGridDef,
};
use crate::validate::validate_study;

/// A study with its model built and solver configured, ready to execute runs.
#[derive(Debug, Clone)]
pub struct CompiledStudy {
    pub system: SpinSystem,
    pub solver: RateSolver,
    pub propagator: Propagator,
}

impl CompiledStudy {
    pub fn compile(study: &StudyFile) -> ProjectResult<Self> {
        validate_study(study)?;
        let system = compile_system(&study.model)?;
        let (solver, propagator) = compile_solver(study.solver.as_ref());
        debug!(
            study = study.name.as_str(),
            n_states = system.n_states(),
            n_runs = study.runs.len(),
            "Compiled study"
        );
        Ok(Self {
            system,
            solver,
            propagator,
        })
    }
}

pub fn compile_system(model: &ModelDef) -> ProjectResult<SpinSystem> {
    match model {
        ModelDef::Preset { name, overrides } => {
            let entry = get_preset_info(name)?;
            if overrides.is_empty() {
                return Ok(entry.system()?);
            }
            let mut rates = entry.rates;
            for (key, &value) in overrides {
                rates.set(key, value)?;
            }
            Ok(seven_level_system(&rates, entry.label_style)?)
        }
        ModelDef::Custom(custom) => compile_custom(custom),
    }
}

fn compile_custom(custom: &CustomModelDef) -> ProjectResult<SpinSystem> {
    let mut model = if custom.labels.is_empty() {
        RateModel::new(custom.n_states.unwrap_or(0))?
    } else {
        RateModel::with_labels(custom.labels.iter().cloned())?
    };
    if custom.strict_parameters {
        model = model.with_unbound_policy(UnboundPolicy::Strict);
    }
    model.set_rates(custom.rates.iter().map(|r| ((r.from, r.to), r.rate_mhz)))?;
    for slot in &custom.dynamic {
        model.add_scaled_dynamic_rate(slot.name.as_str(), slot.from, slot.to, slot.coefficient)?;
    }

    let mut system = SpinSystem::new(model)
        .with_ground_states(custom.ground_states.iter().copied())?
        .with_excited_states(custom.excited_states.iter().copied())?;
    if let Some(radiative) = &custom.radiative_rates {
        system = system.with_radiative_rates(radiative.clone())?;
    }
    for (alias, &index) in &custom.aliases {
        system = system.with_alias(alias.as_str(), index)?;
    }
    for readout in &custom.readout_states {
        system = system.with_readout_state(readout.label.as_str(), readout.index)?;
    }
    Ok(system)
}

/// Solver and propagation route with the study's overrides applied on
/// top of the defaults.
pub fn compile_solver(def: Option<&SolverDef>) -> (RateSolver, Propagator) {
    let mut config = SolverConfig::default();
    let Some(def) = def else {
        return (RateSolver::new(config), Propagator::default());
    };
    if let Some(v) = def.null_space_tol {
        config.null_space_tol = v;
    }
    if let Some(v) = def.residual_tol {
        config.residual_tol = v;
    }
    if let Some(v) = def.negativity_tol {
        config.population.negativity_tol = v;
    }
    if let Some(v) = def.sum_rel_tol {
        config.population.sum_rel_tol = v;
    }
    if let Some(v) = def.clamp_negative {
        config.population.clamp_negative = v;
    }
    if let Some(v) = def.rtol {
        config.ode.rtol = v;
    }
    if let Some(v) = def.atol {
        config.ode.atol = v;
    }
    if let Some(v) = def.max_steps {
        config.ode.max_steps = v;
    }
    let propagator = def.propagator.map(Propagator::from).unwrap_or_default();
    (RateSolver::new(config), propagator)
}

impl From<PropagatorDef> for Propagator {
    fn from(def: PropagatorDef) -> Self {
        match def {
            PropagatorDef::Expm => Propagator::Expm,
            PropagatorDef::Ode => Propagator::Ode,
        }
    }
}

impl From<TimeGridDef> for TimeGrid {
    fn from(def: TimeGridDef) -> Self {
        TimeGrid {
            t_min: def.t_min_s,
            t_max: def.t_max_s,
            n_points: def.n_points,
            spacing: match def.spacing {
                SpacingDef::Linear => Spacing::Linear,
                SpacingDef::Log => Spacing::Log,
            },
        }
    }
}

impl From<ContrastMethodDef> for ContrastMethod {
    fn from(def: ContrastMethodDef) -> Self {
        match def {
            ContrastMethodDef::SteadyState => ContrastMethod::SteadyState,
            ContrastMethodDef::Transient { t_max_s } => ContrastMethod::Transient { t_max: t_max_s },
            ContrastMethodDef::TimeIntegrated {
                t_integration_s,
                n_points,
            } => ContrastMethod::TimeIntegrated {
                t_integration: t_integration_s,
                n_points,
            },
        }
    }
}

impl From<LineshapeDef> for Lineshape {
    fn from(def: LineshapeDef) -> Self {
        match def {
            LineshapeDef::Lorentzian => Lineshape::Lorentzian,
            LineshapeDef::Gaussian => Lineshape::Gaussian,
        }
    }
}

impl From<&InitialStateDef> for InitialState {
    fn from(def: &InitialStateDef) -> Self {
        match def {
            InitialStateDef::Index(index) => InitialState::Index(*index),
            InitialStateDef::Label(label) => InitialState::Label(label.clone()),
            InitialStateDef::Vector(p0) => InitialState::Vector(DVector::from_column_slice(p0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DynamicRateDef, RateDef, ReadoutStateDef};
    use odmr_model::RateParams;
    use std::collections::BTreeMap;

    #[test]
    fn preset_overrides_change_rates() {
        let model = ModelDef::Preset {
            name: "nv_bulk".to_string(),
            overrides: BTreeMap::from([("k71".to_string(), 2.5)]),
        };
        let system = compile_system(&model).unwrap();
        let w = system.model().build_rate_matrix_mhz(&RateParams::new()).unwrap();
        // Singlet (6) -> GS|0> (0)
        assert_eq!(w[(0, 6)], 2.5);
    }

    #[test]
    fn custom_model_is_wired_as_declared() {
        let custom = CustomModelDef {
            labels: vec!["g".into(), "e".into(), "m".into()],
            rates: vec![
                RateDef {
                    from: 1,
                    to: 0,
                    rate_mhz: 50.0,
                },
                RateDef {
                    from: 2,
                    to: 0,
                    rate_mhz: 1.0,
                },
            ],
            dynamic: vec![DynamicRateDef {
                name: "gamma".into(),
                from: 0,
                to: 1,
                coefficient: 2.0,
            }],
            ground_states: vec![0],
            excited_states: vec![1],
            radiative_rates: Some(vec![50.0]),
            readout_states: vec![ReadoutStateDef {
                label: "ground".into(),
                index: 0,
            }],
            ..CustomModelDef::default()
        };
        let system = compile_system(&ModelDef::Custom(custom)).unwrap();
        assert_eq!(system.n_states(), 3);
        assert_eq!(system.radiative_rates(), Some(&[50.0][..]));
        assert_eq!(system.resolve_label("GROUND").unwrap(), 0);
        let w = system
            .model()
            .build_rate_matrix_mhz(&RateParams::new().with("gamma", 0.5))
            .unwrap();
        assert_eq!(w[(1, 0)], 1.0);
    }

    #[test]
    fn strict_custom_model_requires_bindings() {
        let custom = CustomModelDef {
            n_states: Some(2),
            dynamic: vec![DynamicRateDef {
                name: "pump".into(),
                from: 0,
                to: 1,
                coefficient: 1.0,
            }],
            strict_parameters: true,
            ..CustomModelDef::default()
        };
        let system = compile_system(&ModelDef::Custom(custom)).unwrap();
        assert!(system.model().build_rate_matrix(&RateParams::new()).is_err());
    }

    #[test]
    fn solver_overrides_apply() {
        let def = SolverDef {
            propagator: Some(PropagatorDef::Ode),
            rtol: Some(1e-8),
            clamp_negative: Some(false),
            ..SolverDef::default()
        };
        let (solver, propagator) = compile_solver(Some(&def));
        assert_eq!(propagator, Propagator::Ode);
        assert_eq!(solver.config().ode.rtol, 1e-8);
        assert!(!solver.config().population.clamp_negative);
        assert_eq!(solver.config().null_space_tol, SolverConfig::default().null_space_tol);

        let (_, propagator) = compile_solver(None);
        assert_eq!(propagator, Propagator::Expm);
    }
}
