use std::collections::BTreeMap;

use odmr_project::schema::*;
use odmr_project::{load_json, load_study, load_yaml, save_json, save_yaml, validate_study};

fn sample_study() -> StudyFile {
    StudyFile {
        version: 1,
        name: "Roundtrip".to_string(),
        model: ModelDef::Preset {
            name: "nv_bulk".to_string(),
            overrides: BTreeMap::from([("k47".to_string(), 12.0)]),
        },
        solver: Some(SolverDef {
            propagator: Some(PropagatorDef::Expm),
            null_space_tol: Some(1e-11),
            ..SolverDef::default()
        }),
        runs: vec![
            RunDef {
                id: "init".to_string(),
                name: Some("Polarisation".to_string()),
                kind: RunKindDef::Initialization {
                    gamma: 1.0,
                    kmw_minus: 0.0,
                    kmw_plus: 0.0,
                    grid: Some(TimeGridDef {
                        t_min_s: 1e-9,
                        t_max_s: 1e-3,
                        n_points: 50,
                        spacing: SpacingDef::Log,
                    }),
                    initial: Some(InitialStateDef::Vector(vec![
                        1.0 / 3.0,
                        1.0 / 3.0,
                        1.0 / 3.0,
                        0.0,
                        0.0,
                        0.0,
                        0.0,
                    ])),
                },
            },
            RunDef {
                id: "readout".to_string(),
                name: None,
                kind: RunKindDef::Readout {
                    gamma: 1.0,
                    initial: InitialStateDef::Label("gs_minus".to_string()),
                    grid: None,
                },
            },
            RunDef {
                id: "transient".to_string(),
                name: None,
                kind: RunKindDef::Contrast {
                    gamma: 0.1,
                    kmw_minus: 1.0,
                    kmw_plus: 0.0,
                    method: ContrastMethodDef::Transient { t_max_s: 1e-4 },
                    initial: Some(InitialStateDef::Index(0)),
                },
            },
            RunDef {
                id: "spectrum".to_string(),
                name: None,
                kind: RunKindDef::Spectrum {
                    gamma: 0.1,
                    freq_center: 2.87,
                    freq_width: 0.3,
                    n_points: 31,
                    peak_freq_minus: Some(2.8),
                    peak_freq_plus: None,
                    linewidth: 0.02,
                    kmw_amplitude: 0.5,
                    lineshape: LineshapeDef::Gaussian,
                    method: ContrastMethodDef::TimeIntegrated {
                        t_integration_s: 1e-5,
                        n_points: 500,
                    },
                },
            },
        ],
    }
}

fn custom_study() -> StudyFile {
    StudyFile {
        version: 1,
        name: "Custom".to_string(),
        model: ModelDef::Custom(CustomModelDef {
            labels: vec!["g".into(), "e".into()],
            rates: vec![RateDef {
                from: 1,
                to: 0,
                rate_mhz: 10.0,
            }],
            dynamic: vec![DynamicRateDef {
                name: "gamma".into(),
                from: 0,
                to: 1,
                coefficient: 1.0,
            }],
            ground_states: vec![0],
            excited_states: vec![1],
            aliases: BTreeMap::from([("ground".to_string(), 0)]),
            ..CustomModelDef::default()
        }),
        solver: None,
        runs: vec![RunDef {
            id: "sweep".to_string(),
            name: None,
            kind: RunKindDef::GammaSweep {
                gammas: vec![0.1, 1.0],
                kmw_minus: 0.0,
                kmw_plus: 0.0,
                method: ContrastMethodDef::SteadyState,
            },
        }],
    }
}

#[test]
fn roundtrip_yaml_preset_study() {
    let study = sample_study();
    validate_study(&study).unwrap();

    let path = std::env::temp_dir().join("odmr_project_roundtrip_preset.yaml");
    save_yaml(&path, &study).unwrap();
    let loaded = load_yaml(&path).unwrap();

    assert_eq!(study, loaded);
}

#[test]
fn roundtrip_json_custom_study() {
    let study = custom_study();

    let path = std::env::temp_dir().join("odmr_project_roundtrip_custom.json");
    save_json(&path, &study).unwrap();
    let loaded = load_json(&path).unwrap();

    assert_eq!(study, loaded);
}

#[test]
fn load_study_dispatches_on_extension() {
    let study = custom_study();
    let dir = std::env::temp_dir();

    let json = dir.join("odmr_project_dispatch.json");
    save_json(&json, &study).unwrap();
    assert_eq!(load_study(&json).unwrap(), study);

    let yaml = dir.join("odmr_project_dispatch.yml");
    save_yaml(&yaml, &study).unwrap();
    assert_eq!(load_study(&yaml).unwrap(), study);
}

#[test]
fn save_refuses_invalid_study() {
    let mut study = custom_study();
    study.runs.push(study.runs[0].clone());
    let path = std::env::temp_dir().join("odmr_project_invalid.yaml");
    assert!(save_yaml(&path, &study).is_err());
}

#[test]
fn defaults_fill_in_when_omitted() {
    let yaml = r#"
version: 1
name: Minimal
model:
  type: preset
  name: NV-Bulk
runs:
  - id: c
    kind:
      type: contrast
      gamma: 0.1
      kmw_plus: 2.0
"#;
    let study: StudyFile = serde_yaml::from_str(yaml).unwrap();
    validate_study(&study).unwrap();
    match &study.runs[0].kind {
        RunKindDef::Contrast {
            kmw_minus,
            method,
            initial,
            ..
        } => {
            assert_eq!(*kmw_minus, 0.0);
            assert_eq!(*method, ContrastMethodDef::SteadyState);
            assert!(initial.is_none());
        }
        other => panic!("unexpected run kind: {other:?}"),
    }
}
