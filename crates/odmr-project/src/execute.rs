//! Executes study runs against a compiled system.

use odmr_sim::{
    ContrastMethod, Drive, InitialState, InitializationOptions, InitializationSimulation, OdmrSimulation,
    ReadoutOptions, ReadoutSimulation, SpectrumConfig, TimeGrid,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::compile::CompiledStudy;
use crate::schema::{RunDef, RunKindDef, StudyFile};
use crate::{ProjectError, ProjectResult};

/// Column-oriented time series; `rows[k]` holds one value per column at `times_s[k]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesOutput {
    pub columns: Vec<String>,
    pub times_s: Vec<f64>,
    pub rows: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContrastPoint {
    pub x: f64,
    pub contrast: f64,
    pub kmw_minus: f64,
    pub kmw_plus: f64,
}

/// Contrast against a swept (or single) independent variable named `x_label`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContrastOutput {
    pub x_label: String,
    pub points: Vec<ContrastPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunOutput {
    Series(SeriesOutput),
    Contrast(ContrastOutput),
}

impl RunOutput {
    pub fn kind(&self) -> &'static str {
        match self {
            RunOutput::Series(_) => "series",
            RunOutput::Contrast(_) => "contrast",
        }
    }
}

impl CompiledStudy {
    /// Run `id` from `study`.
    pub fn execute(&self, study: &StudyFile, id: &str) -> ProjectResult<RunOutput> {
        let run = study
            .runs
            .iter()
            .find(|run| run.id == id)
            .ok_or_else(|| ProjectError::UnknownRun { id: id.to_string() })?;
        self.execute_run(run)
    }

    pub fn execute_run(&self, run: &RunDef) -> ProjectResult<RunOutput> {
        info!(run = run.id.as_str(), "Executing run");
        let output = match &run.kind {
            RunKindDef::Initialization {
                gamma,
                kmw_minus,
                kmw_plus,
                grid,
                initial,
            } => {
                let mut opts = InitializationOptions {
                    propagator: self.propagator,
                    ..InitializationOptions::default()
                };
                if let Some(grid) = grid {
                    opts.grid = (*grid).into();
                }
                if let Some(initial) = initial {
                    opts.initial = initial.into();
                }
                let sim = InitializationSimulation::new(&self.system).with_solver(self.solver.clone());
                let result = sim.run(Drive::new(*gamma, *kmw_minus, *kmw_plus), &opts)?;

                let mut columns = self.state_columns();
                columns.push("total".to_string());
                let rows = result
                    .trajectory
                    .populations()
                    .iter()
                    .zip(&result.totals)
                    .map(|(p, total)| {
                        let mut row = p.as_slice().to_vec();
                        row.push(*total);
                        row
                    })
                    .collect();
                RunOutput::Series(SeriesOutput {
                    columns,
                    times_s: result.trajectory.times().to_vec(),
                    rows,
                })
            }
            RunKindDef::Readout {
                gamma,
                initial,
                grid,
            } => {
                let opts = self.readout_options(grid.map(Into::into));
                let sim = ReadoutSimulation::new(&self.system).with_solver(self.solver.clone());
                let result = sim.run(*gamma, &InitialState::from(initial), &opts)?;

                let mut columns = self.state_columns();
                columns.push("es_total".to_string());
                if result.photon_rate.is_some() {
                    columns.push("photon_rate".to_string());
                }
                let rows = result
                    .trajectory
                    .populations()
                    .iter()
                    .enumerate()
                    .map(|(k, p)| {
                        let mut row = p.as_slice().to_vec();
                        row.push(result.es_total[k]);
                        if let Some(rate) = &result.photon_rate {
                            row.push(rate[k]);
                        }
                        row
                    })
                    .collect();
                RunOutput::Series(SeriesOutput {
                    columns,
                    times_s: result.trajectory.times().to_vec(),
                    rows,
                })
            }
            RunKindDef::ReadoutComparison { gamma, grid } => {
                let opts = self.readout_options(grid.map(Into::into));
                let sim = ReadoutSimulation::new(&self.system).with_solver(self.solver.clone());
                let results = sim.run_comparison(*gamma, &opts)?;

                // Shared grid; one excited-population column per starting state.
                let columns: Vec<String> = results.keys().map(|label| format!("es_total[{label}]")).collect();
                let times_s = opts.grid.points()?;
                let rows = (0..times_s.len())
                    .map(|k| results.values().map(|r| r.es_total[k]).collect())
                    .collect();
                RunOutput::Series(SeriesOutput {
                    columns,
                    times_s,
                    rows,
                })
            }
            RunKindDef::Contrast {
                gamma,
                kmw_minus,
                kmw_plus,
                method,
                initial,
            } => {
                let initial = initial.as_ref().map(InitialState::from).unwrap_or_default();
                let contrast = self.odmr().compute_contrast_from(
                    Drive::new(*gamma, *kmw_minus, *kmw_plus),
                    &ContrastMethod::from(*method),
                    &initial,
                )?;
                RunOutput::Contrast(ContrastOutput {
                    x_label: "gamma_mhz".to_string(),
                    points: vec![ContrastPoint {
                        x: *gamma,
                        contrast,
                        kmw_minus: *kmw_minus,
                        kmw_plus: *kmw_plus,
                    }],
                })
            }
            RunKindDef::GammaSweep {
                gammas,
                kmw_minus,
                kmw_plus,
                method,
            } => {
                let sweep = self
                    .odmr()
                    .sweep_gamma(gammas, *kmw_minus, *kmw_plus, &ContrastMethod::from(*method))?;
                let points = sweep
                    .gammas
                    .iter()
                    .zip(&sweep.contrasts)
                    .map(|(&gamma, &contrast)| ContrastPoint {
                        x: gamma,
                        contrast,
                        kmw_minus: *kmw_minus,
                        kmw_plus: *kmw_plus,
                    })
                    .collect();
                RunOutput::Contrast(ContrastOutput {
                    x_label: "gamma_mhz".to_string(),
                    points,
                })
            }
            RunKindDef::Spectrum {
                gamma,
                freq_center,
                freq_width,
                n_points,
                peak_freq_minus,
                peak_freq_plus,
                linewidth,
                kmw_amplitude,
                lineshape,
                method,
            } => {
                let config = SpectrumConfig {
                    gamma: *gamma,
                    freq_center: *freq_center,
                    freq_width: *freq_width,
                    n_points: *n_points,
                    peak_freq_minus: *peak_freq_minus,
                    peak_freq_plus: *peak_freq_plus,
                    linewidth: *linewidth,
                    kmw_amplitude: *kmw_amplitude,
                    lineshape: (*lineshape).into(),
                    method: (*method).into(),
                };
                let spectrum = self.odmr().run_spectrum(&config)?;
                let points = (0..spectrum.frequencies.len())
                    .map(|k| ContrastPoint {
                        x: spectrum.frequencies[k],
                        contrast: spectrum.contrast[k],
                        kmw_minus: spectrum.kmw_minus[k],
                        kmw_plus: spectrum.kmw_plus[k],
                    })
                    .collect();
                RunOutput::Contrast(ContrastOutput {
                    x_label: "frequency_ghz".to_string(),
                    points,
                })
            }
        };
        Ok(output)
    }

    fn odmr(&self) -> OdmrSimulation<'_> {
        OdmrSimulation::new(&self.system).with_solver(self.solver.clone())
    }

    fn readout_options(&self, grid: Option<TimeGrid>) -> ReadoutOptions {
        let mut opts = ReadoutOptions {
            propagator: self.propagator,
            ..ReadoutOptions::default()
        };
        if let Some(grid) = grid {
            opts.grid = grid;
        }
        opts
    }

    fn state_columns(&self) -> Vec<String> {
        self.system.model().labels().to_vec()
    }
}
