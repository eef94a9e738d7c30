//! ODMR contrast, gamma sweeps and spectra.
//!
//! Contrast is `(I_noMW - I_MW) / I_noMW`, signed. Positive means the
//! microwave lowers fluorescence; some metastable-state configurations
//! invert the sign and that is reported as-is.

use nalgebra::DVector;
use odmr_core::{linspace, trapz};
use odmr_model::{RateParams, SpinSystem};
use odmr_solver::RateSolver;
use tracing::{debug, trace, warn};

use crate::drive::Drive;
use crate::error::{SimError, SimResult};
use crate::initial::InitialState;
use crate::lineshape::Lineshape;

/// Samples for the time-integrated method. The trapezoid rule only
/// resolves W's fastest timescale if the spacing `T / n` is well below it.
pub const DEFAULT_INTEGRATION_POINTS: usize = 10_000;

/// How the fluorescence intensity `I` is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ContrastMethod {
    /// Excited population of the stationary state. Fails on reducible generators.
    #[default]
    SteadyState,
    /// Excited population at `t_max` (s) only.
    Transient { t_max: f64 },
    /// Trapezoid integral of the excited population over `[0, t_integration]` (s)
    /// on a linear grid of `n_points`.
    TimeIntegrated { t_integration: f64, n_points: usize },
}

impl ContrastMethod {
    pub fn transient(t_max: f64) -> Self {
        ContrastMethod::Transient { t_max }
    }

    pub fn time_integrated(t_integration: f64) -> Self {
        ContrastMethod::TimeIntegrated {
            t_integration,
            n_points: DEFAULT_INTEGRATION_POINTS,
        }
    }

    fn validate(&self) -> SimResult<()> {
        match *self {
            ContrastMethod::SteadyState => Ok(()),
            ContrastMethod::Transient { t_max } => {
                if !(t_max.is_finite() && t_max >= 0.0) {
                    return Err(SimError::InvalidArg {
                        what: format!("transient contrast needs t_max >= 0, got {t_max}"),
                    });
                }
                Ok(())
            }
            ContrastMethod::TimeIntegrated {
                t_integration,
                n_points,
            } => {
                if !(t_integration.is_finite() && t_integration > 0.0) {
                    return Err(SimError::InvalidArg {
                        what: format!(
                            "time-integrated contrast needs t_integration > 0, got {t_integration}"
                        ),
                    });
                }
                if n_points < 2 {
                    return Err(SimError::InvalidArg {
                        what: format!("time-integrated contrast needs at least 2 points, got {n_points}"),
                    });
                }
                Ok(())
            }
        }
    }
}

/// Which excited-state observable stands in for fluorescence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FluorescenceProxy {
    /// Plain sum of excited-state populations.
    #[default]
    ExcitedPopulation,
    /// Excited populations weighted by their radiative rates (needs
    /// radiative rates on the system).
    RadiativeWeighted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GammaSweep {
    pub gammas: Vec<f64>,
    pub contrasts: Vec<f64>,
}

/// Microwave frequency sweep across the two spin resonances.
///
/// Frequencies in GHz, rates in MHz.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrumConfig {
    pub gamma: f64,
    pub freq_center: f64,
    /// Full span of the sweep
    pub freq_width: f64,
    pub n_points: usize,
    /// Defaults to `freq_center - freq_width / 4`
    pub peak_freq_minus: Option<f64>,
    /// Defaults to `freq_center + freq_width / 4`
    pub peak_freq_plus: Option<f64>,
    /// Half width at half maximum
    pub linewidth: f64,
    /// Microwave rate at exact resonance
    pub kmw_amplitude: f64,
    pub lineshape: Lineshape,
    pub method: ContrastMethod,
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            gamma: 0.1,
            freq_center: 3.0,
            freq_width: 0.5,
            n_points: 101,
            peak_freq_minus: None,
            peak_freq_plus: None,
            linewidth: 0.05,
            kmw_amplitude: 1.0,
            lineshape: Lineshape::default(),
            method: ContrastMethod::SteadyState,
        }
    }
}

impl SpectrumConfig {
    pub fn peaks(&self) -> (f64, f64) {
        (
            self.peak_freq_minus
                .unwrap_or(self.freq_center - self.freq_width / 4.0),
            self.peak_freq_plus
                .unwrap_or(self.freq_center + self.freq_width / 4.0),
        )
    }

    fn validate(&self) -> SimResult<()> {
        let finite = [self.gamma, self.freq_center, self.freq_width, self.linewidth, self.kmw_amplitude]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(SimError::InvalidArg {
                what: "spectrum parameters must be finite".to_string(),
            });
        }
        if self.n_points == 0 {
            return Err(SimError::InvalidArg {
                what: "spectrum needs at least one frequency point".to_string(),
            });
        }
        if self.freq_width < 0.0 {
            return Err(SimError::InvalidArg {
                what: format!("spectrum width must be >= 0, got {}", self.freq_width),
            });
        }
        if self.linewidth <= 0.0 {
            return Err(SimError::InvalidArg {
                what: format!("linewidth must be > 0, got {}", self.linewidth),
            });
        }
        if self.kmw_amplitude < 0.0 {
            return Err(SimError::InvalidArg {
                what: format!("microwave amplitude must be >= 0, got {}", self.kmw_amplitude),
            });
        }
        self.method.validate()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    /// GHz
    pub frequencies: Vec<f64>,
    pub contrast: Vec<f64>,
    /// Effective microwave rates (MHz) at each frequency
    pub kmw_minus: Vec<f64>,
    pub kmw_plus: Vec<f64>,
    pub peak_freq_minus: f64,
    pub peak_freq_plus: f64,
}

pub struct OdmrSimulation<'a> {
    system: &'a SpinSystem,
    solver: RateSolver,
    proxy: FluorescenceProxy,
    extra: RateParams,
}

impl<'a> OdmrSimulation<'a> {
    pub fn new(system: &'a SpinSystem) -> Self {
        Self {
            system,
            solver: RateSolver::default(),
            proxy: FluorescenceProxy::default(),
            extra: RateParams::new(),
        }
    }

    pub fn with_solver(mut self, solver: RateSolver) -> Self {
        self.solver = solver;
        self
    }

    pub fn with_proxy(mut self, proxy: FluorescenceProxy) -> Self {
        self.proxy = proxy;
        self
    }

    /// Extra dynamic-parameter bindings applied to every build.
    pub fn with_extra_params(mut self, extra: RateParams) -> Self {
        self.extra = extra;
        self
    }

    /// Contrast from the system's default initial state.
    pub fn compute_contrast(&self, drive: Drive, method: &ContrastMethod) -> SimResult<f64> {
        self.compute_contrast_from(drive, method, &InitialState::Default)
    }

    /// Contrast from a chosen initial state. The steady-state method does
    /// not depend on it.
    pub fn compute_contrast_from(
        &self,
        drive: Drive,
        method: &ContrastMethod,
        initial: &InitialState,
    ) -> SimResult<f64> {
        method.validate()?;
        let weights = self.weights()?;
        let p0 = initial.resolve(self.system)?;

        let reference = self.intensity(drive.without_microwave(), method, &p0, &weights)?;
        let driven = self.intensity(drive, method, &p0, &weights)?;
        if reference == 0.0 {
            warn!(
                gamma = drive.gamma,
                "No fluorescence without microwave; reporting zero contrast"
            );
            return Ok(0.0);
        }
        let contrast = (reference - driven) / reference;
        trace!(gamma = drive.gamma, reference, driven, contrast, "Contrast");
        Ok(contrast)
    }

    /// One independent contrast per gamma.
    pub fn sweep_gamma(
        &self,
        gammas: &[f64],
        kmw_minus: f64,
        kmw_plus: f64,
        method: &ContrastMethod,
    ) -> SimResult<GammaSweep> {
        let contrasts = gammas
            .iter()
            .map(|&gamma| self.compute_contrast(Drive::new(gamma, kmw_minus, kmw_plus), method))
            .collect::<SimResult<Vec<_>>>()?;
        debug!(n = gammas.len(), "Gamma sweep");
        Ok(GammaSweep {
            gammas: gammas.to_vec(),
            contrasts,
        })
    }

    /// Contrast across a frequency grid spanning
    /// `[freq_center - freq_width / 2, freq_center + freq_width / 2]`.
    /// Both resonances contribute wherever their lineshapes overlap.
    pub fn run_spectrum(&self, config: &SpectrumConfig) -> SimResult<Spectrum> {
        config.validate()?;
        let (peak_minus, peak_plus) = config.peaks();
        let half = config.freq_width / 2.0;
        let frequencies = if config.n_points == 1 {
            vec![config.freq_center]
        } else {
            linspace(config.freq_center - half, config.freq_center + half, config.n_points)
        };

        let mut contrast = Vec::with_capacity(frequencies.len());
        let mut kmw_minus = Vec::with_capacity(frequencies.len());
        let mut kmw_plus = Vec::with_capacity(frequencies.len());
        for &freq in &frequencies {
            let minus = config.kmw_amplitude * config.lineshape.value(freq, peak_minus, config.linewidth);
            let plus = config.kmw_amplitude * config.lineshape.value(freq, peak_plus, config.linewidth);
            contrast.push(self.compute_contrast(Drive::new(config.gamma, minus, plus), &config.method)?);
            kmw_minus.push(minus);
            kmw_plus.push(plus);
        }
        debug!(n_points = frequencies.len(), peak_minus, peak_plus, "ODMR spectrum");
        Ok(Spectrum {
            frequencies,
            contrast,
            kmw_minus,
            kmw_plus,
            peak_freq_minus: peak_minus,
            peak_freq_plus: peak_plus,
        })
    }

    /// Per-excited-state weights of the fluorescence proxy.
    fn weights(&self) -> SimResult<Vec<f64>> {
        let excited = self.system.excited_states();
        if excited.is_empty() {
            return Err(SimError::Unsupported {
                what: "contrast needs declared excited states".to_string(),
            });
        }
        match self.proxy {
            FluorescenceProxy::ExcitedPopulation => Ok(vec![1.0; excited.len()]),
            FluorescenceProxy::RadiativeWeighted => self
                .system
                .radiative_rates()
                .map(<[f64]>::to_vec)
                .ok_or_else(|| SimError::Unsupported {
                    what: "radiative weighting needs radiative rates on the system".to_string(),
                }),
        }
    }

    fn intensity(
        &self,
        drive: Drive,
        method: &ContrastMethod,
        p0: &DVector<f64>,
        weights: &[f64],
    ) -> SimResult<f64> {
        let params = drive.params(self.system.drive_names(), &self.extra);
        let w = self.system.model().build_rate_matrix(&params)?;
        let excited = self.system.excited_states();
        let observe = |p: &DVector<f64>| -> f64 {
            excited.iter().zip(weights).map(|(&i, &k)| k * p[i]).sum()
        };

        match *method {
            ContrastMethod::SteadyState => Ok(observe(&self.solver.steady_state(&w)?)),
            ContrastMethod::Transient { t_max } => {
                let trajectory = self.solver.solve_expm(&w, p0, &[t_max])?;
                Ok(trajectory.final_state().map_or(0.0, observe))
            }
            ContrastMethod::TimeIntegrated {
                t_integration,
                n_points,
            } => {
                let times = linspace(0.0, t_integration, n_points);
                let trajectory = self.solver.solve_expm(&w, p0, &times)?;
                let series: Vec<f64> = trajectory.populations().iter().map(observe).collect();
                Ok(trapz(&series, &times)?)
            }
        }
    }
}
