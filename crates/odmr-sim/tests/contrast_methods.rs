//! Contrast methods agree with each other and with the exact integral.

use odmr_presets::get_preset;
use odmr_sim::{
    ContrastMethod, Drive, FluorescenceProxy, InitialState, Lineshape, OdmrSimulation, SimError,
    SpectrumConfig,
};
use odmr_solver::{RateSolver, SolverError};

#[test]
fn bulk_nv_contrast_is_positive() {
    let system = get_preset("nv_bulk").unwrap();
    let sim = OdmrSimulation::new(&system);
    let contrast = sim
        .compute_contrast(Drive::new(0.1, 1.0, 0.0), &ContrastMethod::SteadyState)
        .unwrap();
    assert!(contrast > 0.0 && contrast < 1.0, "{contrast}");

    let off = sim
        .compute_contrast(Drive::optical(0.1), &ContrastMethod::SteadyState)
        .unwrap();
    assert_eq!(off, 0.0);
}

#[test]
fn transient_converges_to_steady_state() {
    let system = get_preset("nv_bulk").unwrap();
    let sim = OdmrSimulation::new(&system);
    let drive = Drive::new(1.0, 1.0, 0.0);
    let steady = sim
        .compute_contrast(drive, &ContrastMethod::SteadyState)
        .unwrap();

    // Late enough that the slowest relaxation mode dominates the error.
    let errors: Vec<f64> = [2e-5, 3e-5, 5e-5, 1e-4, 3e-4, 1e-3]
        .iter()
        .map(|&t| {
            let c = sim
                .compute_contrast(drive, &ContrastMethod::transient(t))
                .unwrap();
            (c - steady).abs()
        })
        .collect();
    for pair in errors.windows(2) {
        assert!(pair[1] <= pair[0] + 1e-10, "{errors:?}");
    }
    assert!(errors.last().unwrap() < &1e-8, "{errors:?}");
}

#[test]
fn trapezoid_matches_exact_integral() {
    let system = get_preset("nv_bulk").unwrap();
    let sim = OdmrSimulation::new(&system);
    let drive = Drive::new(5.0, 2.0, 0.0);
    let t_integration = 1e-6;
    let trapezoid = sim
        .compute_contrast(drive, &ContrastMethod::time_integrated(t_integration))
        .unwrap();

    let solver = RateSolver::default();
    let p0 = system.default_initial_state();
    let intensity = |d: Drive| {
        let params = system.drive_names().params(d.gamma, d.kmw_minus, d.kmw_plus);
        let w = system.model().build_rate_matrix(&params).unwrap();
        let integral = solver.integrated_populations(&w, &p0, t_integration).unwrap();
        system.excited_population(&integral)
    };
    let reference = intensity(drive.without_microwave());
    let exact = (reference - intensity(drive)) / reference;
    assert!((trapezoid - exact).abs() < 1e-4, "{trapezoid} vs {exact}");
}

#[test]
fn dark_system_reports_zero_contrast() {
    let system = get_preset("nv_bulk").unwrap();
    let sim = OdmrSimulation::new(&system);
    // At t = 0 the ground-state mixture has no excited population at all.
    let contrast = sim
        .compute_contrast(Drive::new(1.0, 1.0, 0.0), &ContrastMethod::transient(0.0))
        .unwrap();
    assert_eq!(contrast, 0.0);
}

#[test]
fn reducible_generator_fails_steady_state() {
    let system = get_preset("nv_bulk").unwrap();
    let sim = OdmrSimulation::new(&system);
    let err = sim
        .compute_contrast(Drive::optical(0.0), &ContrastMethod::SteadyState)
        .unwrap_err();
    assert!(matches!(
        err,
        SimError::Solver(SolverError::DegenerateSteadyState { .. })
    ));
}

#[test]
fn equal_radiative_rates_do_not_change_contrast() {
    let system = get_preset("nv_bulk").unwrap();
    let drive = Drive::new(0.1, 1.0, 0.5);
    let plain = OdmrSimulation::new(&system)
        .compute_contrast(drive, &ContrastMethod::SteadyState)
        .unwrap();
    let weighted = OdmrSimulation::new(&system)
        .with_proxy(FluorescenceProxy::RadiativeWeighted)
        .compute_contrast(drive, &ContrastMethod::SteadyState)
        .unwrap();
    assert!((plain - weighted).abs() < 1e-12);
}

#[test]
fn custom_initial_state_changes_transient_only() {
    let system = get_preset("g11_gm9_30dp").unwrap();
    let sim = OdmrSimulation::new(&system);
    let drive = Drive::new(0.5, 1.0, 0.0);
    let method = ContrastMethod::transient(2e-7);
    let mixed = sim.compute_contrast(drive, &method).unwrap();
    let polarised = sim
        .compute_contrast_from(drive, &method, &InitialState::from("gs0"))
        .unwrap();
    assert!((mixed - polarised).abs() > 1e-6);

    let steady_mixed = sim.compute_contrast(drive, &ContrastMethod::SteadyState).unwrap();
    let steady_polarised = sim
        .compute_contrast_from(drive, &ContrastMethod::SteadyState, &InitialState::from("gs0"))
        .unwrap();
    assert_eq!(steady_mixed, steady_polarised);
}

#[test]
fn gamma_sweep_is_parallel_to_input() {
    let system = get_preset("g4_g9_90dp").unwrap();
    let sim = OdmrSimulation::new(&system);
    let gammas = [0.01, 0.1, 1.0, 10.0];
    let sweep = sim
        .sweep_gamma(&gammas, 1.0, 0.0, &ContrastMethod::SteadyState)
        .unwrap();
    assert_eq!(sweep.gammas, gammas);
    assert_eq!(sweep.contrasts.len(), gammas.len());
    for (&gamma, &c) in sweep.gammas.iter().zip(&sweep.contrasts) {
        let single = sim
            .compute_contrast(Drive::new(gamma, 1.0, 0.0), &ContrastMethod::SteadyState)
            .unwrap();
        assert_eq!(c, single);
    }
}

#[test]
fn symmetric_spectrum_peaks_at_resonances() {
    let system = get_preset("nv_bulk").unwrap();
    let sim = OdmrSimulation::new(&system);
    // Weak drive keeps the response linear, so lines are not power broadened.
    let config = SpectrumConfig {
        kmw_amplitude: 1e-3,
        ..SpectrumConfig::default()
    };
    let spectrum = sim.run_spectrum(&config).unwrap();

    assert_eq!(spectrum.frequencies.len(), 101);
    assert!((spectrum.frequencies[0] - 2.75).abs() < 1e-12);
    assert!((spectrum.frequencies[100] - 3.25).abs() < 1e-12);
    assert!((spectrum.peak_freq_minus - 2.875).abs() < 1e-12);
    assert!((spectrum.peak_freq_plus - 3.125).abs() < 1e-12);

    // k57 = k67 and k72 = k73: the two resonances mirror each other.
    let n = spectrum.contrast.len();
    for i in 0..n / 2 {
        let (a, b) = (spectrum.contrast[i], spectrum.contrast[n - 1 - i]);
        assert!((a - b).abs() < 1e-9, "{i}: {a} vs {b}");
    }

    let lower = &spectrum.contrast[..50];
    let argmax = lower
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
        .unwrap();
    assert!((24..=26).contains(&argmax), "peak at index {argmax}");
    assert!(spectrum.contrast[argmax] > spectrum.contrast[0]);
    assert!(spectrum.kmw_minus[25] > 0.99e-3);
}

#[test]
fn gaussian_spectrum_is_dark_far_from_resonance() {
    let system = get_preset("nv_bulk").unwrap();
    let sim = OdmrSimulation::new(&system);
    let config = SpectrumConfig {
        n_points: 21,
        linewidth: 0.01,
        lineshape: Lineshape::Gaussian,
        ..SpectrumConfig::default()
    };
    let spectrum = sim.run_spectrum(&config).unwrap();
    // 3.0 GHz sits 12.5 linewidths from either resonance.
    assert!(spectrum.contrast[10].abs() < 1e-12);
    assert!(spectrum.kmw_minus[10] < 1e-30);
}

#[test]
fn spectrum_rejects_bad_configuration() {
    let system = get_preset("nv_bulk").unwrap();
    let sim = OdmrSimulation::new(&system);
    for config in [
        SpectrumConfig {
            n_points: 0,
            ..SpectrumConfig::default()
        },
        SpectrumConfig {
            linewidth: 0.0,
            ..SpectrumConfig::default()
        },
        SpectrumConfig {
            method: ContrastMethod::TimeIntegrated {
                t_integration: 1e-6,
                n_points: 1,
            },
            ..SpectrumConfig::default()
        },
    ] {
        assert!(matches!(
            sim.run_spectrum(&config),
            Err(SimError::InvalidArg { .. })
        ));
    }
}
