//! Starting in GS|0> gives brighter readout when its ISC path is the slow one.

use odmr_presets::seven_level::{ES_0, GS_0};
use odmr_presets::{LabelStyle, SevenLevelRates, get_preset, seven_level_system};
use odmr_sim::{InitialState, ReadoutOptions, ReadoutSimulation, TimeGrid};

fn assert_gs0_brightest(system: &odmr_model::SpinSystem, gamma: f64) {
    let sim = ReadoutSimulation::new(system);
    let results = sim.run_comparison(gamma, &ReadoutOptions::default()).unwrap();
    assert_eq!(results.len(), 3);

    let gs0 = results["gs0"].peak_es_total();
    let minus = results["gs_minus"].peak_es_total();
    let plus = results["gs_plus"].peak_es_total();
    assert!(gs0 > minus, "gs0 {gs0} vs gs_minus {minus}");
    assert!(gs0 > plus, "gs0 {gs0} vs gs_plus {plus}");
}

#[test]
fn toy_model_with_slow_zero_isc() {
    let rates = SevenLevelRates {
        k47: 1.0,
        k57: 50.0,
        k67: 50.0,
        k71: 20.0,
        k72: 5.0,
        k73: 5.0,
        ..SevenLevelRates::default()
    };
    let system = seven_level_system(&rates, LabelStyle::Split).unwrap();
    assert_gs0_brightest(&system, 12.8);
}

#[test]
fn bulk_nv_preset() {
    let system = get_preset("nv_bulk").unwrap();
    assert_gs0_brightest(&system, 12.8);
}

#[test]
fn readout_accepts_every_initial_form() {
    let system = get_preset("nv_bulk").unwrap();
    let sim = ReadoutSimulation::new(&system);
    let opts = ReadoutOptions {
        grid: TimeGrid::linear(0.0, 1e-6, 101),
        ..ReadoutOptions::default()
    };
    let by_alias = sim.run(12.8, &InitialState::from("100"), &opts).unwrap();
    let by_index = sim.run(12.8, &InitialState::Index(GS_0), &opts).unwrap();
    let by_vector = sim
        .run(
            12.8,
            &InitialState::Vector(system.model().get_initial_state(GS_0).unwrap()),
            &opts,
        )
        .unwrap();
    assert_eq!(by_alias.es_total, by_index.es_total);
    assert_eq!(by_index.es_total, by_vector.es_total);

    // Fluorescence starts dark and the ES|0> share dominates early on.
    assert_eq!(by_index.es_total[0], 0.0);
    let p = by_index.trajectory.state_at(10).unwrap();
    assert!(p[ES_0] > 0.0);
    assert!(by_index.photon_rate.is_some());
    assert!((by_index.trajectory.times_ns()[100] - 1000.0).abs() < 1e-9);
}
