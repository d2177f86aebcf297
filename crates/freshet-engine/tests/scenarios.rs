//! End-to-end scenarios run through the full engine.
//!
//! Each scenario assembles a small model from real process variants,
//! steps it, and checks the committed state and flux ledgers against
//! closed-form expectations.

use approx::assert_relative_eq;
use freshet_core::constants::MAX_CONVOL_STORES;
use freshet_core::{
    Hru, HruId, HruKind, SimTime, SlotIndex, StateRegistry, StateVar, SurfaceClass, SvKind,
};
use freshet_engine::{Engine, ModelConfig};
use freshet_process::Process;
use freshet_processes::{
    convolution_state_vars, Convolution, ConvolutionMode, ConvolutionType, GlacierMelt,
    GlacierMeltMethod, Infiltration, InfiltrationMethod,
};
use freshet_test_utils::{registry_with, TestBasin};
use std::sync::Arc;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn slot(reg: &StateRegistry, kind: SvKind, layer: usize) -> SlotIndex {
    reg.lookup(kind, layer).unwrap()
}

// ── Scenario 1: SCS curve number ─────────────────────────────────────

#[test]
fn scs_runoff_matches_closed_form_through_engine() {
    init_logging();
    let surface = SurfaceClass {
        scs_cn: 80.0,
        scs_ia_fraction: 0.2,
        ..SurfaceClass::default()
    };
    let (registry, hrus) = TestBasin::new()
        .surface(surface)
        .hru(HruKind::Standard, 1.0, 0)
        .set(0, SvKind::PondedWater, 0, 20.0)
        .build();
    let infil = Infiltration::new(InfiltrationMethod::Scs, &registry).unwrap();
    let mut engine = Engine::new(ModelConfig::new(
        registry.clone(),
        hrus,
        vec![Box::new(infil) as Box<dyn Process>],
    ))
    .unwrap();
    engine.step(SimTime::default()).unwrap();

    // Dry antecedent condition correction, then the SCS equation.
    let cn = 5e-5 * 80f64.powi(3) + 0.0008 * 80f64.powi(2) + 0.4431 * 80.0;
    let s = 25.4 * (1000.0 / cn - 10.0);
    let ia = 0.2 * s;
    let runoff = if 20.0 > ia {
        (20.0 - ia).powi(2) / (20.0 + s - ia)
    } else {
        0.0
    };

    let sw = slot(&registry, SvKind::SurfaceWater, 0);
    let pw = slot(&registry, SvKind::PondedWater, 0);
    let soil0 = slot(&registry, SvKind::Soil, 0);
    assert_relative_eq!(engine.slot_value(0, sw).unwrap(), runoff, epsilon = 1e-6);
    assert_relative_eq!(
        engine.slot_value(0, soil0).unwrap(),
        20.0 - runoff,
        epsilon = 1e-6
    );
    assert_relative_eq!(engine.slot_value(0, pw).unwrap(), 0.0, epsilon = 1e-12);
    assert_relative_eq!(
        engine.cumulative_flux_between(0, pw, sw).unwrap(),
        runoff,
        epsilon = 1e-6
    );
}

#[test]
fn zero_ponded_water_moves_nothing() {
    init_logging();
    let (registry, hrus) = TestBasin::new().hru(HruKind::Standard, 1.0, 0).build();
    let before = hrus[0].state().clone();
    let infil = Infiltration::new(InfiltrationMethod::Scs, &registry).unwrap();
    let mut engine = Engine::new(ModelConfig::new(
        registry,
        hrus,
        vec![Box::new(infil) as Box<dyn Process>],
    ))
    .unwrap();
    engine.step(SimTime::default()).unwrap();
    assert_eq!(engine.hru_state(0).unwrap(), &before);
    assert_eq!(engine.flux_rate(0, 0), Some(0.0));
    assert_eq!(engine.flux_rate(0, 1), Some(0.0));
}

// ── Scenario 2: UBC glacier melt with cold content ───────────────────

#[test]
fn glacier_cold_content_absorbs_melt() {
    init_logging();
    let registry = registry_with(
        0,
        &[
            StateVar::single(SvKind::Snow),
            StateVar::single(SvKind::Glacier),
            StateVar::single(SvKind::GlacierIce),
            StateVar::single(SvKind::GlacierCc),
        ],
    );
    let ice = slot(&registry, SvKind::GlacierIce, 0);
    let melt = slot(&registry, SvKind::Glacier, 0);
    let cc = slot(&registry, SvKind::GlacierCc, 0);

    let mut glacier = Hru::new(HruId(7), HruKind::Glacier, registry.len());
    glacier.forcing.potential_melt = 4.0;
    glacier.state_mut().set(ice, 1e5);
    glacier.state_mut().set(cc, 10.0);
    // A standard HRU alongside: the glacier process must skip it.
    let mut standard = Hru::new(HruId(8), HruKind::Standard, registry.len());
    standard.forcing.potential_melt = 4.0;
    standard.state_mut().set(ice, 50.0);

    let process = GlacierMelt::new(GlacierMeltMethod::Ubc, &registry).unwrap();
    let mut engine = Engine::new(ModelConfig::new(
        registry,
        vec![glacier, standard],
        vec![Box::new(process) as Box<dyn Process>],
    ))
    .unwrap();
    engine.step(SimTime::default()).unwrap();

    assert_eq!(engine.flux_rate(0, 0), Some(0.0));
    assert_eq!(engine.slot_value(0, melt).unwrap(), 0.0);
    assert_relative_eq!(engine.slot_value(0, cc).unwrap(), 6.0, epsilon = 1e-12);
    assert_relative_eq!(engine.slot_value(0, ice).unwrap(), 1e5);
    assert_eq!(engine.slot_value(1, ice).unwrap(), 50.0);
    assert_eq!(engine.flux_rate(1, 1), Some(0.0));

    // Second day: 6 mm of cold content left, 4 mm of energy. Third day
    // exhausts it and melts the remainder.
    engine.step(SimTime::default()).unwrap();
    assert_relative_eq!(engine.slot_value(0, cc).unwrap(), 2.0, epsilon = 1e-12);
    engine.step(SimTime::default()).unwrap();
    assert_relative_eq!(engine.slot_value(0, cc).unwrap(), 0.0, epsilon = 1e-12);
    assert_relative_eq!(engine.slot_value(0, melt).unwrap(), 2.0, epsilon = 1e-12);
}

// ── Scenario 3: GR4J convolution ─────────────────────────────────────

fn convolution_engine(kind: ConvolutionType, mode: ConvolutionMode) -> (Engine, StateRegistry) {
    let registry = registry_with(0, &convolution_state_vars(0).collect::<Vec<_>>());
    let surface = SurfaceClass {
        gr4j_x4: 2.0,
        gamma_shape: 3.0,
        gamma_scale: 0.5,
        ..SurfaceClass::default()
    };
    let hru = Hru::new(HruId(0), HruKind::Standard, registry.len()).with_surface(Arc::new(surface));
    let process = Convolution::new(
        kind,
        mode,
        0,
        StateVar::single(SvKind::SurfaceWater),
        &registry,
    )
    .unwrap();
    let engine = Engine::new(ModelConfig::new(
        registry.clone(),
        vec![hru],
        vec![Box::new(process) as Box<dyn Process>],
    ))
    .unwrap();
    (engine, registry)
}

#[test]
fn gr4j_pulse_is_released_over_two_days() {
    init_logging();
    let (mut engine, registry) = convolution_engine(ConvolutionType::Gr4j1, ConvolutionMode::Fixed);
    let agg = slot(&registry, SvKind::Convolution, 0);
    let sw = slot(&registry, SvKind::SurfaceWater, 0);

    engine.set_slot_value(0, agg, 10.0).unwrap();
    for _ in 0..4 {
        let report = engine.step(SimTime::default()).unwrap();
        assert!(report.warnings.is_empty());
    }

    // x4 = 2 at dt = 1: two bins, so everything is out after two steps.
    assert_relative_eq!(engine.slot_value(0, sw).unwrap(), 10.0, epsilon = 1e-9);
    assert_relative_eq!(engine.slot_value(0, agg).unwrap(), 0.0, epsilon = 1e-9);
    assert_relative_eq!(engine.cumulative_flux(0, 0).unwrap(), 10.0, epsilon = 1e-9);
    // Nothing moved on the last step.
    assert_relative_eq!(engine.flux_rate(0, 0).unwrap(), 0.0, epsilon = 1e-9);
}

#[test]
fn convolution_conserves_mass_in_every_mode() {
    init_logging();
    for kind in [ConvolutionType::Gr4j1, ConvolutionType::Gamma] {
        for mode in [ConvolutionMode::Fixed, ConvolutionMode::Smart] {
            let (mut engine, registry) = convolution_engine(kind, mode);
            let agg = slot(&registry, SvKind::Convolution, 0);
            let sw = slot(&registry, SvKind::SurfaceWater, 0);
            let stores: Vec<SlotIndex> = (0..MAX_CONVOL_STORES)
                .map(|i| slot(&registry, SvKind::ConvStor, i))
                .collect();

            let mut added = 0.0;
            for day in 0..30 {
                if day % 5 == 0 {
                    let v = engine.slot_value(0, agg).unwrap();
                    engine.set_slot_value(0, agg, v + 7.0).unwrap();
                    added += 7.0;
                }
                engine.step(SimTime::default()).unwrap();

                let aggregate = engine.slot_value(0, agg).unwrap();
                let released = engine.slot_value(0, sw).unwrap();
                let held: f64 = stores
                    .iter()
                    .map(|&s| engine.slot_value(0, s).unwrap())
                    .sum();
                assert_relative_eq!(aggregate + released, added, epsilon = 1e-9);
                assert_relative_eq!(held, aggregate, epsilon = 1e-9);
            }
        }
    }
}
