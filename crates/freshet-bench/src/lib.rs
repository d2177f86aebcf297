//! Benchmark profiles for the Freshet hydrology engine.
//!
//! Provides pre-built [`ModelConfig`] profiles:
//!
//! - [`reference_profile`]: 1 000 HRUs in 10 sub-basins with a full
//!   surface pipeline and per-sub-basin lateral flush
//! - [`stress_profile`]: the same pipeline over 10 000 HRUs
//! - [`apply_rain`]: refill ponded water so every step does real work

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::sync::Arc;

use freshet_core::{
    Hru, HruId, HruKind, SoilClass, SoilProfile, StateRegistry, StateVar, SubBasinId, SvKind,
};
use freshet_engine::{Engine, ModelConfig};
use freshet_process::Process;
use freshet_processes::{
    convolution_state_vars, Abstraction, AbstractionMethod, Convolution, ConvolutionMode,
    ConvolutionType, DepressionOverflow, DepressionOverflowMethod, Infiltration,
    InfiltrationMethod, LateralFlush, Seepage, SeepageMethod,
};

/// HRUs per routing sub-basin. The first HRU of each is its outlet.
pub const HRUS_PER_SUB_BASIN: usize = 100;

/// 1 000 HRUs.
pub fn reference_profile() -> ModelConfig {
    basin_profile(1_000)
}

/// 10 000 HRUs.
pub fn stress_profile() -> ModelConfig {
    basin_profile(10_000)
}

/// Build a profile of `hrus` standard HRUs.
///
/// Pipeline: ABST_FILL → INF_HMETS → DFLOW_LINEAR → SEEP_LINEAR →
/// CONVOL_GR4J_1 (fixed) → CONVOL_GAMMA (smart), then LAT_FLUSH of
/// surface water into each sub-basin outlet.
///
/// # Panics
///
/// Panics if the fixed pipeline fails to wire against its own registry.
pub fn basin_profile(hrus: usize) -> ModelConfig {
    let registry = registry();
    let soil = Arc::new(SoilProfile::uniform(
        "BENCH",
        Arc::new(SoilClass::default()),
        &[100.0, 300.0, 1000.0],
    ));

    let hru_list: Vec<Hru> = (0..hrus)
        .map(|k| {
            Hru::new(HruId(k as u32), HruKind::Standard, registry.len())
                .with_area(1.0 + (k % 5) as f64)
                .with_sub_basin(SubBasinId((k / HRUS_PER_SUB_BASIN) as u32))
                .with_soil(Arc::clone(&soil))
        })
        .collect();

    let sw = StateVar::single(SvKind::SurfaceWater);
    let processes: Vec<Box<dyn Process>> = vec![
        Box::new(Abstraction::new(AbstractionMethod::Fill, &registry).unwrap()),
        Box::new(Infiltration::new(InfiltrationMethod::Hmets, &registry).unwrap()),
        Box::new(DepressionOverflow::new(DepressionOverflowMethod::Linear, &registry).unwrap()),
        Box::new(Seepage::new(SeepageMethod::Linear, 0, &registry).unwrap()),
        Box::new(
            Convolution::new(
                ConvolutionType::Gr4j1,
                ConvolutionMode::Fixed,
                0,
                sw,
                &registry,
            )
            .unwrap(),
        ),
        Box::new(
            Convolution::new(
                ConvolutionType::Gamma,
                ConvolutionMode::Smart,
                1,
                sw,
                &registry,
            )
            .unwrap(),
        ),
    ];

    let (outlets, hillslopes): (Vec<usize>, Vec<usize>) =
        (0..hrus).partition(|k| k % HRUS_PER_SUB_BASIN == 0);

    ModelConfig::new(registry, hru_list, processes)
        .with_group("outlets", outlets)
        .with_group("hillslopes", hillslopes)
        .with_lateral(Box::new(LateralFlush::new(
            "hillslopes",
            sw,
            "outlets",
            sw,
            true,
        )))
}

fn registry() -> StateRegistry {
    let mut b = StateRegistry::builder();
    b.soil_layers(3)
        .and_then(|b| b.add(StateVar::single(SvKind::Depression)))
        .and_then(|b| b.add_all(convolution_state_vars(0)))
        .and_then(|b| b.add_all(convolution_state_vars(1)))
        .unwrap();
    b.build()
}

/// Set ponded water to `depth` mm in every HRU.
pub fn apply_rain(engine: &mut Engine, depth: f64) {
    if let Some(ponded) = engine.registry().lookup(SvKind::PondedWater, 0) {
        for k in 0..engine.hrus().len() {
            let _ = engine.set_slot_value(k, ponded, depth);
        }
    }
}
