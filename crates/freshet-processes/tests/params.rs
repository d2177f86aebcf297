//! Every parameter a process declares can be read from the class table
//! it names.

use freshet_core::{
    GlobalParams, Hru, HruKind, ParamClass, ParamInfo, StateRegistry, StateVar, SvKind,
};
use freshet_process::Process;
use freshet_processes::{
    Abstraction, AbstractionMethod, CropHeatMethod, CropHeatUnits, DepressionOverflow,
    DepressionOverflowMethod, GlacierMelt, GlacierMeltMethod, GlacierRelease,
    GlacierReleaseMethod, Infiltration, InfiltrationMethod, LakeRelease, LakeReleaseMethod,
    Seepage, SeepageMethod,
};
use freshet_test_utils::{registry_with, TestBasin};

fn basin() -> (StateRegistry, Hru) {
    let registry = registry_with(
        4,
        &[
            StateVar::single(SvKind::Depression),
            StateVar::single(SvKind::MinDepDeficit),
            StateVar::single(SvKind::CumInfil),
            StateVar::single(SvKind::GaMoistureInit),
            StateVar::new(SvKind::Convolution, 0),
            StateVar::new(SvKind::Convolution, 1),
            StateVar::single(SvKind::Snow),
            StateVar::single(SvKind::Glacier),
            StateVar::single(SvKind::GlacierIce),
            StateVar::single(SvKind::GlacierCc),
            StateVar::single(SvKind::LakeStorage),
            StateVar::single(SvKind::CropHeatUnits),
        ],
    );
    let (registry, mut hrus) = TestBasin::with_registry(registry)
        .hru(HruKind::Standard, 1.0, 1)
        .build();
    (registry, hrus.remove(0))
}

fn readable(info: &ParamInfo, hru: &Hru, globals: &GlobalParams) -> bool {
    match info.class {
        ParamClass::Global => globals.param(info.name).is_some(),
        ParamClass::Soil => hru
            .soil
            .layers
            .iter()
            .all(|l| l.class.param(info.name).is_some()),
        ParamClass::Surface => hru.surface.param(info.name).is_some(),
        ParamClass::Vegetation => hru.vegetation.param(info.name).is_some(),
        ParamClass::Terrain => hru.terrain.param(info.name).is_some(),
    }
}

fn every_process(registry: &StateRegistry) -> Vec<Box<dyn Process>> {
    let mut out: Vec<Box<dyn Process>> = Vec::new();
    use InfiltrationMethod::*;
    for m in [
        Rational, Scs, ScsNoAbstraction, AllInfiltrates, Hbv, VicArno, Vic, Prms, Gr4j, Pdm,
        Hmets, Ubc, GreenAmpt, GaSimple, UpscaledGreenAmpt, Awbm,
    ] {
        out.push(Box::new(Infiltration::new(m, registry).unwrap()));
    }
    for m in [
        AbstractionMethod::Percentage,
        AbstractionMethod::Fill,
        AbstractionMethod::Scs,
        AbstractionMethod::PdmRof,
        AbstractionMethod::Uwfs,
    ] {
        out.push(Box::new(Abstraction::new(m, registry).unwrap()));
    }
    for m in [
        DepressionOverflowMethod::ThresholdPower,
        DepressionOverflowMethod::Linear,
        DepressionOverflowMethod::Weir,
    ] {
        out.push(Box::new(DepressionOverflow::new(m, registry).unwrap()));
    }
    out.push(Box::new(Seepage::new(SeepageMethod::Linear, 0, registry).unwrap()));
    for m in [
        GlacierMeltMethod::Simple,
        GlacierMeltMethod::Hbv,
        GlacierMeltMethod::Ubc,
    ] {
        out.push(Box::new(GlacierMelt::new(m, registry).unwrap()));
    }
    for m in [
        GlacierReleaseMethod::Linear,
        GlacierReleaseMethod::LinearAnalytic,
        GlacierReleaseMethod::HbvEc,
    ] {
        out.push(Box::new(GlacierRelease::new(m, registry).unwrap()));
    }
    out.push(Box::new(
        CropHeatUnits::new(CropHeatMethod::Ontario, registry).unwrap(),
    ));
    for m in [LakeReleaseMethod::Linear, LakeReleaseMethod::LinearAnalytic] {
        out.push(Box::new(LakeRelease::new(m, registry).unwrap()));
    }
    out
}

#[test]
fn declared_parameters_resolve_on_their_class() {
    let (registry, hru) = basin();
    let globals = GlobalParams::default();
    for p in every_process(&registry) {
        for info in p.participating_params() {
            assert!(
                readable(info, &hru, &globals),
                "{} declares {} on {:?}, which does not carry it",
                p.name(),
                info.name,
                info.class
            );
        }
    }
}

#[test]
fn parameter_lists_follow_the_variant() {
    let (registry, _) = basin();
    let names = |p: &dyn Process| -> Vec<&'static str> {
        p.participating_params().iter().map(|i| i.name).collect()
    };

    let scs = Abstraction::new(AbstractionMethod::Scs, &registry).unwrap();
    assert_eq!(names(&scs), ["SCS_CN", "SCS_IA_FRACTION", "DEP_MAX"]);

    let weir = DepressionOverflow::new(DepressionOverflowMethod::Weir, &registry).unwrap();
    assert!(names(&weir).contains(&"DEP_CRESTRATIO"));
    let linear = DepressionOverflow::new(DepressionOverflowMethod::Linear, &registry).unwrap();
    assert!(names(&linear).contains(&"DEP_K"));

    let simple = GlacierMelt::new(GlacierMeltMethod::Simple, &registry).unwrap();
    assert!(names(&simple).is_empty());
    let hbv = GlacierMelt::new(GlacierMeltMethod::Hbv, &registry).unwrap();
    assert_eq!(names(&hbv), ["HBV_MELT_GLACIER_CORR"]);

    let hbv_ec = GlacierRelease::new(GlacierReleaseMethod::HbvEc, &registry).unwrap();
    assert_eq!(
        names(&hbv_ec),
        ["GLAC_STORAGE_COEFF", "HBV_GLACIER_KMIN", "HBV_GLACIER_AG"]
    );

    let upscaled = Infiltration::new(InfiltrationMethod::UpscaledGreenAmpt, &registry).unwrap();
    assert!(names(&upscaled).contains(&"KSAT_STD_DEVIATION"));
}
