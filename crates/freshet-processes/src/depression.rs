//! Depression storage outflow: overflow to surface water and seepage to
//! soil.

use crate::numeric::thresh_positive;
use crate::wiring::connect;
use freshet_core::constants::{GRAVITY, SEC_PER_DAY};
use freshet_core::{
    ParamBound, ParamClass, ParamInfo, ProcessError, StateRegistry, StateVar, SvKind,
};
use freshet_process::{constraint, Connection, Connections, Process, ProcessContext};
use serde::{Deserialize, Serialize};

/// Discharge coefficient of a sharp-crested weir [-].
const WEIR_DISCHARGE_COEFF: f64 = 0.6;

// ── Overflow ────────────────────────────────────────────────────

/// Depression overflow algorithm.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DepressionOverflowMethod {
    /// Power law in storage above a threshold, reaching `DEP_MAX_FLOW` at
    /// `DEP_MAX`.
    ThresholdPower,
    /// Linear in storage above a threshold.
    Linear,
    /// Sharp-crested weir on the storage above the threshold.
    Weir,
}

impl DepressionOverflowMethod {
    /// Configuration name.
    pub fn name(self) -> &'static str {
        match self {
            Self::ThresholdPower => "DFLOW_THRESHPOW",
            Self::Linear => "DFLOW_LINEAR",
            Self::Weir => "DFLOW_WEIR",
        }
    }
}

const THRESHOLD: ParamInfo =
    ParamInfo::new("DEP_THRESHOLD", ParamClass::Surface, ParamBound::NonNegative);

/// Overflow from `DEPRESSION` to `SURFACE_WATER`.
#[derive(Debug)]
pub struct DepressionOverflow {
    method: DepressionOverflowMethod,
    connections: Connections,
}

impl DepressionOverflow {
    /// Resolve the connection of `method` against `registry`.
    pub fn new(
        method: DepressionOverflowMethod,
        registry: &StateRegistry,
    ) -> Result<Self, ProcessError> {
        let pairs = [(
            StateVar::single(SvKind::Depression),
            StateVar::single(SvKind::SurfaceWater),
        )];
        Ok(Self {
            method,
            connections: connect(registry, method.name(), &pairs)?,
        })
    }
}

/// Outflow [mm/d] of a weir with crest length per unit HRU area
/// `crest_ratio` [1/m] under head `head` [mm].
pub fn weir_outflow(head: f64, crest_ratio: f64) -> f64 {
    let head_m = thresh_positive(head) / 1000.0;
    let q = 2.0 / 3.0 * WEIR_DISCHARGE_COEFF * (2.0 * GRAVITY).sqrt() * head_m.powf(1.5);
    q * crest_ratio * 1000.0 * SEC_PER_DAY
}

impl Process for DepressionOverflow {
    fn name(&self) -> &str {
        self.method.name()
    }

    fn connections(&self) -> &[Connection] {
        &self.connections
    }

    fn participating_params(&self) -> &'static [ParamInfo] {
        const THRESHOLD_POWER: &[ParamInfo] = &[
            ParamInfo::new("DEP_MAX", ParamClass::Surface, ParamBound::NonNegative),
            ParamInfo::new("DEP_MAX_FLOW", ParamClass::Surface, ParamBound::NonNegative),
            ParamInfo::new("DEP_N", ParamClass::Surface, ParamBound::Positive),
            THRESHOLD,
        ];
        const LINEAR: &[ParamInfo] = &[
            ParamInfo::new("DEP_K", ParamClass::Surface, ParamBound::NonNegative),
            THRESHOLD,
        ];
        const WEIR: &[ParamInfo] = &[
            ParamInfo::new("DEP_CRESTRATIO", ParamClass::Surface, ParamBound::NonNegative),
            THRESHOLD,
        ];
        match self.method {
            DepressionOverflowMethod::ThresholdPower => THRESHOLD_POWER,
            DepressionOverflowMethod::Linear => LINEAR,
            DepressionOverflowMethod::Weir => WEIR,
        }
    }

    fn rates_of_change(&self, ctx: &mut ProcessContext<'_>, rates: &mut [f64]) {
        let stored = ctx.value(self.connections[0].from);
        let s = &ctx.hru().surface;
        let excess = thresh_positive(stored - s.dep_threshold);
        if excess <= 0.0 {
            return;
        }
        rates[0] = match self.method {
            DepressionOverflowMethod::ThresholdPower => {
                let span = s.dep_max - s.dep_threshold;
                if span > 0.0 {
                    s.dep_max_flow * (excess / span).powf(s.dep_n)
                } else {
                    s.dep_max_flow
                }
            }
            DepressionOverflowMethod::Linear => s.dep_k * excess,
            DepressionOverflowMethod::Weir => weir_outflow(excess, s.dep_crestratio),
        };
    }
}

// ── Seepage ─────────────────────────────────────────────────────

/// Depression seepage algorithm.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeepageMethod {
    /// Linear in depression storage.
    Linear,
}

impl SeepageMethod {
    /// Configuration name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Linear => "SEEP_LINEAR",
        }
    }
}

/// Seepage from `DEPRESSION` into a configured soil layer.
#[derive(Debug)]
pub struct Seepage {
    method: SeepageMethod,
    connections: Connections,
}

impl Seepage {
    /// Resolve the connection of `method` into `SOIL[layer]`.
    pub fn new(
        method: SeepageMethod,
        layer: usize,
        registry: &StateRegistry,
    ) -> Result<Self, ProcessError> {
        let pairs = [(
            StateVar::single(SvKind::Depression),
            StateVar::new(SvKind::Soil, layer),
        )];
        Ok(Self {
            method,
            connections: connect(registry, method.name(), &pairs)?,
        })
    }
}

impl Process for Seepage {
    fn name(&self) -> &str {
        self.method.name()
    }

    fn connections(&self) -> &[Connection] {
        &self.connections
    }

    fn participating_params(&self) -> &'static [ParamInfo] {
        const PARAMS: &[ParamInfo] = &[ParamInfo::new(
            "DEP_SEEP_K",
            ParamClass::Surface,
            ParamBound::NonNegative,
        )];
        PARAMS
    }

    fn rates_of_change(&self, ctx: &mut ProcessContext<'_>, rates: &mut [f64]) {
        let stored = thresh_positive(ctx.value(self.connections[0].from));
        rates[0] = ctx.hru().surface.dep_seep_k * stored;
    }

    fn apply_constraints(&self, ctx: &ProcessContext<'_>, rates: &mut [f64]) {
        let c = self.connections[0];
        rates[0] = if ctx.options().allow_soil_overfill {
            rates[0]
                .max(0.0)
                .min(constraint::max_outflow(ctx.value(c.from), ctx.dt()))
        } else {
            constraint::clip_transfer(ctx, c, rates[0])
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use freshet_core::{
        GlobalParams, Hru, HruId, HruKind, ModelOptions, SimTime, SoilClass, SoilProfile,
        SurfaceClass,
    };
    use freshet_process::HruAuxiliary;
    use std::sync::Arc;

    fn registry() -> StateRegistry {
        let mut b = StateRegistry::builder();
        b.add(StateVar::single(SvKind::Depression)).unwrap();
        b.soil_layers(2).unwrap();
        b.build()
    }

    fn eval(p: &dyn Process, surface: SurfaceClass, dep: f64, soil1: f64) -> f64 {
        let reg = registry();
        let class = Arc::new(SoilClass::default());
        let hru = Hru::new(HruId(0), HruKind::Standard, reg.len())
            .with_surface(Arc::new(surface))
            .with_soil(Arc::new(SoilProfile::uniform("S", class, &[100.0, 100.0])));
        let mut state = vec![0.0; reg.len()];
        state[reg.lookup(SvKind::Depression, 0).unwrap().index()] = dep;
        state[reg.lookup(SvKind::Soil, 1).unwrap().index()] = soil1;
        let opts = ModelOptions::default();
        let params = GlobalParams::default();
        let mut aux = HruAuxiliary::default();
        let mut ctx =
            ProcessContext::new(&state, &hru, &reg, &opts, &params, SimTime::default(), &mut aux);
        let mut rates = [0.0];
        p.rates_of_change(&mut ctx, &mut rates);
        p.apply_constraints(&ctx, &mut rates);
        rates[0]
    }

    #[test]
    fn threshold_power_reaches_max_flow_at_capacity() {
        let reg = registry();
        let p = DepressionOverflow::new(DepressionOverflowMethod::ThresholdPower, &reg).unwrap();
        let surface = SurfaceClass {
            dep_max: 10.0,
            dep_threshold: 2.0,
            dep_max_flow: 4.0,
            dep_n: 2.0,
            ..SurfaceClass::default()
        };
        assert_relative_eq!(eval(&p, surface.clone(), 10.0, 0.0), 4.0);
        assert_relative_eq!(eval(&p, surface.clone(), 6.0, 0.0), 1.0);
        assert_eq!(eval(&p, surface, 1.0, 0.0), 0.0);
    }

    #[test]
    fn linear_overflow_above_threshold() {
        let reg = registry();
        let p = DepressionOverflow::new(DepressionOverflowMethod::Linear, &reg).unwrap();
        let surface = SurfaceClass {
            dep_k: 0.2,
            dep_threshold: 5.0,
            ..SurfaceClass::default()
        };
        assert_relative_eq!(eval(&p, surface, 15.0, 0.0), 2.0);
    }

    #[test]
    fn weir_outflow_is_zero_without_head_and_grows_with_it() {
        assert_eq!(weir_outflow(0.0, 0.001), 0.0);
        let low = weir_outflow(10.0, 0.001);
        let high = weir_outflow(40.0, 0.001);
        assert!(low > 0.0);
        assert_relative_eq!(high / low, 8.0, epsilon = 1e-9);
    }

    #[test]
    fn seepage_respects_soil_capacity() {
        let reg = registry();
        let p = Seepage::new(SeepageMethod::Linear, 1, &reg).unwrap();
        let surface = SurfaceClass {
            dep_seep_k: 0.5,
            ..SurfaceClass::default()
        };
        // Default soil: 100 mm * 0.4 porosity = 40 mm capacity.
        assert_relative_eq!(eval(&p, surface.clone(), 10.0, 0.0), 5.0);
        assert_relative_eq!(eval(&p, surface, 10.0, 38.0), 2.0);
    }

    #[test]
    fn seepage_into_missing_layer_fails_assembly() {
        let err = Seepage::new(SeepageMethod::Linear, 5, &registry()).unwrap_err();
        assert!(matches!(err, ProcessError::Registry { .. }));
    }
}
