//! Snow surface albedo evolution.

use crate::numeric::thresh_max;
use crate::wiring::{connect, slot};
use freshet_core::{
    ParamBound, ParamClass, ParamInfo, ProcessError, SlotIndex, StateRegistry, StateVar, SvKind,
};
use freshet_process::{Connection, Connections, Process, ProcessContext};
use serde::{Deserialize, Serialize};

/// Snow albedo algorithm.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SnowAlbedoMethod {
    /// UBC watershed model: exponential recession toward a base albedo,
    /// refreshed in proportion to snowfall.
    Ubc,
    /// Baker et al.: albedo as a function of snow surface age.
    Baker,
}

impl SnowAlbedoMethod {
    /// Configuration name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Ubc => "SNOALB_UBCWM",
            Self::Baker => "SNOALB_BAKER",
        }
    }
}

const UBC_PARAMS: &[ParamInfo] = &[
    ParamInfo::new("UBC_ALBASE", ParamClass::Global, ParamBound::Fraction),
    ParamInfo::new("UBC_ALBREC", ParamClass::Global, ParamBound::Fraction),
    ParamInfo::new("UBC_ALBSNW", ParamClass::Global, ParamBound::Positive),
    ParamInfo::new("MAX_SNOW_ALBEDO", ParamClass::Global, ParamBound::Fraction),
];

const BAKER_PARAMS: &[ParamInfo] = &[ParamInfo::new(
    "BAKER_FRESH_SNOW",
    ParamClass::Global,
    ParamBound::NonNegative,
)];

/// Albedo of a snowpack whose surface is `age` days old.
pub fn baker_albedo(age: f64) -> f64 {
    0.9 - 0.0473 * age.max(0.0).powf(0.1)
}

/// Snow albedo: self-updates only, no mass moves.
///
/// UBC declares one `SNOW_ALBEDO` self-update; Baker declares
/// `SNOW_AGE` then `SNOW_ALBEDO`. Both leave albedo alone when there is
/// neither snow on the ground nor snowfall this timestep.
#[derive(Debug)]
pub struct SnowAlbedo {
    method: SnowAlbedoMethod,
    connections: Connections,
    snow: SlotIndex,
}

impl SnowAlbedo {
    /// Resolve the connections of `method` against `registry`.
    pub fn new(method: SnowAlbedoMethod, registry: &StateRegistry) -> Result<Self, ProcessError> {
        let albedo = StateVar::single(SvKind::SnowAlbedo);
        let age = StateVar::single(SvKind::SnowAge);
        let pairs = match method {
            SnowAlbedoMethod::Ubc => vec![(albedo, albedo)],
            SnowAlbedoMethod::Baker => vec![(age, age), (albedo, albedo)],
        };
        Ok(Self {
            method,
            connections: connect(registry, method.name(), &pairs)?,
            snow: slot(registry, method.name(), StateVar::single(SvKind::Snow))?,
        })
    }
}

impl Process for SnowAlbedo {
    fn name(&self) -> &str {
        self.method.name()
    }

    fn connections(&self) -> &[Connection] {
        &self.connections
    }

    fn participating_params(&self) -> &'static [ParamInfo] {
        match self.method {
            SnowAlbedoMethod::Ubc => UBC_PARAMS,
            SnowAlbedoMethod::Baker => BAKER_PARAMS,
        }
    }

    fn rates_of_change(&self, ctx: &mut ProcessContext<'_>, rates: &mut [f64]) {
        let snowfall = ctx.hru().forcing.snowfall();
        if ctx.value(self.snow) <= 0.0 && snowfall <= 0.0 {
            return;
        }
        let dt = ctx.dt();
        match self.method {
            SnowAlbedoMethod::Ubc => {
                let p = ctx.params();
                let albedo = ctx.value(self.connections[0].from);
                let mut next = albedo;
                if albedo > p.ubc_albase {
                    next = thresh_max(p.ubc_albase, albedo * p.ubc_albrec.powf(dt), 0.0);
                }
                let refresh = (snowfall * dt / p.ubc_albsnw).min(1.0);
                next += (p.max_snow_albedo - next) * refresh;
                rates[0] = (next - albedo) / dt;
            }
            SnowAlbedoMethod::Baker => {
                let age = ctx.value(self.connections[0].from);
                let albedo = ctx.value(self.connections[1].from);
                let new_age = if snowfall * dt > ctx.params().baker_fresh_snow {
                    0.0
                } else {
                    age + dt
                };
                rates[0] = (new_age - age) / dt;
                rates[1] = (baker_albedo(new_age) - albedo) / dt;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use freshet_core::{GlobalParams, Hru, HruId, HruKind, ModelOptions, SimTime};
    use freshet_process::HruAuxiliary;

    fn registry() -> StateRegistry {
        let mut b = StateRegistry::builder();
        b.add_all([
            StateVar::single(SvKind::Snow),
            StateVar::single(SvKind::SnowAge),
            StateVar::single(SvKind::SnowAlbedo),
        ])
        .unwrap();
        b.build()
    }

    fn eval(method: SnowAlbedoMethod, snow: f64, age: f64, albedo: f64, precip: f64) -> Vec<f64> {
        let reg = registry();
        let p = SnowAlbedo::new(method, &reg).unwrap();
        let mut hru = Hru::new(HruId(0), HruKind::Standard, reg.len());
        hru.forcing.precip = precip;
        hru.forcing.snow_frac = 1.0;
        let mut state = vec![0.0; reg.len()];
        state[reg.lookup(SvKind::Snow, 0).unwrap().index()] = snow;
        state[reg.lookup(SvKind::SnowAge, 0).unwrap().index()] = age;
        state[reg.lookup(SvKind::SnowAlbedo, 0).unwrap().index()] = albedo;
        let opts = ModelOptions::default();
        let params = GlobalParams::default();
        let mut aux = HruAuxiliary::default();
        let mut ctx =
            ProcessContext::new(&state, &hru, &reg, &opts, &params, SimTime::default(), &mut aux);
        let mut rates = vec![0.0; p.connections().len()];
        p.rates_of_change(&mut ctx, &mut rates);
        p.apply_constraints(&ctx, &mut rates);
        rates
    }

    #[test]
    fn ubc_albedo_recedes_toward_base() {
        let rates = eval(SnowAlbedoMethod::Ubc, 50.0, 0.0, 0.9, 0.0);
        assert_relative_eq!(rates[0], 0.9 * 0.9 - 0.9, epsilon = 1e-12);
        // Already at the base: no further decay.
        let rates = eval(SnowAlbedoMethod::Ubc, 50.0, 0.0, 0.6, 0.0);
        assert_eq!(rates[0], 0.0);
    }

    #[test]
    fn ubc_heavy_snowfall_restores_fresh_albedo() {
        let rates = eval(SnowAlbedoMethod::Ubc, 50.0, 0.0, 0.7, 30.0);
        assert_relative_eq!(0.7 + rates[0], 0.95, epsilon = 1e-12);
    }

    #[test]
    fn baker_ages_and_resets() {
        let rates = eval(SnowAlbedoMethod::Baker, 50.0, 3.0, 0.8, 0.0);
        assert_relative_eq!(rates[0], 1.0);
        assert_relative_eq!(0.8 + rates[1], baker_albedo(4.0), epsilon = 1e-12);

        let rates = eval(SnowAlbedoMethod::Baker, 50.0, 3.0, 0.8, 10.0);
        assert_relative_eq!(rates[0], -3.0);
        assert_relative_eq!(0.8 + rates[1], 0.9, epsilon = 1e-12);
    }

    #[test]
    fn bare_ground_without_snowfall_is_untouched() {
        for method in [SnowAlbedoMethod::Ubc, SnowAlbedoMethod::Baker] {
            let rates = eval(method, 0.0, 3.0, 0.5, 0.0);
            assert!(rates.iter().all(|r| *r == 0.0));
        }
    }

    #[test]
    fn requires_snow_slot() {
        let mut b = StateRegistry::builder();
        b.add(StateVar::single(SvKind::SnowAlbedo)).unwrap();
        assert!(SnowAlbedo::new(SnowAlbedoMethod::Ubc, &b.build()).is_err());
    }
}
