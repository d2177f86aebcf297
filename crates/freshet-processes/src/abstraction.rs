//! Abstraction of ponded water into depression storage.

use crate::curve_number::{adjusted_curve_number, antecedent_condition, scs_runoff};
use crate::wiring::{connect, slot};
use freshet_core::{
    Hru, HruKind, ParamBound, ParamClass, ParamInfo, ProcessError, SlotIndex, StateRegistry,
    StateVar, SvKind,
};
use freshet_process::{constraint, Connection, Connections, Process, ProcessContext};
use serde::{Deserialize, Serialize};

/// Abstraction algorithm.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AbstractionMethod {
    /// Fixed fraction of ponded water per timestep.
    Percentage,
    /// Fill depressions to `DEP_MAX` first.
    Fill,
    /// SCS initial abstraction with antecedent-condition correction.
    Scs,
    /// Pareto-distributed depression capacities with overflow.
    PdmRof,
    /// Upland wetland fill-and-spill over a distribution of deficits.
    Uwfs,
}

const DEP_MAX: ParamInfo = ParamInfo::new("DEP_MAX", ParamClass::Surface, ParamBound::NonNegative);
const PERCENTAGE_PARAMS: &[ParamInfo] = &[ParamInfo::new(
    "ABST_PERCENT",
    ParamClass::Surface,
    ParamBound::Fraction,
)];
const FILL_PARAMS: &[ParamInfo] = &[DEP_MAX];
const SCS_PARAMS: &[ParamInfo] = &[
    ParamInfo::new("SCS_CN", ParamClass::Surface, ParamBound::Positive),
    ParamInfo::new("SCS_IA_FRACTION", ParamClass::Surface, ParamBound::NonNegative),
    DEP_MAX,
];
const PDMROF_PARAMS: &[ParamInfo] = &[
    ParamInfo::new("PDMROF_B", ParamClass::Surface, ParamBound::NonNegative),
    DEP_MAX,
];
const UWFS_PARAMS: &[ParamInfo] = &[
    ParamInfo::new("UWFS_B", ParamClass::Surface, ParamBound::Positive),
    DEP_MAX,
];

impl AbstractionMethod {
    /// Configuration name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Percentage => "ABST_PERCENTAGE",
            Self::Fill => "ABST_FILL",
            Self::Scs => "ABST_SCS",
            Self::PdmRof => "ABST_PDMROF",
            Self::Uwfs => "ABST_UWFS",
        }
    }

    /// State variables this variant requires in the registry.
    pub fn state_vars(self) -> Vec<StateVar> {
        let mut vars = vec![
            StateVar::single(SvKind::PondedWater),
            StateVar::single(SvKind::Depression),
        ];
        if self == Self::Uwfs {
            vars.push(StateVar::single(SvKind::MinDepDeficit));
        }
        vars
    }

    /// Parameters read by this variant.
    pub fn params(self) -> &'static [ParamInfo] {
        match self {
            Self::Percentage => PERCENTAGE_PARAMS,
            Self::Fill => FILL_PARAMS,
            Self::Scs => SCS_PARAMS,
            Self::PdmRof => PDMROF_PARAMS,
            Self::Uwfs => UWFS_PARAMS,
        }
    }
}

/// Abstraction process for one configured [`AbstractionMethod`].
///
/// Connection 0 is always ponded water → depression. `PdmRof` adds
/// depression → surface water overflow; `Uwfs` adds ponded → surface
/// water spill and a `MIN_DEP_DEFICIT` self-update.
#[derive(Debug)]
pub struct Abstraction {
    method: AbstractionMethod,
    connections: Connections,
    ponded: SlotIndex,
    depression: SlotIndex,
}

impl Abstraction {
    /// Resolve the connections of `method` against `registry`.
    pub fn new(method: AbstractionMethod, registry: &StateRegistry) -> Result<Self, ProcessError> {
        let name = method.name();
        let ponded = StateVar::single(SvKind::PondedWater);
        let dep = StateVar::single(SvKind::Depression);
        let sw = StateVar::single(SvKind::SurfaceWater);
        let pairs = match method {
            AbstractionMethod::Percentage | AbstractionMethod::Fill | AbstractionMethod::Scs => {
                vec![(ponded, dep)]
            }
            AbstractionMethod::PdmRof => vec![(ponded, dep), (dep, sw)],
            AbstractionMethod::Uwfs => {
                let deficit = StateVar::single(SvKind::MinDepDeficit);
                vec![(ponded, dep), (ponded, sw), (deficit, deficit)]
            }
        };
        Ok(Self {
            method,
            connections: connect(registry, name, &pairs)?,
            ponded: slot(registry, name, ponded)?,
            depression: slot(registry, name, dep)?,
        })
    }

    /// Configured algorithm.
    pub fn method(&self) -> AbstractionMethod {
        self.method
    }
}

/// Depth abstracted from `ponded` [mm] into depressions whose capacities
/// follow a Pareto distribution with shape `b` and mean `dep_max`, given
/// current storage `stored`.
pub fn pareto_abstraction(ponded: f64, stored: f64, dep_max: f64, b: f64) -> f64 {
    if ponded <= 0.0 || dep_max <= 0.0 {
        return 0.0;
    }
    let c_max = (b + 1.0) * dep_max;
    let sat = (stored / dep_max).clamp(0.0, 1.0);
    let c_star = c_max * (1.0 - (1.0 - sat).powf(1.0 / (b + 1.0)));
    let filled = dep_max
        * ((1.0 - c_star / c_max).powf(b + 1.0)
            - (1.0 - (c_star + ponded).min(c_max) / c_max).powf(b + 1.0));
    filled.clamp(0.0, ponded)
}

/// Wetland fill for a supply `p` [mm] over local deficits distributed as
/// `F(x) = 1 - (1 - (x - d_min) / c)^b` on `[d_min, d_min + c]`, with `c`
/// chosen so the mean deficit equals `mean_deficit`.
///
/// Returns `E[min(x, p)]`, the depth captured by depressions.
pub fn wetland_fill(p: f64, mean_deficit: f64, d_min: f64, b: f64) -> f64 {
    if p <= 0.0 || mean_deficit <= 0.0 {
        return 0.0;
    }
    let d_min = d_min.clamp(0.0, mean_deficit);
    let c = (b + 1.0) * (mean_deficit - d_min);
    if p <= d_min {
        p
    } else if c <= 0.0 {
        mean_deficit.min(p)
    } else if p >= d_min + c {
        mean_deficit
    } else {
        d_min + c / (b + 1.0) * (1.0 - (1.0 - (p - d_min) / c).powf(b + 1.0))
    }
}

impl Process for Abstraction {
    fn name(&self) -> &str {
        self.method.name()
    }

    fn connections(&self) -> &[Connection] {
        &self.connections
    }

    fn participating_params(&self) -> &'static [ParamInfo] {
        self.method.params()
    }

    fn is_active(&self, hru: &Hru) -> bool {
        matches!(hru.kind, HruKind::Standard | HruKind::Rock | HruKind::Wetland)
    }

    fn rates_of_change(&self, ctx: &mut ProcessContext<'_>, rates: &mut [f64]) {
        let dt = ctx.dt();
        let hru = ctx.hru();
        let surface = &hru.surface;
        let ponded = ctx.value(self.ponded).max(0.0);
        let dep = ctx.value(self.depression).max(0.0);

        if self.method == AbstractionMethod::PdmRof {
            rates[1] = (dep - surface.dep_max).max(0.0) / dt;
        }
        if ponded <= 0.0 {
            return;
        }

        match self.method {
            AbstractionMethod::Percentage => rates[0] = surface.abst_percent * ponded / dt,
            AbstractionMethod::Fill => {
                rates[0] = ponded.min((surface.dep_max - dep).max(0.0)) / dt;
            }
            AbstractionMethod::Scs => {
                let condition = antecedent_condition(
                    hru.forcing.precip_5day,
                    ctx.time().is_growing_season(),
                );
                let cn = adjusted_curve_number(surface.scs_cn, condition);
                let ia = scs_runoff(ponded, cn, surface.scs_ia_fraction).initial_abstraction;
                rates[0] = ponded.min(ia) / dt;
            }
            AbstractionMethod::PdmRof => {
                rates[0] = pareto_abstraction(ponded, dep, surface.dep_max, surface.pdmrof_b) / dt;
            }
            AbstractionMethod::Uwfs => {
                let d_min_slot = self.connections[2].from;
                let d_min = ctx.value(d_min_slot).max(0.0);
                let mean_deficit = (surface.dep_max - dep).max(0.0);
                let fill = wetland_fill(ponded, mean_deficit, d_min, surface.uwfs_b);
                rates[0] = fill / dt;
                rates[1] = (ponded - fill) / dt;
                rates[2] = ((d_min - ponded).max(0.0) - ctx.value(d_min_slot)) / dt;
            }
        }
    }

    fn apply_constraints(&self, ctx: &ProcessContext<'_>, rates: &mut [f64]) {
        constraint::clip_to_sources(ctx, &self.connections, rates);
        let clipped = constraint::clip_transfer(ctx, self.connections[0], rates[0]);
        if clipped < rates[0] {
            log::debug!(
                "{} hru {}: depression abstraction clipped {:.6} -> {:.6}",
                self.name(),
                ctx.hru().id,
                rates[0],
                clipped
            );
        }
        // Excess the depressions cannot hold spills over where a spill path exists.
        if self.method == AbstractionMethod::Uwfs {
            rates[1] += rates[0] - clipped;
        }
        rates[0] = clipped;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve_number::AntecedentCondition;
    use approx::assert_relative_eq;
    use freshet_core::{GlobalParams, HruId, ModelOptions, SimTime, SurfaceClass};
    use freshet_process::HruAuxiliary;
    use std::sync::Arc;

    fn registry() -> StateRegistry {
        let mut b = StateRegistry::builder();
        b.add(StateVar::single(SvKind::Depression)).unwrap();
        b.add(StateVar::single(SvKind::MinDepDeficit)).unwrap();
        b.build()
    }

    fn eval(p: &Abstraction, surface: SurfaceClass, ponded: f64, dep: f64, d_min: f64) -> Vec<f64> {
        let reg = registry();
        let hru = Hru::new(HruId(0), HruKind::Standard, reg.len()).with_surface(Arc::new(surface));
        let mut state = vec![0.0; reg.len()];
        state[p.ponded.index()] = ponded;
        state[p.depression.index()] = dep;
        state[reg.lookup(SvKind::MinDepDeficit, 0).unwrap().index()] = d_min;
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
    fn connection_counts_per_variant() {
        let reg = registry();
        let count = |m| Abstraction::new(m, &reg).unwrap().connections().len();
        assert_eq!(count(AbstractionMethod::Percentage), 1);
        assert_eq!(count(AbstractionMethod::Scs), 1);
        assert_eq!(count(AbstractionMethod::PdmRof), 2);
        assert_eq!(count(AbstractionMethod::Uwfs), 3);
    }

    #[test]
    fn missing_depression_slot_is_a_configuration_error() {
        let reg = StateRegistry::builder().build();
        let err = Abstraction::new(AbstractionMethod::Fill, &reg).unwrap_err();
        assert!(matches!(err, ProcessError::Registry { ref process, .. } if process == "ABST_FILL"));
    }

    #[test]
    fn depression_near_capacity_limits_abstraction() {
        let reg = registry();
        let p = Abstraction::new(AbstractionMethod::Percentage, &reg).unwrap();
        let surface = SurfaceClass {
            abst_percent: 1.0,
            dep_max: 10.0,
            ..SurfaceClass::default()
        };
        let rates = eval(&p, surface, 5.0, 9.5, 0.0);
        assert_relative_eq!(rates[0], 0.5, epsilon = 1e-12);
        assert!(9.5 + rates[0] <= 10.0 + 1e-12);
    }

    #[test]
    fn zero_ponded_water_abstracts_nothing() {
        let reg = registry();
        for m in [
            AbstractionMethod::Percentage,
            AbstractionMethod::Fill,
            AbstractionMethod::Scs,
            AbstractionMethod::PdmRof,
            AbstractionMethod::Uwfs,
        ] {
            let p = Abstraction::new(m, &reg).unwrap();
            let rates = eval(&p, SurfaceClass::default(), 0.0, 2.0, 1.0);
            assert!(rates.iter().all(|r| *r == 0.0), "{}: {rates:?}", m.name());
        }
    }

    #[test]
    fn scs_abstraction_is_bounded_by_initial_abstraction() {
        let reg = registry();
        let p = Abstraction::new(AbstractionMethod::Scs, &reg).unwrap();
        let surface = SurfaceClass {
            scs_cn: 80.0,
            dep_max: 1000.0,
            ..SurfaceClass::default()
        };
        let rates = eval(&p, surface, 50.0, 0.0, 0.0);
        let cn = adjusted_curve_number(80.0, AntecedentCondition::Dry);
        let ia = 0.2 * 25.4 * (1000.0 / cn - 10.0);
        assert_relative_eq!(rates[0], ia, epsilon = 1e-9);
    }

    #[test]
    fn pareto_abstraction_limits() {
        assert_eq!(pareto_abstraction(0.0, 0.0, 10.0, 0.5), 0.0);
        // Empty depressions with b = 0 (uniform capacity) take everything up to DEP_MAX.
        assert_relative_eq!(pareto_abstraction(4.0, 0.0, 10.0, 0.0), 4.0, epsilon = 1e-12);
        assert_relative_eq!(pareto_abstraction(40.0, 0.0, 10.0, 0.0), 10.0, epsilon = 1e-12);
        assert_eq!(pareto_abstraction(5.0, 10.0, 10.0, 0.5), 0.0);
    }

    #[test]
    fn wetland_fill_piecewise() {
        // Supply below the smallest deficit is fully captured.
        assert_relative_eq!(wetland_fill(2.0, 10.0, 3.0, 1.0), 2.0);
        // Supply beyond the largest deficit fills the mean deficit.
        assert_relative_eq!(wetland_fill(100.0, 10.0, 3.0, 1.0), 10.0);
        // Uniform deficits on [0, 20]: E[min(x, 10)] = 7.5.
        assert_relative_eq!(wetland_fill(10.0, 10.0, 0.0, 1.0), 7.5, epsilon = 1e-12);
    }

    #[test]
    fn uwfs_spills_the_remainder_and_lowers_min_deficit() {
        let reg = registry();
        let p = Abstraction::new(AbstractionMethod::Uwfs, &reg).unwrap();
        let surface = SurfaceClass {
            dep_max: 10.0,
            uwfs_b: 1.0,
            ..SurfaceClass::default()
        };
        let rates = eval(&p, surface, 10.0, 0.0, 0.0);
        assert_relative_eq!(rates[0], 7.5, epsilon = 1e-12);
        assert_relative_eq!(rates[1], 2.5, epsilon = 1e-12);
        assert_eq!(rates[2], 0.0);

        let surface = SurfaceClass {
            dep_max: 10.0,
            ..SurfaceClass::default()
        };
        let rates = eval(&p, surface, 1.0, 0.0, 4.0);
        assert_relative_eq!(rates[2], -1.0, epsilon = 1e-12);
    }

    #[test]
    fn pdmrof_overflows_storage_above_capacity() {
        let reg = registry();
        let p = Abstraction::new(AbstractionMethod::PdmRof, &reg).unwrap();
        let surface = SurfaceClass {
            dep_max: 10.0,
            ..SurfaceClass::default()
        };
        let rates = eval(&p, surface, 0.0, 12.0, 0.0);
        assert_eq!(rates[0], 0.0);
        assert_relative_eq!(rates[1], 2.0, epsilon = 1e-12);
    }
}
