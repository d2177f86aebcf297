//! Partitioning of ponded water into infiltration and runoff.
//!
//! Every variant drains `PONDED_WATER`. Connection 0 always feeds the top
//! soil layer and connection 1 always feeds surface water; the
//! constraint step relies on that layout to push any soil overfill back
//! into runoff.
//!
//! | variant | connections |
//! |---|---|
//! | most, including `UpscaledGreenAmpt` | ponded → SOIL\[0\], ponded → SURFACE_WATER |
//! | `Hmets` | + ponded → CONVOLUTION\[0\], ponded → CONVOLUTION\[1\] |
//! | `Ubc` | + ponded → SOIL\[1\], SOIL\[2\], SOIL\[3\] |
//! | `GreenAmpt`, `GaSimple` | + CUM_INFIL and GA_MOISTURE_INIT self-updates |
//! | `Awbm` | ponded → SOIL\[0..3\], ponded → SURFACE_WATER, ponded → SOIL\[3\] |

use crate::curve_number::{adjusted_curve_number, antecedent_condition, scs_runoff};
use crate::numeric::{lambert_w_m1, thresh_min, thresh_positive};
use statrs::function::erf::{erf, erfc};
use std::f64::consts::SQRT_2;
use crate::wiring::{connect, expect_sink, require_soil_layers, saturation, slot};
use freshet_core::constants::REAL_SMALL;
use freshet_core::{
    Hru, HruKind, ParamBound, ParamClass, ParamInfo, ProcessError, SlotIndex, StateRegistry,
    StateVar, SvKind,
};
use freshet_process::{constraint, Connection, Connections, Process, ProcessContext};
use serde::{Deserialize, Serialize};

/// Flash-runoff saturation intensity of the UBC watershed model [mm/d].
const UBC_FLASH_SATURATION: f64 = 1800.0;

/// Infiltration algorithm.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InfiltrationMethod {
    /// Fixed runoff coefficient.
    Rational,
    /// SCS curve number with initial abstraction.
    Scs,
    /// SCS curve number, abstraction handled by a separate process.
    ScsNoAbstraction,
    /// Everything infiltrates except on the impermeable fraction.
    AllInfiltrates,
    /// HBV power-law contributing area.
    Hbv,
    /// ARNO/VIC variable infiltration curve.
    VicArno,
    /// VIC storage distribution.
    Vic,
    /// PRMS linear contributing area.
    Prms,
    /// GR4J production-store infiltration.
    Gr4j,
    /// Probability-distributed soil capacities (Pareto).
    Pdm,
    /// HMETS with two delayed runoff paths.
    Hmets,
    /// UBC watershed model.
    Ubc,
    /// Green-Ampt, evaluated fresh every step.
    GreenAmpt,
    /// Green-Ampt with event memory and redistribution between storms.
    GaSimple,
    /// Green-Ampt upscaled over log-normally distributed conductivity.
    UpscaledGreenAmpt,
    /// Australian Water Balance Model, three partial-area stores.
    Awbm,
}

impl InfiltrationMethod {
    /// Configuration name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Rational => "INF_RATIONAL",
            Self::Scs => "INF_SCS",
            Self::ScsNoAbstraction => "INF_SCS_NOABSTRACTION",
            Self::AllInfiltrates => "INF_ALL_INFILTRATES",
            Self::Hbv => "INF_HBV",
            Self::VicArno => "INF_VIC_ARNO",
            Self::Vic => "INF_VIC",
            Self::Prms => "INF_PRMS",
            Self::Gr4j => "INF_GR4J",
            Self::Pdm => "INF_PDM",
            Self::Hmets => "INF_HMETS",
            Self::Ubc => "INF_UBC",
            Self::GreenAmpt => "INF_GREEN_AMPT",
            Self::GaSimple => "INF_GA_SIMPLE",
            Self::UpscaledGreenAmpt => "INF_UPSCALED_GREEN_AMPT",
            Self::Awbm => "INF_AWBM",
        }
    }

    /// State variables this variant requires in the registry.
    pub fn state_vars(self) -> Vec<StateVar> {
        let mut vars = vec![
            StateVar::single(SvKind::PondedWater),
            StateVar::single(SvKind::SurfaceWater),
            StateVar::new(SvKind::Soil, 0),
        ];
        match self {
            Self::Ubc | Self::Awbm => {
                vars.extend((1..4).map(|m| StateVar::new(SvKind::Soil, m)));
            }
            Self::Hmets => {
                vars.push(StateVar::new(SvKind::Convolution, 0));
                vars.push(StateVar::new(SvKind::Convolution, 1));
            }
            Self::GreenAmpt | Self::GaSimple => {
                vars.push(StateVar::single(SvKind::CumInfil));
                vars.push(StateVar::single(SvKind::GaMoistureInit));
            }
            _ => {}
        }
        vars
    }

    /// Parameters read by this variant.
    pub fn params(self) -> &'static [ParamInfo] {
        match self {
            Self::Rational => RATIONAL_PARAMS,
            Self::Scs | Self::ScsNoAbstraction => SCS_PARAMS,
            Self::AllInfiltrates => IMPERMEABLE_PARAMS,
            Self::Hbv => HBV_PARAMS,
            Self::VicArno => VIC_ARNO_PARAMS,
            Self::Vic => VIC_PARAMS,
            Self::Prms => PRMS_PARAMS,
            Self::Gr4j => GR4J_PARAMS,
            Self::Pdm => PDM_PARAMS,
            Self::Hmets => HMETS_PARAMS,
            Self::Ubc => UBC_PARAMS,
            Self::GreenAmpt | Self::GaSimple => GREEN_AMPT_PARAMS,
            Self::UpscaledGreenAmpt => UPSCALED_GREEN_AMPT_PARAMS,
            Self::Awbm => AWBM_PARAMS,
        }
    }
}

// ── Participating parameters ────────────────────────────────────

const fn surface(name: &'static str, bound: ParamBound) -> ParamInfo {
    ParamInfo::new(name, ParamClass::Surface, bound)
}

const fn soil(name: &'static str, bound: ParamBound) -> ParamInfo {
    ParamInfo::new(name, ParamClass::Soil, bound)
}

const IMPERMEABLE: ParamInfo = surface("IMPERMEABLE_FRAC", ParamBound::Fraction);
const POROSITY: ParamInfo = soil("POROSITY", ParamBound::Fraction);

const RATIONAL_PARAMS: &[ParamInfo] = &[surface("PARTITION_COEFF", ParamBound::Fraction)];
const SCS_PARAMS: &[ParamInfo] = &[
    surface("SCS_CN", ParamBound::Positive),
    surface("SCS_IA_FRACTION", ParamBound::NonNegative),
];
const IMPERMEABLE_PARAMS: &[ParamInfo] = &[IMPERMEABLE];
const HBV_PARAMS: &[ParamInfo] = &[POROSITY, soil("HBV_BETA", ParamBound::Positive), IMPERMEABLE];
const VIC_ARNO_PARAMS: &[ParamInfo] = &[
    soil("VIC_B_EXP", ParamBound::Positive),
    POROSITY,
    IMPERMEABLE,
];
const VIC_PARAMS: &[ParamInfo] = &[
    soil("VIC_ZMAX", ParamBound::Positive),
    soil("VIC_ZMIN", ParamBound::NonNegative),
    soil("VIC_ALPHA", ParamBound::Positive),
    POROSITY,
    IMPERMEABLE,
];
const PRMS_PARAMS: &[ParamInfo] = &[
    surface("MAX_SAT_AREA_FRAC", ParamBound::Fraction),
    POROSITY,
    soil("FIELD_CAPACITY", ParamBound::Fraction),
    soil("SAT_WILT", ParamBound::Fraction),
    IMPERMEABLE,
];
const GR4J_PARAMS: &[ParamInfo] = &[POROSITY, IMPERMEABLE];
const PDM_PARAMS: &[ParamInfo] = &[IMPERMEABLE, surface("PDM_B", ParamBound::NonNegative), POROSITY];
const HMETS_PARAMS: &[ParamInfo] = &[
    surface("HMETS_RUNOFF_COEFF", ParamBound::Fraction),
    IMPERMEABLE,
];
const UBC_PARAMS: &[ParamInfo] = &[
    IMPERMEABLE,
    soil("MAX_PERC_RATE", ParamBound::NonNegative),
    soil("UBC_INFIL_SOIL_DEF", ParamBound::Positive),
    POROSITY,
    ParamInfo::new("UBC_GW_SPLIT", ParamClass::Global, ParamBound::Fraction),
    ParamInfo::new("UBC_FLASH_PONDING", ParamClass::Global, ParamBound::Positive),
];
const GREEN_AMPT_PARAMS: &[ParamInfo] = &[
    soil("HYDRAUL_COND", ParamBound::NonNegative),
    soil("WETTING_FRONT_PSI", ParamBound::NonNegative),
    POROSITY,
    IMPERMEABLE,
];
const UPSCALED_GREEN_AMPT_PARAMS: &[ParamInfo] = &[
    soil("HYDRAUL_COND", ParamBound::NonNegative),
    soil("WETTING_FRONT_PSI", ParamBound::NonNegative),
    soil("KSAT_STD_DEVIATION", ParamBound::NonNegative),
    POROSITY,
    IMPERMEABLE,
];
const AWBM_PARAMS: &[ParamInfo] = &[
    surface("AWBM_AREAFRAC1", ParamBound::Fraction),
    surface("AWBM_AREAFRAC2", ParamBound::Fraction),
    surface("AWBM_BFLOW_INDEX", ParamBound::Fraction),
];

// ── Process ─────────────────────────────────────────────────────

/// Infiltration process for one configured [`InfiltrationMethod`].
#[derive(Debug)]
pub struct Infiltration {
    method: InfiltrationMethod,
    connections: Connections,
    ponded: SlotIndex,
    top_soil: SlotIndex,
    /// `(CUM_INFIL, GA_MOISTURE_INIT)` for the Green-Ampt variants.
    green_ampt: Option<(SlotIndex, SlotIndex)>,
}

impl Infiltration {
    /// Resolve the connections of `method` against `registry`.
    pub fn new(method: InfiltrationMethod, registry: &StateRegistry) -> Result<Self, ProcessError> {
        let name = method.name();
        let ponded = StateVar::single(SvKind::PondedWater);
        let sw = StateVar::single(SvKind::SurfaceWater);
        let soil = |m| StateVar::new(SvKind::Soil, m);

        let mut pairs = vec![(ponded, soil(0)), (ponded, sw)];
        let mut green_ampt = None;
        match method {
            InfiltrationMethod::Ubc => {
                require_soil_layers(registry, name, 4)?;
                pairs.extend((1..4).map(|m| (ponded, soil(m))));
            }
            InfiltrationMethod::Hmets => {
                pairs.push((ponded, StateVar::new(SvKind::Convolution, 0)));
                pairs.push((ponded, StateVar::new(SvKind::Convolution, 1)));
            }
            InfiltrationMethod::GreenAmpt | InfiltrationMethod::GaSimple => {
                let cum = StateVar::single(SvKind::CumInfil);
                let init = StateVar::single(SvKind::GaMoistureInit);
                pairs.push((cum, cum));
                pairs.push((init, init));
                green_ampt = Some((slot(registry, name, cum)?, slot(registry, name, init)?));
            }
            InfiltrationMethod::Awbm => {
                require_soil_layers(registry, name, 4)?;
                pairs = vec![
                    (ponded, soil(0)),
                    (ponded, soil(1)),
                    (ponded, soil(2)),
                    (ponded, sw),
                    (ponded, soil(3)),
                ];
            }
            _ => {}
        }

        Ok(Self {
            method,
            connections: connect(registry, name, &pairs)?,
            ponded: slot(registry, name, ponded)?,
            top_soil: slot(registry, name, soil(0))?,
            green_ampt,
        })
    }

    /// Configured algorithm.
    pub fn method(&self) -> InfiltrationMethod {
        self.method
    }

    fn ubc(&self, ctx: &mut ProcessContext<'_>, rainthru: f64, rates: &mut [f64]) {
        let hru = ctx.hru();
        let soil_deficit = (hru.soil_capacity(0) - ctx.value(self.top_soil)).max(0.0);
        let fimp = hru.surface.impermeable_frac;
        let max_perc_rate = hru.soil_class(1).map(|s| s.max_perc_rate).unwrap_or(0.0);
        let soil_def_scale = hru.soil_class(0).map(|s| s.ubc_infil_soil_def).unwrap_or(1.0);
        let gw_split = ctx.params().ubc_gw_split;
        let flash_ponding = ctx.params().ubc_flash_ponding;

        // Effective impermeable area without the flash factor.
        let b1 = if fimp < 1.0 {
            fimp * 10f64.powf(-soil_deficit / soil_def_scale)
        } else {
            1.0
        };
        let flash = if rainthru > flash_ponding {
            1.0 + (rainthru / UBC_FLASH_SATURATION).ln()
                / (UBC_FLASH_SATURATION / flash_ponding).ln()
        } else {
            0.0
        };
        let b2 = b1 + (1.0 - b1) * flash.clamp(0.0, 1.0);
        ctx.aux_mut().ubc_effective_impermeable_frac = Some(b2);

        if !matches!(ctx.hru().kind, HruKind::Standard | HruKind::Rock) {
            return;
        }
        if ctx.hru().kind == HruKind::Rock {
            rates[1] = rainthru;
            return;
        }

        let dt = ctx.dt();
        let mut infil = (soil_deficit / dt).min(rainthru);
        let mut to_gw = max_perc_rate.min(rainthru - infil);
        let mut to_interflow = rainthru - infil - to_gw;
        infil *= 1.0 - b2;
        to_gw *= 1.0 - b2;
        to_interflow *= 1.0 - b2;

        rates[0] = infil;
        rates[1] = rainthru - infil - to_gw - to_interflow;
        rates[2] = to_interflow;
        rates[3] = (1.0 - gw_split) * to_gw;
        rates[4] = gw_split * to_gw;
    }

    fn green_ampt(&self, ctx: &ProcessContext<'_>, rainthru: f64, rates: &mut [f64]) {
        let hru = ctx.hru();
        let dt = ctx.dt();
        let Some(class) = hru.soil_class(0) else {
            return;
        };
        let ksat = class.hydraul_cond;
        let psi = class.wetting_front_psi;
        let porosity = class.porosity;
        let stor = ctx.value(self.top_soil);
        let max_stor = hru.soil_capacity(0);
        let fimp = hru.surface.impermeable_frac;

        let memory = match (self.method, self.green_ampt) {
            (InfiltrationMethod::GaSimple, Some((cum, init))) => Some((cum, init)),
            _ => None,
        };
        let (mut cum_inf, mut init_stor) = memory
            .map(|(cum, init)| (ctx.value(cum), ctx.value(init)))
            .unwrap_or((0.0, 0.0));

        if memory.is_some() && rainthru <= ksat {
            if cum_inf <= 0.0 {
                cum_inf = 0.0;
                init_stor = 0.0;
            } else {
                let redistribution = (cum_inf * 2.0 / 3.0).max(ksat);
                cum_inf -= redistribution * dt;
                init_stor = (init_stor + redistribution * dt).min(stor);
                if cum_inf <= 0.0 {
                    cum_inf = 0.0;
                    init_stor = 0.0;
                }
            }
        }

        if rainthru > REAL_SMALL {
            let deficit = (1.0 - saturation(stor, max_stor)) * porosity;
            let mut alpha = psi * deficit;
            if memory.is_none() || cum_inf <= 0.0 {
                cum_inf = green_ampt_cumulative(dt, alpha, ksat, rainthru);
                init_stor = stor;
            } else {
                alpha = psi * (1.0 - saturation(init_stor, max_stor)) * porosity;
            }
            let finf = if cum_inf > 0.0 {
                ksat * (1.0 + alpha / cum_inf)
            } else {
                0.0
            };
            let runoff = fimp * rainthru + (1.0 - fimp) * thresh_positive(rainthru - finf);
            rates[0] = rainthru - runoff;
            rates[1] = runoff;
            if memory.is_some() {
                cum_inf += rates[0] * dt;
            }
        }

        if let Some((cum, init)) = memory {
            rates[2] = (cum_inf - ctx.value(cum)) / dt;
            rates[3] = (init_stor - ctx.value(init)) / dt;
        }
    }

    fn awbm(&self, ctx: &ProcessContext<'_>, ponded: f64, rates: &mut [f64]) {
        let hru = ctx.hru();
        let s = &hru.surface;
        let fractions = [
            s.awbm_areafrac1,
            s.awbm_areafrac2,
            (1.0 - s.awbm_areafrac1 - s.awbm_areafrac2).max(0.0),
        ];
        let dt = ctx.dt();
        let mut runoff_total = 0.0;
        for (m, a) in fractions.into_iter().enumerate() {
            let store = self.connections[m].to;
            let deficit = (a * hru.soil_capacity(m) - ctx.value(store)).max(0.0);
            let runoff = (a * ponded - deficit).max(0.0);
            rates[m] = (a * ponded - runoff) / dt;
            runoff_total += runoff;
        }
        let bfi = s.awbm_bflow_index;
        rates[3] = (1.0 - bfi) * runoff_total / dt;
        rates[4] = bfi * runoff_total / dt;
    }

    /// Infiltration rate into SOIL\[0\] for the two-connection variants.
    fn simple_infiltration(&self, ctx: &ProcessContext<'_>, ponded: f64, rainthru: f64) -> f64 {
        let hru = ctx.hru();
        let fimp = hru.surface.impermeable_frac;
        let stor = ctx.value(self.top_soil);
        let max_stor = hru.soil_capacity(0);
        let permeable = |runoff: f64| rainthru - (fimp * rainthru + (1.0 - fimp) * runoff);
        let Some(class) = hru.soil_class(0) else {
            return 0.0;
        };

        match self.method {
            InfiltrationMethod::Rational => (1.0 - hru.surface.partition_coeff) * rainthru,
            InfiltrationMethod::Scs | InfiltrationMethod::ScsNoAbstraction => {
                let condition = antecedent_condition(
                    hru.forcing.precip_5day,
                    ctx.time().is_growing_season(),
                );
                let cn = adjusted_curve_number(hru.surface.scs_cn, condition);
                let ia_fraction = if self.method == InfiltrationMethod::Scs {
                    hru.surface.scs_ia_fraction
                } else {
                    0.0
                };
                let dt = ctx.dt();
                let runoff = scs_runoff(rainthru * dt, cn, ia_fraction).runoff_depth / dt;
                rainthru - runoff
            }
            InfiltrationMethod::AllInfiltrates => permeable(0.0),
            InfiltrationMethod::Hbv => {
                permeable(saturation(stor, max_stor).powf(class.hbv_beta) * rainthru)
            }
            InfiltrationMethod::VicArno => {
                let sat_area = 1.0 - (1.0 - saturation(stor, max_stor)).powf(class.vic_b_exp);
                permeable(sat_area * rainthru)
            }
            InfiltrationMethod::Vic => {
                let sat = saturation(stor, max_stor);
                let gamma = 1.0 / (class.vic_alpha + 1.0);
                let k1 = ((class.vic_zmax - class.vic_zmin) * class.vic_alpha * gamma)
                    .max(REAL_SMALL)
                    .powf(-gamma);
                let smax = gamma * (class.vic_alpha * class.vic_zmax + class.vic_zmin);
                let frac = 1.0 - k1 * (smax - sat).max(0.0).powf(gamma);
                permeable(rainthru * thresh_min(frac, 1.0, 0.0).max(0.0))
            }
            InfiltrationMethod::Prms => {
                let tension = hru.tension_capacity(0);
                let runoff = hru.surface.max_sat_area_frac * saturation(stor, tension) * rainthru;
                permeable(runoff)
            }
            InfiltrationMethod::Gr4j => {
                if max_stor <= 0.0 {
                    return 0.0;
                }
                let sat = saturation(stor, max_stor);
                let t = (ponded / max_stor).tanh();
                let depth = max_stor * (1.0 - sat * sat) * t / (1.0 + sat * t);
                (1.0 - fimp) * depth.min(ponded) / ctx.dt()
            }
            InfiltrationMethod::Pdm => {
                if max_stor <= 0.0 {
                    return 0.0;
                }
                let b = hru.surface.pdm_b;
                let c_max = (b + 1.0) * max_stor;
                let sat = saturation(stor, max_stor);
                let c_star = c_max * (1.0 - (1.0 - sat).powf(1.0 / (b + 1.0)));
                let depth = max_stor
                    * ((1.0 - c_star / c_max).powf(b + 1.0)
                        - (1.0 - (c_star + ponded).min(c_max) / c_max).powf(b + 1.0));
                (1.0 - fimp) * depth.clamp(0.0, ponded) / ctx.dt()
            }
            InfiltrationMethod::UpscaledGreenAmpt => {
                let alpha = class.wetting_front_psi
                    * class.porosity
                    * (1.0 - saturation(stor, max_stor));
                let runoff = heterogeneous_green_ampt_runoff(
                    rainthru,
                    alpha,
                    class.hydraul_cond,
                    class.ksat_std_deviation,
                    ctx.dt(),
                );
                permeable(runoff)
            }
            InfiltrationMethod::Hmets
            | InfiltrationMethod::Ubc
            | InfiltrationMethod::GreenAmpt
            | InfiltrationMethod::GaSimple
            | InfiltrationMethod::Awbm => 0.0,
        }
    }
}

impl Process for Infiltration {
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
        // UBC must run everywhere so glacier HRUs receive b2.
        self.method == InfiltrationMethod::Ubc
            || matches!(hru.kind, HruKind::Standard | HruKind::Rock)
    }

    fn initialize(&mut self, registry: &StateRegistry) -> Result<(), ProcessError> {
        expect_sink(registry, self.name(), &self.connections, 0, SvKind::Soil)
    }

    fn rates_of_change(&self, ctx: &mut ProcessContext<'_>, rates: &mut [f64]) {
        let ponded = ctx.value(self.ponded).max(0.0);
        let rainthru = ponded / ctx.dt();

        if self.method == InfiltrationMethod::Ubc {
            self.ubc(ctx, rainthru, rates);
            return;
        }
        match ctx.hru().kind {
            HruKind::Standard => {}
            HruKind::Rock => {
                rates[1] = rainthru;
                return;
            }
            _ => return,
        }
        if matches!(
            self.method,
            InfiltrationMethod::GreenAmpt | InfiltrationMethod::GaSimple
        ) {
            self.green_ampt(ctx, rainthru, rates);
            return;
        }
        if rainthru <= 0.0 {
            return;
        }

        match self.method {
            InfiltrationMethod::Hmets => {
                let hru = ctx.hru();
                let fimp = hru.surface.impermeable_frac;
                let coeff = hru.surface.hmets_runoff_coeff;
                let sat = saturation(ctx.value(self.top_soil), hru.soil_capacity(0));
                let horizontal = coeff * sat * (1.0 - fimp) * rainthru;
                let infil = (1.0 - fimp) * rainthru - horizontal;
                let delayed = coeff * sat * sat * infil;
                rates[0] = infil - delayed;
                rates[1] = fimp * rainthru;
                rates[2] = horizontal;
                rates[3] = delayed;
            }
            InfiltrationMethod::Awbm => self.awbm(ctx, ponded, rates),
            _ => {
                let infil = self
                    .simple_infiltration(ctx, ponded, rainthru)
                    .clamp(0.0, rainthru);
                rates[0] = infil;
                rates[1] = rainthru - infil;
            }
        }
        log::trace!(
            "{} hru {}: infiltration {:.6} mm/d of {:.6}",
            self.name(),
            ctx.hru().id,
            rates[0],
            rainthru
        );
    }

    fn apply_constraints(&self, ctx: &ProcessContext<'_>, rates: &mut [f64]) {
        if ctx.hru().kind != HruKind::Standard {
            constraint::clip_to_sources(ctx, &self.connections, rates);
            return;
        }
        let dt = ctx.dt();
        rates[0] = rates[0].min(constraint::max_outflow(ctx.value(self.ponded), dt));

        let mut infil = rates[0];
        if !ctx.options().allow_soil_overfill {
            let to = self.connections[0].to;
            if let Some(cap) = ctx.capacity(to) {
                infil = infil.min(constraint::max_inflow(ctx.value(to), cap, dt));
            }
        }
        // AWBM has no surface-water edge at index 1; its overflow goes to
        // the runoff edge at index 3 instead.
        let runoff = if self.method == InfiltrationMethod::Awbm { 3 } else { 1 };
        rates[runoff] += rates[0] - infil;
        rates[0] = infil;
    }
}

/// Runoff [mm/d] from supply `w` [mm/d] over a surface whose saturated
/// conductivity is log-normal with mean `ksat` and log standard deviation
/// `sig_y`, using the upscaled rate at the middle of a step of `dt` days.
pub fn heterogeneous_green_ampt_runoff(w: f64, alpha: f64, ksat: f64, sig_y: f64, dt: f64) -> f64 {
    if w <= 0.0 {
        return 0.0;
    }
    if ksat <= 0.0 {
        return w;
    }
    let mu_y = ksat.ln() - 0.5 * sig_y * sig_y;
    thresh_positive(w - upscaled_green_ampt_rate(0.5 * dt, alpha, mu_y, sig_y, w))
}

/// Areal mean Green-Ampt infiltration capacity [mm/d] at time `t` after
/// the onset of supply `w`, for log conductivity with mean `mu_y` and
/// standard deviation `sig_y`.
///
/// One-point approximation of the ponding correction.
fn upscaled_green_ampt_rate(t: f64, alpha: f64, mu_y: f64, sig_y: f64, w: f64) -> f64 {
    if t <= 0.0 {
        return w;
    }
    let x = scaled_time(t, alpha, w);
    if x <= 0.0 {
        return w;
    }
    let k_bar = (mu_y + 0.5 * sig_y * sig_y).exp();
    if sig_y <= 0.0 {
        return k_bar / x + w * ponding_correction(t, alpha, k_bar, w);
    }
    let a = ((w * x).ln() - mu_y) / sig_y / SQRT_2;
    let upper = erfc(sig_y / SQRT_2 - a);
    let mut rate = 0.5 * w * erfc(a) + 0.5 / x * k_bar * upper;
    let ponded_share = 0.5 * (1.0 + erf(a));
    if ponded_share > 0.0 {
        let k_test = 0.5 * k_bar * upper / ponded_share;
        rate += w * ponded_share * ponding_correction(t, alpha, k_test, w);
    }
    rate
}

/// `X = t* / (1 + t*)` with dimensionless time `t* = w t / alpha`.
fn scaled_time(t: f64, alpha: f64, w: f64) -> f64 {
    if alpha <= 0.0 {
        return 1.0;
    }
    let t_star = w * t / alpha;
    if t_star <= 0.0 {
        0.0
    } else {
        t_star / (1.0 + t_star)
    }
}

fn ponding_correction(t: f64, alpha: f64, ks: f64, w: f64) -> f64 {
    let x = scaled_time(t, alpha, w);
    if x <= 0.0 {
        return 0.0;
    }
    let kp = ks / w / x;
    if kp <= 0.0 || kp >= 1.0 {
        return 0.0;
    }
    0.135 * (1.0 - x).powf(0.484) * 2.69 * (1.0 - kp).powf(1.74) * kp.powf(0.38)
}

/// Cumulative Green-Ampt infiltration [mm] after `t` days of constant
/// supply `w` [mm/d], with `alpha = |psi_f| * deficit` [mm] and saturated
/// conductivity `ks` [mm/d].
///
/// Before ponding everything infiltrates. After ponding the implicit
/// Green-Ampt equation is solved explicitly with the lower branch of the
/// Lambert W function.
pub fn green_ampt_cumulative(t: f64, alpha: f64, ks: f64, w: f64) -> f64 {
    if ks <= 0.0 || w <= 0.0 || alpha <= 0.0 {
        return 0.0;
    }
    if w <= ks {
        return w * t;
    }
    let tp = alpha * ks / w / (w - ks);
    if t < tp {
        return w * t;
    }
    let fp = w * tp;
    let t_star = ks / alpha * (t - tp);
    let x = -(1.0 + fp / alpha) * (-(1.0 + t_star + fp / alpha)).exp();
    let f = alpha * (-1.0 - lambert_w_m1(x));
    // Underflow of x drives W to -inf; infiltration never exceeds supply.
    f.min(w * t)
}
