//! Crop heat unit accumulation.

use crate::wiring::connect;
use freshet_core::{
    ParamBound, ParamClass, ParamInfo, ProcessError, StateRegistry, StateVar, SvKind,
};
use freshet_process::{Connection, Connections, Process, ProcessContext};
use serde::{Deserialize, Serialize};

/// Crop heat unit algorithm.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CropHeatMethod {
    /// Ontario daily CHU from maximum and minimum temperature.
    Ontario,
}

impl CropHeatMethod {
    /// Configuration name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Ontario => "CHU_ONTARIO",
        }
    }
}

/// Ontario daily crop heat units from daily extreme temperatures [°C].
///
/// The maximum-temperature term is zero at or below 10 °C, the
/// minimum-temperature term at or below 4.44 °C.
pub fn ontario_daily_chu(t_max: f64, t_min: f64) -> f64 {
    let y_max = if t_max > 10.0 {
        let d = t_max - 10.0;
        3.33 * d - 0.084 * d * d
    } else {
        0.0
    };
    let y_min = if t_min > 4.44 {
        1.8 * (t_min - 4.44)
    } else {
        0.0
    };
    (0.5 * (y_max + y_min)).max(0.0)
}

/// Crop heat units: a `CROP_HEAT_UNITS` self-update.
///
/// Accumulates daily CHU, caps at the vegetation's maturity, and resets
/// at the first timestep of each year.
#[derive(Debug)]
pub struct CropHeatUnits {
    method: CropHeatMethod,
    connections: Connections,
}

impl CropHeatUnits {
    /// Resolve the connection against `registry`.
    pub fn new(method: CropHeatMethod, registry: &StateRegistry) -> Result<Self, ProcessError> {
        let chu = StateVar::single(SvKind::CropHeatUnits);
        Ok(Self {
            method,
            connections: connect(registry, method.name(), &[(chu, chu)])?,
        })
    }
}

impl Process for CropHeatUnits {
    fn name(&self) -> &str {
        self.method.name()
    }

    fn connections(&self) -> &[Connection] {
        &self.connections
    }

    fn participating_params(&self) -> &'static [ParamInfo] {
        const PARAMS: &[ParamInfo] = &[ParamInfo::new(
            "CHU_MATURITY",
            ParamClass::Vegetation,
            ParamBound::Positive,
        )];
        PARAMS
    }

    fn rates_of_change(&self, ctx: &mut ProcessContext<'_>, rates: &mut [f64]) {
        let dt = ctx.dt();
        let current = ctx.value(self.connections[0].from);
        if ctx.time().julian_day < dt {
            rates[0] = -current / dt;
            return;
        }
        let hru = ctx.hru();
        let daily = ontario_daily_chu(hru.forcing.temp_daily_max, hru.forcing.temp_daily_min);
        let target = (current + daily * dt).min(hru.vegetation.chu_maturity.max(current));
        rates[0] = (target - current) / dt;
    }
}
