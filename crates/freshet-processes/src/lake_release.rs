//! Release of lake storage to surface water.

use crate::wiring::connect;
use freshet_core::{
    ParamBound, ParamClass, ParamInfo, ProcessError, StateRegistry, StateVar, SvKind,
};
use freshet_process::{Connection, Connections, Process, ProcessContext};
use serde::{Deserialize, Serialize};

/// Lake release algorithm.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LakeReleaseMethod {
    /// Linear reservoir, explicit.
    Linear,
    /// Linear reservoir integrated exactly over the timestep.
    LinearAnalytic,
}

impl LakeReleaseMethod {
    /// Configuration name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Linear => "LAKEREL_LINEAR",
            Self::LinearAnalytic => "LAKEREL_LINEAR_ANALYTIC",
        }
    }
}

/// `LAKE_STORAGE` → `SURFACE_WATER`.
#[derive(Debug)]
pub struct LakeRelease {
    method: LakeReleaseMethod,
    connections: Connections,
}

impl LakeRelease {
    /// Resolve the connection of `method` against `registry`.
    pub fn new(method: LakeReleaseMethod, registry: &StateRegistry) -> Result<Self, ProcessError> {
        let pairs = [(
            StateVar::single(SvKind::LakeStorage),
            StateVar::single(SvKind::SurfaceWater),
        )];
        Ok(Self {
            method,
            connections: connect(registry, method.name(), &pairs)?,
        })
    }
}

impl Process for LakeRelease {
    fn name(&self) -> &str {
        self.method.name()
    }

    fn connections(&self) -> &[Connection] {
        &self.connections
    }

    fn participating_params(&self) -> &'static [ParamInfo] {
        const PARAMS: &[ParamInfo] = &[ParamInfo::new(
            "LAKE_REL_COEFF",
            ParamClass::Surface,
            ParamBound::NonNegative,
        )];
        PARAMS
    }

    fn rates_of_change(&self, ctx: &mut ProcessContext<'_>, rates: &mut [f64]) {
        let stored = ctx.value(self.connections[0].from).max(0.0);
        let k = ctx.hru().surface.lake_rel_coeff;
        let dt = ctx.dt();
        rates[0] = match self.method {
            LakeReleaseMethod::Linear => k * stored,
            LakeReleaseMethod::LinearAnalytic => stored * (1.0 - (-k * dt).exp()) / dt,
        };
    }
}
