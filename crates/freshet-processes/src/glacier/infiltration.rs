//! Rain infiltration on glacier HRUs (UBC watershed model).
//!
//! Uses the effective impermeable fraction `b2` that UBC infiltration
//! publishes for the same HRU earlier in the timestep.

use crate::wiring::{connect, require_soil_layers};
use freshet_core::{
    Hru, HruKind, ParamBound, ParamClass, ParamInfo, ProcessError, SlotIndex, StateRegistry,
    StateVar, SvKind,
};
use freshet_process::{constraint, Connection, Connections, Process, ProcessContext};

const NAME: &str = "GINFIL_UBCWM";

const PARAMS: &[ParamInfo] = &[ParamInfo::new(
    "MAX_PERC_RATE",
    ParamClass::Soil,
    ParamBound::NonNegative,
)];

/// UBC glacier infiltration.
///
/// Connections: ponded → surface water (`b2` share), ponded → SOIL\[1\]
/// interflow, ponded → SOIL\[2\] groundwater.
#[derive(Debug)]
pub struct GlacierInfiltration {
    connections: Connections,
    ponded: SlotIndex,
}

impl GlacierInfiltration {
    /// Resolve the connections against `registry`. Requires three soil
    /// layers.
    pub fn new(registry: &StateRegistry) -> Result<Self, ProcessError> {
        require_soil_layers(registry, NAME, 3)?;
        let ponded = StateVar::single(SvKind::PondedWater);
        let pairs = [
            (ponded, StateVar::single(SvKind::SurfaceWater)),
            (ponded, StateVar::new(SvKind::Soil, 1)),
            (ponded, StateVar::new(SvKind::Soil, 2)),
        ];
        let connections = connect(registry, NAME, &pairs)?;
        Ok(Self {
            ponded: connections[0].from,
            connections,
        })
    }
}

impl Process for GlacierInfiltration {
    fn name(&self) -> &str {
        NAME
    }

    fn connections(&self) -> &[Connection] {
        &self.connections
    }

    fn participating_params(&self) -> &'static [ParamInfo] {
        PARAMS
    }

    fn is_active(&self, hru: &Hru) -> bool {
        hru.kind == HruKind::Glacier
    }

    fn rates_of_change(&self, ctx: &mut ProcessContext<'_>, rates: &mut [f64]) {
        let rain = ctx.value(self.ponded).max(0.0) / ctx.dt();
        if rain <= 0.0 {
            return;
        }
        let b2 = match ctx.aux().ubc_effective_impermeable_frac {
            Some(b2) => b2,
            None => {
                log::debug!(
                    "{NAME} hru {}: no effective impermeable fraction published, using 1",
                    ctx.hru().id
                );
                1.0
            }
        };
        let max_perc_rate = ctx.hru().soil_class(1).map(|s| s.max_perc_rate).unwrap_or(0.0);
        let permeable = (1.0 - b2) * rain;
        let to_gw = max_perc_rate.min(permeable);
        rates[0] = b2 * rain;
        rates[1] = permeable - to_gw;
        rates[2] = to_gw;
    }

    fn apply_constraints(&self, ctx: &ProcessContext<'_>, rates: &mut [f64]) {
        constraint::clip_to_sources(ctx, &self.connections, rates);
        if ctx.options().allow_soil_overfill {
            return;
        }
        // Soil that cannot take more sends the excess to surface runoff.
        for i in 1..3 {
            let c = self.connections[i];
            if let Some(cap) = ctx.capacity(c.to) {
                let limit = constraint::max_inflow(ctx.value(c.to), cap, ctx.dt());
                if rates[i] > limit {
                    rates[0] += rates[i] - limit;
                    rates[i] = limit;
                }
            }
        }
    }
}
