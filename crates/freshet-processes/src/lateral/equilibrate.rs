use super::{accept, members};
use freshet_core::{ModelOptions, ProcessError, StateVar};
use freshet_process::{HruTopology, LateralConnection, LateralContext, LateralProcess};

/// Mix one storage across an HRU group toward its area-weighted mean.
///
/// The first member acts as a hub: every other member exchanges with it
/// in either direction. With `mix = 1` the group is fully equilibrated in
/// one step; the hub ends at the mean because the area-weighted
/// deviations of all members sum to zero.
#[derive(Debug)]
pub struct LateralEquilibrate {
    group: String,
    var: StateVar,
    mix: f64,
    connections: Vec<LateralConnection>,
}

impl LateralEquilibrate {
    /// Equilibrate `var` across `group`, moving fraction `mix` of each
    /// member's deviation per day.
    pub fn new(group: impl Into<String>, var: StateVar, mix: f64) -> Result<Self, ProcessError> {
        if !(0.0..=1.0).contains(&mix) {
            return Err(ProcessError::invalid(
                "LAT_EQUIL",
                format!("mixing fraction {mix} outside [0, 1]"),
            ));
        }
        Ok(Self {
            group: group.into(),
            var,
            mix,
            connections: Vec::new(),
        })
    }

    fn area_weighted_mean(&self, ctx: &LateralContext<'_>) -> f64 {
        let Some(first) = self.connections.first() else {
            return 0.0;
        };
        let hub = first.to_hru;
        let slot = first.to;
        let mut volume = ctx.value(hub, slot) * ctx.area(hub);
        let mut area = ctx.area(hub);
        for c in &self.connections {
            volume += ctx.value(c.from_hru, c.from) * ctx.area(c.from_hru);
            area += ctx.area(c.from_hru);
        }
        if area > 0.0 {
            volume / area
        } else {
            0.0
        }
    }
}

impl LateralProcess for LateralEquilibrate {
    fn name(&self) -> &str {
        "LAT_EQUIL"
    }

    fn initialize(
        &mut self,
        topology: &HruTopology<'_>,
        options: &ModelOptions,
    ) -> Result<(), ProcessError> {
        let name = self.name().to_string();
        let slot = topology
            .registry()
            .resolve(self.var)
            .map_err(|e| ProcessError::registry(&name, e))?;
        let group = members(topology, &name, &self.group)?;
        let n_hrus = topology.hrus().len();
        let mut valid = group.iter().copied().filter(|&k| k < n_hrus);
        let connections = match valid.next() {
            Some(hub) => valid
                .filter(|&k| k != hub)
                .map(|k| LateralConnection {
                    from_hru: k,
                    from: slot,
                    to_hru: hub,
                    to: slot,
                })
                .collect(),
            None => Vec::new(),
        };
        self.connections = accept(&name, connections, options)?;
        Ok(())
    }

    fn connections(&self) -> &[LateralConnection] {
        &self.connections
    }

    fn exchange_rates(&self, ctx: &LateralContext<'_>, rates: &mut [f64]) {
        let mean = self.area_weighted_mean(ctx);
        let dt = ctx.dt();
        for (c, r) in self.connections.iter().zip(rates.iter_mut()) {
            let deviation = ctx.value(c.from_hru, c.from) - mean;
            *r = self.mix * deviation * ctx.area(c.from_hru) / dt;
        }
    }
}
