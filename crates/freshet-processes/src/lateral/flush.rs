use super::{accept, members};
use freshet_core::{ModelOptions, ProcessError, StateVar};
use freshet_process::{HruTopology, LateralConnection, LateralContext, LateralProcess};

/// Move the whole content of one storage in every source HRU to a storage
/// in the single destination HRU of its scope.
///
/// The scope is the whole model, or with `per_sub_basin` each routing
/// sub-basin. A scope with several destination candidates is a
/// configuration error; a source without a destination is skipped.
#[derive(Debug)]
pub struct LateralFlush {
    from_group: String,
    from: StateVar,
    to_group: String,
    to: StateVar,
    per_sub_basin: bool,
    connections: Vec<LateralConnection>,
}

impl LateralFlush {
    /// Flush `from` in members of `from_group` into `to` of the member of
    /// `to_group`.
    pub fn new(
        from_group: impl Into<String>,
        from: StateVar,
        to_group: impl Into<String>,
        to: StateVar,
        per_sub_basin: bool,
    ) -> Self {
        Self {
            from_group: from_group.into(),
            from,
            to_group: to_group.into(),
            to,
            per_sub_basin,
            connections: Vec::new(),
        }
    }
}

impl LateralProcess for LateralFlush {
    fn name(&self) -> &str {
        "LAT_FLUSH"
    }

    fn initialize(
        &mut self,
        topology: &HruTopology<'_>,
        options: &ModelOptions,
    ) -> Result<(), ProcessError> {
        let name = self.name().to_string();
        let registry = topology.registry();
        let from = registry
            .resolve(self.from)
            .map_err(|e| ProcessError::registry(&name, e))?;
        let to = registry
            .resolve(self.to)
            .map_err(|e| ProcessError::registry(&name, e))?;
        let sources = members(topology, &name, &self.from_group)?;
        let destinations = members(topology, &name, &self.to_group)?;
        let hrus = topology.hrus();

        let mut connections = Vec::new();
        for &k in sources {
            let Some(source) = hrus.get(k) else { continue };
            let candidates: Vec<usize> = destinations
                .iter()
                .copied()
                .filter(|&d| {
                    hrus.get(d)
                        .is_some_and(|h| !self.per_sub_basin || h.sub_basin == source.sub_basin)
                })
                .collect();
            match candidates.as_slice() {
                [] => continue,
                [d] if *d == k => continue,
                [d] => connections.push(LateralConnection {
                    from_hru: k,
                    from,
                    to_hru: *d,
                    to,
                }),
                many => {
                    let scope = if self.per_sub_basin {
                        format!("sub-basin {}", source.sub_basin)
                    } else {
                        format!("group '{}'", self.to_group)
                    };
                    return Err(ProcessError::AmbiguousDestination {
                        process: name,
                        scope,
                        count: many.len(),
                    });
                }
            }
        }
        self.connections = accept(&name, connections, options)?;
        Ok(())
    }

    fn connections(&self) -> &[LateralConnection] {
        &self.connections
    }

    fn exchange_rates(&self, ctx: &LateralContext<'_>, rates: &mut [f64]) {
        let dt = ctx.dt();
        for (c, r) in self.connections.iter().zip(rates.iter_mut()) {
            *r = ctx.value(c.from_hru, c.from).max(0.0) * ctx.area(c.from_hru) / dt;
        }
    }
}
