//! Lateral exchange variants: mass moved between HRUs after every HRU
//! has committed its own processes.

mod equilibrate;
mod flush;

pub use equilibrate::LateralEquilibrate;
pub use flush::LateralFlush;

use freshet_core::{ModelOptions, ProcessError};
use freshet_process::{HruTopology, LateralConnection};

/// Members of `group`, or [`ProcessError::UnknownGroup`].
fn members<'a>(
    topology: &HruTopology<'a>,
    process: &str,
    group: &str,
) -> Result<&'a [usize], ProcessError> {
    topology
        .group(group)
        .ok_or_else(|| ProcessError::UnknownGroup {
            process: process.to_string(),
            group: group.to_string(),
        })
}

/// Accept a resolved connection list. An empty list is a warning, or an
/// error under strict lateral exchange.
fn accept(
    process: &str,
    connections: Vec<LateralConnection>,
    options: &ModelOptions,
) -> Result<Vec<LateralConnection>, ProcessError> {
    if connections.is_empty() {
        if options.strict_lateral_exchange {
            return Err(ProcessError::NoLateralConnections {
                process: process.to_string(),
            });
        }
        log::warn!("lateral process '{process}': no lateral connections resolved");
    } else {
        log::debug!(
            "lateral process '{process}': {} connections",
            connections.len()
        );
    }
    Ok(connections)
}

#[cfg(test)]
pub(crate) mod fixture {
    use freshet_core::{
        GlobalParams, Hru, HruId, HruKind, ModelOptions, SimTime, StateRegistry, StateVar,
        SubBasinId, SvKind,
    };
    use freshet_process::{HruTopology, LateralContext, LateralProcess};
    use indexmap::IndexMap;

    pub(crate) struct Basin {
        pub registry: StateRegistry,
        pub hrus: Vec<Hru>,
        pub groups: IndexMap<String, Vec<usize>>,
        pub options: ModelOptions,
    }

    impl Basin {
        /// HRUs with `(area, sub-basin)`; every HRU registers DEPRESSION.
        pub fn new(layout: &[(f64, u32)]) -> Self {
            let mut b = StateRegistry::builder();
            b.add(StateVar::single(SvKind::Depression)).unwrap();
            let registry = b.build();
            let hrus = layout
                .iter()
                .enumerate()
                .map(|(k, &(area, sb))| {
                    Hru::new(HruId(k as u32), HruKind::Standard, registry.len())
                        .with_area(area)
                        .with_sub_basin(SubBasinId(sb))
                })
                .collect();
            Self {
                registry,
                hrus,
                groups: IndexMap::new(),
                options: ModelOptions::default(),
            }
        }

        pub fn group(mut self, name: &str, members: &[usize]) -> Self {
            self.groups.insert(name.to_string(), members.to_vec());
            self
        }

        pub fn set(&mut self, k: usize, kind: SvKind, value: f64) {
            let slot = self.registry.lookup(kind, 0).unwrap();
            self.hrus[k].state_mut().set(slot, value);
        }

        pub fn init(&self, p: &mut dyn LateralProcess) -> Result<(), freshet_core::ProcessError> {
            let topology = HruTopology::new(&self.hrus, &self.groups, &self.registry);
            p.initialize(&topology, &self.options)
        }

        pub fn rates(&self, p: &dyn LateralProcess) -> Vec<f64> {
            let params = GlobalParams::default();
            let ctx = LateralContext::new(
                &self.hrus,
                &self.registry,
                &self.options,
                &params,
                SimTime::default(),
            );
            let mut rates = vec![0.0; p.connections().len()];
            p.exchange_rates(&ctx, &mut rates);
            p.apply_constraints(&ctx, &mut rates);
            rates
        }
    }
}
