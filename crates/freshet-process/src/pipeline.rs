//! Pipeline validation and connection planning.
//!
//! [`validate_pipeline`] runs once at engine startup to check the process
//! list for structural errors and build the [`ConnectionPlan`]: a global
//! numbering of every process connection that the flux ledgers and the
//! mass-balance queries index by. [`validate_parameters`] checks every
//! participating parameter against its physical bound on every HRU the
//! process is active on.

use crate::lateral::LateralProcess;
use crate::process::{Connection, Process};
use freshet_core::constants::MAX_CONNECTIONS;
use freshet_core::{
    GlobalParams, Hru, ParamClass, ParamInfo, ProcessError, SlotIndex, StateRegistry,
};
use indexmap::IndexMap;
use std::ops::Range;
use thiserror::Error;

// ── Errors ─────────────────────────────────────────────────────────

/// Structural problems detected before the first timestep.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum PipelineError {
    /// No processes were configured.
    #[error("pipeline has no processes")]
    EmptyPipeline,
    /// Timestep is zero, negative, NaN or infinite.
    #[error("timestep must be finite and positive, got {value}")]
    InvalidTimestep {
        /// The rejected value.
        value: f64,
    },
    /// A process declares no connections.
    #[error("process '{process}' declares no connections")]
    NoConnections {
        /// Process name.
        process: String,
    },
    /// A process declares more connections than the engine supports.
    #[error("process '{process}' declares {count} connections, limit is {max}")]
    TooManyConnections {
        /// Process name.
        process: String,
        /// Declared count.
        count: usize,
        /// Limit.
        max: usize,
    },
    /// A connection endpoint lies outside the state vector.
    #[error("process '{process}' connection {connection} references slot {slot}, state vector has {len} slots")]
    SlotOutOfRange {
        /// Process name.
        process: String,
        /// Connection index.
        connection: usize,
        /// Offending slot.
        slot: SlotIndex,
        /// State-vector length.
        len: usize,
    },
}

// ── Connection plan ────────────────────────────────────────────────

/// Global numbering of every process connection.
///
/// Connection `q` of process `j` has global index `offsets[j] + q`.
#[derive(Debug, Clone)]
#[must_use]
pub struct ConnectionPlan {
    offsets: Vec<usize>,
    endpoints: Vec<Connection>,
    owners: Vec<usize>,
    /// Transfer connections grouped by receiving slot.
    inflows: IndexMap<SlotIndex, Vec<usize>>,
    /// Transfer connections grouped by giving slot.
    outflows: IndexMap<SlotIndex, Vec<usize>>,
    max_connections: usize,
}

impl ConnectionPlan {
    /// Number of processes covered.
    pub fn process_count(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    /// Total number of connections across all processes.
    pub fn total(&self) -> usize {
        self.endpoints.len()
    }

    /// Largest connection count of any single process.
    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    /// Global indices of process `j`'s connections.
    pub fn range(&self, process: usize) -> Range<usize> {
        match (self.offsets.get(process), self.offsets.get(process + 1)) {
            (Some(&a), Some(&b)) => a..b,
            _ => 0..0,
        }
    }

    /// Global index of connection `q` of process `j`.
    pub fn global_index(&self, process: usize, connection: usize) -> Option<usize> {
        let r = self.range(process);
        let js = r.start + connection;
        r.contains(&js).then_some(js)
    }

    /// Endpoints of global connection `js`.
    pub fn endpoint(&self, js: usize) -> Option<Connection> {
        self.endpoints.get(js).copied()
    }

    /// Index of the process owning global connection `js`.
    pub fn owner(&self, js: usize) -> Option<usize> {
        self.owners.get(js).copied()
    }

    /// Transfer connections that deliver into `slot`.
    pub fn inflows(&self, slot: SlotIndex) -> &[usize] {
        self.inflows.get(&slot).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Transfer connections that draw from `slot`.
    pub fn outflows(&self, slot: SlotIndex) -> &[usize] {
        self.outflows.get(&slot).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Transfer connections from `from` to `to`.
    pub fn between(&self, from: SlotIndex, to: SlotIndex) -> impl Iterator<Item = usize> + '_ {
        self.outflows(from)
            .iter()
            .copied()
            .filter(move |&js| self.endpoints[js].to == to)
    }
}

// ── Validation ─────────────────────────────────────────────────────

/// Validate a process list and build its [`ConnectionPlan`].
///
/// Checks, in order:
/// 1. The list is non-empty.
/// 2. `dt` is finite and positive.
/// 3. Every process declares between 1 and `MAX_CONNECTIONS` connections.
/// 4. Every endpoint lies inside the registry.
pub fn validate_pipeline(
    processes: &[Box<dyn Process>],
    registry: &StateRegistry,
    dt: f64,
) -> Result<ConnectionPlan, PipelineError> {
    // 1. Non-empty.
    if processes.is_empty() {
        return Err(PipelineError::EmptyPipeline);
    }

    // 2. Timestep.
    if !dt.is_finite() || dt <= 0.0 {
        return Err(PipelineError::InvalidTimestep { value: dt });
    }

    let len = registry.len();
    let mut offsets = Vec::with_capacity(processes.len() + 1);
    let mut endpoints = Vec::new();
    let mut owners = Vec::new();
    let mut inflows: IndexMap<SlotIndex, Vec<usize>> = IndexMap::new();
    let mut outflows: IndexMap<SlotIndex, Vec<usize>> = IndexMap::new();
    let mut max_connections = 0;

    for (j, p) in processes.iter().enumerate() {
        let conns = p.connections();

        // 3. Connection count.
        if conns.is_empty() {
            return Err(PipelineError::NoConnections {
                process: p.name().to_string(),
            });
        }
        if conns.len() > MAX_CONNECTIONS {
            return Err(PipelineError::TooManyConnections {
                process: p.name().to_string(),
                count: conns.len(),
                max: MAX_CONNECTIONS,
            });
        }
        max_connections = max_connections.max(conns.len());
        offsets.push(endpoints.len());

        // 4. Endpoints in range.
        for (q, c) in conns.iter().enumerate() {
            for slot in [c.from, c.to] {
                if slot.index() >= len {
                    return Err(PipelineError::SlotOutOfRange {
                        process: p.name().to_string(),
                        connection: q,
                        slot,
                        len,
                    });
                }
            }
            let js = endpoints.len();
            if !c.is_self_update() {
                inflows.entry(c.to).or_default().push(js);
                outflows.entry(c.from).or_default().push(js);
            }
            endpoints.push(*c);
            owners.push(j);
        }
    }
    offsets.push(endpoints.len());

    log::debug!(
        "pipeline validated: {} processes, {} connections over {} slots",
        processes.len(),
        endpoints.len(),
        len
    );

    Ok(ConnectionPlan {
        offsets,
        endpoints,
        owners,
        inflows,
        outflows,
        max_connections,
    })
}

fn check_value(
    process: &str,
    info: &ParamInfo,
    value: Option<f64>,
    owner: impl FnOnce() -> String,
) -> Result<(), ProcessError> {
    let value = value.ok_or_else(|| ProcessError::UnknownParameter {
        process: process.to_string(),
        param: info.name.to_string(),
        class: info.class,
    })?;
    info.bound
        .check(value)
        .map_err(|reason| ProcessError::InvalidParameter {
            process: process.to_string(),
            param: info.name.to_string(),
            owner: owner(),
            value,
            reason: reason.to_string(),
        })
}

fn check_params_on(
    process: &str,
    params: &[ParamInfo],
    hru: &Hru,
    globals: &GlobalParams,
) -> Result<(), ProcessError> {
    for info in params {
        match info.class {
            ParamClass::Global => {
                check_value(process, info, globals.param(info.name), || {
                    "global parameters".to_string()
                })?;
            }
            ParamClass::Soil => {
                for layer in &hru.soil.layers {
                    check_value(process, info, layer.class.param(info.name), || {
                        format!("soil class '{}'", layer.class.name)
                    })?;
                }
            }
            ParamClass::Surface => {
                check_value(process, info, hru.surface.param(info.name), || {
                    format!("surface class '{}'", hru.surface.name)
                })?;
            }
            ParamClass::Vegetation => {
                check_value(process, info, hru.vegetation.param(info.name), || {
                    format!("vegetation class '{}'", hru.vegetation.name)
                })?;
            }
            ParamClass::Terrain => {
                check_value(process, info, hru.terrain.param(info.name), || {
                    format!("terrain class '{}'", hru.terrain.name)
                })?;
            }
        }
    }
    Ok(())
}

/// Check every participating parameter of every process against its
/// bound, on every HRU where the process is active.
///
/// Lateral processes are checked on every HRU.
pub fn validate_parameters(
    processes: &[Box<dyn Process>],
    laterals: &[Box<dyn LateralProcess>],
    hrus: &[Hru],
    globals: &GlobalParams,
) -> Result<(), ProcessError> {
    for p in processes {
        for hru in hrus.iter().filter(|h| p.is_active(h)) {
            check_params_on(p.name(), p.participating_params(), hru, globals)?;
        }
    }
    for p in laterals {
        for hru in hrus {
            check_params_on(p.name(), p.participating_params(), hru, globals)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ProcessContext;
    use freshet_core::{HruId, HruKind, ParamBound, StateVar, SurfaceClass, SvKind};
    use std::sync::Arc;

    // ── Test processes ─────────────────────────────────────────

    struct Edges {
        name: &'static str,
        conns: Vec<Connection>,
        params: &'static [ParamInfo],
        glacier_only: bool,
    }

    impl Process for Edges {
        fn name(&self) -> &str {
            self.name
        }
        fn connections(&self) -> &[Connection] {
            &self.conns
        }
        fn participating_params(&self) -> &'static [ParamInfo] {
            self.params
        }
        fn is_active(&self, hru: &Hru) -> bool {
            !self.glacier_only || hru.kind == HruKind::Glacier
        }
        fn rates_of_change(&self, _ctx: &mut ProcessContext<'_>, _rates: &mut [f64]) {}
    }

    fn edges(name: &'static str, conns: Vec<Connection>) -> Box<dyn Process> {
        Box::new(Edges {
            name,
            conns,
            params: &[],
            glacier_only: false,
        })
    }

    fn registry() -> StateRegistry {
        let mut b = StateRegistry::builder();
        b.add(StateVar::single(SvKind::Depression)).unwrap();
        b.soil_layers(2).unwrap();
        b.build()
    }

    fn c(from: u32, to: u32) -> Connection {
        Connection::new(SlotIndex(from), SlotIndex(to))
    }

    // ── Structural checks ──────────────────────────────────────

    #[test]
    fn empty_pipeline_fails() {
        let err = validate_pipeline(&[], &registry(), 1.0).unwrap_err();
        assert_eq!(err, PipelineError::EmptyPipeline);
    }

    #[test]
    fn non_positive_timestep_fails() {
        let procs = vec![edges("a", vec![c(1, 0)])];
        for dt in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = validate_pipeline(&procs, &registry(), dt).unwrap_err();
            assert!(matches!(err, PipelineError::InvalidTimestep { .. }));
        }
    }

    #[test]
    fn process_without_connections_fails() {
        let procs = vec![edges("hollow", vec![])];
        let err = validate_pipeline(&procs, &registry(), 1.0).unwrap_err();
        assert!(matches!(err, PipelineError::NoConnections { .. }));
    }

    #[test]
    fn out_of_range_slot_fails() {
        let procs = vec![edges("stray", vec![c(1, 0), c(1, 42)])];
        let err = validate_pipeline(&procs, &registry(), 1.0).unwrap_err();
        assert_eq!(
            err,
            PipelineError::SlotOutOfRange {
                process: "stray".into(),
                connection: 1,
                slot: SlotIndex(42),
                len: 5,
            }
        );
    }

    // ── Plan ───────────────────────────────────────────────────

    #[test]
    fn plan_numbers_connections_globally() {
        let procs = vec![
            edges("a", vec![c(1, 3), c(1, 0)]),
            edges("b", vec![c(2, 2)]),
            edges("c", vec![c(1, 2), c(2, 0), c(3, 4)]),
        ];
        let plan = validate_pipeline(&procs, &registry(), 1.0).unwrap();
        assert_eq!(plan.process_count(), 3);
        assert_eq!(plan.total(), 6);
        assert_eq!(plan.max_connections(), 3);
        assert_eq!(plan.range(1), 2..3);
        assert_eq!(plan.global_index(2, 1), Some(4));
        assert_eq!(plan.global_index(1, 1), None);
        assert_eq!(plan.owner(4), Some(2));
        assert_eq!(plan.endpoint(5), Some(c(3, 4)));
        assert_eq!(plan.outflows(SlotIndex(1)), &[0, 1, 3]);
        assert_eq!(plan.inflows(SlotIndex(0)), &[1, 4]);
        // Self-updates are excluded from flow indices.
        assert_eq!(plan.inflows(SlotIndex(2)), &[3]);
        assert_eq!(plan.between(SlotIndex(1), SlotIndex(0)).collect::<Vec<_>>(), vec![1]);
    }

    // ── Parameters ─────────────────────────────────────────────

    const DEP_PARAMS: &[ParamInfo] = &[ParamInfo::new(
        "DEP_MAX",
        ParamClass::Surface,
        ParamBound::Positive,
    )];

    const BOGUS_PARAMS: &[ParamInfo] = &[ParamInfo::new(
        "NO_SUCH_THING",
        ParamClass::Surface,
        ParamBound::Finite,
    )];

    #[test]
    fn invalid_parameter_names_process_and_class() {
        let bad = Arc::new(SurfaceClass {
            name: "PAVED".into(),
            dep_max: 0.0,
            ..SurfaceClass::default()
        });
        let hrus = vec![Hru::new(HruId(1), HruKind::Standard, 5).with_surface(bad)];
        let procs: Vec<Box<dyn Process>> = vec![Box::new(Edges {
            name: "ABST_FILL",
            conns: vec![c(1, 2)],
            params: DEP_PARAMS,
            glacier_only: false,
        })];
        let err = validate_parameters(&procs, &[], &hrus, &GlobalParams::default()).unwrap_err();
        match err {
            ProcessError::InvalidParameter {
                process,
                param,
                owner,
                ..
            } => {
                assert_eq!(process, "ABST_FILL");
                assert_eq!(param, "DEP_MAX");
                assert_eq!(owner, "surface class 'PAVED'");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn inactive_hrus_are_not_checked() {
        let bad = Arc::new(SurfaceClass {
            dep_max: -1.0,
            ..SurfaceClass::default()
        });
        let hrus = vec![Hru::new(HruId(1), HruKind::Standard, 5).with_surface(bad)];
        let procs: Vec<Box<dyn Process>> = vec![Box::new(Edges {
            name: "GLACIER_ONLY",
            conns: vec![c(1, 2)],
            params: DEP_PARAMS,
            glacier_only: true,
        })];
        assert!(validate_parameters(&procs, &[], &hrus, &GlobalParams::default()).is_ok());
    }

    #[test]
    fn unknown_parameter_is_a_configuration_error() {
        let hrus = vec![Hru::new(HruId(1), HruKind::Standard, 5)];
        let procs: Vec<Box<dyn Process>> = vec![Box::new(Edges {
            name: "X",
            conns: vec![c(1, 2)],
            params: BOGUS_PARAMS,
            glacier_only: false,
        })];
        let err = validate_parameters(&procs, &[], &hrus, &GlobalParams::default()).unwrap_err();
        assert!(matches!(err, ProcessError::UnknownParameter { .. }));
    }
}
