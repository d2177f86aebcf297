//! The [`Process`] trait, [`Connection`] edges and the per-timestep
//! [`ProcessPhase`] state machine.

use crate::constraint;
use crate::context::ProcessContext;
use freshet_core::{Hru, ParamInfo, ProcessError, SlotIndex, StateRegistry, StateVar};
use smallvec::SmallVec;

/// A directed `(from, to)` edge between two slots of the same HRU.
///
/// When `from == to` the edge is a self-update: the rate changes a
/// non-conserved quantity (an age, an albedo, a cumulative tracker) by
/// `rate * dt` instead of moving mass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Connection {
    /// Slot that loses `rate * dt`.
    pub from: SlotIndex,
    /// Slot that gains `rate * dt`.
    pub to: SlotIndex,
}

impl Connection {
    /// Create an edge between two already-resolved slots.
    pub const fn new(from: SlotIndex, to: SlotIndex) -> Self {
        Self { from, to }
    }

    /// Resolve both endpoints against `registry`, naming `process` on failure.
    pub fn resolve(
        registry: &StateRegistry,
        process: &str,
        from: StateVar,
        to: StateVar,
    ) -> Result<Self, ProcessError> {
        let from = registry
            .resolve(from)
            .map_err(|e| ProcessError::registry(process, e))?;
        let to = registry
            .resolve(to)
            .map_err(|e| ProcessError::registry(process, e))?;
        Ok(Self { from, to })
    }

    /// A self-update edge on one slot.
    pub fn resolve_self(
        registry: &StateRegistry,
        process: &str,
        var: StateVar,
    ) -> Result<Self, ProcessError> {
        Self::resolve(registry, process, var, var)
    }

    /// Whether this edge updates a single slot rather than moving mass.
    #[inline]
    pub fn is_self_update(&self) -> bool {
        self.from == self.to
    }
}

/// Connection list of one process. Every variant declares at most a handful
/// of edges, except convolution which declares one per bin.
pub type Connections = SmallVec<[Connection; 6]>;

/// Lifecycle of one process within one HRU timestep.
///
/// `Idle -> RateComputed -> Constrained -> Committed`. A process inactive
/// for the HRU jumps straight from `Idle` to `Committed` with zero rates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProcessPhase {
    /// Nothing computed yet this timestep.
    #[default]
    Idle,
    /// `rates_of_change` has filled the rate array.
    RateComputed,
    /// `apply_constraints` has clipped the rate array.
    Constrained,
    /// Rates have been folded into the HRU's pending deltas.
    Committed,
}

impl ProcessPhase {
    /// The next phase in the normal sequence. `Committed` is terminal.
    pub fn advance(self) -> Self {
        match self {
            ProcessPhase::Idle => ProcessPhase::RateComputed,
            ProcessPhase::RateComputed => ProcessPhase::Constrained,
            ProcessPhase::Constrained | ProcessPhase::Committed => ProcessPhase::Committed,
        }
    }

    /// Short-circuit for a process that is inactive on the current HRU.
    pub fn skip(self) -> Self {
        ProcessPhase::Committed
    }
}

/// One configured hydrological algorithm.
///
/// # Contract
///
/// - The connection list is fixed at construction; `rates_of_change`
///   writes exactly `connections().len()` rates in per-day units.
/// - `rates_of_change` is a function of the context only. It must not
///   mutate state; the engine folds the rates into pending deltas.
/// - `apply_constraints` runs strictly after `rates_of_change` for the
///   same process and clips in place.
///
/// # Object safety
///
/// The engine stores processes as `Vec<Box<dyn Process>>`.
///
/// # Examples
///
/// ```
/// use freshet_core::{ParamInfo, StateRegistry, StateVar, SvKind};
/// use freshet_process::{Connection, Process, ProcessContext};
///
/// struct HalfDrain {
///     connections: [Connection; 1],
/// }
///
/// impl Process for HalfDrain {
///     fn name(&self) -> &str { "half_drain" }
///
///     fn connections(&self) -> &[Connection] { &self.connections }
///
///     fn participating_params(&self) -> &'static [ParamInfo] { &[] }
///
///     fn rates_of_change(&self, ctx: &mut ProcessContext<'_>, rates: &mut [f64]) {
///         rates[0] = 0.5 * ctx.value(self.connections[0].from) / ctx.dt();
///     }
/// }
///
/// let registry = StateRegistry::builder().build();
/// let edge = Connection::resolve(
///     &registry,
///     "half_drain",
///     StateVar::single(SvKind::PondedWater),
///     StateVar::single(SvKind::SurfaceWater),
/// )
/// .unwrap();
/// let p = HalfDrain { connections: [edge] };
/// assert_eq!(p.connections().len(), 1);
/// ```
pub trait Process: Send + Sync + 'static {
    /// Configuration name of the algorithm variant, e.g. `INF_SCS`.
    fn name(&self) -> &str;

    /// Resolved edges, fixed for the run.
    fn connections(&self) -> &[Connection];

    /// Parameters this variant reads. Used once, at assembly, to validate
    /// every HRU's class tables.
    fn participating_params(&self) -> &'static [ParamInfo];

    /// Whether the process does anything on `hru`. Inactive processes
    /// produce all-zero rates without being called.
    fn is_active(&self, _hru: &Hru) -> bool {
        true
    }

    /// One-time checks against the final registry. Default: nothing.
    fn initialize(&mut self, _registry: &StateRegistry) -> Result<(), ProcessError> {
        Ok(())
    }

    /// Fill `rates` (one per connection, per day) from the context.
    fn rates_of_change(&self, ctx: &mut ProcessContext<'_>, rates: &mut [f64]);

    /// Clip `rates` so no source is overdrawn and no bounded sink overfills.
    ///
    /// Default: scale outflows of each source so the source cannot go
    /// negative within the timestep.
    fn apply_constraints(&self, ctx: &ProcessContext<'_>, rates: &mut [f64]) {
        constraint::clip_to_sources(ctx, self.connections(), rates);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use freshet_core::{RegistryError, SvKind};

    #[test]
    fn phase_sequence_is_linear() {
        let p = ProcessPhase::default();
        assert_eq!(p, ProcessPhase::Idle);
        let p = p.advance();
        assert_eq!(p, ProcessPhase::RateComputed);
        let p = p.advance();
        assert_eq!(p, ProcessPhase::Constrained);
        let p = p.advance();
        assert_eq!(p, ProcessPhase::Committed);
        assert_eq!(p.advance(), ProcessPhase::Committed);
        assert_eq!(ProcessPhase::Idle.skip(), ProcessPhase::Committed);
    }

    #[test]
    fn resolve_reports_missing_slot_with_process_name() {
        let registry = StateRegistry::builder().build();
        let err = Connection::resolve(
            &registry,
            "SEEP_LINEAR",
            StateVar::single(SvKind::Depression),
            StateVar::new(SvKind::Soil, 1),
        )
        .unwrap_err();
        match err {
            ProcessError::Registry { process, source } => {
                assert_eq!(process, "SEEP_LINEAR");
                assert!(matches!(source, RegistryError::Unregistered { .. }));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn self_update_detection() {
        let c = Connection::new(SlotIndex(3), SlotIndex(3));
        assert!(c.is_self_update());
        assert!(!Connection::new(SlotIndex(3), SlotIndex(4)).is_self_update());
    }
}
