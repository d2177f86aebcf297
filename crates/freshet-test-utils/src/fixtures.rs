//! Mock processes with predictable rates.
//!
//! - [`ConstTransfer`]: constant rate between two slots.
//! - [`LinearDrain`]: drains a fixed fraction of its source per day.
//! - [`FailingProcess`]: produces NaN after N calls.
//! - [`SeenValueProbe`]: records the source value it was shown.
//! - [`WarningProcess`]: raises one conservation warning per call.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use freshet_core::{ParamInfo, ProcessError, StateRegistry, StateVar};
use freshet_process::{Connection, Process, ProcessContext};

fn resolve(
    registry: &StateRegistry,
    name: &str,
    from: StateVar,
    to: StateVar,
) -> Result<Connection, ProcessError> {
    Connection::resolve(registry, name, from, to)
}

/// Moves `rate` per day from one slot to another. The default constraint
/// keeps the source from being overdrawn.
pub struct ConstTransfer {
    pub name: String,
    pub rate: f64,
    connections: [Connection; 1],
}

impl ConstTransfer {
    pub fn new(
        name: impl Into<String>,
        registry: &StateRegistry,
        from: StateVar,
        to: StateVar,
        rate: f64,
    ) -> Result<Self, ProcessError> {
        let name = name.into();
        let c = resolve(registry, &name, from, to)?;
        Ok(Self {
            name,
            rate,
            connections: [c],
        })
    }
}

impl Process for ConstTransfer {
    fn name(&self) -> &str {
        &self.name
    }

    fn connections(&self) -> &[Connection] {
        &self.connections
    }

    fn participating_params(&self) -> &'static [ParamInfo] {
        &[]
    }

    fn rates_of_change(&self, _ctx: &mut ProcessContext<'_>, rates: &mut [f64]) {
        rates[0] = self.rate;
    }
}

/// Moves `k·source` per day.
pub struct LinearDrain {
    pub name: String,
    pub k: f64,
    connections: [Connection; 1],
}

impl LinearDrain {
    pub fn new(
        name: impl Into<String>,
        registry: &StateRegistry,
        from: StateVar,
        to: StateVar,
        k: f64,
    ) -> Result<Self, ProcessError> {
        let name = name.into();
        let c = resolve(registry, &name, from, to)?;
        Ok(Self {
            name,
            k,
            connections: [c],
        })
    }
}

impl Process for LinearDrain {
    fn name(&self) -> &str {
        &self.name
    }

    fn connections(&self) -> &[Connection] {
        &self.connections
    }

    fn participating_params(&self) -> &'static [ParamInfo] {
        &[]
    }

    fn rates_of_change(&self, ctx: &mut ProcessContext<'_>, rates: &mut [f64]) {
        rates[0] = self.k * ctx.value(self.connections[0].from);
    }
}

/// Returns `rate` for `succeed_count` calls, then NaN.
///
/// Uses an atomic counter so it stays `Sync`.
pub struct FailingProcess {
    pub name: String,
    pub rate: f64,
    pub succeed_count: usize,
    calls: AtomicUsize,
    connections: [Connection; 1],
}

impl FailingProcess {
    pub fn new(
        name: impl Into<String>,
        registry: &StateRegistry,
        from: StateVar,
        to: StateVar,
        rate: f64,
        succeed_count: usize,
    ) -> Result<Self, ProcessError> {
        let name = name.into();
        let c = resolve(registry, &name, from, to)?;
        Ok(Self {
            name,
            rate,
            succeed_count,
            calls: AtomicUsize::new(0),
            connections: [c],
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl Process for FailingProcess {
    fn name(&self) -> &str {
        &self.name
    }

    fn connections(&self) -> &[Connection] {
        &self.connections
    }

    fn participating_params(&self) -> &'static [ParamInfo] {
        &[]
    }

    fn rates_of_change(&self, _ctx: &mut ProcessContext<'_>, rates: &mut [f64]) {
        let n = self.calls.fetch_add(1, Ordering::Relaxed);
        rates[0] = if n < self.succeed_count {
            self.rate
        } else {
            f64::NAN
        };
    }
}

/// Moves nothing, but records the value of its source slot as seen in
/// the rate context. The recorded value is shared through an atomic so
/// a test can read it after handing the probe to an engine.
pub struct SeenValueProbe {
    pub name: String,
    seen: std::sync::Arc<AtomicU64>,
    connections: [Connection; 1],
}

impl SeenValueProbe {
    /// Returns the probe and a handle to the last value it saw.
    pub fn new(
        name: impl Into<String>,
        registry: &StateRegistry,
        from: StateVar,
        to: StateVar,
    ) -> Result<(Self, std::sync::Arc<AtomicU64>), ProcessError> {
        let name = name.into();
        let c = resolve(registry, &name, from, to)?;
        let seen = std::sync::Arc::new(AtomicU64::new(0f64.to_bits()));
        Ok((
            Self {
                name,
                seen: std::sync::Arc::clone(&seen),
                connections: [c],
            },
            seen,
        ))
    }

    /// Decode a handle returned by [`SeenValueProbe::new`].
    pub fn read(handle: &AtomicU64) -> f64 {
        f64::from_bits(handle.load(Ordering::Relaxed))
    }
}

impl Process for SeenValueProbe {
    fn name(&self) -> &str {
        &self.name
    }

    fn connections(&self) -> &[Connection] {
        &self.connections
    }

    fn participating_params(&self) -> &'static [ParamInfo] {
        &[]
    }

    fn rates_of_change(&self, ctx: &mut ProcessContext<'_>, _rates: &mut [f64]) {
        let v = ctx.value(self.connections[0].from);
        self.seen.store(v.to_bits(), Ordering::Relaxed);
    }
}

/// Raises a conservation warning of `discrepancy` on every call and moves
/// nothing.
pub struct WarningProcess {
    pub discrepancy: f64,
    connections: [Connection; 1],
}

impl WarningProcess {
    pub fn new(
        registry: &StateRegistry,
        slot: StateVar,
        discrepancy: f64,
    ) -> Result<Self, ProcessError> {
        let c = resolve(registry, "warning", slot, slot)?;
        Ok(Self {
            discrepancy,
            connections: [c],
        })
    }
}

impl Process for WarningProcess {
    fn name(&self) -> &str {
        "warning"
    }

    fn connections(&self) -> &[Connection] {
        &self.connections
    }

    fn participating_params(&self) -> &'static [ParamInfo] {
        &[]
    }

    fn rates_of_change(&self, ctx: &mut ProcessContext<'_>, _rates: &mut [f64]) {
        ctx.warn_conservation("warning", self.discrepancy, "synthetic drift");
    }
}
