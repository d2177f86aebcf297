//! Per-HRU working buffers, reused across steps.

use freshet_core::StateVector;
use freshet_process::HruAuxiliary;

/// Everything one HRU needs while its processes run.
///
/// Owned exclusively by the HRU's integration, so HRUs can be integrated
/// concurrently without sharing any buffer.
pub(crate) struct HruScratch {
    /// Running view for ordered-series integration.
    pub(crate) overlay: Vec<f64>,
    /// Accumulated signed change per slot.
    pub(crate) deltas: Vec<f64>,
    /// Next state, built from the committed state plus `deltas`. After the
    /// commit swap it holds the previous state, for rollback.
    pub(crate) next: StateVector,
    /// Rate buffer sized to the widest process.
    pub(crate) rates: Vec<f64>,
    /// Rates of the current step, by global connection index.
    pub(crate) flux: Vec<f64>,
    pub(crate) aux: HruAuxiliary,
    /// Nanoseconds spent in each process.
    pub(crate) process_ns: Vec<u64>,
    pub(crate) clipped_negative: u32,
    pub(crate) clipped_overfill: u32,
}

impl HruScratch {
    pub(crate) fn new(
        slots: usize,
        max_connections: usize,
        total_connections: usize,
        processes: usize,
    ) -> Self {
        Self {
            overlay: vec![0.0; slots],
            deltas: vec![0.0; slots],
            next: StateVector::zeros(slots),
            rates: vec![0.0; max_connections],
            flux: vec![0.0; total_connections],
            aux: HruAuxiliary::default(),
            process_ns: vec![0; processes],
            clipped_negative: 0,
            clipped_overfill: 0,
        }
    }

    /// Prepare for a new step starting from `state`.
    pub(crate) fn begin(&mut self, state: &StateVector) {
        self.overlay.copy_from_slice(state.as_slice());
        self.deltas.fill(0.0);
        self.flux.fill(0.0);
        self.aux.reset();
        self.process_ns.fill(0);
        self.clipped_negative = 0;
        self.clipped_overfill = 0;
    }
}
