//! Per-step performance and clipping metrics.

/// Timing and clipping counters for one timestep.
///
/// Durations are in microseconds. Process timings are summed over all
/// HRUs the process ran on.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StepMetrics {
    /// Wall-clock time for the whole step.
    pub total_us: u64,
    /// Per-process time: `(name, microseconds)`, in pipeline order.
    pub process_us: Vec<(String, u64)>,
    /// Time spent in the lateral exchange pass.
    pub lateral_us: u64,
    /// Slots clamped back to zero after commit.
    pub clipped_negative: u32,
    /// Soil slots clamped back to capacity after commit.
    pub clipped_overfill: u32,
    /// HRUs integrated (enabled HRUs).
    pub hrus_updated: u32,
}

impl StepMetrics {
    /// Total time attributed to processes.
    pub fn process_total_us(&self) -> u64 {
        self.process_us.iter().map(|(_, us)| us).sum()
    }
}
