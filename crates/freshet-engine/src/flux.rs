//! Instantaneous and cumulative flux per connection.

/// Rate of the most recent step and running total since the start of the
/// run, one entry per connection.
///
/// For intra-HRU ledgers the index is the global connection index of the
/// [`ConnectionPlan`](freshet_process::ConnectionPlan) and amounts are in
/// mm. For lateral ledgers the index is the lateral connection index and
/// amounts are in mm·km².
#[derive(Clone, Debug, PartialEq)]
pub struct FluxLedger {
    rates: Vec<f64>,
    cumulative: Vec<f64>,
}

impl FluxLedger {
    /// A zeroed ledger of `len` connections.
    pub fn new(len: usize) -> Self {
        Self {
            rates: vec![0.0; len],
            cumulative: vec![0.0; len],
        }
    }

    /// Number of connections.
    pub fn len(&self) -> usize {
        self.rates.len()
    }

    /// Whether the ledger tracks no connections.
    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Record one step: `rates` become the current rates and `rate·dt` is
    /// added to the totals.
    pub fn record(&mut self, rates: &[f64], dt: f64) {
        debug_assert_eq!(rates.len(), self.rates.len());
        self.rates.copy_from_slice(rates);
        for (total, r) in self.cumulative.iter_mut().zip(rates) {
            *total += r * dt;
        }
    }

    /// Record a step in which nothing flowed.
    pub fn record_idle(&mut self) {
        self.rates.fill(0.0);
    }

    /// Rate of connection `i` in the most recent step.
    pub fn rate(&self, i: usize) -> Option<f64> {
        self.rates.get(i).copied()
    }

    /// Amount moved through connection `i` since the start of the run.
    pub fn cumulative(&self, i: usize) -> Option<f64> {
        self.cumulative.get(i).copied()
    }

    /// Sum of the cumulative amounts of `indices`.
    pub fn cumulative_sum(&self, indices: impl IntoIterator<Item = usize>) -> f64 {
        indices
            .into_iter()
            .filter_map(|i| self.cumulative.get(i))
            .sum()
    }

    /// Zero rates and totals.
    pub fn reset(&mut self) {
        self.rates.fill(0.0);
        self.cumulative.fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn record_accumulates_rate_times_dt() {
        let mut ledger = FluxLedger::new(2);
        ledger.record(&[2.0, 0.5], 0.5);
        ledger.record(&[4.0, 0.0], 0.5);
        assert_eq!(ledger.rate(0), Some(4.0));
        assert_relative_eq!(ledger.cumulative(0).unwrap(), 3.0);
        assert_relative_eq!(ledger.cumulative(1).unwrap(), 0.25);
        assert_relative_eq!(ledger.cumulative_sum([0, 1, 7]), 3.25);
        assert_eq!(ledger.rate(7), None);
    }

    #[test]
    fn idle_step_keeps_totals() {
        let mut ledger = FluxLedger::new(1);
        ledger.record(&[1.0], 1.0);
        ledger.record_idle();
        assert_eq!(ledger.rate(0), Some(0.0));
        assert_eq!(ledger.cumulative(0), Some(1.0));
        ledger.reset();
        assert_eq!(ledger.cumulative(0), Some(0.0));
    }
}
