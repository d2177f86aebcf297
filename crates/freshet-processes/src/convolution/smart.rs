//! Variable-width bin compression of a response CDF.

use super::unit_hydrograph::UnitHydrograph;
use freshet_core::constants::MAX_CONVOL_STORES;

/// CDF value above which the response is considered complete.
pub(crate) const CDF_COMPLETE: f64 = 1.0 - 1e-6;

/// Incremental builder of a compressed unit hydrograph.
///
/// Feed it the CDF at successive timestep ends with [`push`]; a bin is
/// closed once the CDF has advanced by at least `1/N` since the previous
/// boundary, so the number of bins never exceeds `N` however long the
/// response is. Each bin remembers how many timesteps it spans.
///
/// [`push`]: SmartBinner::push
#[derive(Clone, Debug)]
pub struct SmartBinner {
    threshold: f64,
    weights: [f64; MAX_CONVOL_STORES],
    widths: [u32; MAX_CONVOL_STORES],
    bins: usize,
    width_so_far: u32,
    boundary_cdf: f64,
    last_cdf: f64,
}

impl Default for SmartBinner {
    fn default() -> Self {
        Self::new()
    }
}

impl SmartBinner {
    /// A binner targeting [`MAX_CONVOL_STORES`] bins.
    pub fn new() -> Self {
        Self {
            threshold: 1.0 / MAX_CONVOL_STORES as f64,
            weights: [0.0; MAX_CONVOL_STORES],
            widths: [0; MAX_CONVOL_STORES],
            bins: 0,
            width_so_far: 0,
            boundary_cdf: 0.0,
            last_cdf: 0.0,
        }
    }

    /// Bins closed so far.
    pub fn bins(&self) -> usize {
        self.bins
    }

    /// Timesteps accumulated into the open bin.
    pub fn width_so_far(&self) -> u32 {
        self.width_so_far
    }

    /// Most recent CDF value pushed.
    pub fn last_cdf(&self) -> f64 {
        self.last_cdf
    }

    /// Absorb the CDF at the end of the next timestep. Returns `true` once
    /// the response is complete and further pushes would be ignored.
    pub fn push(&mut self, cdf: f64) -> bool {
        if self.is_done() {
            return true;
        }
        // A CDF never decreases; guard against round-off in the caller.
        let cdf = cdf.clamp(self.last_cdf, 1.0);
        self.width_so_far += 1;
        self.last_cdf = cdf;
        let last_bin = self.bins + 1 == MAX_CONVOL_STORES;
        let advanced = cdf - self.boundary_cdf >= self.threshold;
        if cdf >= CDF_COMPLETE || (advanced && !last_bin) {
            self.close();
        }
        self.is_done()
    }

    fn is_done(&self) -> bool {
        self.bins == MAX_CONVOL_STORES || (self.bins > 0 && self.boundary_cdf >= CDF_COMPLETE)
    }

    fn close(&mut self) {
        self.weights[self.bins] = self.last_cdf - self.boundary_cdf;
        self.widths[self.bins] = self.width_so_far;
        self.bins += 1;
        self.boundary_cdf = self.last_cdf;
        self.width_so_far = 0;
    }

    /// Close any open bin, put the untraversed tail of the CDF into the
    /// last bin and normalise.
    pub fn finish(mut self) -> UnitHydrograph {
        if self.width_so_far > 0 {
            self.close();
        }
        if self.bins == 0 {
            return UnitHydrograph::instantaneous();
        }
        let last = self.bins - 1;
        self.weights[last] += (1.0 - self.last_cdf).max(0.0);
        UnitHydrograph::from_bins(&self.weights[..self.bins], &self.widths[..self.bins])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn bin_closes_after_threshold_advance() {
        let mut b = SmartBinner::new();
        assert!(!b.push(0.005));
        assert_eq!(b.bins(), 0);
        assert_eq!(b.width_so_far(), 1);
        assert!(!b.push(0.015));
        assert_eq!(b.bins(), 0);
        assert!(!b.push(0.025));
        assert_eq!(b.bins(), 1);
        assert_eq!(b.width_so_far(), 0);
        assert_relative_eq!(b.last_cdf(), 0.025);
    }

    #[test]
    fn completion_ends_binning() {
        let mut b = SmartBinner::new();
        assert!(!b.push(0.4));
        assert!(b.push(1.0));
        assert!(b.push(1.0));
        let uh = b.finish();
        assert_eq!(uh.len(), 2);
        assert_eq!(uh.widths(), &[1, 1]);
        assert_relative_eq!(uh.weights()[0], 0.4);
        assert_relative_eq!(uh.weights()[1], 0.6);
    }

    #[test]
    fn slow_response_is_merged_into_wide_bins() {
        let mut b = SmartBinner::new();
        let mut steps = 0;
        // Linear CDF over 1000 steps.
        while steps < 1000 {
            steps += 1;
            if b.push(steps as f64 / 1000.0) {
                break;
            }
        }
        let uh = b.finish();
        assert!(uh.len() <= MAX_CONVOL_STORES);
        let total_width: u32 = uh.widths().iter().sum();
        assert_eq!(total_width as usize, steps);
        assert!(uh.widths()[0] >= 20);
        assert_relative_eq!(uh.weights().iter().sum::<f64>(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn stalled_response_puts_tail_in_last_bin() {
        let mut b = SmartBinner::new();
        let mut cdf = 0.0;
        for _ in 0..200 {
            cdf = (cdf + 0.015f64).min(0.9);
            if b.push(cdf) {
                break;
            }
        }
        let uh = b.finish();
        assert!(uh.len() <= MAX_CONVOL_STORES);
        assert_relative_eq!(uh.weights().iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        assert!(uh.weights()[uh.len() - 1] >= 0.1 - 1e-12);
    }

    #[test]
    fn bin_count_never_exceeds_store_count() {
        let mut b = SmartBinner::new();
        for i in 1..=100 {
            if b.push((i as f64 * 0.0201).min(1.0)) {
                break;
            }
        }
        let uh = b.finish();
        assert_eq!(uh.len(), MAX_CONVOL_STORES);
        assert_relative_eq!(uh.weights().iter().sum::<f64>(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn empty_binner_is_instantaneous() {
        let uh = SmartBinner::new().finish();
        assert_eq!(uh.weights(), &[1.0]);
    }
}
