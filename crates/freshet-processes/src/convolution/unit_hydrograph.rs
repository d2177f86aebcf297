//! Response functions and their discretised unit hydrographs.

use super::smart::{SmartBinner, CDF_COMPLETE};
use crate::numeric::gamma_cdf;
use freshet_core::constants::{MAX_CONVOL_STORES, REAL_SMALL};

/// Upper bound on timesteps scanned while compressing a long response.
pub const MAX_SMART_STEPS: usize = 10_000;

/// A cumulative response distribution with its parameters resolved.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ResponseFunction {
    /// `(t/x4)^2.5` up to `x4`.
    Gr4j1 {
        /// Time base [d].
        x4: f64,
    },
    /// Symmetric two-branch power law over `2·x4`.
    Gr4j2 {
        /// Half time base [d].
        x4: f64,
    },
    /// Gamma distribution.
    Gamma {
        /// Shape parameter [-].
        shape: f64,
        /// Rate parameter [1/d].
        rate: f64,
    },
    /// Triangular hydrograph.
    Triangle {
        /// Time to peak [d].
        time_to_peak: f64,
        /// Time base [d].
        time_base: f64,
    },
}

impl ResponseFunction {
    /// Cumulative fraction of a pulse released by time `t` [d].
    pub fn cdf(&self, t: f64) -> f64 {
        if t <= 0.0 {
            return 0.0;
        }
        let value = match *self {
            ResponseFunction::Gr4j1 { x4 } => {
                if t >= x4 {
                    1.0
                } else {
                    (t / x4).powf(2.5)
                }
            }
            ResponseFunction::Gr4j2 { x4 } => {
                if t < x4 {
                    0.5 * (t / x4).powf(2.5)
                } else if t < 2.0 * x4 {
                    1.0 - 0.5 * (2.0 - t / x4).powf(2.5)
                } else {
                    1.0
                }
            }
            ResponseFunction::Gamma { shape, rate } => gamma_cdf(t, shape, rate),
            ResponseFunction::Triangle {
                time_to_peak: tp,
                time_base: tb,
            } => {
                if t < tp {
                    t * t / (tp * tb)
                } else if t < tb {
                    1.0 - (tb - t) * (tb - t) / (tb * (tb - tp))
                } else {
                    1.0
                }
            }
        };
        value.clamp(0.0, 1.0)
    }

    /// Time after which the CDF is exactly 1, if finite.
    pub fn horizon(&self) -> Option<f64> {
        match *self {
            ResponseFunction::Gr4j1 { x4 } => Some(x4),
            ResponseFunction::Gr4j2 { x4 } => Some(2.0 * x4),
            ResponseFunction::Triangle { time_base, .. } => Some(time_base),
            ResponseFunction::Gamma { .. } => None,
        }
    }
}

/// Discretised unit hydrograph: normalised bin weights and the number of
/// timesteps each bin spans.
#[derive(Clone, Debug, PartialEq)]
pub struct UnitHydrograph {
    weights: [f64; MAX_CONVOL_STORES],
    widths: [u32; MAX_CONVOL_STORES],
    len: usize,
}

impl UnitHydrograph {
    /// Everything released within the first timestep.
    pub fn instantaneous() -> Self {
        let mut uh = Self {
            weights: [0.0; MAX_CONVOL_STORES],
            widths: [0; MAX_CONVOL_STORES],
            len: 1,
        };
        uh.weights[0] = 1.0;
        uh.widths[0] = 1;
        uh
    }

    /// Build from raw bin weights, normalising them to sum to 1. Extra bins
    /// beyond [`MAX_CONVOL_STORES`] are ignored.
    pub fn from_bins(weights: &[f64], widths: &[u32]) -> Self {
        let len = weights.len().min(widths.len()).min(MAX_CONVOL_STORES);
        let total: f64 = weights[..len].iter().map(|w| w.max(0.0)).sum();
        if len == 0 || total <= REAL_SMALL {
            return Self::instantaneous();
        }
        let mut uh = Self {
            weights: [0.0; MAX_CONVOL_STORES],
            widths: [0; MAX_CONVOL_STORES],
            len,
        };
        for i in 0..len {
            uh.weights[i] = weights[i].max(0.0) / total;
            uh.widths[i] = widths[i].max(1);
        }
        uh
    }

    /// One bin per timestep up to the response horizon, truncated at
    /// [`MAX_CONVOL_STORES`] bins.
    pub fn fixed(response: &ResponseFunction, dt: f64) -> Self {
        let mut weights = [0.0; MAX_CONVOL_STORES];
        let widths = [1u32; MAX_CONVOL_STORES];
        let n = match response.horizon() {
            Some(h) => ((h / dt).ceil() as usize).clamp(1, MAX_CONVOL_STORES),
            None => {
                let mut n = MAX_CONVOL_STORES;
                for i in 1..=MAX_CONVOL_STORES {
                    if response.cdf(i as f64 * dt) >= CDF_COMPLETE {
                        n = i;
                        break;
                    }
                }
                n
            }
        };
        let mut previous = 0.0;
        for (i, w) in weights.iter_mut().enumerate().take(n) {
            let cdf = response.cdf((i + 1) as f64 * dt);
            *w = cdf - previous;
            previous = cdf;
        }
        Self::from_bins(&weights[..n], &widths[..n])
    }

    /// Variable-width bins, at most [`MAX_CONVOL_STORES`] of them, each
    /// closed once the CDF has advanced by `1/MAX_CONVOL_STORES`.
    pub fn smart(response: &ResponseFunction, dt: f64) -> Self {
        let mut binner = SmartBinner::new();
        for i in 1..=MAX_SMART_STEPS {
            if binner.push(response.cdf(i as f64 * dt)) {
                break;
            }
        }
        binner.finish()
    }

    /// Number of bins.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false; a unit hydrograph has at least one bin.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bin weights, summing to 1.
    pub fn weights(&self) -> &[f64] {
        &self.weights[..self.len]
    }

    /// Timesteps spanned by each bin.
    pub fn widths(&self) -> &[u32] {
        &self.widths[..self.len]
    }
}
