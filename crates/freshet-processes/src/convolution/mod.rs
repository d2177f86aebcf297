//! Convolution routing: delay and disperse water through a discretised
//! unit hydrograph.
//!
//! Each convolution instance `c` owns an aggregate store `CONVOLUTION[c]`
//! and a ring of sub-stores `CONV_STOR[c·N .. c·N + N]` (with
//! `N = MAX_CONVOL_STORES`) tracking water in transit by age. Upstream
//! processes add water to the aggregate only; at the start of each step
//! the difference between the aggregate and the sub-store total is the
//! new input pulse.
//!
//! Connection 0 releases from the aggregate to the configured target.
//! Connections `1..=N` are self-updates of the sub-stores, so the
//! sub-stores never count toward the water balance twice.

mod smart;
mod unit_hydrograph;

pub use smart::SmartBinner;
pub use unit_hydrograph::{ResponseFunction, UnitHydrograph, MAX_SMART_STEPS};

use crate::wiring::connect;
use freshet_core::constants::{MAX_CONVOL_STORES, REAL_SMALL};
use freshet_core::{
    ParamBound, ParamClass, ParamInfo, ProcessError, StateRegistry, StateVar, SurfaceClass,
    SvKind,
};
use freshet_process::{Connection, Connections, Process, ProcessContext};
use serde::{Deserialize, Serialize};

/// Response function family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConvolutionType {
    /// GR4J unit hydrograph 1.
    Gr4j1,
    /// GR4J unit hydrograph 2.
    Gr4j2,
    /// Gamma distribution, first parameter set.
    Gamma,
    /// Gamma distribution, second parameter set.
    Gamma2,
    /// Triangular.
    Triangle,
}

const GR4J_PARAMS: &[ParamInfo] = &[ParamInfo::new(
    "GR4J_X4",
    ParamClass::Surface,
    ParamBound::Positive,
)];
const GAMMA_PARAMS: &[ParamInfo] = &[
    ParamInfo::new("GAMMA_SHAPE", ParamClass::Surface, ParamBound::Positive),
    ParamInfo::new("GAMMA_SCALE", ParamClass::Surface, ParamBound::Positive),
];
const GAMMA2_PARAMS: &[ParamInfo] = &[
    ParamInfo::new("GAMMA_SHAPE2", ParamClass::Surface, ParamBound::Positive),
    ParamInfo::new("GAMMA_SCALE2", ParamClass::Surface, ParamBound::Positive),
];
const TRIANGLE_PARAMS: &[ParamInfo] = &[
    ParamInfo::new("TRI_TIME_TO_PEAK", ParamClass::Surface, ParamBound::Positive),
    ParamInfo::new("TRI_TIME_BASE", ParamClass::Surface, ParamBound::Positive),
];

impl ConvolutionType {
    /// Configuration name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Gr4j1 => "CONVOL_GR4J_1",
            Self::Gr4j2 => "CONVOL_GR4J_2",
            Self::Gamma => "CONVOL_GAMMA",
            Self::Gamma2 => "CONVOL_GAMMA_2",
            Self::Triangle => "CONVOL_TRIANGLE",
        }
    }

    /// Parameters read from the surface class.
    pub fn params(self) -> &'static [ParamInfo] {
        match self {
            Self::Gr4j1 | Self::Gr4j2 => GR4J_PARAMS,
            Self::Gamma => GAMMA_PARAMS,
            Self::Gamma2 => GAMMA2_PARAMS,
            Self::Triangle => TRIANGLE_PARAMS,
        }
    }

    /// The response function for one HRU's surface class.
    pub fn response(self, surface: &SurfaceClass) -> ResponseFunction {
        match self {
            Self::Gr4j1 => ResponseFunction::Gr4j1 {
                x4: surface.gr4j_x4,
            },
            Self::Gr4j2 => ResponseFunction::Gr4j2 {
                x4: surface.gr4j_x4,
            },
            Self::Gamma => ResponseFunction::Gamma {
                shape: surface.gamma_shape,
                rate: surface.gamma_scale,
            },
            Self::Gamma2 => ResponseFunction::Gamma {
                shape: surface.gamma_shape2,
                rate: surface.gamma_scale2,
            },
            Self::Triangle => ResponseFunction::Triangle {
                time_to_peak: surface.tri_time_to_peak,
                time_base: surface.tri_time_base,
            },
        }
    }
}

/// How the unit hydrograph is discretised.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConvolutionMode {
    /// One bin per timestep, truncated at the store count.
    #[default]
    Fixed,
    /// Variable-width bins covering the whole response.
    Smart,
}

/// State variables instance `index` needs registered: the aggregate and
/// its full ring of sub-stores.
pub fn convolution_state_vars(index: usize) -> impl Iterator<Item = StateVar> {
    std::iter::once(StateVar::new(SvKind::Convolution, index)).chain(
        (0..MAX_CONVOL_STORES)
            .map(move |i| StateVar::new(SvKind::ConvStor, index * MAX_CONVOL_STORES + i)),
    )
}

/// One convolution routing instance.
#[derive(Debug)]
pub struct Convolution {
    kind: ConvolutionType,
    mode: ConvolutionMode,
    connections: Connections,
}

impl Convolution {
    /// Wire instance `index`, releasing into `target`.
    pub fn new(
        kind: ConvolutionType,
        mode: ConvolutionMode,
        index: usize,
        target: StateVar,
        registry: &StateRegistry,
    ) -> Result<Self, ProcessError> {
        let aggregate = StateVar::new(SvKind::Convolution, index);
        let mut pairs = Vec::with_capacity(MAX_CONVOL_STORES + 1);
        pairs.push((aggregate, target));
        for i in 0..MAX_CONVOL_STORES {
            let store = StateVar::new(SvKind::ConvStor, index * MAX_CONVOL_STORES + i);
            pairs.push((store, store));
        }
        Ok(Self {
            kind,
            mode,
            connections: connect(registry, kind.name(), &pairs)?,
        })
    }

    /// Response function family.
    pub fn kind(&self) -> ConvolutionType {
        self.kind
    }

    /// Discretisation mode.
    pub fn mode(&self) -> ConvolutionMode {
        self.mode
    }

    /// The unit hydrograph for a surface class at timestep `dt`.
    pub fn unit_hydrograph(&self, surface: &SurfaceClass, dt: f64) -> UnitHydrograph {
        let response = self.kind.response(surface);
        match self.mode {
            ConvolutionMode::Fixed => UnitHydrograph::fixed(&response, dt),
            ConvolutionMode::Smart => UnitHydrograph::smart(&response, dt),
        }
    }
}

impl Process for Convolution {
    fn name(&self) -> &str {
        self.kind.name()
    }

    fn connections(&self) -> &[Connection] {
        &self.connections
    }

    fn participating_params(&self) -> &'static [ParamInfo] {
        self.kind.params()
    }

    fn rates_of_change(&self, ctx: &mut ProcessContext<'_>, rates: &mut [f64]) {
        let dt = ctx.dt();
        let uh = self.unit_hydrograph(&ctx.hru().surface, dt);
        let n = uh.len();

        let aggregate = ctx.value(self.connections[0].from).max(0.0);
        let mut stores = [0.0; MAX_CONVOL_STORES];
        for (s, c) in stores.iter_mut().zip(&self.connections[1..]) {
            *s = ctx.value(c.from).max(0.0);
        }
        let before = stores;

        // Stores past the current horizon fold into the last bin.
        let stranded: f64 = stores[n..].iter().sum();
        stores[n..].fill(0.0);
        stores[n - 1] += stranded;

        let in_transit: f64 = stores.iter().sum();
        let input = aggregate - in_transit;
        if input < -ctx.options().conservation_tolerance {
            ctx.warn_conservation(
                self.kind.name(),
                input,
                "CONVOLUTION aggregate below sum of CONV_STOR",
            );
            let scale = if in_transit > REAL_SMALL {
                aggregate / in_transit
            } else {
                0.0
            };
            stores.iter_mut().for_each(|s| *s *= scale);
        }
        stores[0] += input.max(0.0);

        let weights = uh.weights();
        let widths = uh.widths();
        let mut released = 0.0;
        let mut cumulative = 0.0;
        for i in 0..n {
            let width = f64::from(widths[i]);
            let remaining = 1.0 - cumulative;
            let fraction = if remaining > REAL_SMALL {
                (weights[i] / width / remaining).min(1.0)
            } else {
                1.0
            };
            let r = stores[i] * fraction;
            stores[i] -= r;
            released += r;
            cumulative += weights[i];
        }
        // Shift from the far end so no bin moves twice.
        for i in (0..n.saturating_sub(1)).rev() {
            let shift = stores[i] / f64::from(widths[i]);
            stores[i] -= shift;
            stores[i + 1] += shift;
        }

        rates[0] = released / dt;
        for (i, r) in rates[1..].iter_mut().enumerate() {
            *r = (stores[i] - before[i]) / dt;
        }
    }
}
