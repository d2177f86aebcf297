//! [`ProcessContext`]: everything a rate routine may read for one HRU
//! timestep, plus the per-HRU auxiliary channel.

use freshet_core::{
    ConservationWarning, GlobalParams, Hru, ModelOptions, SimTime, SlotIndex, StateRegistry,
};

/// Per-HRU values published by one process for another within the same
/// timestep. Reset by the engine before every step.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HruAuxiliary {
    /// Effective impermeable fraction `b2` computed by UBC infiltration and
    /// consumed by UBC glacier infiltration. `None` until published.
    pub ubc_effective_impermeable_frac: Option<f64>,
    warnings: Vec<ConservationWarning>,
}

impl HruAuxiliary {
    /// Clear published values. Keeps the warning buffer's allocation.
    pub fn reset(&mut self) {
        self.ubc_effective_impermeable_frac = None;
        self.warnings.clear();
    }

    /// Warnings raised during the current step.
    pub fn warnings(&self) -> &[ConservationWarning] {
        &self.warnings
    }

    /// Move the warnings out, leaving the buffer empty.
    pub fn drain_warnings(&mut self) -> impl Iterator<Item = ConservationWarning> + '_ {
        self.warnings.drain(..)
    }
}

/// Read context handed to [`Process`](crate::Process) rate and constraint
/// routines for one HRU.
///
/// `state` is the view selected by the numerical method: the running
/// overlay for ordered-series integration, or the start-of-step state for
/// Euler integration.
pub struct ProcessContext<'a> {
    state: &'a [f64],
    hru: &'a Hru,
    registry: &'a StateRegistry,
    options: &'a ModelOptions,
    params: &'a GlobalParams,
    time: SimTime,
    aux: &'a mut HruAuxiliary,
}

impl<'a> ProcessContext<'a> {
    /// Construct a context. Called by the engine once per process per HRU.
    pub fn new(
        state: &'a [f64],
        hru: &'a Hru,
        registry: &'a StateRegistry,
        options: &'a ModelOptions,
        params: &'a GlobalParams,
        time: SimTime,
        aux: &'a mut HruAuxiliary,
    ) -> Self {
        Self {
            state,
            hru,
            registry,
            options,
            params,
            time,
            aux,
        }
    }

    /// Current value of `slot`.
    ///
    /// Slots come from connections validated at assembly, so an
    /// out-of-range slot reads as zero rather than panicking.
    #[inline]
    pub fn value(&self, slot: SlotIndex) -> f64 {
        self.state.get(slot.index()).copied().unwrap_or(0.0)
    }

    /// Whole state view.
    pub fn state(&self) -> &[f64] {
        self.state
    }

    /// The HRU being integrated.
    pub fn hru(&self) -> &Hru {
        self.hru
    }

    /// Slot registry.
    pub fn registry(&self) -> &StateRegistry {
        self.registry
    }

    /// Run options.
    pub fn options(&self) -> &ModelOptions {
        self.options
    }

    /// Global parameters.
    pub fn params(&self) -> &GlobalParams {
        self.params
    }

    /// Current simulation time.
    pub fn time(&self) -> SimTime {
        self.time
    }

    /// Timestep length [d].
    #[inline]
    pub fn dt(&self) -> f64 {
        self.options.timestep
    }

    /// Dynamic capacity of the storage at `slot`, or `None` if unbounded.
    pub fn capacity(&self, slot: SlotIndex) -> Option<f64> {
        self.registry
            .var_of(slot)
            .and_then(|var| self.hru.storage_capacity(var))
    }

    /// Values published earlier this timestep for this HRU.
    pub fn aux(&self) -> &HruAuxiliary {
        &*self.aux
    }

    /// Publish values for later processes of the same HRU.
    pub fn aux_mut(&mut self) -> &mut HruAuxiliary {
        &mut *self.aux
    }

    /// Record a soft conservation warning and log it.
    pub fn warn_conservation(&mut self, process: &str, discrepancy: f64, detail: &str) {
        let warning = ConservationWarning {
            process: process.to_string(),
            hru: self.hru.id,
            discrepancy,
            detail: detail.to_string(),
        };
        log::warn!("{warning}");
        self.aux.warnings.push(warning);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use freshet_core::{HruId, HruKind, StateVar, SvKind};

    #[test]
    fn capacity_follows_registry_kind() {
        let mut b = StateRegistry::builder();
        b.add(StateVar::single(SvKind::Depression)).unwrap();
        let reg = b.build();
        let hru = Hru::new(HruId(0), HruKind::Standard, reg.len());
        let opts = ModelOptions::default();
        let params = GlobalParams::default();
        let mut aux = HruAuxiliary::default();
        let state = vec![0.0; reg.len()];
        let ctx = ProcessContext::new(
            &state,
            &hru,
            &reg,
            &opts,
            &params,
            SimTime::default(),
            &mut aux,
        );
        let dep = reg.lookup(SvKind::Depression, 0).unwrap();
        assert_eq!(ctx.capacity(dep), Some(hru.surface.dep_max));
        let sw = reg.lookup(SvKind::SurfaceWater, 0).unwrap();
        assert_eq!(ctx.capacity(sw), None);
        assert_eq!(ctx.value(SlotIndex(99)), 0.0);
    }

    #[test]
    fn warnings_collect_and_reset() {
        let reg = StateRegistry::builder().build();
        let hru = Hru::new(HruId(5), HruKind::Standard, reg.len());
        let opts = ModelOptions::default();
        let params = GlobalParams::default();
        let mut aux = HruAuxiliary::default();
        let state = vec![0.0; reg.len()];
        {
            let mut ctx = ProcessContext::new(
                &state,
                &hru,
                &reg,
                &opts,
                &params,
                SimTime::default(),
                &mut aux,
            );
            ctx.aux_mut().ubc_effective_impermeable_frac = Some(0.4);
            ctx.warn_conservation("TEST", 1e-3, "drift");
        }
        assert_eq!(aux.warnings().len(), 1);
        assert_eq!(aux.warnings()[0].hru, HruId(5));
        aux.reset();
        assert!(aux.warnings().is_empty());
        assert_eq!(aux.ubc_effective_impermeable_frac, None);
    }
}
