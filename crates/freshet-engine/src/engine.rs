//! The integration loop.
//!
//! [`Engine`] owns the HRUs, the process pipeline, the scratch buffers
//! and the flux ledgers. A step has three phases:
//!
//! 1. **HRU pass.** Every enabled HRU runs every process in pipeline
//!    order into its own scratch buffers. HRUs share nothing mutable,
//!    so with the `parallel` feature this pass runs on rayon.
//! 2. **Commit.** Once every HRU has succeeded, each HRU's next state is
//!    swapped in. The previous state stays in scratch for rollback.
//! 3. **Lateral pass.** Lateral processes run serially over the
//!    committed states of all HRUs.
//!
//! A non-finite rate anywhere aborts the step and leaves every HRU state
//! as it was before the step began.

use std::fmt;
use std::time::Instant;

use freshet_core::{
    AccessError, ConservationWarning, Forcing, GlobalParams, Hru, ModelOptions, NumericalMethod,
    SimTime, SlotIndex, StateRegistry, StateVector, StepError, StepId, SvKind,
};
use freshet_process::{
    validate_pipeline, ConnectionPlan, HruTopology, LateralConnection, LateralContext,
    LateralProcess, Process, ProcessContext, ProcessPhase,
};

use crate::config::{ConfigError, ModelConfig};
use crate::flux::FluxLedger;
use crate::metrics::StepMetrics;
use crate::scratch::HruScratch;

// ── StepReport ─────────────────────────────────────────────────────

/// Outcome of a successful [`Engine::step()`].
#[derive(Clone, Debug, PartialEq)]
pub struct StepReport {
    /// Id of the step just completed. The first step is `StepId(1)`.
    pub step: StepId,
    /// Timings and clip counts.
    pub metrics: StepMetrics,
    /// Soft mass-balance diagnostics raised during the step.
    pub warnings: Vec<ConservationWarning>,
}

// ── HRU pass ───────────────────────────────────────────────────────

/// Read-only inputs shared by every HRU integration in one step.
struct HruPass<'a> {
    processes: &'a [Box<dyn Process>],
    plan: &'a ConnectionPlan,
    registry: &'a StateRegistry,
    options: &'a ModelOptions,
    params: &'a GlobalParams,
    soil_slots: &'a [(SlotIndex, usize)],
    time: SimTime,
}

/// Run every process on one HRU, leaving the next state in `s.next`.
fn integrate(pass: &HruPass<'_>, hru: &Hru, s: &mut HruScratch) -> Result<(), StepError> {
    s.begin(hru.state());
    let dt = pass.options.timestep;

    for (j, process) in pass.processes.iter().enumerate() {
        let mut phase = ProcessPhase::Idle;
        if !process.is_active(hru) {
            phase = phase.skip();
            debug_assert_eq!(phase, ProcessPhase::Committed);
            continue;
        }

        let start = Instant::now();
        let range = pass.plan.range(j);
        let rates = &mut s.rates[..range.len()];
        rates.fill(0.0);
        {
            let view: &[f64] = match pass.options.method {
                NumericalMethod::OrderedSeries => &s.overlay,
                NumericalMethod::Euler => hru.state().as_slice(),
            };
            let mut ctx = ProcessContext::new(
                view,
                hru,
                pass.registry,
                pass.options,
                pass.params,
                pass.time,
                &mut s.aux,
            );
            process.rates_of_change(&mut ctx, rates);
            phase = phase.advance();
            // Clipping through min/max would turn NaN into a finite rate.
            check_finite(&**process, hru, rates)?;
            process.apply_constraints(&ctx, rates);
            phase = phase.advance();
        }
        check_finite(&**process, hru, rates)?;
        log::trace!("{} on HRU {}: {:?}", process.name(), hru.id, rates);

        for (c, &r) in process.connections().iter().zip(rates.iter()) {
            let amount = r * dt;
            if !c.is_self_update() {
                s.deltas[c.from.index()] -= amount;
                s.overlay[c.from.index()] -= amount;
            }
            s.deltas[c.to.index()] += amount;
            s.overlay[c.to.index()] += amount;
        }
        s.flux[range].copy_from_slice(rates);
        phase = phase.advance();
        debug_assert_eq!(phase, ProcessPhase::Committed);
        s.process_ns[j] += start.elapsed().as_nanos() as u64;
    }

    s.next.copy_from(hru.state());
    s.next.commit(&s.deltas);
    s.clipped_negative = s.next.clamp_non_negative();
    if !pass.options.allow_soil_overfill {
        for &(slot, m) in pass.soil_slots {
            if hru.soil_class(m).is_none() {
                continue;
            }
            let cap = hru.soil_capacity(m);
            if s.next.get(slot).is_some_and(|v| v > cap) {
                s.next.set(slot, cap);
                s.clipped_overfill += 1;
            }
        }
    }
    Ok(())
}

fn check_finite(process: &dyn Process, hru: &Hru, rates: &[f64]) -> Result<(), StepError> {
    match rates.iter().enumerate().find(|(_, r)| !r.is_finite()) {
        Some((connection, &value)) => Err(StepError::NonFiniteRate {
            process: process.name().to_string(),
            hru: hru.id,
            connection,
            value,
        }),
        None => Ok(()),
    }
}

fn check_finite_lateral(lateral: &dyn LateralProcess, rates: &[f64]) -> Result<(), StepError> {
    match rates.iter().enumerate().find(|(_, r)| !r.is_finite()) {
        Some((connection, &value)) => Err(StepError::NonFiniteLateralRate {
            process: lateral.name().to_string(),
            connection,
            value,
        }),
        None => Ok(()),
    }
}

/// Add `volume` [mm·km²] to `slot` of HRU `k` as a depth. Returns whether
/// the result had to be clamped at zero.
fn shift_volume(hrus: &mut [Hru], k: usize, slot: SlotIndex, volume: f64) -> bool {
    let Some(hru) = hrus.get_mut(k) else {
        return false;
    };
    let depth = volume / hru.area;
    let Some(v) = hru.state().get(slot) else {
        return false;
    };
    let updated = v + depth;
    hru.state_mut().set(slot, updated.max(0.0));
    updated < 0.0
}

// ── Engine ─────────────────────────────────────────────────────────

/// Single-model integration engine.
///
/// Owns all simulation state and executes steps synchronously. State is
/// read and written between steps through the accessors; nothing can
/// touch it mid-step.
pub struct Engine {
    registry: StateRegistry,
    hrus: Vec<Hru>,
    processes: Vec<Box<dyn Process>>,
    laterals: Vec<Box<dyn LateralProcess>>,
    plan: ConnectionPlan,
    options: ModelOptions,
    params: GlobalParams,
    soil_slots: Vec<(SlotIndex, usize)>,
    initial_states: Vec<StateVector>,
    scratch: Vec<HruScratch>,
    ledgers: Vec<FluxLedger>,
    lateral_rates: Vec<Vec<f64>>,
    lateral_ledgers: Vec<FluxLedger>,
    current_step: StepId,
    last_metrics: StepMetrics,
}

impl Engine {
    /// Assemble an engine from a [`ModelConfig`].
    ///
    /// Validates the configuration, initialises every process against the
    /// registry, builds the connection plan and resolves lateral
    /// topology. Consumes the config.
    pub fn new(config: ModelConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let ModelConfig {
            registry,
            hrus,
            groups,
            mut processes,
            mut laterals,
            options,
            params,
        } = config;

        for process in &mut processes {
            process.initialize(&registry)?;
        }
        let plan = validate_pipeline(&processes, &registry, options.timestep)?;

        {
            let topology = HruTopology::new(&hrus, &groups, &registry);
            for lateral in &mut laterals {
                lateral.initialize(&topology, &options)?;
            }
        }

        let soil_slots: Vec<(SlotIndex, usize)> = (0..registry.layer_count(SvKind::Soil))
            .filter_map(|m| registry.lookup(SvKind::Soil, m).map(|slot| (slot, m)))
            .collect();
        let initial_states = hrus.iter().map(|h| h.state().clone()).collect();
        let scratch = hrus
            .iter()
            .map(|_| {
                HruScratch::new(
                    registry.len(),
                    plan.max_connections(),
                    plan.total(),
                    processes.len(),
                )
            })
            .collect();
        let ledgers = hrus.iter().map(|_| FluxLedger::new(plan.total())).collect();
        let lateral_rates: Vec<Vec<f64>> = laterals
            .iter()
            .map(|l| vec![0.0; l.connections().len()])
            .collect();
        let lateral_ledgers = lateral_rates
            .iter()
            .map(|r| FluxLedger::new(r.len()))
            .collect();

        log::debug!(
            "assembled {} HRUs, {} slots, {} processes ({} connections), {} lateral processes",
            hrus.len(),
            registry.len(),
            processes.len(),
            plan.total(),
            laterals.len()
        );

        Ok(Self {
            registry,
            hrus,
            processes,
            laterals,
            plan,
            options,
            params,
            soil_slots,
            initial_states,
            scratch,
            ledgers,
            lateral_rates,
            lateral_ledgers,
            current_step: StepId(0),
            last_metrics: StepMetrics::default(),
        })
    }

    /// Advance the model by one timestep.
    ///
    /// On error no HRU state, ledger or step counter changes. With the
    /// `parallel` feature, which of several failing HRUs is reported is
    /// unspecified.
    pub fn step(&mut self, time: SimTime) -> Result<StepReport, StepError> {
        let step_start = Instant::now();
        let dt = self.options.timestep;
        let next = StepId(self.current_step.0 + 1);

        // 1. HRU pass into scratch.
        {
            let pass = HruPass {
                processes: &self.processes,
                plan: &self.plan,
                registry: &self.registry,
                options: &self.options,
                params: &self.params,
                soil_slots: &self.soil_slots,
                time,
            };
            #[cfg(feature = "parallel")]
            {
                use rayon::prelude::*;
                self.hrus
                    .par_iter()
                    .zip(self.scratch.par_iter_mut())
                    .filter(|(h, _)| h.enabled)
                    .try_for_each(|(h, s)| integrate(&pass, h, s))?;
            }
            #[cfg(not(feature = "parallel"))]
            {
                self.hrus
                    .iter()
                    .zip(self.scratch.iter_mut())
                    .filter(|(h, _)| h.enabled)
                    .try_for_each(|(h, s)| integrate(&pass, h, s))?;
            }
        }

        // 2. Commit. Afterwards every scratch holds its HRU's prior state.
        let mut clipped_negative = 0;
        let mut clipped_overfill = 0;
        let mut hrus_updated = 0;
        for (hru, s) in self.hrus.iter_mut().zip(self.scratch.iter_mut()) {
            if hru.enabled {
                std::mem::swap(hru.state_mut(), &mut s.next);
                clipped_negative += s.clipped_negative;
                clipped_overfill += s.clipped_overfill;
                hrus_updated += 1;
            } else {
                s.next.copy_from(hru.state());
            }
        }

        // 3. Lateral pass.
        let lateral_start = Instant::now();
        match self.exchange(time) {
            Ok(clamped) => clipped_negative += clamped,
            Err(e) => {
                for (hru, s) in self.hrus.iter_mut().zip(self.scratch.iter_mut()) {
                    std::mem::swap(hru.state_mut(), &mut s.next);
                }
                return Err(e);
            }
        }
        let lateral_us = lateral_start.elapsed().as_micros() as u64;

        // 4. Ledgers and warnings.
        let mut warnings = Vec::new();
        let mut process_ns = vec![0u64; self.processes.len()];
        for ((hru, s), ledger) in self
            .hrus
            .iter()
            .zip(self.scratch.iter_mut())
            .zip(self.ledgers.iter_mut())
        {
            if hru.enabled {
                ledger.record(&s.flux, dt);
                warnings.extend(s.aux.drain_warnings());
                for (total, ns) in process_ns.iter_mut().zip(&s.process_ns) {
                    *total += ns;
                }
            } else {
                ledger.record_idle();
            }
        }
        for (ledger, rates) in self.lateral_ledgers.iter_mut().zip(&self.lateral_rates) {
            ledger.record(rates, dt);
        }
        if clipped_negative + clipped_overfill > 0 {
            log::debug!(
                "step {next}: clipped {clipped_negative} negative and {clipped_overfill} overfilled slots"
            );
        }

        // 5. Metrics.
        let metrics = StepMetrics {
            total_us: step_start.elapsed().as_micros() as u64,
            process_us: self
                .processes
                .iter()
                .zip(&process_ns)
                .map(|(p, ns)| (p.name().to_string(), ns / 1_000))
                .collect(),
            lateral_us,
            clipped_negative,
            clipped_overfill,
            hrus_updated,
        };
        self.current_step = next;
        self.last_metrics = metrics.clone();

        Ok(StepReport {
            step: next,
            metrics,
            warnings,
        })
    }

    /// Run every lateral process in order over the committed states.
    /// Returns how many storages had to be clamped at zero.
    fn exchange(&mut self, time: SimTime) -> Result<u32, StepError> {
        let dt = self.options.timestep;
        let mut clamped = 0;
        for (lateral, rates) in self.laterals.iter().zip(self.lateral_rates.iter_mut()) {
            rates.fill(0.0);
            {
                let ctx = LateralContext::new(
                    &self.hrus,
                    &self.registry,
                    &self.options,
                    &self.params,
                    time,
                );
                lateral.exchange_rates(&ctx, rates);
                check_finite_lateral(&**lateral, rates)?;
                lateral.apply_constraints(&ctx, rates);
            }
            check_finite_lateral(&**lateral, rates)?;
            for (c, &r) in lateral.connections().iter().zip(rates.iter()) {
                let volume = r * dt;
                if volume == 0.0 {
                    continue;
                }
                for (k, slot, v) in [(c.from_hru, c.from, -volume), (c.to_hru, c.to, volume)] {
                    if shift_volume(&mut self.hrus, k, slot, v) {
                        log::debug!(
                            "{}: lateral transfer overdrew HRU {} slot {}",
                            lateral.name(),
                            k,
                            slot
                        );
                        clamped += 1;
                    }
                }
            }
        }
        Ok(clamped)
    }

    /// Restore every HRU to its initial state and zero all ledgers.
    pub fn reset(&mut self) {
        for (hru, initial) in self.hrus.iter_mut().zip(&self.initial_states) {
            hru.state_mut().copy_from(initial);
        }
        for ledger in self.ledgers.iter_mut().chain(self.lateral_ledgers.iter_mut()) {
            ledger.reset();
        }
        for rates in &mut self.lateral_rates {
            rates.fill(0.0);
        }
        self.current_step = StepId(0);
        self.last_metrics = StepMetrics::default();
    }

    // ── Flux queries ───────────────────────────────────────────────

    /// Rate of global connection `js` in HRU `k` during the last step [mm/d].
    pub fn flux_rate(&self, k: usize, js: usize) -> Option<f64> {
        self.ledgers.get(k)?.rate(js)
    }

    /// Amount moved through global connection `js` in HRU `k` since the
    /// start of the run [mm].
    pub fn cumulative_flux(&self, k: usize, js: usize) -> Option<f64> {
        self.ledgers.get(k)?.cumulative(js)
    }

    /// Total delivered into `slot` of HRU `k` by transfer connections [mm].
    pub fn cumulative_flux_to(&self, k: usize, slot: SlotIndex) -> Option<f64> {
        let ledger = self.ledgers.get(k)?;
        Some(ledger.cumulative_sum(self.plan.inflows(slot).iter().copied()))
    }

    /// Total drawn from `slot` of HRU `k` by transfer connections [mm].
    pub fn cumulative_flux_from(&self, k: usize, slot: SlotIndex) -> Option<f64> {
        let ledger = self.ledgers.get(k)?;
        Some(ledger.cumulative_sum(self.plan.outflows(slot).iter().copied()))
    }

    /// Total moved from `from` to `to` in HRU `k` [mm].
    pub fn cumulative_flux_between(
        &self,
        k: usize,
        from: SlotIndex,
        to: SlotIndex,
    ) -> Option<f64> {
        let ledger = self.ledgers.get(k)?;
        Some(ledger.cumulative_sum(self.plan.between(from, to)))
    }

    /// Flux ledger of HRU `k`.
    pub fn ledger(&self, k: usize) -> Option<&FluxLedger> {
        self.ledgers.get(k)
    }

    /// Resolved connections of lateral process `p`.
    pub fn lateral_connections(&self, p: usize) -> Option<&[LateralConnection]> {
        self.laterals.get(p).map(|l| l.connections())
    }

    /// Rate of lateral connection `i` of lateral process `p` during the
    /// last step [mm·km²/d].
    pub fn lateral_flux_rate(&self, p: usize, i: usize) -> Option<f64> {
        self.lateral_ledgers.get(p)?.rate(i)
    }

    /// Volume moved through lateral connection `i` of lateral process `p`
    /// since the start of the run [mm·km²].
    pub fn lateral_cumulative_flux(&self, p: usize, i: usize) -> Option<f64> {
        self.lateral_ledgers.get(p)?.cumulative(i)
    }

    // ── State accessors ────────────────────────────────────────────

    fn checked_hru(&self, k: usize) -> Result<&Hru, AccessError> {
        self.hrus.get(k).ok_or(AccessError::HruOutOfRange {
            index: k,
            count: self.hrus.len(),
        })
    }

    /// Committed value of `slot` in HRU `k`.
    pub fn slot_value(&self, k: usize, slot: SlotIndex) -> Result<f64, AccessError> {
        let state = self.checked_hru(k)?.state();
        state.get(slot).ok_or(AccessError::SlotOutOfRange {
            slot,
            len: state.len(),
        })
    }

    /// Force `slot` in HRU `k` to `value` between steps.
    ///
    /// Rejects NaN, infinities and negative amounts.
    pub fn set_slot_value(
        &mut self,
        k: usize,
        slot: SlotIndex,
        value: f64,
    ) -> Result<(), AccessError> {
        let count = self.hrus.len();
        let hru = self
            .hrus
            .get_mut(k)
            .ok_or(AccessError::HruOutOfRange { index: k, count })?;
        let len = hru.state().len();
        if slot.index() >= len {
            return Err(AccessError::SlotOutOfRange { slot, len });
        }
        if !value.is_finite() || value < 0.0 {
            return Err(AccessError::InvalidValue { slot, value });
        }
        hru.state_mut().set(slot, value);
        Ok(())
    }

    /// Committed state of HRU `k`.
    pub fn hru_state(&self, k: usize) -> Option<&StateVector> {
        self.hrus.get(k).map(Hru::state)
    }

    /// Forcing of HRU `k`, to be filled before the next step.
    pub fn forcing_mut(&mut self, k: usize) -> Option<&mut Forcing> {
        self.hrus.get_mut(k).map(|h| &mut h.forcing)
    }

    /// Enable or disable HRU `k`. Returns `false` if out of range.
    pub fn set_enabled(&mut self, k: usize, enabled: bool) -> bool {
        match self.hrus.get_mut(k) {
            Some(h) => {
                h.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// All HRUs.
    pub fn hrus(&self) -> &[Hru] {
        &self.hrus
    }

    /// Slot registry.
    pub fn registry(&self) -> &StateRegistry {
        &self.registry
    }

    /// Global connection numbering.
    pub fn plan(&self) -> &ConnectionPlan {
        &self.plan
    }

    /// Run options.
    pub fn options(&self) -> &ModelOptions {
        &self.options
    }

    /// Id of the last completed step. `StepId(0)` before the first.
    pub fn current_step(&self) -> StepId {
        self.current_step
    }

    /// Metrics of the last completed step.
    pub fn last_metrics(&self) -> &StepMetrics {
        &self.last_metrics
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("hrus", &self.hrus.len())
            .field("slots", &self.registry.len())
            .field("processes", &self.processes.len())
            .field("connections", &self.plan.total())
            .field("laterals", &self.laterals.len())
            .field("current_step", &self.current_step)
            .finish()
    }
}
