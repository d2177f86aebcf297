//! Cross-HRU exchange: the [`LateralProcess`] trait and its batch context.
//!
//! Lateral connections are resolved once from HRU-group membership and
//! evaluated after every HRU has committed its own processes. Rates are
//! volumetric, in mm·km²/d, because source and destination areas differ.

use freshet_core::{
    GlobalParams, Hru, ModelOptions, ParamInfo, ProcessError, SimTime, SlotIndex, StateRegistry,
};
use indexmap::IndexMap;

/// One `(source HRU, slot) -> (destination HRU, slot)` edge.
///
/// HRUs are addressed by position in the engine's HRU list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LateralConnection {
    /// Source HRU position.
    pub from_hru: usize,
    /// Source slot.
    pub from: SlotIndex,
    /// Destination HRU position.
    pub to_hru: usize,
    /// Destination slot.
    pub to: SlotIndex,
}

/// HRU list plus named groups, as seen during lateral initialisation.
pub struct HruTopology<'a> {
    hrus: &'a [Hru],
    groups: &'a IndexMap<String, Vec<usize>>,
    registry: &'a StateRegistry,
}

impl<'a> HruTopology<'a> {
    /// Wrap the assembled model.
    pub fn new(
        hrus: &'a [Hru],
        groups: &'a IndexMap<String, Vec<usize>>,
        registry: &'a StateRegistry,
    ) -> Self {
        Self {
            hrus,
            groups,
            registry,
        }
    }

    /// All HRUs.
    pub fn hrus(&self) -> &'a [Hru] {
        self.hrus
    }

    /// Positions of the members of `name`.
    pub fn group(&self, name: &str) -> Option<&'a [usize]> {
        self.groups.get(name).map(Vec::as_slice)
    }

    /// Slot registry.
    pub fn registry(&self) -> &'a StateRegistry {
        self.registry
    }
}

/// Read-only view of every committed HRU, for one lateral pass.
pub struct LateralContext<'a> {
    hrus: &'a [Hru],
    registry: &'a StateRegistry,
    options: &'a ModelOptions,
    params: &'a GlobalParams,
    time: SimTime,
}

impl<'a> LateralContext<'a> {
    /// Construct a context.
    pub fn new(
        hrus: &'a [Hru],
        registry: &'a StateRegistry,
        options: &'a ModelOptions,
        params: &'a GlobalParams,
        time: SimTime,
    ) -> Self {
        Self {
            hrus,
            registry,
            options,
            params,
            time,
        }
    }

    /// Committed value of `slot` in HRU `k`. Zero if either is out of range.
    #[inline]
    pub fn value(&self, k: usize, slot: SlotIndex) -> f64 {
        self.hrus
            .get(k)
            .and_then(|h| h.state().get(slot))
            .unwrap_or(0.0)
    }

    /// Area of HRU `k` [km²]. Zero if out of range.
    pub fn area(&self, k: usize) -> f64 {
        self.hrus.get(k).map(|h| h.area).unwrap_or(0.0)
    }

    /// HRU at position `k`.
    pub fn hru(&self, k: usize) -> Option<&Hru> {
        self.hrus.get(k)
    }

    /// Capacity of `slot` in HRU `k`, or `None` if unbounded.
    pub fn capacity(&self, k: usize, slot: SlotIndex) -> Option<f64> {
        let var = self.registry.var_of(slot)?;
        self.hrus.get(k)?.storage_capacity(var)
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
}

/// A process moving mass between different HRUs.
///
/// Rates are computed for the whole batch of HRUs at once. A positive
/// rate moves mass from source to destination; a negative rate moves it
/// back, for variants that model bidirectional exchange.
pub trait LateralProcess: Send + Sync + 'static {
    /// Configuration name, e.g. `LAT_FLUSH`.
    fn name(&self) -> &str;

    /// Parameters read by this variant.
    fn participating_params(&self) -> &'static [ParamInfo] {
        &[]
    }

    /// Resolve the connection list from group membership.
    ///
    /// Ambiguous destinations are an error. An empty result is logged as a
    /// warning unless `options.strict_lateral_exchange` is set.
    fn initialize(
        &mut self,
        topology: &HruTopology<'_>,
        options: &ModelOptions,
    ) -> Result<(), ProcessError>;

    /// Resolved connections. Empty before `initialize`.
    fn connections(&self) -> &[LateralConnection];

    /// Fill one volumetric rate [mm·km²/d] per connection.
    fn exchange_rates(&self, ctx: &LateralContext<'_>, rates: &mut [f64]);

    /// Clip rates so neither endpoint is overdrawn or overfilled.
    fn apply_constraints(&self, ctx: &LateralContext<'_>, rates: &mut [f64]) {
        clip_lateral(ctx, self.connections(), rates);
    }
}

/// Default lateral clipping.
///
/// Each transfer runs in whichever direction its sign indicates. Transfers
/// sharing a giving storage are scaled together so their sum cannot
/// overdraw it; transfers sharing a bounded receiving storage are scaled
/// together so their sum cannot overfill it. Non-finite rates are left as
/// they are for the caller to reject.
pub fn clip_lateral(ctx: &LateralContext<'_>, connections: &[LateralConnection], rates: &mut [f64]) {
    let dt = ctx.dt();
    let endpoints = |c: &LateralConnection, r: f64| {
        if r >= 0.0 {
            ((c.from_hru, c.from), (c.to_hru, c.to))
        } else {
            ((c.to_hru, c.to), (c.from_hru, c.from))
        }
    };

    let mut demand: IndexMap<(usize, SlotIndex), f64> = IndexMap::new();
    for (c, &r) in connections.iter().zip(rates.iter()) {
        if r.is_finite() && r != 0.0 {
            *demand.entry(endpoints(c, r).0).or_default() += r.abs();
        }
    }
    for ((k, slot), wanted) in demand.iter_mut() {
        let available = ctx.value(*k, *slot).max(0.0) * ctx.area(*k) / dt;
        *wanted = scale_for(available, *wanted);
    }

    let mut inflow: IndexMap<(usize, SlotIndex), f64> = IndexMap::new();
    for (c, &r) in connections.iter().zip(rates.iter()) {
        if r.is_finite() && r != 0.0 {
            let (give, take) = endpoints(c, r);
            let give_scale = demand.get(&give).copied().unwrap_or(1.0);
            *inflow.entry(take).or_default() += r.abs() * give_scale;
        }
    }
    for ((k, slot), arriving) in inflow.iter_mut() {
        *arriving = match ctx.capacity(*k, *slot) {
            Some(cap) => {
                let room = (cap - ctx.value(*k, *slot)).max(0.0) * ctx.area(*k) / dt;
                scale_for(room, *arriving)
            }
            None => 1.0,
        };
    }

    for (c, r) in connections.iter().zip(rates.iter_mut()) {
        if r.is_finite() && *r != 0.0 {
            let (give, take) = endpoints(c, *r);
            let give_scale = demand.get(&give).copied().unwrap_or(1.0);
            let take_scale = inflow.get(&take).copied().unwrap_or(1.0);
            *r *= give_scale * take_scale;
        }
    }
}

/// Fraction of `wanted` that fits within `limit`.
fn scale_for(limit: f64, wanted: f64) -> f64 {
    if wanted > limit {
        limit / wanted
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use freshet_core::{HruId, HruKind, StateVar, SvKind};

    fn hub_and_spokes(hub_water: f64) -> (StateRegistry, Vec<Hru>, SlotIndex) {
        let registry = StateRegistry::builder().build();
        let sw = registry.lookup(SvKind::SurfaceWater, 0).unwrap();
        let mut hrus: Vec<Hru> = (0..3)
            .map(|k| Hru::new(HruId(k), HruKind::Standard, registry.len()))
            .collect();
        hrus[0].state_mut().set(sw, hub_water);
        (registry, hrus, sw)
    }

    #[test]
    fn shared_giver_is_scaled_across_connections() {
        let (registry, hrus, sw) = hub_and_spokes(10.0);
        let options = ModelOptions::default();
        let params = GlobalParams::default();
        let ctx = LateralContext::new(&hrus, &registry, &options, &params, SimTime::default());
        let connections = [
            LateralConnection { from_hru: 0, from: sw, to_hru: 1, to: sw },
            LateralConnection { from_hru: 0, from: sw, to_hru: 2, to: sw },
        ];
        let mut rates = [8.0, 8.0];
        clip_lateral(&ctx, &connections, &mut rates);
        assert_relative_eq!(rates[0], 5.0);
        assert_relative_eq!(rates[1], 5.0);

        // Negative rates draw on the destination instead.
        let mut rates = [-3.0, 8.0];
        clip_lateral(&ctx, &connections, &mut rates);
        assert_eq!(rates[0], 0.0);
        assert_relative_eq!(rates[1], 8.0);
    }

    #[test]
    fn non_finite_rates_pass_through() {
        let (registry, hrus, sw) = hub_and_spokes(10.0);
        let options = ModelOptions::default();
        let params = GlobalParams::default();
        let ctx = LateralContext::new(&hrus, &registry, &options, &params, SimTime::default());
        let connections = [LateralConnection { from_hru: 0, from: sw, to_hru: 1, to: sw }];
        let mut rates = [f64::NAN];
        clip_lateral(&ctx, &connections, &mut rates);
        assert!(rates[0].is_nan());
    }

    #[test]
    fn bounded_receiver_ignores_unbounded_slots() {
        let mut b = StateRegistry::builder();
        b.add(StateVar::single(SvKind::Depression)).unwrap();
        let registry = b.build();
        let dep = registry.lookup(SvKind::Depression, 0).unwrap();
        let mut hrus: Vec<Hru> = (0..2)
            .map(|k| Hru::new(HruId(k), HruKind::Standard, registry.len()))
            .collect();
        hrus[0].state_mut().set(dep, 50.0);
        let options = ModelOptions::default();
        let params = GlobalParams::default();
        let ctx = LateralContext::new(&hrus, &registry, &options, &params, SimTime::default());
        let connections = [LateralConnection { from_hru: 0, from: dep, to_hru: 1, to: dep }];
        let mut rates = [50.0];
        clip_lateral(&ctx, &connections, &mut rates);
        assert_relative_eq!(rates[0], hrus[1].surface.dep_max);
    }
}
