//! Shared clipping helpers for `apply_constraints` implementations.

use crate::context::ProcessContext;
use crate::process::Connection;

/// Largest rate that removes at most `available` over `dt`.
#[inline]
pub fn max_outflow(available: f64, dt: f64) -> f64 {
    available.max(0.0) / dt
}

/// Largest rate that raises `stored` no higher than `capacity` over `dt`.
#[inline]
pub fn max_inflow(stored: f64, capacity: f64, dt: f64) -> f64 {
    (capacity - stored).max(0.0) / dt
}

/// Clamp transfer rates to be non-negative, then scale the outflows of
/// every source slot so their sum cannot overdraw it within `dt`.
///
/// Self-update connections are left untouched.
pub fn clip_to_sources(ctx: &ProcessContext<'_>, connections: &[Connection], rates: &mut [f64]) {
    let dt = ctx.dt();
    for (c, r) in connections.iter().zip(rates.iter_mut()) {
        if !c.is_self_update() && *r < 0.0 {
            *r = 0.0;
        }
    }
    for i in 0..connections.len() {
        let source = connections[i].from;
        if connections[i].is_self_update()
            || connections[..i]
                .iter()
                .any(|c| c.from == source && !c.is_self_update())
        {
            continue;
        }
        let total: f64 = connections[i..]
            .iter()
            .zip(&rates[i..])
            .filter(|(c, _)| c.from == source && !c.is_self_update())
            .map(|(_, r)| *r)
            .sum();
        let limit = max_outflow(ctx.value(source), dt);
        if total > limit && total > 0.0 {
            let scale = limit / total;
            for (c, r) in connections[i..].iter().zip(&mut rates[i..]) {
                if c.from == source && !c.is_self_update() {
                    *r *= scale;
                }
            }
        }
    }
}

/// Clip one transfer so the source is not overdrawn and, if the sink is
/// bounded, not overfilled. Returns the clipped rate.
pub fn clip_transfer(ctx: &ProcessContext<'_>, connection: Connection, rate: f64) -> f64 {
    let dt = ctx.dt();
    let mut rate = rate.max(0.0).min(max_outflow(ctx.value(connection.from), dt));
    if let Some(cap) = ctx.capacity(connection.to) {
        rate = rate.min(max_inflow(ctx.value(connection.to), cap, dt));
    }
    rate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::HruAuxiliary;
    use approx::assert_relative_eq;
    use freshet_core::{
        GlobalParams, Hru, HruId, HruKind, ModelOptions, SimTime, SlotIndex, StateRegistry,
        StateVar, SvKind,
    };

    #[test]
    fn outflow_and_inflow_limits() {
        assert_relative_eq!(max_outflow(10.0, 2.0), 5.0);
        assert_eq!(max_outflow(-1.0, 1.0), 0.0);
        assert_relative_eq!(max_inflow(8.0, 10.0, 0.5), 4.0);
        assert_eq!(max_inflow(12.0, 10.0, 1.0), 0.0);
    }

    #[test]
    fn shared_source_is_scaled_proportionally() {
        let mut b = StateRegistry::builder();
        b.add(StateVar::single(SvKind::Depression)).unwrap();
        let reg = b.build();
        let hru = Hru::new(HruId(0), HruKind::Standard, reg.len());
        let opts = ModelOptions::default();
        let params = GlobalParams::default();
        let mut aux = HruAuxiliary::default();
        // SURFACE_WATER=0, PONDED_WATER=1, DEPRESSION=2
        let state = vec![0.0, 6.0, 0.0];
        let ctx = ProcessContext::new(
            &state,
            &hru,
            &reg,
            &opts,
            &params,
            SimTime::default(),
            &mut aux,
        );
        let conns = [
            Connection::new(SlotIndex(1), SlotIndex(0)),
            Connection::new(SlotIndex(1), SlotIndex(2)),
            Connection::new(SlotIndex(2), SlotIndex(2)),
        ];
        let mut rates = [8.0, 4.0, -3.0];
        clip_to_sources(&ctx, &conns, &mut rates);
        assert_relative_eq!(rates[0], 4.0);
        assert_relative_eq!(rates[1], 2.0);
        assert_eq!(rates[2], -3.0);
    }

    proptest::proptest! {
        #[test]
        fn clipped_sources_never_go_negative(
            ponded in 0.0f64..50.0,
            dep in 0.0f64..50.0,
            rates in proptest::collection::vec(-20.0f64..200.0, 3),
            dt in 0.01f64..2.0,
        ) {
            let mut b = StateRegistry::builder();
            b.add(StateVar::single(SvKind::Depression)).unwrap();
            let reg = b.build();
            let hru = Hru::new(HruId(0), HruKind::Standard, reg.len());
            let opts = ModelOptions { timestep: dt, ..ModelOptions::default() };
            let params = GlobalParams::default();
            let mut aux = HruAuxiliary::default();
            let state = vec![0.0, ponded, dep];
            let ctx = ProcessContext::new(
                &state,
                &hru,
                &reg,
                &opts,
                &params,
                SimTime::default(),
                &mut aux,
            );
            let conns = [
                Connection::new(SlotIndex(1), SlotIndex(0)),
                Connection::new(SlotIndex(1), SlotIndex(2)),
                Connection::new(SlotIndex(2), SlotIndex(0)),
            ];
            let mut rates = [rates[0], rates[1], rates[2]];
            clip_to_sources(&ctx, &conns, &mut rates);
            proptest::prop_assert!(rates.iter().all(|r| *r >= 0.0));
            let ponded_after = ponded - (rates[0] + rates[1]) * dt;
            let dep_after = dep + (rates[1] - rates[2]) * dt;
            proptest::prop_assert!(ponded_after >= -1e-9, "ponded {}", ponded_after);
            proptest::prop_assert!(dep - rates[2] * dt >= -1e-9);
            proptest::prop_assert!(dep_after >= -1e-9);
        }
    }
}
