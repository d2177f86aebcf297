//! Test fixtures and mock processes for Freshet development.
//!
//! [`TestBasin`] builds a registry and a set of HRUs with sensible soil
//! and surface classes; [`fixtures`] provides processes with trivially
//! predictable rates for exercising the integration loop.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

pub use fixtures::{ConstTransfer, FailingProcess, LinearDrain, SeenValueProbe, WarningProcess};

use std::sync::Arc;

use freshet_core::{
    Hru, HruId, HruKind, SoilClass, SoilProfile, StateRegistry, StateVar, SubBasinId,
    SurfaceClass, SvKind,
};

/// A soil class with round numbers: porosity 0.4, no stones, field
/// capacity 0.3, wilting point 0.1.
pub fn loam() -> SoilClass {
    SoilClass {
        name: "LOAM".into(),
        porosity: 0.4,
        stone_frac: 0.0,
        field_capacity: 0.3,
        sat_wilt: 0.1,
        ..SoilClass::default()
    }
}

/// A uniform profile of `layers` loam layers, each `thickness` mm thick.
pub fn loam_profile(layers: usize, thickness: f64) -> SoilProfile {
    SoilProfile::uniform("LOAM_PROFILE", Arc::new(loam()), &vec![thickness; layers])
}

/// Registry with `soil_layers` soil layers plus `extra` state variables.
pub fn registry_with(soil_layers: usize, extra: &[StateVar]) -> StateRegistry {
    let mut b = StateRegistry::builder();
    b.soil_layers(soil_layers)
        .and_then(|b| b.add_all(extra.iter().copied()))
        .expect("fixture registry within bounds");
    b.build()
}

/// Builder for a small set of HRUs sharing one registry.
pub struct TestBasin {
    registry: StateRegistry,
    hrus: Vec<Hru>,
    soil: Arc<SoilProfile>,
    surface: Arc<SurfaceClass>,
}

impl TestBasin {
    /// Three soil layers of 300 mm loam (120 mm capacity each), depression
    /// storage and the surface compartments.
    pub fn new() -> Self {
        Self::with_registry(registry_with(3, &[StateVar::single(SvKind::Depression)]))
    }

    pub fn with_registry(registry: StateRegistry) -> Self {
        let layers = registry.layer_count(SvKind::Soil).max(1);
        Self {
            registry,
            hrus: Vec::new(),
            soil: Arc::new(loam_profile(layers, 300.0)),
            surface: Arc::new(SurfaceClass::default()),
        }
    }

    pub fn surface(mut self, surface: SurfaceClass) -> Self {
        self.surface = Arc::new(surface);
        self
    }

    /// Append an HRU of `kind` with `area` km² in `sub_basin`.
    pub fn hru(mut self, kind: HruKind, area: f64, sub_basin: u32) -> Self {
        let id = HruId(self.hrus.len() as u32);
        let hru = Hru::new(id, kind, self.registry.len())
            .with_area(area)
            .with_sub_basin(SubBasinId(sub_basin))
            .with_soil(Arc::clone(&self.soil))
            .with_surface(Arc::clone(&self.surface));
        self.hrus.push(hru);
        self
    }

    /// Set `kind[layer]` to `value` in HRU `k`.
    pub fn set(mut self, k: usize, kind: SvKind, layer: usize, value: f64) -> Self {
        let slot = self
            .registry
            .lookup(kind, layer)
            .expect("fixture slot registered");
        self.hrus[k].state_mut().set(slot, value);
        self
    }

    /// Set ponded-water input on HRU `k` via its forcing.
    pub fn precip(mut self, k: usize, precip: f64) -> Self {
        self.hrus[k].forcing.precip = precip;
        self
    }

    pub fn registry(&self) -> &StateRegistry {
        &self.registry
    }

    pub fn build(self) -> (StateRegistry, Vec<Hru>) {
        (self.registry, self.hrus)
    }
}

impl Default for TestBasin {
    fn default() -> Self {
        Self::new()
    }
}
