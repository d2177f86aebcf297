//! Hydrologic Response Units.

use crate::class::{SoilClass, SurfaceClass, TerrainClass, VegetationClass};
use crate::forcing::Forcing;
use crate::id::{HruId, SubBasinId};
use crate::state::{StateVar, StateVector, SvKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Land-cover type of an HRU. Many processes are inactive on some kinds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HruKind {
    /// Vegetated or bare land with a soil column.
    #[default]
    Standard,
    /// Lake surface.
    Lake,
    /// Glacier.
    Glacier,
    /// Exposed bedrock; nothing infiltrates.
    Rock,
    /// Wetland.
    Wetland,
    /// Open water other than a lake.
    Water,
}

impl fmt::Display for HruKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HruKind::Standard => "STANDARD",
            HruKind::Lake => "LAKE",
            HruKind::Glacier => "GLACIER",
            HruKind::Rock => "ROCK",
            HruKind::Wetland => "WETLAND",
            HruKind::Water => "WATER",
        })
    }
}

/// One horizon of a soil profile.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SoilLayer {
    /// Horizon thickness [mm].
    pub thickness: f64,
    /// Soil class of the horizon.
    pub class: Arc<SoilClass>,
}

/// Ordered soil horizons, top first. Shared by every HRU with the
/// same profile.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SoilProfile {
    /// Profile name.
    pub name: String,
    /// Horizons, top first.
    pub layers: Vec<SoilLayer>,
}

impl SoilProfile {
    /// A profile of `thicknesses.len()` horizons all of class `class`.
    pub fn uniform(name: &str, class: Arc<SoilClass>, thicknesses: &[f64]) -> Self {
        Self {
            name: name.to_string(),
            layers: thicknesses
                .iter()
                .map(|&thickness| SoilLayer {
                    thickness,
                    class: Arc::clone(&class),
                })
                .collect(),
        }
    }
}

/// A spatial unit with homogeneous properties and its own state vector.
#[derive(Clone, Debug)]
pub struct Hru {
    /// User-facing identifier.
    pub id: HruId,
    /// Land-cover type.
    pub kind: HruKind,
    /// Area [km²].
    pub area: f64,
    /// Routing sub-basin.
    pub sub_basin: SubBasinId,
    /// Disabled HRUs are skipped by the integration loop.
    pub enabled: bool,
    /// Soil profile.
    pub soil: Arc<SoilProfile>,
    /// Land-use class.
    pub surface: Arc<SurfaceClass>,
    /// Vegetation class.
    pub vegetation: Arc<VegetationClass>,
    /// Terrain class.
    pub terrain: Arc<TerrainClass>,
    /// Forcing for the current timestep.
    pub forcing: Forcing,
    state: StateVector,
}

impl Hru {
    /// A 1 km² HRU with default classes and a zeroed state of `n_slots`.
    pub fn new(id: HruId, kind: HruKind, n_slots: usize) -> Self {
        Self {
            id,
            kind,
            area: 1.0,
            sub_basin: SubBasinId(0),
            enabled: true,
            soil: Arc::new(SoilProfile::default()),
            surface: Arc::new(SurfaceClass::default()),
            vegetation: Arc::new(VegetationClass::default()),
            terrain: Arc::new(TerrainClass::default()),
            forcing: Forcing::default(),
            state: StateVector::zeros(n_slots),
        }
    }

    /// Set the area [km²].
    pub fn with_area(mut self, area: f64) -> Self {
        self.area = area;
        self
    }

    /// Set the routing sub-basin.
    pub fn with_sub_basin(mut self, sub_basin: SubBasinId) -> Self {
        self.sub_basin = sub_basin;
        self
    }

    /// Set the soil profile.
    pub fn with_soil(mut self, soil: Arc<SoilProfile>) -> Self {
        self.soil = soil;
        self
    }

    /// Set the land-use class.
    pub fn with_surface(mut self, surface: Arc<SurfaceClass>) -> Self {
        self.surface = surface;
        self
    }

    /// Set the vegetation class.
    pub fn with_vegetation(mut self, vegetation: Arc<VegetationClass>) -> Self {
        self.vegetation = vegetation;
        self
    }

    /// Set the terrain class.
    pub fn with_terrain(mut self, terrain: Arc<TerrainClass>) -> Self {
        self.terrain = terrain;
        self
    }

    /// Committed state.
    pub fn state(&self) -> &StateVector {
        &self.state
    }

    /// Mutable committed state. Only the integration loop and the
    /// between-step accessors write through this.
    pub fn state_mut(&mut self) -> &mut StateVector {
        &mut self.state
    }

    /// Soil class of layer `m`, falling back to the deepest layer.
    pub fn soil_class(&self, m: usize) -> Option<&SoilClass> {
        self.soil
            .layers
            .get(m)
            .or_else(|| self.soil.layers.last())
            .map(|l| l.class.as_ref())
    }

    /// Total water capacity of soil layer `m` [mm]. Zero if absent.
    pub fn soil_capacity(&self, m: usize) -> f64 {
        self.soil
            .layers
            .get(m)
            .map(|l| l.thickness * l.class.porosity * (1.0 - l.class.stone_frac))
            .unwrap_or(0.0)
    }

    /// Tension water capacity of soil layer `m` [mm].
    pub fn tension_capacity(&self, m: usize) -> f64 {
        self.soil
            .layers
            .get(m)
            .map(|l| {
                self.soil_capacity(m) * (l.class.field_capacity - l.class.sat_wilt).max(0.0)
            })
            .unwrap_or(0.0)
    }

    /// Dynamic capacity of a storage, or `None` if unbounded.
    pub fn storage_capacity(&self, var: StateVar) -> Option<f64> {
        match var.kind {
            SvKind::Soil => Some(self.soil_capacity(var.layer)),
            SvKind::Depression => Some(self.surface.dep_max),
            _ => None,
        }
    }

    /// Check the HRU's own geometry and classes.
    pub fn validate(&self) -> Result<(), String> {
        if !self.area.is_finite() || self.area <= 0.0 {
            return Err(format!("area must be positive, got {}", self.area));
        }
        for (m, layer) in self.soil.layers.iter().enumerate() {
            if !layer.thickness.is_finite() || layer.thickness < 0.0 {
                return Err(format!(
                    "soil layer {m} thickness must be non-negative, got {}",
                    layer.thickness
                ));
            }
        }
        let length = self.terrain.hillslope_length;
        if !length.is_finite() || length <= 0.0 {
            return Err(format!(
                "terrain class '{}' hillslope length must be positive",
                self.terrain.name
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn layered() -> Hru {
        let class = Arc::new(SoilClass {
            porosity: 0.5,
            stone_frac: 0.2,
            field_capacity: 0.6,
            sat_wilt: 0.1,
            ..SoilClass::default()
        });
        Hru::new(HruId(1), HruKind::Standard, 4)
            .with_soil(Arc::new(SoilProfile::uniform("TWO", class, &[100.0, 500.0])))
    }

    #[test]
    fn soil_capacity_accounts_for_stones() {
        let h = layered();
        assert_relative_eq!(h.soil_capacity(0), 40.0);
        assert_relative_eq!(h.soil_capacity(1), 200.0);
        assert_eq!(h.soil_capacity(2), 0.0);
        assert_relative_eq!(h.tension_capacity(0), 20.0);
    }

    #[test]
    fn storage_capacity_is_bounded_only_for_soil_and_depressions() {
        let h = layered();
        assert_eq!(
            h.storage_capacity(StateVar::new(SvKind::Soil, 1)),
            Some(h.soil_capacity(1))
        );
        assert_eq!(
            h.storage_capacity(StateVar::single(SvKind::Depression)),
            Some(h.surface.dep_max)
        );
        assert_eq!(h.storage_capacity(StateVar::single(SvKind::Snow)), None);
    }

    #[test]
    fn validate_rejects_non_positive_area() {
        let h = layered().with_area(0.0);
        assert!(h.validate().is_err());
        assert!(layered().validate().is_ok());
    }
}
