//! State-variable kinds, the global slot registry and the per-HRU state vector.
//!
//! The registry is a dense `(kind, layer) -> slot` table built once at model
//! assembly and read-only afterwards, so every lookup during a run is a
//! single array index.

use crate::constants::{MAX_STATE_VARS, MAX_SV_LAYERS};
use crate::error::RegistryError;
use crate::id::SlotIndex;
use serde::{Deserialize, Serialize};
use std::fmt;

// ── State-variable kinds ────────────────────────────────────────

/// The kind of quantity held by a state slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SvKind {
    /// Water leaving the HRU toward the channel network [mm].
    SurfaceWater,
    /// Water ponded on the land surface, awaiting infiltration [mm].
    PondedWater,
    /// Soil water, one layer per soil horizon [mm].
    Soil,
    /// Snowpack water equivalent, optionally one per snow layer [mm].
    Snow,
    /// Age of the snow surface since the last fresh snowfall [d].
    SnowAge,
    /// Snow surface albedo [-].
    SnowAlbedo,
    /// Liquid water stored in the glacier drainage system [mm].
    Glacier,
    /// Glacier ice [mm water equivalent].
    GlacierIce,
    /// Glacier cold content [mm melt equivalent].
    GlacierCc,
    /// Depression storage [mm].
    Depression,
    /// Smallest deficit among the wetlands of an HRU [mm].
    MinDepDeficit,
    /// Lake or wetland open-water storage [mm].
    LakeStorage,
    /// Aggregate water in transit through a convolution process [mm].
    Convolution,
    /// Convolution sub-storage, one per unit-hydrograph bin [mm].
    ConvStor,
    /// Accumulated crop heat units [CHU].
    CropHeatUnits,
    /// Cumulative infiltration since the start of an event [mm].
    CumInfil,
    /// Soil storage at the start of the current Green-Ampt event [mm].
    GaMoistureInit,
}

impl SvKind {
    /// Every kind, in ordinal order.
    pub const ALL: [SvKind; 17] = [
        SvKind::SurfaceWater,
        SvKind::PondedWater,
        SvKind::Soil,
        SvKind::Snow,
        SvKind::SnowAge,
        SvKind::SnowAlbedo,
        SvKind::Glacier,
        SvKind::GlacierIce,
        SvKind::GlacierCc,
        SvKind::Depression,
        SvKind::MinDepDeficit,
        SvKind::LakeStorage,
        SvKind::Convolution,
        SvKind::ConvStor,
        SvKind::CropHeatUnits,
        SvKind::CumInfil,
        SvKind::GaMoistureInit,
    ];

    /// Number of distinct kinds.
    pub const COUNT: usize = Self::ALL.len();

    /// Position of this kind in [`SvKind::ALL`].
    #[inline]
    pub fn ordinal(self) -> usize {
        self as usize
    }

    /// Canonical upper-case name, as used in configuration files.
    pub fn name(self) -> &'static str {
        match self {
            SvKind::SurfaceWater => "SURFACE_WATER",
            SvKind::PondedWater => "PONDED_WATER",
            SvKind::Soil => "SOIL",
            SvKind::Snow => "SNOW",
            SvKind::SnowAge => "SNOW_AGE",
            SvKind::SnowAlbedo => "SNOW_ALBEDO",
            SvKind::Glacier => "GLACIER",
            SvKind::GlacierIce => "GLACIER_ICE",
            SvKind::GlacierCc => "GLACIER_CC",
            SvKind::Depression => "DEPRESSION",
            SvKind::MinDepDeficit => "MIN_DEP_DEFICIT",
            SvKind::LakeStorage => "LAKE_STORAGE",
            SvKind::Convolution => "CONVOLUTION",
            SvKind::ConvStor => "CONV_STOR",
            SvKind::CropHeatUnits => "CROP_HEAT_UNITS",
            SvKind::CumInfil => "CUM_INFIL",
            SvKind::GaMoistureInit => "GA_MOISTURE_INIT",
        }
    }

    /// Units of a slot of this kind.
    pub fn units(self) -> &'static str {
        match self {
            SvKind::SnowAlbedo => "-",
            SvKind::SnowAge => "d",
            SvKind::CropHeatUnits => "CHU",
            _ => "mm",
        }
    }

    /// Whether slots of this kind hold physical water that counts toward
    /// an HRU's water balance.
    ///
    /// `CONV_STOR` is bookkeeping for water already counted in
    /// `CONVOLUTION`, so it is excluded.
    pub fn is_water_storage(self) -> bool {
        matches!(
            self,
            SvKind::SurfaceWater
                | SvKind::PondedWater
                | SvKind::Soil
                | SvKind::Snow
                | SvKind::Glacier
                | SvKind::GlacierIce
                | SvKind::Depression
                | SvKind::LakeStorage
                | SvKind::Convolution
        )
    }

    /// Whether this kind may be registered with more than one layer.
    pub fn is_multilayer(self) -> bool {
        matches!(
            self,
            SvKind::Soil | SvKind::Snow | SvKind::Convolution | SvKind::ConvStor
        )
    }
}

impl fmt::Display for SvKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A `(kind, layer)` pair naming one state slot.
///
/// Single-layer kinds always use layer 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateVar {
    /// The kind of quantity.
    pub kind: SvKind,
    /// Layer index within the kind.
    pub layer: usize,
}

impl StateVar {
    /// Create a `(kind, layer)` pair.
    pub const fn new(kind: SvKind, layer: usize) -> Self {
        Self { kind, layer }
    }

    /// Layer 0 of a kind.
    pub const fn single(kind: SvKind) -> Self {
        Self { kind, layer: 0 }
    }
}

impl fmt::Display for StateVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind.is_multilayer() {
            write!(f, "{}[{}]", self.kind, self.layer)
        } else {
            write!(f, "{}", self.kind)
        }
    }
}

// ── Registry ────────────────────────────────────────────────────

/// Read-only `(kind, layer) -> slot` table shared by every HRU and process.
#[derive(Clone, Debug, PartialEq)]
pub struct StateRegistry {
    table: Vec<Option<SlotIndex>>,
    vars: Vec<StateVar>,
}

impl StateRegistry {
    /// Start building a registry with `SURFACE_WATER` and `PONDED_WATER`
    /// pre-registered.
    pub fn builder() -> StateRegistryBuilder {
        StateRegistryBuilder::new()
    }

    #[inline]
    fn cell(kind: SvKind, layer: usize) -> usize {
        kind.ordinal() * MAX_SV_LAYERS + layer
    }

    /// Slot of `(kind, layer)`, or `None` if the pair is not registered.
    ///
    /// Never panics: layers beyond [`MAX_SV_LAYERS`] also return `None`.
    #[inline]
    pub fn lookup(&self, kind: SvKind, layer: usize) -> Option<SlotIndex> {
        if layer >= MAX_SV_LAYERS {
            return None;
        }
        self.table[Self::cell(kind, layer)]
    }

    /// Slot of a [`StateVar`], or `None` if not registered.
    #[inline]
    pub fn lookup_var(&self, var: StateVar) -> Option<SlotIndex> {
        self.lookup(var.kind, var.layer)
    }

    /// Resolve a slot at assembly time, failing if it is not registered.
    pub fn resolve(&self, var: StateVar) -> Result<SlotIndex, RegistryError> {
        if var.layer >= MAX_SV_LAYERS {
            return Err(RegistryError::LayerOutOfBounds {
                kind: var.kind,
                layer: var.layer,
                max: MAX_SV_LAYERS,
            });
        }
        self.lookup_var(var)
            .ok_or(RegistryError::Unregistered { var })
    }

    /// The `(kind, layer)` pair stored at `slot`.
    pub fn var_of(&self, slot: SlotIndex) -> Option<StateVar> {
        self.vars.get(slot.index()).copied()
    }

    /// The kind stored at `slot`.
    pub fn kind_of(&self, slot: SlotIndex) -> Option<SvKind> {
        self.var_of(slot).map(|v| v.kind)
    }

    /// The layer stored at `slot`.
    pub fn layer_of(&self, slot: SlotIndex) -> Option<usize> {
        self.var_of(slot).map(|v| v.layer)
    }

    /// Number of registered slots, which is the length of every state vector.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Whether no slots are registered.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Number of registered layers of `kind`.
    pub fn layer_count(&self, kind: SvKind) -> usize {
        self.vars.iter().filter(|v| v.kind == kind).count()
    }

    /// Iterate over `(slot, var)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (SlotIndex, StateVar)> + '_ {
        self.vars
            .iter()
            .enumerate()
            .map(|(i, v)| (SlotIndex(i as u32), *v))
    }

    /// A zero-initialised state vector sized for this registry.
    pub fn new_state(&self) -> StateVector {
        StateVector::zeros(self.len())
    }
}

/// Incremental builder for a [`StateRegistry`].
///
/// Registering a pair twice is a no-op, so every process can declare the
/// state variables it participates in without coordinating with others.
#[derive(Clone, Debug)]
pub struct StateRegistryBuilder {
    table: Vec<Option<SlotIndex>>,
    vars: Vec<StateVar>,
}

impl Default for StateRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StateRegistryBuilder {
    /// An empty builder with the surface compartments every model has.
    pub fn new() -> Self {
        let mut b = Self {
            table: vec![None; SvKind::COUNT * MAX_SV_LAYERS],
            vars: Vec::new(),
        };
        for kind in [SvKind::SurfaceWater, SvKind::PondedWater] {
            // Cannot fail: two single-layer kinds on an empty table.
            let _ = b.insert(StateVar::single(kind));
        }
        b
    }

    fn insert(&mut self, var: StateVar) -> Result<SlotIndex, RegistryError> {
        if var.layer >= MAX_SV_LAYERS || (!var.kind.is_multilayer() && var.layer != 0) {
            return Err(RegistryError::LayerOutOfBounds {
                kind: var.kind,
                layer: var.layer,
                max: if var.kind.is_multilayer() { MAX_SV_LAYERS } else { 1 },
            });
        }
        let cell = StateRegistry::cell(var.kind, var.layer);
        if let Some(slot) = self.table[cell] {
            return Ok(slot);
        }
        if self.vars.len() >= MAX_STATE_VARS {
            return Err(RegistryError::TooManyStateVars {
                max: MAX_STATE_VARS,
            });
        }
        let slot = SlotIndex(self.vars.len() as u32);
        self.table[cell] = Some(slot);
        self.vars.push(var);
        Ok(slot)
    }

    /// Register one state variable.
    pub fn add(&mut self, var: StateVar) -> Result<&mut Self, RegistryError> {
        self.insert(var)?;
        Ok(self)
    }

    /// Register every state variable yielded by `vars`.
    pub fn add_all<I>(&mut self, vars: I) -> Result<&mut Self, RegistryError>
    where
        I: IntoIterator<Item = StateVar>,
    {
        for var in vars {
            self.insert(var)?;
        }
        Ok(self)
    }

    /// Register soil layers `0..n`.
    pub fn soil_layers(&mut self, n: usize) -> Result<&mut Self, RegistryError> {
        self.add_all((0..n).map(|m| StateVar::new(SvKind::Soil, m)))
    }

    /// Freeze the table.
    pub fn build(&self) -> StateRegistry {
        StateRegistry {
            table: self.table.clone(),
            vars: self.vars.clone(),
        }
    }
}

// ── State vector ────────────────────────────────────────────────

/// Dense per-HRU state, one value per registered slot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateVector(Vec<f64>);

impl StateVector {
    /// A vector of `len` zeros.
    pub fn zeros(len: usize) -> Self {
        Self(vec![0.0; len])
    }

    /// Value at `slot`, or `None` if the slot is out of range.
    #[inline]
    pub fn get(&self, slot: SlotIndex) -> Option<f64> {
        self.0.get(slot.index()).copied()
    }

    /// Overwrite the value at `slot`. Returns `false` if out of range.
    pub fn set(&mut self, slot: SlotIndex, value: f64) -> bool {
        match self.0.get_mut(slot.index()) {
            Some(v) => {
                *v = value;
                true
            }
            None => false,
        }
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the vector has no slots.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Read-only view of all slots.
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Mutable view of all slots.
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.0
    }

    /// Overwrite every slot from `other`. Lengths must match.
    pub fn copy_from(&mut self, other: &StateVector) {
        self.0.copy_from_slice(&other.0);
    }

    /// Add `deltas` element-wise. Lengths must match.
    pub fn commit(&mut self, deltas: &[f64]) {
        debug_assert_eq!(deltas.len(), self.0.len());
        for (v, d) in self.0.iter_mut().zip(deltas) {
            *v += d;
        }
    }

    /// Clamp every slot to be non-negative, returning how many were clipped.
    ///
    /// All state kinds in this model are physically non-negative.
    pub fn clamp_non_negative(&mut self) -> u32 {
        let mut clipped = 0;
        for v in &mut self.0 {
            if *v < 0.0 {
                *v = 0.0;
                clipped += 1;
            }
        }
        clipped
    }
}

impl From<Vec<f64>> for StateVector {
    fn from(v: Vec<f64>) -> Self {
        Self(v)
    }
}
