//! Strongly-typed identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a state variable inside every HRU's state vector.
///
/// Slots are assigned densely by the [`StateRegistry`](crate::StateRegistry)
/// at model assembly. The "does not exist" sentinel is expressed as
/// `Option<SlotIndex>::None`, never as a magic value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotIndex(pub u32);

impl SlotIndex {
    /// The slot as a `usize` for indexing state arrays.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SlotIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for SlotIndex {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Identifies a Hydrologic Response Unit.
///
/// This is the user-facing identifier carried in configuration and
/// diagnostics, not the position of the HRU in the engine's HRU list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HruId(pub u32);

impl fmt::Display for HruId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for HruId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Identifies the routing sub-basin an HRU drains to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubBasinId(pub u32);

impl fmt::Display for SubBasinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for SubBasinId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Monotonically increasing timestep counter.
///
/// Incremented each time the engine commits a full timestep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StepId(pub u64);

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for StepId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}
