//! Error taxonomy for the Freshet workspace.
//!
//! Configuration problems ([`RegistryError`], [`ProcessError`]) are fatal
//! at model assembly. [`StepError`] aborts a single timestep.
//! [`ConservationWarning`] is a soft diagnostic and is never returned as
//! an `Err`.

use crate::class::ParamClass;
use crate::id::{HruId, SlotIndex};
use crate::state::{StateVar, SvKind};
use std::fmt;
use thiserror::Error;

/// Errors from building or querying the state-variable registry.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum RegistryError {
    /// A layer index lies outside the kind's layer range.
    #[error("layer {layer} of {kind} is outside [0, {max})")]
    LayerOutOfBounds {
        /// The kind being registered or resolved.
        kind: SvKind,
        /// The offending layer.
        layer: usize,
        /// Exclusive upper bound for this kind.
        max: usize,
    },
    /// A structurally valid pair was never registered.
    #[error("state variable {var} is not registered")]
    Unregistered {
        /// The missing pair.
        var: StateVar,
    },
    /// Registration would exceed the state-vector size limit.
    #[error("state vector would exceed {max} slots")]
    TooManyStateVars {
        /// The slot limit.
        max: usize,
    },
}

/// Configuration errors raised while constructing or initialising a
/// process.
///
/// Every variant names the process so the offending configuration line
/// can be found.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ProcessError {
    /// A required state slot is missing or malformed.
    #[error("process '{process}': {source}")]
    Registry {
        /// Process name.
        process: String,
        /// Underlying registry failure.
        source: RegistryError,
    },
    /// A parameter value violates its physical bound.
    #[error("process '{process}': parameter {param} = {value} on {owner} {reason}")]
    InvalidParameter {
        /// Process name.
        process: String,
        /// Parameter name.
        param: String,
        /// Where the value came from, e.g. `surface class 'FOREST'`.
        owner: String,
        /// The rejected value.
        value: f64,
        /// Which bound was violated.
        reason: String,
    },
    /// A participating parameter does not exist on its class.
    #[error("process '{process}': {class} class has no parameter {param}")]
    UnknownParameter {
        /// Process name.
        process: String,
        /// Parameter name.
        param: String,
        /// Owning class table.
        class: ParamClass,
    },
    /// A connection endpoint resolved to the wrong kind of state variable.
    #[error("process '{process}': connection {connection} expects {expected}, found {found}")]
    UnexpectedStateVar {
        /// Process name.
        process: String,
        /// Connection index within the process.
        connection: usize,
        /// Kind the algorithm requires.
        expected: SvKind,
        /// What was configured.
        found: StateVar,
    },
    /// The model has fewer soil layers than the algorithm needs.
    #[error("process '{process}': requires {required} soil layers, model has {available}")]
    InsufficientSoilLayers {
        /// Process name.
        process: String,
        /// Layers the algorithm needs.
        required: usize,
        /// Layers registered.
        available: usize,
    },
    /// A lateral exchange found several destination HRUs in one scope.
    #[error("lateral process '{process}': {count} destination HRUs in {scope}, expected exactly one")]
    AmbiguousDestination {
        /// Process name.
        process: String,
        /// Scope description, e.g. `sub-basin 4`.
        scope: String,
        /// Number of candidates found.
        count: usize,
    },
    /// A lateral exchange resolved no connections and strict checking is on.
    #[error("lateral process '{process}': no lateral connections resolved")]
    NoLateralConnections {
        /// Process name.
        process: String,
    },
    /// A lateral exchange references an HRU group that does not exist.
    #[error("lateral process '{process}': unknown HRU group '{group}'")]
    UnknownGroup {
        /// Process name.
        process: String,
        /// Group name.
        group: String,
    },
    /// Any other invalid construction argument.
    #[error("process '{process}': {reason}")]
    Invalid {
        /// Process name.
        process: String,
        /// Human-readable reason.
        reason: String,
    },
}

impl ProcessError {
    /// Wrap a registry failure with the process name.
    pub fn registry(process: &str, source: RegistryError) -> Self {
        Self::Registry {
            process: process.to_string(),
            source,
        }
    }

    /// Build an [`Invalid`](Self::Invalid) error.
    pub fn invalid(process: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            process: process.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors that abort a timestep.
///
/// When a step fails the engine leaves every HRU state untouched.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum StepError {
    /// A process produced NaN or infinity after constraint application.
    #[error("process '{process}' produced non-finite rate {value} on connection {connection} in HRU {hru}")]
    NonFiniteRate {
        /// Process name.
        process: String,
        /// HRU being integrated.
        hru: HruId,
        /// Connection index within the process.
        connection: usize,
        /// The offending value.
        value: f64,
    },
    /// A lateral process produced NaN or infinity.
    #[error("lateral process '{process}' produced non-finite rate {value} on lateral connection {connection}")]
    NonFiniteLateralRate {
        /// Process name.
        process: String,
        /// Lateral connection index.
        connection: usize,
        /// The offending value.
        value: f64,
    },
}

/// Errors from the between-timestep state accessors.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum AccessError {
    /// HRU position outside the model.
    #[error("HRU index {index} out of range (model has {count})")]
    HruOutOfRange {
        /// Requested position.
        index: usize,
        /// Number of HRUs.
        count: usize,
    },
    /// Slot outside the state vector.
    #[error("slot {slot} out of range (state vector has {len} slots)")]
    SlotOutOfRange {
        /// Requested slot.
        slot: SlotIndex,
        /// State-vector length.
        len: usize,
    },
    /// Attempt to write NaN, infinity or a negative amount.
    #[error("rejected value {value} for slot {slot}")]
    InvalidValue {
        /// Target slot.
        slot: SlotIndex,
        /// Rejected value.
        value: f64,
    },
}

/// A soft mass-balance diagnostic.
///
/// Indicates either a genuine bug or accumulated floating-point drift.
/// The run continues.
#[derive(Clone, Debug, PartialEq)]
pub struct ConservationWarning {
    /// Process that detected the discrepancy.
    pub process: String,
    /// HRU in which it occurred.
    pub hru: HruId,
    /// Signed size of the discrepancy [mm].
    pub discrepancy: f64,
    /// What was being checked.
    pub detail: String,
}

impl fmt::Display for ConservationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "process '{}' in HRU {}: {} (discrepancy {:.3e} mm)",
            self.process, self.hru, self.detail, self.discrepancy
        )
    }
}
