//! Core types for the Freshet hydrology engine.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! state-variable registry, the per-HRU state vector, HRU and class
//! property tables, forcing snapshots, run options and the error taxonomy
//! shared by every process and by the integration loop.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod class;
pub mod constants;
pub mod error;
pub mod forcing;
pub mod hru;
pub mod id;
pub mod options;
pub mod state;

pub use class::{
    ParamBound, ParamClass, ParamInfo, SoilClass, SurfaceClass, TerrainClass, VegetationClass,
};
pub use error::{
    AccessError, ConservationWarning, ProcessError, RegistryError, StepError,
};
pub use forcing::{Forcing, SimTime};
pub use hru::{Hru, HruKind, SoilLayer, SoilProfile};
pub use id::{HruId, SlotIndex, StepId, SubBasinId};
pub use options::{GlobalParams, ModelOptions, NumericalMethod};
pub use state::{StateRegistry, StateRegistryBuilder, StateVar, StateVector, SvKind};
