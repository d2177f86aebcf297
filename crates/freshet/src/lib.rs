//! Freshet: a hydrological process execution and state integration engine.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! Freshet sub-crates. For most users, adding `freshet` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use freshet::prelude::*;
//! use freshet::types::{SoilClass, SoilProfile};
//!
//! // One soil layer, 300 mm deep.
//! let mut builder = StateRegistry::builder();
//! builder.soil_layers(1).unwrap();
//! let registry = builder.build();
//!
//! let soil = SoilProfile::uniform("LOAM", Arc::new(SoilClass::default()), &[300.0]);
//! let mut hru = Hru::new(HruId(0), HruKind::Standard, registry.len())
//!     .with_area(2.5)
//!     .with_soil(Arc::new(soil));
//! let ponded = registry.lookup(SvKind::PondedWater, 0).unwrap();
//! let soil0 = registry.lookup(SvKind::Soil, 0).unwrap();
//! hru.state_mut().set(ponded, 10.0);
//!
//! let infiltration = Infiltration::new(InfiltrationMethod::AllInfiltrates, &registry).unwrap();
//! let config = ModelConfig::new(registry, vec![hru], vec![Box::new(infiltration)]);
//! let mut engine = Engine::new(config).unwrap();
//!
//! let report = engine.step(SimTime::default()).unwrap();
//! assert_eq!(report.step, StepId(1));
//! assert!(engine.slot_value(0, ponded).unwrap().abs() < 1e-12);
//! assert!((engine.slot_value(0, soil0).unwrap() - 10.0).abs() < 1e-9);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `freshet-core` | State registry, HRUs, classes, options, errors |
//! | [`process`] | `freshet-process` | Process traits, constraints and pipeline validation |
//! | [`processes`] | `freshet-processes` | Hydrological algorithm variants |
//! | [`engine`] | `freshet-engine` | Model assembly, integration loop and flux ledgers |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, IDs and errors (`freshet-core`).
///
/// Contains the [`types::StateRegistry`], the [`types::Hru`] record with
/// its class tables, run options and the error taxonomy.
pub use freshet_core as types;

/// Process traits and pipeline validation (`freshet-process`).
///
/// The [`process::Process`] trait is the extension point for per-HRU
/// algorithms; [`process::LateralProcess`] covers cross-HRU exchange.
pub use freshet_process as process;

/// Hydrological algorithm variants (`freshet-processes`).
///
/// Infiltration, abstraction, depression storage, convolution, glacier,
/// snow albedo, crop heat units, lake release and lateral exchange.
pub use freshet_processes as processes;

/// Model assembly and stepping (`freshet-engine`).
///
/// Build a [`engine::ModelConfig`], turn it into an [`engine::Engine`] and
/// call [`engine::Engine::step`] once per timestep.
pub use freshet_engine as engine;

/// Common imports for typical Freshet usage.
///
/// ```rust
/// use freshet::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use freshet_core::{
        Forcing, GlobalParams, Hru, HruId, HruKind, ModelOptions, NumericalMethod, SimTime,
        SlotIndex, StateRegistry, StateVar, StateVector, StepId, SubBasinId, SvKind,
    };

    // Errors
    pub use freshet_core::{AccessError, ConservationWarning, ProcessError, StepError};

    // Process traits
    pub use freshet_process::{
        Connection, LateralProcess, Process, ProcessContext, ProcessPhase,
    };

    // Common algorithms
    pub use freshet_processes::{
        Abstraction, AbstractionMethod, Infiltration, InfiltrationMethod, LateralFlush,
    };

    // Engine
    pub use freshet_engine::{ConfigError, Engine, FluxLedger, ModelConfig, StepMetrics, StepReport};
}
