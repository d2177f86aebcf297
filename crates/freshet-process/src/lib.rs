//! Process trait, rate context and pipeline validation for Freshet.
//!
//! A [`Process`] is one configured hydrological algorithm. It owns a fixed
//! list of [`Connection`]s resolved at assembly, computes one rate per
//! connection each timestep and clips those rates against the storages it
//! touches. [`LateralProcess`] is the cross-HRU variant, run in a second
//! pass after every HRU has committed.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod constraint;
pub mod context;
pub mod lateral;
pub mod pipeline;
pub mod process;

pub use context::{HruAuxiliary, ProcessContext};
pub use lateral::{HruTopology, LateralConnection, LateralContext, LateralProcess};
pub use pipeline::{validate_parameters, validate_pipeline, ConnectionPlan, PipelineError};
pub use process::{Connection, Connections, Process, ProcessPhase};
