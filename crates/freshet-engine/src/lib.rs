//! Integration loop for the Freshet hydrology engine.
//!
//! [`Engine`] owns the HRUs, the process pipeline and the flux ledgers.
//! Each [`step`](Engine::step) runs every process on every enabled HRU,
//! commits the accumulated deltas atomically, then runs the lateral
//! exchange pass across HRUs. A failed step leaves all state untouched.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod engine;
pub mod flux;
pub mod metrics;
mod scratch;

pub use config::{ConfigError, ModelConfig};
pub use engine::{Engine, StepReport};
pub use flux::FluxLedger;
pub use metrics::StepMetrics;
