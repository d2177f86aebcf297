//! Glacier processes: melt of ice into glacier storage, release of
//! glacier storage to surface water, and infiltration of rain on glacier
//! HRUs.

pub mod infiltration;
pub mod melt;
pub mod release;

pub use infiltration::GlacierInfiltration;
pub use melt::{GlacierMelt, GlacierMeltMethod};
pub use release::{GlacierRelease, GlacierReleaseMethod};
