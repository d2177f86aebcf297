//! Hydrological process algorithms for the Freshet engine.
//!
//! Every algorithm family is one [`Process`](freshet_process::Process)
//! implementation selected by a method enum, so a configuration picks a
//! variant by name (`INF_SCS`, `GMELT_UBC`, `CONVOL_GAMMA`, ...) and the
//! connection list follows from the variant.
//!
//! # Typical order within an HRU timestep
//!
//! 1. [`SnowAlbedo`], [`CropHeatUnits`]: self-updates, no mass moves
//! 2. [`Infiltration`]: ponded water → soil / runoff; UBC publishes `b2`
//! 3. [`GlacierInfiltration`]: consumes `b2` on glacier HRUs
//! 4. [`Abstraction`], [`DepressionOverflow`], [`Seepage`]
//! 5. [`GlacierMelt`], [`GlacierRelease`], [`LakeRelease`]
//! 6. [`Convolution`]: routes whatever reached the convolution stores
//!
//! Lateral variants ([`LateralFlush`], [`LateralEquilibrate`]) run after
//! every HRU has committed.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod abstraction;
pub mod convolution;
pub mod crop_heat;
pub mod curve_number;
pub mod depression;
pub mod glacier;
pub mod infiltration;
pub mod lake_release;
pub mod lateral;
pub mod numeric;
pub mod snow_albedo;
mod wiring;

pub use abstraction::{Abstraction, AbstractionMethod};
pub use convolution::{
    convolution_state_vars, Convolution, ConvolutionMode, ConvolutionType, ResponseFunction,
    SmartBinner, UnitHydrograph,
};
pub use crop_heat::{CropHeatMethod, CropHeatUnits};
pub use curve_number::AntecedentCondition;
pub use depression::{DepressionOverflow, DepressionOverflowMethod, Seepage, SeepageMethod};
pub use glacier::{
    GlacierInfiltration, GlacierMelt, GlacierMeltMethod, GlacierRelease, GlacierReleaseMethod,
};
pub use infiltration::{Infiltration, InfiltrationMethod};
pub use lake_release::{LakeRelease, LakeReleaseMethod};
pub use lateral::{LateralEquilibrate, LateralFlush};
pub use snow_albedo::{SnowAlbedo, SnowAlbedoMethod};
