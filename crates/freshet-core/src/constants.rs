//! Physical constants and structural maxima.

/// Millimetres per inch.
pub const MM_PER_INCH: f64 = 25.4;

/// Values below this are treated as zero in rate denominators.
pub const REAL_SMALL: f64 = 1e-12;

/// Maximum number of layers any single state-variable kind may have.
pub const MAX_SV_LAYERS: usize = 160;

/// Maximum number of slots in a state vector.
pub const MAX_STATE_VARS: usize = 500;

/// Maximum number of connections a single process may declare.
pub const MAX_CONNECTIONS: usize = 650;

/// Maximum number of unit-hydrograph bins per convolution process.
pub const MAX_CONVOL_STORES: usize = 50;

/// Standard gravitational acceleration [m/s²].
pub const GRAVITY: f64 = 9.80665;

/// Seconds per day.
pub const SEC_PER_DAY: f64 = 86_400.0;
