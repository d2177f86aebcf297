//! Per-timestep forcing snapshot and simulation time.

use serde::{Deserialize, Serialize};

/// Meteorological forcing for one HRU over the current timestep.
///
/// Rain that reaches the ground is not carried here: upstream processes
/// (or the caller) deposit it into `PONDED_WATER` before the step.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Forcing {
    /// Total precipitation rate [mm/d].
    pub precip: f64,
    /// Precipitation total over the preceding five days [mm].
    pub precip_5day: f64,
    /// Fraction of precipitation falling as snow [-].
    pub snow_frac: f64,
    /// Mean air temperature [°C].
    pub temp_ave: f64,
    /// Daily maximum air temperature [°C].
    pub temp_daily_max: f64,
    /// Daily minimum air temperature [°C].
    pub temp_daily_min: f64,
    /// Potential melt rate from the energy or degree-day model [mm/d].
    /// Negative values indicate refreezing potential.
    pub potential_melt: f64,
    /// Incoming shortwave radiation [MJ/m²/d].
    pub sw_radia: f64,
    /// Wind speed [m/s].
    pub wind_vel: f64,
}

impl Forcing {
    /// Snowfall rate [mm/d].
    pub fn snowfall(&self) -> f64 {
        (self.precip * self.snow_frac).max(0.0)
    }
}

/// Where the current timestep sits in simulated time.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimTime {
    /// Days since simulation start.
    pub model_time: f64,
    /// Decimal day of year, starting at 0.0 on January 1.
    pub julian_day: f64,
    /// Calendar month, 1 to 12.
    pub month: u32,
    /// Calendar year.
    pub year: i32,
}

impl SimTime {
    /// Build a time value.
    pub fn new(model_time: f64, julian_day: f64, month: u32, year: i32) -> Self {
        Self {
            model_time,
            julian_day,
            month,
            year,
        }
    }

    /// Whether the month lies in the northern-hemisphere growing season
    /// (May through August).
    pub fn is_growing_season(&self) -> bool {
        self.month > 4 && self.month < 9
    }
}

impl Default for SimTime {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1, 2000)
    }
}
