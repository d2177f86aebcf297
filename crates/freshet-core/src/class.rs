//! Class-level property tables shared by reference across HRUs.
//!
//! Each table is a plain serde struct with reference defaults. Processes
//! read fields directly; the string lookup in `param()` exists only so
//! assembly can validate each process's participating parameters by name.

use serde::{Deserialize, Serialize};
use std::fmt;

// ── Parameter metadata ──────────────────────────────────────────

/// Which property table owns a parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParamClass {
    /// Per-layer soil class.
    Soil,
    /// Land-use / surface class.
    Surface,
    /// Vegetation class.
    Vegetation,
    /// Terrain class.
    Terrain,
    /// Model-wide global parameters.
    Global,
}

impl fmt::Display for ParamClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ParamClass::Soil => "soil",
            ParamClass::Surface => "surface",
            ParamClass::Vegetation => "vegetation",
            ParamClass::Terrain => "terrain",
            ParamClass::Global => "global",
        })
    }
}

/// Physical bound a parameter value must satisfy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamBound {
    /// Any finite value.
    Finite,
    /// Strictly greater than zero.
    Positive,
    /// Zero or greater.
    NonNegative,
    /// Within `[0, 1]`.
    Fraction,
}

impl ParamBound {
    /// Check `value`, returning a description of the violated bound.
    pub fn check(self, value: f64) -> Result<(), &'static str> {
        if !value.is_finite() {
            return Err("must be finite");
        }
        match self {
            ParamBound::Finite => Ok(()),
            ParamBound::Positive if value > 0.0 => Ok(()),
            ParamBound::Positive => Err("must be positive"),
            ParamBound::NonNegative if value >= 0.0 => Ok(()),
            ParamBound::NonNegative => Err("must be non-negative"),
            ParamBound::Fraction if (0.0..=1.0).contains(&value) => Ok(()),
            ParamBound::Fraction => Err("must lie in [0, 1]"),
        }
    }
}

/// A parameter an algorithm variant reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParamInfo {
    /// Upper-case parameter name, e.g. `SCS_CN`.
    pub name: &'static str,
    /// Owning table.
    pub class: ParamClass,
    /// Bound checked at assembly.
    pub bound: ParamBound,
}

impl ParamInfo {
    /// Shorthand constructor usable in `const` tables.
    pub const fn new(name: &'static str, class: ParamClass, bound: ParamBound) -> Self {
        Self { name, class, bound }
    }
}

// ── Soil ────────────────────────────────────────────────────────

/// Properties of one soil horizon type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoilClass {
    /// Class name.
    pub name: String,
    /// Porosity [-].
    pub porosity: f64,
    /// Field capacity as a saturation fraction [-].
    pub field_capacity: f64,
    /// Wilting point as a saturation fraction [-].
    pub sat_wilt: f64,
    /// Volumetric stone fraction [-].
    pub stone_frac: f64,
    /// HBV runoff exponent [-].
    pub hbv_beta: f64,
    /// VIC maximum soil storage depth parameter [mm].
    pub vic_zmax: f64,
    /// VIC minimum soil storage depth parameter [mm].
    pub vic_zmin: f64,
    /// VIC storage distribution exponent [-].
    pub vic_alpha: f64,
    /// ARNO/VIC variable infiltration curve exponent [-].
    pub vic_b_exp: f64,
    /// Maximum percolation rate [mm/d].
    pub max_perc_rate: f64,
    /// UBC soil deficit at which effective impermeable area falls tenfold [mm].
    pub ubc_infil_soil_def: f64,
    /// Saturated hydraulic conductivity [mm/d].
    pub hydraul_cond: f64,
    /// Green-Ampt wetting front suction [mm].
    pub wetting_front_psi: f64,
    /// Standard deviation of log saturated conductivity across the HRU [-].
    pub ksat_std_deviation: f64,
}

impl Default for SoilClass {
    fn default() -> Self {
        Self {
            name: "DEFAULT".into(),
            porosity: 0.4,
            field_capacity: 0.3,
            sat_wilt: 0.1,
            stone_frac: 0.0,
            hbv_beta: 1.0,
            vic_zmax: 100.0,
            vic_zmin: 0.0,
            vic_alpha: 1.0,
            vic_b_exp: 0.3,
            max_perc_rate: 10.0,
            ubc_infil_soil_def: 100.0,
            hydraul_cond: 20.0,
            wetting_front_psi: 100.0,
            ksat_std_deviation: 0.0,
        }
    }
}

impl SoilClass {
    /// Look up a parameter by its configuration name.
    pub fn param(&self, name: &str) -> Option<f64> {
        Some(match name {
            "POROSITY" => self.porosity,
            "FIELD_CAPACITY" => self.field_capacity,
            "SAT_WILT" => self.sat_wilt,
            "STONE_FRAC" => self.stone_frac,
            "HBV_BETA" => self.hbv_beta,
            "VIC_ZMAX" => self.vic_zmax,
            "VIC_ZMIN" => self.vic_zmin,
            "VIC_ALPHA" => self.vic_alpha,
            "VIC_B_EXP" => self.vic_b_exp,
            "MAX_PERC_RATE" => self.max_perc_rate,
            "UBC_INFIL_SOIL_DEF" => self.ubc_infil_soil_def,
            "HYDRAUL_COND" => self.hydraul_cond,
            "WETTING_FRONT_PSI" => self.wetting_front_psi,
            "KSAT_STD_DEVIATION" => self.ksat_std_deviation,
            _ => return None,
        })
    }
}

// ── Surface (land use) ──────────────────────────────────────────

/// Land-use properties: runoff generation, depressions, glaciers and
/// routing response shapes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceClass {
    /// Class name.
    pub name: String,
    /// Impermeable fraction of the HRU [-].
    pub impermeable_frac: f64,
    /// Rational-method runoff coefficient [-].
    pub partition_coeff: f64,
    /// SCS curve number under average antecedent conditions [-].
    pub scs_cn: f64,
    /// SCS initial abstraction as a fraction of retention [-].
    pub scs_ia_fraction: f64,
    /// PRMS maximum saturated area fraction [-].
    pub max_sat_area_frac: f64,
    /// PDM Pareto shape parameter for soil capacity [-].
    pub pdm_b: f64,
    /// HMETS runoff coefficient [-].
    pub hmets_runoff_coeff: f64,
    /// AWBM area fraction of the first store [-].
    pub awbm_areafrac1: f64,
    /// AWBM area fraction of the second store [-].
    pub awbm_areafrac2: f64,
    /// AWBM baseflow index [-].
    pub awbm_bflow_index: f64,
    /// Maximum depression storage [mm].
    pub dep_max: f64,
    /// Fraction of ponded water abstracted per timestep [-].
    pub abst_percent: f64,
    /// Pareto shape parameter for depression capacities [-].
    pub pdmrof_b: f64,
    /// Shape parameter of the wetland deficit distribution [-].
    pub uwfs_b: f64,
    /// Maximum depression outflow rate [mm/d].
    pub dep_max_flow: f64,
    /// Depression outflow exponent [-].
    pub dep_n: f64,
    /// Depression storage below which no outflow occurs [mm].
    pub dep_threshold: f64,
    /// Linear depression outflow coefficient [1/d].
    pub dep_k: f64,
    /// Weir crest width to HRU area ratio [1/m].
    pub dep_crestratio: f64,
    /// Linear depression seepage coefficient [1/d].
    pub dep_seep_k: f64,
    /// Linear lake release coefficient [1/d].
    pub lake_rel_coeff: f64,
    /// Glacier linear storage coefficient [1/d].
    pub glac_storage_coeff: f64,
    /// HBV glacier melt correction factor [-].
    pub hbv_melt_glacier_corr: f64,
    /// HBV-EC minimum glacier storage coefficient [1/d].
    pub hbv_glacier_kmin: f64,
    /// HBV-EC snow attenuation coefficient for glacier release [1/mm].
    pub hbv_glacier_ag: f64,
    /// GR4J unit hydrograph time base x4 [d].
    pub gr4j_x4: f64,
    /// Gamma unit hydrograph shape [-].
    pub gamma_shape: f64,
    /// Gamma unit hydrograph scale [1/d].
    pub gamma_scale: f64,
    /// Second gamma unit hydrograph shape [-].
    pub gamma_shape2: f64,
    /// Second gamma unit hydrograph scale [1/d].
    pub gamma_scale2: f64,
    /// Triangular unit hydrograph time to peak [d].
    pub tri_time_to_peak: f64,
    /// Triangular unit hydrograph time base [d].
    pub tri_time_base: f64,
}

impl Default for SurfaceClass {
    fn default() -> Self {
        Self {
            name: "DEFAULT".into(),
            impermeable_frac: 0.0,
            partition_coeff: 0.5,
            scs_cn: 50.0,
            scs_ia_fraction: 0.2,
            max_sat_area_frac: 0.5,
            pdm_b: 0.5,
            hmets_runoff_coeff: 0.4,
            awbm_areafrac1: 0.134,
            awbm_areafrac2: 0.433,
            awbm_bflow_index: 0.35,
            dep_max: 10.0,
            abst_percent: 0.1,
            pdmrof_b: 0.5,
            uwfs_b: 1.0,
            dep_max_flow: 5.0,
            dep_n: 1.0,
            dep_threshold: 0.0,
            dep_k: 0.1,
            dep_crestratio: 0.001,
            dep_seep_k: 0.01,
            lake_rel_coeff: 0.1,
            glac_storage_coeff: 0.1,
            hbv_melt_glacier_corr: 1.0,
            hbv_glacier_kmin: 0.05,
            hbv_glacier_ag: 0.05,
            gr4j_x4: 1.7,
            gamma_shape: 3.0,
            gamma_scale: 1.0,
            gamma_shape2: 3.0,
            gamma_scale2: 0.5,
            tri_time_to_peak: 1.0,
            tri_time_base: 3.0,
        }
    }
}

impl SurfaceClass {
    /// Look up a parameter by its configuration name.
    pub fn param(&self, name: &str) -> Option<f64> {
        Some(match name {
            "IMPERMEABLE_FRAC" => self.impermeable_frac,
            "PARTITION_COEFF" => self.partition_coeff,
            "SCS_CN" => self.scs_cn,
            "SCS_IA_FRACTION" => self.scs_ia_fraction,
            "MAX_SAT_AREA_FRAC" => self.max_sat_area_frac,
            "PDM_B" => self.pdm_b,
            "HMETS_RUNOFF_COEFF" => self.hmets_runoff_coeff,
            "AWBM_AREAFRAC1" => self.awbm_areafrac1,
            "AWBM_AREAFRAC2" => self.awbm_areafrac2,
            "AWBM_BFLOW_INDEX" => self.awbm_bflow_index,
            "DEP_MAX" => self.dep_max,
            "ABST_PERCENT" => self.abst_percent,
            "PDMROF_B" => self.pdmrof_b,
            "UWFS_B" => self.uwfs_b,
            "DEP_MAX_FLOW" => self.dep_max_flow,
            "DEP_N" => self.dep_n,
            "DEP_THRESHOLD" => self.dep_threshold,
            "DEP_K" => self.dep_k,
            "DEP_CRESTRATIO" => self.dep_crestratio,
            "DEP_SEEP_K" => self.dep_seep_k,
            "LAKE_REL_COEFF" => self.lake_rel_coeff,
            "GLAC_STORAGE_COEFF" => self.glac_storage_coeff,
            "HBV_MELT_GLACIER_CORR" => self.hbv_melt_glacier_corr,
            "HBV_GLACIER_KMIN" => self.hbv_glacier_kmin,
            "HBV_GLACIER_AG" => self.hbv_glacier_ag,
            "GR4J_X4" => self.gr4j_x4,
            "GAMMA_SHAPE" => self.gamma_shape,
            "GAMMA_SCALE" => self.gamma_scale,
            "GAMMA_SHAPE2" => self.gamma_shape2,
            "GAMMA_SCALE2" => self.gamma_scale2,
            "TRI_TIME_TO_PEAK" => self.tri_time_to_peak,
            "TRI_TIME_BASE" => self.tri_time_base,
            _ => return None,
        })
    }
}

// ── Vegetation ──────────────────────────────────────────────────

/// Vegetation properties.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VegetationClass {
    /// Class name.
    pub name: String,
    /// Crop heat units required to reach maturity [CHU].
    pub chu_maturity: f64,
}

impl Default for VegetationClass {
    fn default() -> Self {
        Self {
            name: "DEFAULT".into(),
            chu_maturity: 2800.0,
        }
    }
}

impl VegetationClass {
    /// Look up a parameter by its configuration name.
    pub fn param(&self, name: &str) -> Option<f64> {
        match name {
            "CHU_MATURITY" => Some(self.chu_maturity),
            _ => None,
        }
    }
}

// ── Terrain ─────────────────────────────────────────────────────

/// Terrain properties.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainClass {
    /// Class name.
    pub name: String,
    /// Representative hillslope length [m].
    pub hillslope_length: f64,
    /// Drainage density [km/km²].
    pub drainage_density: f64,
}

impl Default for TerrainClass {
    fn default() -> Self {
        Self {
            name: "DEFAULT".into(),
            hillslope_length: 100.0,
            drainage_density: 1.0,
        }
    }
}

impl TerrainClass {
    /// Look up a parameter by its configuration name.
    pub fn param(&self, name: &str) -> Option<f64> {
        match name {
            "HILLSLOPE_LENGTH" => Some(self.hillslope_length),
            "DRAINAGE_DENSITY" => Some(self.drainage_density),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_reject_out_of_range_values() {
        assert!(ParamBound::Positive.check(0.0).is_err());
        assert!(ParamBound::Positive.check(1e-9).is_ok());
        assert!(ParamBound::NonNegative.check(-1e-9).is_err());
        assert!(ParamBound::Fraction.check(1.01).is_err());
        assert!(ParamBound::Fraction.check(1.0).is_ok());
        assert!(ParamBound::Finite.check(f64::NAN).is_err());
        assert!(ParamBound::Finite.check(-5.0).is_ok());
    }

    #[test]
    fn lookup_by_name_matches_fields() {
        let s = SurfaceClass {
            scs_cn: 80.0,
            ..SurfaceClass::default()
        };
        assert_eq!(s.param("SCS_CN"), Some(80.0));
        assert_eq!(s.param("NOT_A_PARAM"), None);
        assert_eq!(SoilClass::default().param("POROSITY"), Some(0.4));
        assert_eq!(VegetationClass::default().param("CHU_MATURITY"), Some(2800.0));
    }

    #[test]
    fn partial_class_document_fills_defaults() {
        let s: SurfaceClass =
            serde_json::from_str(r#"{ "name": "URBAN", "impermeable_frac": 0.7 }"#).unwrap();
        assert_eq!(s.name, "URBAN");
        assert_eq!(s.impermeable_frac, 0.7);
        assert_eq!(s.dep_max, SurfaceClass::default().dep_max);
    }
}
