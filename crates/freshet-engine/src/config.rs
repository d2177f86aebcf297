//! Model configuration, validation, and error types.
//!
//! [`ModelConfig`] is the assembled model handed to
//! [`Engine::new`](crate::Engine::new). [`validate()`](ModelConfig::validate)
//! checks structural invariants; the engine constructor then initialises
//! the processes and calls `validate_pipeline()` itself to obtain the
//! [`ConnectionPlan`](freshet_process::ConnectionPlan).

use std::fmt;

use freshet_core::{GlobalParams, Hru, ModelOptions, ProcessError, StateRegistry};
use freshet_process::{
    validate_parameters, validate_pipeline, LateralProcess, PipelineError, Process,
};
use indexmap::IndexMap;
use thiserror::Error;

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected while assembling a model. All are fatal to the run.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// Process pipeline validation failed.
    #[error("pipeline: {0}")]
    Pipeline(#[from] PipelineError),
    /// A process or lateral process rejected its configuration.
    #[error(transparent)]
    Process(#[from] ProcessError),
    /// The model has no HRUs.
    #[error("model has no HRUs")]
    NoHrus,
    /// An HRU failed its own geometry and class checks.
    #[error("HRU {index}: {reason}")]
    InvalidHru {
        /// HRU position.
        index: usize,
        /// What was wrong.
        reason: String,
    },
    /// An HRU's state vector does not match the registry.
    #[error("HRU {index} has {len} state slots, registry has {expected}")]
    StateLengthMismatch {
        /// HRU position.
        index: usize,
        /// Length found.
        len: usize,
        /// Registry length.
        expected: usize,
    },
    /// A group lists an HRU position that does not exist.
    #[error("group '{group}' references HRU {index}, model has {count}")]
    InvalidGroupMember {
        /// Group name.
        group: String,
        /// Offending position.
        index: usize,
        /// Number of HRUs.
        count: usize,
    },
    /// Run options violate an invariant.
    #[error("invalid options: {reason}")]
    InvalidOptions {
        /// Which invariant was violated.
        reason: String,
    },
}

// ── ModelConfig ────────────────────────────────────────────────────

/// Complete input for constructing an [`Engine`](crate::Engine).
pub struct ModelConfig {
    /// Slot table shared by every HRU.
    pub registry: StateRegistry,
    /// HRUs with their classes, forcing and initial state.
    pub hrus: Vec<Hru>,
    /// Named HRU groups, by HRU position. Used by lateral processes.
    pub groups: IndexMap<String, Vec<usize>>,
    /// Processes in execution order.
    pub processes: Vec<Box<dyn Process>>,
    /// Lateral processes in execution order, run after the HRU pass.
    pub laterals: Vec<Box<dyn LateralProcess>>,
    /// Run options.
    pub options: ModelOptions,
    /// Global parameters.
    pub params: GlobalParams,
}

impl ModelConfig {
    /// A configuration with default options and parameters and no groups
    /// or lateral processes.
    pub fn new(registry: StateRegistry, hrus: Vec<Hru>, processes: Vec<Box<dyn Process>>) -> Self {
        Self {
            registry,
            hrus,
            groups: IndexMap::new(),
            processes,
            laterals: Vec::new(),
            options: ModelOptions::default(),
            params: GlobalParams::default(),
        }
    }

    /// Add a named HRU group.
    pub fn with_group(mut self, name: impl Into<String>, members: Vec<usize>) -> Self {
        self.groups.insert(name.into(), members);
        self
    }

    /// Append a lateral process.
    pub fn with_lateral(mut self, lateral: Box<dyn LateralProcess>) -> Self {
        self.laterals.push(lateral);
        self
    }

    /// Replace the run options.
    pub fn with_options(mut self, options: ModelOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the global parameters.
    pub fn with_params(mut self, params: GlobalParams) -> Self {
        self.params = params;
        self
    }

    /// Validate all structural invariants.
    ///
    /// Pure validation: the plan built by `validate_pipeline()` is
    /// discarded here and rebuilt by the engine constructor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // 1. Options.
        let o = &self.options;
        if !o.timestep.is_finite() || o.timestep <= 0.0 {
            return Err(ConfigError::InvalidOptions {
                reason: format!("timestep must be finite and positive, got {}", o.timestep),
            });
        }
        if !o.conservation_tolerance.is_finite() || o.conservation_tolerance < 0.0 {
            return Err(ConfigError::InvalidOptions {
                reason: format!(
                    "conservation_tolerance must be finite and non-negative, got {}",
                    o.conservation_tolerance
                ),
            });
        }

        // 2. HRUs.
        if self.hrus.is_empty() {
            return Err(ConfigError::NoHrus);
        }
        let expected = self.registry.len();
        for (index, hru) in self.hrus.iter().enumerate() {
            hru.validate()
                .map_err(|reason| ConfigError::InvalidHru { index, reason })?;
            let len = hru.state().len();
            if len != expected {
                return Err(ConfigError::StateLengthMismatch {
                    index,
                    len,
                    expected,
                });
            }
        }

        // 3. Groups.
        let count = self.hrus.len();
        for (group, members) in &self.groups {
            if let Some(&index) = members.iter().find(|&&k| k >= count) {
                return Err(ConfigError::InvalidGroupMember {
                    group: group.clone(),
                    index,
                    count,
                });
            }
        }

        // 4. Pipeline structure.
        let _ = validate_pipeline(&self.processes, &self.registry, o.timestep)?;

        // 5. Parameter bounds on every HRU each process is active on.
        validate_parameters(&self.processes, &self.laterals, &self.hrus, &self.params)?;

        Ok(())
    }
}

impl fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.processes.iter().map(|p| p.name()).collect();
        let laterals: Vec<&str> = self.laterals.iter().map(|p| p.name()).collect();
        f.debug_struct("ModelConfig")
            .field("slots", &self.registry.len())
            .field("hrus", &self.hrus.len())
            .field("groups", &self.groups.keys().collect::<Vec<_>>())
            .field("processes", &names)
            .field("laterals", &laterals)
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use freshet_core::{HruKind, StateVar, SvKind};
    use freshet_test_utils::{ConstTransfer, TestBasin};

    fn valid_config() -> ModelConfig {
        let (registry, hrus) = TestBasin::new()
            .hru(HruKind::Standard, 1.0, 0)
            .hru(HruKind::Standard, 2.0, 0)
            .build();
        let p = ConstTransfer::new(
            "const",
            &registry,
            StateVar::single(SvKind::PondedWater),
            StateVar::single(SvKind::SurfaceWater),
            1.0,
        )
        .unwrap();
        ModelConfig::new(registry, hrus, vec![Box::new(p)])
    }

    #[test]
    fn validate_valid_config_succeeds() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn validate_empty_processes_fails() {
        let mut cfg = valid_config();
        cfg.processes.clear();
        match cfg.validate() {
            Err(ConfigError::Pipeline(PipelineError::EmptyPipeline)) => {}
            other => panic!("expected Pipeline(EmptyPipeline), got {other:?}"),
        }
    }

    #[test]
    fn validate_invalid_timestep_fails() {
        let mut cfg = valid_config();
        cfg.options.timestep = f64::NAN;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidOptions { .. })
        ));
        cfg.options.timestep = 0.0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidOptions { .. })
        ));
    }

    #[test]
    fn validate_negative_tolerance_fails() {
        let mut cfg = valid_config();
        cfg.options.conservation_tolerance = -1.0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidOptions { .. })
        ));
    }

    #[test]
    fn validate_no_hrus_fails() {
        let mut cfg = valid_config();
        cfg.hrus.clear();
        assert_eq!(cfg.validate(), Err(ConfigError::NoHrus));
    }

    #[test]
    fn validate_bad_area_names_hru() {
        let mut cfg = valid_config();
        cfg.hrus[1].area = 0.0;
        match cfg.validate() {
            Err(ConfigError::InvalidHru { index: 1, .. }) => {}
            other => panic!("expected InvalidHru(1), got {other:?}"),
        }
    }

    #[test]
    fn validate_state_length_mismatch_fails() {
        let mut cfg = valid_config();
        let expected = cfg.registry.len();
        cfg.hrus[0] = freshet_core::Hru::new(freshet_core::HruId(0), HruKind::Standard, 1);
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::StateLengthMismatch {
                index: 0,
                len: 1,
                expected,
            })
        );
    }

    #[test]
    fn validate_group_out_of_range_fails() {
        let cfg = valid_config().with_group("outlets", vec![0, 5]);
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::InvalidGroupMember {
                group: "outlets".into(),
                index: 5,
                count: 2,
            })
        );
    }

    #[test]
    fn debug_lists_process_names() {
        let s = format!("{:?}", valid_config());
        assert!(s.contains("const"));
        assert!(s.contains("hrus: 2"));
    }
}
