//! # Settings Module
//!
//! ## Purpose
//! Holds the knobs of a mass-balance analysis. Every numeric comparison of the
//! analysis (zero snapping, sign tests, pivot selection, stoichiometry
//! equality) uses the single `tolerance` defined here.
//!
//! ## Key Features
//! - **Defaults**: `AnalysisSettings::default()` reproduces the reference behaviour
//! - **Validation**: `validate()` rejects non-finite or non-positive tolerances and unknown log levels
//! - **Persistence**: serde (de)serialisation, see `Utils::load_from_file::{load_settings_from_file, save_settings_to_file}`
//!
//! ## Usage Pattern
//! ```rust
//! use StoichLint::settings::AnalysisSettings;
//!
//! let mut settings = AnalysisSettings::default();
//! settings.use_rref = false;
//! settings.validate().unwrap();
//! ```
//!
//! ## Fields
//! | Field | Default | Meaning |
//! |-------|---------|---------|
//! | tolerance | 1e-4 | values with smaller magnitude are zero |
//! | use_rref | true | run the reduced row-echelon stage after the echelon stage |
//! | reduce_after_canceling | false | reduce the remaining reactions even when canceling errors exist |
//! | recheck_cycles_after_reduction | true | search for new inequality cycles after the reduction |
//! | log_level | "info" | level of the terminal logger of the binary |

use crate::MassBalance::errors::MassBalanceError;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const DEFAULT_TOLERANCE: f64 = 1e-4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    pub tolerance: f64,
    pub use_rref: bool,
    pub reduce_after_canceling: bool,
    pub recheck_cycles_after_reduction: bool,
    pub log_level: String,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            use_rref: true,
            reduce_after_canceling: false,
            recheck_cycles_after_reduction: true,
            log_level: "info".to_string(),
        }
    }
}

impl AnalysisSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Checks that the settings can drive an analysis.
    ///
    /// # Errors
    /// `MassBalanceError::InvalidSettings` if the tolerance is not finite and
    /// positive or the log level is not one of off/error/warn/info/debug/trace.
    pub fn validate(&self) -> Result<(), MassBalanceError> {
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(MassBalanceError::InvalidSettings(format!(
                "tolerance must be finite and positive, got {}",
                self.tolerance
            )));
        }
        self.log_level_filter()?;
        Ok(())
    }

    pub fn log_level_filter(&self) -> Result<LevelFilter, MassBalanceError> {
        LevelFilter::from_str(&self.log_level).map_err(|_| {
            MassBalanceError::InvalidSettings(format!("unknown log level '{}'", self.log_level))
        })
    }
}
