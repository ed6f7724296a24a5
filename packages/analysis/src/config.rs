//! Analysis configuration loaded from TOML.
//!
//! Every field has a documented default, so an empty file (or no file at
//! all) yields a usable configuration:
//!
//! ```toml
//! [overlay]
//! min_intersection_area_m2 = 100.0
//! min_precinct_overlap_pct = 1.0
//!
//! [attribution]
//! variables = ["B01003_001E", "B19013_001E"]
//!
//! [scoring]
//! anchor_race = "Governor"
//! max_margin_pct = 10.0
//! min_total_votes = 25
//! no_pool_policy = "separate_tier"
//! ```

use std::path::Path;

use canvass_attribution::AttributionConfig;
use canvass_flippability::ScoringConfig;
use canvass_overlay::OverlayConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML for this schema.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration could not be rendered as TOML.
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value is out of range.
    #[error("Invalid {field}: {message}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },
}

/// Thresholds for every stage of an analysis run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Overlay filtering and repair.
    pub overlay: OverlayConfig,
    /// Demographic attribution.
    pub attribution: AttributionConfig,
    /// Flippability scoring.
    pub scoring: ScoringConfig,
}

impl AnalysisConfig {
    /// Parses and validates a TOML document. Unknown tables are ignored so
    /// the same file can carry ingestion settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses, and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, parsed, or
    /// validated.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        log::info!("Loading analysis configuration from {}", path.display());
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    /// Renders the configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Serialize`] if rendering fails.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }

    /// Checks that every threshold is in range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let overlay = &self.overlay;
        non_negative(
            "overlay.min_intersection_area_m2",
            overlay.min_intersection_area_m2,
        )?;
        percentage(
            "overlay.min_precinct_overlap_pct",
            overlay.min_precinct_overlap_pct,
        )?;
        percentage(
            "overlay.repair_area_tolerance_pct",
            overlay.repair_area_tolerance_pct,
        )?;
        if !(0.0..1.0).contains(&overlay.containment_tolerance) {
            return Err(invalid(
                "overlay.containment_tolerance",
                format!("{} is not in [0, 1)", overlay.containment_tolerance),
            ));
        }
        if !(overlay.standard_parallel_deg.abs() < 90.0) {
            return Err(invalid(
                "overlay.standard_parallel_deg",
                format!("{} is not strictly between -90 and 90", overlay.standard_parallel_deg),
            ));
        }

        let attribution = &self.attribution;
        if attribution.variables.is_empty() {
            return Err(invalid("attribution.variables", "at least one variable is required"));
        }
        if let Some(blank) = attribution.variables.iter().find(|v| v.trim().is_empty()) {
            return Err(invalid(
                "attribution.variables",
                format!("blank variable code '{blank}'"),
            ));
        }
        non_negative("attribution.weight_epsilon", attribution.weight_epsilon)?;

        let scoring = &self.scoring;
        if scoring.anchor_race.trim().is_empty() {
            return Err(invalid("scoring.anchor_race", "must not be blank"));
        }
        percentage("scoring.max_margin_pct", scoring.max_margin_pct)?;

        Ok(())
    }
}

fn invalid(field: &'static str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        message: message.into(),
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("{value} must be a non-negative number")))
    }
}

fn percentage(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(field, format!("{value} is not a percentage in [0, 100]")))
    }
}
