//! Property and column names read from input files.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::IngestError;

/// Names of the `GeoJSON` properties that carry record attributes.
///
/// Read from the `[ingest]` table of the analysis configuration file; every
/// other table is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct IngestConfig {
    /// Precinct code property.
    pub precinct_id_property: String,
    /// Precinct display-name property.
    pub precinct_name_property: String,
    /// County name property on precinct features.
    pub county_property: String,
    /// State property on precinct features (abbreviation or FIPS code).
    pub state_property: String,
    /// Registered-voter count property on precinct features.
    pub registered_voters_property: String,
    /// Tract GEOID property.
    pub tract_geoid_property: String,
    /// Tract land-area property (m²).
    pub land_area_property: String,
    /// Tract water-area property (m²).
    pub water_area_property: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            precinct_id_property: "precinct_id".to_string(),
            precinct_name_property: "name".to_string(),
            county_property: "county".to_string(),
            state_property: "state".to_string(),
            registered_voters_property: "registered_voters".to_string(),
            tract_geoid_property: "GEOID".to_string(),
            land_area_property: "ALAND".to_string(),
            water_area_property: "AWATER".to_string(),
        }
    }
}

#[derive(Deserialize, Default)]
struct Document {
    #[serde(default)]
    ingest: IngestConfig,
}

impl IngestConfig {
    /// Extracts the `[ingest]` table from a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Toml`] if the document is malformed.
    pub fn from_toml_str(content: &str) -> Result<Self, IngestError> {
        let document: Document = toml::from_str(content)?;
        Ok(document.ingest)
    }

    /// Reads the `[ingest]` table from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, IngestError> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_only_the_ingest_table() {
        let config = IngestConfig::from_toml_str(
            r#"
            [scoring]
            anchor_race = "Governor"

            [ingest]
            precinct_id_property = "PRECINCT"
            tract_geoid_property = "GEOID20"
            "#,
        )
        .unwrap();
        assert_eq!(config.precinct_id_property, "PRECINCT");
        assert_eq!(config.tract_geoid_property, "GEOID20");
        assert_eq!(config.precinct_name_property, "name");
    }

    #[test]
    fn missing_table_means_defaults() {
        assert_eq!(
            IngestConfig::from_toml_str("").unwrap(),
            IngestConfig::default()
        );
    }
}
