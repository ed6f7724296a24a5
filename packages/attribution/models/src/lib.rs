#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Demographic table and precinct attribution result types.
//!
//! A missing estimate is always `None`, never zero: "no data" and "zero
//! population" must stay distinguishable all the way to the report.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use canvass_geography_models::CensusTract;
use serde::{Deserialize, Serialize};

/// Total population.
pub const TOTAL_POPULATION: &str = "B01003_001E";
/// Housing units.
pub const HOUSING_UNITS: &str = "B25001_001E";
/// Median household income (dollars).
pub const MEDIAN_HOUSEHOLD_INCOME: &str = "B19013_001E";
/// Median home value (dollars).
pub const MEDIAN_HOME_VALUE: &str = "B25077_001E";

/// The variables attributed when none are configured.
pub const DEFAULT_VARIABLES: &[&str] = &[
    TOTAL_POPULATION,
    HOUSING_UNITS,
    MEDIAN_HOUSEHOLD_INCOME,
    MEDIAN_HOME_VALUE,
];

/// Tract-level estimates keyed by GEOID, then by ACS variable code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DemographicTable {
    rows: BTreeMap<String, BTreeMap<String, Option<f64>>>,
}

impl DemographicTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from the values carried on each tract.
    #[must_use]
    pub fn from_tracts(tracts: &[CensusTract]) -> Self {
        let mut table = Self::new();
        for tract in tracts {
            for (variable, value) in &tract.values {
                table.insert(&tract.geoid, variable, *value);
            }
        }
        table
    }

    /// Records one estimate. A later insert for the same cell wins.
    pub fn insert(&mut self, geoid: &str, variable: &str, value: Option<f64>) {
        self.rows
            .entry(geoid.to_string())
            .or_default()
            .insert(variable.to_string(), value);
    }

    /// Merges another table into this one; `other` wins on conflicts.
    pub fn extend(&mut self, other: Self) {
        for (geoid, values) in other.rows {
            self.rows.entry(geoid).or_default().extend(values);
        }
    }

    /// The estimate for a tract and variable, or `None` if the tract is
    /// unknown, lacks the variable, or has a null estimate.
    #[must_use]
    pub fn value(&self, geoid: &str, variable: &str) -> Option<f64> {
        self.rows.get(geoid)?.get(variable).copied().flatten()
    }

    /// Returns `true` if the table has any row for the tract.
    #[must_use]
    pub fn has_tract(&self, geoid: &str) -> bool {
        self.rows.contains_key(geoid)
    }

    /// Number of tracts with at least one cell.
    #[must_use]
    pub fn tract_count(&self) -> usize {
        self.rows.len()
    }

    /// GEOIDs with at least one cell, in order.
    pub fn geoids(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    /// Every variable code present in the table.
    #[must_use]
    pub fn variables(&self) -> BTreeSet<&str> {
        self.rows
            .values()
            .flat_map(|values| values.keys().map(String::as_str))
            .collect()
    }
}

/// One attributed estimate for a precinct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributedDemographic {
    /// Precinct code.
    pub precinct_id: String,
    /// ACS variable code.
    pub variable_code: String,
    /// Area-weighted estimate, or `None` if no overlapping tract has one.
    pub weighted_value: Option<f64>,
    /// Tracts whose non-null value entered the estimate.
    pub contributing_tract_count: usize,
    /// Overlapping tracts skipped because their value was null or missing.
    pub null_tract_count: usize,
    /// Sum of the area weights actually used (0 when the value is `None`).
    pub total_weight: f64,
}

/// How many precincts received a value for a variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableCoverage {
    /// ACS variable code.
    pub variable_code: String,
    /// Precincts with a non-null attributed value.
    pub precincts_with_data: usize,
    /// Precincts attributed in the run.
    pub precincts_total: usize,
}

impl VariableCoverage {
    /// Returns `true` if every precinct has a value.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.precincts_with_data == self.precincts_total
    }
}

impl fmt::Display for VariableCoverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} precincts have data",
            self.precincts_with_data, self.precincts_total
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvass_geography_models::BoundaryShape;

    #[test]
    fn null_and_missing_cells_read_as_none() {
        let mut table = DemographicTable::new();
        table.insert("11001000100", TOTAL_POPULATION, Some(0.0));
        table.insert("11001000100", MEDIAN_HOUSEHOLD_INCOME, None);

        assert_eq!(table.value("11001000100", TOTAL_POPULATION), Some(0.0));
        assert_eq!(table.value("11001000100", MEDIAN_HOUSEHOLD_INCOME), None);
        assert_eq!(table.value("11001000100", HOUSING_UNITS), None);
        assert_eq!(table.value("11001000200", TOTAL_POPULATION), None);
    }

    #[test]
    fn builds_from_tract_values() {
        let tract = CensusTract {
            geoid: "11001000100".to_string(),
            boundary: BoundaryShape::default(),
            land_area_m2: None,
            water_area_m2: None,
            values: BTreeMap::from([(TOTAL_POPULATION.to_string(), Some(4_200.0))]),
        };
        let table = DemographicTable::from_tracts(&[tract]);
        assert_eq!(table.tract_count(), 1);
        assert_eq!(table.value("11001000100", TOTAL_POPULATION), Some(4_200.0));
        assert_eq!(table.variables(), BTreeSet::from([TOTAL_POPULATION]));
    }

    #[test]
    fn extend_overrides_cells() {
        let mut a = DemographicTable::new();
        a.insert("1", TOTAL_POPULATION, None);
        a.insert("1", HOUSING_UNITS, Some(10.0));
        let mut b = DemographicTable::new();
        b.insert("1", TOTAL_POPULATION, Some(25.0));
        a.extend(b);
        assert_eq!(a.value("1", TOTAL_POPULATION), Some(25.0));
        assert_eq!(a.value("1", HOUSING_UNITS), Some(10.0));
    }

    #[test]
    fn coverage_renders_as_fraction() {
        let coverage = VariableCoverage {
            variable_code: TOTAL_POPULATION.to_string(),
            precincts_with_data: 8,
            precincts_total: 9,
        };
        assert_eq!(coverage.to_string(), "8/9 precincts have data");
        assert!(!coverage.is_complete());
    }
}
