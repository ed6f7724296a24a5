#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Area-weighted attribution of census tract demographics to precincts.
//!
//! Every tract that survives the overlay sliver filters gets a weight equal
//! to its share of the precinct's covered area. For each variable the
//! estimate is the weighted mean over tracts that actually have a value;
//! tracts with a null or missing value drop out of both numerator and
//! denominator. A single dominant tract needs no special case: with no
//! other contributors its weight is 1 and its value passes through exactly.

use canvass_attribution_models::{
    AttributedDemographic, DEFAULT_VARIABLES, DemographicTable, VariableCoverage,
};
use canvass_geography_models::Intersection;
use canvass_overlay::PrecinctOverlay;
use serde::{Deserialize, Serialize};

/// Attribution settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct AttributionConfig {
    /// ACS variable codes to attribute.
    pub variables: Vec<String>,
    /// Total weights below this are treated as "no data".
    pub weight_epsilon: f64,
}

impl Default for AttributionConfig {
    fn default() -> Self {
        Self {
            variables: DEFAULT_VARIABLES.iter().map(ToString::to_string).collect(),
            weight_epsilon: 1.0e-6,
        }
    }
}

/// Normalized area weights, ordered by tract GEOID.
///
/// Weights sum to 1 unless the intersection list is empty or has no area.
#[must_use]
pub fn tract_weights(intersections: &[Intersection]) -> Vec<(&str, f64)> {
    let mut ordered: Vec<&Intersection> = intersections.iter().collect();
    ordered.sort_by(|a, b| a.tract_geoid.cmp(&b.tract_geoid));

    let total: f64 = ordered.iter().map(|i| i.intersection_area_m2).sum();
    if total <= 0.0 {
        return Vec::new();
    }

    ordered
        .into_iter()
        .map(|i| (i.tract_geoid.as_str(), i.intersection_area_m2 / total))
        .collect()
}

/// Attributes one variable to one precinct.
#[must_use]
pub fn attribute_variable(
    precinct_id: &str,
    weights: &[(&str, f64)],
    table: &DemographicTable,
    variable: &str,
    config: &AttributionConfig,
) -> AttributedDemographic {
    let mut weighted_sum = 0.0;
    let mut total_weight = 0.0;
    let mut contributing_tract_count = 0;
    let mut null_tract_count = 0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;

    for &(geoid, weight) in weights {
        let Some(value) = table.value(geoid, variable) else {
            null_tract_count += 1;
            continue;
        };
        weighted_sum += weight * value;
        total_weight += weight;
        contributing_tract_count += 1;
        min = min.min(value);
        max = max.max(value);
    }

    let weighted_value = if total_weight > config.weight_epsilon {
        // Clamp away rounding drift so the convex-combination bound holds.
        Some((weighted_sum / total_weight).clamp(min, max))
    } else {
        total_weight = 0.0;
        None
    };

    if total_weight > 1.0 + config.weight_epsilon {
        log::warn!("Precinct {precinct_id} {variable}: total weight {total_weight} exceeds 1");
    }

    AttributedDemographic {
        precinct_id: precinct_id.to_string(),
        variable_code: variable.to_string(),
        weighted_value,
        contributing_tract_count,
        null_tract_count,
        total_weight,
    }
}

/// Attributes every configured variable to one precinct, in configuration
/// order.
#[must_use]
pub fn attribute_precinct(
    overlay: &PrecinctOverlay,
    table: &DemographicTable,
    config: &AttributionConfig,
) -> Vec<AttributedDemographic> {
    let weights = tract_weights(&overlay.intersections);
    if weights.is_empty() {
        log::debug!("Precinct {} has no contributing tracts", overlay.precinct_id);
    }

    config
        .variables
        .iter()
        .map(|variable| attribute_variable(&overlay.precinct_id, &weights, table, variable, config))
        .collect()
}

/// Counts, per variable, how many precincts received a value.
#[must_use]
pub fn coverage(
    results: &[AttributedDemographic],
    variables: &[String],
    precincts_total: usize,
) -> Vec<VariableCoverage> {
    variables
        .iter()
        .map(|variable| VariableCoverage {
            variable_code: variable.clone(),
            precincts_with_data: results
                .iter()
                .filter(|r| &r.variable_code == variable && r.weighted_value.is_some())
                .count(),
            precincts_total,
        })
        .collect()
}
