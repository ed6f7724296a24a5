//! Precinct and tract boundaries from `GeoJSON`.
//!
//! Only `Polygon` and `MultiPolygon` geometries are accepted. Rings are
//! copied as-is (unclosed rings and bad vertices are the overlay's repair
//! problem); positions with fewer than two coordinates are dropped here.

use std::collections::BTreeMap;
use std::path::Path;

use canvass_analysis_models::{EntityKind, RunReport};
use canvass_geography_models::fips::{abbr_to_fips, is_state_fips, state_abbr};
use canvass_geography_models::{BoundaryShape, CensusTract, Geoid, PolygonRings, Precinct};
use geojson::{Feature, GeoJson, JsonObject, JsonValue, feature::Id};

use crate::demographics::{acs_code_pattern, record_estimate};
use crate::{IngestConfig, IngestError, Ingested};

fn features(content: &str) -> Result<Vec<Feature>, IngestError> {
    match content.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(collection) => Ok(collection.features),
        GeoJson::Feature(feature) => Ok(vec![feature]),
        GeoJson::Geometry(_) => Err(IngestError::NotFeatures),
    }
}

fn ring(positions: &[Vec<f64>], dropped: &mut usize) -> Vec<[f64; 2]> {
    positions
        .iter()
        .filter_map(|p| match p.as_slice() {
            [lon, lat, ..] => Some([*lon, *lat]),
            _ => {
                *dropped += 1;
                None
            }
        })
        .collect()
}

fn polygon(rings: &[Vec<Vec<f64>>], dropped: &mut usize) -> PolygonRings {
    let mut rings = rings.iter().map(|r| ring(r, dropped));
    PolygonRings {
        exterior: rings.next().unwrap_or_default(),
        holes: rings.collect(),
    }
}

const fn type_name(value: &geojson::Value) -> &'static str {
    match value {
        geojson::Value::Point(_) => "Point",
        geojson::Value::MultiPoint(_) => "MultiPoint",
        geojson::Value::LineString(_) => "LineString",
        geojson::Value::MultiLineString(_) => "MultiLineString",
        geojson::Value::Polygon(_) => "Polygon",
        geojson::Value::MultiPolygon(_) => "MultiPolygon",
        geojson::Value::GeometryCollection(_) => "GeometryCollection",
    }
}

/// Converts a feature's geometry. `Err` carries the reason it is unusable.
fn boundary(feature: &Feature, dropped: &mut usize) -> Result<BoundaryShape, String> {
    let Some(geometry) = &feature.geometry else {
        return Err("feature has no geometry".to_string());
    };
    let shape = match &geometry.value {
        geojson::Value::Polygon(rings) => BoundaryShape::single(polygon(rings, dropped)),
        geojson::Value::MultiPolygon(polygons) => BoundaryShape {
            polygons: polygons.iter().map(|p| polygon(p, dropped)).collect(),
        },
        other => return Err(format!("unsupported geometry type {}", type_name(other))),
    };
    if shape.is_empty() {
        return Err("geometry has no vertices".to_string());
    }
    Ok(shape)
}

/// A text-like property value. Numbers are kept apart because a numeric
/// code has already lost any leading zeros.
enum Code {
    Text(String),
    Number(String),
}

fn code(value: Option<&JsonValue>) -> Option<Code> {
    match value? {
        JsonValue::String(s) if !s.trim().is_empty() => Some(Code::Text(s.trim().to_string())),
        JsonValue::Number(n) => Some(Code::Number(n.to_string())),
        _ => None,
    }
}

fn feature_id(feature: &Feature) -> Option<Code> {
    match feature.id.as_ref()? {
        Id::String(s) if !s.trim().is_empty() => Some(Code::Text(s.trim().to_string())),
        Id::Number(n) => Some(Code::Number(n.to_string())),
        Id::String(_) => None,
    }
}

fn text(properties: Option<&JsonObject>, key: &str) -> Option<String> {
    match properties?.get(key)? {
        JsonValue::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn number(properties: Option<&JsonObject>, key: &str) -> Option<f64> {
    match properties?.get(key)? {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Normalizes a state property to a two-letter abbreviation.
fn normalize_state(raw: &str) -> Option<&'static str> {
    if is_state_fips(raw) {
        state_abbr(raw)
    } else {
        abbr_to_fips(raw).and_then(state_abbr)
    }
}

/// Parses precinct features.
///
/// # Errors
///
/// Returns [`IngestError`] if the content is not a `GeoJSON`
/// `FeatureCollection` or `Feature`.
pub fn parse_precincts(
    content: &str,
    config: &IngestConfig,
) -> Result<Ingested<Vec<Precinct>>, IngestError> {
    let mut report = RunReport::new();
    let mut precincts = Vec::new();

    for (index, feature) in features(content)?.iter().enumerate() {
        let properties = feature.properties.as_ref();
        let label = format!("feature {index}");

        let id = match code(properties.and_then(|p| p.get(&config.precinct_id_property)))
            .or_else(|| feature_id(feature))
        {
            Some(Code::Text(id)) => id,
            Some(Code::Number(id)) => {
                report.warn(
                    EntityKind::Precinct,
                    &id,
                    "numeric precinct code; leading zeros may have been lost",
                );
                id
            }
            None => {
                report.exclude(
                    EntityKind::Precinct,
                    label,
                    format!("missing '{}' property", config.precinct_id_property),
                );
                continue;
            }
        };

        let mut dropped = 0;
        let boundary = match boundary(feature, &mut dropped) {
            Ok(boundary) => boundary,
            Err(message) => {
                report.exclude(EntityKind::Precinct, &id, message);
                continue;
            }
        };
        if dropped > 0 {
            report.warn(
                EntityKind::Precinct,
                &id,
                format!("dropped {dropped} positions with fewer than two coordinates"),
            );
        }

        let state = match text(properties, &config.state_property) {
            Some(raw) => {
                let normalized = normalize_state(&raw);
                if normalized.is_none() {
                    report.warn(EntityKind::Precinct, &id, format!("unknown state '{raw}'"));
                }
                normalized.map(ToString::to_string)
            }
            None => None,
        };

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let registered_voters = number(properties, &config.registered_voters_property)
            .filter(|v| *v >= 0.0)
            .map(|v| v.round() as u64);

        precincts.push(Precinct {
            name: text(properties, &config.precinct_name_property).unwrap_or_else(|| id.clone()),
            id,
            county: text(properties, &config.county_property),
            state,
            boundary,
            registered_voters,
        });
    }

    report.processed = precincts.len();
    log::info!(
        "Loaded {} precincts ({} skipped)",
        precincts.len(),
        report.excluded()
    );
    Ok(Ingested::new(precincts, report))
}

/// Parses tract features. Properties shaped like ACS variable codes are
/// read as estimates.
///
/// # Errors
///
/// Returns [`IngestError`] if the content is not a `GeoJSON`
/// `FeatureCollection` or `Feature`.
pub fn parse_tracts(
    content: &str,
    config: &IngestConfig,
) -> Result<Ingested<Vec<CensusTract>>, IngestError> {
    let pattern = acs_code_pattern()?;
    let mut report = RunReport::new();
    let mut tracts = Vec::new();

    for (index, feature) in features(content)?.iter().enumerate() {
        let properties = feature.properties.as_ref();
        let label = format!("feature {index}");

        let raw = match code(properties.and_then(|p| p.get(&config.tract_geoid_property))) {
            Some(Code::Text(raw)) => raw,
            // A numeric GEOID drops the leading zero of states 01-09.
            Some(Code::Number(raw)) => format!("{raw:0>11}"),
            None => {
                report.exclude(
                    EntityKind::Tract,
                    label,
                    format!("missing '{}' property", config.tract_geoid_property),
                );
                continue;
            }
        };
        let geoid = match Geoid::parse(&raw) {
            Ok(geoid) => geoid,
            Err(e) => {
                report.exclude(EntityKind::Tract, label, e.to_string());
                continue;
            }
        };
        if !is_state_fips(geoid.state_fips()) {
            report.warn(
                EntityKind::Tract,
                geoid.as_str(),
                format!("unknown state FIPS '{}'", geoid.state_fips()),
            );
        }

        let mut dropped = 0;
        let boundary = match boundary(feature, &mut dropped) {
            Ok(boundary) => boundary,
            Err(message) => {
                report.exclude(EntityKind::Tract, geoid.as_str(), message);
                continue;
            }
        };
        if dropped > 0 {
            report.warn(
                EntityKind::Tract,
                geoid.as_str(),
                format!("dropped {dropped} positions with fewer than two coordinates"),
            );
        }

        let mut values = BTreeMap::new();
        for (key, value) in properties.into_iter().flatten() {
            if !pattern.is_match(key) {
                continue;
            }
            let raw = match value {
                JsonValue::Null => String::new(),
                JsonValue::String(s) => s.clone(),
                other => other.to_string(),
            };
            let estimate = record_estimate(&mut report, EntityKind::Tract, geoid.as_str(), key, &raw);
            values.insert(key.clone(), estimate);
        }

        tracts.push(CensusTract {
            geoid: geoid.as_str().to_string(),
            boundary,
            land_area_m2: number(properties, &config.land_area_property),
            water_area_m2: number(properties, &config.water_area_property),
            values,
        });
    }

    report.processed = tracts.len();
    log::info!("Loaded {} tracts ({} skipped)", tracts.len(), report.excluded());
    Ok(Ingested::new(tracts, report))
}

/// Reads and parses a precinct `GeoJSON` file.
///
/// # Errors
///
/// Returns [`IngestError`] if the file cannot be read or parsed.
pub fn load_precincts(
    path: &Path,
    config: &IngestConfig,
) -> Result<Ingested<Vec<Precinct>>, IngestError> {
    log::info!("Loading precincts from {}", path.display());
    parse_precincts(&std::fs::read_to_string(path)?, config)
}

/// Reads and parses a tract `GeoJSON` file.
///
/// # Errors
///
/// Returns [`IngestError`] if the file cannot be read or parsed.
pub fn load_tracts(
    path: &Path,
    config: &IngestConfig,
) -> Result<Ingested<Vec<CensusTract>>, IngestError> {
    log::info!("Loading tracts from {}", path.display());
    parse_tracts(&std::fs::read_to_string(path)?, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRECINCTS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {"precinct_id": "074", "name": "Riverdale 7", "county": "Prince George's", "state": "24", "registered_voters": 3120},
                "geometry": {"type": "Polygon", "coordinates": [[[-76.9, 38.9], [-76.89, 38.9], [-76.89, 38.91], [-76.9, 38.91]]]}
            },
            {
                "type": "Feature",
                "properties": {"precinct_id": 74, "state": "MD"},
                "geometry": {"type": "MultiPolygon", "coordinates": [
                    [[[-76.8, 38.9], [-76.79, 38.9], [-76.79, 38.91], [-76.8, 38.9]]],
                    [[[-76.7, 38.9], [-76.69, 38.9], [-76.69, 38.91], [-76.7, 38.9]]]
                ]}
            },
            {
                "type": "Feature",
                "properties": {"precinct_id": "075"},
                "geometry": {"type": "Point", "coordinates": [-76.9, 38.9]}
            },
            {
                "type": "Feature",
                "properties": {"name": "no code"},
                "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]}
            },
            {
                "type": "Feature",
                "id": "076",
                "properties": {"state": "ZZ"},
                "geometry": null
            }
        ]
    }"#;

    #[test]
    fn loads_precincts_and_records_skips() {
        let loaded = parse_precincts(PRECINCTS, &IngestConfig::default()).unwrap();
        let precincts = &loaded.data;

        let ids: Vec<&str> = precincts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["074", "74"]);

        let first = &precincts[0];
        assert_eq!(first.name, "Riverdale 7");
        assert_eq!(first.county.as_deref(), Some("Prince George's"));
        assert_eq!(first.state.as_deref(), Some("MD"));
        assert_eq!(first.registered_voters, Some(3_120));
        // Left unclosed; closing is part of overlay repair.
        assert_eq!(first.boundary.polygons[0].exterior.len(), 4);

        let second = &precincts[1];
        assert_eq!(second.name, "74");
        assert_eq!(second.state.as_deref(), Some("MD"));
        assert_eq!(second.boundary.polygons.len(), 2);

        let report = &loaded.report;
        assert_eq!(report.processed, 2);
        assert_eq!(report.excluded_of(EntityKind::Precinct), 3);
        let excluded: Vec<&str> = report
            .issues
            .iter()
            .filter(|i| i.severity == canvass_analysis_models::Severity::Excluded)
            .map(|i| i.id.as_str())
            .collect();
        assert_eq!(excluded, vec!["075", "feature 3", "076"]);
        assert!(report.issues.iter().any(|i| i.id == "74" && i.message.contains("leading zeros")));
    }

    #[test]
    fn custom_property_names() {
        let content = r#"{"type": "Feature", "properties": {"PRECINCT": "001-A", "PNAME": "North"},
            "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]}}"#;
        let config = IngestConfig {
            precinct_id_property: "PRECINCT".to_string(),
            precinct_name_property: "PNAME".to_string(),
            ..IngestConfig::default()
        };
        let loaded = parse_precincts(content, &config).unwrap();
        assert_eq!(loaded.data[0].id, "001-A");
        assert_eq!(loaded.data[0].name, "North");
    }

    #[test]
    fn bare_geometry_is_rejected() {
        let content = r#"{"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]}"#;
        assert!(matches!(
            parse_precincts(content, &IngestConfig::default()),
            Err(IngestError::NotFeatures)
        ));
    }

    #[test]
    fn loads_tracts_with_estimates() {
        let content = r#"{
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": {"GEOID": "24033802101", "ALAND": 1456789, "AWATER": 0, "NAME": "8021.01", "B01003_001E": 4321, "B19013_001E": -666666666, "B25077_001E": null},
                    "geometry": {"type": "Polygon", "coordinates": [[[-76.9, 38.9], [-76.89, 38.9], [-76.89, 38.91], [-76.9, 38.9]]]}
                },
                {
                    "type": "Feature",
                    "properties": {"GEOID": 1001020100},
                    "geometry": {"type": "Polygon", "coordinates": [[[-86.5, 32.4], [-86.49, 32.4], [-86.49, 32.41], [-86.5, 32.4]]]}
                },
                {
                    "type": "Feature",
                    "properties": {"GEOID": "2403380210"},
                    "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]}
                }
            ]
        }"#;
        let loaded = parse_tracts(content, &IngestConfig::default()).unwrap();
        let tracts = &loaded.data;
        assert_eq!(tracts.len(), 2);

        let first = &tracts[0];
        assert_eq!(first.geoid, "24033802101");
        assert_eq!(first.land_area_m2, Some(1_456_789.0));
        assert_eq!(first.values.get("B01003_001E"), Some(&Some(4_321.0)));
        assert_eq!(first.values.get("B19013_001E"), Some(&None));
        assert_eq!(first.values.get("B25077_001E"), Some(&None));
        assert!(!first.values.contains_key("NAME"));

        assert_eq!(tracts[1].geoid, "01001020100");

        assert_eq!(loaded.report.excluded_of(EntityKind::Tract), 1);
        assert_eq!(loaded.report.warned(), 1);
    }
}
