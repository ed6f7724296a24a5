//! Wide ACS estimate tables: one row per tract, one column per variable.
//!
//! Two layouts are accepted, matching what the Census Bureau API and its
//! bulk downloads produce:
//!
//! * a CSV with a header row, and
//! * the API's JSON array-of-arrays, whose first row is the header:
//!   `[["B01003_001E","state","county","tract"],["1181","11","001","000101"]]`.
//!
//! Tracts are keyed by a `GEOID` (or `GEO_ID`) column, or by separate
//! `state`, `county`, and `tract` columns. Only columns shaped like ACS
//! variable codes are read; `NAME` and the like are ignored.

use std::io::Read;
use std::path::Path;

use canvass_analysis_models::{EntityKind, RunReport};
use canvass_attribution_models::DemographicTable;
use canvass_geography_models::Geoid;
use regex::Regex;

use crate::{IngestError, Ingested};

/// Shape of an ACS variable code such as `B01003_001E` or `B19013_001M`.
pub const ACS_CODE_PATTERN: &str = r"^[A-Z]{1,2}\d{4,5}[A-Z]{0,3}_\d{3}[A-Z]{1,2}$";

pub(crate) fn acs_code_pattern() -> Result<Regex, IngestError> {
    Ok(Regex::new(ACS_CODE_PATTERN)?)
}

/// One estimate cell, before it becomes an `Option<f64>`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Estimate {
    Value(f64),
    Blank,
    /// The ACS publishes annotations like `-666666666` as negative numbers.
    Sentinel(f64),
    Malformed,
}

pub(crate) fn read_estimate(raw: &str) -> Estimate {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("null") || raw == "N/A" || raw == "-" {
        return Estimate::Blank;
    }
    match raw.replace(',', "").parse::<f64>() {
        Ok(v) if !v.is_finite() => Estimate::Malformed,
        Ok(v) if v < 0.0 => Estimate::Sentinel(v),
        Ok(v) => Estimate::Value(v),
        Err(_) => Estimate::Malformed,
    }
}

/// Converts a cell to an estimate, recording an issue for sentinels and
/// unparseable text. Both become `None`.
pub(crate) fn record_estimate(
    report: &mut RunReport,
    entity: EntityKind,
    id: &str,
    variable: &str,
    raw: &str,
) -> Option<f64> {
    match read_estimate(raw) {
        Estimate::Value(v) => Some(v),
        Estimate::Blank => None,
        Estimate::Sentinel(v) => {
            report.warn(
                entity,
                id,
                format!("{variable}: ACS annotation value {v} treated as missing"),
            );
            None
        }
        Estimate::Malformed => {
            report.warn(
                entity,
                id,
                format!("{variable}: '{}' is not a number; treated as missing", raw.trim()),
            );
            None
        }
    }
}

enum TractKey {
    Geoid(usize),
    Parts {
        state: usize,
        county: usize,
        tract: usize,
    },
}

impl TractKey {
    fn locate(headers: &[String]) -> Result<Self, IngestError> {
        let find = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));

        if let Some(i) = find("GEOID").or_else(|| find("GEO_ID")) {
            return Ok(Self::Geoid(i));
        }
        match (find("state"), find("county"), find("tract")) {
            (Some(state), Some(county), Some(tract)) => Ok(Self::Parts {
                state,
                county,
                tract,
            }),
            _ => Err(IngestError::MissingColumn {
                column: "GEOID (or state, county, tract)".to_string(),
            }),
        }
    }

    fn geoid(&self, row: &[String]) -> Result<Geoid, String> {
        let cell = |i: usize| row.get(i).map_or("", |s| s.trim());
        match *self {
            Self::Geoid(i) => {
                let raw = cell(i);
                // API GEO_IDs carry a summary-level prefix: 1400000US24033802101.
                let raw = raw.rsplit_once("US").map_or(raw, |(_, geoid)| geoid);
                Geoid::parse(raw).map_err(|e| e.to_string())
            }
            Self::Parts {
                state,
                county,
                tract,
            } => Geoid::from_parts(cell(state), cell(county), cell(tract)).map_err(|e| e.to_string()),
        }
    }
}

fn parse_rows(
    headers: &[String],
    rows: impl Iterator<Item = (String, Result<Vec<String>, String>)>,
) -> Result<Ingested<DemographicTable>, IngestError> {
    let key = TractKey::locate(headers)?;
    let pattern = acs_code_pattern()?;
    let variables: Vec<(usize, &str)> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| pattern.is_match(h))
        .map(|(i, h)| (i, h.as_str()))
        .collect();

    if variables.is_empty() {
        log::warn!("No ACS variable columns found in header {headers:?}");
    }

    let mut table = DemographicTable::new();
    let mut report = RunReport::new();

    for (line, row) in rows {
        let row = match row {
            Ok(row) => row,
            Err(message) => {
                report.exclude(EntityKind::DemographicRow, line, message);
                continue;
            }
        };
        let geoid = match key.geoid(&row) {
            Ok(geoid) => geoid,
            Err(message) => {
                report.exclude(EntityKind::DemographicRow, line, message);
                continue;
            }
        };
        if table.has_tract(geoid.as_str()) {
            report.warn(
                EntityKind::Tract,
                geoid.as_str(),
                "repeated GEOID; later values replace earlier ones",
            );
        }
        for &(i, variable) in &variables {
            let raw = row.get(i).map_or("", String::as_str);
            let value = record_estimate(&mut report, EntityKind::Tract, geoid.as_str(), variable, raw);
            table.insert(geoid.as_str(), variable, value);
        }
        report.processed += 1;
    }

    log::info!(
        "Loaded {} variables for {} tracts ({} rows skipped)",
        variables.len(),
        table.tract_count(),
        report.excluded(),
    );

    Ok(Ingested::new(table, report))
}

/// Parses a wide ACS CSV.
///
/// # Errors
///
/// Returns [`IngestError`] if the header cannot be read or has no tract key
/// column.
pub fn parse_acs_csv(reader: impl Read) -> Result<Ingested<DemographicTable>, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader.headers()?.iter().map(ToOwned::to_owned).collect();

    let rows = reader.records().enumerate().map(|(i, result)| {
        let fallback = format!("line {}", i + 2);
        match result {
            Ok(record) => {
                let line = record
                    .position()
                    .map_or(fallback, |p| format!("line {}", p.line()));
                (line, Ok(record.iter().map(ToOwned::to_owned).collect()))
            }
            Err(e) => (fallback, Err(e.to_string())),
        }
    });

    parse_rows(&headers, rows)
}

/// Parses a Census Bureau API JSON response (array of string arrays, header
/// first).
///
/// # Errors
///
/// Returns [`IngestError`] if the document is not an array of arrays, is
/// empty, or has no tract key column.
pub fn parse_census_api_json(content: &str) -> Result<Ingested<DemographicTable>, IngestError> {
    let rows: Vec<Vec<serde_json::Value>> = serde_json::from_str(content)?;
    let mut rows = rows.into_iter();
    let Some(header) = rows.next() else {
        return Err(IngestError::MissingColumn {
            column: "GEOID (or state, county, tract)".to_string(),
        });
    };
    let headers: Vec<String> = header.iter().map(cell_text).collect();

    let rows = rows.enumerate().map(|(i, row)| {
        (
            format!("row {}", i + 1),
            Ok(row.iter().map(cell_text).collect()),
        )
    });

    parse_rows(&headers, rows)
}

fn cell_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Loads an estimate table, choosing the layout by file extension
/// (`.json` for the API layout, anything else as CSV).
///
/// # Errors
///
/// Returns [`IngestError`] if the file cannot be read or parsed.
pub fn load_acs_table(path: &Path) -> Result<Ingested<DemographicTable>, IngestError> {
    log::info!("Loading ACS estimates from {}", path.display());
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        parse_census_api_json(&std::fs::read_to_string(path)?)
    } else {
        parse_acs_csv(std::fs::File::open(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_geoid_keyed_csv() {
        let csv = "\
GEOID,NAME,B01003_001E,B19013_001E
24033802101,Tract 8021.01,4321,81250
24033802102,Tract 8021.02,2876,
";
        let loaded = parse_acs_csv(csv.as_bytes()).unwrap();
        let table = &loaded.data;
        assert_eq!(table.tract_count(), 2);
        assert_eq!(table.value("24033802101", "B01003_001E"), Some(4_321.0));
        assert_eq!(table.value("24033802101", "B19013_001E"), Some(81_250.0));
        assert_eq!(table.value("24033802102", "B19013_001E"), None);
        assert!(table.has_tract("24033802102"));
        assert!(!table.variables().contains("NAME"));
        assert!(loaded.report.is_clean());
        assert_eq!(loaded.report.processed, 2);
    }

    #[test]
    fn negative_annotations_become_missing_with_a_warning() {
        let csv = "GEOID,B19013_001E\n11001000100,-666666666\n";
        let loaded = parse_acs_csv(csv.as_bytes()).unwrap();
        assert_eq!(loaded.data.value("11001000100", "B19013_001E"), None);
        assert_eq!(loaded.report.warned(), 1);
        assert_eq!(loaded.report.issues[0].id, "11001000100");
    }

    #[test]
    fn reads_state_county_tract_columns_and_skips_bad_rows() {
        let csv = "\
B01003_001E,state,county,tract
1181,11,001,000101
99,11,1,000102
";
        let loaded = parse_acs_csv(csv.as_bytes()).unwrap();
        assert_eq!(loaded.data.value("11001000101", "B01003_001E"), Some(1_181.0));
        assert_eq!(loaded.data.tract_count(), 1);
        assert_eq!(loaded.report.excluded_of(EntityKind::DemographicRow), 1);
        assert_eq!(loaded.report.issues[0].id, "line 3");
    }

    #[test]
    fn reads_census_api_json() {
        let json = r#"[
            ["NAME","B01003_001E","B25077_001E","state","county","tract"],
            ["Tract 1.01","1181",null,"11","001","000101"],
            ["Tract 1.02","2040","-666666666","11","001","000102"]
        ]"#;
        let loaded = parse_census_api_json(json).unwrap();
        assert_eq!(loaded.data.value("11001000101", "B01003_001E"), Some(1_181.0));
        assert_eq!(loaded.data.value("11001000101", "B25077_001E"), None);
        assert_eq!(loaded.data.value("11001000102", "B25077_001E"), None);
        assert_eq!(loaded.report.warned(), 1);
    }

    #[test]
    fn strips_summary_level_prefix_from_geo_id() {
        let csv = "GEO_ID,B01003_001E\n1400000US24033802101,4321\n";
        let loaded = parse_acs_csv(csv.as_bytes()).unwrap();
        assert_eq!(loaded.data.value("24033802101", "B01003_001E"), Some(4_321.0));
    }

    #[test]
    fn requires_a_tract_key() {
        let err = parse_acs_csv("NAME,B01003_001E\nx,1\n".as_bytes()).unwrap_err();
        assert!(matches!(err, IngestError::MissingColumn { .. }));
    }

    #[test]
    fn acs_code_shape() {
        let pattern = acs_code_pattern().unwrap();
        for code in ["B01003_001E", "B19013_001M", "B25077_001E", "C17002_002E", "B01001A_001E"] {
            assert!(pattern.is_match(code), "{code}");
        }
        for other in ["NAME", "GEOID", "state", "B01003", "b01003_001e"] {
            assert!(!pattern.is_match(other), "{other}");
        }
    }

    #[test]
    fn estimate_cells() {
        assert_eq!(read_estimate(" 1,234 "), Estimate::Value(1_234.0));
        assert_eq!(read_estimate(""), Estimate::Blank);
        assert_eq!(read_estimate("null"), Estimate::Blank);
        assert_eq!(read_estimate("-999999999"), Estimate::Sentinel(-999_999_999.0));
        assert_eq!(read_estimate("abc"), Estimate::Malformed);
        assert_eq!(read_estimate("NaN"), Estimate::Malformed);
    }
}
