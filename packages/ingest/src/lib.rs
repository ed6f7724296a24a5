#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Ingestion boundary: external files in, typed records out.
//!
//! Whole-file problems (unreadable file, not a `FeatureCollection`, no key
//! column) are [`IngestError`]s. Problems with a single feature or row never
//! abort the load; they are recorded in the returned [`Ingested::report`]
//! and the record is skipped or patched.

pub mod boundaries;
pub mod config;
pub mod demographics;
pub mod votes;

use canvass_analysis_models::RunReport;
use thiserror::Error;

pub use boundaries::{load_precincts, load_tracts, parse_precincts, parse_tracts};
pub use config::IngestConfig;
pub use demographics::{load_acs_table, parse_acs_csv, parse_census_api_json};
pub use votes::{load_votes, parse_votes};

/// Whole-file ingestion failures.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid `GeoJSON`.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// The CSV header or framing is unreadable.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The file is not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The configuration section could not be parsed.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A pattern failed to compile.
    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),

    /// The document is `GeoJSON`, but not features.
    #[error("Expected a GeoJSON FeatureCollection or Feature")]
    NotFeatures,

    /// A required column is absent from the header.
    #[error("Missing required column '{column}'")]
    MissingColumn {
        /// The column that was looked for.
        column: String,
    },
}

/// Records loaded from one source plus the per-record issues found.
#[derive(Debug, Clone, PartialEq)]
pub struct Ingested<T> {
    /// What was loaded.
    pub data: T,
    /// Skipped and patched records.
    pub report: RunReport,
}

impl<T> Ingested<T> {
    /// Pairs loaded data with its report.
    pub const fn new(data: T, report: RunReport) -> Self {
        Self { data, report }
    }
}
