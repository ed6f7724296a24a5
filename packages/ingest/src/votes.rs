//! Precinct-level vote results from CSV.
//!
//! Expected columns (any order, extra columns ignored): `election_id`,
//! `precinct_id`, `race_name`, `candidate_party`, `vote_count`. Precinct
//! codes are kept as text so zero padding survives.

use std::io::Read;
use std::path::Path;

use canvass_analysis_models::{EntityKind, RunReport};
use canvass_election_models::{Party, RaceResult};
use serde::Deserialize;

use crate::{IngestError, Ingested};

const REQUIRED_COLUMNS: &[&str] = &[
    "election_id",
    "precinct_id",
    "race_name",
    "candidate_party",
    "vote_count",
];

#[derive(Debug, Deserialize)]
struct VoteRow {
    election_id: String,
    precinct_id: String,
    race_name: String,
    candidate_party: String,
    vote_count: String,
}

impl VoteRow {
    fn into_result(self) -> Result<RaceResult, String> {
        if self.precinct_id.is_empty() {
            return Err("blank precinct_id".to_string());
        }
        if self.race_name.is_empty() {
            return Err("blank race_name".to_string());
        }
        let vote_count = self
            .vote_count
            .replace(',', "")
            .parse::<u64>()
            .map_err(|_| format!("vote_count '{}' is not a non-negative integer", self.vote_count))?;

        Ok(RaceResult {
            election_id: self.election_id,
            precinct_id: self.precinct_id,
            race_name: self.race_name,
            candidate_party: Party::from_label(&self.candidate_party),
            vote_count,
        })
    }
}

/// Parses a vote results CSV. Malformed rows are skipped and reported.
///
/// # Errors
///
/// Returns [`IngestError`] if the header cannot be read or lacks a
/// required column.
pub fn parse_votes(reader: impl Read) -> Result<Ingested<Vec<RaceResult>>, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    if let Some(missing) = REQUIRED_COLUMNS
        .iter()
        .find(|column| !headers.iter().any(|h| h == **column))
    {
        return Err(IngestError::MissingColumn {
            column: (*missing).to_string(),
        });
    }

    let mut report = RunReport::new();
    let mut results = Vec::new();

    for (i, record) in reader.records().enumerate() {
        let fallback = format!("line {}", i + 2);
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                report.exclude(EntityKind::VoteRow, fallback, e.to_string());
                continue;
            }
        };
        let line = record
            .position()
            .map_or(fallback, |p| format!("line {}", p.line()));

        let parsed = record
            .deserialize::<VoteRow>(Some(&headers))
            .map_err(|e| e.to_string())
            .and_then(VoteRow::into_result);

        match parsed {
            Ok(result) => results.push(result),
            Err(message) => report.exclude(EntityKind::VoteRow, line, message),
        }
    }

    report.processed = results.len();
    log::info!(
        "Loaded {} vote rows ({} skipped)",
        results.len(),
        report.excluded()
    );
    Ok(Ingested::new(results, report))
}

/// Reads and parses a vote results CSV file.
///
/// # Errors
///
/// Returns [`IngestError`] if the file cannot be read or parsed.
pub fn load_votes(path: &Path) -> Result<Ingested<Vec<RaceResult>>, IngestError> {
    log::info!("Loading vote results from {}", path.display());
    parse_votes(std::fs::File::open(path)?)
}
