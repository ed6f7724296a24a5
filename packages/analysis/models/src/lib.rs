#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Data-quality issue and run report types.
//!
//! Every per-record problem (a bad geometry, a malformed vote row, a tract
//! without estimates) becomes a [`DataQualityIssue`] instead of aborting
//! the batch. A [`RunReport`] carries them next to the successful output
//! so callers can judge coverage.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};

/// The kind of record an issue is about.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntityKind {
    /// A precinct boundary.
    Precinct,
    /// A census tract boundary.
    Tract,
    /// A row of the demographic table.
    DemographicRow,
    /// A row of the vote results table.
    VoteRow,
    /// A (precinct, race) pair.
    Race,
}

/// How an issue affected the run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Severity {
    /// The record was used, but something about it is suspect.
    Warning,
    /// The record was left out of the analysis.
    Excluded,
}

/// One per-record data-quality problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQualityIssue {
    /// What kind of record.
    pub entity: EntityKind,
    /// Record identifier (precinct code, GEOID, or `line N`).
    pub id: String,
    /// Effect on the run.
    pub severity: Severity,
    /// Description of the problem.
    pub message: String,
}

/// Issues and counts for one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    /// Records that produced output.
    pub processed: usize,
    /// Every issue, in the order found.
    pub issues: Vec<DataQualityIssue>,
}

impl RunReport {
    /// Creates an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an issue for a record that was still used.
    pub fn warn(&mut self, entity: EntityKind, id: impl Into<String>, message: impl Into<String>) {
        self.push(entity, id.into(), Severity::Warning, message.into());
    }

    /// Records an issue for a record that was left out.
    pub fn exclude(
        &mut self,
        entity: EntityKind,
        id: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.push(entity, id.into(), Severity::Excluded, message.into());
    }

    fn push(&mut self, entity: EntityKind, id: String, severity: Severity, message: String) {
        match severity {
            Severity::Warning => log::warn!("{entity} {id}: {message}"),
            Severity::Excluded => log::warn!("{entity} {id} excluded: {message}"),
        }
        self.issues.push(DataQualityIssue {
            entity,
            id,
            severity,
            message,
        });
    }

    /// Appends another report's counts and issues.
    pub fn merge(&mut self, other: Self) {
        self.processed += other.processed;
        self.issues.extend(other.issues);
    }

    /// Number of excluded records.
    #[must_use]
    pub fn excluded(&self) -> usize {
        self.count(Severity::Excluded)
    }

    /// Number of warned (but used) records.
    #[must_use]
    pub fn warned(&self) -> usize {
        self.count(Severity::Warning)
    }

    /// Number of excluded records of one kind.
    #[must_use]
    pub fn excluded_of(&self, entity: EntityKind) -> usize {
        self.issues
            .iter()
            .filter(|i| i.entity == entity && i.severity == Severity::Excluded)
            .count()
    }

    fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    /// Returns `true` if no issues were recorded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_by_severity() {
        let mut report = RunReport::new();
        report.processed = 8;
        report.exclude(EntityKind::Precinct, "074", "self-intersecting boundary");
        report.warn(EntityKind::Tract, "11001000100", "repair changed area by 2.1%");
        report.warn(EntityKind::VoteRow, "line 7", "unknown party 'WFP'");

        assert_eq!(report.excluded(), 1);
        assert_eq!(report.warned(), 2);
        assert_eq!(report.excluded_of(EntityKind::Precinct), 1);
        assert_eq!(report.excluded_of(EntityKind::Tract), 0);
        assert!(!report.is_clean());
    }

    #[test]
    fn merge_keeps_order_and_sums_processed() {
        let mut a = RunReport::new();
        a.processed = 2;
        a.warn(EntityKind::Tract, "1", "a");
        let mut b = RunReport::new();
        b.processed = 3;
        b.exclude(EntityKind::Tract, "2", "b");

        a.merge(b);
        assert_eq!(a.processed, 5);
        let ids: Vec<&str> = a.issues.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn kinds_render_snake_case() {
        assert_eq!(EntityKind::DemographicRow.to_string(), "demographic_row");
        assert_eq!(Severity::Excluded.as_ref(), "excluded");
    }
}
