#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Election result, turnout, and flippability score types.
//!
//! Results are always scoped to a single election cycle identified by an
//! [`ElectionId`]. There is deliberately no way to build totals without
//! naming the cycle.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

/// Errors for requests that do not name an election cycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    /// No election identifier was supplied.
    #[error("An election identifier is required; cross-cycle aggregation is not supported")]
    MissingElection,
}

/// Identifier of one election cycle (e.g. "2022-general").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ElectionId(String);

impl ElectionId {
    /// Creates an election id from a non-blank string.
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError::MissingElection`] if `value` is blank.
    pub fn new(value: &str) -> Result<Self, ScopeError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(ScopeError::MissingElection);
        }
        Ok(Self(value.to_string()))
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ElectionId {
    type Error = ScopeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<ElectionId> for String {
    fn from(value: ElectionId) -> Self {
        value.0
    }
}

/// Candidate party, collapsed to the two parties that matter for scoring.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Party {
    /// Democratic.
    Dem,
    /// Republican.
    Rep,
    /// Every other party, independents, and write-ins.
    Other,
}

impl Party {
    /// Maps a free-form party label from a results file.
    ///
    /// Accepts common spellings ("DEM", "D", "Democratic", "REP", "R",
    /// "Republican", "GOP"); anything else is [`Party::Other`].
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_uppercase().as_str() {
            "DEM" | "D" | "DEMOCRAT" | "DEMOCRATIC" => Self::Dem,
            "REP" | "R" | "GOP" | "REPUBLICAN" => Self::Rep,
            _ => Self::Other,
        }
    }
}

/// One candidate's vote count in one precinct for one race.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceResult {
    /// Election cycle.
    pub election_id: String,
    /// Precinct code (zero padding significant).
    pub precinct_id: String,
    /// Race name (e.g. "Governor", "County Council District 3").
    pub race_name: String,
    /// Candidate's party.
    pub candidate_party: Party,
    /// Votes received.
    pub vote_count: u64,
}

/// Vote totals for one race in one precinct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceTotals {
    /// Election cycle.
    pub election_id: String,
    /// Precinct code.
    pub precinct_id: String,
    /// Race name.
    pub race_name: String,
    /// Democratic votes.
    pub dem_votes: u64,
    /// Republican votes.
    pub rep_votes: u64,
    /// Votes for every other candidate.
    pub other_votes: u64,
    /// Democratic votes in the anchor race for the same precinct, if the
    /// precinct reported the anchor race.
    pub anchor_dem_votes: Option<u64>,
}

impl RaceTotals {
    /// All votes cast in the race.
    #[must_use]
    pub const fn total_votes(&self) -> u64 {
        self.dem_votes
            .saturating_add(self.rep_votes)
            .saturating_add(self.other_votes)
    }

    /// Republican lead as a percentage of all votes (negative when
    /// Democrats lead), or `None` for a race without votes.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn margin_pct(&self) -> Option<f64> {
        let total = self.total_votes();
        if total == 0 {
            None
        } else {
            Some((self.rep_votes as f64 - self.dem_votes as f64) / total as f64 * 100.0)
        }
    }
}

/// Strategic priority bucket derived from the DVA percentage.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Tier {
    /// DVA in (0, 25].
    HighlyFlippable,
    /// DVA in (25, 50].
    Flippable,
    /// DVA in (50, 75].
    Competitive,
    /// DVA in (75, 100].
    StretchTarget,
    /// DVA above 100: more than the whole absentee pool is needed.
    Difficult,
    /// The race already drew at least as many Democratic votes as the
    /// anchor race, so there is no absentee pool to activate.
    NoAbsenteeismPool,
}

impl Tier {
    /// Every tier, best opportunity first.
    pub const ALL: &[Self] = &[
        Self::HighlyFlippable,
        Self::Flippable,
        Self::Competitive,
        Self::StretchTarget,
        Self::Difficult,
        Self::NoAbsenteeismPool,
    ];

    /// Human-readable label for reports.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::HighlyFlippable => "Highly flippable",
            Self::Flippable => "Flippable",
            Self::Competitive => "Competitive",
            Self::StretchTarget => "Stretch target",
            Self::Difficult => "Difficult",
            Self::NoAbsenteeismPool => "No absenteeism pool",
        }
    }
}

/// Why a (precinct, race) pair was not scored.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ExclusionReason {
    /// No votes were cast.
    NoVotes,
    /// The race is the anchor race itself.
    AnchorRace,
    /// Democrats won or the race was tied.
    NotRepublicanWon,
    /// Fewer total votes than the configured minimum.
    TooFewVotes,
    /// Republican margin above the configured maximum.
    MarginTooWide,
    /// The precinct did not report the anchor race.
    MissingAnchor,
}

/// The DVA score for one Republican-won (precinct, race).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlippabilityScore {
    /// Election cycle.
    pub election_id: String,
    /// Precinct code.
    pub precinct_id: String,
    /// Race name.
    pub race_name: String,
    /// Republican votes.
    pub rep_votes: u64,
    /// Democratic votes.
    pub dem_votes: u64,
    /// Democratic votes in the anchor race.
    pub anchor_dem_votes: u64,
    /// Share of the absentee pool needed to flip by one vote, or `None`
    /// when there is no pool.
    pub dva_pct_needed: Option<f64>,
    /// Strategic tier.
    pub tier: Tier,
}

impl FlippabilityScore {
    /// Votes separating the candidates (`rep - dem`).
    #[must_use]
    pub const fn vote_gap(&self) -> u64 {
        self.rep_votes.saturating_sub(self.dem_votes)
    }

    /// Democratic voters who turned out for the anchor race but not for
    /// this one (zero when there is no pool).
    #[must_use]
    pub const fn absenteeism_pool(&self) -> u64 {
        self.anchor_dem_votes.saturating_sub(self.dem_votes)
    }
}

/// Totals for one tier of a flippability report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierSummary {
    /// The tier.
    pub tier: Tier,
    /// Number of scored (precinct, race) pairs.
    pub count: usize,
    /// Mean DVA over pairs that have one.
    pub average_dva_pct: Option<f64>,
    /// Sum of `rep - dem` over the tier.
    pub total_vote_gap: u64,
    /// Sum of available absentee Democratic voters over the tier.
    pub total_absenteeism_pool: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn totals(dem: u64, rep: u64, other: u64) -> RaceTotals {
        RaceTotals {
            election_id: "2022-general".to_string(),
            precinct_id: "074".to_string(),
            race_name: "County Executive".to_string(),
            dem_votes: dem,
            rep_votes: rep,
            other_votes: other,
            anchor_dem_votes: Some(dem + 100),
        }
    }

    #[test]
    fn election_id_must_not_be_blank() {
        assert_eq!(ElectionId::new("  "), Err(ScopeError::MissingElection));
        assert_eq!(ElectionId::new(" 2022-general ").unwrap().as_str(), "2022-general");
    }

    #[test]
    fn party_labels() {
        assert_eq!(Party::from_label("dem"), Party::Dem);
        assert_eq!(Party::from_label("Democratic"), Party::Dem);
        assert_eq!(Party::from_label(" R "), Party::Rep);
        assert_eq!(Party::from_label("GOP"), Party::Rep);
        assert_eq!(Party::from_label("LIB"), Party::Other);
        assert_eq!(Party::Dem.to_string(), "DEM");
    }

    #[test]
    fn margin_uses_all_votes() {
        let t = totals(40, 55, 5);
        assert_eq!(t.total_votes(), 100);
        assert!((t.margin_pct().unwrap() - 15.0).abs() < 1e-12);
        assert_eq!(totals(0, 0, 0).margin_pct(), None);
    }

    #[test]
    fn tier_round_trip() {
        for tier in Tier::ALL {
            assert_eq!(tier.to_string().parse::<Tier>().unwrap(), *tier);
        }
        assert_eq!(Tier::NoAbsenteeismPool.as_ref(), "no_absenteeism_pool");
        assert!(Tier::HighlyFlippable < Tier::Difficult);
    }

    #[test]
    fn score_pool_and_gap() {
        let score = FlippabilityScore {
            election_id: "2022-general".to_string(),
            precinct_id: "704".to_string(),
            race_name: "State Senate".to_string(),
            rep_votes: 1456,
            dem_votes: 1383,
            anchor_dem_votes: 2089,
            dva_pct_needed: Some(10.48),
            tier: Tier::HighlyFlippable,
        };
        assert_eq!(score.vote_gap(), 73);
        assert_eq!(score.absenteeism_pool(), 706);

        let saturated = FlippabilityScore {
            anchor_dem_votes: 1000,
            dem_votes: 1200,
            ..score
        };
        assert_eq!(saturated.absenteeism_pool(), 0);
    }
}
