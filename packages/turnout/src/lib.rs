#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Per-precinct, per-race vote totals for one election cycle.
//!
//! Rows from other cycles are counted and ignored, never merged. Each
//! race's totals carry the Democratic vote of the anchor race in the same
//! precinct, which is the denominator pool for DVA scoring.

use std::collections::BTreeMap;

use canvass_election_models::{ElectionId, Party, RaceResult, RaceTotals, ScopeError};

/// Aggregated totals plus bookkeeping about what was left out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnoutSummary {
    /// The cycle that was aggregated.
    pub election_id: ElectionId,
    /// Totals for every (precinct, race) with at least one vote, ordered
    /// by precinct then race.
    pub totals: Vec<RaceTotals>,
    /// Rows belonging to the requested cycle.
    pub rows_in_scope: usize,
    /// Rows belonging to other cycles.
    pub rows_out_of_scope: usize,
    /// (precinct, race) pairs dropped because no votes were cast.
    pub zero_vote_races: Vec<(String, String)>,
    /// Precincts with results but no anchor race.
    pub precincts_missing_anchor: Vec<String>,
}

/// Votes for one (precinct, race), keyed case-insensitively. The race is
/// reported under the first spelling seen.
struct Tally<'a> {
    race_name: &'a str,
    dem: u64,
    rep: u64,
    other: u64,
}

impl<'a> Tally<'a> {
    const fn new(race_name: &'a str) -> Self {
        Self {
            race_name,
            dem: 0,
            rep: 0,
            other: 0,
        }
    }

    const fn add(&mut self, party: Party, votes: u64) {
        match party {
            Party::Dem => self.dem = self.dem.saturating_add(votes),
            Party::Rep => self.rep = self.rep.saturating_add(votes),
            Party::Other => self.other = self.other.saturating_add(votes),
        }
    }

    const fn total(&self) -> u64 {
        self.dem.saturating_add(self.rep).saturating_add(self.other)
    }
}

/// Returns `true` if `race_name` names the anchor race.
#[must_use]
pub fn is_anchor_race(race_name: &str, anchor_race: &str) -> bool {
    race_name.trim().eq_ignore_ascii_case(anchor_race.trim())
}

/// Aggregates race results for a single election cycle.
///
/// # Errors
///
/// Returns [`ScopeError::MissingElection`] if `election_id` is blank.
pub fn aggregate(
    election_id: &str,
    rows: &[RaceResult],
    anchor_race: &str,
) -> Result<TurnoutSummary, ScopeError> {
    let election_id = ElectionId::new(election_id)?;

    let mut tallies: BTreeMap<(&str, String), Tally> = BTreeMap::new();
    let mut rows_out_of_scope = 0;

    for row in rows {
        if row.election_id.trim() != election_id.as_str() {
            rows_out_of_scope += 1;
            continue;
        }
        let race_name = row.race_name.trim();
        tallies
            .entry((row.precinct_id.as_str(), race_name.to_ascii_lowercase()))
            .or_insert_with(|| Tally::new(race_name))
            .add(row.candidate_party, row.vote_count);
    }

    let rows_in_scope = rows.len() - rows_out_of_scope;
    if rows_out_of_scope > 0 {
        log::info!(
            "Ignored {rows_out_of_scope} result rows outside election {election_id}"
        );
    }

    let anchors: BTreeMap<&str, u64> = tallies
        .iter()
        .filter(|(_, tally)| is_anchor_race(tally.race_name, anchor_race))
        .map(|((precinct, _), tally)| (*precinct, tally.dem))
        .collect();

    let mut totals = Vec::with_capacity(tallies.len());
    let mut zero_vote_races = Vec::new();
    let mut precincts_missing_anchor: Vec<String> = Vec::new();

    for ((precinct, _), tally) in &tallies {
        let race = tally.race_name;
        if tally.total() == 0 {
            log::debug!("Precinct {precinct} race {race}: no votes cast");
            zero_vote_races.push(((*precinct).to_string(), race.to_string()));
            continue;
        }

        let anchor_dem_votes = anchors.get(precinct).copied();
        if anchor_dem_votes.is_none()
            && precincts_missing_anchor.last().map(String::as_str) != Some(*precinct)
        {
            log::warn!("Precinct {precinct} has no '{anchor_race}' results in {election_id}");
            precincts_missing_anchor.push((*precinct).to_string());
        }

        totals.push(RaceTotals {
            election_id: election_id.to_string(),
            precinct_id: (*precinct).to_string(),
            race_name: race.to_string(),
            dem_votes: tally.dem,
            rep_votes: tally.rep,
            other_votes: tally.other,
            anchor_dem_votes,
        });
    }

    log::info!(
        "Aggregated {} race totals from {rows_in_scope} rows for {election_id}",
        totals.len()
    );

    Ok(TurnoutSummary {
        election_id,
        totals,
        rows_in_scope,
        rows_out_of_scope,
        zero_vote_races,
        precincts_missing_anchor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(election: &str, precinct: &str, race: &str, party: Party, votes: u64) -> RaceResult {
        RaceResult {
            election_id: election.to_string(),
            precinct_id: precinct.to_string(),
            race_name: race.to_string(),
            candidate_party: party,
            vote_count: votes,
        }
    }

    fn sample() -> Vec<RaceResult> {
        vec![
            row("2022", "704", "Governor", Party::Dem, 2089),
            row("2022", "704", "Governor", Party::Rep, 1710),
            row("2022", "704", "State Senate", Party::Dem, 1383),
            row("2022", "704", "State Senate", Party::Rep, 1456),
            row("2022", "704", "State Senate", Party::Other, 41),
            row("2022", "074", "State Senate", Party::Dem, 700),
            row("2022", "074", "State Senate", Party::Rep, 650),
            row("2018", "704", "Governor", Party::Dem, 99_999),
        ]
    }

    #[test]
    fn blank_election_is_rejected() {
        assert_eq!(
            aggregate(" ", &sample(), "Governor"),
            Err(ScopeError::MissingElection)
        );
    }

    #[test]
    fn sums_by_party_within_scope() {
        let summary = aggregate("2022", &sample(), "Governor").unwrap();
        assert_eq!(summary.rows_in_scope, 7);
        assert_eq!(summary.rows_out_of_scope, 1);

        let senate = summary
            .totals
            .iter()
            .find(|t| t.precinct_id == "704" && t.race_name == "State Senate")
            .unwrap();
        assert_eq!(senate.dem_votes, 1383);
        assert_eq!(senate.rep_votes, 1456);
        assert_eq!(senate.other_votes, 41);
        assert_eq!(senate.anchor_dem_votes, Some(2089));
    }

    #[test]
    fn other_cycles_never_leak_into_anchor() {
        let summary = aggregate("2018", &sample(), "Governor").unwrap();
        assert_eq!(summary.totals.len(), 1);
        assert_eq!(summary.totals[0].anchor_dem_votes, Some(99_999));
    }

    #[test]
    fn zero_padded_precincts_stay_distinct() {
        let summary = aggregate("2022", &sample(), "Governor").unwrap();
        let ids: Vec<&str> = summary
            .totals
            .iter()
            .map(|t| t.precinct_id.as_str())
            .collect();
        assert!(ids.contains(&"074"));
        assert!(ids.contains(&"704"));
        assert_eq!(summary.precincts_missing_anchor, vec!["074".to_string()]);
    }

    #[test]
    fn zero_vote_races_are_dropped() {
        let mut rows = sample();
        rows.push(row("2022", "704", "Soil Commissioner", Party::Dem, 0));
        rows.push(row("2022", "704", "Soil Commissioner", Party::Rep, 0));
        let summary = aggregate("2022", &rows, "Governor").unwrap();
        assert!(summary.totals.iter().all(|t| t.race_name != "Soil Commissioner"));
        assert_eq!(
            summary.zero_vote_races,
            vec![("704".to_string(), "Soil Commissioner".to_string())]
        );
    }

    #[test]
    fn race_spellings_differing_in_case_are_one_race() {
        let rows = vec![
            row("2022", "704", "Governor", Party::Dem, 1000),
            row("2022", "704", "GOVERNOR", Party::Dem, 1089),
            row("2022", "704", " governor", Party::Rep, 1710),
            row("2022", "704", "State Senate", Party::Rep, 1456),
        ];
        let summary = aggregate("2022", &rows, "Governor").unwrap();
        assert_eq!(summary.totals.len(), 2);

        let governor = summary
            .totals
            .iter()
            .find(|t| t.race_name == "Governor")
            .unwrap();
        assert_eq!(governor.dem_votes, 2089);
        assert_eq!(governor.rep_votes, 1710);
        assert!(summary.totals.iter().all(|t| t.anchor_dem_votes == Some(2089)));
    }

    #[test]
    fn vote_sums_saturate_instead_of_overflowing() {
        let rows = vec![
            row("2022", "704", "Governor", Party::Dem, u64::MAX),
            row("2022", "704", "Governor", Party::Dem, 1),
            row("2022", "704", "Governor", Party::Rep, 5),
        ];
        let summary = aggregate("2022", &rows, "Governor").unwrap();
        assert_eq!(summary.totals[0].dem_votes, u64::MAX);
        assert_eq!(summary.totals[0].total_votes(), u64::MAX);
    }

    #[test]
    fn anchor_match_ignores_case_and_whitespace() {
        assert!(is_anchor_race(" governor ", "Governor"));
        assert!(!is_anchor_race("Lieutenant Governor", "Governor"));
    }
}
