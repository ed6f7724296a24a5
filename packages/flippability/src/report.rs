//! Ranking and tier summaries for a scored election.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use canvass_election_models::{ExclusionReason, FlippabilityScore, Tier, TierSummary};
use serde::{Deserialize, Serialize};

/// Ranked scores plus per-tier totals for one election cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlippabilityReport {
    /// Election cycle.
    pub election_id: String,
    /// Scores, best opportunity first.
    pub ranked: Vec<FlippabilityScore>,
    /// One summary per tier, in tier order, including empty tiers.
    pub tiers: Vec<TierSummary>,
    /// Counts of (precinct, race) pairs that were not scored.
    pub exclusions: BTreeMap<ExclusionReason, usize>,
}

impl FlippabilityReport {
    /// Builds a report from unordered scores.
    #[must_use]
    pub fn new(
        election_id: &str,
        mut scores: Vec<FlippabilityScore>,
        exclusions: BTreeMap<ExclusionReason, usize>,
    ) -> Self {
        rank(&mut scores);
        let tiers = summarize_tiers(&scores);
        Self {
            election_id: election_id.to_string(),
            ranked: scores,
            tiers,
            exclusions,
        }
    }

    /// Ranked scores grouped by tier, in tier order.
    #[must_use]
    pub fn by_tier(&self) -> BTreeMap<Tier, Vec<&FlippabilityScore>> {
        let mut groups: BTreeMap<Tier, Vec<&FlippabilityScore>> = BTreeMap::new();
        for score in &self.ranked {
            groups.entry(score.tier).or_default().push(score);
        }
        groups
    }

    /// Number of pairs that were considered but not scored.
    #[must_use]
    pub fn excluded_count(&self) -> usize {
        self.exclusions.values().sum()
    }
}

/// Sorts by DVA ascending (no-pool races last), then by smaller vote gap,
/// then by precinct and race for a stable total order.
pub fn rank(scores: &mut [FlippabilityScore]) {
    scores.sort_by(compare);
}

fn compare(a: &FlippabilityScore, b: &FlippabilityScore) -> Ordering {
    let by_dva = match (a.dva_pct_needed, b.dva_pct_needed) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_dva
        .then_with(|| a.vote_gap().cmp(&b.vote_gap()))
        .then_with(|| a.precinct_id.cmp(&b.precinct_id))
        .then_with(|| a.race_name.cmp(&b.race_name))
}

/// Totals per tier, one entry for every tier in [`Tier::ALL`].
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn summarize_tiers(scores: &[FlippabilityScore]) -> Vec<TierSummary> {
    Tier::ALL
        .iter()
        .map(|&tier| {
            let members: Vec<&FlippabilityScore> =
                scores.iter().filter(|s| s.tier == tier).collect();
            let dvas: Vec<f64> = members.iter().filter_map(|s| s.dva_pct_needed).collect();
            let average_dva_pct = if dvas.is_empty() {
                None
            } else {
                Some(dvas.iter().sum::<f64>() / dvas.len() as f64)
            };
            TierSummary {
                tier,
                count: members.len(),
                average_dva_pct,
                total_vote_gap: members.iter().map(|s| s.vote_gap()).sum(),
                total_absenteeism_pool: members.iter().map(|s| s.absenteeism_pool()).sum(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(precinct: &str, rep: u64, dem: u64, dva: Option<f64>, tier: Tier) -> FlippabilityScore {
        FlippabilityScore {
            election_id: "2022-general".to_string(),
            precinct_id: precinct.to_string(),
            race_name: "State Senate".to_string(),
            rep_votes: rep,
            dem_votes: dem,
            anchor_dem_votes: dem + 200,
            dva_pct_needed: dva,
            tier,
        }
    }

    #[test]
    fn ranks_by_dva_then_smaller_gap() {
        let mut scores = vec![
            score("3", 600, 500, Some(40.0), Tier::Flippable),
            score("1", 560, 500, None, Tier::NoAbsenteeismPool),
            score("2", 520, 500, Some(10.0), Tier::HighlyFlippable),
            score("4", 540, 500, Some(10.0), Tier::HighlyFlippable),
            score("5", 510, 500, Some(10.0), Tier::HighlyFlippable),
        ];
        rank(&mut scores);
        let order: Vec<&str> = scores.iter().map(|s| s.precinct_id.as_str()).collect();
        assert_eq!(order, vec!["5", "2", "4", "3", "1"]);
    }

    #[test]
    fn summaries_cover_every_tier() {
        let scores = vec![
            score("1", 520, 500, Some(10.0), Tier::HighlyFlippable),
            score("2", 540, 500, Some(20.0), Tier::HighlyFlippable),
            score("3", 560, 500, None, Tier::NoAbsenteeismPool),
        ];
        let tiers = summarize_tiers(&scores);
        assert_eq!(tiers.len(), Tier::ALL.len());

        let highly = &tiers[0];
        assert_eq!(highly.count, 2);
        assert_eq!(highly.average_dva_pct, Some(15.0));
        assert_eq!(highly.total_vote_gap, 60);
        assert_eq!(highly.total_absenteeism_pool, 400);

        let flippable = &tiers[1];
        assert_eq!(flippable.count, 0);
        assert_eq!(flippable.average_dva_pct, None);

        let no_pool = tiers.last().unwrap();
        assert_eq!(no_pool.tier, Tier::NoAbsenteeismPool);
        assert_eq!(no_pool.count, 1);
        assert_eq!(no_pool.average_dva_pct, None);
    }

    #[test]
    fn report_groups_by_tier_in_rank_order() {
        let report = FlippabilityReport::new(
            "2022-general",
            vec![
                score("2", 540, 500, Some(20.0), Tier::HighlyFlippable),
                score("3", 600, 500, Some(60.0), Tier::Competitive),
                score("1", 520, 500, Some(10.0), Tier::HighlyFlippable),
            ],
            BTreeMap::from([(ExclusionReason::NotRepublicanWon, 4)]),
        );
        let groups = report.by_tier();
        let highly: Vec<&str> = groups[&Tier::HighlyFlippable]
            .iter()
            .map(|s| s.precinct_id.as_str())
            .collect();
        assert_eq!(highly, vec!["1", "2"]);
        assert_eq!(groups[&Tier::Competitive].len(), 1);
        assert_eq!(report.excluded_count(), 4);
    }
}
