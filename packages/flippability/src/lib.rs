#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Democratic Voter Absenteeism (DVA) scoring and tier classification.
//!
//! For a Republican-won race the DVA is the share of the precinct's absent
//! Democratic voters (anchor-race Democrats who skipped this race) that
//! would have to turn out to win by one vote:
//!
//! ```text
//! dva = ((rep + 1) - dem) / (anchor_dem - dem) * 100
//! ```
//!
//! A non-positive pool never produces a number; it lands in
//! [`Tier::NoAbsenteeismPool`] (or [`Tier::Difficult`] under
//! [`NoPoolPolicy::MergeIntoDifficult`]).

pub mod report;

use canvass_election_models::{ExclusionReason, FlippabilityScore, RaceTotals, Tier};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

pub use report::{FlippabilityReport, rank, summarize_tiers};

/// Where races without an absentee pool are reported.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NoPoolPolicy {
    /// Report them in [`Tier::NoAbsenteeismPool`].
    #[default]
    SeparateTier,
    /// Fold them into [`Tier::Difficult`] (still with no DVA value).
    MergeIntoDifficult,
}

/// Scoring thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ScoringConfig {
    /// Race whose Democratic vote defines the absentee pool.
    pub anchor_race: String,
    /// Largest Republican margin (percent of all votes) still scored.
    pub max_margin_pct: f64,
    /// Smallest total vote count still scored.
    pub min_total_votes: u64,
    /// Handling of races with no absentee pool.
    pub no_pool_policy: NoPoolPolicy,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            anchor_race: "Governor".to_string(),
            max_margin_pct: 10.0,
            min_total_votes: 25,
            no_pool_policy: NoPoolPolicy::SeparateTier,
        }
    }
}

/// Computes the DVA percentage, or `None` when the anchor race drew no
/// more Democratic votes than this race.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn dva_pct_needed(rep_votes: u64, dem_votes: u64, anchor_dem_votes: u64) -> Option<f64> {
    if anchor_dem_votes <= dem_votes {
        return None;
    }
    let needed = rep_votes.saturating_add(1) as f64 - dem_votes as f64;
    let pool = (anchor_dem_votes - dem_votes) as f64;
    Some(needed / pool * 100.0)
}

/// Maps a DVA percentage to its tier. Upper bounds are inclusive.
#[must_use]
pub fn classify_tier(dva_pct_needed: Option<f64>, policy: NoPoolPolicy) -> Tier {
    match dva_pct_needed {
        None => match policy {
            NoPoolPolicy::SeparateTier => Tier::NoAbsenteeismPool,
            NoPoolPolicy::MergeIntoDifficult => Tier::Difficult,
        },
        Some(dva) if dva <= 25.0 => Tier::HighlyFlippable,
        Some(dva) if dva <= 50.0 => Tier::Flippable,
        Some(dva) if dva <= 75.0 => Tier::Competitive,
        Some(dva) if dva <= 100.0 => Tier::StretchTarget,
        Some(_) => Tier::Difficult,
    }
}

/// Scores one (precinct, race), or says why it is not eligible.
///
/// # Errors
///
/// Returns the [`ExclusionReason`] for races that are not scored: no votes,
/// the anchor race itself, not won by Republicans, too few votes, margin
/// too wide, or no anchor race in the precinct.
pub fn score_race(
    totals: &RaceTotals,
    config: &ScoringConfig,
) -> Result<FlippabilityScore, ExclusionReason> {
    let Some(margin) = totals.margin_pct() else {
        return Err(ExclusionReason::NoVotes);
    };
    if totals
        .race_name
        .trim()
        .eq_ignore_ascii_case(config.anchor_race.trim())
    {
        return Err(ExclusionReason::AnchorRace);
    }
    if totals.rep_votes <= totals.dem_votes {
        return Err(ExclusionReason::NotRepublicanWon);
    }
    if totals.total_votes() < config.min_total_votes {
        return Err(ExclusionReason::TooFewVotes);
    }
    if margin > config.max_margin_pct {
        return Err(ExclusionReason::MarginTooWide);
    }
    let Some(anchor_dem_votes) = totals.anchor_dem_votes else {
        return Err(ExclusionReason::MissingAnchor);
    };

    let dva = dva_pct_needed(totals.rep_votes, totals.dem_votes, anchor_dem_votes);
    if dva.is_none() {
        log::debug!(
            "Precinct {} race {}: no absentee pool (anchor {anchor_dem_votes} <= dem {})",
            totals.precinct_id,
            totals.race_name,
            totals.dem_votes,
        );
    }

    Ok(FlippabilityScore {
        election_id: totals.election_id.clone(),
        precinct_id: totals.precinct_id.clone(),
        race_name: totals.race_name.clone(),
        rep_votes: totals.rep_votes,
        dem_votes: totals.dem_votes,
        anchor_dem_votes,
        dva_pct_needed: dva,
        tier: classify_tier(dva, config.no_pool_policy),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn totals(rep: u64, dem: u64, other: u64, anchor: Option<u64>) -> RaceTotals {
        RaceTotals {
            election_id: "2022-general".to_string(),
            precinct_id: "704".to_string(),
            race_name: "State Senate".to_string(),
            dem_votes: dem,
            rep_votes: rep,
            other_votes: other,
            anchor_dem_votes: anchor,
        }
    }

    #[test]
    fn precinct_704_is_highly_flippable() {
        let score = score_race(
            &totals(1456, 1383, 0, Some(2089)),
            &ScoringConfig::default(),
        )
        .unwrap();
        let dva = score.dva_pct_needed.unwrap();
        assert!((dva - 74.0 / 706.0 * 100.0).abs() < 1e-12);
        assert!((dva - 10.48).abs() < 0.01);
        assert_eq!(score.tier, Tier::HighlyFlippable);
    }

    #[test]
    fn democratic_wins_are_not_scored() {
        assert_eq!(
            score_race(&totals(500, 520, 0, Some(900)), &ScoringConfig::default()),
            Err(ExclusionReason::NotRepublicanWon)
        );
    }

    #[test]
    fn ties_are_not_scored() {
        assert_eq!(
            score_race(&totals(500, 500, 0, Some(900)), &ScoringConfig::default()),
            Err(ExclusionReason::NotRepublicanWon)
        );
    }

    #[test]
    fn saturated_anchor_has_no_pool() {
        let score = score_race(
            &totals(1050, 1000, 0, Some(1000)),
            &ScoringConfig::default(),
        )
        .unwrap();
        assert_eq!(score.dva_pct_needed, None);
        assert_eq!(score.tier, Tier::NoAbsenteeismPool);
    }

    #[test]
    fn negative_pool_never_divides() {
        assert_eq!(dva_pct_needed(1050, 1000, 900), None);
        assert_eq!(dva_pct_needed(1050, 1000, 1000), None);
    }

    #[test]
    fn extreme_counts_do_not_overflow() {
        let dva = dva_pct_needed(u64::MAX, 0, u64::MAX).unwrap();
        assert!(dva.is_finite());
        assert!((dva - 100.0).abs() < 1e-9);

        let score = score_race(
            &totals(u64::MAX, 1, u64::MAX, Some(u64::MAX)),
            &ScoringConfig {
                max_margin_pct: 100.0,
                ..ScoringConfig::default()
            },
        )
        .unwrap();
        assert!(score.dva_pct_needed.is_some());
    }

    #[test]
    fn merge_policy_folds_no_pool_into_difficult() {
        let config = ScoringConfig {
            no_pool_policy: NoPoolPolicy::MergeIntoDifficult,
            ..ScoringConfig::default()
        };
        let score = score_race(&totals(1050, 1000, 0, Some(990)), &config).unwrap();
        assert_eq!(score.tier, Tier::Difficult);
        assert_eq!(score.dva_pct_needed, None);
    }

    #[test]
    fn tier_boundaries_are_inclusive_above() {
        let policy = NoPoolPolicy::SeparateTier;
        assert_eq!(classify_tier(Some(25.0), policy), Tier::HighlyFlippable);
        assert_eq!(classify_tier(Some(25.0001), policy), Tier::Flippable);
        assert_eq!(classify_tier(Some(50.0), policy), Tier::Flippable);
        assert_eq!(classify_tier(Some(50.0001), policy), Tier::Competitive);
        assert_eq!(classify_tier(Some(75.0), policy), Tier::Competitive);
        assert_eq!(classify_tier(Some(100.0), policy), Tier::StretchTarget);
        assert_eq!(classify_tier(Some(100.0001), policy), Tier::Difficult);
        assert_eq!(classify_tier(Some(1_250.0), policy), Tier::Difficult);
        assert_eq!(classify_tier(None, policy), Tier::NoAbsenteeismPool);
    }

    #[test]
    fn dva_decreases_as_dem_votes_rise() {
        let (rep, anchor) = (1_000, 1_600);
        let mut previous = f64::INFINITY;
        for dem in 850..1_000 {
            let dva = dva_pct_needed(rep, dem, anchor).unwrap();
            assert!(dva < previous, "dem {dem}: {dva} !< {previous}");
            previous = dva;
        }
    }

    #[test]
    fn margin_and_volume_filters() {
        let config = ScoringConfig::default();
        // 12% margin
        assert_eq!(
            score_race(&totals(56, 44, 0, Some(80)), &config),
            Err(ExclusionReason::MarginTooWide)
        );
        // exactly 10% margin is still in range
        assert!(score_race(&totals(55, 45, 0, Some(80)), &config).is_ok());
        assert_eq!(
            score_race(&totals(12, 10, 0, Some(30)), &config),
            Err(ExclusionReason::TooFewVotes)
        );
        assert_eq!(
            score_race(&totals(0, 0, 0, Some(30)), &config),
            Err(ExclusionReason::NoVotes)
        );
    }

    #[test]
    fn anchor_race_and_missing_anchor_are_excluded() {
        let config = ScoringConfig::default();
        let mut governor = totals(1456, 1383, 0, Some(1383));
        governor.race_name = "GOVERNOR".to_string();
        assert_eq!(score_race(&governor, &config), Err(ExclusionReason::AnchorRace));
        assert_eq!(
            score_race(&totals(1456, 1383, 0, None), &config),
            Err(ExclusionReason::MissingAnchor)
        );
    }

    #[test]
    fn third_party_votes_widen_the_denominator_of_margin() {
        // 60 - 45 = 15 of 150 votes is a 10% margin.
        assert!(score_race(&totals(60, 45, 45, Some(90)), &ScoringConfig::default()).is_ok());
    }
}
