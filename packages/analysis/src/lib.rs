#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Batch runners for precinct attribution and flippability scoring.
//!
//! Both runners take immutable inputs, fan the per-entity work out over
//! `rayon`, and collect results in a deterministic order. A bad geometry
//! or a malformed race never aborts the batch: it becomes a
//! [`DataQualityIssue`](canvass_analysis_models::DataQualityIssue) in the
//! returned [`RunReport`].

pub mod config;
pub mod context;
pub mod progress;

use std::collections::BTreeMap;
use std::sync::Arc;

use canvass_analysis_models::{EntityKind, RunReport};
use canvass_attribution::attribute_precinct;
use canvass_attribution_models::{AttributedDemographic, VariableCoverage};
use canvass_election_models::{ExclusionReason, FlippabilityScore, RaceResult, ScopeError};
use canvass_flippability::{FlippabilityReport, ScoringConfig, score_race};
use canvass_overlay::{
    OverlayError, PrecinctOverlay, PreparedBoundary, RepairNote, RepairReason, TractIndex,
    overlay_precinct, prepare_boundary,
};
use canvass_turnout::aggregate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

pub use config::{AnalysisConfig, ConfigError};
pub use context::AnalysisContext;
pub use progress::{NullProgress, ProgressCallback, null_progress};

/// Precincts whose emitted intersections cover less than this share of
/// their area get a coverage warning.
pub const MIN_COVERED_PCT: f64 = 95.0;

/// Output of [`run_attribution`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributionRun {
    /// One overlay per usable precinct, ordered by precinct code.
    pub overlays: Vec<PrecinctOverlay>,
    /// Attributed estimates, ordered by precinct code then configured
    /// variable order.
    pub demographics: Vec<AttributedDemographic>,
    /// Per-variable coverage over the usable precincts.
    pub coverage: Vec<VariableCoverage>,
    /// Intake issues plus everything found during the run.
    pub report: RunReport,
}

/// Output of [`run_scoring`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringRun {
    /// Ranked scores, tier summaries, and exclusion counts.
    pub report: FlippabilityReport,
    /// Data-quality issues found while scoring.
    pub quality: RunReport,
    /// Result rows belonging to the requested election.
    pub rows_in_scope: usize,
    /// Result rows from other elections, ignored.
    pub rows_out_of_scope: usize,
}

struct PrecinctOutcome {
    overlay: PrecinctOverlay,
    demographics: Vec<AttributedDemographic>,
    repair: Option<RepairNote>,
}

/// Overlays every precinct on the tract layer and attributes the
/// configured variables.
#[must_use]
pub fn run_attribution(
    ctx: &AnalysisContext,
    progress: &Arc<dyn ProgressCallback>,
) -> AttributionRun {
    let config = &ctx.config;
    let mut report = ctx.intake.clone();
    report.processed = 0;

    log::info!("Preparing {} tract boundaries", ctx.tracts.len());
    let prepared: Vec<Result<PreparedBoundary, OverlayError>> = ctx
        .tracts
        .par_iter()
        .map(|t| prepare_boundary(&t.geoid, &t.boundary, &ctx.projection, &config.overlay))
        .collect();

    let mut usable_tracts = Vec::with_capacity(prepared.len());
    for result in prepared {
        match result {
            Ok(tract) => {
                if let Some(note) = &tract.repair {
                    record_repair(&mut report, EntityKind::Tract, &tract.id, note);
                }
                usable_tracts.push(tract);
            }
            Err(e) => report.exclude(EntityKind::Tract, e.id(), e.to_string()),
        }
    }
    let index = TractIndex::build(usable_tracts);
    log::info!("Indexed {} usable tracts", index.len());

    progress.set_total(ctx.precincts.len() as u64);
    progress.set_message("overlaying precincts".to_string());

    let outcomes: Vec<Result<PrecinctOutcome, OverlayError>> = ctx
        .precincts
        .par_iter()
        .map(|precinct| {
            let outcome = prepare_boundary(
                &precinct.id,
                &precinct.boundary,
                &ctx.projection,
                &config.overlay,
            )
            .map(|prepared| {
                let overlay = overlay_precinct(&prepared, &index, &config.overlay);
                let demographics =
                    attribute_precinct(&overlay, &ctx.demographics, &config.attribution);
                PrecinctOutcome {
                    overlay,
                    demographics,
                    repair: prepared.repair,
                }
            });
            progress.inc(1);
            outcome
        })
        .collect();

    let mut overlays = Vec::with_capacity(outcomes.len());
    let mut demographics = Vec::new();
    for outcome in outcomes {
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                report.exclude(EntityKind::Precinct, e.id(), e.to_string());
                continue;
            }
        };
        let id = outcome.overlay.precinct_id.as_str();
        if let Some(note) = &outcome.repair {
            record_repair(&mut report, EntityKind::Precinct, id, note);
        }
        if outcome.overlay.intersections.is_empty() {
            report.warn(EntityKind::Precinct, id, "no overlapping tracts");
        } else {
            let covered = outcome.overlay.covered_pct();
            if covered < MIN_COVERED_PCT {
                report.warn(
                    EntityKind::Precinct,
                    id,
                    format!("tracts cover only {covered:.1}% of the precinct"),
                );
            }
        }
        demographics.extend(outcome.demographics);
        overlays.push(outcome.overlay);
    }

    overlays.sort_by(|a, b| a.precinct_id.cmp(&b.precinct_id));
    demographics.sort_by(|a, b| a.precinct_id.cmp(&b.precinct_id));
    report.processed = overlays.len();

    let coverage = canvass_attribution::coverage(
        &demographics,
        &config.attribution.variables,
        overlays.len(),
    );
    for c in &coverage {
        if c.is_complete() {
            log::info!("{}: {c}", c.variable_code);
        } else {
            log::warn!("{}: {c}", c.variable_code);
        }
    }

    progress.finish(format!(
        "Attributed {} precincts ({} excluded)",
        overlays.len(),
        report.excluded_of(EntityKind::Precinct),
    ));

    AttributionRun {
        overlays,
        demographics,
        coverage,
        report,
    }
}

fn record_repair(report: &mut RunReport, entity: EntityKind, id: &str, note: &RepairNote) {
    if note.reasons.contains(&RepairReason::DroppedNonFiniteVertex) {
        report.warn(
            entity,
            id,
            "dropped vertices with non-finite coordinates; area change not measurable",
        );
    }
    if note.exceeds_tolerance {
        report.warn(
            entity,
            id,
            format!(
                "repair changed area by {:.3}% ({:.1} m² -> {:.1} m²)",
                note.area_change_pct, note.area_before_m2, note.area_after_m2,
            ),
        );
    } else {
        log::debug!("{entity} {id}: repaired ({:?})", note.reasons);
    }
}

/// Aggregates one election's results and scores every eligible
/// (precinct, race).
///
/// # Errors
///
/// Returns [`ScopeError::MissingElection`] if `election_id` is blank.
pub fn run_scoring(
    config: &ScoringConfig,
    election_id: &str,
    rows: &[RaceResult],
    progress: &Arc<dyn ProgressCallback>,
) -> Result<ScoringRun, ScopeError> {
    let summary = aggregate(election_id, rows, &config.anchor_race)?;
    let mut quality = RunReport::new();

    for (precinct, race) in &summary.zero_vote_races {
        quality.warn(EntityKind::Race, format!("{precinct}/{race}"), "no votes cast");
    }
    for precinct in &summary.precincts_missing_anchor {
        quality.warn(
            EntityKind::Precinct,
            precinct,
            format!("no '{}' results; races cannot be scored", config.anchor_race),
        );
    }

    progress.set_total(summary.totals.len() as u64);
    progress.set_message(format!("scoring {}", summary.election_id));

    let outcomes: Vec<Result<FlippabilityScore, ExclusionReason>> = summary
        .totals
        .par_iter()
        .map(|totals| {
            let outcome = score_race(totals, config);
            progress.inc(1);
            outcome
        })
        .collect();

    let mut scores = Vec::new();
    let mut exclusions: BTreeMap<ExclusionReason, usize> = BTreeMap::new();
    for outcome in outcomes {
        match outcome {
            Ok(score) => scores.push(score),
            Err(reason) => *exclusions.entry(reason).or_default() += 1,
        }
    }
    for (reason, count) in &exclusions {
        log::debug!("{count} races not scored: {reason}");
    }
    quality.processed = scores.len();

    let report = FlippabilityReport::new(summary.election_id.as_str(), scores, exclusions);
    progress.finish(format!(
        "Scored {} races ({} not eligible)",
        report.ranked.len(),
        report.excluded_count(),
    ));

    Ok(ScoringRun {
        report,
        quality,
        rows_in_scope: summary.rows_in_scope,
        rows_out_of_scope: summary.rows_out_of_scope,
    })
}
