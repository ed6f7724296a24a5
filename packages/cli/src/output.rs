//! JSON output and human-readable summaries.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use canvass_analysis::AnalysisConfig;
use canvass_analysis_models::{RunReport, Severity};
use canvass_attribution_models::VariableCoverage;
use canvass_flippability::FlippabilityReport;
use canvass_ingest::IngestConfig;
use serde::Serialize;

/// Issues listed individually before the summary switches to counts only.
const MAX_LISTED_ISSUES: usize = 20;

/// Best-ranked races shown under each tier.
const MAX_LISTED_TARGETS: usize = 5;

/// Writes `value` as pretty JSON to `path`, or to stdout.
///
/// # Errors
///
/// Returns an error if the file cannot be created or serialization fails.
pub fn write_json<T: Serialize>(
    value: &T,
    path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            serde_json::to_writer_pretty(BufWriter::new(File::create(path)?), value)?;
            log::info!("Wrote {}", path.display());
        }
        None => {
            serde_json::to_writer_pretty(std::io::stdout().lock(), value)?;
            println!();
        }
    }
    Ok(())
}

pub fn print_coverage(coverage: &[VariableCoverage]) {
    eprintln!();
    eprintln!("Coverage:");
    for c in coverage {
        eprintln!("  {:<14} {c}", c.variable_code);
    }
}

pub fn print_tiers(report: &FlippabilityReport) {
    eprintln!();
    eprintln!("Election {}:", report.election_id);
    eprintln!(
        "  {:<26} {:>6} {:>9} {:>9} {:>10}",
        "Tier", "Races", "Avg DVA", "Vote gap", "DVA pool"
    );
    for summary in &report.tiers {
        let average = summary
            .average_dva_pct
            .map_or_else(|| "-".to_string(), |dva| format!("{dva:.1}%"));
        eprintln!(
            "  {:<26} {:>6} {:>9} {:>9} {:>10}",
            summary.tier.label(),
            summary.count,
            average,
            summary.total_vote_gap,
            summary.total_absenteeism_pool,
        );
    }
    for line in target_lines(report) {
        eprintln!("{line}");
    }
    if !report.exclusions.is_empty() {
        eprintln!("  Not scored:");
        for (reason, count) in &report.exclusions {
            eprintln!("    {reason}: {count}");
        }
    }
}

pub fn print_issues(report: &RunReport) {
    eprintln!();
    eprintln!(
        "{} processed, {} excluded, {} warnings",
        report.processed,
        report.excluded(),
        report.warned()
    );
    for issue in report.issues.iter().take(MAX_LISTED_ISSUES) {
        let marker = match issue.severity {
            Severity::Excluded => "excluded",
            Severity::Warning => "warning ",
        };
        eprintln!("  {marker} {} {}: {}", issue.entity, issue.id, issue.message);
    }
    if report.issues.len() > MAX_LISTED_ISSUES {
        eprintln!(
            "  ... and {} more (see JSON output)",
            report.issues.len() - MAX_LISTED_ISSUES
        );
    }
}

/// The top races of every non-empty tier, best first.
fn target_lines(report: &FlippabilityReport) -> Vec<String> {
    let mut lines = Vec::new();
    for (tier, scores) in report.by_tier() {
        lines.push(format!("  {}:", tier.label()));
        for score in scores.iter().take(MAX_LISTED_TARGETS) {
            let dva = score
                .dva_pct_needed
                .map_or_else(|| "no pool".to_string(), |dva| format!("{dva:.1}%"));
            lines.push(format!(
                "    {} {}: {dva} (gap {})",
                score.precinct_id,
                score.race_name,
                score.vote_gap()
            ));
        }
        if scores.len() > MAX_LISTED_TARGETS {
            lines.push(format!("    ... and {} more", scores.len() - MAX_LISTED_TARGETS));
        }
    }
    lines
}

#[derive(Serialize)]
struct IngestTable {
    ingest: IngestConfig,
}

/// The default analysis and ingestion configuration as one TOML document.
///
/// # Errors
///
/// Returns an error if rendering fails.
pub fn default_config_toml() -> Result<String, Box<dyn std::error::Error>> {
    let analysis = AnalysisConfig::default().to_toml_string()?;
    let ingest = toml::to_string(&IngestTable {
        ingest: IngestConfig::default(),
    })?;
    Ok(format!("{analysis}\n{ingest}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvass_analysis::{null_progress, run_scoring};
    use canvass_flippability::ScoringConfig;

    #[test]
    fn targets_are_listed_under_their_tier_in_rank_order() {
        let csv = "\
election_id,precinct_id,race_name,candidate_party,vote_count
2022,704,Governor,DEM,2089
2022,704,Governor,REP,1300
2022,704,State Senate,DEM,1383
2022,704,State Senate,REP,1456
2022,705,Governor,DEM,902
2022,705,Governor,REP,800
2022,705,State Senate,DEM,820
2022,705,State Senate,REP,850
";
        let votes = canvass_ingest::parse_votes(csv.as_bytes()).unwrap();
        let run = run_scoring(
            &ScoringConfig::default(),
            "2022",
            &votes.data,
            &null_progress(),
        )
        .unwrap();

        let lines = target_lines(&run.report);
        assert_eq!(
            lines,
            vec![
                "  Highly flippable:".to_string(),
                "    704 State Senate: 10.5% (gap 73)".to_string(),
                "  Flippable:".to_string(),
                "    705 State Senate: 37.8% (gap 30)".to_string(),
            ]
        );
    }

    #[test]
    fn default_config_round_trips_through_both_loaders() {
        let rendered = default_config_toml().unwrap();
        assert!(rendered.contains("[scoring]"));
        assert!(rendered.contains("[ingest]"));
        assert_eq!(
            AnalysisConfig::from_toml_str(&rendered).unwrap(),
            AnalysisConfig::default()
        );
        assert_eq!(
            IngestConfig::from_toml_str(&rendered).unwrap(),
            IngestConfig::default()
        );
    }
}
