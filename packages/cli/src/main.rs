#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `canvass`: attribute tract demographics to precincts and rank
//! Republican-won races by how few absent Democrats it would take to flip
//! them.
//!
//! JSON results go to `--output` or stdout; summaries go to stderr so
//! stdout stays valid JSON.

mod output;

use std::path::{Path, PathBuf};

use canvass_analysis::{AnalysisConfig, AnalysisContext, run_attribution, run_scoring};
use canvass_cli_utils::IndicatifProgress;
use canvass_flippability::NoPoolPolicy;
use canvass_ingest::{IngestConfig, load_acs_table, load_precincts, load_tracts, load_votes};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "canvass",
    about = "Precinct demographic attribution and flippability scoring"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Overlay precincts on census tracts and attribute ACS estimates
    Attribute {
        /// Precinct boundaries (`GeoJSON` `FeatureCollection`)
        #[arg(long)]
        precincts: PathBuf,
        /// Tract boundaries (`GeoJSON` `FeatureCollection`)
        #[arg(long)]
        tracts: PathBuf,
        /// ACS estimate tables (CSV, or Census API `.json`); repeatable
        #[arg(long)]
        demographics: Vec<PathBuf>,
        /// Configuration file (TOML)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Write JSON here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Score Republican-won races for one election by DVA
    Score {
        /// Vote results CSV
        #[arg(long)]
        votes: PathBuf,
        /// Election cycle to score (e.g., "2022-general")
        #[arg(long)]
        election: String,
        /// Race whose Democratic vote defines the absentee pool
        #[arg(long)]
        anchor_race: Option<String>,
        /// Largest Republican margin (percent) still scored
        #[arg(long)]
        max_margin: Option<f64>,
        /// Smallest total vote count still scored
        #[arg(long)]
        min_votes: Option<u64>,
        /// `separate_tier` or `merge_into_difficult`
        #[arg(long)]
        no_pool_policy: Option<String>,
        /// Configuration file (TOML)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Write JSON here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print the default configuration as TOML
    Config,
}

fn load_configs(
    path: Option<&Path>,
) -> Result<(AnalysisConfig, IngestConfig), Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok((AnalysisConfig::load(path)?, IngestConfig::load(path)?)),
        None => Ok((AnalysisConfig::default(), IngestConfig::default())),
    }
}

fn attribute(
    precincts: &Path,
    tracts: &Path,
    demographics: &[PathBuf],
    config: Option<&Path>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let multi = canvass_cli_utils::init_logger();
    let (config, ingest) = load_configs(config)?;

    let precincts = load_precincts(precincts, &ingest)?;
    let tracts = load_tracts(tracts, &ingest)?;

    let mut ctx = AnalysisContext::new(config, precincts.data, tracts.data);
    ctx.intake.merge(precincts.report);
    ctx.intake.merge(tracts.report);
    for path in demographics {
        let table = load_acs_table(path)?;
        ctx.add_demographics(table.data);
        ctx.intake.merge(table.report);
    }
    let orphans = ctx.orphaned_demographic_tracts().len();
    if orphans > 0 {
        log::warn!("{orphans} tracts have estimates but no boundary");
    }

    let progress = IndicatifProgress::batch_bar(&multi, "Attributing precincts");
    let run = run_attribution(&ctx, &progress);

    output::write_json(&run, output)?;
    output::print_coverage(&run.coverage);
    output::print_issues(&run.report);

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn score(
    votes: &Path,
    election: &str,
    anchor_race: Option<String>,
    max_margin: Option<f64>,
    min_votes: Option<u64>,
    no_pool_policy: Option<&str>,
    config: Option<&Path>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let multi = canvass_cli_utils::init_logger();
    let (mut config, _) = load_configs(config)?;

    if let Some(anchor_race) = anchor_race {
        config.scoring.anchor_race = anchor_race;
    }
    if let Some(max_margin) = max_margin {
        config.scoring.max_margin_pct = max_margin;
    }
    if let Some(min_votes) = min_votes {
        config.scoring.min_total_votes = min_votes;
    }
    if let Some(policy) = no_pool_policy {
        config.scoring.no_pool_policy = policy
            .parse::<NoPoolPolicy>()
            .map_err(|_| format!("Unknown no-pool policy '{policy}'"))?;
    }
    config.validate()?;

    let votes = load_votes(votes)?;

    let progress = IndicatifProgress::batch_bar(&multi, "Scoring races");
    let mut run = run_scoring(&config.scoring, election, &votes.data, &progress)?;

    let mut quality = votes.report;
    quality.processed = 0;
    quality.merge(run.quality);
    run.quality = quality;

    output::write_json(&run, output)?;
    output::print_tiers(&run.report);
    output::print_issues(&run.quality);

    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Attribute {
            precincts,
            tracts,
            demographics,
            config,
            output,
        } => attribute(
            &precincts,
            &tracts,
            &demographics,
            config.as_deref(),
            output.as_deref(),
        )?,
        Commands::Score {
            votes,
            election,
            anchor_race,
            max_margin,
            min_votes,
            no_pool_policy,
            config,
            output,
        } => score(
            &votes,
            &election,
            anchor_race,
            max_margin,
            min_votes,
            no_pool_policy.as_deref(),
            config.as_deref(),
            output.as_deref(),
        )?,
        Commands::Config => print!("{}", output::default_config_toml()?),
    }

    Ok(())
}
