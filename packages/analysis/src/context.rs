//! Inputs for one analysis run.

use std::collections::BTreeSet;

use canvass_analysis_models::{EntityKind, RunReport};
use canvass_attribution_models::DemographicTable;
use canvass_geography_models::{CensusTract, Geoid, Precinct};
use canvass_overlay::EqualAreaProjection;

use crate::config::AnalysisConfig;

/// Everything one run reads: configuration, boundaries, and estimates.
///
/// Built once, then shared immutably with the batch runners. Duplicate
/// precinct codes and tract GEOIDs are dropped at construction (first one
/// wins) and recorded in [`AnalysisContext::intake`].
#[derive(Debug, Clone)]
pub struct AnalysisContext {
    /// Run thresholds.
    pub config: AnalysisConfig,
    /// Projection built from `config.overlay.standard_parallel_deg`.
    pub projection: EqualAreaProjection,
    /// Precincts, unique by code.
    pub precincts: Vec<Precinct>,
    /// Tracts, unique by GEOID.
    pub tracts: Vec<CensusTract>,
    /// Estimates keyed by GEOID and variable code.
    pub demographics: DemographicTable,
    /// Issues found while assembling the inputs.
    pub intake: RunReport,
}

impl AnalysisContext {
    /// Assembles a context. Estimates carried on the tracts seed the
    /// demographic table.
    #[must_use]
    pub fn new(config: AnalysisConfig, precincts: Vec<Precinct>, tracts: Vec<CensusTract>) -> Self {
        let mut intake = RunReport::new();

        let mut seen = BTreeSet::new();
        let precincts: Vec<Precinct> = precincts
            .into_iter()
            .filter(|p| {
                let fresh = seen.insert(p.id.clone());
                if !fresh {
                    intake.exclude(EntityKind::Precinct, &p.id, "duplicate precinct code");
                }
                fresh
            })
            .collect();

        let mut seen = BTreeSet::new();
        let tracts: Vec<CensusTract> = tracts
            .into_iter()
            .filter(|t| {
                let fresh = seen.insert(t.geoid.clone());
                if !fresh {
                    intake.exclude(EntityKind::Tract, &t.geoid, "duplicate GEOID");
                }
                fresh
            })
            .collect();

        for tract in &tracts {
            if let Err(e) = Geoid::parse(&tract.geoid) {
                intake.warn(EntityKind::Tract, &tract.geoid, e.to_string());
            }
        }

        let demographics = DemographicTable::from_tracts(&tracts);
        intake.processed = precincts.len() + tracts.len();

        log::info!(
            "Analysis context: {} precincts, {} tracts, {} tracts with estimates",
            precincts.len(),
            tracts.len(),
            demographics.tract_count(),
        );

        Self {
            projection: EqualAreaProjection::new(config.overlay.standard_parallel_deg),
            config,
            precincts,
            tracts,
            demographics,
            intake,
        }
    }

    /// Merges estimates loaded separately from the boundaries. Values for a
    /// (GEOID, variable) already present are replaced.
    pub fn add_demographics(&mut self, table: DemographicTable) {
        self.demographics.extend(table);
    }

    /// Demographic GEOIDs that have no boundary in this run.
    #[must_use]
    pub fn orphaned_demographic_tracts(&self) -> Vec<&str> {
        let bounded: BTreeSet<&str> = self.tracts.iter().map(|t| t.geoid.as_str()).collect();
        self.demographics
            .geoids()
            .filter(|geoid| !bounded.contains(geoid))
            .collect()
    }
}
