#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Precinct/tract polygon overlay.
//!
//! Boundaries are projected into an equal-area plane and repaired
//! ([`prepare`]), tracts are bulk-loaded into an R-tree ([`index`]), and
//! each precinct is intersected with its bounding-box candidates to yield
//! [`Intersection`] records with planar areas in square meters.
//!
//! Overlay is a pure function of its inputs; precincts can be processed in
//! any order or in parallel.

pub mod classify;
pub mod index;
pub mod prepare;
pub mod projection;

use canvass_geography_models::{Intersection, RelationshipKind};
use geo::{Area, BooleanOps};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};
use thiserror::Error;

pub use index::TractIndex;
pub use prepare::{PreparedBoundary, RepairNote, RepairReason, prepare_boundary};
pub use projection::EqualAreaProjection;

/// Areas at or below this are treated as zero (m²).
pub const NEGLIGIBLE_AREA_M2: f64 = 1.0e-3;

/// Errors for boundaries that cannot take part in an overlay.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OverlayError {
    /// The boundary has no vertices.
    #[error("Boundary {id} is empty")]
    EmptyGeometry {
        /// Precinct code or tract GEOID.
        id: String,
    },

    /// Nothing with positive area remains after cleaning the rings.
    #[error("Boundary {id} is degenerate (zero area)")]
    Degenerate {
        /// Precinct code or tract GEOID.
        id: String,
    },

    /// The single repair attempt failed.
    #[error("Boundary {id} could not be repaired: {message}")]
    Unrepairable {
        /// Precinct code or tract GEOID.
        id: String,
        /// What went wrong.
        message: String,
    },
}

impl OverlayError {
    /// The id of the boundary that failed.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::EmptyGeometry { id } | Self::Degenerate { id } | Self::Unrepairable { id, .. } => {
                id
            }
        }
    }
}

/// Thresholds for overlay filtering and repair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct OverlayConfig {
    /// Intersections smaller than this are slivers (m²).
    pub min_intersection_area_m2: f64,
    /// Intersections covering less than this share of the precinct are
    /// slivers (percent).
    pub min_precinct_overlap_pct: f64,
    /// Repairs that change area by more than this are surfaced as warnings
    /// (percent).
    pub repair_area_tolerance_pct: f64,
    /// Relative tolerance for `within`/`contains` classification.
    pub containment_tolerance: f64,
    /// Standard parallel of the equal-area projection (degrees).
    pub standard_parallel_deg: f64,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            min_intersection_area_m2: 100.0,
            min_precinct_overlap_pct: 1.0,
            repair_area_tolerance_pct: 0.1,
            containment_tolerance: 1.0e-6,
            standard_parallel_deg: 0.0,
        }
    }
}

/// Why an intersecting candidate tract was not emitted.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DiscardReason {
    /// The boundaries share length but no interior area.
    TouchesOnly,
    /// The intersection is below the absolute area floor.
    BelowAreaFloor,
    /// The intersection is below the relative precinct-share floor.
    BelowPrecinctShare,
}

/// A candidate tract that was dropped as a sliver or a touch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscardedCandidate {
    /// Tract GEOID.
    pub tract_geoid: String,
    /// Intersection area in m².
    pub intersection_area_m2: f64,
    /// Why it was dropped.
    pub reason: DiscardReason,
}

/// All overlay output for one precinct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrecinctOverlay {
    /// Precinct code.
    pub precinct_id: String,
    /// Planar precinct area in m².
    pub precinct_area_m2: f64,
    /// Meaningful intersections, ordered by tract GEOID.
    pub intersections: Vec<Intersection>,
    /// Dropped candidates, ordered by tract GEOID.
    pub discarded: Vec<DiscardedCandidate>,
}

impl PrecinctOverlay {
    /// Sum of all emitted intersection areas (m²).
    #[must_use]
    pub fn covered_area_m2(&self) -> f64 {
        self.intersections
            .iter()
            .map(|i| i.intersection_area_m2)
            .sum()
    }

    /// Share of the precinct covered by emitted intersections (percent).
    #[must_use]
    pub fn covered_pct(&self) -> f64 {
        overlap_pct(self.covered_area_m2(), self.precinct_area_m2)
    }
}

/// `part / whole * 100`, or `0` for an empty whole.
#[must_use]
pub fn overlap_pct(part_m2: f64, whole_m2: f64) -> f64 {
    if whole_m2 > 0.0 {
        part_m2 / whole_m2 * 100.0
    } else {
        0.0
    }
}

/// Intersects one prepared precinct with every tract whose bounding box
/// overlaps it.
#[must_use]
pub fn overlay_precinct(
    precinct: &PreparedBoundary,
    tracts: &TractIndex,
    config: &OverlayConfig,
) -> PrecinctOverlay {
    let mut intersections = Vec::new();
    let mut discarded = Vec::new();

    for tract in tracts.candidates(&precinct.envelope) {
        let raw_area = precinct.geometry.intersection(&tract.geometry).unsigned_area();
        let area = raw_area.min(precinct.area_m2).min(tract.area_m2);

        let relationship = classify::classify(
            &precinct.geometry,
            precinct.area_m2,
            &tract.geometry,
            tract.area_m2,
            area,
            config.containment_tolerance,
        );

        let precinct_overlap_pct = overlap_pct(area, precinct.area_m2);

        let reason = match relationship {
            RelationshipKind::None => continue,
            RelationshipKind::Touches => Some(DiscardReason::TouchesOnly),
            _ if area < config.min_intersection_area_m2 => Some(DiscardReason::BelowAreaFloor),
            _ if precinct_overlap_pct < config.min_precinct_overlap_pct => {
                Some(DiscardReason::BelowPrecinctShare)
            }
            _ => None,
        };

        if let Some(reason) = reason {
            log::debug!(
                "Precinct {} / tract {}: dropped {reason} ({area:.1} m²)",
                precinct.id,
                tract.id,
            );
            discarded.push(DiscardedCandidate {
                tract_geoid: tract.id.clone(),
                intersection_area_m2: area,
                reason,
            });
            continue;
        }

        intersections.push(Intersection {
            precinct_id: precinct.id.clone(),
            tract_geoid: tract.id.clone(),
            intersection_area_m2: area,
            precinct_overlap_pct,
            tract_overlap_pct: overlap_pct(area, tract.area_m2),
            relationship,
        });
    }

    PrecinctOverlay {
        precinct_id: precinct.id.clone(),
        precinct_area_m2: precinct.area_m2,
        intersections,
        discarded,
    }
}
