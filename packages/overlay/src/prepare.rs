//! Converts raw boundary rings into projected, valid multi-polygons.
//!
//! Input rings may be unclosed, carry duplicate or non-finite vertices, or
//! self-intersect. Each boundary gets exactly one repair attempt; anything
//! still unusable afterwards is rejected with an [`OverlayError`] so the
//! caller can exclude it from the run.

use canvass_geography_models::{BoundaryShape, PolygonRings};
use geo::{Area, BooleanOps, BoundingRect, Coord, LineString, MultiPolygon, Polygon, Validation};
use rstar::AABB;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};

use crate::projection::EqualAreaProjection;
use crate::{NEGLIGIBLE_AREA_M2, OverlayConfig, OverlayError};

/// Something that was changed while preparing a boundary.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RepairReason {
    /// A ring's last vertex did not equal its first.
    ClosedRing,
    /// Vertices with NaN or infinite coordinates were removed.
    DroppedNonFiniteVertex,
    /// A ring with fewer than three distinct vertices was removed.
    DroppedDegenerateRing,
    /// Self-intersections or overlapping parts were resolved.
    ResolvedInvalidTopology,
}

/// What a repair did to a boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairNote {
    /// Every kind of change applied, deduplicated and sorted.
    pub reasons: Vec<RepairReason>,
    /// Projected area before topology repair, in m².
    pub area_before_m2: f64,
    /// Projected area after topology repair, in m².
    pub area_after_m2: f64,
    /// `|after - before| / max(after, before) * 100`.
    pub area_change_pct: f64,
    /// Whether the area change exceeds the configured tolerance.
    pub exceeds_tolerance: bool,
}

/// A projected, valid boundary ready for overlay.
#[derive(Debug, Clone)]
pub struct PreparedBoundary {
    /// Precinct code or tract GEOID.
    pub id: String,
    /// Geometry in the equal-area plane (meters).
    pub geometry: MultiPolygon<f64>,
    /// Planar area in m².
    pub area_m2: f64,
    /// Bounding box in the equal-area plane.
    pub envelope: AABB<[f64; 2]>,
    /// Present if anything had to be repaired.
    pub repair: Option<RepairNote>,
}

/// Projects and validates a boundary, repairing it once if needed.
///
/// # Errors
///
/// * [`OverlayError::EmptyGeometry`] if the shape has no vertices.
/// * [`OverlayError::Degenerate`] if nothing with area survives.
/// * [`OverlayError::Unrepairable`] if the topology repair produces nothing.
pub fn prepare_boundary(
    id: &str,
    shape: &BoundaryShape,
    projection: &EqualAreaProjection,
    config: &OverlayConfig,
) -> Result<PreparedBoundary, OverlayError> {
    if shape.is_empty() {
        return Err(OverlayError::EmptyGeometry { id: id.to_string() });
    }

    let mut reasons = Vec::new();
    let polygons: Vec<Polygon<f64>> = shape
        .polygons
        .iter()
        .filter_map(|rings| build_polygon(rings, projection, &mut reasons))
        .collect();

    if polygons.is_empty() {
        return Err(OverlayError::Degenerate { id: id.to_string() });
    }

    let mut geometry = MultiPolygon::new(polygons);
    let area_before_m2 = geometry.unsigned_area();
    let mut area_after_m2 = area_before_m2;

    if !geometry.is_valid() {
        log::debug!("Boundary {id} is invalid, attempting repair");
        geometry = resolve_topology(geometry);
        area_after_m2 = geometry.unsigned_area();
        if geometry.0.is_empty() || area_after_m2 <= NEGLIGIBLE_AREA_M2 {
            return Err(OverlayError::Unrepairable {
                id: id.to_string(),
                message: "topology repair produced no area".to_string(),
            });
        }
        reasons.push(RepairReason::ResolvedInvalidTopology);
    }

    if area_after_m2 <= NEGLIGIBLE_AREA_M2 {
        return Err(OverlayError::Degenerate { id: id.to_string() });
    }

    let repair = if reasons.is_empty() {
        None
    } else {
        reasons.sort_unstable();
        reasons.dedup();
        let area_change_pct = area_change_pct(area_before_m2, area_after_m2);
        let exceeds_tolerance = area_change_pct > config.repair_area_tolerance_pct;
        if exceeds_tolerance {
            log::warn!(
                "Repair of boundary {id} changed its area by {area_change_pct:.3}% \
                 ({area_before_m2:.1} -> {area_after_m2:.1} m²)"
            );
        } else {
            log::debug!("Repaired boundary {id}: {reasons:?}");
        }
        Some(RepairNote {
            reasons,
            area_before_m2,
            area_after_m2,
            area_change_pct,
            exceeds_tolerance,
        })
    };

    Ok(PreparedBoundary {
        id: id.to_string(),
        envelope: compute_envelope(&geometry),
        area_m2: area_after_m2,
        geometry,
        repair,
    })
}

/// Resolves self-intersecting rings one polygon at a time, then merges the
/// parts with a running union so overlapping parts keep their shared area.
fn resolve_topology(geometry: MultiPolygon<f64>) -> MultiPolygon<f64> {
    let empty = MultiPolygon::new(Vec::new());
    geometry
        .into_iter()
        .map(|polygon| {
            let part = MultiPolygon::new(vec![polygon]);
            if part.is_valid() {
                part
            } else {
                part.union(&empty)
            }
        })
        .reduce(|merged, part| merged.union(&part))
        .unwrap_or_else(|| MultiPolygon::new(Vec::new()))
}

fn area_change_pct(before: f64, after: f64) -> f64 {
    let reference = before.max(after);
    if reference <= 0.0 {
        0.0
    } else {
        (after - before).abs() / reference * 100.0
    }
}

/// Builds one projected polygon. Returns `None` if the exterior ring is
/// unusable; unusable holes are dropped individually.
fn build_polygon(
    rings: &PolygonRings,
    projection: &EqualAreaProjection,
    reasons: &mut Vec<RepairReason>,
) -> Option<Polygon<f64>> {
    let exterior = build_ring(&rings.exterior, projection, reasons)?;
    let holes = rings
        .holes
        .iter()
        .filter_map(|hole| build_ring(hole, projection, reasons))
        .collect();
    Some(Polygon::new(exterior, holes))
}

fn build_ring(
    raw: &[[f64; 2]],
    projection: &EqualAreaProjection,
    reasons: &mut Vec<RepairReason>,
) -> Option<LineString<f64>> {
    let mut coords: Vec<Coord<f64>> = Vec::with_capacity(raw.len() + 1);
    for &[lon, lat] in raw {
        if !lon.is_finite() || !lat.is_finite() {
            reasons.push(RepairReason::DroppedNonFiniteVertex);
            continue;
        }
        let coord = projection.project(lon, lat);
        if coords.last() != Some(&coord) {
            coords.push(coord);
        }
    }

    let first = *coords.first()?;
    if coords.len() > 1 && coords.last() != Some(&first) {
        reasons.push(RepairReason::ClosedRing);
        coords.push(first);
    }

    // A closed ring repeats its first vertex, so three distinct vertices
    // need four entries.
    if coords.len() < 4 {
        reasons.push(RepairReason::DroppedDegenerateRing);
        return None;
    }

    Some(LineString::new(coords))
}

/// Computes the bounding box envelope for a [`MultiPolygon`].
fn compute_envelope(mp: &MultiPolygon<f64>) -> AABB<[f64; 2]> {
    mp.bounding_rect().map_or_else(
        || AABB::from_point([0.0, 0.0]),
        |rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
    )
}
