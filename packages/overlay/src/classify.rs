//! Topological relationship between a precinct and a tract.

use canvass_geography_models::RelationshipKind;
use geo::{MultiPolygon, Relate};

use crate::NEGLIGIBLE_AREA_M2;

/// DE-9IM pattern requiring the two boundaries to share a line segment.
const SHARED_BOUNDARY_LENGTH: &str = "****1****";

/// Classifies the relationship from the intersection area, falling back to
/// a DE-9IM test only when the interiors do not meet.
///
/// `tolerance` is relative: a precinct counts as within a tract when the
/// intersection covers at least `(1 - tolerance)` of the precinct. When
/// both containments hold (equal shapes), the precinct is reported as
/// `within`.
#[must_use]
pub fn classify(
    precinct: &MultiPolygon<f64>,
    precinct_area_m2: f64,
    tract: &MultiPolygon<f64>,
    tract_area_m2: f64,
    intersection_area_m2: f64,
    tolerance: f64,
) -> RelationshipKind {
    if intersection_area_m2 > NEGLIGIBLE_AREA_M2 {
        if intersection_area_m2 >= precinct_area_m2 * (1.0 - tolerance) {
            RelationshipKind::Within
        } else if intersection_area_m2 >= tract_area_m2 * (1.0 - tolerance) {
            RelationshipKind::Contains
        } else {
            RelationshipKind::Overlaps
        }
    } else if shares_boundary_length(precinct, tract) {
        RelationshipKind::Touches
    } else {
        RelationshipKind::None
    }
}

fn shares_boundary_length(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> bool {
    a.relate(b)
        .matches(SHARED_BOUNDARY_LENGTH)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{LineString, Polygon};

    fn square(x: f64, y: f64, size: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![Polygon::new(
            LineString::from(vec![
                (x, y),
                (x + size, y),
                (x + size, y + size),
                (x, y + size),
                (x, y),
            ]),
            vec![],
        )])
    }

    #[test]
    fn area_based_kinds() {
        let a = square(0.0, 0.0, 100.0);
        let b = square(0.0, 0.0, 100.0);
        assert_eq!(
            classify(&a, 10_000.0, &b, 40_000.0, 10_000.0, 1e-6),
            RelationshipKind::Within
        );
        assert_eq!(
            classify(&a, 40_000.0, &b, 10_000.0, 10_000.0, 1e-6),
            RelationshipKind::Contains
        );
        assert_eq!(
            classify(&a, 40_000.0, &b, 40_000.0, 10_000.0, 1e-6),
            RelationshipKind::Overlaps
        );
    }

    #[test]
    fn equal_shapes_are_within() {
        let a = square(0.0, 0.0, 100.0);
        assert_eq!(
            classify(&a, 10_000.0, &a, 10_000.0, 10_000.0, 1e-6),
            RelationshipKind::Within
        );
    }

    #[test]
    fn tolerance_absorbs_float_noise() {
        let a = square(0.0, 0.0, 100.0);
        assert_eq!(
            classify(&a, 10_000.0, &a, 50_000.0, 9_999.999_9, 1e-6),
            RelationshipKind::Within
        );
    }

    #[test]
    fn shared_edge_touches() {
        let a = square(0.0, 0.0, 100.0);
        let b = square(100.0, 0.0, 100.0);
        assert_eq!(
            classify(&a, 10_000.0, &b, 10_000.0, 0.0, 1e-6),
            RelationshipKind::Touches
        );
    }

    #[test]
    fn corner_contact_is_none() {
        let a = square(0.0, 0.0, 100.0);
        let b = square(100.0, 100.0, 100.0);
        assert_eq!(
            classify(&a, 10_000.0, &b, 10_000.0, 0.0, 1e-6),
            RelationshipKind::None
        );
    }

    #[test]
    fn disjoint_is_none() {
        let a = square(0.0, 0.0, 100.0);
        let b = square(500.0, 0.0, 100.0);
        assert_eq!(
            classify(&a, 10_000.0, &b, 10_000.0, 0.0, 1e-6),
            RelationshipKind::None
        );
    }
}
