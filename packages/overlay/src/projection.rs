//! Lambert cylindrical equal-area projection.
//!
//! Overlay areas must be planar areas in square meters, never raw
//! degree-squared areas. The cylindrical equal-area projection preserves
//! area everywhere on the sphere regardless of its standard parallel, so a
//! single projection serves every precinct and tract in a run. The standard
//! parallel only controls shape distortion and should sit near the middle
//! of the study area.

use geo::Coord;

/// Radius of the authalic sphere for WGS84, in meters.
pub const AUTHALIC_RADIUS_M: f64 = 6_371_007.2;

/// Projects WGS84 longitude/latitude into an equal-area plane in meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EqualAreaProjection {
    cos_phi0: f64,
}

impl EqualAreaProjection {
    /// Creates a projection with the given standard parallel in degrees.
    ///
    /// Parallels at or beyond the poles fall back to the equator.
    #[must_use]
    pub fn new(standard_parallel_deg: f64) -> Self {
        let cos_phi0 = standard_parallel_deg.to_radians().cos();
        let cos_phi0 = if standard_parallel_deg.is_finite() && cos_phi0 > 1e-6 {
            cos_phi0
        } else {
            1.0
        };
        Self { cos_phi0 }
    }

    /// Projects a single `(lon, lat)` pair.
    #[must_use]
    pub fn project(&self, lon: f64, lat: f64) -> Coord<f64> {
        let lat = lat.clamp(-90.0, 90.0);
        Coord {
            x: AUTHALIC_RADIUS_M * lon.to_radians() * self.cos_phi0,
            y: AUTHALIC_RADIUS_M * lat.to_radians().sin() / self.cos_phi0,
        }
    }
}

impl Default for EqualAreaProjection {
    fn default() -> Self {
        Self::new(0.0)
    }
}
