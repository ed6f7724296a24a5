#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Precinct, census tract, and boundary overlay types.
//!
//! Boundaries are carried as raw WGS84 (longitude, latitude) rings so that
//! this crate stays free of any geometry engine. The overlay crate converts
//! them into projected polygons, repairing them where needed.

pub mod fips;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

/// One polygon as a set of raw rings: an exterior ring plus zero or more
/// holes. Each vertex is `[longitude, latitude]` in EPSG:4326.
///
/// Rings are not required to be closed here; closing them is part of
/// geometry repair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolygonRings {
    /// Outer boundary.
    pub exterior: Vec<[f64; 2]>,
    /// Interior rings (holes).
    #[serde(default)]
    pub holes: Vec<Vec<[f64; 2]>>,
}

impl PolygonRings {
    /// Creates a hole-free polygon from an exterior ring.
    #[must_use]
    pub const fn simple(exterior: Vec<[f64; 2]>) -> Self {
        Self {
            exterior,
            holes: Vec::new(),
        }
    }
}

/// A boundary made of one or more polygons (a multi-polygon).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundaryShape {
    /// Member polygons.
    pub polygons: Vec<PolygonRings>,
}

impl BoundaryShape {
    /// Creates a boundary from a single polygon.
    #[must_use]
    pub fn single(polygon: PolygonRings) -> Self {
        Self {
            polygons: vec![polygon],
        }
    }

    /// Returns `true` if the boundary has no vertices at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.polygons.iter().all(|p| p.exterior.is_empty())
    }

    /// Total number of vertices across all rings.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.polygons
            .iter()
            .map(|p| p.exterior.len() + p.holes.iter().map(Vec::len).sum::<usize>())
            .sum()
    }
}

/// A voting precinct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Precinct {
    /// Precinct code. Zero padding is significant: "074" and "74" are
    /// different precincts.
    pub id: String,
    /// Human-readable precinct name.
    pub name: String,
    /// County name, if known.
    pub county: Option<String>,
    /// Two-letter state abbreviation, if known.
    pub state: Option<String>,
    /// Precinct boundary.
    pub boundary: BoundaryShape,
    /// Registered voters, if known.
    pub registered_voters: Option<u64>,
}

/// A census tract with its demographic estimates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CensusTract {
    /// Census GEOID (state FIPS + county FIPS + tract code, e.g. "11001000100").
    pub geoid: String,
    /// Tract boundary.
    pub boundary: BoundaryShape,
    /// Land area in square meters, as published by the Census Bureau.
    pub land_area_m2: Option<f64>,
    /// Water area in square meters, as published by the Census Bureau.
    pub water_area_m2: Option<f64>,
    /// ACS variable code -> estimate. `None` means the tract has no estimate
    /// for that variable.
    #[serde(default)]
    pub values: BTreeMap<String, Option<f64>>,
}

/// Topological relationship between a precinct and a tract.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RelationshipKind {
    /// The precinct lies entirely inside the tract.
    Within,
    /// The tract lies entirely inside the precinct.
    Contains,
    /// Interiors intersect but neither contains the other.
    Overlaps,
    /// Boundaries share length but interiors do not meet.
    Touches,
    /// No relationship.
    None,
}

impl RelationshipKind {
    /// Returns `true` if the interiors share area.
    #[must_use]
    pub const fn has_area(self) -> bool {
        matches!(self, Self::Within | Self::Contains | Self::Overlaps)
    }
}

/// The overlap between one precinct and one tract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intersection {
    /// Precinct code.
    pub precinct_id: String,
    /// Tract GEOID.
    pub tract_geoid: String,
    /// Area of `precinct ∩ tract` in square meters.
    pub intersection_area_m2: f64,
    /// `intersection_area / area(precinct) * 100`.
    pub precinct_overlap_pct: f64,
    /// `intersection_area / area(tract) * 100`.
    pub tract_overlap_pct: f64,
    /// Topological relationship.
    pub relationship: RelationshipKind,
}

/// Errors raised when parsing a tract GEOID.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeoidError {
    /// The GEOID does not have exactly 11 characters.
    #[error("GEOID '{0}' must be 11 digits")]
    Length(String),
    /// The GEOID contains non-digit characters.
    #[error("GEOID '{0}' contains non-digit characters")]
    NonDigit(String),
}

/// A validated 11-digit census tract GEOID.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Geoid(String);

impl Geoid {
    /// Parses a tract GEOID: 2-digit state FIPS, 3-digit county FIPS, and a
    /// 6-digit tract code.
    ///
    /// # Errors
    ///
    /// Returns [`GeoidError`] if the value is not exactly 11 ASCII digits.
    pub fn parse(value: &str) -> Result<Self, GeoidError> {
        let value = value.trim();
        if !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(GeoidError::NonDigit(value.to_string()));
        }
        if value.len() != 11 {
            return Err(GeoidError::Length(value.to_string()));
        }
        Ok(Self(value.to_string()))
    }

    /// Builds a GEOID from its components as returned by the Census API.
    ///
    /// # Errors
    ///
    /// Returns [`GeoidError`] if the concatenation is not a valid GEOID.
    pub fn from_parts(state: &str, county: &str, tract: &str) -> Result<Self, GeoidError> {
        Self::parse(&format!("{}{}{}", state.trim(), county.trim(), tract.trim()))
    }

    /// Two-digit state FIPS code.
    #[must_use]
    pub fn state_fips(&self) -> &str {
        &self.0[..2]
    }

    /// Three-digit county FIPS code.
    #[must_use]
    pub fn county_fips(&self) -> &str {
        &self.0[2..5]
    }

    /// Five-digit county GEOID (state + county).
    #[must_use]
    pub fn county_geoid(&self) -> &str {
        &self.0[..5]
    }

    /// Six-digit tract code.
    #[must_use]
    pub fn tract_code(&self) -> &str {
        &self.0[5..]
    }

    /// The full GEOID string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Geoid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Geoid {
    type Error = GeoidError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Geoid> for String {
    fn from(value: Geoid) -> Self {
        value.0
    }
}
