//! This module implements the geometry shared by shell elements: normals,
//! areas and centroids computed from corner positions.
//!
//! Numeric policy, the same for every shell topology:
//!   - corners are given in winding order; a counter-clockwise quad seen from
//!     +z has a +z normal;
//!   - quad normals come from the cross product of the diagonals,
//!     (n3 - n1) x (n4 - n2), and the area is half of its magnitude;
//!   - an element is degenerate if any coordinate isn't finite, if all
//!     corners coincide, if any three corners are collinear, or if the cross
//!     product used for the normal is too small. "Collinear" and "too small"
//!     mean a triangle or parallelogram area at most `DEGENERACY_TOLERANCE`
//!     times the square of the longest corner-to-corner distance.

use std::error::Error;
use std::fmt::Display;

use nalgebra::{Point3, Unit, Vector3};
use serde::{Deserialize, Serialize};

/// Relative area below which an element counts as degenerate.
pub const DEGENERACY_TOLERANCE: f64 = 1e-10;

/// Why an element's geometry couldn't be computed.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum GeometryError {
  /// Some corner has a NaN or infinite coordinate.
  NonFinite,
  /// All corners are in the same spot.
  Collapsed,
  /// Three corners are collinear (or coincident).
  Collinear {
    /// Zero-based indices of the offending corners.
    corners: [usize; 3]
  },
  /// The diagonals are parallel, so there's no normal.
  ParallelDiagonals
}

impl Display for GeometryError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    return match self {
      Self::NonFinite => write!(f, "degenerate element (non-finite corner)"),
      Self::Collapsed => write!(f, "degenerate element (collapsed corners)"),
      Self::Collinear { corners: [a, b, c] } => write!(
        f,
        "degenerate element (corners {}, {} and {} are collinear)",
        a + 1, b + 1, c + 1
      ),
      Self::ParallelDiagonals => write!(
        f, "degenerate element (parallel diagonals)"
      ),
    };
  }
}

impl Error for GeometryError {}

/// The normal and area of a shell element.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ShellGeometry {
  /// The unit normal.
  pub normal: Unit<Vector3<f64>>,
  /// The area.
  pub area: f64
}

/// Longest distance between any two of the points, squared.
fn scale_squared(pts: &[&Point3<f64>]) -> f64 {
  let mut l2: f64 = 0.0;
  for (i, a) in pts.iter().enumerate() {
    for b in pts.iter().skip(i + 1) {
      l2 = l2.max((*b - *a).norm_squared());
    }
  }
  return l2;
}

/// Checks the common degeneracy conditions and returns the threshold that
/// areas are compared against.
fn area_threshold(pts: &[&Point3<f64>]) -> Result<f64, GeometryError> {
  if pts.iter().any(|p| p.coords.iter().any(|x| !x.is_finite())) {
    return Err(GeometryError::NonFinite);
  }
  let l2 = scale_squared(pts);
  if l2 == 0.0 {
    return Err(GeometryError::Collapsed);
  }
  let threshold = DEGENERACY_TOLERANCE * l2;
  let n = pts.len();
  // a triangle only has the one
  let triples = if n == 3 { 1 } else { n };
  for i in 0..triples {
    let corners = [i, (i + 1) % n, (i + 2) % n];
    let [a, b, c] = corners.map(|k| pts[k]);
    if 0.5 * (b - a).cross(&(c - a)).norm() <= threshold {
      return Err(GeometryError::Collinear { corners });
    }
  }
  return Ok(threshold);
}

/// Computes the unit normal and area of a quadrilateral.
pub fn quad_normal_area(
  n1: &Point3<f64>,
  n2: &Point3<f64>,
  n3: &Point3<f64>,
  n4: &Point3<f64>
) -> Result<ShellGeometry, GeometryError> {
  let threshold = area_threshold(&[n1, n2, n3, n4])?;
  let cross = (n3 - n1).cross(&(n4 - n2));
  let magnitude = cross.norm();
  if 0.5 * magnitude <= threshold {
    return Err(GeometryError::ParallelDiagonals);
  }
  return Ok(ShellGeometry {
    normal: Unit::new_unchecked(cross / magnitude),
    area: 0.5 * magnitude
  });
}

/// Computes the unit normal and area of a triangle.
pub fn tria_normal_area(
  n1: &Point3<f64>,
  n2: &Point3<f64>,
  n3: &Point3<f64>
) -> Result<ShellGeometry, GeometryError> {
  area_threshold(&[n1, n2, n3])?;
  let cross = (n2 - n1).cross(&(n3 - n1));
  let magnitude = cross.norm();
  return Ok(ShellGeometry {
    normal: Unit::new_unchecked(cross / magnitude),
    area: 0.5 * magnitude
  });
}

/// The arithmetic mean of the corners of a quad.
pub fn quad_centroid(
  n1: &Point3<f64>,
  n2: &Point3<f64>,
  n3: &Point3<f64>,
  n4: &Point3<f64>
) -> Point3<f64> {
  return Point3::from((n1.coords + n2.coords + n3.coords + n4.coords) / 4.0);
}
