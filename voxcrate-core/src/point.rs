//! Point types and related functionality

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// A 3D point with floating point coordinates
pub type Point3f = Point3<f32>;

/// A 3D vector with floating point components
pub type Vector3f = Vector3<f32>;

/// A point source with a scalar weight ("charge")
///
/// The weight scales the falloff contribution the point makes to every grid
/// sample within range. Negative weights are allowed and simply subtract in
/// summing mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedPoint {
    pub position: Point3f,
    pub weight: f32,
}

impl WeightedPoint {
    /// Create a weighted point
    pub fn new(position: Point3f, weight: f32) -> Self {
        Self { position, weight }
    }

    /// Create a point with unit weight
    pub fn unit(position: Point3f) -> Self {
        Self::new(position, 1.0)
    }
}

impl Default for WeightedPoint {
    fn default() -> Self {
        Self::unit(Point3f::origin())
    }
}

impl From<Point3f> for WeightedPoint {
    fn from(position: Point3f) -> Self {
        Self::unit(position)
    }
}

impl From<WeightedPoint> for Point3f {
    fn from(point: WeightedPoint) -> Self {
        point.position
    }
}
