//! Point cloud data structures and functionality

use crate::point::*;
use crate::transform::Transform3D;
use serde::{Deserialize, Serialize};
use std::ops::Index;

/// A generic point cloud container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointCloud<T> {
    pub points: Vec<T>,
}

/// A point cloud of weighted point sources
pub type ChargeCloud = PointCloud<WeightedPoint>;

/// Reported when the number of supplied weights is neither 0, 1 nor the point count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightCountMismatch {
    pub supplied: usize,
    pub points: usize,
}

impl<T> PointCloud<T> {
    /// Create a new empty point cloud
    pub fn new() -> Self {
        Self {
            points: Vec::new(),
        }
    }

    /// Create a new point cloud with specified capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
        }
    }

    /// Create a point cloud from a vector of points
    pub fn from_points(points: Vec<T>) -> Self {
        Self { points }
    }

    /// Get the number of points in the cloud
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the point cloud is empty
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Add a point to the cloud
    pub fn push(&mut self, point: T) {
        self.points.push(point);
    }

    /// Get an iterator over the points
    pub fn iter(&self) -> std::slice::Iter<T> {
        self.points.iter()
    }
}

impl<T> Default for PointCloud<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Index<usize> for PointCloud<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        &self.points[index]
    }
}

impl<'a, T> IntoIterator for &'a PointCloud<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

impl<T> Extend<T> for PointCloud<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.points.extend(iter);
    }
}

impl<T> FromIterator<T> for PointCloud<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            points: Vec::from_iter(iter),
        }
    }
}

impl PointCloud<WeightedPoint> {
    /// Pair positions with weights, broadcasting the weight list when needed.
    ///
    /// - no weights: every point gets weight 1
    /// - one weight: it is replicated to every point
    /// - fewer weights than points: the missing ones default to 1
    /// - more weights than points: the extra ones are ignored
    ///
    /// Any count other than 0, 1 or `positions.len()` is returned as a
    /// [`WeightCountMismatch`] alongside the cloud so callers can surface it.
    pub fn from_positions_and_weights(
        positions: &[Point3f],
        weights: &[f32],
    ) -> (Self, Option<WeightCountMismatch>) {
        let mismatch = match weights.len() {
            0 | 1 => None,
            n if n == positions.len() => None,
            n => Some(WeightCountMismatch {
                supplied: n,
                points: positions.len(),
            }),
        };

        let points = positions
            .iter()
            .enumerate()
            .map(|(i, &position)| {
                let weight = match weights {
                    [single] => *single,
                    _ => weights.get(i).copied().unwrap_or(1.0),
                };
                WeightedPoint::new(position, weight)
            })
            .collect();

        (Self { points }, mismatch)
    }

    /// Positions of all points, in order
    pub fn positions(&self) -> Vec<Point3f> {
        self.points.iter().map(|p| p.position).collect()
    }

    /// Apply a transformation to every position, keeping the weights
    pub fn transform(&mut self, transform: &Transform3D) {
        for point in &mut self.points {
            point.position = transform.transform_point(&point.position);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn positions(n: usize) -> Vec<Point3f> {
        (0..n).map(|i| Point3f::new(i as f32, 0.0, 0.0)).collect()
    }

    #[test]
    fn test_no_weights_default_to_one() {
        let (cloud, mismatch) = ChargeCloud::from_positions_and_weights(&positions(3), &[]);
        assert!(mismatch.is_none());
        assert!(cloud.iter().all(|p| p.weight == 1.0));
    }

    #[test]
    fn test_single_weight_is_replicated() {
        let (cloud, mismatch) = ChargeCloud::from_positions_and_weights(&positions(4), &[2.5]);
        assert!(mismatch.is_none());
        assert_eq!(cloud.len(), 4);
        assert!(cloud.iter().all(|p| p.weight == 2.5));
    }

    #[test]
    fn test_partial_weights_are_padded_and_reported() {
        let (cloud, mismatch) =
            ChargeCloud::from_positions_and_weights(&positions(4), &[3.0, 4.0]);
        assert_eq!(
            mismatch,
            Some(WeightCountMismatch {
                supplied: 2,
                points: 4
            })
        );
        let weights: Vec<f32> = cloud.iter().map(|p| p.weight).collect();
        assert_eq!(weights, vec![3.0, 4.0, 1.0, 1.0]);
    }

    #[test]
    fn test_extra_weights_are_ignored() {
        let (cloud, mismatch) =
            ChargeCloud::from_positions_and_weights(&positions(2), &[3.0, 4.0, 5.0]);
        assert!(mismatch.is_some());
        assert_eq!(cloud.len(), 2);
        assert_eq!(cloud[1].weight, 4.0);
    }

    #[test]
    fn test_matching_weights() {
        let (cloud, mismatch) =
            ChargeCloud::from_positions_and_weights(&positions(2), &[7.0, 8.0]);
        assert!(mismatch.is_none());
        assert_eq!(cloud.positions(), positions(2));
        assert_eq!(cloud[0].weight, 7.0);
    }

    #[test]
    fn test_build_and_transform_keeps_weights() {
        let mut cloud = ChargeCloud::with_capacity(3);
        cloud.push(WeightedPoint::new(Point3f::new(1.0, 0.0, 0.0), -2.0));
        cloud.extend(positions(2).into_iter().map(WeightedPoint::unit));
        assert_eq!(cloud.len(), 3);

        cloud.transform(&Transform3D::translation(nalgebra::Vector3::new(0.0, 0.0, 5.0)));
        assert_eq!(cloud[0].position, Point3f::new(1.0, 0.0, 5.0));
        assert_eq!(cloud[0].weight, -2.0);
        assert_eq!(cloud[2].position, Point3f::new(1.0, 0.0, 5.0));
    }
}
