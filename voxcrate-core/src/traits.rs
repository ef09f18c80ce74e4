//! Core traits for voxcrate

use crate::{mesh::*, point::*, transform::Transform3D};

/// Range queries over a fixed set of indexed positions.
///
/// Implementations are interchangeable: field synthesis only ever asks for
/// the points within a radius of a query position.
pub trait SpatialIndex: Send + Sync {
    /// Find all points within `radius` (inclusive) of `query`.
    ///
    /// Returns `(point index, distance)` pairs in no particular order.
    fn find_radius_neighbors(&self, query: &Point3f, radius: f32) -> Vec<(usize, f32)>;

    /// Number of indexed points
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Trait for objects that can be transformed
pub trait Transformable {
    /// Apply a transformation to the object
    fn transform(&mut self, transform: &Transform3D);
}

impl Transformable for TriangleMesh {
    fn transform(&mut self, transform: &Transform3D) {
        for vertex in &mut self.vertices {
            *vertex = transform.transform_point(vertex);
        }

        if let Some(normals) = &mut self.normals {
            // Normals follow the inverse transpose of the linear part.
            let normal_matrix = transform
                .linear()
                .try_inverse()
                .map(|m| m.transpose())
                .unwrap_or_else(|| transform.linear());
            for normal in normals.iter_mut() {
                *normal = (normal_matrix * *normal)
                    .try_normalize(f32::EPSILON)
                    .unwrap_or(*normal);
            }
        }
    }
}
