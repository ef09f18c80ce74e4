//! 3D affine transformation utilities

use crate::point::{Point3f, Vector3f};
use nalgebra::{Matrix3, Matrix4, Vector3};
use serde::{Deserialize, Serialize};

/// A 3D affine transformation stored as a homogeneous matrix
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform3D {
    pub matrix: Matrix4<f32>,
}

impl Transform3D {
    /// Create an identity transformation
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// Create a translation transformation
    pub fn translation(translation: Vector3<f32>) -> Self {
        Self {
            matrix: Matrix4::new_translation(&translation),
        }
    }

    /// Create a non-uniform scaling transformation about the origin
    pub fn scaling(scale: Vector3<f32>) -> Self {
        Self {
            matrix: Matrix4::new_nonuniform_scaling(&scale),
        }
    }

    /// Build a transform whose columns are the given axes, placed at `origin`.
    ///
    /// Maps local coordinates `(u, v, w)` to `origin + u*x + v*y + w*z`.
    pub fn from_frame(origin: Point3f, x_axis: Vector3f, y_axis: Vector3f, z_axis: Vector3f) -> Self {
        let mut matrix = Matrix4::identity();
        matrix
            .fixed_view_mut::<3, 3>(0, 0)
            .copy_from(&Matrix3::from_columns(&[x_axis, y_axis, z_axis]));
        matrix.fixed_view_mut::<3, 1>(0, 3).copy_from(&origin.coords);
        Self { matrix }
    }

    /// Apply the transformation to a point
    pub fn transform_point(&self, point: &Point3f) -> Point3f {
        let homogeneous = self.matrix * point.to_homogeneous();
        Point3f::from_homogeneous(homogeneous).unwrap_or(*point)
    }

    /// Apply the linear part of the transformation to a vector
    pub fn transform_vector(&self, vector: &Vector3f) -> Vector3f {
        self.linear() * vector
    }

    /// The upper-left 3x3 block
    pub fn linear(&self) -> Matrix3<f32> {
        self.matrix.fixed_view::<3, 3>(0, 0).into_owned()
    }

    /// Compose this transformation with another (`other` is applied first)
    pub fn compose(self, other: Self) -> Self {
        Self {
            matrix: self.matrix * other.matrix,
        }
    }

    /// Get the inverse transformation
    pub fn inverse(self) -> Option<Self> {
        self.matrix.try_inverse().map(|inv_matrix| Self {
            matrix: inv_matrix,
        })
    }

    /// Check if this is approximately the identity transformation
    pub fn is_identity(&self, epsilon: f32) -> bool {
        let identity = Matrix4::identity();
        (self.matrix - identity).norm() < epsilon
    }
}

impl Default for Transform3D {
    fn default() -> Self {
        Self::identity()
    }
}

impl std::ops::Mul for Transform3D {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        self.compose(rhs)
    }
}

impl From<Matrix4<f32>> for Transform3D {
    fn from(matrix: Matrix4<f32>) -> Self {
        Self { matrix }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_compose_applies_right_first() {
        let scale = Transform3D::scaling(Vector3::new(2.0, 2.0, 2.0));
        let shift = Transform3D::translation(Vector3::new(1.0, 0.0, 0.0));
        let p = (shift * scale).transform_point(&Point3f::new(1.0, 1.0, 1.0));
        assert_relative_eq!(p, Point3f::new(3.0, 2.0, 2.0));
    }

    #[test]
    fn test_frame_round_trip() {
        let t = Transform3D::from_frame(
            Point3f::new(1.0, 2.0, 3.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(-1.0, 0.0, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
        );
        let p = t.transform_point(&Point3f::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p, Point3f::new(1.0, 3.0, 3.0));

        let back = t.inverse().unwrap().transform_point(&p);
        assert_relative_eq!(back, Point3f::new(1.0, 0.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_vector_ignores_translation() {
        let t = Transform3D::translation(Vector3::new(5.0, 5.0, 5.0));
        let v = t.transform_vector(&Vector3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(v, Vector3::new(1.0, 0.0, 0.0));
        assert!(Transform3D::identity().is_identity(1e-6));
    }
}
