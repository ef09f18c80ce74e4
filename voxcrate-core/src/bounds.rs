//! Oriented bounding volumes and the grid/world mapping they define

use crate::error::{Error, Result};
use crate::point::{Point3f, Vector3f};
use crate::transform::Transform3D;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

const AXIS_TOLERANCE: f32 = 1e-6;

/// A closed interval along one axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub min: f32,
    pub max: f32,
}

impl Interval {
    /// Create an interval, swapping the ends if they are given in reverse
    pub fn new(a: f32, b: f32) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Interval of the given length centered on zero
    pub fn centered(length: f32) -> Self {
        Self::new(-length / 2.0, length / 2.0)
    }

    pub fn length(&self) -> f32 {
        self.max - self.min
    }

    pub fn mid(&self) -> f32 {
        (self.min + self.max) / 2.0
    }
}

/// An orthonormal frame: origin plus three mutually perpendicular unit axes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    pub origin: Point3f,
    pub x_axis: Vector3f,
    pub y_axis: Vector3f,
    pub z_axis: Vector3f,
}

impl Plane {
    /// Build a frame from an x direction and an approximate y direction.
    ///
    /// The y axis is made perpendicular to x and the z axis is `x × y`.
    pub fn new(origin: Point3f, x_direction: Vector3f, y_direction: Vector3f) -> Result<Self> {
        let x_axis = x_direction.try_normalize(AXIS_TOLERANCE).ok_or_else(|| {
            Error::InvalidParameter("Plane x axis has zero length".to_string())
        })?;
        let y_axis = (y_direction - x_axis * x_axis.dot(&y_direction))
            .try_normalize(AXIS_TOLERANCE)
            .ok_or_else(|| {
                Error::InvalidParameter("Plane y axis is parallel to the x axis".to_string())
            })?;
        let z_axis = x_axis.cross(&y_axis);

        Ok(Self {
            origin,
            x_axis,
            y_axis,
            z_axis,
        })
    }

    /// The world XY plane at the given origin
    pub fn world_xy(origin: Point3f) -> Self {
        Self {
            origin,
            x_axis: Vector3::x(),
            y_axis: Vector3::y(),
            z_axis: Vector3::z(),
        }
    }

    /// Whether the axes coincide with the world axes
    pub fn is_world_aligned(&self) -> bool {
        (self.x_axis - Vector3::x()).norm() < AXIS_TOLERANCE
            && (self.y_axis - Vector3::y()).norm() < AXIS_TOLERANCE
            && (self.z_axis - Vector3::z()).norm() < AXIS_TOLERANCE
    }

    /// Map plane-local coordinates to world space
    pub fn to_world(&self) -> Transform3D {
        Transform3D::from_frame(self.origin, self.x_axis, self.y_axis, self.z_axis)
    }
}

impl Default for Plane {
    fn default() -> Self {
        Self::world_xy(Point3f::origin())
    }
}

/// A box given by a frame and an interval along each frame axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingVolume {
    pub plane: Plane,
    pub x: Interval,
    pub y: Interval,
    pub z: Interval,
}

impl BoundingVolume {
    pub fn new(plane: Plane, x: Interval, y: Interval, z: Interval) -> Self {
        Self { plane, x, y, z }
    }

    /// Axis-aligned box spanning two opposite corners
    pub fn from_corners(a: Point3f, b: Point3f) -> Self {
        Self::new(
            Plane::default(),
            Interval::new(a.x, b.x),
            Interval::new(a.y, b.y),
            Interval::new(a.z, b.z),
        )
    }

    /// Axis-aligned bounds of `points` grown by `inflate` on every side
    pub fn from_points(points: &[Point3f], inflate: f32) -> Option<Self> {
        let first = points.first()?;
        let (min, max) = points.iter().fold((*first, *first), |(min, max), p| {
            (
                Point3f::new(min.x.min(p.x), min.y.min(p.y), min.z.min(p.z)),
                Point3f::new(max.x.max(p.x), max.y.max(p.y), max.z.max(p.z)),
            )
        });
        Some(Self::from_corners(min, max).inflated(inflate))
    }

    pub fn is_axis_aligned(&self) -> bool {
        self.plane.is_world_aligned()
    }

    /// Edge lengths along the three frame axes
    pub fn lengths(&self) -> Vector3f {
        Vector3::new(self.x.length(), self.y.length(), self.z.length())
    }

    /// Lowest corner in frame-local coordinates
    pub fn local_min(&self) -> Point3f {
        Point3f::new(self.x.min, self.y.min, self.z.min)
    }

    /// Frame-local coordinates to world space
    pub fn local_to_world(&self) -> Transform3D {
        self.plane.to_world()
    }

    /// World space to frame-local coordinates
    pub fn world_to_local(&self) -> Result<Transform3D> {
        self.local_to_world().inverse().ok_or_else(|| {
            Error::InvalidParameter("Bounding volume frame is not invertible".to_string())
        })
    }

    pub fn center(&self) -> Point3f {
        self.local_to_world()
            .transform_point(&Point3f::new(self.x.mid(), self.y.mid(), self.z.mid()))
    }

    /// Same box with the frame origin moved to its center
    pub fn recentered(&self) -> Self {
        let plane = Plane {
            origin: self.center(),
            ..self.plane
        };
        Self::new(
            plane,
            Interval::centered(self.x.length()),
            Interval::centered(self.y.length()),
            Interval::centered(self.z.length()),
        )
    }

    /// Grow (or shrink, for negative amounts) every side by `amount`
    pub fn inflated(&self, amount: f32) -> Self {
        let grow = |i: Interval| Interval::new(i.min - amount, i.max + amount);
        Self::new(self.plane, grow(self.x), grow(self.y), grow(self.z))
    }

    /// Sample spacing along each axis for a grid with `dims` samples per axis
    pub fn spacing(&self, dims: [usize; 3]) -> Result<Vector3f> {
        let lengths = self.lengths();
        let mut spacing = Vector3::zeros();
        for axis in 0..3 {
            if dims[axis] < 2 {
                return Err(Error::InvalidParameter(format!(
                    "Grid resolution must be at least 2 along every axis, got {:?}",
                    dims
                )));
            }
            if !(lengths[axis] > f32::EPSILON) {
                return Err(Error::InvalidParameter(format!(
                    "Bounding volume has no extent along axis {} (length {})",
                    axis, lengths[axis]
                )));
            }
            spacing[axis] = lengths[axis] / (dims[axis] - 1) as f32;
        }
        Ok(spacing)
    }

    /// Map grid index space (`0..n-1` per axis) onto the box in world space
    pub fn grid_to_world(&self, dims: [usize; 3]) -> Result<Transform3D> {
        let spacing = self.spacing(dims)?;
        Ok(self.local_to_world()
            * Transform3D::translation(self.local_min().coords)
            * Transform3D::scaling(spacing))
    }

    /// Inverse of [`BoundingVolume::grid_to_world`]
    pub fn world_to_grid(&self, dims: [usize; 3]) -> Result<Transform3D> {
        self.grid_to_world(dims)?.inverse().ok_or_else(|| {
            Error::InvalidParameter("Grid transform is not invertible".to_string())
        })
    }

    /// Resize the box so its sample spacing equals `cell_size` on every axis.
    ///
    /// The box is recentered and each axis gets `floor(length / cell_size) + 1`
    /// samples; the interval is trimmed symmetrically to `(n - 1) * cell_size`.
    pub fn fit_to_cell_size(&self, cell_size: f32) -> Result<(Self, [usize; 3])> {
        if !(cell_size > 0.0) || !cell_size.is_finite() {
            return Err(Error::InvalidParameter(format!(
                "Cell size must be positive, got {}",
                cell_size
            )));
        }

        let centered = self.recentered();
        let lengths = centered.lengths();
        let mut dims = [0usize; 3];
        for axis in 0..3 {
            let steps = (f64::from(lengths[axis]) / f64::from(cell_size)).floor();
            if !steps.is_finite() || steps >= f64::from(u32::MAX) {
                return Err(Error::InvalidParameter(format!(
                    "Cell size {} gives too many samples along axis {} (length {})",
                    cell_size, axis, lengths[axis]
                )));
            }
            dims[axis] = steps as usize + 1;
            if dims[axis] < 2 {
                return Err(Error::InvalidParameter(format!(
                    "Cell size {} is larger than the bounding volume along axis {} (length {})",
                    cell_size, axis, lengths[axis]
                )));
            }
        }

        if dims.iter().try_fold(1usize, |total, &n| total.checked_mul(n)).is_none() {
            return Err(Error::InvalidParameter(format!(
                "Cell size {} gives a grid of {:?} samples, which overflows",
                cell_size, dims
            )));
        }

        let interval = |n: usize| Interval::centered((n - 1) as f32 * cell_size);
        let fitted = Self::new(
            centered.plane,
            interval(dims[0]),
            interval(dims[1]),
            interval(dims[2]),
        );
        Ok((fitted, dims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_plane_orthonormalizes() {
        let plane = Plane::new(
            Point3f::origin(),
            Vector3::new(2.0, 0.0, 0.0),
            Vector3::new(1.0, 1.0, 0.0),
        )
        .unwrap();
        assert_relative_eq!(plane.y_axis, Vector3::y(), epsilon = 1e-6);
        assert_relative_eq!(plane.z_axis, Vector3::z(), epsilon = 1e-6);
        assert!(plane.is_world_aligned());
    }

    #[test]
    fn test_plane_rejects_parallel_axes() {
        let result = Plane::new(Point3f::origin(), Vector3::x(), Vector3::x() * 3.0);
        assert!(result.is_err());
    }

    #[test]
    fn test_from_points_inflates() {
        let points = vec![Point3f::new(0.0, 0.0, 0.0), Point3f::new(2.0, 1.0, 3.0)];
        let volume = BoundingVolume::from_points(&points, 0.5).unwrap();
        assert_eq!(volume.x, Interval::new(-0.5, 2.5));
        assert_eq!(volume.z, Interval::new(-0.5, 3.5));
        assert!(BoundingVolume::from_points(&[], 1.0).is_none());
    }

    #[test]
    fn test_grid_to_world_axis_aligned() {
        let volume = BoundingVolume::from_corners(
            Point3f::new(1.0, 1.0, 1.0),
            Point3f::new(5.0, 3.0, 2.0),
        );
        let xfm = volume.grid_to_world([5, 3, 2]).unwrap();
        assert_relative_eq!(xfm.transform_point(&Point3f::origin()), Point3f::new(1.0, 1.0, 1.0));
        assert_relative_eq!(
            xfm.transform_point(&Point3f::new(4.0, 2.0, 1.0)),
            Point3f::new(5.0, 3.0, 2.0)
        );
    }

    #[test]
    fn test_grid_to_world_rotated_round_trip() {
        let plane = Plane::new(
            Point3f::new(1.0, 2.0, 3.0),
            Vector3::new(1.0, 1.0, 0.0),
            Vector3::new(-1.0, 1.0, 0.5),
        )
        .unwrap();
        let volume = BoundingVolume::new(
            plane,
            Interval::new(-2.0, 2.0),
            Interval::new(0.0, 3.0),
            Interval::new(-1.0, 1.0),
        );
        assert!(!volume.is_axis_aligned());

        let local = volume.world_to_local().unwrap().transform_point(&volume.center());
        assert_relative_eq!(local, Point3f::new(0.0, 1.5, 0.0), epsilon = 1e-5);

        let dims = [5, 4, 3];
        let to_world = volume.grid_to_world(dims).unwrap();
        let to_grid = volume.world_to_grid(dims).unwrap();
        let p = Point3f::new(2.5, 1.0, 0.25);
        assert_relative_eq!(to_grid.transform_point(&to_world.transform_point(&p)), p, epsilon = 1e-4);

        // Opposite grid corners land on opposite box corners.
        let a = to_world.transform_point(&Point3f::origin());
        let b = to_world.transform_point(&Point3f::new(4.0, 3.0, 2.0));
        assert_relative_eq!((b - a).norm(), volume.lengths().norm(), epsilon = 1e-4);
    }

    #[test]
    fn test_spacing_rejects_single_sample() {
        let volume = BoundingVolume::from_corners(Point3f::origin(), Point3f::new(1.0, 1.0, 1.0));
        assert!(volume.spacing([1, 4, 4]).is_err());
        assert_relative_eq!(volume.spacing([3, 5, 2]).unwrap(), Vector3::new(0.5, 0.25, 1.0));
    }

    #[test]
    fn test_fit_to_cell_size() {
        let volume = BoundingVolume::from_corners(Point3f::origin(), Point3f::new(1.05, 2.0, 0.5));
        let (fitted, dims) = volume.fit_to_cell_size(0.25).unwrap();
        assert_eq!(dims, [5, 9, 3]);
        assert_relative_eq!(fitted.lengths(), Vector3::new(1.0, 2.0, 0.5), epsilon = 1e-6);
        assert_relative_eq!(fitted.center(), volume.center(), epsilon = 1e-6);
        assert_relative_eq!(fitted.spacing(dims).unwrap(), Vector3::new(0.25, 0.25, 0.25), epsilon = 1e-6);

        assert!(volume.fit_to_cell_size(0.0).is_err());
        assert!(volume.fit_to_cell_size(0.75).is_err());
    }

    #[test]
    fn test_fit_to_tiny_cell_size_is_rejected() {
        let volume = BoundingVolume::from_corners(Point3f::origin(), Point3f::new(1.05, 2.0, 0.5));
        // Far more steps than any axis can hold.
        assert!(matches!(volume.fit_to_cell_size(1e-30), Err(Error::InvalidParameter(_))));
        assert!(matches!(volume.fit_to_cell_size(f32::MIN_POSITIVE), Err(Error::InvalidParameter(_))));
        // Each axis fits on its own, the whole grid does not.
        assert!(matches!(volume.fit_to_cell_size(1e-9), Err(Error::InvalidParameter(_))));
    }
}
