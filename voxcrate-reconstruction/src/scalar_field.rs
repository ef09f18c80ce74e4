//! Dense 3D scalar fields
//!
//! Samples are stored x-fastest in one contiguous buffer, so the sample at
//! `(x, y, z)` lives at `x + y * nx + z * nx * ny`.

use serde::{Deserialize, Serialize};
use voxcrate_core::{Error, Result};

/// A dense grid of `f32` samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarField {
    dimensions: [usize; 3],
    values: Vec<f32>,
}

impl ScalarField {
    /// Wrap a pre-filled sample buffer.
    ///
    /// Every dimension must be at least 2 (one full cell per axis) and the
    /// buffer must hold exactly `nx * ny * nz` samples.
    pub fn new(dimensions: [usize; 3], values: Vec<f32>) -> Result<Self> {
        if dimensions.iter().any(|&n| n < 2) {
            return Err(Error::InvalidData(format!(
                "Scalar field needs at least 2 samples per axis, got {:?}",
                dimensions
            )));
        }

        let expected = dimensions[0]
            .checked_mul(dimensions[1])
            .and_then(|n| n.checked_mul(dimensions[2]))
            .ok_or_else(|| {
                Error::InvalidData(format!("Scalar field dimensions {:?} overflow", dimensions))
            })?;
        if values.len() != expected {
            return Err(Error::InvalidData(format!(
                "Scalar field {:?} needs {} samples, got {}",
                dimensions,
                expected,
                values.len()
            )));
        }

        Ok(Self { dimensions, values })
    }

    /// A field where every sample has the same value
    pub fn filled(dimensions: [usize; 3], value: f32) -> Result<Self> {
        let len = dimensions.iter().product();
        Self::new(dimensions, vec![value; len])
    }

    /// Build a field by evaluating `f(x, y, z)` at every sample
    pub fn from_fn<F>(dimensions: [usize; 3], mut f: F) -> Result<Self>
    where
        F: FnMut(usize, usize, usize) -> f32,
    {
        let [nx, ny, nz] = dimensions;
        let mut values = Vec::with_capacity(nx * ny * nz);
        for z in 0..nz {
            for y in 0..ny {
                for x in 0..nx {
                    values.push(f(x, y, z));
                }
            }
        }
        Self::new(dimensions, values)
    }

    pub fn dimensions(&self) -> [usize; 3] {
        self.dimensions
    }

    /// Samples in one z-layer (`nx * ny`)
    pub fn slice_area(&self) -> usize {
        self.dimensions[0] * self.dimensions[1]
    }

    /// Total number of samples
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of cells (cubes between 8 neighbouring samples)
    pub fn cell_count(&self) -> usize {
        self.dimensions.iter().map(|n| n - 1).product()
    }

    #[inline]
    pub fn linear_index(&self, x: usize, y: usize, z: usize) -> usize {
        debug_assert!(x < self.dimensions[0] && y < self.dimensions[1] && z < self.dimensions[2]);
        x + y * self.dimensions[0] + z * self.slice_area()
    }

    /// Split a linear index back into `(x, y, z)`
    #[inline]
    pub fn coordinates(&self, index: usize) -> [usize; 3] {
        debug_assert!(index < self.values.len());
        let slice_area = self.slice_area();
        let z = index / slice_area;
        let rest = index - z * slice_area;
        let y = rest / self.dimensions[0];
        let x = rest - y * self.dimensions[0];
        [x, y, z]
    }

    /// Sample at `(x, y, z)`; panics when out of range
    #[inline]
    pub fn value(&self, x: usize, y: usize, z: usize) -> f32 {
        self.values[self.linear_index(x, y, z)]
    }

    /// Sample at a linear index; panics when out of range
    #[inline]
    pub fn value_at(&self, index: usize) -> f32 {
        self.values[index]
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn into_values(self) -> Vec<f32> {
        self.values
    }

    /// Smallest and largest sample
    pub fn min_max(&self) -> (f32, f32) {
        self.values
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
    }

    /// Copy of the field with every boundary sample replaced by `boundary_value`.
    ///
    /// Extracting at a threshold above `boundary_value` then always yields a
    /// closed surface, even where the field touches the edge of the grid.
    pub fn closed(&self, boundary_value: f32) -> Self {
        let [nx, ny, nz] = self.dimensions;
        let values = self
            .values
            .iter()
            .enumerate()
            .map(|(index, &v)| {
                let [x, y, z] = self.coordinates(index);
                let on_boundary = x == 0
                    || y == 0
                    || z == 0
                    || x == nx - 1
                    || y == ny - 1
                    || z == nz - 1;
                if on_boundary {
                    boundary_value
                } else {
                    v
                }
            })
            .collect();

        Self {
            dimensions: self.dimensions,
            values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_dimensions() {
        assert!(ScalarField::new([1, 4, 4], vec![0.0; 16]).is_err());
        assert!(ScalarField::new([2, 2, 2], vec![0.0; 7]).is_err());
        assert!(ScalarField::new([2, 2, 2], vec![0.0; 8]).is_ok());
    }

    #[test]
    fn test_linear_and_xyz_access_agree() {
        let field = ScalarField::from_fn([3, 4, 5], |x, y, z| (x * 100 + y * 10 + z) as f32).unwrap();
        assert_eq!(field.len(), 60);
        assert_eq!(field.slice_area(), 12);
        for z in 0..5 {
            for y in 0..4 {
                for x in 0..3 {
                    let index = field.linear_index(x, y, z);
                    assert_eq!(index, x + y * 3 + z * 12);
                    assert_eq!(field.value(x, y, z), field.value_at(index));
                    assert_eq!(field.coordinates(index), [x, y, z]);
                }
            }
        }
    }

    #[test]
    fn test_cell_count_and_min_max() {
        let field = ScalarField::from_fn([3, 4, 5], |x, _, z| x as f32 - z as f32).unwrap();
        assert_eq!(field.cell_count(), 2 * 3 * 4);
        assert_eq!(field.min_max(), (-4.0, 2.0));
    }

    #[test]
    fn test_closed_resets_boundary_only() {
        let field = ScalarField::filled([4, 4, 4], 5.0).unwrap();
        let closed = field.closed(0.0);
        assert_eq!(closed.value(1, 2, 1), 5.0);
        assert_eq!(closed.value(0, 2, 1), 0.0);
        assert_eq!(closed.value(1, 3, 1), 0.0);
        assert_eq!(closed.value(2, 2, 3), 0.0);
        assert_eq!(closed.values().iter().filter(|&&v| v == 5.0).count(), 8);
    }

    #[test]
    #[should_panic]
    fn test_out_of_range_index_panics() {
        let field = ScalarField::filled([2, 2, 2], 0.0).unwrap();
        field.value_at(8);
    }
}
