//! Scalar field synthesis from weighted point sources
//!
//! Every point contributes `weight / d` ([`Falloff::Linear`]) or
//! `weight / d²` ([`Falloff::InverseSquare`]) to each grid node within
//! `range` of it, and contributions are either summed or reduced to their
//! maximum. Two interchangeable strategies produce the same field:
//!
//! - **Forward** walks the grid and asks a spatial index for the points near
//!   each node. It wins when points are dense relative to the grid.
//! - **Inverse** walks the points and splats each one onto growing shells of
//!   nodes around it until a whole shell falls out of range. It wins when
//!   points are sparse.

use crate::marching_cubes::{MarchingCubes, MarchingCubesConfig};
use crate::parallel::ParallelConfig;
use crate::scalar_field::ScalarField;
use itertools::iproduct;
use log::{debug, warn};
use nalgebra::{Matrix3, Vector3};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;
use voxcrate_algorithms::IndexKind;
use voxcrate_core::{
    BoundingVolume, ChargeCloud, Error, Point3f, Result, SpatialIndex, Transform3D, TriangleMesh,
    Vector3f, WeightCountMismatch, WeightedPoint,
};

/// Distances are clamped to at least this before dividing by them
pub const MIN_DISTANCE: f32 = 1e-6;

/// How a point's influence decays with distance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Falloff {
    /// `weight / d`
    #[default]
    Linear,
    /// `weight / d²`
    InverseSquare,
}

impl Falloff {
    /// Contribution of a point with `weight` at `distance` from a node
    #[inline]
    pub fn contribution(self, weight: f32, distance: f32) -> f32 {
        let d = distance.max(MIN_DISTANCE);
        match self {
            Falloff::Linear => weight / d,
            Falloff::InverseSquare => weight / (d * d),
        }
    }
}

/// How contributions of several points at one node are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Accumulation {
    #[default]
    Sum,
    Max,
}

impl Accumulation {
    #[inline]
    fn combine(self, accumulated: f32, contribution: f32) -> f32 {
        match self {
            Accumulation::Sum => accumulated + contribution,
            Accumulation::Max => accumulated.max(contribution),
        }
    }
}

/// Which traversal fills the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Strategy {
    /// Pick from the point and sample counts
    #[default]
    Auto,
    /// Grid-major: query the points near every node
    Forward,
    /// Point-major: splat every point onto the nodes near it
    Inverse,
}

impl Strategy {
    /// Resolve `Auto` into a concrete strategy.
    ///
    /// Forward is chosen once there are at least half as many points as grid
    /// samples (`nx * ny * nz`). The threshold is a heuristic;
    /// `benches/field_strategies.rs` measures both sides of it.
    pub fn resolve(self, points: usize, samples: usize) -> Strategy {
        match self {
            Strategy::Auto if points >= samples / 2 => Strategy::Forward,
            Strategy::Auto => Strategy::Inverse,
            concrete => concrete,
        }
    }
}

/// Number of samples per axis, given directly or through a cell size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GridResolution {
    /// Samples along x, y and z
    Explicit([usize; 3]),
    /// Sample spacing; the volume is recentered and trimmed to fit it exactly
    CellSize(f32),
}

impl Default for GridResolution {
    fn default() -> Self {
        GridResolution::Explicit([32, 32, 32])
    }
}

/// Configuration for field synthesis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldConfig {
    pub resolution: GridResolution,
    /// Box to sample; the point bounds grown by `range` when unset
    pub volume: Option<BoundingVolume>,
    /// Points further than this from a node do not affect it
    pub range: f32,
    pub falloff: Falloff,
    pub accumulation: Accumulation,
    pub strategy: Strategy,
    /// Spatial index used by the forward strategy
    pub index: IndexKind,
    pub parallel: ParallelConfig,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            resolution: GridResolution::default(),
            volume: None,
            range: 1.0,
            falloff: Falloff::default(),
            accumulation: Accumulation::default(),
            strategy: Strategy::default(),
            index: IndexKind::default(),
            parallel: ParallelConfig::default(),
        }
    }
}

impl FieldConfig {
    pub fn with_resolution(mut self, dims: [usize; 3]) -> Self {
        self.resolution = GridResolution::Explicit(dims);
        self
    }

    pub fn with_cell_size(mut self, cell_size: f32) -> Self {
        self.resolution = GridResolution::CellSize(cell_size);
        self
    }

    pub fn with_volume(mut self, volume: BoundingVolume) -> Self {
        self.volume = Some(volume);
        self
    }

    pub fn with_range(mut self, range: f32) -> Self {
        self.range = range;
        self
    }

    pub fn with_falloff(mut self, falloff: Falloff) -> Self {
        self.falloff = falloff;
        self
    }

    pub fn with_accumulation(mut self, accumulation: Accumulation) -> Self {
        self.accumulation = accumulation;
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_index(mut self, index: IndexKind) -> Self {
        self.index = index;
        self
    }

    pub fn with_parallel(mut self, parallel: ParallelConfig) -> Self {
        self.parallel = parallel;
        self
    }
}

/// Non-fatal problems noticed while building a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildWarning {
    /// The weight list length was neither 0, 1 nor the point count
    WeightCount { supplied: usize, points: usize },
}

impl From<WeightCountMismatch> for BuildWarning {
    fn from(mismatch: WeightCountMismatch) -> Self {
        BuildWarning::WeightCount {
            supplied: mismatch.supplied,
            points: mismatch.points,
        }
    }
}

impl fmt::Display for BuildWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildWarning::WeightCount { supplied, points } => write!(
                f,
                "{} weights supplied for {} points; missing weights default to 1, extra weights are ignored",
                supplied, points
            ),
        }
    }
}

/// A synthesized field together with where it lives
#[derive(Debug, Clone)]
pub struct SampledField {
    pub field: ScalarField,
    /// The box the grid spans, after any cell-size fitting
    pub volume: BoundingVolume,
    /// The strategy that actually ran
    pub strategy: Strategy,
    pub warnings: Vec<BuildWarning>,
}

impl SampledField {
    /// Grid index to world transform for this field
    pub fn grid_to_world(&self) -> Result<Transform3D> {
        self.volume.grid_to_world(self.field.dimensions())
    }

    /// Extract an isosurface in world coordinates
    pub fn isosurface(&self, config: MarchingCubesConfig) -> Result<TriangleMesh> {
        MarchingCubes::new(config).extract_isosurface_in_volume(&self.field, &self.volume)
    }
}

/// Grid node to world position
enum NodeMapping {
    /// Frame equals the world axes: a per-axis scale and offset
    Aligned { origin: Point3f, spacing: Vector3f },
    Affine(Transform3D),
}

impl NodeMapping {
    fn new(volume: &BoundingVolume, dims: [usize; 3], to_world: Transform3D) -> Result<Self> {
        if volume.is_axis_aligned() {
            Ok(NodeMapping::Aligned {
                origin: volume.plane.origin + volume.local_min().coords,
                spacing: volume.spacing(dims)?,
            })
        } else {
            Ok(NodeMapping::Affine(to_world))
        }
    }

    #[inline]
    fn world(&self, x: usize, y: usize, z: usize) -> Point3f {
        match self {
            NodeMapping::Aligned { origin, spacing } => Point3f::new(
                origin.x + x as f32 * spacing.x,
                origin.y + y as f32 * spacing.y,
                origin.z + z as f32 * spacing.z,
            ),
            NodeMapping::Affine(transform) => {
                transform.transform_point(&Point3f::new(x as f32, y as f32, z as f32))
            }
        }
    }
}

/// Grid of `f32` values stored as bits so threads can update nodes concurrently
struct AtomicGrid {
    cells: Vec<AtomicU32>,
}

impl AtomicGrid {
    fn zeroed(len: usize) -> Self {
        Self {
            cells: (0..len).map(|_| AtomicU32::new(0.0f32.to_bits())).collect(),
        }
    }

    fn accumulate(&self, index: usize, contribution: f32, accumulation: Accumulation) {
        let cell = &self.cells[index];
        let mut current = cell.load(Ordering::Relaxed);
        loop {
            let value = f32::from_bits(current);
            let updated = accumulation.combine(value, contribution);
            if updated.to_bits() == current {
                return;
            }
            match cell.compare_exchange_weak(
                current,
                updated.to_bits(),
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }

    fn into_values(self) -> Vec<f32> {
        self.cells
            .into_iter()
            .map(|cell| f32::from_bits(cell.into_inner()))
            .collect()
    }
}

/// Builds scalar fields from weighted point clouds
pub struct FieldBuilder {
    config: FieldConfig,
}

impl FieldBuilder {
    pub fn new(config: FieldConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FieldConfig {
        &self.config
    }

    /// Sample the field of `cloud` on the configured grid
    pub fn build(&self, cloud: &ChargeCloud) -> Result<SampledField> {
        let config = &self.config;
        if !(config.range > 0.0) || !config.range.is_finite() {
            return Err(Error::InvalidParameter(format!(
                "Range must be positive and finite, got {}",
                config.range
            )));
        }

        let volume = match config.volume {
            Some(volume) => volume,
            None => BoundingVolume::from_points(&cloud.positions(), config.range).ok_or_else(|| {
                Error::InvalidData(
                    "Cannot derive a bounding volume from an empty point set".to_string(),
                )
            })?,
        };

        let (volume, dims) = match config.resolution {
            GridResolution::Explicit(dims) => {
                if dims.iter().any(|&n| n < 2) {
                    return Err(Error::InvalidParameter(format!(
                        "Grid resolution must be at least 2 along every axis, got {:?}",
                        dims
                    )));
                }
                (volume, dims)
            }
            GridResolution::CellSize(cell_size) => volume.fit_to_cell_size(cell_size)?,
        };

        let to_world = volume.grid_to_world(dims)?;
        let len = dims[0]
            .checked_mul(dims[1])
            .and_then(|n| n.checked_mul(dims[2]))
            .ok_or_else(|| {
                Error::InvalidParameter(format!("Grid resolution {:?} overflows", dims))
            })?;

        let strategy = config.strategy.resolve(cloud.len(), len);
        debug!(
            "sampling {} points on a {:?} grid ({} samples) with {:?} strategy, {} threads",
            cloud.len(),
            dims,
            len,
            strategy,
            config.parallel.effective_threads()
        );

        let start = Instant::now();
        let values = match strategy {
            Strategy::Inverse => self.sample_inverse(cloud, dims, len, &to_world)?,
            _ => self.sample_forward(cloud, dims, len, &volume, to_world)?,
        };
        debug!("{:?} sampling took {:?}", strategy, start.elapsed());

        Ok(SampledField {
            field: ScalarField::new(dims, values)?,
            volume,
            strategy,
            warnings: Vec::new(),
        })
    }

    /// Value of the node at world position `node`
    fn sample_node(&self, index: &dyn SpatialIndex, cloud: &ChargeCloud, node: &Point3f) -> f32 {
        let falloff = self.config.falloff;
        let accumulation = self.config.accumulation;
        index
            .find_radius_neighbors(node, self.config.range)
            .into_iter()
            .fold(0.0, |value, (i, distance)| {
                accumulation.combine(value, falloff.contribution(cloud[i].weight, distance))
            })
    }

    fn sample_forward(
        &self,
        cloud: &ChargeCloud,
        dims: [usize; 3],
        len: usize,
        volume: &BoundingVolume,
        to_world: Transform3D,
    ) -> Result<Vec<f32>> {
        let index = self.config.index.build(&cloud.positions());
        let mapping = NodeMapping::new(volume, dims, to_world)?;
        let [nx, ny, _] = dims;
        let slice_area = nx * ny;
        let mut values = vec![0.0f32; len];

        let sample_slice = |(z, slice): (usize, &mut [f32])| {
            for y in 0..ny {
                for x in 0..nx {
                    let node = mapping.world(x, y, z);
                    slice[x + y * nx] = self.sample_node(index.as_ref(), cloud, &node);
                }
            }
        };

        self.config.parallel.install(|parallel| {
            if parallel {
                values
                    .par_chunks_mut(slice_area)
                    .enumerate()
                    .for_each(&sample_slice);
            } else {
                values
                    .chunks_mut(slice_area)
                    .enumerate()
                    .for_each(&sample_slice);
            }
        })?;

        Ok(values)
    }

    fn sample_inverse(
        &self,
        cloud: &ChargeCloud,
        dims: [usize; 3],
        len: usize,
        to_world: &Transform3D,
    ) -> Result<Vec<f32>> {
        let to_grid = to_world.inverse().ok_or_else(|| {
            Error::InvalidParameter("Grid transform is not invertible".to_string())
        })?;
        let linear = to_world.linear();
        let grid = AtomicGrid::zeroed(len);

        let splat = |point: &WeightedPoint| self.splat(&grid, dims, &to_grid, &linear, point);

        self.config.parallel.install(|parallel| {
            if parallel {
                cloud.points.par_iter().for_each(&splat);
            } else {
                cloud.points.iter().for_each(&splat);
            }
        })?;

        Ok(grid.into_values())
    }

    /// Add one point's contribution to every node within range.
    ///
    /// Nodes are visited in Chebyshev shells around the node nearest the
    /// point. The closest node of each shell is never closer than the closest
    /// node of the previous one, so the first shell with no node in range
    /// ends the search.
    fn splat(
        &self,
        grid: &AtomicGrid,
        dims: [usize; 3],
        to_grid: &Transform3D,
        linear: &Matrix3<f32>,
        point: &WeightedPoint,
    ) {
        let q = to_grid.transform_point(&point.position);
        if !(q.x.is_finite() && q.y.is_finite() && q.z.is_finite()) {
            return;
        }

        let [nx, ny, nz] = dims;
        let nearest = |coordinate: f32, n: usize| coordinate.round().clamp(0.0, (n - 1) as f32) as isize;
        let center = [nearest(q.x, nx), nearest(q.y, ny), nearest(q.z, nz)];
        let bounds = [nx as isize, ny as isize, nz as isize];
        let range = self.config.range;

        let mut radius: isize = 0;
        loop {
            let mut in_range = false;
            for (dz, dy) in iproduct!(-radius..=radius, -radius..=radius) {
                // Rows inside the shell only touch it at their two ends.
                let on_face = dz.abs() == radius || dy.abs() == radius;
                let step = if on_face { 1 } else { (2 * radius) as usize };
                for dx in (-radius..=radius).step_by(step) {
                    let node = [center[0] + dx, center[1] + dy, center[2] + dz];
                    if (0..3).any(|axis| node[axis] < 0 || node[axis] >= bounds[axis]) {
                        continue;
                    }

                    let offset = Vector3::new(
                        node[0] as f32 - q.x,
                        node[1] as f32 - q.y,
                        node[2] as f32 - q.z,
                    );
                    let distance = (linear * offset).norm();
                    if distance > range {
                        continue;
                    }

                    in_range = true;
                    let index = node[0] as usize + node[1] as usize * nx + node[2] as usize * nx * ny;
                    grid.accumulate(
                        index,
                        self.config.falloff.contribution(point.weight, distance),
                        self.config.accumulation,
                    );
                }
            }

            if !in_range {
                break;
            }
            radius += 1;
        }
    }
}

/// Pair `positions` with `weights` and sample the resulting field.
///
/// A single weight applies to every point. Any other count that does not
/// match the points is tolerated (missing weights are 1, extra weights are
/// dropped) and reported in [`SampledField::warnings`].
pub fn sample_field(positions: &[Point3f], weights: &[f32], config: FieldConfig) -> Result<SampledField> {
    let (cloud, mismatch) = ChargeCloud::from_positions_and_weights(positions, weights);
    let warning = mismatch.map(BuildWarning::from);
    if let Some(warning) = &warning {
        warn!("{}", warning);
    }

    let mut sampled = FieldBuilder::new(config).build(&cloud)?;
    sampled.warnings.extend(warning);
    Ok(sampled)
}
