//! Streaming Marching Cubes isosurface extraction
//!
//! The extractor sweeps the field one z-slice of cells at a time. Crossing
//! vertices are shared between neighbouring cells through an edge-keyed
//! cache, and faces for a slice are emitted one slice late, once every vertex
//! they reference is guaranteed to exist. The cache is pruned as the sweep
//! moves on, so memory stays proportional to one slice rather than the whole
//! volume.

use crate::scalar_field::ScalarField;
use crate::tables::{triangles, CORNER_OFFSETS, EDGE_OFFSETS, EDGE_TABLE};
use log::{debug, trace};
use std::collections::HashMap;
use voxcrate_core::{BoundingVolume, Error, Point3f, Result, Transformable, TriangleMesh};

/// Configuration for Marching Cubes algorithm
#[derive(Debug, Clone)]
pub struct MarchingCubesConfig {
    /// Isosurface level (scalar value to extract)
    pub iso_level: f32,
    /// Drop faces with repeated vertices or zero area
    pub remove_degenerate_faces: bool,
    /// Whether to compute vertex normals
    pub compute_normals: bool,
}

impl MarchingCubesConfig {
    pub fn with_iso_level(mut self, iso_level: f32) -> Self {
        self.iso_level = iso_level;
        self
    }

    pub fn with_normals(mut self, compute_normals: bool) -> Self {
        self.compute_normals = compute_normals;
        self
    }

    pub fn with_degenerate_removal(mut self, remove: bool) -> Self {
        self.remove_degenerate_faces = remove;
        self
    }
}

impl Default for MarchingCubesConfig {
    fn default() -> Self {
        Self {
            iso_level: 0.0,
            remove_degenerate_faces: true,
            compute_normals: false,
        }
    }
}

/// Counters gathered during one extraction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionStats {
    /// Cells whose configuration produced geometry
    pub active_cells: usize,
    /// Largest number of live edge-vertex cache entries at any point
    pub peak_cache_entries: usize,
    pub vertices: usize,
    pub faces: usize,
    pub degenerate_faces_removed: usize,
}

/// Map from global edge key to the mesh vertex created on that edge.
///
/// An edge key is `linear_index(lower corner) * 3 + axis`, unique across the
/// whole grid and increasing with z, which is what makes pruning by a single
/// threshold possible.
#[derive(Debug, Default)]
struct EdgeVertexCache {
    entries: HashMap<usize, usize>,
    peak: usize,
}

impl EdgeVertexCache {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
            peak: 0,
        }
    }

    fn get(&self, key: usize) -> Option<usize> {
        self.entries.get(&key).copied()
    }

    fn insert(&mut self, key: usize, vertex: usize) {
        self.entries.insert(key, vertex);
        self.peak = self.peak.max(self.entries.len());
    }

    /// Forget every edge whose key is below `min_key`; returns how many went
    fn prune_below(&mut self, min_key: usize) -> usize {
        let before = self.entries.len();
        self.entries.retain(|&key, _| key >= min_key);
        before - self.entries.len()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[inline]
fn edge_key(field: &ScalarField, x: usize, y: usize, z: usize, edge: usize) -> usize {
    let [dx, dy, dz, axis] = EDGE_OFFSETS[edge];
    field.linear_index(x + dx, y + dy, z + dz) * 3 + axis
}

/// State of one sweep over a field
struct SliceSweep<'a> {
    field: &'a ScalarField,
    iso_level: f32,
    /// Configuration codes for two consecutive slices, indexed by `z % 2`
    classification: [Vec<u8>; 2],
    cache: EdgeVertexCache,
    mesh: TriangleMesh,
    active_cells: usize,
}

impl<'a> SliceSweep<'a> {
    fn new(field: &'a ScalarField, iso_level: f32) -> Self {
        let slice_area = field.slice_area();
        Self {
            field,
            iso_level,
            classification: [vec![0; slice_area], vec![0; slice_area]],
            cache: EdgeVertexCache::with_capacity(slice_area * 3),
            mesh: TriangleMesh::new(),
            active_cells: 0,
        }
    }

    fn run(mut self) -> Result<(TriangleMesh, ExtractionStats)> {
        let [_, _, nz] = self.field.dimensions();
        let slice_area = self.field.slice_area();

        for z in 0..nz - 1 {
            self.classify_slice(z);
            if z > 0 {
                self.emit_slice(z - 1)?;
                let pruned = self.cache.prune_below(z * slice_area * 3);
                trace!(
                    "slice {}: pruned {} cached edges, {} live",
                    z,
                    pruned,
                    self.cache.len()
                );
            }
        }
        self.emit_slice(nz - 2)?;

        let stats = ExtractionStats {
            active_cells: self.active_cells,
            peak_cache_entries: self.cache.peak,
            vertices: self.mesh.vertex_count(),
            faces: self.mesh.face_count(),
            degenerate_faces_removed: 0,
        };
        Ok((self.mesh, stats))
    }

    /// Configuration code of the cell whose lowest corner is `(x, y, z)`
    fn cell_code(&self, x: usize, y: usize, z: usize) -> u8 {
        CORNER_OFFSETS
            .iter()
            .enumerate()
            .fold(0u8, |code, (corner, &[dx, dy, dz])| {
                if self.field.value(x + dx, y + dy, z + dz) < self.iso_level {
                    code | (1 << corner)
                } else {
                    code
                }
            })
    }

    /// Classify every cell of slice `z` and create the vertices on its crossed edges
    fn classify_slice(&mut self, z: usize) {
        let [nx, ny, _] = self.field.dimensions();
        let current = z % 2;

        for y in 0..ny - 1 {
            for x in 0..nx - 1 {
                let code = self.cell_code(x, y, z);
                self.classification[current][x + y * nx] = code;
                if code == 0 || code == 255 {
                    continue;
                }

                self.active_cells += 1;
                let crossed = EDGE_TABLE[code as usize];
                for edge in 0..12 {
                    if crossed & (1 << edge) != 0 {
                        self.vertex_on_edge(x, y, z, edge);
                    }
                }
            }
        }
    }

    /// Index of the vertex where the surface crosses `edge` of cell `(x, y, z)`,
    /// creating it on first use
    fn vertex_on_edge(&mut self, x: usize, y: usize, z: usize, edge: usize) -> usize {
        let key = edge_key(self.field, x, y, z, edge);
        if let Some(vertex) = self.cache.get(key) {
            return vertex;
        }

        let [dx, dy, dz, axis] = EDGE_OFFSETS[edge];
        let lower = [x + dx, y + dy, z + dz];
        let mut upper = lower;
        upper[axis] += 1;

        let v0 = self.field.value(lower[0], lower[1], lower[2]);
        let v1 = self.field.value(upper[0], upper[1], upper[2]);
        let t = (self.iso_level - v0) / (v1 - v0);
        debug_assert!((0.0..=1.0).contains(&t), "edge parameter {} outside [0, 1]", t);

        let mut position = Point3f::new(lower[0] as f32, lower[1] as f32, lower[2] as f32);
        position[axis] += t;

        let vertex = self.mesh.add_vertex(position);
        self.cache.insert(key, vertex);
        vertex
    }

    /// Emit the faces of every cell in slice `z` from its retained codes
    fn emit_slice(&mut self, z: usize) -> Result<()> {
        let field = self.field;
        let [nx, ny, _] = field.dimensions();
        let codes = &self.classification[z % 2];
        let cache = &self.cache;
        let faces = &mut self.mesh.faces;

        for y in 0..ny - 1 {
            for x in 0..nx - 1 {
                let code = codes[x + y * nx];
                if code == 0 || code == 255 {
                    continue;
                }

                for triangle in triangles(code) {
                    let mut face = [0usize; 3];
                    for (slot, &edge) in face.iter_mut().zip(triangle.iter()) {
                        let key = edge_key(field, x, y, z, edge);
                        *slot = cache.get(key).ok_or_else(|| {
                            Error::InternalConsistency(format!(
                                "no vertex cached for edge {} of cell ({}, {}, {}) (key {})",
                                edge, x, y, z, key
                            ))
                        })?;
                    }
                    faces.push(face);
                }
            }
        }
        Ok(())
    }
}

/// Marching Cubes implementation
pub struct MarchingCubes {
    config: MarchingCubesConfig,
}

impl MarchingCubes {
    /// Create a new Marching Cubes instance
    pub fn new(config: MarchingCubesConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MarchingCubesConfig {
        &self.config
    }

    /// Extract the isosurface in grid index coordinates.
    ///
    /// Vertex `(i, j, k)` corresponds to sample `(i, j, k)`; positions along
    /// an edge are linearly interpolated between its two samples. Faces are
    /// wound so their normals point towards lower field values.
    pub fn extract_isosurface(&self, field: &ScalarField) -> Result<TriangleMesh> {
        self.extract_with_stats(field).map(|(mesh, _)| mesh)
    }

    /// Extract the isosurface and place it in the box the field was sampled in
    pub fn extract_isosurface_in_volume(
        &self,
        field: &ScalarField,
        volume: &BoundingVolume,
    ) -> Result<TriangleMesh> {
        let to_world = volume.grid_to_world(field.dimensions())?;
        let (mut mesh, _) = self.extract_with_stats(field)?;
        mesh.transform(&to_world);
        Ok(mesh)
    }

    /// Extract the isosurface and report sweep statistics
    pub fn extract_with_stats(&self, field: &ScalarField) -> Result<(TriangleMesh, ExtractionStats)> {
        let dims = field.dimensions();
        if dims.iter().any(|&n| n < 2) {
            return Err(Error::InvalidData(format!(
                "Isosurface extraction needs at least 2 samples per axis, got {:?}",
                dims
            )));
        }
        if !self.config.iso_level.is_finite() {
            return Err(Error::InvalidData(format!(
                "Iso level must be finite, got {}",
                self.config.iso_level
            )));
        }

        let (mut mesh, mut stats) = SliceSweep::new(field, self.config.iso_level).run()?;

        if self.config.remove_degenerate_faces {
            stats.degenerate_faces_removed = mesh.remove_degenerate_faces();
            if stats.degenerate_faces_removed > 0 {
                mesh.remove_unreferenced_vertices();
            }
            stats.vertices = mesh.vertex_count();
            stats.faces = mesh.face_count();
        }
        if self.config.compute_normals {
            mesh.compute_vertex_normals();
        }

        debug!(
            "marching cubes on {:?} at {}: {} vertices, {} faces, {} active cells, peak cache {}",
            dims,
            self.config.iso_level,
            stats.vertices,
            stats.faces,
            stats.active_cells,
            stats.peak_cache_entries
        );
        Ok((mesh, stats))
    }
}

/// Convenience function for basic marching cubes
pub fn marching_cubes(field: &ScalarField, iso_level: f32) -> Result<TriangleMesh> {
    let config = MarchingCubesConfig {
        iso_level,
        ..Default::default()
    };
    MarchingCubes::new(config).extract_isosurface(field)
}

/// Marching cubes with the result mapped into `volume`
pub fn marching_cubes_in_volume(
    field: &ScalarField,
    iso_level: f32,
    volume: &BoundingVolume,
) -> Result<TriangleMesh> {
    let config = MarchingCubesConfig {
        iso_level,
        ..Default::default()
    };
    MarchingCubes::new(config).extract_isosurface_in_volume(field, volume)
}
