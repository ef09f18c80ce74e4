//! Mesh data structures and functionality

use crate::point::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Faces whose doubled area falls below this are considered degenerate
const DEGENERATE_AREA_EPSILON: f32 = 1e-12;

/// A triangle mesh with vertices and faces
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriangleMesh {
    pub vertices: Vec<Point3f>,
    pub faces: Vec<[usize; 3]>,
    pub normals: Option<Vec<Vector3f>>,
}

impl TriangleMesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            faces: Vec::new(),
            normals: None,
        }
    }

    /// Create a mesh from vertices and faces
    pub fn from_vertices_and_faces(vertices: Vec<Point3f>, faces: Vec<[usize; 3]>) -> Self {
        Self {
            vertices,
            faces,
            normals: None,
        }
    }

    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of faces
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Check if the mesh is empty
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    /// Add a vertex to the mesh
    pub fn add_vertex(&mut self, vertex: Point3f) -> usize {
        let index = self.vertices.len();
        self.vertices.push(vertex);
        index
    }

    /// Add a face to the mesh
    pub fn add_face(&mut self, face: [usize; 3]) {
        self.faces.push(face);
    }

    /// Calculate face normals
    pub fn calculate_face_normals(&self) -> Vec<Vector3f> {
        self.faces
            .iter()
            .map(|face| {
                let v0 = self.vertices[face[0]];
                let v1 = self.vertices[face[1]];
                let v2 = self.vertices[face[2]];

                let edge1 = v1 - v0;
                let edge2 = v2 - v0;

                edge1.cross(&edge2).normalize()
            })
            .collect()
    }

    /// Compute area-weighted vertex normals and store them on the mesh
    pub fn compute_vertex_normals(&mut self) {
        let mut normals = vec![Vector3f::zeros(); self.vertices.len()];
        for face in &self.faces {
            let v0 = self.vertices[face[0]];
            let weighted = (self.vertices[face[1]] - v0).cross(&(self.vertices[face[2]] - v0));
            for &index in face {
                normals[index] += weighted;
            }
        }
        for normal in &mut normals {
            *normal = normal
                .try_normalize(f32::EPSILON)
                .unwrap_or_else(Vector3f::z);
        }
        self.normals = Some(normals);
    }

    /// Drop faces that repeat a vertex index or have (near) zero area.
    ///
    /// Returns the number of faces removed. Vertices are left untouched; follow
    /// with [`Self::remove_unreferenced_vertices`] to drop the ones orphaned.
    pub fn remove_degenerate_faces(&mut self) -> usize {
        let before = self.faces.len();
        let vertices = &self.vertices;
        self.faces.retain(|&[a, b, c]| {
            if a == b || b == c || a == c {
                return false;
            }
            let doubled_area = (vertices[b] - vertices[a])
                .cross(&(vertices[c] - vertices[a]))
                .norm();
            doubled_area > DEGENERATE_AREA_EPSILON
        });
        before - self.faces.len()
    }

    /// Drop vertices no face refers to, renumbering faces to match.
    ///
    /// Per-vertex normals, when present, are compacted alongside. Returns the
    /// number of vertices removed.
    pub fn remove_unreferenced_vertices(&mut self) -> usize {
        let mut remap = vec![usize::MAX; self.vertices.len()];
        let mut kept = 0;
        for face in &self.faces {
            for &index in face {
                if remap[index] == usize::MAX {
                    remap[index] = kept;
                    kept += 1;
                }
            }
        }

        let removed = self.vertices.len() - kept;
        if removed == 0 {
            return 0;
        }

        let mut vertices = vec![Point3f::origin(); kept];
        for (old, &new) in remap.iter().enumerate() {
            if new != usize::MAX {
                vertices[new] = self.vertices[old];
            }
        }
        if let Some(normals) = &self.normals {
            let mut compacted = vec![Vector3f::zeros(); kept];
            for (old, &new) in remap.iter().enumerate() {
                if new != usize::MAX {
                    compacted[new] = normals[old];
                }
            }
            self.normals = Some(compacted);
        }
        for face in &mut self.faces {
            for index in face.iter_mut() {
                *index = remap[*index];
            }
        }
        self.vertices = vertices;
        removed
    }

    /// Whether every undirected edge is shared by exactly two faces
    pub fn is_closed(&self) -> bool {
        let mut uses: HashMap<(usize, usize), usize> = HashMap::new();
        for face in &self.faces {
            for i in 0..3 {
                let (a, b) = (face[i], face[(i + 1) % 3]);
                *uses.entry((a.min(b), a.max(b))).or_insert(0) += 1;
            }
        }
        !uses.is_empty() && uses.values().all(|&count| count == 2)
    }
}

impl Default for TriangleMesh {
    fn default() -> Self {
        Self::new()
    }
}
