//! Radius search implementations

use kiddo::{ImmutableKdTree, SquaredEuclidean};
use rstar::RTree;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use voxcrate_core::{Point3f, SpatialIndex};

/// Relative slack added to tree queries so points lying exactly on the radius
/// survive the tree's own comparison; the exact test is reapplied afterwards.
const RADIUS_SLACK: f32 = 4.0 * f32::EPSILON;

/// Which spatial index backs radius queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexKind {
    /// `kiddo` k-d tree
    KdTree,
    /// `rstar` R*-tree
    RTree,
    /// Linear scan, for a handful of points
    BruteForce,
}

impl Default for IndexKind {
    fn default() -> Self {
        IndexKind::RTree
    }
}

impl IndexKind {
    /// Build an index of this kind over `points`
    pub fn build(self, points: &[Point3f]) -> Box<dyn SpatialIndex> {
        match self {
            IndexKind::KdTree => Box::new(KdTreeIndex::new(points)),
            IndexKind::RTree => Box::new(RTreeIndex::new(points)),
            IndexKind::BruteForce => Box::new(BruteForceSearch::new(points)),
        }
    }
}

/// K-d tree index backed by `kiddo`.
///
/// Points sharing a position exactly are stored once in the tree and expanded
/// back to their original indices on lookup, so stacked charges and flat
/// sample grids build the same way as scattered data.
pub struct KdTreeIndex {
    tree: Option<ImmutableKdTree<f32, 3>>,
    /// Original point indices for each distinct position, in tree item order
    members: Vec<Vec<usize>>,
    len: usize,
}

impl KdTreeIndex {
    pub fn new(points: &[Point3f]) -> Self {
        let mut slots: HashMap<[u32; 3], usize> = HashMap::with_capacity(points.len());
        let mut positions: Vec<[f32; 3]> = Vec::new();
        let mut members: Vec<Vec<usize>> = Vec::new();
        for (idx, point) in points.iter().enumerate() {
            let key = [point.x.to_bits(), point.y.to_bits(), point.z.to_bits()];
            let slot = *slots.entry(key).or_insert_with(|| {
                positions.push([point.x, point.y, point.z]);
                members.push(Vec::new());
                positions.len() - 1
            });
            members[slot].push(idx);
        }

        // An empty slice leaves the tree without a root stem.
        let tree = (!positions.is_empty()).then(|| ImmutableKdTree::new_from_slice(&positions));
        Self {
            tree,
            members,
            len: points.len(),
        }
    }
}

impl SpatialIndex for KdTreeIndex {
    fn find_radius_neighbors(&self, query: &Point3f, radius: f32) -> Vec<(usize, f32)> {
        let Some(tree) = &self.tree else {
            return Vec::new();
        };
        let radius_squared = radius * radius;
        tree.within_unsorted::<SquaredEuclidean>(
            &[query.x, query.y, query.z],
            radius_squared * (1.0 + RADIUS_SLACK),
        )
        .into_iter()
        .filter(|neighbour| neighbour.distance <= radius_squared)
        .flat_map(|neighbour| {
            let distance = neighbour.distance.sqrt();
            self.members[neighbour.item as usize]
                .iter()
                .map(move |&idx| (idx, distance))
        })
        .collect()
    }

    fn len(&self) -> usize {
        self.len
    }
}

/// A point with its index for the R*-tree
#[derive(Debug, Clone, Copy, PartialEq)]
struct IndexedPoint {
    point: Point3f,
    index: usize,
}

impl rstar::Point for IndexedPoint {
    type Scalar = f32;
    const DIMENSIONS: usize = 3;

    fn generate(mut generator: impl FnMut(usize) -> Self::Scalar) -> Self {
        Self {
            point: Point3f::new(generator(0), generator(1), generator(2)),
            index: usize::MAX,
        }
    }

    fn nth(&self, index: usize) -> Self::Scalar {
        self.point[index]
    }

    fn nth_mut(&mut self, index: usize) -> &mut Self::Scalar {
        &mut self.point[index]
    }
}

/// R*-tree index backed by `rstar`
pub struct RTreeIndex {
    tree: RTree<IndexedPoint>,
}

impl RTreeIndex {
    pub fn new(points: &[Point3f]) -> Self {
        let indexed = points
            .iter()
            .enumerate()
            .map(|(index, &point)| IndexedPoint { point, index })
            .collect();
        Self {
            tree: RTree::bulk_load(indexed),
        }
    }
}

impl SpatialIndex for RTreeIndex {
    fn find_radius_neighbors(&self, query: &Point3f, radius: f32) -> Vec<(usize, f32)> {
        let probe = IndexedPoint {
            point: *query,
            index: usize::MAX,
        };
        self.tree
            .locate_within_distance(probe, radius * radius)
            .map(|found| (found.index, (found.point - query).norm()))
            .collect()
    }

    fn len(&self) -> usize {
        self.tree.size()
    }
}

/// Simple brute force search for small datasets
pub struct BruteForceSearch {
    points: Vec<Point3f>,
}

impl BruteForceSearch {
    pub fn new(points: &[Point3f]) -> Self {
        Self {
            points: points.to_vec(),
        }
    }
}

impl SpatialIndex for BruteForceSearch {
    fn find_radius_neighbors(&self, query: &Point3f, radius: f32) -> Vec<(usize, f32)> {
        let radius_squared = radius * radius;
        self.points
            .iter()
            .enumerate()
            .filter_map(|(idx, point)| {
                let distance_squared = (point - query).norm_squared();
                if distance_squared <= radius_squared {
                    Some((idx, distance_squared.sqrt()))
                } else {
                    None
                }
            })
            .collect()
    }

    fn len(&self) -> usize {
        self.points.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_points(count: usize, seed: u64) -> Vec<Point3f> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..count)
            .map(|_| {
                Point3f::new(
                    rng.gen_range(-5.0..5.0),
                    rng.gen_range(-5.0..5.0),
                    rng.gen_range(-5.0..5.0),
                )
            })
            .collect()
    }

    fn sorted_indices(mut hits: Vec<(usize, f32)>) -> Vec<usize> {
        hits.sort_by_key(|(idx, _)| *idx);
        hits.into_iter().map(|(idx, _)| idx).collect()
    }

    #[test]
    fn test_indexes_agree_with_brute_force() {
        let points = random_points(500, 11);
        let queries = random_points(25, 12);
        let reference = BruteForceSearch::new(&points);

        for kind in [IndexKind::KdTree, IndexKind::RTree] {
            let index = kind.build(&points);
            assert_eq!(index.len(), points.len());
            for query in &queries {
                let expected = sorted_indices(reference.find_radius_neighbors(query, 2.0));
                let actual = sorted_indices(index.find_radius_neighbors(query, 2.0));
                assert_eq!(actual, expected, "{:?} disagrees at {:?}", kind, query);
            }
        }
    }

    #[test]
    fn test_radius_is_inclusive() {
        let points = vec![Point3f::new(1.0, 0.0, 0.0), Point3f::new(3.0, 0.0, 0.0)];
        for kind in [IndexKind::KdTree, IndexKind::RTree, IndexKind::BruteForce] {
            let index = kind.build(&points);
            let hits = index.find_radius_neighbors(&Point3f::origin(), 1.0);
            assert_eq!(hits.len(), 1, "{:?}", kind);
            assert_eq!(hits[0].0, 0);
            assert!((hits[0].1 - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_coincident_points() {
        let points = vec![Point3f::new(1.0, 1.0, 1.0); 40];
        for kind in [IndexKind::KdTree, IndexKind::RTree] {
            let index = kind.build(&points);
            assert_eq!(index.len(), 40);

            let hits = index.find_radius_neighbors(&Point3f::new(1.0, 1.0, 1.5), 0.5);
            assert_eq!(sorted_indices(hits), (0..40).collect::<Vec<_>>(), "{:?}", kind);
            assert!(index
                .find_radius_neighbors(&Point3f::origin(), 1.0)
                .is_empty());
        }
    }

    #[test]
    fn test_planar_grid_agrees_with_brute_force() {
        let points: Vec<Point3f> = (0..50)
            .flat_map(|j| (0..50).map(move |i| Point3f::new(i as f32 * 0.1, j as f32 * 0.1, 0.0)))
            .collect();
        let reference = BruteForceSearch::new(&points);
        let index = IndexKind::KdTree.build(&points);
        assert_eq!(index.len(), 2500);

        for query in [
            Point3f::new(2.5, 2.5, 0.0),
            Point3f::new(0.0, 0.0, 0.2),
            Point3f::new(4.9, 1.0, -0.3),
        ] {
            let expected = sorted_indices(reference.find_radius_neighbors(&query, 0.45));
            let actual = sorted_indices(index.find_radius_neighbors(&query, 0.45));
            assert!(!expected.is_empty());
            assert_eq!(actual, expected, "disagrees at {:?}", query);
        }
    }

    #[test]
    fn test_empty_index() {
        for kind in [IndexKind::KdTree, IndexKind::RTree, IndexKind::BruteForce] {
            let index = kind.build(&[]);
            assert!(index.is_empty());
            assert!(index.find_radius_neighbors(&Point3f::origin(), 10.0).is_empty());
        }
    }
}
