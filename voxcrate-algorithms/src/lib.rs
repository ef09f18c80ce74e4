//! # VoxCrate Algorithms
//!
//! Spatial indexing used by field synthesis.
//!
//! Every index answers the same radius query through the
//! [`SpatialIndex`](voxcrate_core::SpatialIndex) trait, so callers can swap a
//! k-d tree for an R*-tree (or a brute force scan for tiny inputs) without
//! touching the sampling code.

pub mod nearest_neighbor;

// Re-export commonly used items
pub use nearest_neighbor::*;
