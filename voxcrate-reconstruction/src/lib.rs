//! # VoxCrate Reconstruction
//!
//! Turns weighted point sources into a triangle mesh.
//!
//! [`FieldBuilder`] samples the combined falloff of all points onto a dense
//! [`ScalarField`], and [`MarchingCubes`] extracts the isosurface at a chosen
//! level with a slice-by-slice sweep whose memory use does not grow with the
//! depth of the grid.

pub mod field_builder;
pub mod marching_cubes;
pub mod parallel;
pub mod scalar_field;
mod tables;

// Re-export commonly used items
pub use field_builder::*;
pub use marching_cubes::*;
pub use parallel::*;
pub use scalar_field::*;
