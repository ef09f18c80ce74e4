//! Core data structures and traits for voxcrate
//! 
//! This crate provides the fundamental types shared by field synthesis and
//! isosurface extraction: weighted point sources, oriented bounding volumes,
//! affine transforms, triangle meshes and the spatial query trait.

pub mod point;
pub mod point_cloud;
pub mod mesh;
pub mod bounds;
pub mod traits;
pub mod transform;
pub mod error;

pub use point::*;
pub use point_cloud::*;
pub use mesh::*;
pub use bounds::*;
pub use traits::*;
pub use transform::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Point3, Vector3, Matrix3, Matrix4};
