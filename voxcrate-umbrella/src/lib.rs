//! # VoxCrate
//!
//! Point-charge scalar fields and streaming isosurface extraction.
//!
//! This is the umbrella crate that provides convenient access to all voxcrate functionality.
//! You can use this crate to get everything in one place, or use individual crates for
//! more granular control over dependencies.
//!
//! ## Features
//!
//! - **Core**: Weighted points, bounding volumes, transforms and triangle meshes
//! - **Algorithms**: Spatial indexes for radius queries
//! - **Reconstruction**: Field synthesis and marching cubes
//!
//! ## Quick Start
//!
//! ```rust
//! use voxcrate::prelude::*;
//!
//! let positions = vec![
//!     Point3f::new(0.0, 0.0, 0.0),
//!     Point3f::new(1.0, 0.0, 0.0),
//! ];
//! let config = FieldConfig::default()
//!     .with_resolution([24, 16, 16])
//!     .with_range(1.0);
//! let sampled = sample_field(&positions, &[1.0], config)?;
//!
//! let mesh = sampled.isosurface(MarchingCubesConfig::default().with_iso_level(2.0))?;
//! assert!(!mesh.is_empty());
//! # Ok::<(), voxcrate::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `default`: Enables algorithms and reconstruction
//! - `algorithms`: Spatial indexes
//! - `reconstruction`: Field synthesis and isosurface extraction (implies `algorithms`)
//! - `all`: Enables all features

// Re-export core functionality
pub use voxcrate_core::*;

// Re-export sub-crates
#[cfg(feature = "algorithms")]
pub use voxcrate_algorithms as algorithms;

#[cfg(feature = "reconstruction")]
pub use voxcrate_reconstruction as reconstruction;

/// Convenient imports for common use cases
pub mod prelude {
    pub use voxcrate_core::*;

    #[cfg(feature = "algorithms")]
    pub use voxcrate_algorithms::*;

    #[cfg(feature = "reconstruction")]
    pub use voxcrate_reconstruction::*;
}
