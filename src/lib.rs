//! # rimemesh
//!
//! Field transfer and surface smoothing for the triangulated surfaces used in
//! multi-step icing simulations.
//!
//! Between simulation steps the ice surface is re-meshed. rimemesh moves the
//! per-face results (temperature, water film height, ice height, heat
//! transfer coefficient, collection efficiency, wall shear) from the old
//! surface onto the new one, and smooths the grown ice surface without
//! rounding off its ridges and horns.
//!
//! ## Features
//!
//! - **Explicit-adjacency mesh**: nodes, edges, faces and zones in flat
//!   arenas with type-safe ids and checked linking
//! - **Spatial index**: an AVL tree keyed by coordinates, with exact lookup,
//!   a fast approximate nearest query and an exact nearest query
//! - **Field transfer**: node-centred, cell-centred and direct strategies
//! - **Smoothing**: Laplacian, Taubin, NullSpace (feature preserving), fuzzy
//!   vector median and the NullSpace+FVM composite, with border fixation
//! - **Diagnostics**: connected components, alpha quality, Euler check
//!
//! ## Quick Start
//!
//! ```
//! use rimemesh::prelude::*;
//! use nalgebra::Point3;
//!
//! // A 3×3 node patch with a raised centre.
//! let mut positions = Vec::new();
//! for j in 0..3 {
//!     for i in 0..3 {
//!         positions.push(Point3::new(i as f64 * 0.5, j as f64 * 0.5, 0.0));
//!     }
//! }
//! positions[4].z = 0.3;
//! let triangles = [
//!     [0, 1, 4], [0, 4, 3], [1, 2, 5], [1, 5, 4],
//!     [3, 4, 7], [3, 7, 6], [4, 5, 8], [4, 8, 7],
//! ];
//! let mut mesh = build_from_triangles(&positions, &triangles).unwrap();
//!
//! let options = SmoothOptions::default()
//!     .with_iterations(1)
//!     .with_fixation(Fixation::NoMove);
//! laplacian_smooth(&mut mesh, &options).unwrap();
//!
//! assert!((mesh.position(NodeId::new(4)).z - 0.24).abs() < 1e-12);
//! assert_eq!(mesh.position(NodeId::new(0)).z, 0.0);
//! ```
//!
//! ## Transferring Fields
//!
//! ```
//! use rimemesh::prelude::*;
//! use nalgebra::Point3;
//!
//! let positions = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(1.0, 1.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//! ];
//! let triangles = [[0, 1, 2], [0, 2, 3]];
//! let mut old = build_from_triangles(&positions, &triangles).unwrap();
//! let mut new = build_from_triangles(&positions, &triangles).unwrap();
//! for f in old.face_ids().collect::<Vec<_>>() {
//!     old.face_mut(f).fields.t = 265.0;
//! }
//!
//! let report = transfer_fields(&mut old, &mut new, &TransferOptions::default()).unwrap();
//! assert_eq!(report.exact_hits, 4);
//! assert_eq!(new.face(FaceId::new(1)).fields.t, 265.0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod error;
pub mod mesh;
pub mod spatial;

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types and functions:
///
/// ```
/// use rimemesh::prelude::*;
/// ```
pub mod prelude {
    pub use crate::algo::smooth::{
        composite_smooth, fuzzy_median_smooth, laplacian_smooth, null_space_smooth, smooth,
        taubin_smooth, Fixation, SmoothOptions, SmoothReport, Smoother,
    };
    pub use crate::algo::transfer::{transfer_fields, TransferOptions, TransferStrategy};
    pub use crate::algo::Progress;
    pub use crate::error::{MeshError, Result};
    pub use crate::mesh::{
        build_from_triangles, build_from_zones, EdgeId, FaceField, FaceId, Mesh, NodeField,
        NodeId, ZoneData,
    };
    pub use crate::spatial::SpatialIndex;
}

// Re-export nalgebra types for convenience
pub use nalgebra;
