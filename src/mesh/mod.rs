//! Core mesh data structures.
//!
//! This module provides the explicit-adjacency triangle mesh used by the
//! transfer and smoothing algorithms.
//!
//! # Overview
//!
//! The primary type is [`Mesh`]. It owns [`Node`]s, [`Edge`]s, [`Face`]s and
//! [`Zone`]s in flat arenas; every element keeps id lists of its neighbours,
//! recorded through [`Mesh::link_face_node`], [`Mesh::link_node_edge`] and
//! [`Mesh::link_face_edge`]. Those calls reject anything that would give a
//! face more than 3 nodes or edges, or an edge more than 2 nodes or faces.
//!
//! # Index Types
//!
//! - [`NodeId`] - Identifies a node
//! - [`EdgeId`] - Identifies an edge
//! - [`FaceId`] - Identifies a face
//! - [`ZoneId`] - Identifies a zone
//!
//! # Construction
//!
//! ```
//! use rimemesh::mesh::{build_from_triangles, FaceField};
//! use nalgebra::Point3;
//!
//! let positions = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(1.0, 1.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//! ];
//! let mut mesh = build_from_triangles(&positions, &[[0, 1, 2], [0, 2, 3]]).unwrap();
//!
//! for f in mesh.face_ids().collect::<Vec<_>>() {
//!     mesh.face_mut(f).fields.t = 250.0;
//! }
//! mesh.relocate_faces_to_nodes(FaceField::T).unwrap();
//! assert_eq!(mesh.node(rimemesh::mesh::NodeId::new(1)).fields.t, 250.0);
//! ```

mod builder;
mod element;
mod fields;
mod index;
mod topology;

pub use builder::{build_from_triangles, build_from_zones, to_face_vertex, ZoneData};
#[cfg(test)]
pub(crate) use builder::planar_grid;
pub use element::{Edge, Face, Node, Zone};
pub use fields::{FaceField, FaceFields, NodeField, NodeFields};
pub use index::{EdgeId, FaceId, NodeId, ZoneId};
pub use topology::Mesh;
