//! Mesh element records.
//!
//! Elements hold their adjacency as id lists into the owning [`Mesh`]'s
//! arenas. The lists are only extended through the mesh's linking calls,
//! which enforce the cardinality bounds; the accessors here are read-only.
//!
//! [`Mesh`]: super::Mesh

use nalgebra::{Point3, Vector3};

use super::fields::{FaceFields, NodeFields};
use super::index::{EdgeId, FaceId, NodeId};

/// A mesh vertex.
#[derive(Debug, Clone)]
pub struct Node {
    /// The 3D position of this node.
    pub position: Point3<f64>,

    /// Node-level field slots.
    pub fields: NodeFields,

    /// Whether the node touches a border edge.
    pub(crate) fixed: bool,

    /// Connected-component tag (1-based) once components have been labelled.
    pub component: Option<usize>,

    pub(crate) faces: Vec<FaceId>,
    pub(crate) edges: Vec<EdgeId>,
}

impl Node {
    /// Create a new unlinked node at the given position.
    pub fn new(position: Point3<f64>) -> Self {
        Self {
            position,
            fields: NodeFields::default(),
            fixed: false,
            component: None,
            faces: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Create a new node from coordinates.
    pub fn from_coords(x: f64, y: f64, z: f64) -> Self {
        Self::new(Point3::new(x, y, z))
    }

    /// Faces incident to this node.
    #[inline]
    pub fn faces(&self) -> &[FaceId] {
        &self.faces
    }

    /// Edges incident to this node.
    #[inline]
    pub fn edges(&self) -> &[EdgeId] {
        &self.edges
    }

    /// Whether this node is incident to at least one border edge.
    #[inline]
    pub fn is_fixed(&self) -> bool {
        self.fixed
    }
}

/// An edge between two nodes, shared by at most two faces.
#[derive(Debug, Clone, Default)]
pub struct Edge {
    pub(crate) nodes: Vec<NodeId>,
    pub(crate) faces: Vec<FaceId>,
    pub(crate) border: bool,
}

impl Edge {
    /// Create a new unlinked edge.
    pub fn new() -> Self {
        Self {
            nodes: Vec::with_capacity(2),
            faces: Vec::with_capacity(2),
            border: false,
        }
    }

    /// Nodes of this edge (2 once linked).
    #[inline]
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Faces sharing this edge (1 or 2 once linked).
    #[inline]
    pub fn faces(&self) -> &[FaceId] {
        &self.faces
    }

    /// Whether exactly one face uses this edge.
    #[inline]
    pub fn is_border(&self) -> bool {
        self.border
    }

    /// The endpoint opposite to `n`, if `n` is an endpoint.
    pub fn other_node(&self, n: NodeId) -> Option<NodeId> {
        match self.nodes.as_slice() {
            [a, b] if *a == n => Some(*b),
            [a, b] if *b == n => Some(*a),
            _ => None,
        }
    }
}

/// A triangular face.
#[derive(Debug, Clone)]
pub struct Face {
    pub(crate) nodes: Vec<NodeId>,
    pub(crate) edges: Vec<EdgeId>,

    /// Face-centred field values.
    pub fields: FaceFields,

    /// Cached centroid, refreshed by [`Mesh::compute_aux_nodes`](super::Mesh::compute_aux_nodes).
    pub aux_node: Point3<f64>,

    /// Vector median of the neighbourhood normals.
    pub vector_median: Vector3<f64>,

    /// Fuzzy (Gaussian-smoothed) median normal.
    pub fuzzy_median: Vector3<f64>,
}

impl Face {
    /// Create a new unlinked face.
    pub fn new() -> Self {
        Self {
            nodes: Vec::with_capacity(3),
            edges: Vec::with_capacity(3),
            fields: FaceFields::default(),
            aux_node: Point3::origin(),
            vector_median: Vector3::zeros(),
            fuzzy_median: Vector3::zeros(),
        }
    }

    /// Nodes of this face in winding order.
    #[inline]
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Edges bounding this face.
    #[inline]
    pub fn edges(&self) -> &[EdgeId] {
        &self.edges
    }

    /// Whether `n` is one of this face's nodes.
    #[inline]
    pub fn has_node(&self, n: NodeId) -> bool {
        self.nodes.contains(&n)
    }
}

impl Default for Face {
    fn default() -> Self {
        Self::new()
    }
}

/// A named, non-owning partition of a mesh's nodes and faces.
#[derive(Debug, Clone, Default)]
pub struct Zone {
    /// Zone title.
    pub name: String,
    /// Nodes belonging to this zone.
    pub nodes: Vec<NodeId>,
    /// Faces belonging to this zone.
    pub faces: Vec<FaceId>,
}

impl Zone {
    /// Create an empty zone.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            faces: Vec::new(),
        }
    }
}
