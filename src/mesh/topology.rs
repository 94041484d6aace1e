//! The mesh container.
//!
//! [`Mesh`] owns every node, edge, face and zone in flat arenas. Adjacency is
//! never inferred: it is recorded by the three linking calls, each of which
//! checks the cardinality bound on both sides before mutating anything.
//!
//! # Invariants
//!
//! After construction:
//! - every face has exactly 3 nodes and 3 edges;
//! - every edge has exactly 2 nodes and at most 2 faces;
//! - an edge is `border` iff it has exactly 1 face, and a node is `fixed`
//!   iff it touches a border edge;
//! - no two edges join the same unordered node pair.

use nalgebra::{Point3, Vector3};

use super::element::{Edge, Face, Node, Zone};
use super::index::{EdgeId, FaceId, NodeId, ZoneId};
use crate::error::{MeshError, Result};

/// A triangulated surface mesh.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub(crate) nodes: Vec<Node>,
    pub(crate) edges: Vec<Edge>,
    pub(crate) faces: Vec<Face>,
    pub(crate) zones: Vec<Zone>,
}

impl Mesh {
    /// Create a new empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mesh with pre-allocated capacity.
    pub fn with_capacity(num_nodes: usize, num_faces: usize) -> Self {
        // A triangulated disc has E ≈ 3N and F ≈ 2N; use F to size edges.
        let num_edges = num_faces * 3 / 2 + num_faces / 2;

        Self {
            nodes: Vec::with_capacity(num_nodes),
            edges: Vec::with_capacity(num_edges),
            faces: Vec::with_capacity(num_faces),
            zones: Vec::new(),
        }
    }

    // ==================== Accessors ====================

    /// Get the number of nodes.
    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Get the number of edges.
    #[inline]
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Get the number of faces.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Get the number of zones.
    #[inline]
    pub fn num_zones(&self) -> usize {
        self.zones.len()
    }

    /// Get a node by ID.
    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// Get a mutable node by ID.
    #[inline]
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    /// Get an edge by ID.
    #[inline]
    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.index()]
    }

    /// Get a face by ID.
    #[inline]
    pub fn face(&self, id: FaceId) -> &Face {
        &self.faces[id.index()]
    }

    /// Get a mutable face by ID.
    #[inline]
    pub fn face_mut(&mut self, id: FaceId) -> &mut Face {
        &mut self.faces[id.index()]
    }

    /// Get a zone by ID.
    #[inline]
    pub fn zone(&self, id: ZoneId) -> &Zone {
        &self.zones[id.index()]
    }

    /// All zones.
    #[inline]
    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    /// Get the position of a node.
    #[inline]
    pub fn position(&self, n: NodeId) -> &Point3<f64> {
        &self.node(n).position
    }

    /// Set the position of a node.
    #[inline]
    pub fn set_position(&mut self, n: NodeId, pos: Point3<f64>) {
        self.node_mut(n).position = pos;
    }

    // ==================== Construction ====================

    /// Add a new unlinked node and return its ID.
    pub fn add_node(&mut self, position: Point3<f64>) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(Node::new(position));
        id
    }

    /// Add a new unlinked edge and return its ID.
    pub fn add_edge(&mut self) -> EdgeId {
        let id = EdgeId::new(self.edges.len());
        self.edges.push(Edge::new());
        id
    }

    /// Add a new unlinked face and return its ID.
    pub fn add_face(&mut self) -> FaceId {
        let id = FaceId::new(self.faces.len());
        self.faces.push(Face::new());
        id
    }

    /// Register a zone and return its ID.
    pub fn add_zone(&mut self, zone: Zone) -> ZoneId {
        let id = ZoneId::new(self.zones.len());
        self.zones.push(zone);
        id
    }

    /// Link a face and one of its nodes.
    ///
    /// # Errors
    ///
    /// [`MeshError::TopologyViolation`] if the face already has 3 nodes.
    pub fn link_face_node(&mut self, f: FaceId, n: NodeId) -> Result<()> {
        if self.face(f).nodes.len() >= 3 {
            return Err(MeshError::topology(f, "face already has 3 nodes"));
        }
        self.node_mut(n).faces.push(f);
        self.face_mut(f).nodes.push(n);
        Ok(())
    }

    /// Link a node and an edge.
    ///
    /// # Errors
    ///
    /// [`MeshError::TopologyViolation`] if the edge already has 2 nodes.
    pub fn link_node_edge(&mut self, n: NodeId, e: EdgeId) -> Result<()> {
        if self.edge(e).nodes.len() >= 2 {
            return Err(MeshError::topology(e, "edge already has 2 nodes"));
        }
        self.node_mut(n).edges.push(e);
        self.edges[e.index()].nodes.push(n);
        Ok(())
    }

    /// Link a face and one of its edges.
    ///
    /// Re-linking an already linked pair leaves both sides unchanged.
    ///
    /// # Errors
    ///
    /// [`MeshError::TopologyViolation`] if the face already has 3 edges or
    /// the edge already has 2 faces.
    pub fn link_face_edge(&mut self, f: FaceId, e: EdgeId) -> Result<()> {
        let face_has = self.face(f).edges.contains(&e);
        let edge_has = self.edge(e).faces.contains(&f);

        if !face_has && self.face(f).edges.len() >= 3 {
            return Err(MeshError::topology(f, "face already has 3 edges"));
        }
        if !edge_has && self.edge(e).faces.len() >= 2 {
            return Err(MeshError::topology(
                e,
                format!("edge already shared by 2 faces, cannot add {:?}", f),
            ));
        }

        if !face_has {
            self.face_mut(f).edges.push(e);
        }
        if !edge_has {
            self.edges[e.index()].faces.push(f);
        }
        Ok(())
    }

    /// Find the edge joining `n1` and `n2`, scanning `n1`'s incident edges.
    pub fn is_edge_present(&self, n1: NodeId, n2: NodeId) -> Option<EdgeId> {
        self.node(n1)
            .edges
            .iter()
            .copied()
            .find(|&e| self.edge(e).nodes.contains(&n2))
    }

    /// Recompute `border` flags on edges and `fixed` flags on nodes.
    ///
    /// Returns the number of fixed nodes.
    pub fn mark_border(&mut self) -> usize {
        for node in &mut self.nodes {
            node.fixed = false;
        }

        for ei in 0..self.edges.len() {
            let border = self.edges[ei].faces.len() == 1;
            self.edges[ei].border = border;
            if border {
                for k in 0..self.edges[ei].nodes.len() {
                    let n = self.edges[ei].nodes[k];
                    self.nodes[n.index()].fixed = true;
                }
            }
        }

        self.nodes.iter().filter(|n| n.fixed).count()
    }

    // ==================== Iteration ====================

    /// Iterate over all node IDs.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId::new)
    }

    /// Iterate over all edge IDs.
    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeId> + '_ {
        (0..self.edges.len()).map(EdgeId::new)
    }

    /// Iterate over all face IDs.
    pub fn face_ids(&self) -> impl Iterator<Item = FaceId> + '_ {
        (0..self.faces.len()).map(FaceId::new)
    }

    /// Iterate over all nodes with their IDs.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (NodeId::new(i), n))
    }

    /// Iterate over all faces with their IDs.
    pub fn faces(&self) -> impl Iterator<Item = (FaceId, &Face)> + '_ {
        self.faces
            .iter()
            .enumerate()
            .map(|(i, f)| (FaceId::new(i), f))
    }

    // ==================== Topology Queries ====================

    /// Iterate over the nodes joined to `n` by an edge.
    pub fn node_neighbors(&self, n: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.node(n)
            .edges
            .iter()
            .filter_map(move |&e| self.edge(e).other_node(n))
    }

    /// Number of edges incident to a node.
    #[inline]
    pub fn valence(&self, n: NodeId) -> usize {
        self.node(n).edges.len()
    }

    /// Border edges incident to a node, in link order.
    pub fn border_edges_of(&self, n: NodeId) -> Vec<EdgeId> {
        self.node(n)
            .edges
            .iter()
            .copied()
            .filter(|&e| self.edge(e).border)
            .collect()
    }

    /// Faces sharing an edge with `f`.
    pub fn adjacent_faces(&self, f: FaceId) -> Vec<FaceId> {
        let mut adjacent = Vec::with_capacity(3);
        for &e in &self.face(f).edges {
            for &g in &self.edge(e).faces {
                if g != f && !adjacent.contains(&g) {
                    adjacent.push(g);
                }
            }
        }
        adjacent
    }

    /// Get the three nodes of a face.
    #[inline]
    pub fn face_triangle(&self, f: FaceId) -> [NodeId; 3] {
        let nodes = &self.face(f).nodes;
        [nodes[0], nodes[1], nodes[2]]
    }

    /// Get the positions of the three nodes of a face.
    pub fn face_positions(&self, f: FaceId) -> [Point3<f64>; 3] {
        let [n0, n1, n2] = self.face_triangle(f);
        [*self.position(n0), *self.position(n1), *self.position(n2)]
    }

    // ==================== Geometry ====================

    /// Compute the unit normal of a face (zero for a degenerate face).
    pub fn face_normal(&self, f: FaceId) -> Vector3<f64> {
        let [p0, p1, p2] = self.face_positions(f);
        let e1 = p1 - p0;
        let e2 = p2 - p0;
        e1.cross(&e2)
            .try_normalize(f64::MIN_POSITIVE)
            .unwrap_or_else(Vector3::zeros)
    }

    /// Compute the area of a face.
    pub fn face_area(&self, f: FaceId) -> f64 {
        let [p0, p1, p2] = self.face_positions(f);
        let e1 = p1 - p0;
        let e2 = p2 - p0;
        0.5 * e1.cross(&e2).norm()
    }

    /// Compute the centroid of a face.
    pub fn face_centroid(&self, f: FaceId) -> Point3<f64> {
        let [p0, p1, p2] = self.face_positions(f);
        Point3::from((p0.coords + p1.coords + p2.coords) / 3.0)
    }

    /// Refresh every face's cached centroid.
    pub fn compute_aux_nodes(&mut self) {
        for fi in 0..self.faces.len() {
            let c = self.face_centroid(FaceId::new(fi));
            self.faces[fi].aux_node = c;
        }
    }

    /// Interior angle of face `f` at node `n`, or `None` if `n` is not on `f`.
    pub fn corner_angle(&self, f: FaceId, n: NodeId) -> Option<f64> {
        let [a, b, c] = self.face_triangle(f);
        let (others, p) = if a == n {
            ([b, c], self.position(a))
        } else if b == n {
            ([c, a], self.position(b))
        } else if c == n {
            ([a, b], self.position(c))
        } else {
            return None;
        };
        let u = self.position(others[0]) - p;
        let v = self.position(others[1]) - p;
        Some(u.angle(&v))
    }

    /// Edge vector from its first node to its second.
    pub fn edge_vector(&self, e: EdgeId) -> Vector3<f64> {
        let nodes = &self.edge(e).nodes;
        self.position(nodes[1]) - self.position(nodes[0])
    }

    /// Edge vector pointing away from `n`.
    ///
    /// `n` is expected to be an endpoint; otherwise the vector is oriented as
    /// [`edge_vector`](Self::edge_vector).
    pub fn edge_vector_from(&self, e: EdgeId, n: NodeId) -> Vector3<f64> {
        match self.edge(e).other_node(n) {
            Some(other) => self.position(other) - self.position(n),
            None => self.edge_vector(e),
        }
    }

    /// Compute the length of an edge.
    pub fn edge_length(&self, e: EdgeId) -> f64 {
        self.edge_vector(e).norm()
    }

    /// Compute the bounding box of the mesh.
    pub fn bounding_box(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let first = self.nodes.first()?;
        let mut min = first.position;
        let mut max = first.position;

        for n in &self.nodes {
            for i in 0..3 {
                min[i] = min[i].min(n.position[i]);
                max[i] = max[i].max(n.position[i]);
            }
        }

        Some((min, max))
    }

    /// Compute the total surface area of the mesh.
    pub fn surface_area(&self) -> f64 {
        self.face_ids().map(|f| self.face_area(f)).sum()
    }

    // ==================== Validation ====================

    /// Check the cardinality and border invariants.
    ///
    /// # Errors
    ///
    /// The first violation found, as [`MeshError::TopologyViolation`].
    pub fn validate(&self) -> Result<()> {
        for (fid, f) in self.faces() {
            if f.nodes.len() != 3 {
                return Err(MeshError::topology(
                    fid,
                    format!("face has {} nodes, expected 3", f.nodes.len()),
                ));
            }
            if f.edges.len() != 3 {
                return Err(MeshError::topology(
                    fid,
                    format!("face has {} edges, expected 3", f.edges.len()),
                ));
            }
        }

        for (i, e) in self.edges.iter().enumerate() {
            let eid = EdgeId::new(i);
            if e.nodes.len() != 2 {
                return Err(MeshError::topology(
                    eid,
                    format!("edge has {} nodes, expected 2", e.nodes.len()),
                ));
            }
            if e.faces.is_empty() || e.faces.len() > 2 {
                return Err(MeshError::topology(
                    eid,
                    format!("edge has {} faces, expected 1 or 2", e.faces.len()),
                ));
            }
            if e.border != (e.faces.len() == 1) {
                return Err(MeshError::topology(eid, "border flag out of date"));
            }
            // The first edge found for this pair must be this one.
            if self.is_edge_present(e.nodes[0], e.nodes[1]) != Some(eid) {
                return Err(MeshError::topology(eid, "duplicate edge for node pair"));
            }
        }

        for (nid, n) in self.nodes() {
            let touches_border = n.edges.iter().any(|&e| self.edge(e).border);
            if n.fixed != touches_border {
                return Err(MeshError::topology(nid, "fixed flag out of date"));
            }
        }

        Ok(())
    }

    /// Reject NaN face areas and NaN field values.
    ///
    /// # Errors
    ///
    /// [`MeshError::NumericalError`] naming the first offending element.
    pub fn check_consistency(&self) -> Result<()> {
        for (fid, f) in self.faces() {
            if self.face_area(fid).is_nan() {
                return Err(MeshError::numerical(fid, "face area is NaN"));
            }
            if let Some(field) = super::FaceField::ALL
                .iter()
                .find(|&&field| f.fields.get(field).is_nan())
            {
                return Err(MeshError::numerical(fid, format!("field {} is NaN", field)));
            }
        }

        for (nid, n) in self.nodes() {
            if let Some(field) = super::NodeField::ALL
                .iter()
                .find(|&&field| n.fields.get(field).is_nan())
            {
                return Err(MeshError::numerical(nid, format!("field {} is NaN", field)));
            }
        }

        Ok(())
    }

    /// Cheap isomorphism heuristic: equal node counts and equal sorted
    /// degree sequences. Not a proof of isomorphism.
    pub fn is_isomorphic_to(&self, other: &Mesh) -> bool {
        if self.num_nodes() != other.num_nodes() || self.num_faces() != other.num_faces() {
            return false;
        }

        let mut degrees: Vec<usize> = self.nodes.iter().map(|n| n.edges.len()).collect();
        let mut other_degrees: Vec<usize> = other.nodes.iter().map(|n| n.edges.len()).collect();
        degrees.sort_unstable();
        other_degrees.sort_unstable();
        degrees == other_degrees
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unlinked_triangle() -> (Mesh, [NodeId; 3], FaceId) {
        let mut mesh = Mesh::new();
        let a = mesh.add_node(Point3::new(0.0, 0.0, 0.0));
        let b = mesh.add_node(Point3::new(1.0, 0.0, 0.0));
        let c = mesh.add_node(Point3::new(0.0, 1.0, 0.0));
        let f = mesh.add_face();
        (mesh, [a, b, c], f)
    }

    #[test]
    fn test_empty_mesh() {
        let mesh = Mesh::new();
        assert_eq!(mesh.num_nodes(), 0);
        assert_eq!(mesh.num_edges(), 0);
        assert_eq!(mesh.num_faces(), 0);
        assert!(mesh.validate().is_ok());
        assert!(mesh.bounding_box().is_none());
    }

    #[test]
    fn test_face_rejects_fourth_node() {
        let (mut mesh, [a, b, c], f) = unlinked_triangle();
        let d = mesh.add_node(Point3::new(1.0, 1.0, 0.0));

        mesh.link_face_node(f, a).unwrap();
        mesh.link_face_node(f, b).unwrap();
        mesh.link_face_node(f, c).unwrap();
        let err = mesh.link_face_node(f, d).unwrap_err();
        assert!(matches!(err, MeshError::TopologyViolation { .. }));

        // Neither side was touched by the failed call.
        assert_eq!(mesh.face(f).nodes().len(), 3);
        assert!(mesh.node(d).faces().is_empty());
    }

    #[test]
    fn test_edge_rejects_third_node() {
        let (mut mesh, [a, b, c], _) = unlinked_triangle();
        let e = mesh.add_edge();
        mesh.link_node_edge(a, e).unwrap();
        mesh.link_node_edge(b, e).unwrap();
        assert!(mesh.link_node_edge(c, e).is_err());
        assert!(mesh.node(c).edges().is_empty());
    }

    #[test]
    fn test_edge_rejects_third_face() {
        let mut mesh = Mesh::new();
        let e = mesh.add_edge();
        let f0 = mesh.add_face();
        let f1 = mesh.add_face();
        let f2 = mesh.add_face();

        mesh.link_face_edge(f0, e).unwrap();
        mesh.link_face_edge(f1, e).unwrap();
        // Re-linking is a no-op.
        mesh.link_face_edge(f1, e).unwrap();
        assert_eq!(mesh.edge(e).faces().len(), 2);
        assert_eq!(mesh.face(f1).edges().len(), 1);

        assert!(mesh.link_face_edge(f2, e).is_err());
        assert!(mesh.face(f2).edges().is_empty());
    }

    #[test]
    fn test_is_edge_present() {
        let (mut mesh, [a, b, c], _) = unlinked_triangle();
        let e = mesh.add_edge();
        mesh.link_node_edge(a, e).unwrap();
        mesh.link_node_edge(b, e).unwrap();

        assert_eq!(mesh.is_edge_present(a, b), Some(e));
        assert_eq!(mesh.is_edge_present(b, a), Some(e));
        assert_eq!(mesh.is_edge_present(a, c), None);
    }

    #[test]
    fn test_geometry() {
        let (mut mesh, [a, b, c], f) = unlinked_triangle();
        for n in [a, b, c] {
            mesh.link_face_node(f, n).unwrap();
        }

        assert!((mesh.face_area(f) - 0.5).abs() < 1e-12);
        assert!((mesh.face_normal(f) - Vector3::z()).norm() < 1e-12);
        let centroid = mesh.face_centroid(f);
        assert!((centroid - Point3::new(1.0 / 3.0, 1.0 / 3.0, 0.0)).norm() < 1e-12);

        let angle = mesh.corner_angle(f, a).unwrap();
        assert!((angle - std::f64::consts::FRAC_PI_2).abs() < 1e-12);

        mesh.compute_aux_nodes();
        assert_eq!(mesh.face(f).aux_node, centroid);
    }

    #[test]
    fn test_degenerate_normal_is_zero() {
        let mut mesh = Mesh::new();
        let f = mesh.add_face();
        for x in [0.0, 1.0, 2.0] {
            let n = mesh.add_node(Point3::new(x, 0.0, 0.0));
            mesh.link_face_node(f, n).unwrap();
        }
        assert_eq!(mesh.face_normal(f), Vector3::zeros());
        assert_eq!(mesh.face_area(f), 0.0);
    }

    #[test]
    fn test_check_consistency_rejects_nan() {
        let (mut mesh, [a, b, c], f) = unlinked_triangle();
        for n in [a, b, c] {
            mesh.link_face_node(f, n).unwrap();
        }
        assert!(mesh.check_consistency().is_ok());

        mesh.face_mut(f).fields.hi = f64::NAN;
        let err = mesh.check_consistency().unwrap_err();
        assert!(matches!(err, MeshError::NumericalError { .. }));
        assert!(err.to_string().contains("Hi"));
    }
}
