//! Mesh construction utilities.
//!
//! This module builds linked meshes from face-vertex lists (the layout the
//! solver writes, one block per zone) and converts them back.

use nalgebra::Point3;

use super::element::Zone;
use super::fields::FaceFields;
use super::index::{FaceId, NodeId};
use super::topology::Mesh;
use crate::error::{MeshError, Result};
use crate::spatial::SpatialIndex;

/// One zone's worth of face-vertex data.
#[derive(Debug, Clone, Default)]
pub struct ZoneData {
    /// Zone title.
    pub name: String,
    /// Node coordinates local to this zone.
    pub positions: Vec<Point3<f64>>,
    /// Triangles as 0-based indices into `positions`.
    pub triangles: Vec<[usize; 3]>,
    /// Optional per-triangle field values, parallel to `triangles`.
    pub face_fields: Option<Vec<FaceFields>>,
}

impl ZoneData {
    /// Create zone data without field values.
    pub fn new(
        name: impl Into<String>,
        positions: Vec<Point3<f64>>,
        triangles: Vec<[usize; 3]>,
    ) -> Self {
        Self {
            name: name.into(),
            positions,
            triangles,
            face_fields: None,
        }
    }

    /// Attach per-triangle field values.
    pub fn with_face_fields(mut self, fields: Vec<FaceFields>) -> Self {
        self.face_fields = Some(fields);
        self
    }
}

fn validate_triangles(num_positions: usize, triangles: &[[usize; 3]]) -> Result<()> {
    if triangles.is_empty() {
        return Err(MeshError::EmptyMesh);
    }

    for (fi, tri) in triangles.iter().enumerate() {
        for &vi in tri {
            if vi >= num_positions {
                return Err(MeshError::InvalidNodeIndex { face: fi, node: vi });
            }
        }
        if tri[0] == tri[1] || tri[1] == tri[2] || tri[0] == tri[2] {
            return Err(MeshError::DegenerateFace { face: fi });
        }
    }

    Ok(())
}

impl Mesh {
    /// Populate an empty mesh from coordinates and index triples.
    ///
    /// Faces keep the supplied winding. Edges are derived in a second pass,
    /// a default zone covering every element is registered and border flags
    /// are computed.
    ///
    /// # Errors
    ///
    /// - [`MeshError::InvalidParameter`] if the mesh already holds nodes.
    /// - [`MeshError::EmptyMesh`], [`MeshError::InvalidNodeIndex`] or
    ///   [`MeshError::DegenerateFace`] for bad input.
    /// - [`MeshError::TopologyViolation`] if an edge would gain a third face.
    pub fn set_nodes_and_faces(
        &mut self,
        positions: &[Point3<f64>],
        triangles: &[[usize; 3]],
    ) -> Result<()> {
        if self.num_nodes() > 0 {
            return Err(MeshError::invalid_param(
                "mesh",
                format!("{} nodes", self.num_nodes()),
                "set_nodes_and_faces requires an empty mesh",
            ));
        }
        validate_triangles(positions.len(), triangles)?;

        let node_ids: Vec<NodeId> = positions.iter().map(|&p| self.add_node(p)).collect();
        let faces = self.add_triangles(&node_ids, triangles)?;

        let mut zone = Zone::new("default");
        zone.nodes = node_ids;
        zone.faces = faces;
        self.add_zone(zone);

        let fixed = self.mark_border();
        log::debug!(
            "Built mesh: {} nodes, {} edges, {} faces ({} fixed)",
            self.num_nodes(),
            self.num_edges(),
            self.num_faces(),
            fixed
        );
        Ok(())
    }

    /// Add faces over existing nodes, then derive their edges.
    fn add_triangles(&mut self, node_ids: &[NodeId], triangles: &[[usize; 3]]) -> Result<Vec<FaceId>> {
        let mut faces = Vec::with_capacity(triangles.len());
        for tri in triangles {
            let f = self.add_face();
            for &i in tri {
                self.link_face_node(f, node_ids[i])?;
            }
            faces.push(f);
        }

        for &f in &faces {
            let [a, b, c] = self.face_triangle(f);
            for (n1, n2) in [(a, b), (b, c), (c, a)] {
                let e = match self.is_edge_present(n1, n2) {
                    Some(e) => e,
                    None => {
                        let e = self.add_edge();
                        self.link_node_edge(n1, e)?;
                        self.link_node_edge(n2, e)?;
                        e
                    }
                };
                self.link_face_edge(f, e)?;
            }
        }

        Ok(faces)
    }
}

/// Build a mesh from node positions and triangles.
///
/// # Example
/// ```
/// use rimemesh::mesh::build_from_triangles;
/// use nalgebra::Point3;
///
/// let positions = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(0.5, 1.0, 0.0),
/// ];
/// let mesh = build_from_triangles(&positions, &[[0, 1, 2]]).unwrap();
/// assert_eq!(mesh.num_nodes(), 3);
/// assert_eq!(mesh.num_edges(), 3);
/// assert_eq!(mesh.num_faces(), 1);
/// ```
pub fn build_from_triangles(positions: &[Point3<f64>], triangles: &[[usize; 3]]) -> Result<Mesh> {
    let mut mesh = Mesh::with_capacity(positions.len(), triangles.len());
    mesh.set_nodes_and_faces(positions, triangles)?;
    Ok(mesh)
}

/// Build one mesh from several zones, merging nodes with identical
/// coordinates so that zones sharing a seam become one connected surface.
///
/// Each input zone becomes a [`Zone`] of the result.
pub fn build_from_zones(zones: &[ZoneData]) -> Result<Mesh> {
    if zones.is_empty() {
        return Err(MeshError::EmptyMesh);
    }

    let total_nodes: usize = zones.iter().map(|z| z.positions.len()).sum();
    let total_faces: usize = zones.iter().map(|z| z.triangles.len()).sum();
    let mut mesh = Mesh::with_capacity(total_nodes, total_faces);
    let mut index = SpatialIndex::with_capacity(total_nodes);

    for data in zones {
        validate_triangles(data.positions.len(), &data.triangles)?;
        if let Some(fields) = &data.face_fields {
            if fields.len() != data.triangles.len() {
                return Err(MeshError::invalid_param(
                    "face_fields.len()",
                    fields.len(),
                    "must equal the number of triangles",
                ));
            }
        }

        let mut local = Vec::with_capacity(data.positions.len());
        for &p in &data.positions {
            let id = match index.find(&p) {
                Some(existing) => NodeId::new(existing),
                None => {
                    let id = mesh.add_node(p);
                    index.insert(p, id.index())?;
                    id
                }
            };
            local.push(id);
        }

        let faces = mesh.add_triangles(&local, &data.triangles)?;
        if let Some(fields) = &data.face_fields {
            for (&f, values) in faces.iter().zip(fields) {
                mesh.face_mut(f).fields = *values;
            }
        }

        let mut zone = Zone::new(data.name.clone());
        local.sort_unstable();
        local.dedup();
        zone.nodes = local;
        zone.faces = faces;
        mesh.add_zone(zone);
    }

    let fixed = mesh.mark_border();
    log::debug!(
        "Stitched {} zones: {} of {} nodes kept, {} fixed",
        zones.len(),
        mesh.num_nodes(),
        total_nodes,
        fixed
    );
    Ok(mesh)
}

/// Convert a mesh back to a face-vertex representation.
///
/// Returns (positions, triangles).
pub fn to_face_vertex(mesh: &Mesh) -> (Vec<Point3<f64>>, Vec<[usize; 3]>) {
    let positions: Vec<Point3<f64>> = mesh.node_ids().map(|n| *mesh.position(n)).collect();

    let triangles: Vec<[usize; 3]> = mesh
        .face_ids()
        .map(|f| {
            let [n0, n1, n2] = mesh.face_triangle(f);
            [n0.index(), n1.index(), n2.index()]
        })
        .collect();

    (positions, triangles)
}

/// Planar `nx × ny` node grid over the unit square, two triangles per cell.
///
/// Node `(i, j)` has index `j * nx + i`.
#[cfg(test)]
pub(crate) fn planar_grid(nx: usize, ny: usize) -> Mesh {
    let mut positions = Vec::with_capacity(nx * ny);
    for j in 0..ny {
        for i in 0..nx {
            positions.push(Point3::new(
                i as f64 / (nx - 1) as f64,
                j as f64 / (ny - 1) as f64,
                0.0,
            ));
        }
    }

    let mut triangles = Vec::with_capacity(2 * (nx - 1) * (ny - 1));
    for j in 0..ny - 1 {
        for i in 0..nx - 1 {
            let a = j * nx + i;
            let b = a + 1;
            let c = a + nx + 1;
            let d = a + nx;
            triangles.push([a, b, c]);
            triangles.push([a, c, d]);
        }
    }

    build_from_triangles(&positions, &triangles).unwrap()
}
