//! Scalar fields carried by faces and nodes.
//!
//! The solver writes face-centred values; node slots exist so that values can
//! be resampled through node positions when two meshes do not share a
//! topology. Field names are a closed set: parsing an unknown name fails
//! instead of silently selecting nothing.

use std::fmt;
use std::str::FromStr;

use super::index::{FaceId, NodeId};
use super::topology::Mesh;
use crate::error::{MeshError, Result};

/// Face-level fields exchanged with the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaceField {
    /// Temperature.
    T,
    /// Water-film height.
    Hw,
    /// Ice thickness.
    Hi,
    /// Heat-transfer coefficient.
    Htc,
    /// Collection efficiency.
    Beta,
    /// Shear stress, x component.
    TauX,
    /// Shear stress, y component.
    TauY,
    /// Shear stress, z component.
    TauZ,
}

impl FaceField {
    /// Every face field, in file-column order.
    pub const ALL: [FaceField; 8] = [
        FaceField::T,
        FaceField::Hw,
        FaceField::Hi,
        FaceField::Htc,
        FaceField::Beta,
        FaceField::TauX,
        FaceField::TauY,
        FaceField::TauZ,
    ];

    /// The node slot used when this field is resampled through nodes.
    pub fn node_slot(self) -> NodeField {
        match self {
            FaceField::T => NodeField::T,
            FaceField::Hw => NodeField::Hw,
            _ => NodeField::Value,
        }
    }

    /// Canonical name as written by the solver.
    pub fn name(self) -> &'static str {
        match self {
            FaceField::T => "T",
            FaceField::Hw => "Hw",
            FaceField::Hi => "Hi",
            FaceField::Htc => "HTC",
            FaceField::Beta => "Beta",
            FaceField::TauX => "TauX",
            FaceField::TauY => "TauY",
            FaceField::TauZ => "TauZ",
        }
    }
}

impl fmt::Display for FaceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FaceField {
    type Err = MeshError;

    fn from_str(s: &str) -> Result<Self> {
        FaceField::ALL
            .iter()
            .copied()
            .find(|field| field.name() == s)
            .ok_or_else(|| MeshError::ConfigurationError(format!("unknown face field '{}'", s)))
    }
}

/// Node-level field slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeField {
    /// Temperature.
    T,
    /// Water-film height.
    Hw,
    /// Generic slot for any other resampled quantity.
    Value,
}

impl NodeField {
    /// Every node field.
    pub const ALL: [NodeField; 3] = [NodeField::T, NodeField::Hw, NodeField::Value];

    /// Canonical name.
    pub fn name(self) -> &'static str {
        match self {
            NodeField::T => "T",
            NodeField::Hw => "Hw",
            NodeField::Value => "value",
        }
    }
}

impl fmt::Display for NodeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NodeField {
    type Err = MeshError;

    fn from_str(s: &str) -> Result<Self> {
        NodeField::ALL
            .iter()
            .copied()
            .find(|field| field.name() == s)
            .ok_or_else(|| MeshError::ConfigurationError(format!("unknown node field '{}'", s)))
    }
}

/// Per-face scalar values.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FaceFields {
    /// Temperature.
    pub t: f64,
    /// Water-film height.
    pub hw: f64,
    /// Ice thickness.
    pub hi: f64,
    /// Heat-transfer coefficient.
    pub htc: f64,
    /// Collection efficiency.
    pub beta: f64,
    /// Shear stress, x component.
    pub tau_x: f64,
    /// Shear stress, y component.
    pub tau_y: f64,
    /// Shear stress, z component.
    pub tau_z: f64,
}

impl FaceFields {
    /// Fields with every value set to `v`.
    pub fn uniform(v: f64) -> Self {
        Self {
            t: v,
            hw: v,
            hi: v,
            htc: v,
            beta: v,
            tau_x: v,
            tau_y: v,
            tau_z: v,
        }
    }

    /// Read one field.
    #[inline]
    pub fn get(&self, field: FaceField) -> f64 {
        match field {
            FaceField::T => self.t,
            FaceField::Hw => self.hw,
            FaceField::Hi => self.hi,
            FaceField::Htc => self.htc,
            FaceField::Beta => self.beta,
            FaceField::TauX => self.tau_x,
            FaceField::TauY => self.tau_y,
            FaceField::TauZ => self.tau_z,
        }
    }

    /// Write one field.
    #[inline]
    pub fn set(&mut self, field: FaceField, value: f64) {
        match field {
            FaceField::T => self.t = value,
            FaceField::Hw => self.hw = value,
            FaceField::Hi => self.hi = value,
            FaceField::Htc => self.htc = value,
            FaceField::Beta => self.beta = value,
            FaceField::TauX => self.tau_x = value,
            FaceField::TauY => self.tau_y = value,
            FaceField::TauZ => self.tau_z = value,
        }
    }
}

/// Per-node scalar values.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NodeFields {
    /// Temperature.
    pub t: f64,
    /// Water-film height.
    pub hw: f64,
    /// Generic value slot.
    pub value: f64,
}

impl NodeFields {
    /// Read one slot.
    #[inline]
    pub fn get(&self, field: NodeField) -> f64 {
        match field {
            NodeField::T => self.t,
            NodeField::Hw => self.hw,
            NodeField::Value => self.value,
        }
    }

    /// Write one slot.
    #[inline]
    pub fn set(&mut self, field: NodeField, value: f64) {
        match field {
            NodeField::T => self.t = value,
            NodeField::Hw => self.hw = value,
            NodeField::Value => self.value = value,
        }
    }
}

impl Mesh {
    /// Average a face field onto nodes.
    ///
    /// Each node's slot ([`FaceField::node_slot`]) becomes the unweighted
    /// mean of `field` over its incident faces.
    ///
    /// # Errors
    ///
    /// [`MeshError::InvalidTopology`] if a node has no incident faces.
    pub fn relocate_faces_to_nodes(&mut self, field: FaceField) -> Result<()> {
        let slot = field.node_slot();
        let mut means = Vec::with_capacity(self.num_nodes());
        for nid in self.node_ids() {
            let faces = self.node(nid).faces();
            if faces.is_empty() {
                return Err(MeshError::invalid_topology(
                    nid,
                    format!("cannot average {} over zero incident faces", field),
                ));
            }
            let sum: f64 = faces.iter().map(|&f| self.face(f).fields.get(field)).sum();
            means.push(sum / faces.len() as f64);
        }

        for (i, mean) in means.into_iter().enumerate() {
            self.node_mut(NodeId::new(i)).fields.set(slot, mean);
        }
        Ok(())
    }

    /// Average node slot values back onto faces (mean of the 3 nodes).
    pub fn relocate_nodes_to_faces(&mut self, field: FaceField) -> Result<()> {
        let slot = field.node_slot();
        let mut means = Vec::with_capacity(self.num_faces());
        for fid in self.face_ids() {
            let nodes = self.face(fid).nodes();
            if nodes.len() != 3 {
                return Err(MeshError::invalid_topology(
                    fid,
                    format!("face has {} nodes, expected 3", nodes.len()),
                ));
            }
            let sum: f64 = nodes.iter().map(|&n| self.node(n).fields.get(slot)).sum();
            means.push(sum / 3.0);
        }

        for (i, mean) in means.into_iter().enumerate() {
            self.face_mut(FaceId::new(i)).fields.set(field, mean);
        }
        Ok(())
    }

    /// Collect one face field into a vector indexed by face id.
    pub fn face_values(&self, field: FaceField) -> Vec<f64> {
        self.face_ids().map(|f| self.face(f).fields.get(field)).collect()
    }

    /// Collect one node slot into a vector indexed by node id.
    pub fn node_values(&self, field: NodeField) -> Vec<f64> {
        self.node_ids().map(|n| self.node(n).fields.get(field)).collect()
    }

    /// Set one node slot from a slice indexed by node id.
    pub fn set_node_values(&mut self, field: NodeField, values: &[f64]) -> Result<()> {
        if values.len() != self.num_nodes() {
            return Err(MeshError::invalid_param(
                "values.len()",
                values.len(),
                "must equal the number of nodes",
            ));
        }
        for (i, &v) in values.iter().enumerate() {
            self.node_mut(NodeId::new(i)).fields.set(field, v);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::build_from_triangles;
    use nalgebra::Point3;

    fn two_triangles() -> Mesh {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        build_from_triangles(&positions, &[[0, 1, 2], [0, 2, 3]]).unwrap()
    }

    #[test]
    fn test_parse_field_names() {
        assert_eq!("HTC".parse::<FaceField>().unwrap(), FaceField::Htc);
        assert_eq!("TauZ".parse::<FaceField>().unwrap(), FaceField::TauZ);
        assert_eq!("value".parse::<NodeField>().unwrap(), NodeField::Value);
        assert!(matches!(
            "Pressure".parse::<FaceField>(),
            Err(MeshError::ConfigurationError(_))
        ));
        assert!(matches!(
            "Hi".parse::<NodeField>(),
            Err(MeshError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_node_slots() {
        assert_eq!(FaceField::T.node_slot(), NodeField::T);
        assert_eq!(FaceField::Hw.node_slot(), NodeField::Hw);
        assert_eq!(FaceField::Beta.node_slot(), NodeField::Value);
    }

    #[test]
    fn test_face_fields_get_set() {
        let mut fields = FaceFields::default();
        for (i, field) in FaceField::ALL.iter().enumerate() {
            fields.set(*field, i as f64);
        }
        for (i, field) in FaceField::ALL.iter().enumerate() {
            assert_eq!(fields.get(*field), i as f64);
        }
    }

    #[test]
    fn test_relocation_round_trip_uniform_field() {
        let mut mesh = two_triangles();
        for fid in mesh.face_ids().collect::<Vec<_>>() {
            mesh.face_mut(fid).fields = FaceFields::uniform(273.25);
        }

        for field in FaceField::ALL {
            mesh.relocate_faces_to_nodes(field).unwrap();
            mesh.relocate_nodes_to_faces(field).unwrap();
        }

        for fid in mesh.face_ids() {
            assert_eq!(mesh.face(fid).fields, FaceFields::uniform(273.25));
        }
    }

    #[test]
    fn test_relocation_averages() {
        let mut mesh = two_triangles();
        mesh.face_mut(FaceId::new(0)).fields.t = 10.0;
        mesh.face_mut(FaceId::new(1)).fields.t = 20.0;

        mesh.relocate_faces_to_nodes(FaceField::T).unwrap();
        // Nodes 0 and 2 touch both faces.
        assert_eq!(mesh.node(NodeId::new(0)).fields.t, 15.0);
        assert_eq!(mesh.node(NodeId::new(1)).fields.t, 10.0);
        assert_eq!(mesh.node(NodeId::new(2)).fields.t, 15.0);
        assert_eq!(mesh.node(NodeId::new(3)).fields.t, 20.0);

        mesh.relocate_nodes_to_faces(FaceField::T).unwrap();
        assert!((mesh.face(FaceId::new(0)).fields.t - 40.0 / 3.0).abs() < 1e-12);
        assert!((mesh.face(FaceId::new(1)).fields.t - 50.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_isolated_node_is_invalid_topology() {
        let mut mesh = two_triangles();
        mesh.add_node(Point3::new(5.0, 5.0, 5.0));
        let err = mesh.relocate_faces_to_nodes(FaceField::Hw).unwrap_err();
        assert!(matches!(err, MeshError::InvalidTopology { .. }));
    }
}
