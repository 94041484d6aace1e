//! Field transfer between meshes.
//!
//! Moves scalar fields from a source mesh onto a target mesh whose topology
//! is unrelated to the source's, by nearest-neighbour lookup in a
//! [`SpatialIndex`].
//!
//! # Strategies
//!
//! - [`TransferStrategy::NodeCentered`]: each source face field is averaged
//!   onto source nodes, copied to every target node from its nearest source
//!   node, then averaged back onto target faces.
//! - [`TransferStrategy::CellCentered`]: every target face copies the fields
//!   of the source face with the nearest centroid.
//! - [`TransferStrategy::Direct`]: index-by-index copy between meshes that
//!   pass [`Mesh::is_isomorphic_to`].
//!
//! # Example
//!
//! ```
//! use rimemesh::algo::transfer::{transfer_fields, TransferOptions, TransferStrategy};
//! use rimemesh::mesh::{build_from_triangles, FaceField, FaceId};
//! use nalgebra::Point3;
//!
//! let positions = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(1.0, 1.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//! ];
//! let triangles = [[0, 1, 2], [0, 2, 3]];
//! let mut source = build_from_triangles(&positions, &triangles).unwrap();
//! let mut target = build_from_triangles(&positions, &triangles).unwrap();
//! source.face_mut(FaceId::new(0)).fields.hi = 0.002;
//!
//! let options = TransferOptions::default()
//!     .with_strategy(TransferStrategy::CellCentered)
//!     .with_fields(vec![FaceField::Hi]);
//! transfer_fields(&mut source, &mut target, &options).unwrap();
//! assert_eq!(target.face(FaceId::new(0)).fields.hi, 0.002);
//! ```

use std::fmt;
use std::str::FromStr;

use nalgebra::Point3;

use crate::error::{MeshError, Result};
use crate::mesh::{FaceField, FaceId, Mesh, NodeField, NodeId};
use crate::spatial::{Nearest, SpatialIndex, COORD_EPSILON};

/// How fields are carried from the source mesh to the target mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferStrategy {
    /// Resample through nodes: face → node, nearest node, node → face.
    #[default]
    NodeCentered,
    /// Copy from the face with the nearest centroid.
    CellCentered,
    /// Copy face fields by index between isomorphic meshes.
    Direct,
}

impl TransferStrategy {
    fn name(self) -> &'static str {
        match self {
            TransferStrategy::NodeCentered => "node_centered",
            TransferStrategy::CellCentered => "cell_centered",
            TransferStrategy::Direct => "direct",
        }
    }
}

impl fmt::Display for TransferStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TransferStrategy {
    type Err = MeshError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "node_centered" => Ok(TransferStrategy::NodeCentered),
            "cell_centered" => Ok(TransferStrategy::CellCentered),
            "direct" => Ok(TransferStrategy::Direct),
            _ => Err(MeshError::ConfigurationError(format!(
                "unknown transfer strategy '{}'",
                s
            ))),
        }
    }
}

/// Which nearest-neighbour query to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    /// Single greedy descent ([`SpatialIndex::nearest`]).
    #[default]
    Approximate,
    /// Branch-and-bound ([`SpatialIndex::nearest_exact`]).
    Exact,
}

/// Options for [`transfer_fields`].
#[derive(Debug, Clone)]
pub struct TransferOptions {
    /// Transfer strategy.
    pub strategy: TransferStrategy,

    /// Nearest-neighbour query used by the spatial strategies.
    pub search: SearchMode,

    /// Face fields to transfer (default: all of them).
    pub fields: Vec<FaceField>,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            strategy: TransferStrategy::default(),
            search: SearchMode::default(),
            fields: FaceField::ALL.to_vec(),
        }
    }
}

impl TransferOptions {
    /// Set the transfer strategy.
    pub fn with_strategy(mut self, strategy: TransferStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the nearest-neighbour query.
    pub fn with_search(mut self, search: SearchMode) -> Self {
        self.search = search;
        self
    }

    /// Restrict the transfer to the given fields.
    pub fn with_fields(mut self, fields: Vec<FaceField>) -> Self {
        self.fields = fields;
        self
    }
}

/// Summary of a completed transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferReport {
    /// Strategy that produced this report.
    pub strategy: TransferStrategy,
    /// Number of target elements (nodes or faces) that received values.
    pub matched: usize,
    /// Number of matches whose source key coincided with the query.
    pub exact_hits: usize,
    /// Largest query-to-match distance.
    pub max_distance: f64,
}

impl TransferReport {
    fn from_matches(strategy: TransferStrategy, matches: &[Nearest]) -> Self {
        Self {
            strategy,
            matched: matches.len(),
            exact_hits: matches
                .iter()
                .filter(|m| m.distance <= COORD_EPSILON)
                .count(),
            max_distance: matches.iter().map(|m| m.distance).fold(0.0, f64::max),
        }
    }
}

fn match_points(index: &SpatialIndex, queries: &[Point3<f64>], search: SearchMode) -> Result<Vec<Nearest>> {
    queries
        .iter()
        .map(|q| {
            let hit = match search {
                SearchMode::Approximate => index.nearest(q),
                SearchMode::Exact => index.nearest_exact(q),
            };
            hit.ok_or(MeshError::EmptyMesh)
        })
        .collect()
}

/// Transfer face fields from `source` onto `target`.
///
/// `source` is borrowed mutably because the node-centred strategy writes the
/// averaged values into the source's node slots; its face fields are left
/// untouched. Coincident source nodes (or centroids) are matched through the
/// lowest-indexed one.
///
/// # Errors
///
/// - [`MeshError::EmptyMesh`] if either mesh has no faces.
/// - [`MeshError::InvalidTopology`] if a node has no incident faces.
/// - [`MeshError::ConfigurationError`] for [`TransferStrategy::Direct`]
///   between non-isomorphic meshes.
pub fn transfer_fields(
    source: &mut Mesh,
    target: &mut Mesh,
    options: &TransferOptions,
) -> Result<TransferReport> {
    if source.num_faces() == 0 || target.num_faces() == 0 {
        return Err(MeshError::EmptyMesh);
    }

    log::info!(
        "Transferring {} field(s) {} -> {} faces ({})",
        options.fields.len(),
        source.num_faces(),
        target.num_faces(),
        options.strategy
    );

    let report = match options.strategy {
        TransferStrategy::NodeCentered => node_centered(source, target, options)?,
        TransferStrategy::CellCentered => cell_centered(source, target, options)?,
        TransferStrategy::Direct => direct(source, target, &options.fields)?,
    };

    log::info!(
        "Transfer done: {} matched, {} exact, max distance {:.3e}",
        report.matched,
        report.exact_hits,
        report.max_distance
    );
    Ok(report)
}

fn node_centered(source: &mut Mesh, target: &mut Mesh, options: &TransferOptions) -> Result<TransferReport> {
    let index = SpatialIndex::from_mesh_nodes_dedup(source);
    let queries: Vec<Point3<f64>> = target.node_ids().map(|n| *target.position(n)).collect();
    let matches = match_points(&index, &queries, options.search)?;

    for &field in &options.fields {
        source.relocate_faces_to_nodes(field)?;
        let slot = field.node_slot();
        for (i, m) in matches.iter().enumerate() {
            let value = source.node(NodeId::new(m.item)).fields.get(slot);
            target.node_mut(NodeId::new(i)).fields.set(slot, value);
        }
        target.relocate_nodes_to_faces(field)?;
    }

    Ok(TransferReport::from_matches(TransferStrategy::NodeCentered, &matches))
}

fn cell_centered(source: &mut Mesh, target: &mut Mesh, options: &TransferOptions) -> Result<TransferReport> {
    source.compute_aux_nodes();
    target.compute_aux_nodes();

    let index = SpatialIndex::from_face_centroids_dedup(source);
    let queries: Vec<Point3<f64>> = target.faces().map(|(_, f)| f.aux_node).collect();
    let matches = match_points(&index, &queries, options.search)?;

    for (i, m) in matches.iter().enumerate() {
        let from = source.face(FaceId::new(m.item)).fields;
        let to = &mut target.face_mut(FaceId::new(i)).fields;
        for &field in &options.fields {
            to.set(field, from.get(field));
        }
    }

    // Keep the target's node view of T and Hw in step with its faces.
    for field in [FaceField::T, FaceField::Hw] {
        if options.fields.contains(&field) {
            target.relocate_faces_to_nodes(field)?;
        }
    }

    Ok(TransferReport::from_matches(TransferStrategy::CellCentered, &matches))
}

fn direct(source: &Mesh, target: &mut Mesh, fields: &[FaceField]) -> Result<TransferReport> {
    if !source.is_isomorphic_to(target) {
        return Err(MeshError::ConfigurationError(format!(
            "direct transfer needs isomorphic meshes ({} nodes / {} faces vs {} nodes / {} faces)",
            source.num_nodes(),
            source.num_faces(),
            target.num_nodes(),
            target.num_faces()
        )));
    }

    for f in source.face_ids() {
        let from = source.face(f).fields;
        let to = &mut target.face_mut(f).fields;
        for &field in fields {
            to.set(field, from.get(field));
        }
    }

    Ok(TransferReport {
        strategy: TransferStrategy::Direct,
        matched: target.num_faces(),
        exact_hits: target.num_faces(),
        max_distance: 0.0,
    })
}

/// Copy node slots verbatim from each target node's nearest source node.
pub fn transfer_node_fields(
    source: &Mesh,
    target: &mut Mesh,
    fields: &[NodeField],
    search: SearchMode,
) -> Result<TransferReport> {
    let index = SpatialIndex::from_mesh_nodes_dedup(source);
    let queries: Vec<Point3<f64>> = target.node_ids().map(|n| *target.position(n)).collect();
    let matches = match_points(&index, &queries, search)?;

    for (i, m) in matches.iter().enumerate() {
        let from = source.node(NodeId::new(m.item)).fields;
        let to = &mut target.node_mut(NodeId::new(i)).fields;
        for &field in fields {
            to.set(field, from.get(field));
        }
    }

    Ok(TransferReport::from_matches(TransferStrategy::NodeCentered, &matches))
}

/// Area-weighted totals of one field on both sides of a transfer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conservation {
    /// The field measured.
    pub field: FaceField,
    /// Σ value·area over the source faces.
    pub source_total: f64,
    /// Σ value·area over the target faces.
    pub target_total: f64,
}

impl Conservation {
    /// `target_total − source_total`.
    pub fn difference(&self) -> f64 {
        self.target_total - self.source_total
    }
}

fn area_weighted_total(mesh: &Mesh, field: FaceField) -> Result<f64> {
    let mut total = 0.0;
    for (fid, face) in mesh.faces() {
        let value = face.fields.get(field);
        if value.is_nan() {
            return Err(MeshError::numerical(fid, format!("NaN value of {}", field)));
        }
        total += value * mesh.face_area(fid);
    }
    Ok(total)
}

/// Compare Σ field·area between two meshes, one entry per field.
///
/// # Errors
///
/// [`MeshError::NumericalError`] if any face holds a NaN for a measured field.
pub fn conservation_report(source: &Mesh, target: &Mesh, fields: &[FaceField]) -> Result<Vec<Conservation>> {
    fields
        .iter()
        .map(|&field| {
            let c = Conservation {
                field,
                source_total: area_weighted_total(source, field)?,
                target_total: area_weighted_total(target, field)?,
            };
            log::info!("{}: {:+.6e}", field, c.difference());
            Ok(c)
        })
        .collect()
}
