//! Feature-preserving NullSpace smoothing.
//!
//! For every node the area-weighted covariance of the incident face normals,
//! `A = Σ wᵢ nᵢ nᵢᵀ`, is decomposed. Eigenvalues above `ε · λ_max` mark
//! dominant normal directions (one on a flat patch, two on a ridge, three
//! at a corner); the remaining eigenvectors span directions along which the
//! surface is locally flat. The node is moved towards the area-weighted mean
//! of the surrounding face centroids, projected onto that null space, so
//! ridges and corners are not rounded off.

use std::collections::VecDeque;

use nalgebra::{Matrix3, SymmetricEigen, Vector3};

use super::{refresh_fuzzy_medians, FuzzyMedianSmoother, Smoother};
use crate::error::{MeshError, Result};
use crate::mesh::{FaceId, Mesh, NodeId};

/// Tolerance of the `det(A) = Πλ` consistency check.
const DETERMINANT_TOLERANCE: f64 = 1e-4;

/// Which per-face normal feeds the covariance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NormalSource {
    /// Current geometric face normals.
    #[default]
    Geometric,
    /// Filtered normals stored in [`Face::fuzzy_median`](crate::mesh::Face::fuzzy_median).
    ///
    /// Unset medians are filled with default FVM parameters before the
    /// first pass. Only [`CompositeSmoother`](super::CompositeSmoother)
    /// refreshes them between passes.
    FuzzyMedian,
}

/// NullSpace smoother.
#[derive(Debug, Clone, PartialEq)]
pub struct NullSpaceSmoother {
    /// Fraction of the projected offset applied per iteration.
    pub step: f64,

    /// Relative eigenvalue threshold.
    pub epsilon: f64,

    /// For fixed nodes, gather this many faces by breadth-first search
    /// instead of using only the incident ones.
    pub border_neighbor_faces: Option<usize>,

    /// Weight centroid offsets by area × corner angle instead of area.
    pub angle_weighted: bool,

    /// Normal source for the covariance.
    pub normals: NormalSource,
}

impl Default for NullSpaceSmoother {
    fn default() -> Self {
        Self {
            step: 0.2,
            epsilon: 1e-3,
            border_neighbor_faces: None,
            angle_weighted: false,
            normals: NormalSource::Geometric,
        }
    }
}

impl NullSpaceSmoother {
    /// Set the step.
    pub fn with_step(mut self, step: f64) -> Self {
        self.step = step;
        self
    }

    /// Set the eigenvalue threshold.
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Use `count` breadth-first faces around fixed nodes.
    pub fn with_border_neighbor_faces(mut self, count: usize) -> Self {
        self.border_neighbor_faces = Some(count);
        self
    }

    /// Enable angle weighting of centroid offsets.
    pub fn with_angle_weighting(mut self, enabled: bool) -> Self {
        self.angle_weighted = enabled;
        self
    }

    /// Set the normal source.
    pub fn with_normals(mut self, normals: NormalSource) -> Self {
        self.normals = normals;
        self
    }

    fn face_normal(&self, mesh: &Mesh, f: FaceId) -> Vector3<f64> {
        match self.normals {
            NormalSource::Geometric => mesh.face_normal(f),
            NormalSource::FuzzyMedian => mesh.face(f).fuzzy_median,
        }
    }

    /// `Σ area · n nᵀ` over the faces incident to `n`.
    fn covariance(&self, mesh: &Mesh, n: NodeId) -> Result<Matrix3<f64>> {
        let faces = mesh.node(n).faces();
        if faces.is_empty() {
            return Err(MeshError::invalid_topology(n, "node has no incident faces"));
        }

        let mut a = Matrix3::zeros();
        for &f in faces {
            let normal = self.face_normal(mesh, f);
            a += normal * normal.transpose() * mesh.face_area(f);
        }
        Ok(a)
    }

    /// Faces whose centroids pull on `n`.
    fn neighborhood(&self, mesh: &Mesh, n: NodeId) -> Vec<FaceId> {
        match self.border_neighbor_faces {
            Some(count) if mesh.node(n).is_fixed() => breadth_first_faces(mesh, n, count),
            _ => mesh.node(n).faces().to_vec(),
        }
    }

    /// Weighted mean of `centroid − p` over the neighbourhood.
    fn centroid_offset(&self, mesh: &Mesh, n: NodeId) -> Result<Vector3<f64>> {
        let p = *mesh.position(n);
        let mut sum = Vector3::zeros();
        let mut total = 0.0;

        for f in self.neighborhood(mesh, n) {
            let mut w = mesh.face_area(f);
            if self.angle_weighted {
                w *= angle_at_nearest_corner(mesh, f, n);
            }
            sum += (mesh.face_centroid(f) - p) * w;
            total += w;
        }

        if !(total > 0.0) {
            return Err(MeshError::invalid_topology(
                n,
                "surrounding faces have zero total weight",
            ));
        }
        Ok(sum / total)
    }
}

impl Smoother for NullSpaceSmoother {
    fn name(&self) -> &'static str {
        "NullSpace"
    }

    fn prepare(&mut self, mesh: &mut Mesh, _iteration: usize) -> Result<()> {
        if self.border_neighbor_faces == Some(0) {
            return Err(MeshError::invalid_param(
                "border_neighbor_faces",
                0,
                "must be at least 1",
            ));
        }
        if self.normals == NormalSource::FuzzyMedian
            && mesh.faces().any(|(_, face)| face.fuzzy_median == Vector3::zeros())
        {
            let defaults = FuzzyMedianSmoother::default();
            refresh_fuzzy_medians(mesh, defaults.sigma, defaults.normal_iterations)?;
        }
        Ok(())
    }

    fn displacement(&self, mesh: &Mesh, node: NodeId, _iteration: usize) -> Result<Vector3<f64>> {
        let a = self.covariance(mesh, node)?;
        let eigen = SymmetricEigen::new(a);
        let values = eigen.eigenvalues;

        // Sort by eigenvalue (descending)
        let mut order = [0usize, 1, 2];
        order.sort_by(|&i, &j| values[j].total_cmp(&values[i]));

        let product = values[0] * values[1] * values[2];
        let det = a.determinant();
        if (det - product).abs() >= DETERMINANT_TOLERANCE {
            return Err(MeshError::numerical(
                node,
                format!("det(A) = {:e} but eigenvalue product = {:e}", det, product),
            ));
        }

        let threshold = self.epsilon * values[order[0]];
        let k = order.iter().filter(|&&i| values[i] > threshold).count();
        if k == 3 {
            return Ok(Vector3::zeros());
        }

        let mut projector = Matrix3::zeros();
        for &i in &order[k..] {
            let v = eigen.eigenvectors.column(i).into_owned();
            projector += v * v.transpose();
        }

        let dv = self.centroid_offset(mesh, node)?;
        Ok(projector * dv * self.step)
    }
}

/// Up to `count` faces around `n`: its incident faces first, then faces
/// reached across shared edges in breadth-first order.
fn breadth_first_faces(mesh: &Mesh, n: NodeId, count: usize) -> Vec<FaceId> {
    let mut visited = vec![false; mesh.num_faces()];
    let mut found = Vec::with_capacity(count);
    let mut queue = VecDeque::new();

    for &f in mesh.node(n).faces().iter().take(count) {
        visited[f.index()] = true;
        found.push(f);
        queue.push_back(f);
    }

    while found.len() < count {
        let Some(f) = queue.pop_front() else {
            break;
        };
        for g in mesh.adjacent_faces(f) {
            if found.len() == count {
                break;
            }
            if !visited[g.index()] {
                visited[g.index()] = true;
                found.push(g);
                queue.push_back(g);
            }
        }
    }

    found
}

/// Interior angle of `f` at its corner closest to `n`.
fn angle_at_nearest_corner(mesh: &Mesh, f: FaceId, n: NodeId) -> f64 {
    if let Some(angle) = mesh.corner_angle(f, n) {
        return angle;
    }
    let p = *mesh.position(n);
    let corner = mesh
        .face_triangle(f)
        .into_iter()
        .min_by(|&a, &b| {
            (*mesh.position(a) - p)
                .norm_squared()
                .total_cmp(&(*mesh.position(b) - p).norm_squared())
        })
        .unwrap_or(n);
    mesh.corner_angle(f, corner).unwrap_or(0.0)
}
