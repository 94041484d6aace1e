//! Fuzzy vector median normal filtering.
//!
//! Each face's neighbourhood is the face itself plus its edge-adjacent
//! faces. The vector median of a neighbourhood is the normal with the
//! smallest total angle to the others; the fuzzy median is a Gaussian
//! membership-weighted mean of the neighbourhood normals around it. The
//! filtered normals drive the boundary update of [`FuzzyMedianSmoother`] and
//! the NullSpace pass of [`CompositeSmoother`].

use nalgebra::Vector3;
use rayon::prelude::*;

use super::null_space::{NormalSource, NullSpaceSmoother};
use super::{Fixation, SmoothOptions, Smoother};
use crate::error::{MeshError, Result};
use crate::mesh::{FaceId, Mesh, NodeId};

/// Gaussian membership `exp(−θ² / 2σ²)` of the angle θ between `u` and `v`.
///
/// `u` and `v` need not be normalised; `membership(u, u, σ)` is exactly 1.
pub fn membership(u: &Vector3<f64>, v: &Vector3<f64>, sigma: f64) -> f64 {
    let theta = u.cross(v).norm().atan2(u.dot(v));
    (-(theta * theta) / (2.0 * sigma * sigma)).exp()
}

fn angle(u: &Vector3<f64>, v: &Vector3<f64>) -> f64 {
    u.cross(v).norm().atan2(u.dot(v))
}

/// Medoid of `normals` under the angular distance.
fn vector_median(normals: &[Vector3<f64>]) -> Vector3<f64> {
    normals
        .iter()
        .map(|u| (u, normals.iter().map(|v| angle(u, v)).sum::<f64>()))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(u, _)| *u)
        .unwrap_or_else(Vector3::zeros)
}

/// Recompute every face's [`vector_median`](crate::mesh::Face::vector_median)
/// and [`fuzzy_median`](crate::mesh::Face::fuzzy_median).
///
/// The fuzzy medians start from the geometric normals and are averaged
/// `iterations` times over the neighbourhood, each pass weighting a
/// neighbour by its membership relative to the vector median (first pass)
/// or to the face's own current fuzzy median (later passes).
///
/// # Errors
///
/// Returns [`MeshError::InvalidParameter`] if `sigma` is not positive.
pub fn refresh_fuzzy_medians(mesh: &mut Mesh, sigma: f64, iterations: usize) -> Result<()> {
    if !(sigma > 0.0) {
        return Err(MeshError::invalid_param("sigma", sigma, "must be positive"));
    }

    let num_faces = mesh.num_faces();
    let neighborhoods: Vec<Vec<FaceId>> = (0..num_faces)
        .into_par_iter()
        .map(|i| {
            let f = FaceId::new(i);
            let mut ring = vec![f];
            ring.extend(mesh.adjacent_faces(f));
            ring
        })
        .collect();
    let normals: Vec<Vector3<f64>> = (0..num_faces)
        .into_par_iter()
        .map(|i| mesh.face_normal(FaceId::new(i)))
        .collect();

    let medians: Vec<Vector3<f64>> = neighborhoods
        .par_iter()
        .map(|ring| {
            let ring_normals: Vec<_> = ring.iter().map(|g| normals[g.index()]).collect();
            vector_median(&ring_normals)
        })
        .collect();

    let mut current = normals;
    for pass in 0..iterations {
        current = neighborhoods
            .par_iter()
            .enumerate()
            .map(|(i, ring)| {
                let reference = if pass == 0 { medians[i] } else { current[i] };
                let mut sum = Vector3::zeros();
                for g in ring {
                    let m = current[g.index()];
                    sum += m * membership(&m, &reference, sigma);
                }
                sum.try_normalize(f64::EPSILON).unwrap_or(current[i])
            })
            .collect();
    }

    for (i, (median, fuzzy)) in medians.into_iter().zip(current).enumerate() {
        let face = mesh.face_mut(FaceId::new(i));
        face.vector_median = median;
        face.fuzzy_median = fuzzy;
    }
    log::trace!(
        "refreshed fuzzy medians for {} faces (sigma {}, {} passes)",
        num_faces,
        sigma,
        iterations
    );
    Ok(())
}

/// Fuzzy vector median (FVM) smoother.
///
/// Border nodes are pulled along the filtered normals of their border faces.
/// Interior nodes only move when [`interior_step`](Self::interior_step) is set.
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyMedianSmoother {
    /// Gaussian width of the membership function, in radians.
    pub sigma: f64,
    /// Fuzzy median passes per refresh.
    pub normal_iterations: usize,
    /// Scale of the border-node update.
    pub boundary_factor: f64,
    /// Step of the optional interior update.
    pub interior_step: Option<f64>,
}

impl Default for FuzzyMedianSmoother {
    fn default() -> Self {
        Self {
            sigma: 0.1,
            normal_iterations: 3,
            boundary_factor: 0.05,
            interior_step: None,
        }
    }
}

impl FuzzyMedianSmoother {
    /// Set the membership width.
    pub fn with_sigma(mut self, sigma: f64) -> Self {
        self.sigma = sigma;
        self
    }

    /// Set the number of fuzzy median passes.
    pub fn with_normal_iterations(mut self, iterations: usize) -> Self {
        self.normal_iterations = iterations;
        self
    }

    /// Set the border update scale.
    pub fn with_boundary_factor(mut self, factor: f64) -> Self {
        self.boundary_factor = factor;
        self
    }

    /// Move interior nodes towards the filtered face planes.
    pub fn with_interior_step(mut self, step: f64) -> Self {
        self.interior_step = Some(step);
        self
    }

    fn refresh(&self, mesh: &mut Mesh) -> Result<()> {
        refresh_fuzzy_medians(mesh, self.sigma, self.normal_iterations)
    }

    fn border_displacement(&self, mesh: &Mesh, n: NodeId) -> Vector3<f64> {
        let mut d = Vector3::zeros();
        for e in mesh.border_edges_of(n) {
            let Some(&f) = mesh.edge(e).faces().first() else {
                continue;
            };
            let m = mesh.face(f).fuzzy_median;
            d += m * mesh.edge_vector_from(e, n).dot(&m);
        }
        d * self.boundary_factor
    }

    fn interior_displacement(&self, mesh: &Mesh, n: NodeId, step: f64) -> Result<Vector3<f64>> {
        let faces = mesh.node(n).faces();
        if faces.is_empty() {
            return Err(MeshError::invalid_topology(n, "node has no incident faces"));
        }

        let p = *mesh.position(n);
        let mut d = Vector3::zeros();
        for &f in faces {
            let m = mesh.face(f).fuzzy_median;
            d += m * m.dot(&(mesh.face_centroid(f) - p));
        }
        Ok(d * (step / faces.len() as f64))
    }
}

impl Smoother for FuzzyMedianSmoother {
    fn name(&self) -> &'static str {
        "FVM"
    }

    fn check_options(&self, options: &SmoothOptions) -> Result<()> {
        if options.fixation == Fixation::NoMove && self.interior_step.is_none() {
            return Err(MeshError::ConfigurationError(
                "FVM moves only border nodes, which fixation 'no_move' pins; \
                 use 'none' or 'along_edge', or set an interior step"
                    .to_string(),
            ));
        }
        Ok(())
    }

    fn prepare(&mut self, mesh: &mut Mesh, _iteration: usize) -> Result<()> {
        self.refresh(mesh)
    }

    fn displacement(&self, mesh: &Mesh, node: NodeId, _iteration: usize) -> Result<Vector3<f64>> {
        if mesh.node(node).is_fixed() {
            return Ok(self.border_displacement(mesh, node));
        }
        match self.interior_step {
            Some(step) => self.interior_displacement(mesh, node, step),
            None => Ok(Vector3::zeros()),
        }
    }
}

/// NullSpace smoothing over fuzzy-median normals, with one normal refresh
/// after every geometry pass.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeSmoother {
    /// Geometry pass.
    pub null_space: NullSpaceSmoother,
    /// Normal filter.
    pub fuzzy: FuzzyMedianSmoother,
}

impl Default for CompositeSmoother {
    fn default() -> Self {
        Self {
            null_space: NullSpaceSmoother::default().with_normals(NormalSource::FuzzyMedian),
            fuzzy: FuzzyMedianSmoother::default(),
        }
    }
}

impl Smoother for CompositeSmoother {
    fn name(&self) -> &'static str {
        "NullSpace+FVM"
    }

    fn prepare(&mut self, mesh: &mut Mesh, iteration: usize) -> Result<()> {
        if iteration == 0 {
            self.fuzzy.refresh(mesh)?;
        }
        self.null_space.prepare(mesh, iteration)
    }

    fn displacement(&self, mesh: &Mesh, node: NodeId, iteration: usize) -> Result<Vector3<f64>> {
        self.null_space.displacement(mesh, node, iteration)
    }

    fn finish_iteration(&mut self, mesh: &mut Mesh, _iteration: usize) -> Result<()> {
        self.fuzzy.refresh(mesh)
    }
}
