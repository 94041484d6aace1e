//! Surface smoothing.
//!
//! Every smoother computes one displacement per node from a single snapshot
//! of the mesh, and the driver applies them all at once after the sweep
//! (Jacobi relaxation). Nodes on the border are then restricted according
//! to the configured [`Fixation`].
//!
//! # Algorithms
//!
//! - [`LaplacianSmoother`]: moves each node towards the mean of its 1-ring
//! - [`TaubinSmoother`]: alternating λ|μ steps (reduces shrinkage)
//! - [`NullSpaceSmoother`]: feature-preserving, moves only along flat
//!   directions of the local normal covariance
//! - [`FuzzyMedianSmoother`]: filters face normals, then pulls border nodes
//!   towards the filtered surface
//! - [`CompositeSmoother`]: NullSpace driven by fuzzy-median normals
//!
//! # Example
//!
//! ```
//! use rimemesh::algo::smooth::{laplacian_smooth, Fixation, SmoothOptions};
//! use rimemesh::mesh::{build_from_triangles, NodeId};
//! use nalgebra::Point3;
//!
//! let positions = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(1.0, 1.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//!     Point3::new(0.5, 0.5, 0.2), // noisy interior node
//! ];
//! let triangles = [[0, 1, 4], [1, 2, 4], [2, 3, 4], [3, 0, 4]];
//! let mut mesh = build_from_triangles(&positions, &triangles).unwrap();
//!
//! let options = SmoothOptions::default()
//!     .with_iterations(10)
//!     .with_fixation(Fixation::NoMove);
//! let report = laplacian_smooth(&mut mesh, &options).unwrap();
//!
//! assert_eq!(report.iterations, 10);
//! assert!(mesh.position(NodeId::new(4)).z < 0.05);
//! ```

mod fuzzy_median;
mod null_space;

pub use fuzzy_median::{membership, refresh_fuzzy_medians, CompositeSmoother, FuzzyMedianSmoother};
pub use null_space::{NormalSource, NullSpaceSmoother};

use std::fmt;
use std::str::FromStr;

use nalgebra::Vector3;
use rayon::prelude::*;

use crate::error::{MeshError, Result};
use crate::mesh::{Mesh, NodeId};

use super::Progress;

/// How nodes on the border are restricted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fixation {
    /// Border nodes move like any other node.
    None,
    /// Border nodes never move.
    #[default]
    NoMove,
    /// Border nodes slide along one of their border edges.
    AlongEdge,
}

impl fmt::Display for Fixation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Fixation::None => "none",
            Fixation::NoMove => "no_move",
            Fixation::AlongEdge => "along_edge",
        })
    }
}

impl FromStr for Fixation {
    type Err = MeshError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(Fixation::None),
            "no_move" => Ok(Fixation::NoMove),
            "along_edge" => Ok(Fixation::AlongEdge),
            _ => Err(MeshError::ConfigurationError(format!(
                "unknown fixation mode '{}'",
                s
            ))),
        }
    }
}

/// Options shared by every smoother.
#[derive(Debug, Clone)]
pub struct SmoothOptions {
    /// Number of smoothing iterations.
    pub iterations: usize,

    /// Border node restriction.
    pub fixation: Fixation,

    /// Pin border nodes where the boundary turns sharply.
    pub fix_corners: bool,

    /// Corner threshold α in (0, 2): a border node is on a straight stretch
    /// iff the dot product of its two unit border edges is below `−1 + α`.
    pub corner_alpha: f64,

    /// Stop early once the largest applied displacement drops below this.
    pub tolerance: Option<f64>,

    /// Whether to use parallel execution (default: true).
    pub parallel: bool,
}

impl Default for SmoothOptions {
    fn default() -> Self {
        Self {
            iterations: 20,
            fixation: Fixation::NoMove,
            fix_corners: false,
            corner_alpha: 0.1,
            tolerance: None,
            parallel: true,
        }
    }
}

impl SmoothOptions {
    /// Set the number of iterations.
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Set the border fixation mode.
    pub fn with_fixation(mut self, fixation: Fixation) -> Self {
        self.fixation = fixation;
        self
    }

    /// Enable or disable corner pinning.
    pub fn with_fix_corners(mut self, fix_corners: bool) -> Self {
        self.fix_corners = fix_corners;
        self
    }

    /// Set the corner threshold α.
    pub fn with_corner_alpha(mut self, alpha: f64) -> Self {
        self.corner_alpha = alpha;
        self
    }

    /// Stop once the largest displacement of an iteration is below `tolerance`.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = Some(tolerance);
        self
    }

    /// Set whether to use parallel execution.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Create options for single-threaded execution.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    fn validate(&self) -> Result<()> {
        if !(self.corner_alpha > 0.0 && self.corner_alpha < 2.0) {
            return Err(MeshError::invalid_param(
                "corner_alpha",
                self.corner_alpha,
                "must be in (0, 2)",
            ));
        }
        if let Some(t) = self.tolerance {
            if !(t > 0.0) {
                return Err(MeshError::invalid_param("tolerance", t, "must be positive"));
            }
        }
        Ok(())
    }
}

/// Outcome of a smoothing run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothReport {
    /// Iterations actually applied.
    pub iterations: usize,
    /// Largest displacement applied in the last iteration.
    pub max_displacement: f64,
    /// Whether the run stopped early on the tolerance.
    pub converged: bool,
}

/// A node-displacement rule driven by [`smooth`].
///
/// Within one iteration the driver calls [`prepare`](Smoother::prepare),
/// then [`displacement`](Smoother::displacement) for every node against the
/// same geometry (possibly from several threads), applies the results, and
/// finally calls [`finish_iteration`](Smoother::finish_iteration).
pub trait Smoother: Sync {
    /// Name used in log and progress messages.
    fn name(&self) -> &'static str;

    /// Reject option combinations under which this smoother cannot move
    /// any node.
    fn check_options(&self, _options: &SmoothOptions) -> Result<()> {
        Ok(())
    }

    /// Refresh per-face working data before the displacement sweep.
    fn prepare(&mut self, _mesh: &mut Mesh, _iteration: usize) -> Result<()> {
        Ok(())
    }

    /// Unrestricted displacement of `node`.
    fn displacement(&self, mesh: &Mesh, node: NodeId, iteration: usize) -> Result<Vector3<f64>>;

    /// Post-pass after displacements have been applied.
    fn finish_iteration(&mut self, _mesh: &mut Mesh, _iteration: usize) -> Result<()> {
        Ok(())
    }
}

/// Mean of the 1-ring minus the node position.
pub(crate) fn umbrella(mesh: &Mesh, n: NodeId) -> Result<Vector3<f64>> {
    let mut sum = Vector3::zeros();
    let mut count = 0usize;
    for m in mesh.node_neighbors(n) {
        sum += mesh.position(m).coords;
        count += 1;
    }
    if count == 0 {
        return Err(MeshError::invalid_topology(n, "node has no neighbours"));
    }
    Ok(sum / count as f64 - mesh.position(n).coords)
}

/// Classic umbrella-operator smoothing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaplacianSmoother {
    /// Step towards the 1-ring mean.
    pub alpha: f64,
}

impl LaplacianSmoother {
    /// Create a Laplacian smoother with the given step.
    pub fn new(alpha: f64) -> Self {
        Self { alpha }
    }
}

impl Default for LaplacianSmoother {
    fn default() -> Self {
        Self { alpha: 0.2 }
    }
}

impl Smoother for LaplacianSmoother {
    fn name(&self) -> &'static str {
        "Laplacian"
    }

    fn displacement(&self, mesh: &Mesh, node: NodeId, _iteration: usize) -> Result<Vector3<f64>> {
        Ok(umbrella(mesh, node)? * self.alpha)
    }
}

/// Taubin λ|μ smoothing: `+λ·L` on even iterations, `−μ·L` on odd ones.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaubinSmoother {
    /// Forward step.
    pub lambda: f64,
    /// Backward step.
    pub mu: f64,
}

impl TaubinSmoother {
    /// Create a Taubin smoother.
    pub fn new(lambda: f64, mu: f64) -> Self {
        Self { lambda, mu }
    }
}

impl Default for TaubinSmoother {
    fn default() -> Self {
        Self {
            lambda: 0.5,
            mu: 0.52,
        }
    }
}

impl Smoother for TaubinSmoother {
    fn name(&self) -> &'static str {
        "Taubin"
    }

    fn displacement(&self, mesh: &Mesh, node: NodeId, iteration: usize) -> Result<Vector3<f64>> {
        let factor = if iteration % 2 == 0 {
            self.lambda
        } else {
            -self.mu
        };
        Ok(umbrella(mesh, node)? * factor)
    }
}

/// Whether a border node sits on a sharp turn of the boundary.
///
/// Nodes without exactly two border edges count as corners.
fn is_corner(mesh: &Mesh, n: NodeId, alpha: f64) -> bool {
    let border = mesh.border_edges_of(n);
    let &[e0, e1] = border.as_slice() else {
        return true;
    };
    let u0 = mesh.edge_vector_from(e0, n).try_normalize(f64::MIN_POSITIVE);
    let u1 = mesh.edge_vector_from(e1, n).try_normalize(f64::MIN_POSITIVE);
    match (u0, u1) {
        (Some(u0), Some(u1)) => u0.dot(&u1) >= -1.0 + alpha,
        _ => true,
    }
}

/// Project `d` onto the border edge of `n` it is most aligned with.
fn project_along_border(mesh: &Mesh, n: NodeId, d: &Vector3<f64>) -> Result<Vector3<f64>> {
    let border = mesh.border_edges_of(n);
    let &[e0, e1] = border.as_slice() else {
        return Err(MeshError::invalid_topology(
            n,
            format!("fixed node has {} border edges, expected 2", border.len()),
        ));
    };

    let v0 = mesh.edge_vector_from(e0, n);
    let v1 = mesh.edge_vector_from(e1, n);
    let along = if d.dot(&v1) > d.dot(&v0) { v1 } else { v0 };

    Ok(match along.try_normalize(f64::MIN_POSITIVE) {
        Some(u) => u * d.dot(&u),
        None => Vector3::zeros(),
    })
}

/// Apply the fixation policy to a raw displacement.
fn constrain(mesh: &Mesh, n: NodeId, d: Vector3<f64>, options: &SmoothOptions) -> Result<Vector3<f64>> {
    if !mesh.node(n).is_fixed() {
        return Ok(d);
    }
    if options.fix_corners && is_corner(mesh, n, options.corner_alpha) {
        return Ok(Vector3::zeros());
    }
    match options.fixation {
        Fixation::None => Ok(d),
        Fixation::NoMove => Ok(Vector3::zeros()),
        Fixation::AlongEdge => project_along_border(mesh, n, &d),
    }
}

fn check_preconditions(mesh: &Mesh) -> Result<()> {
    if mesh.num_faces() == 0 {
        return Err(MeshError::EmptyMesh);
    }
    for n in mesh.node_ids() {
        let valence = mesh.valence(n);
        if valence < 2 {
            return Err(MeshError::topology(
                n,
                format!("node has {} incident edges, at least 2 required", valence),
            ));
        }
    }
    Ok(())
}

/// Run `smoother` on `mesh` for `options.iterations` iterations.
///
/// # Errors
///
/// - [`MeshError::InvalidParameter`] for out-of-range options.
/// - [`MeshError::TopologyViolation`] if a node has fewer than 2 edges.
/// - [`MeshError::NumericalError`] if an area or field turns NaN.
/// - Any error raised by the smoother itself.
pub fn smooth<S: Smoother + ?Sized>(
    mesh: &mut Mesh,
    smoother: &mut S,
    options: &SmoothOptions,
) -> Result<SmoothReport> {
    run(mesh, smoother, options, &Progress::none(), |_, _| Ok(()))
}

/// [`smooth`] with progress reporting.
pub fn smooth_with_progress<S: Smoother + ?Sized>(
    mesh: &mut Mesh,
    smoother: &mut S,
    options: &SmoothOptions,
    progress: &Progress,
) -> Result<SmoothReport> {
    run(mesh, smoother, options, progress, |_, _| Ok(()))
}

/// [`smooth`] calling `observer(iteration, &mesh)` after every applied
/// iteration. An observer error ends the run with that error.
pub fn smooth_observed<S, F>(
    mesh: &mut Mesh,
    smoother: &mut S,
    options: &SmoothOptions,
    observer: F,
) -> Result<SmoothReport>
where
    S: Smoother + ?Sized,
    F: FnMut(usize, &Mesh) -> Result<()>,
{
    run(mesh, smoother, options, &Progress::none(), observer)
}

fn run<S, F>(
    mesh: &mut Mesh,
    smoother: &mut S,
    options: &SmoothOptions,
    progress: &Progress,
    mut observer: F,
) -> Result<SmoothReport>
where
    S: Smoother + ?Sized,
    F: FnMut(usize, &Mesh) -> Result<()>,
{
    options.validate()?;
    smoother.check_options(options)?;
    check_preconditions(mesh)?;

    let name = smoother.name();
    log::info!(
        "{} smoothing: {} nodes, {} iterations, fixation {}",
        name,
        mesh.num_nodes(),
        options.iterations,
        options.fixation
    );

    let mut report = SmoothReport {
        iterations: 0,
        max_displacement: 0.0,
        converged: false,
    };
    let num_nodes = mesh.num_nodes();

    for iter in 0..options.iterations {
        progress.report(iter, options.iterations, name);
        mesh.check_consistency()?;
        smoother.prepare(mesh, iter)?;

        let snapshot: &Mesh = mesh;
        let shared: &S = smoother;
        let step = |i: usize| -> Result<Vector3<f64>> {
            let n = NodeId::new(i);
            let d = shared.displacement(snapshot, n, iter)?;
            constrain(snapshot, n, d, options)
        };
        let displacements: Vec<Vector3<f64>> = if options.parallel {
            (0..num_nodes).into_par_iter().map(step).collect::<Result<_>>()?
        } else {
            (0..num_nodes).map(step).collect::<Result<_>>()?
        };

        let mut max_displacement = 0.0_f64;
        for (i, d) in displacements.iter().enumerate() {
            let node = mesh.node_mut(NodeId::new(i));
            node.position += *d;
            max_displacement = max_displacement.max(d.norm());
        }

        smoother.finish_iteration(mesh, iter)?;
        observer(iter, mesh)?;

        report.iterations = iter + 1;
        report.max_displacement = max_displacement;
        log::debug!(
            "{} iteration {}: max displacement {:.3e}",
            name,
            iter,
            max_displacement
        );

        if let Some(tolerance) = options.tolerance {
            if max_displacement < tolerance {
                report.converged = true;
                log::info!(
                    "{} smoothing converged after {} iterations",
                    name,
                    report.iterations
                );
                break;
            }
        }
    }

    progress.report(options.iterations, options.iterations, name);
    log::info!(
        "{} smoothing done: {} iterations, last max displacement {:.3e}",
        name,
        report.iterations,
        report.max_displacement
    );
    Ok(report)
}

/// Laplacian smoothing with default step (α = 0.2).
pub fn laplacian_smooth(mesh: &mut Mesh, options: &SmoothOptions) -> Result<SmoothReport> {
    smooth(mesh, &mut LaplacianSmoother::default(), options)
}

/// Taubin smoothing with default steps (λ = 0.5, μ = 0.52).
pub fn taubin_smooth(mesh: &mut Mesh, options: &SmoothOptions) -> Result<SmoothReport> {
    smooth(mesh, &mut TaubinSmoother::default(), options)
}

/// NullSpace smoothing with default parameters.
pub fn null_space_smooth(mesh: &mut Mesh, options: &SmoothOptions) -> Result<SmoothReport> {
    smooth(mesh, &mut NullSpaceSmoother::default(), options)
}

/// Fuzzy vector median smoothing with default parameters.
///
/// Only border nodes move, so `options.fixation` must not be
/// [`Fixation::NoMove`].
pub fn fuzzy_median_smooth(mesh: &mut Mesh, options: &SmoothOptions) -> Result<SmoothReport> {
    smooth(mesh, &mut FuzzyMedianSmoother::default(), options)
}

/// NullSpace smoothing driven by fuzzy-median normals.
pub fn composite_smooth(mesh: &mut Mesh, options: &SmoothOptions) -> Result<SmoothReport> {
    smooth(mesh, &mut CompositeSmoother::default(), options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{build_from_triangles, planar_grid};
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    fn positions(mesh: &Mesh) -> Vec<Point3<f64>> {
        mesh.node_ids().map(|n| *mesh.position(n)).collect()
    }

    /// 3×3 grid with its centre node lifted.
    fn bumped_grid() -> Mesh {
        let mut mesh = planar_grid(3, 3);
        mesh.node_mut(NodeId::new(4)).position.z = 0.3;
        mesh
    }

    #[test]
    fn test_fixation_parsing() {
        assert_eq!("none".parse::<Fixation>().unwrap(), Fixation::None);
        assert_eq!("no_move".parse::<Fixation>().unwrap(), Fixation::NoMove);
        assert_eq!("along_edge".parse::<Fixation>().unwrap(), Fixation::AlongEdge);
        assert!(matches!(
            "clamp".parse::<Fixation>(),
            Err(MeshError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_single_laplacian_step_on_unit_square() {
        let mut mesh = bumped_grid();
        let original = positions(&mesh);
        let centre = NodeId::new(4);

        let ring: Vec<NodeId> = mesh.node_neighbors(centre).collect();
        let mut mean = Vector3::zeros();
        for &m in &ring {
            mean += original[m.index()].coords;
        }
        mean /= ring.len() as f64;
        let p = original[4];
        let expected = p + (mean - p.coords) * 0.2;

        let options = SmoothOptions::default()
            .with_iterations(1)
            .with_fixation(Fixation::NoMove);
        laplacian_smooth(&mut mesh, &options).unwrap();

        assert_relative_eq!(*mesh.position(centre), expected, epsilon = 1e-12);
        assert_relative_eq!(mesh.position(centre).z, 0.24, epsilon = 1e-12);
        for n in mesh.node_ids().filter(|&n| n != centre) {
            assert_eq!(*mesh.position(n), original[n.index()]);
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let mut a = bumped_grid();
        let mut b = bumped_grid();
        let options = SmoothOptions::default().with_iterations(5);

        taubin_smooth(&mut a, &options).unwrap();
        taubin_smooth(&mut b, &options.clone().sequential()).unwrap();

        assert_eq!(positions(&a), positions(&b));
    }

    #[test]
    fn test_zero_iterations_no_change() {
        let mut mesh = bumped_grid();
        let original = positions(&mesh);

        let report = laplacian_smooth(&mut mesh, &SmoothOptions::default().with_iterations(0)).unwrap();
        assert_eq!(report.iterations, 0);
        assert_eq!(positions(&mesh), original);
    }

    #[test]
    fn test_taubin_shrinks_less_than_laplacian() {
        let mut lap = bumped_grid();
        let mut tau = bumped_grid();
        let options = SmoothOptions::default()
            .with_iterations(20)
            .with_fixation(Fixation::None);

        let original_area = lap.surface_area();
        smooth(&mut lap, &mut LaplacianSmoother::new(0.5), &options).unwrap();
        taubin_smooth(&mut tau, &options).unwrap();

        let lap_shrinkage = (original_area - lap.surface_area()) / original_area;
        let tau_shrinkage = (original_area - tau.surface_area()) / original_area;
        assert!(
            tau_shrinkage.abs() < lap_shrinkage.abs(),
            "Taubin should shrink less: Laplacian={:.2}%, Taubin={:.2}%",
            lap_shrinkage * 100.0,
            tau_shrinkage * 100.0
        );
    }

    #[test]
    fn test_along_edge_keeps_border_on_its_line() {
        // Shift a bottom-edge node along the border; sliding keeps it on y = 0.
        let mut mesh = planar_grid(4, 4);
        mesh.node_mut(NodeId::new(1)).position.x = 0.2;

        let options = SmoothOptions::default()
            .with_iterations(3)
            .with_fixation(Fixation::AlongEdge)
            .with_fix_corners(true);
        laplacian_smooth(&mut mesh, &options).unwrap();

        let moved = mesh.position(NodeId::new(1));
        assert!(moved.y.abs() < 1e-12);
        assert!(moved.z.abs() < 1e-12);
        assert!(moved.x > 0.2);

        // Square corners are pinned.
        for corner in [0, 3, 12, 15] {
            let n = NodeId::new(corner);
            assert_eq!(mesh.position(n).x.fract(), 0.0);
            assert_eq!(mesh.position(n).y.fract(), 0.0);
        }
    }

    #[test]
    fn test_along_edge_rejects_bowtie_node() {
        // Two triangles sharing only node 0: it has 4 border edges.
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(-1.0, 0.0, 0.0),
            Point3::new(-1.0, -1.0, 0.0),
        ];
        let mut mesh = build_from_triangles(&positions, &[[0, 1, 2], [0, 3, 4]]).unwrap();
        let options = SmoothOptions::default()
            .with_iterations(1)
            .with_fixation(Fixation::AlongEdge);
        let err = laplacian_smooth(&mut mesh, &options).unwrap_err();
        assert!(matches!(err, MeshError::InvalidTopology { .. }));
    }

    #[test]
    fn test_precondition_rejects_low_valence() {
        let mut mesh = bumped_grid();
        mesh.add_node(Point3::new(3.0, 3.0, 3.0));
        let err = laplacian_smooth(&mut mesh, &SmoothOptions::default()).unwrap_err();
        assert!(matches!(err, MeshError::TopologyViolation { .. }));
        assert!(err.to_string().contains("N(9)"));
    }

    #[test]
    fn test_nan_field_is_fatal() {
        let mut mesh = bumped_grid();
        mesh.face_mut(crate::mesh::FaceId::new(0)).fields.t = f64::NAN;
        let err = laplacian_smooth(&mut mesh, &SmoothOptions::default()).unwrap_err();
        assert!(matches!(err, MeshError::NumericalError { .. }));
    }

    #[test]
    fn test_invalid_options() {
        let mut mesh = bumped_grid();
        let options = SmoothOptions::default().with_corner_alpha(2.5);
        assert!(matches!(
            laplacian_smooth(&mut mesh, &options),
            Err(MeshError::InvalidParameter { name: "corner_alpha", .. })
        ));
    }

    #[test]
    fn test_tolerance_stops_early() {
        let mut mesh = bumped_grid();
        let options = SmoothOptions::default()
            .with_iterations(500)
            .with_tolerance(1e-6);
        let report = laplacian_smooth(&mut mesh, &options).unwrap();

        assert!(report.converged);
        assert!(report.iterations < 500);
        assert!(report.max_displacement < 1e-6);
    }

    #[test]
    fn test_observer_sees_every_iteration() {
        let mut mesh = bumped_grid();
        let mut heights = Vec::new();
        let options = SmoothOptions::default().with_iterations(4);

        smooth_observed(&mut mesh, &mut LaplacianSmoother::default(), &options, |iter, m| {
            heights.push((iter, m.position(NodeId::new(4)).z));
            Ok(())
        })
        .unwrap();

        assert_eq!(heights.len(), 4);
        assert!(heights.windows(2).all(|w| w[1].1 < w[0].1));

        let err = smooth_observed(&mut mesh, &mut LaplacianSmoother::default(), &options, |iter, _| {
            if iter == 1 {
                Err(MeshError::ConfigurationError("stop".into()))
            } else {
                Ok(())
            }
        })
        .unwrap_err();
        assert_eq!(err, MeshError::ConfigurationError("stop".into()));
    }

    #[test]
    fn test_progress_reports() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let progress = Progress::new(move |_, _, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let mut mesh = bumped_grid();
        let options = SmoothOptions::default().with_iterations(3);
        smooth_with_progress(&mut mesh, &mut TaubinSmoother::default(), &options, &progress).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_corner_test_orientation() {
        let mesh = planar_grid(3, 3);
        // Node 1 lies mid-way along the bottom border.
        assert!(!is_corner(&mesh, NodeId::new(1), 0.1));
        // Node 0 is a square corner.
        assert!(is_corner(&mesh, NodeId::new(0), 0.1));
        // Interior node: no border edges.
        assert!(is_corner(&mesh, NodeId::new(4), 0.1));
    }
}
