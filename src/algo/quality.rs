//! Mesh diagnostics: connectivity, triangle quality and the Euler relation.

use crate::error::{MeshError, Result};
use crate::mesh::{FaceId, Mesh, NodeId};

/// Label connected components and return their number.
///
/// Components are found by depth-first search over edges. Every node's
/// [`component`](crate::mesh::Node::component) is set to its 1-based tag;
/// isolated nodes get a component of their own.
pub fn connected_components(mesh: &mut Mesh) -> usize {
    for n in mesh.node_ids().collect::<Vec<_>>() {
        mesh.node_mut(n).component = None;
    }

    let mut count = 0;
    let mut stack = Vec::new();
    for seed in 0..mesh.num_nodes() {
        let seed = NodeId::new(seed);
        if mesh.node(seed).component.is_some() {
            continue;
        }

        count += 1;
        mesh.node_mut(seed).component = Some(count);
        stack.push(seed);
        while let Some(n) = stack.pop() {
            let neighbors: Vec<NodeId> = mesh.node_neighbors(n).collect();
            for m in neighbors {
                let node = mesh.node_mut(m);
                if node.component.is_none() {
                    node.component = Some(count);
                    stack.push(m);
                }
            }
        }
    }

    log::debug!("{} connected components over {} nodes", count, mesh.num_nodes());
    count
}

/// Triangle quality summary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityStats {
    /// Geometric mean of the per-face quality.
    pub mean: f64,
    /// Worst per-face quality.
    pub min: f64,
    /// Faces skipped because they have zero area.
    pub degenerate: usize,
}

/// Quality of a single face: `4√3·A / (l₁² + l₂² + l₃²)`.
///
/// Equilateral triangles score 1, slivers approach 0. Returns `None` for
/// zero-area faces.
pub fn face_quality(mesh: &Mesh, f: FaceId) -> Option<f64> {
    let [a, b, c] = mesh.face_positions(f);
    let sum_sq = (b - a).norm_squared() + (c - b).norm_squared() + (a - c).norm_squared();
    let area = mesh.face_area(f);
    if !(area > 0.0) || !(sum_sq > 0.0) {
        return None;
    }
    Some(4.0 * 3.0_f64.sqrt() * area / sum_sq)
}

/// Alpha quality over all faces.
///
/// Zero-area faces are skipped with a warning and counted in
/// [`QualityStats::degenerate`]. A mesh without any measurable face reports
/// a mean and minimum of 0.
pub fn alpha_quality(mesh: &Mesh) -> QualityStats {
    let mut log_sum = 0.0;
    let mut min = f64::INFINITY;
    let mut measured = 0usize;
    let mut degenerate = 0usize;

    for f in mesh.face_ids() {
        match face_quality(mesh, f) {
            Some(q) => {
                log_sum += q.ln();
                min = min.min(q);
                measured += 1;
            }
            None => {
                log::warn!("skipping degenerate face {:?} in quality statistics", f);
                degenerate += 1;
            }
        }
    }

    if measured == 0 {
        return QualityStats {
            mean: 0.0,
            min: 0.0,
            degenerate,
        };
    }
    QualityStats {
        mean: (log_sum / measured as f64).exp(),
        min,
        degenerate,
    }
}

/// Check the Euler relation of a single disc-like patch.
///
/// With N nodes of which B are fixed (on the border), a triangulated disc
/// has `3N − B − 3` edges and `2N − B − 2` faces.
///
/// # Errors
///
/// Returns [`MeshError::TopologyViolation`] naming the mesh counts when
/// either relation fails.
pub fn check_euler(mesh: &Mesh) -> Result<()> {
    let n = mesh.num_nodes() as i64;
    let b = mesh.nodes().filter(|(_, node)| node.is_fixed()).count() as i64;
    let e = mesh.num_edges() as i64;
    let f = mesh.num_faces() as i64;

    let expected_edges = 3 * n - b - 3;
    let expected_faces = 2 * n - b - 2;
    if e != expected_edges || f != expected_faces {
        return Err(MeshError::TopologyViolation {
            element: "mesh".to_string(),
            details: format!(
                "N = {}, B = {}: expected {} edges and {} faces, found {} and {}",
                n, b, expected_edges, expected_faces, e, f
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{build_from_triangles, build_from_zones, planar_grid, ZoneData};
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    #[test]
    fn test_euler_on_grids() {
        for (nx, ny) in [(2, 2), (3, 3), (4, 7), (10, 5)] {
            let mesh = planar_grid(nx, ny);
            check_euler(&mesh).unwrap();
        }
    }

    #[test]
    fn test_euler_fails_on_closed_surface() {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(0.5, 0.5, 1.0),
        ];
        let tetra = [[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]];
        let mesh = build_from_triangles(&positions, &tetra).unwrap();

        let err = check_euler(&mesh).unwrap_err();
        assert!(matches!(err, MeshError::TopologyViolation { .. }));
        assert!(err.to_string().contains("N = 4, B = 0"));
    }

    #[test]
    fn test_components() {
        let mut mesh = planar_grid(3, 3);
        assert_eq!(connected_components(&mut mesh), 1);
        assert!(mesh.nodes().all(|(_, n)| n.component == Some(1)));

        let far = |dx: f64| {
            vec![
                Point3::new(dx, 0.0, 0.0),
                Point3::new(dx + 1.0, 0.0, 0.0),
                Point3::new(dx, 1.0, 0.0),
            ]
        };
        let zones = [
            ZoneData::new("a", far(0.0), vec![[0, 1, 2]]),
            ZoneData::new("b", far(5.0), vec![[0, 1, 2]]),
        ];
        let mut mesh = build_from_zones(&zones).unwrap();
        assert_eq!(connected_components(&mut mesh), 2);
        assert_eq!(mesh.node(NodeId::new(0)).component, Some(1));
        assert_eq!(mesh.node(NodeId::new(5)).component, Some(2));
    }

    #[test]
    fn test_quality_of_equilateral_triangle() {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 3.0_f64.sqrt() / 2.0, 0.0),
        ];
        let mesh = build_from_triangles(&positions, &[[0, 1, 2]]).unwrap();
        let stats = alpha_quality(&mesh);
        assert_relative_eq!(stats.mean, 1.0, epsilon = 1e-12);
        assert_relative_eq!(stats.min, 1.0, epsilon = 1e-12);
        assert_eq!(stats.degenerate, 0);
    }

    #[test]
    fn test_quality_of_right_triangles() {
        // Right isosceles: A = 1/2·h², Σl² = 4h², q = √3/2.
        let mesh = planar_grid(4, 4);
        let stats = alpha_quality(&mesh);
        assert_relative_eq!(stats.mean, 3.0_f64.sqrt() / 2.0, epsilon = 1e-12);
        assert_relative_eq!(stats.min, stats.mean, epsilon = 1e-12);
    }

    #[test]
    fn test_quality_skips_collapsed_face() {
        let mut mesh = planar_grid(3, 3);
        // Move the centre node onto node 0.
        mesh.set_position(NodeId::new(4), Point3::new(0.0, 0.0, 0.0));
        let f = mesh.node(NodeId::new(0)).faces()[0];
        assert!(face_quality(&mesh, f).is_none());

        let stats = alpha_quality(&mesh);
        assert!(stats.degenerate >= 1);
        assert!(stats.min > 0.0);
    }
}
