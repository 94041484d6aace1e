//! Coordinate-keyed spatial index.
//!
//! [`SpatialIndex`] is a height-balanced (AVL) binary search tree ordered
//! lexicographically by `(x, y, z)`. Components closer than
//! [`COORD_EPSILON`] compare equal, so a key is either found exactly or not
//! at all. Tree nodes live in a `Vec` arena and link to each other by index;
//! insertion, lookup and both nearest queries are iterative.
//!
//! Two nearest-neighbour queries are provided:
//!
//! - [`SpatialIndex::nearest`] follows a single root-to-leaf path, always
//!   stepping to the child whose key is closer to the query. It never
//!   backtracks, so it can miss the global nearest when the tree's splits
//!   separate the query from its true neighbour.
//! - [`SpatialIndex::nearest_exact`] walks the same tree branch-and-bound,
//!   pruning subtrees whose x-slab cannot contain a closer point. It always
//!   agrees with a linear scan.
//!
//! # Example
//!
//! ```
//! use rimemesh::spatial::SpatialIndex;
//! use nalgebra::Point3;
//!
//! let points = [
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(-1.0, 0.0, 0.0),
//! ];
//! let index = SpatialIndex::from_points(&points).unwrap();
//!
//! assert_eq!(index.find(&Point3::new(1.0, 0.0, 0.0)), Some(1));
//! assert_eq!(index.find(&Point3::new(2.0, 0.0, 0.0)), None);
//!
//! let hit = index.nearest_exact(&Point3::new(-0.9, 0.1, 0.0)).unwrap();
//! assert_eq!(hit.item, 2);
//! ```

use std::cmp::Ordering;

use nalgebra::Point3;

use crate::error::{MeshError, Result};
use crate::mesh::Mesh;

/// Coordinate components closer than this compare equal.
pub const COORD_EPSILON: f64 = 1e-17;

/// Result of a nearest-neighbour query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nearest {
    /// Payload stored with the matching key.
    pub item: usize,
    /// Euclidean distance from the query to the matching key.
    pub distance: f64,
}

#[derive(Debug, Clone)]
struct TreeNode {
    key: Point3<f64>,
    item: usize,
    left: Option<usize>,
    right: Option<usize>,
    parent: Option<usize>,
    height: i32,
}

/// Compare two keys lexicographically, treating near-equal components as equal.
fn compare_keys(a: &Point3<f64>, b: &Point3<f64>) -> Ordering {
    for i in 0..3 {
        if (a[i] - b[i]).abs() > COORD_EPSILON {
            return if a[i] < b[i] {
                Ordering::Less
            } else {
                Ordering::Greater
            };
        }
    }
    Ordering::Equal
}

/// An AVL tree over 3D coordinates with a `usize` payload per key.
#[derive(Debug, Clone, Default)]
pub struct SpatialIndex {
    nodes: Vec<TreeNode>,
    root: Option<usize>,
}

impl SpatialIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty index with room for `capacity` keys.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            root: None,
        }
    }

    /// Index `points`, using each point's position in the slice as payload.
    ///
    /// # Errors
    ///
    /// [`MeshError::DuplicateKey`] if two points coincide.
    pub fn from_points(points: &[Point3<f64>]) -> Result<Self> {
        let mut index = Self::with_capacity(points.len());
        for (i, &p) in points.iter().enumerate() {
            index.insert(p, i)?;
        }
        log::debug!(
            "Spatial index: {} keys, height {}",
            index.len(),
            index.height()
        );
        Ok(index)
    }

    /// Index every node position of `mesh`; payloads are node indices.
    pub fn from_mesh_nodes(mesh: &Mesh) -> Result<Self> {
        let points: Vec<Point3<f64>> = mesh.node_ids().map(|n| *mesh.position(n)).collect();
        Self::from_points(&points)
    }

    /// Index every face centroid of `mesh`; payloads are face indices.
    pub fn from_face_centroids(mesh: &Mesh) -> Result<Self> {
        let points: Vec<Point3<f64>> = mesh.face_ids().map(|f| mesh.face_centroid(f)).collect();
        Self::from_points(&points)
    }

    /// Index `points` like [`from_points`](Self::from_points), but keep the
    /// first payload of coincident points and skip the later ones.
    pub fn from_points_dedup(points: &[Point3<f64>]) -> Self {
        let mut index = Self::with_capacity(points.len());
        let mut skipped = 0usize;
        for (i, &p) in points.iter().enumerate() {
            if !index.insert_if_absent(p, i) {
                skipped += 1;
            }
        }
        if skipped > 0 {
            log::warn!("Spatial index: skipped {} coincident keys", skipped);
        }
        log::debug!(
            "Spatial index: {} keys, height {}",
            index.len(),
            index.height()
        );
        index
    }

    /// [`from_mesh_nodes`](Self::from_mesh_nodes) keeping the lowest node
    /// index of coincident nodes.
    pub fn from_mesh_nodes_dedup(mesh: &Mesh) -> Self {
        let points: Vec<Point3<f64>> = mesh.node_ids().map(|n| *mesh.position(n)).collect();
        Self::from_points_dedup(&points)
    }

    /// [`from_face_centroids`](Self::from_face_centroids) keeping the lowest
    /// face index of coincident centroids.
    pub fn from_face_centroids_dedup(mesh: &Mesh) -> Self {
        let points: Vec<Point3<f64>> = mesh.face_ids().map(|f| mesh.face_centroid(f)).collect();
        Self::from_points_dedup(&points)
    }

    /// Number of keys stored.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the index holds no keys.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Height of the tree (0 when empty, 1 for a single key).
    pub fn height(&self) -> i32 {
        self.height_of(self.root)
    }

    #[inline]
    fn height_of(&self, node: Option<usize>) -> i32 {
        node.map_or(0, |n| self.nodes[n].height)
    }

    #[inline]
    fn balance(&self, n: usize) -> i32 {
        self.height_of(self.nodes[n].left) - self.height_of(self.nodes[n].right)
    }

    #[inline]
    fn update_height(&mut self, n: usize) {
        let h = self
            .height_of(self.nodes[n].left)
            .max(self.height_of(self.nodes[n].right));
        self.nodes[n].height = h + 1;
    }

    /// Insert `key` with payload `item`.
    ///
    /// # Errors
    ///
    /// [`MeshError::DuplicateKey`] if an equal key is already stored. The
    /// index is left unchanged.
    pub fn insert(&mut self, key: Point3<f64>, item: usize) -> Result<()> {
        let new = self.nodes.len();
        let leaf = TreeNode {
            key,
            item,
            left: None,
            right: None,
            parent: None,
            height: 1,
        };

        let Some(mut cur) = self.root else {
            self.nodes.push(leaf);
            self.root = Some(new);
            return Ok(());
        };

        loop {
            let next = match compare_keys(&key, &self.nodes[cur].key) {
                Ordering::Less => &mut self.nodes[cur].left,
                Ordering::Greater => &mut self.nodes[cur].right,
                Ordering::Equal => {
                    return Err(MeshError::DuplicateKey {
                        x: key.x,
                        y: key.y,
                        z: key.z,
                    })
                }
            };
            match *next {
                Some(child) => cur = child,
                None => {
                    *next = Some(new);
                    break;
                }
            }
        }

        self.nodes.push(TreeNode {
            parent: Some(cur),
            ..leaf
        });

        // Retrace towards the root, fixing heights and rotating as needed.
        let mut node = Some(cur);
        while let Some(n) = node {
            self.update_height(n);
            let top = self.rebalance(n);
            node = self.nodes[top].parent;
        }

        Ok(())
    }

    /// Insert `key` unless an equal key is already stored.
    ///
    /// Returns `false`, leaving the stored payload in place, when the key
    /// was present.
    pub fn insert_if_absent(&mut self, key: Point3<f64>, item: usize) -> bool {
        if self.find(&key).is_some() {
            return false;
        }
        self.insert(key, item).is_ok()
    }

    /// Restore the AVL bound at `n`; returns the root of the rebalanced subtree.
    fn rebalance(&mut self, n: usize) -> usize {
        let balance = self.balance(n);
        if balance > 1 {
            if let Some(left) = self.nodes[n].left {
                if self.balance(left) < 0 {
                    self.rotate_left(left);
                }
            }
            self.rotate_right(n)
        } else if balance < -1 {
            if let Some(right) = self.nodes[n].right {
                if self.balance(right) > 0 {
                    self.rotate_right(right);
                }
            }
            self.rotate_left(n)
        } else {
            n
        }
    }

    /// Replace `old` with `new` in `parent`'s child slot (or at the root).
    fn replace_child(&mut self, parent: Option<usize>, old: usize, new: usize) {
        match parent {
            Some(p) if self.nodes[p].left == Some(old) => self.nodes[p].left = Some(new),
            Some(p) => self.nodes[p].right = Some(new),
            None => self.root = Some(new),
        }
    }

    fn rotate_right(&mut self, root: usize) -> usize {
        let Some(pivot) = self.nodes[root].left else {
            return root;
        };
        let moved = self.nodes[pivot].right;
        let parent = self.nodes[root].parent;

        self.nodes[pivot].right = Some(root);
        self.nodes[pivot].parent = parent;
        self.nodes[root].parent = Some(pivot);
        self.nodes[root].left = moved;
        if let Some(m) = moved {
            self.nodes[m].parent = Some(root);
        }
        self.replace_child(parent, root, pivot);

        self.update_height(root);
        self.update_height(pivot);
        pivot
    }

    fn rotate_left(&mut self, root: usize) -> usize {
        let Some(pivot) = self.nodes[root].right else {
            return root;
        };
        let moved = self.nodes[pivot].left;
        let parent = self.nodes[root].parent;

        self.nodes[pivot].left = Some(root);
        self.nodes[pivot].parent = parent;
        self.nodes[root].parent = Some(pivot);
        self.nodes[root].right = moved;
        if let Some(m) = moved {
            self.nodes[m].parent = Some(root);
        }
        self.replace_child(parent, root, pivot);

        self.update_height(root);
        self.update_height(pivot);
        pivot
    }

    /// Look up the payload stored under a key equal to `key`.
    pub fn find(&self, key: &Point3<f64>) -> Option<usize> {
        let mut cur = self.root;
        while let Some(n) = cur {
            let node = &self.nodes[n];
            cur = match compare_keys(key, &node.key) {
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
                Ordering::Equal => return Some(node.item),
            };
        }
        None
    }

    /// Approximate nearest neighbour by a single greedy descent.
    ///
    /// A stored key equal to `query` is always returned as an exact hit.
    ///
    /// Returns `None` only when the index is empty.
    pub fn nearest(&self, query: &Point3<f64>) -> Option<Nearest> {
        let root = self.root?;
        if let Some(item) = self.find(query) {
            return Some(Nearest {
                item,
                distance: 0.0,
            });
        }

        let mut best = Nearest {
            item: self.nodes[root].item,
            distance: (self.nodes[root].key - query).norm(),
        };

        let mut cur = root;
        loop {
            let node = &self.nodes[cur];
            let d = (node.key - query).norm();
            if d < best.distance {
                best = Nearest {
                    item: node.item,
                    distance: d,
                };
            }
            if d <= COORD_EPSILON {
                return Some(best);
            }

            cur = match (node.left, node.right) {
                (Some(l), Some(r)) => {
                    let dl = (self.nodes[l].key - query).norm();
                    let dr = (self.nodes[r].key - query).norm();
                    if dl <= dr {
                        l
                    } else {
                        r
                    }
                }
                (Some(l), None) => l,
                (None, Some(r)) => r,
                (None, None) => return Some(best),
            };
        }
    }

    /// Exact nearest neighbour by branch-and-bound over the x ordering.
    ///
    /// Returns `None` only when the index is empty.
    pub fn nearest_exact(&self, query: &Point3<f64>) -> Option<Nearest> {
        let root = self.root?;
        let mut best = Nearest {
            item: self.nodes[root].item,
            distance: f64::INFINITY,
        };

        // (node, lower bound on the distance to anything in its subtree)
        let mut stack = vec![(root, 0.0_f64)];
        while let Some((n, bound)) = stack.pop() {
            if bound >= best.distance {
                continue;
            }
            let node = &self.nodes[n];
            let d = (node.key - query).norm();
            if d < best.distance {
                best = Nearest {
                    item: node.item,
                    distance: d,
                };
            }

            let dx = query.x - node.key.x;
            let (near, far) = if dx > 0.0 {
                (node.right, node.left)
            } else {
                (node.left, node.right)
            };
            if let Some(f) = far {
                let far_bound = bound.max(dx.abs() - COORD_EPSILON);
                if far_bound < best.distance {
                    stack.push((f, far_bound));
                }
            }
            if let Some(c) = near {
                stack.push((c, bound));
            }
        }

        Some(best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn brute_force(points: &[Point3<f64>], query: &Point3<f64>) -> f64 {
        points
            .iter()
            .map(|p| (p - query).norm())
            .fold(f64::INFINITY, f64::min)
    }

    fn five_nodes() -> SpatialIndex {
        let points = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(-1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(1.0, -1.0, 0.0),
        ];
        SpatialIndex::from_points(&points).unwrap()
    }

    #[test]
    fn test_empty() {
        let index = SpatialIndex::new();
        assert!(index.is_empty());
        assert_eq!(index.height(), 0);
        assert_eq!(index.find(&Point3::origin()), None);
        assert!(index.nearest(&Point3::origin()).is_none());
        assert!(index.nearest_exact(&Point3::origin()).is_none());
    }

    #[test]
    fn test_find_and_nearest() {
        let index = five_nodes();
        assert_eq!(index.len(), 5);
        assert_eq!(index.height(), 3);

        assert_eq!(index.find(&Point3::new(1.0, -1.0, 0.0)), Some(4));
        assert_eq!(index.find(&Point3::new(1.0, -1.0, 1.0)), None);

        // Searching for a stored key is an exact hit.
        let hit = index.nearest(&Point3::new(1.0, -1.0, 0.0)).unwrap();
        assert_eq!(hit.item, 4);
        assert_eq!(hit.distance, 0.0);

        let hit = index.nearest(&Point3::new(1.0, -1.0, 1.0)).unwrap();
        assert_eq!(hit.item, 4);
        assert!((hit.distance - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_duplicate_key_is_rejected() {
        let mut index = five_nodes();
        let err = index.insert(Point3::new(1.0, 1.0, 0.0), 99).unwrap_err();
        assert_eq!(
            err,
            MeshError::DuplicateKey {
                x: 1.0,
                y: 1.0,
                z: 0.0
            }
        );
        assert_eq!(index.len(), 5);
        assert_eq!(index.find(&Point3::new(1.0, 1.0, 0.0)), Some(3));
    }

    #[test]
    fn test_dedup_keeps_first_payload() {
        let points = [
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ];
        assert!(SpatialIndex::from_points(&points).is_err());

        let mut index = SpatialIndex::from_points_dedup(&points);
        assert_eq!(index.len(), 3);
        assert_eq!(index.find(&Point3::new(1.0, 0.0, 0.0)), Some(0));
        assert_eq!(index.nearest(&Point3::new(1.1, 0.0, 0.0)).unwrap().item, 0);

        assert!(!index.insert_if_absent(Point3::new(2.0, 0.0, 0.0), 7));
        assert!(index.insert_if_absent(Point3::new(3.0, 0.0, 0.0), 7));
        assert_eq!(index.find(&Point3::new(2.0, 0.0, 0.0)), Some(3));
        assert_eq!(index.len(), 4);
    }

    #[test]
    fn test_sorted_insert_stays_balanced() {
        let mut index = SpatialIndex::new();
        for i in 0..1023 {
            index.insert(Point3::new(i as f64, 0.0, 0.0), i).unwrap();
        }
        assert_eq!(index.height(), 10);

        for i in (0..1023).step_by(97) {
            assert_eq!(index.find(&Point3::new(i as f64, 0.0, 0.0)), Some(i));
        }
    }

    #[test]
    fn test_nearest_on_grid() {
        let mut points = Vec::new();
        for i in 0..5 {
            for j in 0..5 {
                points.push(Point3::new(i as f64, j as f64, 0.0));
            }
        }
        let index = SpatialIndex::from_points(&points).unwrap();

        for (k, p) in points.iter().enumerate() {
            assert_eq!(index.nearest(p).unwrap().item, k);

            // Off-grid: the exact query finds the node, the greedy one is never better.
            let q = p + nalgebra::Vector3::new(0.01, -0.02, 0.05);
            let exact = index.nearest_exact(&q).unwrap();
            assert_eq!(exact.item, k);
            assert!(index.nearest(&q).unwrap().distance >= exact.distance);
        }
    }

    #[test]
    fn test_nearest_agrees_with_exact_on_small_set() {
        let index = five_nodes();
        for (q, expected) in [
            (Point3::new(-1.2, 0.1, 0.0), 2),
            (Point3::new(0.1, 0.0, 0.0), 0),
            (Point3::new(1.1, 1.2, 0.0), 3),
            (Point3::new(0.9, 0.1, 0.0), 1),
        ] {
            assert_eq!(index.nearest(&q).unwrap().item, expected);
            assert_eq!(index.nearest_exact(&q).unwrap().item, expected);
        }
    }

    proptest! {
        #[test]
        fn prop_inserted_keys_are_found(
            raw in proptest::collection::btree_set((-50i32..50, -50i32..50, -50i32..50), 1..200)
        ) {
            let points: Vec<Point3<f64>> = raw
                .iter()
                .map(|&(x, y, z)| Point3::new(x as f64, y as f64, z as f64))
                .collect();
            let index = SpatialIndex::from_points(&points).unwrap();

            for (i, p) in points.iter().enumerate() {
                prop_assert_eq!(index.find(p), Some(i));
            }
            // Half-integer coordinates were never inserted.
            prop_assert_eq!(index.find(&Point3::new(0.5, 0.0, 0.0)), None);

            let max_height = (1.45 * ((points.len() + 2) as f64).log2()).ceil() as i32;
            prop_assert!(index.height() <= max_height);
        }

        #[test]
        fn prop_exact_nearest_matches_brute_force(
            raw in proptest::collection::btree_set((-20i32..20, -20i32..20, -20i32..20), 1..100),
            qx in -25.0f64..25.0,
            qy in -25.0f64..25.0,
            qz in -25.0f64..25.0,
        ) {
            let points: Vec<Point3<f64>> = raw
                .iter()
                .map(|&(x, y, z)| Point3::new(x as f64, y as f64, z as f64))
                .collect();
            let index = SpatialIndex::from_points(&points).unwrap();
            let query = Point3::new(qx, qy, qz);

            let hit = index.nearest_exact(&query).unwrap();
            let expected = brute_force(&points, &query);
            prop_assert!((hit.distance - expected).abs() <= 1e-12 * expected.max(1.0));
            prop_assert!(((points[hit.item] - query).norm() - hit.distance).abs() < 1e-12);
        }

        #[test]
        fn prop_nearest_matches_brute_force_on_tiny_sets(
            raw in proptest::collection::btree_set((-20i32..20, -20i32..20, -20i32..20), 1..=3),
            qx in -25.0f64..25.0,
            qy in -25.0f64..25.0,
            qz in -25.0f64..25.0,
        ) {
            // Up to three keys form a tree of height two, whose descent
            // weighs every key.
            let points: Vec<Point3<f64>> = raw
                .iter()
                .map(|&(x, y, z)| Point3::new(x as f64, y as f64, z as f64))
                .collect();
            let index = SpatialIndex::from_points(&points).unwrap();
            prop_assert!(index.height() <= 2);
            let query = Point3::new(qx, qy, qz);

            let hit = index.nearest(&query).unwrap();
            let expected = brute_force(&points, &query);
            prop_assert!((hit.distance - expected).abs() <= 1e-12 * expected.max(1.0));
        }

        #[test]
        fn prop_nearest_on_shuffled_grid(
            order in Just((0..16usize).collect::<Vec<_>>()).prop_shuffle(),
            qx in -0.5f64..3.5,
            qy in -0.5f64..3.5,
        ) {
            let points: Vec<Point3<f64>> = order
                .iter()
                .map(|&k| Point3::new((k % 4) as f64, (k / 4) as f64, 0.0))
                .collect();
            let index = SpatialIndex::from_points(&points).unwrap();

            // Grid nodes are found exactly, whatever the insertion order.
            for (i, p) in points.iter().enumerate() {
                let hit = index.nearest(p).unwrap();
                prop_assert_eq!(hit.item, i);
                prop_assert_eq!(hit.distance, 0.0);
            }

            // Off-grid, the descent reports a real key and never beats a scan.
            let query = Point3::new(qx, qy, 0.0);
            let hit = index.nearest(&query).unwrap();
            prop_assert!(((points[hit.item] - query).norm() - hit.distance).abs() < 1e-12);
            prop_assert!(hit.distance >= brute_force(&points, &query) - 1e-12);
        }
    }
}
