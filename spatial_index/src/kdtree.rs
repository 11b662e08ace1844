//! A 2-D K-D tree over points, bulk-built by median split or grown by
//! incremental insertion, with branch-and-bound nearest-neighbor and range
//! queries under a pluggable `TopologyCalculator`.

use geo_kernel::{Point, TopologyCalculator};

use crate::errors::{IndexError, IndexResult};

#[derive(Debug, Clone)]
struct KdNode {
    point: Point,
    axis: usize,
    left: Option<usize>,
    right: Option<usize>,
}

/// A K-D tree over 2-D points. Splits alternate between the x-axis and the
/// y-axis by depth.
#[derive(Debug, Clone, Default)]
pub struct KdTree {
    nodes: Vec<KdNode>,
    root: Option<usize>,
}

impl KdTree {
    pub fn new() -> Self {
        KdTree {
            nodes: Vec::new(),
            root: None,
        }
    }

    /// Bulk-builds a balanced tree from `points` by recursively splitting
    /// on the median of the current axis. Returns `InvalidArgument` for an
    /// empty input.
    pub fn build(points: Vec<Point>) -> IndexResult<Self> {
        if points.is_empty() {
            return Err(IndexError::InvalidArgument(
                "cannot bulk-build a K-D tree from an empty point set".to_string(),
            ));
        }
        let mut tree = KdTree::new();
        let mut items = points;
        tree.root = Some(tree.build_range(&mut items, 0));
        Ok(tree)
    }

    fn build_range(&mut self, items: &mut [Point], depth: usize) -> usize {
        let axis = depth % 2;
        items.sort_by(|a, b| a.component(axis).partial_cmp(&b.component(axis)).unwrap());
        let mid = items.len() / 2;
        let point = items[mid];

        let left = if mid > 0 {
            Some(self.build_range(&mut items[..mid], depth + 1))
        } else {
            None
        };
        let right = if mid + 1 < items.len() {
            Some(self.build_range(&mut items[mid + 1..], depth + 1))
        } else {
            None
        };

        self.nodes.push(KdNode {
            point,
            axis,
            left,
            right,
        });
        self.nodes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Inserts `point`. Returns `false` without mutating the tree if a
    /// point with identical coordinates is already present.
    pub fn insert(&mut self, point: Point) -> bool {
        let root = match self.root {
            None => {
                self.nodes.push(KdNode {
                    point,
                    axis: 0,
                    left: None,
                    right: None,
                });
                self.root = Some(0);
                return true;
            }
            Some(r) => r,
        };
        let mut current = root;
        loop {
            if self.nodes[current].point == point {
                return false;
            }
            let axis = self.nodes[current].axis;
            let go_left = point.component(axis) < self.nodes[current].point.component(axis);
            let next = if go_left {
                self.nodes[current].left
            } else {
                self.nodes[current].right
            };
            match next {
                Some(child) => current = child,
                None => {
                    let child_axis = (axis + 1) % 2;
                    self.nodes.push(KdNode {
                        point,
                        axis: child_axis,
                        left: None,
                        right: None,
                    });
                    let new_index = self.nodes.len() - 1;
                    if go_left {
                        self.nodes[current].left = Some(new_index);
                    } else {
                        self.nodes[current].right = Some(new_index);
                    }
                    return true;
                }
            }
        }
    }

    pub fn contains(&self, point: Point) -> bool {
        let mut current = self.root;
        while let Some(idx) = current {
            let node = &self.nodes[idx];
            if node.point == point {
                return true;
            }
            current = if point.component(node.axis) < node.point.component(node.axis) {
                node.left
            } else {
                node.right
            };
        }
        false
    }

    /// Every stored point inside the closed rectangle
    /// `[range_min.x, range_max.x] x [range_min.y, range_max.y]`.
    pub fn range(&self, range_min: Point, range_max: Point) -> Vec<Point> {
        let mut out = Vec::new();
        if let Some(root) = self.root {
            let mut stack = vec![root];
            while let Some(idx) = stack.pop() {
                let node = &self.nodes[idx];
                if node.point.x >= range_min.x
                    && node.point.x <= range_max.x
                    && node.point.y >= range_min.y
                    && node.point.y <= range_max.y
                {
                    out.push(node.point);
                }
                let axis = node.axis;
                let (range_lo, range_hi, split) = if axis == 0 {
                    (range_min.x, range_max.x, node.point.x)
                } else {
                    (range_min.y, range_max.y, node.point.y)
                };
                if let Some(left) = node.left {
                    if range_lo <= split {
                        stack.push(left);
                    }
                }
                if let Some(right) = node.right {
                    if range_hi >= split {
                        stack.push(right);
                    }
                }
            }
        }
        out
    }

    /// Nearest stored point to `probe` under `calc`, or `None` if the tree
    /// is empty. Descends to the probe's owning leaf, then unwinds,
    /// pruning siblings whose splitting plane is already farther than the
    /// current best.
    pub fn nearest_neighbor<C: TopologyCalculator + ?Sized>(
        &self,
        calc: &C,
        probe: Point,
    ) -> Option<Point> {
        let root = self.root?;
        let mut best_point = self.nodes[root].point;
        let mut best_distance = calc.distance(probe, best_point);
        self.nearest_recursive(calc, root, probe, &mut best_point, &mut best_distance);
        Some(best_point)
    }

    fn nearest_recursive<C: TopologyCalculator + ?Sized>(
        &self,
        calc: &C,
        node_index: usize,
        probe: Point,
        best_point: &mut Point,
        best_distance: &mut f64,
    ) {
        let node = &self.nodes[node_index];
        let distance = calc.distance(probe, node.point);
        if distance < *best_distance {
            *best_distance = distance;
            *best_point = node.point;
        }

        let axis = node.axis;
        let probe_component = probe.component(axis);
        let split_component = node.point.component(axis);
        let (near, far) = if probe_component < split_component {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        if let Some(near_index) = near {
            self.nearest_recursive(calc, near_index, probe, best_point, best_distance);
        }

        let plane_point = if axis == 0 {
            Point::new(split_component, probe.y)
        } else {
            Point::new(probe.x, split_component)
        };
        let plane_distance = calc.distance(probe, plane_point);
        if plane_distance < *best_distance {
            if let Some(far_index) = far {
                self.nearest_recursive(calc, far_index, probe, best_point, best_distance);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_kernel::EuclideanTopology;

    fn sample_points() -> Vec<Point> {
        vec![
            Point::new(6.0, 4.0),
            Point::new(5.0, 2.0),
            Point::new(8.0, 6.0),
            Point::new(2.0, 1.0),
            Point::new(4.0, 7.0),
            Point::new(9.0, 3.0),
            Point::new(2.0, 8.0),
        ]
    }

    #[test]
    fn build_rejects_empty_input() {
        assert!(KdTree::build(Vec::new()).is_err());
    }

    #[test]
    fn insert_rejects_duplicate_coordinates() {
        let mut tree = KdTree::build(sample_points()).unwrap();
        assert!(!tree.insert(Point::new(6.0, 4.0)));
    }

    #[test]
    fn contains_finds_exact_match_only() {
        let tree = KdTree::build(sample_points()).unwrap();
        assert!(tree.contains(Point::new(8.0, 6.0)));
        assert!(!tree.contains(Point::new(8.0, 6.1)));
    }

    #[test]
    fn nearest_neighbor_matches_known_case() {
        let tree = KdTree::build(sample_points()).unwrap();
        let calc = EuclideanTopology;
        let found = tree.nearest_neighbor(&calc, Point::new(9.0, 8.0)).unwrap();
        assert_eq!(found, Point::new(8.0, 6.0));
    }

    #[test]
    fn range_query_collects_interior_points() {
        let tree = KdTree::build(sample_points()).unwrap();
        let hits = tree.range(Point::new(0.0, 0.0), Point::new(6.0, 5.0));
        let mut hits = hits;
        hits.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap());
        assert_eq!(hits, vec![Point::new(2.0, 1.0), Point::new(5.0, 2.0), Point::new(6.0, 4.0)]);
    }

    #[test]
    fn range_query_matches_known_case() {
        let tree = KdTree::build(sample_points()).unwrap();
        let mut hits = tree.range(Point::new(1.0, 5.0), Point::new(5.0, 9.0));
        hits.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap());
        assert_eq!(hits, vec![Point::new(2.0, 8.0), Point::new(4.0, 7.0)]);
    }
}
