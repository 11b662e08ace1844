//! A point-region quadtree over axis-aligned regions, with a capacity per
//! node and an optional depth cap. Nodes live in a flat arena; traversal is
//! iterative everywhere, never recursive, so a pathological straight-line
//! chain of splits cannot blow the call stack.

use geo_kernel::{BitCode, Quadrant, Region};
use log::debug;

use crate::errors::{IndexError, IndexResult};

/// Tuning knobs for a `RegionQuadTree`.
#[derive(Debug, Clone, Copy)]
pub struct QuadTreeOptions {
    pub max_regions_per_node: usize,
    pub max_levels: Option<u32>,
}

impl Default for QuadTreeOptions {
    fn default() -> Self {
        QuadTreeOptions {
            max_regions_per_node: 10,
            max_levels: None,
        }
    }
}

impl QuadTreeOptions {
    fn validate(&self) -> IndexResult<()> {
        if self.max_regions_per_node < 1 {
            return Err(IndexError::InvalidArgument(
                "max_regions_per_node must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Quadrant(Quadrant),
    Straddling,
}

/// A region whose low-side bound touches the midline belongs to the
/// half-open side; see the module-level note on this in `region_quadtree`
/// tests below for the worked example.
fn child_index(bounds: &Region, r: &Region) -> Slot {
    let mid_x = (bounds.min_x() + bounds.max_x()) / 2.0;
    let mid_y = (bounds.min_y() + bounds.max_y()) / 2.0;

    let x_high = if r.max_x() < mid_x {
        Some(false)
    } else if r.min_x() >= mid_x {
        Some(true)
    } else {
        None
    };
    let y_high = if r.max_y() < mid_y {
        Some(false)
    } else if r.min_y() >= mid_y {
        Some(true)
    } else {
        None
    };

    match (x_high, y_high) {
        (Some(false), Some(true)) => Slot::Quadrant(Quadrant::NorthWest),
        (Some(true), Some(true)) => Slot::Quadrant(Quadrant::NorthEast),
        (Some(false), Some(false)) => Slot::Quadrant(Quadrant::SouthWest),
        (Some(true), Some(false)) => Slot::Quadrant(Quadrant::SouthEast),
        _ => Slot::Straddling,
    }
}

fn quadrant_bounds(bounds: &Region, q: Quadrant) -> Region {
    let mid_x = (bounds.min_x() + bounds.max_x()) / 2.0;
    let mid_y = (bounds.min_y() + bounds.max_y()) / 2.0;
    let (min_x, max_x) = match q {
        Quadrant::NorthWest | Quadrant::SouthWest => (bounds.min_x(), mid_x),
        Quadrant::NorthEast | Quadrant::SouthEast => (mid_x, bounds.max_x()),
    };
    let (min_y, max_y) = match q {
        Quadrant::NorthWest | Quadrant::NorthEast => (mid_y, bounds.max_y()),
        Quadrant::SouthWest | Quadrant::SouthEast => (bounds.min_y(), mid_y),
    };
    Region::of_min_max(min_x, min_y, max_x, max_y).expect("quadrant split preserves monotone bounds")
}

#[derive(Debug, Clone)]
struct QuadNode {
    bounds: Region,
    depth: u32,
    regions: Vec<Region>,
    children: Option<[usize; 4]>,
}

impl QuadNode {
    fn leaf(bounds: Region, depth: u32) -> Self {
        QuadNode {
            bounds,
            depth,
            regions: Vec::new(),
            children: None,
        }
    }
}

/// A region quadtree: `insert`/`delete`/`query` of axis-aligned regions
/// within a fixed outer extent.
#[derive(Debug, Clone)]
pub struct RegionQuadTree {
    nodes: Vec<QuadNode>,
    options: QuadTreeOptions,
}

impl RegionQuadTree {
    pub fn new(extent: Region, options: QuadTreeOptions) -> IndexResult<Self> {
        options.validate()?;
        Ok(RegionQuadTree {
            nodes: vec![QuadNode::leaf(extent, 0)],
            options,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.iter().all(|n| n.regions.is_empty())
    }

    fn can_split(&self, node_index: usize) -> bool {
        match self.options.max_levels {
            None => true,
            Some(max) => self.nodes[node_index].depth < max,
        }
    }

    /// Creates four child leaves under `node_index` and pushes down any
    /// currently stored region that fits a single child quadrant exactly;
    /// straddling regions stay put.
    fn split(&mut self, node_index: usize) {
        let bounds = self.nodes[node_index].bounds;
        let depth = self.nodes[node_index].depth + 1;
        let mut child_indices = [0usize; 4];
        for (slot, q) in [
            Quadrant::NorthWest,
            Quadrant::NorthEast,
            Quadrant::SouthWest,
            Quadrant::SouthEast,
        ]
        .iter()
        .enumerate()
        {
            let child_bounds = quadrant_bounds(&bounds, *q);
            self.nodes.push(QuadNode::leaf(child_bounds, depth));
            child_indices[slot] = self.nodes.len() - 1;
        }
        self.nodes[node_index].children = Some(child_indices);

        let existing = std::mem::take(&mut self.nodes[node_index].regions);
        let mut kept = Vec::new();
        for r in existing {
            match child_index(&bounds, &r) {
                Slot::Quadrant(q) => {
                    let child = child_indices[quadrant_slot(q)];
                    self.nodes[child].regions.push(r);
                }
                Slot::Straddling => kept.push(r),
            }
        }
        self.nodes[node_index].regions = kept;
        debug!("quadtree node {} split at depth {}", node_index, depth);
    }

    pub fn insert(&mut self, region: Region) -> IndexResult<()> {
        if region.is_null() {
            return Err(IndexError::InvalidArgument(
                "cannot insert a null region".to_string(),
            ));
        }
        let mut current = 0usize;
        loop {
            let bounds = self.nodes[current].bounds;
            match child_index(&bounds, &region) {
                Slot::Straddling => {
                    self.nodes[current].regions.push(region);
                    return Ok(());
                }
                Slot::Quadrant(q) => {
                    if let Some(children) = self.nodes[current].children {
                        current = children[quadrant_slot(q)];
                        continue;
                    }
                    let over_capacity =
                        self.nodes[current].regions.len() + 1 > self.options.max_regions_per_node;
                    if over_capacity && self.can_split(current) {
                        self.split(current);
                        continue;
                    }
                    self.nodes[current].regions.push(region);
                    return Ok(());
                }
            }
        }
    }

    /// Removes `region` (matched by structural equality, ignoring its
    /// `BitCode`) if present. Returns whether anything was removed.
    pub fn delete(&mut self, region: &Region) -> bool {
        let mut path = Vec::new();
        let mut current = 0usize;
        let removed;
        loop {
            let bounds = self.nodes[current].bounds;
            match child_index(&bounds, region) {
                Slot::Straddling => {
                    removed = remove_one(&mut self.nodes[current].regions, region);
                    break;
                }
                Slot::Quadrant(q) => {
                    if let Some(children) = self.nodes[current].children {
                        path.push(current);
                        current = children[quadrant_slot(q)];
                        continue;
                    }
                    removed = remove_one(&mut self.nodes[current].regions, region);
                    break;
                }
            }
        }
        if removed {
            path.push(current);
            for node_index in path.into_iter().rev() {
                self.maybe_collapse(node_index);
            }
        }
        removed
    }

    /// If `node_index` has no stored regions of its own but still has
    /// children, gathers every descendant region, discards the subtree and
    /// re-inserts them one at a time so the tree never carries an internal
    /// node whose only reason to exist was a region that has since been
    /// removed.
    fn maybe_collapse(&mut self, node_index: usize) {
        if !self.nodes[node_index].regions.is_empty() {
            return;
        }
        let children = match self.nodes[node_index].children {
            Some(c) => c,
            None => return,
        };
        let mut gathered = Vec::new();
        let mut stack = vec![children[0], children[1], children[2], children[3]];
        while let Some(idx) = stack.pop() {
            gathered.extend(self.nodes[idx].regions.drain(..));
            if let Some(grandchildren) = self.nodes[idx].children {
                stack.extend_from_slice(&grandchildren);
            }
        }
        self.nodes[node_index].children = None;
        for r in gathered {
            self.reinsert_under(node_index, r);
        }
    }

    fn reinsert_under(&mut self, root: usize, region: Region) {
        let mut current = root;
        loop {
            let bounds = self.nodes[current].bounds;
            match child_index(&bounds, &region) {
                Slot::Straddling => {
                    self.nodes[current].regions.push(region);
                    return;
                }
                Slot::Quadrant(q) => {
                    if let Some(children) = self.nodes[current].children {
                        current = children[quadrant_slot(q)];
                        continue;
                    }
                    let over_capacity =
                        self.nodes[current].regions.len() + 1 > self.options.max_regions_per_node;
                    if over_capacity && self.can_split(current) {
                        self.split(current);
                        continue;
                    }
                    self.nodes[current].regions.push(region);
                    return;
                }
            }
        }
    }

    pub fn intersects(&self, probe: &Region) -> bool {
        !self.query(probe).is_empty()
    }

    pub fn contains(&self, probe: &Region) -> bool {
        self.query(probe).iter().any(|r| r.contains_region(probe))
    }

    /// Every stored region whose bounds intersect `probe`.
    pub fn query(&self, probe: &Region) -> Vec<Region> {
        let mut out = Vec::new();
        if probe.is_null() {
            return out;
        }
        let mut stack = vec![0usize];
        while let Some(node_index) = stack.pop() {
            let node = &self.nodes[node_index];
            for r in &node.regions {
                if r.intersects(probe) {
                    out.push(*r);
                }
            }
            if let Some(children) = node.children {
                match child_index(&node.bounds, probe) {
                    Slot::Quadrant(q) => stack.push(children[quadrant_slot(q)]),
                    Slot::Straddling => {
                        for &child in &children {
                            if self.nodes[child].bounds.intersects(probe) {
                                stack.push(child);
                            }
                        }
                    }
                }
            }
        }
        out
    }
}

#[inline]
fn quadrant_slot(q: Quadrant) -> usize {
    match q {
        Quadrant::NorthWest => 0,
        Quadrant::NorthEast => 1,
        Quadrant::SouthWest => 2,
        Quadrant::SouthEast => 3,
    }
}

fn remove_one(regions: &mut Vec<Region>, target: &Region) -> bool {
    if let Some(pos) = regions.iter().position(|r| r == target) {
        regions.remove(pos);
        true
    } else {
        false
    }
}

#[allow(dead_code)]
fn attach_code(region: Region, code: BitCode) -> Region {
    region.with_code(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extent() -> Region {
        Region::of_min_max(0.0, 0.0, 100.0, 100.0).unwrap()
    }

    #[test]
    fn rejects_non_positive_capacity() {
        let options = QuadTreeOptions {
            max_regions_per_node: 0,
            max_levels: None,
        };
        assert!(RegionQuadTree::new(extent(), options).is_err());
    }

    #[test]
    fn insert_and_intersects() {
        let mut tree = RegionQuadTree::new(extent(), QuadTreeOptions::default()).unwrap();
        let r = Region::of_min_max(10.0, 10.0, 20.0, 20.0).unwrap();
        tree.insert(r).unwrap();
        let probe = Region::of_min_max(15.0, 15.0, 16.0, 16.0).unwrap();
        assert!(tree.intersects(&probe));
        let miss = Region::of_min_max(60.0, 60.0, 70.0, 70.0).unwrap();
        assert!(!tree.intersects(&miss));
    }

    #[test]
    fn midline_region_goes_to_north_child() {
        // A region whose min_y sits exactly on the midline belongs to the
        // high-y (north) half under the half-open convention.
        let tree_extent = Region::of_min_max(0.0, 0.0, 4.0, 4.0).unwrap();
        let slot = child_index(
            &tree_extent,
            &Region::of_min_max(1.0, 2.0, 2.0, 3.0).unwrap(),
        );
        assert_eq!(slot, Slot::Quadrant(Quadrant::NorthWest));
    }

    #[test]
    fn straddling_region_is_not_assigned_a_quadrant() {
        let tree_extent = Region::of_min_max(0.0, 0.0, 4.0, 4.0).unwrap();
        let slot = child_index(
            &tree_extent,
            &Region::of_min_max(1.0, 1.0, 3.0, 3.0).unwrap(),
        );
        assert_eq!(slot, Slot::Straddling);
    }

    #[test]
    fn overflow_triggers_split_and_push_down() {
        let options = QuadTreeOptions {
            max_regions_per_node: 2,
            max_levels: None,
        };
        let mut tree = RegionQuadTree::new(extent(), options).unwrap();
        for i in 0..5 {
            let base = i as f64 * 5.0;
            tree.insert(Region::of_min_max(base, base, base + 1.0, base + 1.0).unwrap())
                .unwrap();
        }
        assert!(tree.nodes[0].children.is_some());
        let all = tree.query(&extent());
        assert_eq!(all.len(), 5);
    }

    #[test]
    fn delete_removes_and_collapses() {
        let options = QuadTreeOptions {
            max_regions_per_node: 1,
            max_levels: None,
        };
        let mut tree = RegionQuadTree::new(extent(), options).unwrap();
        let a = Region::of_min_max(1.0, 1.0, 2.0, 2.0).unwrap();
        let b = Region::of_min_max(80.0, 80.0, 90.0, 90.0).unwrap();
        tree.insert(a).unwrap();
        tree.insert(b).unwrap();
        assert!(tree.delete(&a));
        assert!(!tree.delete(&a));
        assert_eq!(tree.query(&extent()).len(), 1);
        assert!(!tree.is_empty());
        assert!(tree.delete(&b));
        assert!(tree.is_empty());
    }

    fn named_regions() -> Vec<Region> {
        vec![
            Region::of_min_max(5.0, 5.0, 15.0, 15.0).unwrap(),
            Region::of_min_max(25.0, 25.0, 35.0, 35.0).unwrap(),
            Region::of_min_max(5.0, 5.0, 17.0, 15.0).unwrap(),
            Region::of_min_max(5.0, 25.0, 25.0, 35.0).unwrap(),
            Region::of_min_max(25.0, 5.0, 35.0, 15.0).unwrap(),
            Region::of_min_max(2.0, 2.0, 4.0, 4.0).unwrap(),
        ]
    }

    #[test]
    fn insert_and_intersects_matches_known_case() {
        let envelope = Region::of_min_max(2.0, 2.0, 35.0, 35.0).unwrap();
        let mut tree = RegionQuadTree::new(envelope, QuadTreeOptions::default()).unwrap();
        for r in named_regions() {
            tree.insert(r).unwrap();
        }
        for r in named_regions() {
            assert!(tree.intersects(&r));
        }
        let miss = Region::of_min_max(100.0, 100.0, 101.0, 101.0).unwrap();
        assert!(!tree.intersects(&miss));
    }

    #[test]
    fn delete_matches_known_case() {
        let envelope = Region::of_min_max(2.0, 2.0, 35.0, 35.0).unwrap();
        let mut tree = RegionQuadTree::new(envelope, QuadTreeOptions::default()).unwrap();
        for r in named_regions() {
            tree.insert(r).unwrap();
        }
        let removed = Region::of_min_max(2.0, 2.0, 4.0, 4.0).unwrap();
        assert!(tree.delete(&removed));

        let not_present = Region::of_min_max(25.0, 25.0, 35.0, 37.0).unwrap();
        assert!(!tree.delete(&not_present));

        for r in named_regions() {
            if r == removed {
                continue;
            }
            assert!(tree.intersects(&r));
        }
    }

    #[test]
    fn max_levels_caps_depth() {
        let options = QuadTreeOptions {
            max_regions_per_node: 1,
            max_levels: Some(1),
        };
        let mut tree = RegionQuadTree::new(extent(), options).unwrap();
        for i in 0..10 {
            let base = i as f64;
            tree.insert(Region::of_min_max(base, base, base + 0.1, base + 0.1).unwrap())
                .unwrap();
        }
        // depth is capped at 1, so no node beyond depth 1 should exist.
        assert!(tree.nodes.iter().all(|n| n.depth <= 1));
    }
}
