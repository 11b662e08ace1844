//! The mutable R-tree: dynamic `insert`/`delete` with pluggable selection
//! and splitting strategies.

use geo_kernel::Region;
use log::debug;

use crate::errors::{IndexError, IndexResult};

use super::node::{union_bounds, NodeEntries, RNode};
use super::select::NodeSelector;
use super::split::NodeSplitter;

/// Tuning knobs shared by the dynamic and STR-bulk-loaded R-trees.
#[derive(Debug, Clone, Copy)]
pub struct RTreeOptions {
    pub max_children: usize,
    pub min_children: usize,
    pub selector: NodeSelector,
    pub splitter: NodeSplitter,
}

impl Default for RTreeOptions {
    fn default() -> Self {
        RTreeOptions {
            max_children: 8,
            min_children: 2,
            selector: NodeSelector::MinimalAreaIncrease,
            splitter: NodeSplitter::Linear,
        }
    }
}

impl RTreeOptions {
    fn validate(&self) -> IndexResult<()> {
        if self.max_children < 2 {
            return Err(IndexError::InvalidArgument(
                "max_children must be >= 2".to_string(),
            ));
        }
        if self.min_children < 1 || self.min_children * 2 > self.max_children + 1 {
            return Err(IndexError::InvalidArgument(
                "min_children must be >= 1 and <= (max_children + 1) / 2".to_string(),
            ));
        }
        Ok(())
    }
}

/// A dynamically updatable R-tree over axis-aligned regions.
#[derive(Debug, Clone)]
pub struct RTree {
    pub(crate) nodes: Vec<RNode>,
    pub(crate) root: usize,
    pub(crate) options: RTreeOptions,
}

impl RTree {
    pub fn new(options: RTreeOptions) -> IndexResult<Self> {
        options.validate()?;
        Ok(RTree {
            nodes: vec![RNode::empty_leaf()],
            root: 0,
            options,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.nodes[self.root].bounds.is_null()
    }

    pub fn insert(&mut self, region: Region) -> IndexResult<()> {
        if region.is_null() {
            return Err(IndexError::InvalidArgument(
                "cannot insert a null region".to_string(),
            ));
        }
        let mut path = Vec::new();
        let mut current = self.root;
        loop {
            if self.nodes[current].is_leaf() {
                break;
            }
            let children = match &self.nodes[current].entries {
                NodeEntries::Internal(c) => c.clone(),
                NodeEntries::Leaf(_) => unreachable!(),
            };
            let children_bounds: Vec<Region> = children.iter().map(|&c| self.nodes[c].bounds).collect();
            let children_are_leaves = children.iter().all(|&c| self.nodes[c].is_leaf());
            let chosen = self
                .options
                .selector
                .choose(&children_bounds, children_are_leaves, &region);
            path.push(current);
            current = children[chosen];
        }

        match &mut self.nodes[current].entries {
            NodeEntries::Leaf(items) => items.push(region),
            NodeEntries::Internal(_) => unreachable!(),
        }
        self.nodes[current].bounds.expand_to_include(&region);
        self.split_and_propagate(current, path);
        Ok(())
    }

    fn split_and_propagate(&mut self, mut node_index: usize, mut path: Vec<usize>) {
        loop {
            if self.nodes[node_index].len() <= self.options.max_children {
                // still need to bubble the enlarged bounds up to the root
                for &ancestor in path.iter().rev() {
                    let child_bounds = self.nodes[node_index].bounds;
                    self.nodes[ancestor].bounds.expand_to_include(&child_bounds);
                    node_index = ancestor;
                }
                return;
            }
            let sibling = self.split_node(node_index);
            match path.pop() {
                Some(parent) => {
                    if let NodeEntries::Internal(children) = &mut self.nodes[parent].entries {
                        children.push(sibling);
                    }
                    self.recompute_bounds(parent);
                    node_index = parent;
                }
                None => {
                    let bounds = self.nodes[node_index].bounds.union(&self.nodes[sibling].bounds);
                    self.nodes.push(RNode {
                        bounds,
                        entries: NodeEntries::Internal(vec![node_index, sibling]),
                    });
                    self.root = self.nodes.len() - 1;
                    debug!("r-tree grew a new root at depth increment");
                    return;
                }
            }
        }
    }

    fn split_node(&mut self, node_index: usize) -> usize {
        let min_children = self.options.min_children;
        let splitter = self.options.splitter;
        match std::mem::replace(&mut self.nodes[node_index].entries, NodeEntries::Leaf(Vec::new())) {
            NodeEntries::Leaf(items) => {
                let entries: Vec<(Region, Region)> = items.into_iter().map(|r| (r, r)).collect();
                let (group1, group2) = splitter.split(entries, min_children);
                let bounds1 = union_bounds(&group1);
                let bounds2 = union_bounds(&group2);
                self.nodes[node_index] = RNode {
                    bounds: bounds1,
                    entries: NodeEntries::Leaf(group1.into_iter().map(|(_, d)| d).collect()),
                };
                self.nodes.push(RNode {
                    bounds: bounds2,
                    entries: NodeEntries::Leaf(group2.into_iter().map(|(_, d)| d).collect()),
                });
                self.nodes.len() - 1
            }
            NodeEntries::Internal(children) => {
                let entries: Vec<(Region, usize)> =
                    children.into_iter().map(|c| (self.nodes[c].bounds, c)).collect();
                let (group1, group2) = splitter.split(entries, min_children);
                let bounds1 = union_bounds(&group1);
                let bounds2 = union_bounds(&group2);
                self.nodes[node_index] = RNode {
                    bounds: bounds1,
                    entries: NodeEntries::Internal(group1.into_iter().map(|(_, d)| d).collect()),
                };
                self.nodes.push(RNode {
                    bounds: bounds2,
                    entries: NodeEntries::Internal(group2.into_iter().map(|(_, d)| d).collect()),
                });
                self.nodes.len() - 1
            }
        }
    }

    fn recompute_bounds(&mut self, node_index: usize) {
        let bounds = match &self.nodes[node_index].entries {
            NodeEntries::Leaf(items) => {
                let mut b = Region::empty();
                for r in items {
                    b.expand_to_include(r);
                }
                b
            }
            NodeEntries::Internal(children) => {
                let mut b = Region::empty();
                for &c in children {
                    let cb = self.nodes[c].bounds;
                    b.expand_to_include(&cb);
                }
                b
            }
        };
        self.nodes[node_index].bounds = bounds;
    }

    fn gather_regions(&self, node_index: usize, out: &mut Vec<Region>) {
        let mut stack = vec![node_index];
        while let Some(idx) = stack.pop() {
            match &self.nodes[idx].entries {
                NodeEntries::Leaf(items) => out.extend(items.iter().copied()),
                NodeEntries::Internal(children) => stack.extend(children.iter().copied()),
            }
        }
    }

    /// Removes `target` (matched by structural equality). Returns whether
    /// anything was removed.
    pub fn delete(&mut self, target: &Region) -> bool {
        let mut stack = vec![vec![self.root]];
        while let Some(path) = stack.pop() {
            let node_index = *path.last().unwrap();
            if !self.nodes[node_index].bounds.intersects(target) && node_index != self.root {
                continue;
            }
            match &self.nodes[node_index].entries {
                NodeEntries::Leaf(items) => {
                    if let Some(pos) = items.iter().position(|r| r == target) {
                        if let NodeEntries::Leaf(items) = &mut self.nodes[node_index].entries {
                            items.remove(pos);
                        }
                        self.recompute_bounds(node_index);
                        self.condense(path);
                        return true;
                    }
                }
                NodeEntries::Internal(children) => {
                    for &child in children {
                        let mut next_path = path.clone();
                        next_path.push(child);
                        stack.push(next_path);
                    }
                }
            }
        }
        false
    }

    fn condense(&mut self, path: Vec<usize>) {
        let mut orphaned = Vec::new();
        let mut i = path.len();
        while i >= 2 {
            i -= 1;
            let node_index = path[i];
            let parent_index = path[i - 1];
            let count = self.nodes[node_index].len();
            if count < self.options.min_children {
                self.gather_regions(node_index, &mut orphaned);
                if let NodeEntries::Internal(children) = &mut self.nodes[parent_index].entries {
                    children.retain(|&c| c != node_index);
                }
                self.recompute_bounds(parent_index);
            } else {
                self.recompute_bounds(node_index);
                self.recompute_bounds(parent_index);
            }
        }
        if let NodeEntries::Internal(children) = &self.nodes[self.root].entries {
            if children.len() == 1 {
                self.root = children[0];
            }
        }
        for r in orphaned {
            let _ = self.insert(r);
        }
    }

    /// Every stored region whose bounds intersect `probe`.
    pub fn query(&self, probe: &Region) -> Vec<Region> {
        let mut out = Vec::new();
        if probe.is_null() {
            return out;
        }
        let mut stack = vec![self.root];
        while let Some(node_index) = stack.pop() {
            let node = &self.nodes[node_index];
            if !node.bounds.intersects(probe) {
                continue;
            }
            match &node.entries {
                NodeEntries::Leaf(items) => {
                    out.extend(items.iter().filter(|r| r.intersects(probe)).copied());
                }
                NodeEntries::Internal(children) => stack.extend(children.iter().copied()),
            }
        }
        out
    }

    pub fn intersects(&self, probe: &Region) -> bool {
        !self.query(probe).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_region(i: i64) -> Region {
        let base = i as f64 * 3.0;
        Region::of_min_max(base, base, base + 1.0, base + 1.0).unwrap()
    }

    #[test]
    fn rejects_bad_options() {
        let options = RTreeOptions {
            max_children: 1,
            ..RTreeOptions::default()
        };
        assert!(RTree::new(options).is_err());
    }

    #[test]
    fn insert_and_query_round_trip() {
        let mut tree = RTree::new(RTreeOptions::default()).unwrap();
        for i in 0..20 {
            tree.insert(small_region(i)).unwrap();
        }
        let all = tree.query(&Region::of_min_max(-100.0, -100.0, 100.0, 100.0).unwrap());
        assert_eq!(all.len(), 20);
    }

    #[test]
    fn split_triggers_past_max_children() {
        let options = RTreeOptions {
            max_children: 3,
            min_children: 1,
            ..RTreeOptions::default()
        };
        let mut tree = RTree::new(options).unwrap();
        for i in 0..10 {
            tree.insert(small_region(i)).unwrap();
        }
        assert!(tree.nodes.len() > 1);
    }

    #[test]
    fn delete_removes_region() {
        let mut tree = RTree::new(RTreeOptions::default()).unwrap();
        let target = small_region(2);
        for i in 0..10 {
            tree.insert(small_region(i)).unwrap();
        }
        assert!(tree.delete(&target));
        assert!(!tree.delete(&target));
        let all = tree.query(&Region::of_min_max(-100.0, -100.0, 100.0, 100.0).unwrap());
        assert_eq!(all.len(), 9);
    }

    #[test]
    fn rstar_strategy_also_round_trips() {
        let options = RTreeOptions {
            max_children: 4,
            min_children: 2,
            selector: NodeSelector::RStarSelector,
            splitter: NodeSplitter::RStarSplit,
        };
        let mut tree = RTree::new(options).unwrap();
        for i in 0..15 {
            tree.insert(small_region(i)).unwrap();
        }
        let all = tree.query(&Region::of_min_max(-100.0, -100.0, 100.0, 100.0).unwrap());
        assert_eq!(all.len(), 15);
    }
}
