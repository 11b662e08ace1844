//! Sort-Tile-Recursive bulk loading: packs a static but still-mutable
//! R-tree (the same arena shape as `dynamic::RTree`) from a known point set
//! in one pass instead of one `insert` at a time.

use geo_kernel::Region;
use rayon::slice::ParallelSliceMut;

use crate::errors::{IndexError, IndexResult};

use super::dynamic::{RTree, RTreeOptions};
use super::node::{union_bounds, NodeEntries, RNode};

const DEFAULT_FILLING_FACTOR: f64 = 0.4;

fn mid_x(r: &Region) -> f64 {
    (r.min_x() + r.max_x()) / 2.0
}
fn mid_y(r: &Region) -> f64 {
    (r.min_y() + r.max_y()) / 2.0
}

fn slice_count(item_count: usize, cap: usize) -> usize {
    let node_count = (item_count as f64 / cap as f64).ceil().max(1.0);
    node_count.sqrt().ceil().max(1.0) as usize
}

/// Packs `regions` into a new R-tree using the Sort-Tile-Recursive bulk
/// loading algorithm, at `options.max_children * filling_factor` leaf
/// occupancy. The resulting tree remains a regular `RTree` and accepts
/// further `insert`/`delete` calls afterward.
pub fn str_bulk_load(
    regions: Vec<Region>,
    options: RTreeOptions,
    filling_factor: Option<f64>,
) -> IndexResult<RTree> {
    if regions.is_empty() {
        return Err(IndexError::InvalidArgument(
            "cannot bulk-load an R-tree from an empty region set".to_string(),
        ));
    }
    let filling_factor = filling_factor.unwrap_or(DEFAULT_FILLING_FACTOR);
    if !(filling_factor > 0.0 && filling_factor <= 1.0) {
        return Err(IndexError::InvalidArgument(
            "filling_factor must be in (0, 1]".to_string(),
        ));
    }
    let cap = ((options.max_children as f64 * filling_factor).round() as usize).max(1);

    let mut nodes: Vec<RNode> = Vec::new();
    let entries: Vec<(Region, Region)> = regions.into_iter().map(|r| (r, r)).collect();
    let mut layer = pack_leaf_layer(&mut nodes, entries, cap);
    while layer.len() > 1 {
        layer = pack_internal_layer(&mut nodes, &layer, cap);
    }
    let root = layer[0];

    Ok(RTree {
        nodes,
        root,
        options,
    })
}

fn pack_leaf_layer(nodes: &mut Vec<RNode>, mut entries: Vec<(Region, Region)>, cap: usize) -> Vec<usize> {
    entries.par_sort_by(|a, b| mid_x(&a.0).partial_cmp(&mid_x(&b.0)).unwrap());
    let slices = slice_count(entries.len(), cap);
    let slice_size = (slices * cap).max(1);
    let mut out = Vec::new();
    for slice in entries.chunks_mut(slice_size) {
        slice.par_sort_by(|a, b| mid_y(&a.0).partial_cmp(&mid_y(&b.0)).unwrap());
        for chunk in slice.chunks(cap) {
            let items: Vec<Region> = chunk.iter().map(|(_, d)| *d).collect();
            nodes.push(RNode {
                bounds: union_bounds(chunk),
                entries: NodeEntries::Leaf(items),
            });
            out.push(nodes.len() - 1);
        }
    }
    out
}

fn pack_internal_layer(nodes: &mut Vec<RNode>, children: &[usize], cap: usize) -> Vec<usize> {
    let mut entries: Vec<(Region, usize)> = children.iter().map(|&c| (nodes[c].bounds, c)).collect();
    entries.par_sort_by(|a, b| mid_x(&a.0).partial_cmp(&mid_x(&b.0)).unwrap());
    let slices = slice_count(entries.len(), cap);
    let slice_size = (slices * cap).max(1);
    let mut out = Vec::new();
    for slice in entries.chunks_mut(slice_size) {
        slice.par_sort_by(|a, b| mid_y(&a.0).partial_cmp(&mid_y(&b.0)).unwrap());
        for chunk in slice.chunks(cap) {
            let child_indices: Vec<usize> = chunk.iter().map(|(_, d)| *d).collect();
            nodes.push(RNode {
                bounds: union_bounds(chunk),
                entries: NodeEntries::Internal(child_indices),
            });
            out.push(nodes.len() - 1);
        }
    }
    out
}
