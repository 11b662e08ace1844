//! A region index whose "boundary" regions each own a K-D tree of the
//! points filed under them. The region-to-tree association is an external
//! map keyed by a monotonically assigned identity, not by a region's
//! structural bounds — two boundary rectangles with identical bounds are
//! still different owners.

use geo_kernel::{BitCode, Point, Region, TopologyCalculator};

use crate::errors::IndexResult;
use crate::kdtree::KdTree;
use crate::quadtree::{QuadTreeOptions, RegionQuadTree};

/// Stamps `id` into a throwaway `BitCode` riding along on `region`'s
/// otherwise-unused code slot, so a region handed back from the coverage
/// index's `query` can be traced to its registry entry without relying on
/// `Region`'s structural `PartialEq` (which ignores the code entirely).
fn tag_with_id(region: Region, id: usize) -> Region {
    region.with_code(BitCode::root().append(id as u64, 64))
}

fn read_id(region: &Region) -> usize {
    region
        .code()
        .map(|c| c.value_at(0, 64) as usize)
        .unwrap_or(0)
}

/// A region index where regions that own a point set ("boundary" regions)
/// are each backed by their own `KdTree`.
#[derive(Debug, Clone)]
pub struct HybridKdIndex {
    coverage: RegionQuadTree,
    registry: Vec<(Region, KdTree)>,
}

impl HybridKdIndex {
    pub fn new(extent: Region, options: QuadTreeOptions) -> IndexResult<Self> {
        Ok(HybridKdIndex {
            coverage: RegionQuadTree::new(extent, options)?,
            registry: Vec::new(),
        })
    }

    fn covering_ids(&self, probe: &Region) -> Vec<usize> {
        self.coverage.query(probe).iter().map(read_id).collect()
    }

    /// Files `point` under the first boundary region covering `region`; if
    /// none exists yet, `region` itself is marked boundary, given a fresh
    /// single-point K-D tree, and filed in the coverage index.
    pub fn insert(&mut self, region: Region, point: Point) -> IndexResult<()> {
        for id in self.covering_ids(&region) {
            self.registry[id].1.insert(point);
            return Ok(());
        }
        let id = self.registry.len();
        let mut kd = KdTree::new();
        kd.insert(point);
        let boundary_region = region.mark_boundary();
        self.registry.push((boundary_region, kd));
        self.coverage.insert(tag_with_id(boundary_region, id))?;
        Ok(())
    }

    /// Whether `point` is stored under any boundary region covering
    /// `region`.
    pub fn contains(&self, region: &Region, point: Point) -> bool {
        self.covering_ids(region)
            .iter()
            .any(|&id| self.registry[id].1.contains(point))
    }

    /// The nearest stored point under the first boundary region covering
    /// `region` that has one.
    pub fn nearest_neighbor<C: TopologyCalculator + ?Sized>(
        &self,
        calc: &C,
        region: &Region,
        point: Point,
    ) -> Option<Point> {
        for id in self.covering_ids(region) {
            if let Some(found) = self.registry[id].1.nearest_neighbor(calc, point) {
                return Some(found);
            }
        }
        None
    }

    pub fn boundary_region_count(&self) -> usize {
        self.registry.len()
    }
}
