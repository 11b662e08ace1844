//! Subtree selection strategies for dynamic R-tree insertion, expressed as a
//! tagged enum rather than a trait object so the insertion hot path
//! monomorphizes instead of dispatching through a vtable.

use geo_kernel::Region;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeSelector {
    /// From the root, repeatedly choose the child whose MBR enlarges the
    /// least by the incoming region; ties broken by smaller current area.
    MinimalAreaIncrease,
    /// At the deepest non-leaf level, choose by minimal overlap
    /// enlargement among the children; at higher levels, fall back to
    /// minimal area enlargement.
    RStarSelector,
}

impl NodeSelector {
    /// Returns the index into `children_bounds` of the child to descend
    /// into for `region`.
    pub(crate) fn choose(
        self,
        children_bounds: &[Region],
        children_are_leaves: bool,
        region: &Region,
    ) -> usize {
        match self {
            NodeSelector::MinimalAreaIncrease => min_area_increase(children_bounds, region),
            NodeSelector::RStarSelector => {
                if children_are_leaves {
                    min_overlap_enlargement(children_bounds, region)
                } else {
                    min_area_increase(children_bounds, region)
                }
            }
        }
    }
}

fn min_area_increase(children_bounds: &[Region], region: &Region) -> usize {
    let mut best = 0;
    let mut best_increase = f64::INFINITY;
    let mut best_area = f64::INFINITY;
    for (i, bounds) in children_bounds.iter().enumerate() {
        let increase = bounds.non_intersecting_area(region);
        let area = bounds.euclidean_area();
        if increase < best_increase || (increase == best_increase && area < best_area) {
            best = i;
            best_increase = increase;
            best_area = area;
        }
    }
    best
}

pub(crate) fn intersection_area(a: &Region, b: &Region) -> f64 {
    if !a.intersects(b) {
        return 0.0;
    }
    let ix = (a.max_x().min(b.max_x()) - a.min_x().max(b.min_x())).max(0.0);
    let iy = (a.max_y().min(b.max_y()) - a.min_y().max(b.min_y())).max(0.0);
    ix * iy
}

fn min_overlap_enlargement(children_bounds: &[Region], region: &Region) -> usize {
    let mut best = 0;
    let mut best_overlap_increase = f64::INFINITY;
    let mut best_area_increase = f64::INFINITY;
    for (i, bounds) in children_bounds.iter().enumerate() {
        let enlarged = bounds.union(region);
        let mut overlap_before = 0.0;
        let mut overlap_after = 0.0;
        for (j, other) in children_bounds.iter().enumerate() {
            if i == j {
                continue;
            }
            overlap_before += intersection_area(bounds, other);
            overlap_after += intersection_area(&enlarged, other);
        }
        let overlap_increase = overlap_after - overlap_before;
        let area_increase = bounds.non_intersecting_area(region);
        if overlap_increase < best_overlap_increase
            || (overlap_increase == best_overlap_increase && area_increase < best_area_increase)
        {
            best = i;
            best_overlap_increase = overlap_increase;
            best_area_increase = area_increase;
        }
    }
    best
}
