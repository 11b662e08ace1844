//! The axis-aligned rectangle used by every spatial index in this crate, plus
//! its optional quadrant `BitCode`.

use std::cmp::Ordering;

use crate::bitcode::BitCode;
use crate::errors::{GeoError, GeoResult};
use crate::point::Point;

/// A 2-D axis-aligned bounding box.
///
/// A region is either "null" (all four bounds are `NaN`, representing the
/// absence of any extent — the seed value for a running union) or fully
/// ordered (`min_x <= max_x` and `min_y <= max_y`). There is no partially
/// null region.
#[derive(Debug, Clone, Copy)]
pub struct Region {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
    code: Option<BitCode>,
    boundary: bool,
}

impl Region {
    /// The null region: no extent, used as the identity element for
    /// `expand_to_include`.
    pub fn empty() -> Self {
        Region {
            min_x: f64::NAN,
            min_y: f64::NAN,
            max_x: f64::NAN,
            max_y: f64::NAN,
            code: None,
            boundary: false,
        }
    }

    /// Builds a region from explicit bounds. Returns `InvalidArgument` if
    /// the bounds are not monotone.
    pub fn of_min_max(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> GeoResult<Self> {
        if !(min_x <= max_x) || !(min_y <= max_y) {
            return Err(GeoError::InvalidArgument(format!(
                "non-monotone bounds: ({}, {}) .. ({}, {})",
                min_x, min_y, max_x, max_y
            )));
        }
        Ok(Region {
            min_x,
            min_y,
            max_x,
            max_y,
            code: None,
            boundary: false,
        })
    }

    /// The smallest region covering every point in `points`. Returns
    /// `InvalidArgument` if `points` is empty.
    pub fn of_points(points: &[Point]) -> GeoResult<Self> {
        let mut iter = points.iter();
        let first = iter.next().ok_or_else(|| {
            GeoError::InvalidArgument("cannot bound an empty point set".to_string())
        })?;
        let mut region = Region::of_min_max(first.x, first.y, first.x, first.y)?;
        for p in iter {
            region.expand_to_include_point(*p);
        }
        Ok(region)
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.min_x.is_nan()
    }

    #[inline]
    pub fn min_x(&self) -> f64 {
        self.min_x
    }
    #[inline]
    pub fn min_y(&self) -> f64 {
        self.min_y
    }
    #[inline]
    pub fn max_x(&self) -> f64 {
        self.max_x
    }
    #[inline]
    pub fn max_y(&self) -> f64 {
        self.max_y
    }

    #[inline]
    pub fn code(&self) -> Option<&BitCode> {
        self.code.as_ref()
    }

    pub fn with_code(mut self, code: BitCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Quadtree/R-tree level implied by the attached `BitCode`, two bits per
    /// level. Zero if no code is attached.
    pub fn level(&self) -> usize {
        self.code.as_ref().map(|c| c.level()).unwrap_or(0)
    }

    #[inline]
    pub fn is_boundary(&self) -> bool {
        self.boundary
    }

    pub fn mark_boundary(mut self) -> Self {
        self.boundary = true;
        self
    }

    /// Grows this region's bounds, in place, to cover `other` as well. A
    /// null `self` simply becomes `other`'s bounds; a null `other` is a
    /// no-op. Monotone non-decreasing in `euclidean_area`.
    pub fn expand_to_include(&mut self, other: &Region) {
        if other.is_null() {
            return;
        }
        if self.is_null() {
            self.min_x = other.min_x;
            self.min_y = other.min_y;
            self.max_x = other.max_x;
            self.max_y = other.max_y;
            return;
        }
        self.min_x = self.min_x.min(other.min_x);
        self.min_y = self.min_y.min(other.min_y);
        self.max_x = self.max_x.max(other.max_x);
        self.max_y = self.max_y.max(other.max_y);
    }

    /// As `expand_to_include`, but with a single point.
    pub fn expand_to_include_point(&mut self, p: Point) {
        if self.is_null() {
            self.min_x = p.x;
            self.min_y = p.y;
            self.max_x = p.x;
            self.max_y = p.y;
            return;
        }
        self.min_x = self.min_x.min(p.x);
        self.min_y = self.min_y.min(p.y);
        self.max_x = self.max_x.max(p.x);
        self.max_y = self.max_y.max(p.y);
    }

    /// Grows this region's bounds outward by `margin` on every side.
    /// No-op on a null region.
    pub fn expand_by(&mut self, margin: f64) {
        if self.is_null() {
            return;
        }
        self.min_x -= margin;
        self.min_y -= margin;
        self.max_x += margin;
        self.max_y += margin;
    }

    /// Returns a new region equal to `self` grown to include `other`,
    /// leaving both inputs untouched. Used by R-tree selection to evaluate a
    /// candidate enlargement without committing to it.
    pub fn union(&self, other: &Region) -> Region {
        let mut out = *self;
        out.expand_to_include(other);
        out
    }

    /// Whether the closed rectangles overlap (touching edges count as
    /// intersecting). `false` if either region is null.
    pub fn intersects(&self, other: &Region) -> bool {
        if self.is_null() || other.is_null() {
            return false;
        }
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    /// Whether `other` lies entirely within `self` (touching edges count as
    /// contained). `false` if either region is null.
    pub fn contains_region(&self, other: &Region) -> bool {
        if self.is_null() || other.is_null() {
            return false;
        }
        self.min_x <= other.min_x
            && self.max_x >= other.max_x
            && self.min_y <= other.min_y
            && self.max_y >= other.max_y
    }

    /// Whether `p` lies within the closed rectangle. `false` on a null
    /// region.
    pub fn contains_point(&self, p: Point) -> bool {
        if self.is_null() {
            return false;
        }
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }

    /// The plain Euclidean area of the rectangle. Zero for a degenerate
    /// (zero-width or zero-height) region, zero for a null region.
    pub fn euclidean_area(&self) -> f64 {
        if self.is_null() {
            return 0.0;
        }
        (self.max_x - self.min_x) * (self.max_y - self.min_y)
    }

    /// `area(self ∪ other) - area(self)`: the marginal area `other` would add
    /// if merged into `self`. Used by R-tree insertion as the "enlargement"
    /// cost of filing a new entry under a given child.
    pub fn non_intersecting_area(&self, other: &Region) -> f64 {
        self.union(other).euclidean_area() - self.euclidean_area()
    }
}

impl PartialEq for Region {
    fn eq(&self, other: &Self) -> bool {
        if self.is_null() && other.is_null() {
            return true;
        }
        self.min_x == other.min_x
            && self.min_y == other.min_y
            && self.max_x == other.max_x
            && self.max_y == other.max_y
    }
}
impl Eq for Region {}

/// Lexicographic ordering on `(min_x, min_y, max_x, max_y)`; a null region
/// sorts strictly before every non-null region. Used to give R-tree and
/// quadtree node children a deterministic iteration order for tie-breaking.
impl Ord for Region {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.is_null(), other.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self
                .min_x
                .partial_cmp(&other.min_x)
                .unwrap_or(Ordering::Equal)
                .then_with(|| self.min_y.partial_cmp(&other.min_y).unwrap_or(Ordering::Equal))
                .then_with(|| self.max_x.partial_cmp(&other.max_x).unwrap_or(Ordering::Equal))
                .then_with(|| self.max_y.partial_cmp(&other.max_y).unwrap_or(Ordering::Equal)),
        }
    }
}
impl PartialOrd for Region {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_is_null() {
        assert!(Region::empty().is_null());
    }

    #[test]
    fn rejects_non_monotone_bounds() {
        assert!(Region::of_min_max(1.0, 0.0, 0.0, 1.0).is_err());
    }

    #[test]
    fn expand_to_include_is_monotone_in_area() {
        let a = Region::of_min_max(0.0, 0.0, 1.0, 1.0).unwrap();
        let b = Region::of_min_max(2.0, 2.0, 3.0, 3.0).unwrap();
        let mut grown = a;
        let before = grown.euclidean_area();
        grown.expand_to_include(&b);
        assert!(grown.euclidean_area() >= before);
        assert_eq!(grown.min_x(), 0.0);
        assert_eq!(grown.max_x(), 3.0);
    }

    #[test]
    fn expand_from_null_adopts_other_bounds() {
        let mut region = Region::empty();
        let other = Region::of_min_max(1.0, 1.0, 2.0, 2.0).unwrap();
        region.expand_to_include(&other);
        assert_eq!(region, other);
    }

    #[test]
    fn self_intersects_and_contains_when_non_null() {
        let a = Region::of_min_max(0.0, 0.0, 5.0, 5.0).unwrap();
        assert!(a.intersects(&a));
        assert!(a.contains_region(&a));
        assert!(!Region::empty().intersects(&Region::empty()));
    }

    #[test]
    fn touching_edges_count_as_intersecting() {
        let a = Region::of_min_max(0.0, 0.0, 1.0, 1.0).unwrap();
        let b = Region::of_min_max(1.0, 0.0, 2.0, 1.0).unwrap();
        assert!(a.intersects(&b));
    }

    #[test]
    fn non_intersecting_area_is_marginal_enlargement() {
        let a = Region::of_min_max(0.0, 0.0, 2.0, 2.0).unwrap();
        let b = Region::of_min_max(0.0, 0.0, 1.0, 1.0).unwrap();
        // b is already inside a, so enlargement is zero.
        assert_eq!(a.non_intersecting_area(&b), 0.0);

        let c = Region::of_min_max(2.0, 2.0, 4.0, 4.0).unwrap();
        assert!(a.non_intersecting_area(&c) > 0.0);
    }

    #[test]
    fn null_sorts_before_non_null() {
        let a = Region::empty();
        let b = Region::of_min_max(0.0, 0.0, 1.0, 1.0).unwrap();
        assert!(a < b);
    }

    #[test]
    fn level_tracks_attached_code() {
        use crate::bitcode::{BitCode, Quadrant};
        let code = BitCode::root()
            .append_quadrant(Quadrant::NorthEast)
            .append_quadrant(Quadrant::SouthWest);
        let region = Region::of_min_max(0.0, 0.0, 1.0, 1.0).unwrap().with_code(code);
        assert_eq!(region.level(), 2);
    }
}
