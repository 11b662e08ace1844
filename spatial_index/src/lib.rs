//! Spatial indexing structures used to snap GPS traces onto a road graph: a
//! region quadtree, the R-tree family (dynamic, STR-bulk-loaded,
//! Hilbert-packed), a K-D tree, and a hybrid index that attaches a K-D tree
//! to each boundary region of a region index.

pub mod errors;
pub mod hybrid;
pub mod kdtree;
pub mod quadtree;
pub mod rtree;

pub use errors::{IndexError, IndexResult};
pub use hybrid::HybridKdIndex;
pub use kdtree::KdTree;
pub use quadtree::{QuadTreeOptions, RegionQuadTree};
pub use rtree::{HilbertRTree, NodeSelector, NodeSplitter, RTree, RTreeOptions};
