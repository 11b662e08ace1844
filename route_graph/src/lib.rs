//! The directed road graph, its Fibonacci-heap priority queue, and an A*
//! pathfinder over it.

pub mod astar;
pub mod errors;
pub mod fib_heap;
pub mod graph;

pub use astar::{find_path, PathSummary, WeightKind};
pub use errors::{GraphError, GraphResult};
pub use fib_heap::{FibonacciHeap, Handle};
pub use graph::{Edge, EdgeId, Graph, GraphBuilder, Node, NodeId};
