//! A* shortest-path search over a `Graph`, using the Fibonacci heap for the
//! open-set frontier so relaxing an edge is an amortized O(1)
//! `decrease_key` rather than a full re-heapify.

use hashbrown::HashMap;

use geo_kernel::{EuclideanTopology, TopologyCalculator};

use crate::fib_heap::{FibonacciHeap, Handle};
use crate::graph::{EdgeId, Graph, NodeId};

/// How an edge's traversal cost is computed.
#[derive(Clone, Copy)]
pub enum WeightKind {
    /// Every edge costs exactly one hop; finds the path with the fewest edges.
    HopCount,
    /// The edge polyline's Euclidean length.
    EuclideanLength,
}

fn edge_weight(graph: &Graph, edge_id: EdgeId, kind: WeightKind) -> f64 {
    match kind {
        WeightKind::HopCount => 1.0,
        WeightKind::EuclideanLength => graph.edge(edge_id).polyline.length(&EuclideanTopology),
    }
}

/// The result of a successful search: the edges and nodes traversed, and
/// the summed edge weight.
#[derive(Debug, Clone)]
pub struct PathSummary {
    pub nodes: Vec<NodeId>,
    pub edges: Vec<EdgeId>,
    pub total_weight: f64,
    pub visited_count: usize,
}

/// Finds the lowest-weight path from `start` to `goal`. `weight_fn` gives
/// the additional cost of traversing a given edge (e.g. a penalty layered
/// on top of `WeightKind::EuclideanLength`); pass `|_, base| base` to use
/// the base weight unmodified. `heuristic` must never overestimate the
/// remaining distance to `goal` or the search is not guaranteed optimal; a
/// safe default is `|_| 0.0`, degrading to Dijkstra.
///
/// Returns `Ok(None)` if `goal` is unreachable from `start` — that is not
/// an error. Never mutates `graph`.
pub fn find_path<W, H>(
    graph: &Graph,
    start: NodeId,
    goal: NodeId,
    base_kind: WeightKind,
    weight_fn: W,
    heuristic: H,
) -> Option<PathSummary>
where
    W: Fn(EdgeId, f64) -> f64,
    H: Fn(NodeId) -> f64,
{
    if start == goal {
        return Some(PathSummary {
            nodes: vec![start],
            edges: Vec::new(),
            total_weight: 0.0,
            visited_count: 1,
        });
    }

    let mut open: FibonacciHeap<NodeId> = FibonacciHeap::new();
    let mut handles: HashMap<NodeId, Handle> = HashMap::new();
    let mut g_score: HashMap<NodeId, f64> = HashMap::new();
    let mut came_from: HashMap<NodeId, (NodeId, EdgeId)> = HashMap::new();
    let mut closed: HashMap<NodeId, bool> = HashMap::new();

    g_score.insert(start, 0.0);
    let handle = open.push(start, heuristic(start));
    handles.insert(start, handle);

    let mut visited_count = 0usize;

    while let Some((current, _)) = open.pop() {
        if *closed.get(&current).unwrap_or(&false) {
            continue;
        }
        closed.insert(current, true);
        visited_count += 1;

        if current == goal {
            return Some(reconstruct(&came_from, start, goal, &g_score, visited_count));
        }

        let current_g = *g_score.get(&current).unwrap_or(&f64::INFINITY);
        for &edge_id in graph.out_edges(current) {
            let edge = graph.edge(edge_id);
            let neighbor = edge.to;
            if *closed.get(&neighbor).unwrap_or(&false) {
                continue;
            }
            let base = edge_weight(graph, edge_id, base_kind);
            let tentative = current_g + weight_fn(edge_id, base);
            let neighbor_best = *g_score.get(&neighbor).unwrap_or(&f64::INFINITY);
            if tentative < neighbor_best {
                g_score.insert(neighbor, tentative);
                came_from.insert(neighbor, (current, edge_id));
                let priority = tentative + heuristic(neighbor);
                match handles.get(&neighbor) {
                    Some(&h) => {
                        let _ = open.decrease_key(h, priority);
                    }
                    None => {
                        let h = open.push(neighbor, priority);
                        handles.insert(neighbor, h);
                    }
                }
            }
        }
    }

    None
}

fn reconstruct(
    came_from: &HashMap<NodeId, (NodeId, EdgeId)>,
    start: NodeId,
    goal: NodeId,
    g_score: &HashMap<NodeId, f64>,
    visited_count: usize,
) -> PathSummary {
    let mut nodes = vec![goal];
    let mut edges = Vec::new();
    let mut current = goal;
    while current != start {
        let (prev, edge_id) = came_from[&current];
        edges.push(edge_id);
        nodes.push(prev);
        current = prev;
    }
    nodes.reverse();
    edges.reverse();
    PathSummary {
        nodes,
        edges,
        total_weight: g_score[&goal],
        visited_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;
    use geo_kernel::{Point, Polyline};

    fn line(x0: f64, y0: f64, x1: f64, y1: f64) -> Polyline {
        Polyline::new(vec![Point::new(x0, y0), Point::new(x1, y1)]).unwrap()
    }

    fn chain_graph() -> Graph {
        GraphBuilder::new()
            .add_edge(line(0.0, 0.0, 1.0, 0.0), false)
            .add_edge(line(1.0, 0.0, 2.0, 0.0), false)
            .add_edge(line(2.0, 0.0, 3.0, 0.0), false)
            .build()
            .unwrap()
    }

    #[test]
    fn finds_path_across_a_chain() {
        let graph = chain_graph();
        let summary = find_path(
            &graph,
            NodeId(0),
            NodeId(3),
            WeightKind::EuclideanLength,
            |_, base| base,
            |_| 0.0,
        )
        .unwrap();
        assert_eq!(summary.edges, vec![EdgeId(0), EdgeId(1), EdgeId(2)]);
        assert_eq!(summary.nodes, vec![NodeId(0), NodeId(1), NodeId(2), NodeId(3)]);
        assert_eq!(summary.total_weight, 3.0);
    }

    #[test]
    fn start_equals_goal_is_a_trivial_path() {
        let graph = chain_graph();
        let summary = find_path(
            &graph,
            NodeId(0),
            NodeId(0),
            WeightKind::EuclideanLength,
            |_, base| base,
            |_| 0.0,
        )
        .unwrap();
        assert!(summary.edges.is_empty());
        assert_eq!(summary.nodes, vec![NodeId(0)]);
    }

    #[test]
    fn unreachable_destination_is_not_an_error() {
        let graph = GraphBuilder::new()
            .add_edge(line(0.0, 0.0, 1.0, 0.0), false)
            .add_edge(line(10.0, 10.0, 11.0, 10.0), false)
            .build()
            .unwrap();
        let summary = find_path(
            &graph,
            NodeId(0),
            NodeId(2),
            WeightKind::EuclideanLength,
            |_, base| base,
            |_| 0.0,
        );
        assert!(summary.is_none());
    }

    #[test]
    fn hop_count_weighting_ignores_distance() {
        let graph = chain_graph();
        let summary = find_path(
            &graph,
            NodeId(0),
            NodeId(3),
            WeightKind::HopCount,
            |_, base| base,
            |_| 0.0,
        )
        .unwrap();
        assert_eq!(summary.total_weight, 3.0);
    }

    #[test]
    fn custom_weight_fn_can_penalize_an_edge() {
        let graph = chain_graph();
        let summary = find_path(
            &graph,
            NodeId(0),
            NodeId(3),
            WeightKind::EuclideanLength,
            |edge_id, base| if edge_id == EdgeId(1) { base + 100.0 } else { base },
            |_| 0.0,
        )
        .unwrap();
        assert_eq!(summary.total_weight, 103.0);
    }
}
