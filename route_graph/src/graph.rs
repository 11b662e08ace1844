//! The directed road graph: nodes keyed by stable small-integer ids, edges
//! carrying a polyline and an `off_road` flag. Built via `GraphBuilder`,
//! which merges coincident (or near-coincident, within a tolerance)
//! endpoints into shared nodes using a bulk-built K-D tree rather than an
//! O(n^2) scan over every pair of endpoints.

use hashbrown::HashMap;
use smallvec::SmallVec;

use geo_kernel::{Point, Polyline};
use spatial_index::KdTree;

use crate::errors::{GraphError, GraphResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub u32);

#[derive(Debug, Clone)]
pub struct Node {
    pub point: Point,
    pub(crate) out_edges: SmallVec<[EdgeId; 4]>,
}

#[derive(Debug, Clone)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub polyline: Polyline,
    /// Marks a transition from a roadway onto a non-road endpoint, e.g. a
    /// destination building's access point.
    pub off_road: bool,
}

/// The directed road network the pathfinder and matcher operate over.
#[derive(Debug, Clone)]
pub struct Graph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

impl Graph {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.0 as usize]
    }

    pub fn out_edges(&self, id: NodeId) -> &[EdgeId] {
        &self.nodes[id.0 as usize].out_edges
    }
}

struct RawEdge {
    polyline: Polyline,
    off_road: bool,
}

/// Accumulates edges, then resolves shared nodes and builds an immutable
/// `Graph`.
#[derive(Default)]
pub struct GraphBuilder {
    merge_tolerance: f64,
    raw_edges: Vec<RawEdge>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        GraphBuilder {
            merge_tolerance: 0.0,
            raw_edges: Vec::new(),
        }
    }

    /// Endpoints within `tolerance` (in the polyline's own coordinate
    /// units) of each other are merged into a single node. Zero merges
    /// only exactly coincident endpoints.
    pub fn with_merge_tolerance(mut self, tolerance: f64) -> Self {
        self.merge_tolerance = tolerance;
        self
    }

    pub fn add_edge(mut self, polyline: Polyline, off_road: bool) -> Self {
        self.raw_edges.push(RawEdge { polyline, off_road });
        self
    }

    pub fn build(self) -> GraphResult<Graph> {
        if self.raw_edges.is_empty() {
            return Err(GraphError::InvalidArgument(
                "cannot build a graph with no edges".to_string(),
            ));
        }

        let endpoints: Vec<Point> = self
            .raw_edges
            .iter()
            .flat_map(|e| [e.polyline.start(), e.polyline.end()])
            .collect();

        let mut by_value: HashMap<(u64, u64), SmallVec<[usize; 4]>> = HashMap::new();
        for (i, p) in endpoints.iter().enumerate() {
            by_value.entry(bit_key(*p)).or_default().push(i);
        }

        let mut parent: Vec<usize> = (0..endpoints.len()).collect();

        if self.merge_tolerance > 0.0 {
            let tree = KdTree::build(endpoints.clone())?;
            for (i, p) in endpoints.iter().enumerate() {
                let lo = Point::new(p.x - self.merge_tolerance, p.y - self.merge_tolerance);
                let hi = Point::new(p.x + self.merge_tolerance, p.y + self.merge_tolerance);
                for neighbor in tree.range(lo, hi) {
                    if let Some(indices) = by_value.get(&bit_key(neighbor)) {
                        for &j in indices {
                            union(&mut parent, i, j);
                        }
                    }
                }
            }
        } else {
            for (_, indices) in by_value.iter() {
                for window in indices.windows(2) {
                    union(&mut parent, window[0], window[1]);
                }
            }
        }

        let mut node_id_of_root: HashMap<usize, NodeId> = HashMap::new();
        let mut nodes: Vec<Node> = Vec::new();
        let mut endpoint_node = vec![NodeId(0); endpoints.len()];
        for i in 0..endpoints.len() {
            let root = find(&mut parent, i);
            let node_id = *node_id_of_root.entry(root).or_insert_with(|| {
                let id = NodeId(nodes.len() as u32);
                nodes.push(Node {
                    point: endpoints[root],
                    out_edges: SmallVec::new(),
                });
                id
            });
            endpoint_node[i] = node_id;
        }

        let mut edges = Vec::with_capacity(self.raw_edges.len());
        for (k, raw) in self.raw_edges.into_iter().enumerate() {
            let from = endpoint_node[k * 2];
            let to = endpoint_node[k * 2 + 1];
            let edge_id = EdgeId(k as u32);
            nodes[from.0 as usize].out_edges.push(edge_id);
            edges.push(Edge {
                from,
                to,
                polyline: raw.polyline,
                off_road: raw.off_road,
            });
        }

        Ok(Graph { nodes, edges })
    }
}

fn bit_key(p: Point) -> (u64, u64) {
    (p.x.to_bits(), p.y.to_bits())
}

fn find(parent: &mut [usize], i: usize) -> usize {
    if parent[i] != i {
        parent[i] = find(parent, parent[i]);
    }
    parent[i]
}

fn union(parent: &mut [usize], a: usize, b: usize) {
    let ra = find(parent, a);
    let rb = find(parent, b);
    if ra != rb {
        parent[ra] = rb;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(x0: f64, y0: f64, x1: f64, y1: f64) -> Polyline {
        Polyline::new(vec![Point::new(x0, y0), Point::new(x1, y1)]).unwrap()
    }

    #[test]
    fn rejects_empty_edge_set() {
        assert!(GraphBuilder::new().build().is_err());
    }

    #[test]
    fn exactly_coincident_endpoints_share_a_node() {
        let graph = GraphBuilder::new()
            .add_edge(line(0.0, 0.0, 10.0, 0.0), false)
            .add_edge(line(10.0, 0.0, 10.0, 10.0), false)
            .build()
            .unwrap();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn near_coincident_endpoints_merge_within_tolerance() {
        let graph = GraphBuilder::new()
            .with_merge_tolerance(0.5)
            .add_edge(line(0.0, 0.0, 10.0, 0.0), false)
            .add_edge(line(10.2, 0.1, 10.0, 10.0), false)
            .build()
            .unwrap();
        assert_eq!(graph.node_count(), 3);
    }

    #[test]
    fn endpoints_outside_tolerance_stay_distinct() {
        let graph = GraphBuilder::new()
            .with_merge_tolerance(0.01)
            .add_edge(line(0.0, 0.0, 10.0, 0.0), false)
            .add_edge(line(10.2, 0.1, 10.0, 10.0), false)
            .build()
            .unwrap();
        assert_eq!(graph.node_count(), 4);
    }

    #[test]
    fn off_road_flag_is_preserved() {
        let graph = GraphBuilder::new()
            .add_edge(line(0.0, 0.0, 1.0, 1.0), true)
            .build()
            .unwrap();
        assert!(graph.edge(EdgeId(0)).off_road);
    }
}
