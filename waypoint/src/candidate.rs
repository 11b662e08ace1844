//! Candidate edge generation: given an observation point and a search
//! radius, return the edges a GPS fix could plausibly have come from.

use geo_kernel::{BitCode, Point, Region, TopologyCalculator};
use route_graph::{EdgeId, Graph};
use spatial_index::{IndexResult, RTree, RTreeOptions};

/// One admissible edge for an observation: the edge itself, the on-track
/// snap position, and the perpendicular distance used by the emission
/// calculator.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub edge_id: EdgeId,
    pub snapped: Point,
    pub distance: f64,
}

/// Given an observation and a search radius, returns the edges whose
/// polyline could plausibly have produced it. The matcher is generic over
/// any implementation.
pub trait CandidateGenerator {
    fn generate<C: TopologyCalculator + ?Sized>(
        &self,
        graph: &Graph,
        calc: &C,
        observation: Point,
        radius: f64,
    ) -> Vec<Candidate>;
}

fn tag_with_edge(mut bounds: Region, edge_id: EdgeId) -> Region {
    let code = BitCode::root().append(edge_id.0 as u64, 32);
    bounds = bounds.with_code(code);
    bounds
}

fn edge_id_of(region: &Region) -> EdgeId {
    let code = region
        .code()
        .expect("region returned from the candidate index is missing its edge tag");
    EdgeId(code.value_at(0, 32) as u32)
}

/// Candidate generator backed by a dynamic R-tree over every edge
/// polyline's bounding region, each tagged with its owning `EdgeId` via
/// `BitCode` (the same "stamp an opaque id into the unused code slot"
/// trick the hybrid KD-in-Region index uses to keep identically bounded
/// entries distinguishable).
pub struct RTreeCandidateGenerator {
    index: RTree,
}

impl RTreeCandidateGenerator {
    pub fn build(graph: &Graph, options: RTreeOptions) -> IndexResult<Self> {
        let mut index = RTree::new(options)?;
        for i in 0..graph.edge_count() {
            let edge_id = EdgeId(i as u32);
            let edge = graph.edge(edge_id);
            let mut bounds = Region::empty();
            for p in edge.polyline.points() {
                bounds.expand_to_include_point(*p);
            }
            index.insert(tag_with_edge(bounds, edge_id))?;
        }
        Ok(RTreeCandidateGenerator { index })
    }
}

impl CandidateGenerator for RTreeCandidateGenerator {
    fn generate<C: TopologyCalculator + ?Sized>(
        &self,
        graph: &Graph,
        calc: &C,
        observation: Point,
        radius: f64,
    ) -> Vec<Candidate> {
        let probe = Region::of_min_max(
            observation.x - radius,
            observation.y - radius,
            observation.x + radius,
            observation.y + radius,
        )
        .expect("radius-expanded probe is always monotone");

        self.index
            .query(&probe)
            .into_iter()
            .map(|region| edge_id_of(&region))
            .filter_map(|edge_id| {
                let edge = graph.edge(edge_id);
                let snapped = calc.on_track_closest_point(&edge.polyline, observation);
                let distance = calc.distance(observation, snapped);
                if distance <= radius {
                    Some(Candidate {
                        edge_id,
                        snapped,
                        distance,
                    })
                } else {
                    None
                }
            })
            .collect()
    }
}
