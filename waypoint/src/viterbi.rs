//! The Viterbi map-matcher: a time-indexed DP over candidate edges that
//! assembles the most likely edge sequence for a GPS trace.

use log::{trace, warn};

use geo_kernel::{Point, TopologyCalculator};
use route_graph::{find_path, Graph, WeightKind};

use crate::candidate::{Candidate, CandidateGenerator};
use crate::errors::{MatchError, MatchResult};
use crate::probability::{
    direction_weight, log_pr_emit, log_pr_init, log_pr_trans, ConnectionRelation,
    TransitionContext, TransitionFactor,
};

/// One GPS fix. `timestamp` orders observations within a trace; no factor
/// currently derives a speed from it, but callers building a real trace
/// reader carry it through for future velocity-based factors.
#[derive(Debug, Clone, Copy)]
pub struct Observation {
    pub point: Point,
    pub timestamp: f64,
}

impl Observation {
    pub fn new(point: Point, timestamp: f64) -> Self {
        Observation { point, timestamp }
    }
}

/// The matched edge and on-track snap position for one observation.
#[derive(Debug, Clone, Copy)]
pub struct MatchedStep {
    pub edge_id: route_graph::EdgeId,
    pub snapped: Point,
}

/// Runs the HMM/Viterbi matcher over a single continuous trace. Stateless
/// across traces: build one, call `run` (or `restart_from`), discard it.
pub struct Viterbi<'a, C: TopologyCalculator, G: CandidateGenerator> {
    graph: &'a Graph,
    calc: &'a C,
    generator: &'a G,
    chain: Vec<TransitionFactor>,
    sigma: f64,
    search_radius: f64,
}

impl<'a, C: TopologyCalculator, G: CandidateGenerator> Viterbi<'a, C, G> {
    pub fn new(
        graph: &'a Graph,
        calc: &'a C,
        generator: &'a G,
        chain: Vec<TransitionFactor>,
        sigma: f64,
        search_radius: f64,
    ) -> Self {
        Viterbi {
            graph,
            calc,
            generator,
            chain,
            sigma,
            search_radius,
        }
    }

    fn edge_bearing(&self, edge_id: route_graph::EdgeId) -> f64 {
        let edge = self.graph.edge(edge_id);
        self.calc.initial_bearing(edge.polyline.start(), edge.polyline.end())
    }

    /// Builds the per-pair scoring context for the transition factor chain.
    /// `e' == e` (the same-edge case) needs no graph search: the route
    /// distance is simply the along-track gap between the two projections.
    /// Otherwise an A* query from `e'.to` to `e.from` supplies the
    /// connecting route length and edge count.
    fn build_context(
        &self,
        prev: &Candidate,
        cur: &Candidate,
        observation_distance: f64,
        observation_bearing: f64,
    ) -> TransitionContext {
        let prev_edge = self.graph.edge(prev.edge_id);
        let cur_edge = self.graph.edge(cur.edge_id);
        let path_bearing = Some(self.calc.initial_bearing(prev.snapped, cur.snapped));

        if prev.edge_id == cur.edge_id {
            let along_prev = self.calc.along_track_distance(&prev_edge.polyline, prev.snapped);
            let along_cur = self.calc.along_track_distance(&cur_edge.polyline, cur.snapped);
            return TransitionContext {
                observation_distance,
                path_distance: Some((along_cur - along_prev).abs()),
                connection: ConnectionRelation::SameEdge,
                observation_bearing,
                path_bearing,
                transitions_onto_off_road: false,
                already_off_road: prev_edge.off_road,
                revisits_a_point: false,
            };
        }

        let remaining_on_prev = self.calc.along_track_distance(&prev_edge.polyline, prev_edge.polyline.end())
            - self.calc.along_track_distance(&prev_edge.polyline, prev.snapped);
        let covered_on_cur = self.calc.along_track_distance(&cur_edge.polyline, cur.snapped);

        // A direct 2-edge round trip back to the node the walk just left
        // counts as a U-turn; longer revisits are left to the spatial
        // candidate generator's radius to keep out of range in practice.
        let is_immediate_u_turn = cur_edge.to == prev_edge.from;

        let (path_distance, connection) = if prev_edge.to == cur_edge.from {
            (
                Some(remaining_on_prev + covered_on_cur),
                ConnectionRelation::DirectlyConnected,
            )
        } else {
            match find_path(
                self.graph,
                prev_edge.to,
                cur_edge.from,
                WeightKind::EuclideanLength,
                |_, base| base,
                |_| 0.0,
            ) {
                Some(summary) => (
                    Some(remaining_on_prev + summary.total_weight + covered_on_cur),
                    ConnectionRelation::ConnectedThroughOneEdge,
                ),
                None => (None, ConnectionRelation::Unconnected),
            }
        };

        TransitionContext {
            observation_distance,
            path_distance,
            connection,
            observation_bearing,
            path_bearing,
            transitions_onto_off_road: cur_edge.off_road,
            already_off_road: prev_edge.off_road,
            revisits_a_point: is_immediate_u_turn && path_distance.is_some(),
        }
    }

    /// Matches a single continuous trace, returning one matched edge per
    /// observation.
    pub fn run(&self, observations: &[Observation]) -> MatchResult<Vec<MatchedStep>> {
        if observations.is_empty() {
            return Ok(Vec::new());
        }
        let n = observations.len();

        let mut candidates_per_step: Vec<Vec<Candidate>> = Vec::with_capacity(n);
        for obs in observations {
            let mut cands = self
                .generator
                .generate(self.graph, self.calc, obs.point, self.search_radius);
            cands.sort_by_key(|c| c.edge_id.0);
            candidates_per_step.push(cands);
        }

        if candidates_per_step[0].is_empty() {
            return Err(MatchError::NoCandidate(0));
        }

        let init_log = log_pr_init(candidates_per_step[0].len());
        let mut delta: Vec<Vec<f64>> = vec![candidates_per_step[0]
            .iter()
            .map(|c| init_log + log_pr_emit(c.distance, self.sigma, 1.0))
            .collect()];
        let mut psi: Vec<Vec<Option<usize>>> = vec![vec![None; candidates_per_step[0].len()]];

        for t in 1..n {
            if candidates_per_step[t].is_empty() {
                return Err(MatchError::NoCandidate(t));
            }
            let observation_distance = self.calc.distance(observations[t - 1].point, observations[t].point);
            let observation_bearing = self.calc.initial_bearing(observations[t - 1].point, observations[t].point);

            let n_curr = candidates_per_step[t].len();
            let mut curr_delta = vec![f64::NEG_INFINITY; n_curr];
            let mut curr_psi: Vec<Option<usize>> = vec![None; n_curr];

            for (c_idx, cand) in candidates_per_step[t].iter().enumerate() {
                let road_bearing = self.edge_bearing(cand.edge_id);
                let tau = direction_weight(
                    self.calc,
                    Some(observations[t - 1].point),
                    observations[t].point,
                    road_bearing,
                );
                let emit = log_pr_emit(cand.distance, self.sigma, tau);

                for (p_idx, prev_cand) in candidates_per_step[t - 1].iter().enumerate() {
                    if !delta[t - 1][p_idx].is_finite() {
                        continue;
                    }
                    let ctx = self.build_context(prev_cand, cand, observation_distance, observation_bearing);
                    let trans = log_pr_trans(&self.chain, &ctx);
                    if !trans.is_finite() {
                        continue;
                    }
                    let total = delta[t - 1][p_idx] + trans + emit;
                    // Candidates at `t - 1` are iterated in increasing edge-id
                    // order, so a strict improvement keeps the smallest
                    // predecessor edge id on a tie for free.
                    if total > curr_delta[c_idx] {
                        curr_delta[c_idx] = total;
                        curr_psi[c_idx] = Some(p_idx);
                    }
                }
                trace!("viterbi t={} candidate edge={} score={}", t, cand.edge_id.0, curr_delta[c_idx]);
            }

            delta.push(curr_delta);
            psi.push(curr_psi);
        }

        let last = &delta[n - 1];
        let mut best_idx: Option<usize> = None;
        for (idx, &score) in last.iter().enumerate() {
            if !score.is_finite() {
                continue;
            }
            if best_idx.map_or(true, |best| score > last[best]) {
                best_idx = Some(idx);
            }
        }
        let mut current = match best_idx {
            Some(idx) => idx,
            None => {
                warn!("viterbi found no admissible path at step {}", n - 1);
                return Err(MatchError::NoFeasiblePath(n - 1));
            }
        };

        let mut path_idx = vec![0usize; n];
        path_idx[n - 1] = current;
        for t in (1..n).rev() {
            match psi[t][current] {
                Some(prev) => {
                    path_idx[t - 1] = prev;
                    current = prev;
                }
                None => {
                    warn!("viterbi found no admissible path at step {}", t);
                    return Err(MatchError::NoFeasiblePath(t));
                }
            }
        }

        Ok((0..n)
            .map(|t| {
                let cand = &candidates_per_step[t][path_idx[t]];
                MatchedStep {
                    edge_id: cand.edge_id,
                    snapped: cand.snapped,
                }
            })
            .collect())
    }

    /// Re-runs the matcher from `from` onward with a fresh initial
    /// distribution, the recovery the caller is expected to perform after
    /// a `NoFeasiblePath` failure.
    pub fn restart_from(&self, observations: &[Observation], from: usize) -> MatchResult<Vec<MatchedStep>> {
        self.run(&observations[from..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::RTreeCandidateGenerator;
    use geo_kernel::{EuclideanTopology, Polyline};
    use route_graph::{EdgeId, GraphBuilder};
    use spatial_index::RTreeOptions;

    fn line(x0: f64, y0: f64, x1: f64, y1: f64) -> Polyline {
        Polyline::new(vec![Point::new(x0, y0), Point::new(x1, y1)]).unwrap()
    }

    /// A-B-C-D chain, each edge 10 units long along the x-axis.
    fn chain_graph() -> Graph {
        GraphBuilder::new()
            .add_edge(line(0.0, 0.0, 10.0, 0.0), false)
            .add_edge(line(10.0, 0.0, 20.0, 0.0), false)
            .add_edge(line(20.0, 0.0, 30.0, 0.0), false)
            .build()
            .unwrap()
    }

    #[test]
    fn matches_a_chain_with_observations_at_edge_centers() {
        let graph = chain_graph();
        let generator = RTreeCandidateGenerator::build(&graph, RTreeOptions::default()).unwrap();
        let calc = EuclideanTopology;
        let chain = TransitionFactor::default_chain().to_vec();
        let matcher = Viterbi::new(&graph, &calc, &generator, chain, 10.0, 20.0);

        let observations = vec![
            Observation::new(Point::new(5.0, 0.0), 0.0),
            Observation::new(Point::new(15.0, 0.0), 1.0),
            Observation::new(Point::new(25.0, 0.0), 2.0),
        ];
        let matched = matcher.run(&observations).unwrap();
        let edges: Vec<EdgeId> = matched.iter().map(|s| s.edge_id).collect();
        assert_eq!(edges, vec![EdgeId(0), EdgeId(1), EdgeId(2)]);
    }

    #[test]
    fn empty_trace_matches_to_nothing() {
        let graph = chain_graph();
        let generator = RTreeCandidateGenerator::build(&graph, RTreeOptions::default()).unwrap();
        let calc = EuclideanTopology;
        let matcher = Viterbi::new(&graph, &calc, &generator, TransitionFactor::default_chain().to_vec(), 10.0, 20.0);
        assert!(matcher.run(&[]).unwrap().is_empty());
    }

    #[test]
    fn no_candidates_within_radius_is_a_named_failure() {
        let graph = chain_graph();
        let generator = RTreeCandidateGenerator::build(&graph, RTreeOptions::default()).unwrap();
        let calc = EuclideanTopology;
        let matcher = Viterbi::new(&graph, &calc, &generator, TransitionFactor::default_chain().to_vec(), 10.0, 1.0);
        let observations = vec![
            Observation::new(Point::new(5.0, 100.0), 0.0),
            Observation::new(Point::new(15.0, 0.0), 1.0),
        ];
        assert_eq!(matcher.run(&observations), Err(MatchError::NoCandidate(0)));
    }

    #[test]
    fn restart_from_reruns_the_suffix_fresh() {
        let graph = chain_graph();
        let generator = RTreeCandidateGenerator::build(&graph, RTreeOptions::default()).unwrap();
        let calc = EuclideanTopology;
        let matcher = Viterbi::new(&graph, &calc, &generator, TransitionFactor::default_chain().to_vec(), 10.0, 20.0);
        let observations = vec![
            Observation::new(Point::new(5.0, 0.0), 0.0),
            Observation::new(Point::new(15.0, 0.0), 1.0),
            Observation::new(Point::new(25.0, 0.0), 2.0),
        ];
        let matched = matcher.restart_from(&observations, 1).unwrap();
        let edges: Vec<EdgeId> = matched.iter().map(|s| s.edge_id).collect();
        assert_eq!(edges, vec![EdgeId(1), EdgeId(2)]);
    }
}
