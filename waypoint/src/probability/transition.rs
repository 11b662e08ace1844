//! Transition probability: a sum of pluggable log-contribution factors
//! scoring the move from one candidate edge to the next. Represented as a
//! tagged enum evaluated in a fixed loop rather than dynamic dispatch, per
//! the "abstract strategies" design used across this crate family.

/// How two candidate edges relate in the road graph, used by the
/// `Topological` factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionRelation {
    SameEdge,
    DirectlyConnected,
    ConnectedThroughOneEdge,
    Unconnected,
}

/// Everything a `TransitionFactor` needs to score one candidate-to-candidate
/// move, computed once per pair by the Viterbi step before the factor loop
/// runs.
#[derive(Debug, Clone, Copy)]
pub struct TransitionContext {
    /// Great-circle (or plane) distance between the two observations.
    pub observation_distance: f64,
    /// Shortest-path distance between the projected points on the
    /// candidate path, or `None` if no path connects them.
    pub path_distance: Option<f64>,
    pub connection: ConnectionRelation,
    /// Bearing from the previous to the current observation, degrees.
    pub observation_bearing: f64,
    /// Bearing of travel along the candidate path, degrees, or `None` on
    /// the same-edge transition where no path was computed.
    pub path_bearing: Option<f64>,
    pub transitions_onto_off_road: bool,
    pub already_off_road: bool,
    /// Whether the candidate path revisits any point already visited
    /// earlier in the match.
    pub revisits_a_point: bool,
}

#[derive(Debug, Clone, Copy)]
pub enum TransitionFactor {
    ShortestPath { p_same_or_diff: f64, beta: f64 },
    Topological,
    Direction,
    OffRoad { phi: f64, psi: f64 },
    NoUTurn,
}

impl TransitionFactor {
    /// The five factors with the documented default parameters, in the
    /// order they are evaluated.
    pub fn default_chain() -> [TransitionFactor; 5] {
        [
            TransitionFactor::ShortestPath {
                p_same_or_diff: 0.6,
                beta: 30.0,
            },
            TransitionFactor::Topological,
            TransitionFactor::Direction,
            TransitionFactor::OffRoad { phi: 0.2, psi: 0.48 },
            TransitionFactor::NoUTurn,
        ]
    }

    pub fn log_contribution(&self, ctx: &TransitionContext) -> f64 {
        match *self {
            TransitionFactor::ShortestPath { p_same_or_diff, beta } => {
                let path_distance = match ctx.path_distance {
                    Some(d) if d >= 0.0 => d,
                    _ => return f64::NEG_INFINITY,
                };
                let gamma = 1.0 / beta;
                let mismatch = (ctx.observation_distance - path_distance).abs();
                p_same_or_diff.ln() + gamma.ln() - gamma * mismatch
            }
            TransitionFactor::Topological => match ctx.connection {
                ConnectionRelation::SameEdge => 0.6f64.ln(),
                ConnectionRelation::DirectlyConnected => 0.4f64.ln(),
                ConnectionRelation::ConnectedThroughOneEdge => 0.2f64.ln(),
                ConnectionRelation::Unconnected => f64::NEG_INFINITY,
            },
            TransitionFactor::Direction => match ctx.path_bearing {
                Some(path_bearing) => {
                    let delta = (ctx.observation_bearing - path_bearing).to_radians();
                    delta.cos().abs().ln()
                }
                None => 0.0,
            },
            TransitionFactor::OffRoad { phi, psi } => {
                if ctx.already_off_road {
                    psi.ln()
                } else if ctx.transitions_onto_off_road {
                    phi.ln()
                } else {
                    0.0
                }
            }
            TransitionFactor::NoUTurn => {
                if ctx.revisits_a_point {
                    f64::NEG_INFINITY
                } else {
                    0.0
                }
            }
        }
    }
}

/// Sums an ordered chain of factors, short-circuiting to `f64::NEG_INFINITY`
/// as soon as the running total stops being finite.
pub fn log_pr_trans(chain: &[TransitionFactor], ctx: &TransitionContext) -> f64 {
    let mut total = 0.0;
    for factor in chain {
        if !total.is_finite() {
            return f64::NEG_INFINITY;
        }
        total += factor.log_contribution(ctx);
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_ctx() -> TransitionContext {
        TransitionContext {
            observation_distance: 100.0,
            path_distance: Some(100.0),
            connection: ConnectionRelation::DirectlyConnected,
            observation_bearing: 90.0,
            path_bearing: Some(90.0),
            transitions_onto_off_road: false,
            already_off_road: false,
            revisits_a_point: false,
        }
    }

    #[test]
    fn shortest_path_factor_is_zero_penalty_on_exact_match() {
        let factor = TransitionFactor::ShortestPath {
            p_same_or_diff: 0.6,
            beta: 30.0,
        };
        let ctx = base_ctx();
        let contribution = factor.log_contribution(&ctx);
        assert!((contribution - (0.6f64.ln() + (1.0 / 30.0f64).ln())).abs() < 1e-9);
    }

    #[test]
    fn shortest_path_factor_penalizes_mismatch() {
        let factor = TransitionFactor::ShortestPath {
            p_same_or_diff: 0.6,
            beta: 30.0,
        };
        let mut ctx = base_ctx();
        ctx.path_distance = Some(250.0);
        let mismatched = factor.log_contribution(&ctx);
        ctx.path_distance = Some(100.0);
        let matched = factor.log_contribution(&ctx);
        assert!(mismatched < matched);
    }

    #[test]
    fn shortest_path_factor_rejects_a_missing_path() {
        let factor = TransitionFactor::ShortestPath {
            p_same_or_diff: 0.6,
            beta: 30.0,
        };
        let mut ctx = base_ctx();
        ctx.path_distance = None;
        assert_eq!(factor.log_contribution(&ctx), f64::NEG_INFINITY);
    }

    #[test]
    fn direction_plugin_matches_worked_example() {
        let factor = TransitionFactor::Direction;
        let mut ctx = base_ctx();
        ctx.observation_bearing = 90.0;
        ctx.path_bearing = Some(270.0);
        assert_eq!(factor.log_contribution(&ctx), 0.0);

        ctx.path_bearing = Some(90.0);
        assert_eq!(factor.log_contribution(&ctx), 0.0);

        ctx.path_bearing = Some(0.0);
        assert_eq!(factor.log_contribution(&ctx), f64::NEG_INFINITY);
    }

    #[test]
    fn topological_unconnected_is_impossible() {
        let factor = TransitionFactor::Topological;
        let mut ctx = base_ctx();
        ctx.connection = ConnectionRelation::Unconnected;
        assert_eq!(factor.log_contribution(&ctx), f64::NEG_INFINITY);
    }

    #[test]
    fn no_u_turn_forbids_a_revisit() {
        let factor = TransitionFactor::NoUTurn;
        let mut ctx = base_ctx();
        ctx.revisits_a_point = true;
        assert_eq!(factor.log_contribution(&ctx), f64::NEG_INFINITY);
    }

    #[test]
    fn chain_short_circuits_once_non_finite() {
        let mut ctx = base_ctx();
        ctx.connection = ConnectionRelation::Unconnected;
        let chain = TransitionFactor::default_chain();
        assert_eq!(log_pr_trans(&chain, &ctx), f64::NEG_INFINITY);
    }
}
