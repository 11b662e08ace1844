//! Offline and online map matching: snaps a GPS trace onto a road graph
//! with an HMM/Viterbi model over candidate edges.

pub mod candidate;
pub mod errors;
pub mod probability;
pub mod viterbi;

pub use candidate::{Candidate, CandidateGenerator, RTreeCandidateGenerator};
pub use errors::{MatchError, MatchResult};
pub use probability::{
    direction_weight, log_pr_emit, log_pr_init, log_pr_trans, ConnectionRelation,
    TransitionContext, TransitionFactor,
};
pub use viterbi::{MatchedStep, Observation, Viterbi};
