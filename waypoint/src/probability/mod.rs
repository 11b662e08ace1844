//! Log-space HMM probability calculators: emission, initial-state and
//! transition scoring.

pub mod emission;
pub mod initial;
pub mod transition;

pub use emission::{direction_weight, log_pr_emit};
pub use initial::log_pr_init;
pub use transition::{log_pr_trans, ConnectionRelation, TransitionContext, TransitionFactor};
