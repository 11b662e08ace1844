//! Errors raised while matching a trace against the road graph.

use std::error::Error;
use std::fmt;

use geo_kernel::GeoError;
use route_graph::GraphError;
use spatial_index::IndexError;

pub type MatchResult<T> = Result<T, MatchError>;

#[derive(Debug, Clone, PartialEq)]
pub enum MatchError {
    /// The candidate generator returned no edges at all for observation `t`.
    NoCandidate(usize),
    /// Every transition into observation `t`'s candidates scored
    /// `f64::NEG_INFINITY`; the lattice has no admissible path through `t`.
    NoFeasiblePath(usize),
    Geometry(GeoError),
    Index(IndexError),
    Graph(GraphError),
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MatchError::NoCandidate(t) => {
                write!(f, "no candidate edges at observation {}", t)
            }
            MatchError::NoFeasiblePath(t) => {
                write!(f, "no feasible path reaches observation {}", t)
            }
            MatchError::Geometry(e) => write!(f, "geometry error: {}", e),
            MatchError::Index(e) => write!(f, "index error: {}", e),
            MatchError::Graph(e) => write!(f, "graph error: {}", e),
        }
    }
}

impl Error for MatchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MatchError::Geometry(e) => Some(e),
            MatchError::Index(e) => Some(e),
            MatchError::Graph(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GeoError> for MatchError {
    fn from(e: GeoError) -> Self {
        MatchError::Geometry(e)
    }
}

impl From<IndexError> for MatchError {
    fn from(e: IndexError) -> Self {
        MatchError::Index(e)
    }
}

impl From<GraphError> for MatchError {
    fn from(e: GraphError) -> Self {
        MatchError::Graph(e)
    }
}
