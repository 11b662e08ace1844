//! Errors raised by the graph, the Fibonacci heap and the pathfinder.

use std::error::Error;
use std::fmt;

use geo_kernel::GeoError;
use spatial_index::IndexError;

pub type GraphResult<T> = Result<T, GraphError>;

#[derive(Debug, Clone, PartialEq)]
pub enum GraphError {
    InvalidArgument(String),
    /// An operation was attempted against a structure whose state forbids
    /// it, e.g. `decrease_key` with a larger key than the node currently
    /// holds.
    IllegalState(String),
    Geometry(GeoError),
    Index(IndexError),
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GraphError::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            GraphError::IllegalState(msg) => write!(f, "illegal state: {}", msg),
            GraphError::Geometry(e) => write!(f, "geometry error: {}", e),
            GraphError::Index(e) => write!(f, "index error: {}", e),
        }
    }
}

impl Error for GraphError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            GraphError::Geometry(e) => Some(e),
            GraphError::Index(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GeoError> for GraphError {
    fn from(e: GeoError) -> Self {
        GraphError::Geometry(e)
    }
}

impl From<IndexError> for GraphError {
    fn from(e: IndexError) -> Self {
        GraphError::Index(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_human_readable() {
        let e = GraphError::IllegalState("decrease_key given a larger key".to_string());
        assert_eq!(e.to_string(), "illegal state: decrease_key given a larger key");
    }
}
