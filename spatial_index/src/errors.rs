//! Errors raised by the spatial index family.

use std::error::Error;
use std::fmt;

use geo_kernel::GeoError;

pub type IndexResult<T> = Result<T, IndexError>;

/// Error type shared by the quadtree, R-tree family, K-D tree and hybrid
/// index.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexError {
    /// A constructor or option was given a value outside its domain (a
    /// non-positive capacity, a negative level cap, a zero-length bulk-load
    /// input).
    InvalidArgument(String),
    /// An operation was attempted against a structure whose state forbids
    /// it, e.g. inserting into a Hilbert-packed R-tree after `build`.
    IllegalState(String),
    /// A geometry operation underlying the index failed.
    Geometry(GeoError),
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            IndexError::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            IndexError::IllegalState(msg) => write!(f, "illegal state: {}", msg),
            IndexError::Geometry(e) => write!(f, "geometry error: {}", e),
        }
    }
}

impl Error for IndexError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            IndexError::Geometry(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GeoError> for IndexError {
    fn from(e: GeoError) -> Self {
        IndexError::Geometry(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_human_readable() {
        let e = IndexError::IllegalState("cannot insert after build".to_string());
        assert_eq!(e.to_string(), "illegal state: cannot insert after build");
    }

    #[test]
    fn wraps_geometry_errors() {
        let e: IndexError = GeoError::ConvergenceFailure.into();
        assert!(e.to_string().contains("geometry error"));
    }
}
