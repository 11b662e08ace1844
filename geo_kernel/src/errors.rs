//! The errors that can occur while building or querying geometry primitives.

use std::error::Error;
use std::fmt;

/// Helper type for a call that could go wrong.
pub type GeoResult<T> = Result<T, GeoError>;

/// Error type for the geometry kernel.
#[derive(Debug, Clone, PartialEq)]
pub enum GeoError {
    /// A parameter was out of its domain, e.g. a non-monotone AABB or an
    /// empty point set passed to a bulk constructor.
    InvalidArgument(String),
    /// Vincenty's inverse or direct formula failed to converge, most often
    /// because the two points are nearly antipodal.
    ConvergenceFailure,
}

impl fmt::Display for GeoError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GeoError::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            GeoError::ConvergenceFailure => {
                write!(f, "geodesic iteration did not converge (near-antipodal points)")
            }
        }
    }
}

impl Error for GeoError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_human_readable() {
        let e = GeoError::InvalidArgument("max_levels must be >= 0".to_string());
        assert_eq!(
            e.to_string(),
            "invalid argument: max_levels must be >= 0"
        );
        assert_eq!(
            GeoError::ConvergenceFailure.to_string(),
            "geodesic iteration did not converge (near-antipodal points)"
        );
    }
}
