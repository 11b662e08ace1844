//! Geometry primitives and topology calculators shared by the spatial index,
//! route graph and map matcher: plain coordinate types (`Point`, `Region`,
//! `Polyline`, `BitCode`) plus the `TopologyCalculator` trait that supplies
//! the distance/bearing semantics those types don't carry themselves.

pub mod bitcode;
pub mod errors;
pub mod point;
pub mod polyline;
pub mod region;
pub mod topology;

pub use bitcode::{BitCode, Quadrant};
pub use errors::{GeoError, GeoResult};
pub use point::Point;
pub use polyline::Polyline;
pub use region::Region;
pub use topology::{Ellipsoid, EuclideanTopology, TopologyCalculator, VincentyTopology};
