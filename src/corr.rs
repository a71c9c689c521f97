//! Pairwise derived-allele correlation between sites within a lag window.
pub mod curve;
pub mod engine;
pub mod nuclcov;
pub mod window;

pub use curve::{Curve, CurveRow, StatKind};
pub use engine::{Accumulator, Admission, CorrelationEngine, EngineState, EngineStats, Error};
