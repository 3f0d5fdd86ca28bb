//! Per-request visit recording.
//!
//! A visit runs four backend steps in a fixed order (count, publish, gRPC
//! lookup, HTTP lookup). The first failure aborts the request; side effects
//! of the steps that already ran are kept.

pub mod aggregator;
pub mod error;

pub use aggregator::VisitAggregator;
pub use error::{VisitError, VisitStep};
