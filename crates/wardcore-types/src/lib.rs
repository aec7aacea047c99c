//! Shared identifiers and locator parsing used across the wardcore crates.

mod ids;
mod locator;

pub use ids::{
    ClientLeaseId, KeyHash, LogRef, OpKey, OpType, RpcId, SegmentId, ServerType, TableId,
};
pub use locator::{failure_detector_port, parse_all, parse_preferred, Endpoint, LocatorError};
