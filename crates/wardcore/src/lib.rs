//! # wardcore
//!
//! Failure detection and prepared-operation durability for a RAMCloud-style
//! storage cluster: a peer-to-peer probing protocol that tells a coordinator
//! when a server has gone unreachable, and the prepared-operations table and
//! log record format that let surviving masters recover in-flight
//! transactions when it does.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                            wardcore                                │
//! │  ┌───────────────┐   ┌──────────────┐   ┌───────────────────┐  │
//! │  │ wardcore-types │   │ wardcore-net  │   │  wardcore-clock    │  │
//! │  │ (ids, locator) │   │ (UDP, Rng)   │   │  (monotonic time)  │  │
//! │  └───────────────┘   └──────────────┘   └───────────────────┘  │
//! │           ▲                  ▲                    ▲              │
//! │           └──────────────────┼────────────────────┘              │
//! │                  ┌───────────┴───────────┐                       │
//! │                  │   wardcore-detector     │ ← dispatch thread     │
//! │                  └───────────┬───────────┘                       │
//! │                              │ DispatchHandle (this crate)        │
//! │                  ┌───────────┴───────────┐                       │
//! │                  │ wardcore-txlog / -txtable │ ← worker threads   │
//! │                  └───────────────────────┘                       │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each subsystem crate can be used independently; this crate wires them
//! together with the dispatch-hop pattern, logging, and configuration
//! loading a real deployment needs.

mod dispatch;
mod error;
mod telemetry;

pub use dispatch::{dispatch_channel, DispatchCommand, DispatchHandle, DispatchQuery, DispatchReceiver, DispatchReply};
pub use error::WardcoreError;
pub use telemetry::init_logging;

pub use wardcore_clock::{Clock, FakeClock, SystemClock};
pub use wardcore_config::{ConfigError, WardcoreConfig};
pub use wardcore_detector::{
    DetectorError, FailureDetector, FailureDetectorConfig, ServerList, TimeoutEntry, TimeoutQueue,
};
pub use wardcore_net::{ChaChaRng, FakeRng, MioNet, Net, Rng, UdpEndpoint};
pub use wardcore_txlog::{
    LogStore, PreparedOpRecord, PreparedOpRecordHeader, PreparedOpTombstone,
    PreparedOpTombstoneHeader, TxLogError, TxParticipant,
};
pub use wardcore_txtable::{ObjectManager, PreparedOps, TxTableError};
pub use wardcore_types::{
    failure_detector_port, parse_all, parse_preferred, ClientLeaseId, Endpoint, KeyHash, LocatorError,
    LogRef, OpKey, OpType, RpcId, SegmentId, ServerType, TableId,
};
