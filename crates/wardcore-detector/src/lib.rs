//! Peer-to-peer failure detection: a probing loop with a timeout queue that
//! alerts a coordinator when a peer goes unreachable, and that services the
//! coordinator's own proxy probes and membership queries.

mod detector;
mod error;
mod server_list;
mod timeout_queue;
mod wire;

pub use detector::{FailureDetector, FailureDetectorConfig};
pub use error::DetectorError;
pub use server_list::ServerList;
pub use timeout_queue::{TimeoutEntry, TimeoutQueue};
pub use wire::{
    GetServerListRequest, GetServerListResponse, HintServerDown, PingMessage, ProxyPingRequest,
    ProxyPingResponse, ServerListEntry, COORD_PROBE_FLAG, UNREACHABLE_REPLY_NANOS,
};
