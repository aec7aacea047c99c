//! Prepared-ops table errors.

use thiserror::Error;
use wardcore_types::{ClientLeaseId, RpcId};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TxTableError {
    #[error("duplicate prepared op for (lease={lease_id}, rpc={rpc_id})")]
    Duplicate {
        lease_id: ClientLeaseId,
        rpc_id: RpcId,
    },
}
