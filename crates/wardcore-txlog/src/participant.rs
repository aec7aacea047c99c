//! Transaction participant descriptors.

use crate::error::TxLogError;
use wardcore_types::{KeyHash, RpcId, TableId};

/// One operation of the enclosing transaction, used during recovery to
/// rendezvous every participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxParticipant {
    pub table_id: TableId,
    pub key_hash: KeyHash,
    pub rpc_id: RpcId,
}

impl TxParticipant {
    pub const ENCODED_LEN: usize = 24;

    pub(crate) fn write_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.table_id.get().to_le_bytes());
        buf.extend_from_slice(&self.key_hash.get().to_le_bytes());
        buf.extend_from_slice(&self.rpc_id.get().to_le_bytes());
    }

    pub(crate) fn read_from(bytes: &[u8]) -> Result<Self, TxLogError> {
        if bytes.len() < Self::ENCODED_LEN {
            return Err(TxLogError::Truncated {
                need: Self::ENCODED_LEN,
                have: bytes.len(),
            });
        }
        let table_id = TableId::new(u64::from_le_bytes(bytes[0..8].try_into().unwrap()));
        let key_hash = KeyHash::new(u64::from_le_bytes(bytes[8..16].try_into().unwrap()));
        let rpc_id = RpcId::new(u64::from_le_bytes(bytes[16..24].try_into().unwrap()));
        Ok(Self {
            table_id,
            key_hash,
            rpc_id,
        })
    }

    pub(crate) fn read_all(bytes: &[u8], count: u32) -> Result<Vec<Self>, TxLogError> {
        let count = count as usize;
        let need = count * Self::ENCODED_LEN;
        if bytes.len() < need {
            return Err(TxLogError::Truncated {
                need,
                have: bytes.len(),
            });
        }
        (0..count)
            .map(|i| Self::read_from(&bytes[i * Self::ENCODED_LEN..]))
            .collect()
    }
}
