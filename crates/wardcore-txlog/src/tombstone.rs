//! `PreparedOpTombstone`: marks a prepared op as resolved (committed or
//! aborted), symmetric in checksum discipline to `PreparedOpRecord`.
//!
//! Layout (little-endian, packed, no padding):
//! ```text
//! [ table_id: u64 | key_hash: u64 | client_lease_id: u64 | rpc_id: u64
//!   | segment_id: u64 | checksum: u32 ]
//! ```
//! A tombstone has no participants or object; it is a fixed-size header.
//! It carries the `segment_id` of the record it supersedes so log cleaning
//! can evict both together once that segment is no longer live.

use crate::error::TxLogError;
use bytes::{Bytes, BytesMut};
use wardcore_crypto::Crc32c;
use wardcore_types::{ClientLeaseId, KeyHash, RpcId, SegmentId, TableId};

const TOMBSTONE_TAIL_LEN: usize = 8 * 5;
const TOMBSTONE_LEN: usize = TOMBSTONE_TAIL_LEN + 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreparedOpTombstoneHeader {
    pub table_id: TableId,
    pub key_hash: KeyHash,
    pub client_lease_id: ClientLeaseId,
    pub rpc_id: RpcId,
    pub segment_id: SegmentId,
    pub checksum: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreparedOpTombstone {
    pub header: PreparedOpTombstoneHeader,
}

impl PreparedOpTombstone {
    #[must_use]
    pub fn new(
        table_id: TableId,
        key_hash: KeyHash,
        client_lease_id: ClientLeaseId,
        rpc_id: RpcId,
        segment_id: SegmentId,
    ) -> Self {
        let checksum =
            Self::compute_checksum(table_id, key_hash, client_lease_id, rpc_id, segment_id);
        Self {
            header: PreparedOpTombstoneHeader {
                table_id,
                key_hash,
                client_lease_id,
                rpc_id,
                segment_id,
                checksum,
            },
        }
    }

    pub fn compute_checksum(
        table_id: TableId,
        key_hash: KeyHash,
        client_lease_id: ClientLeaseId,
        rpc_id: RpcId,
        segment_id: SegmentId,
    ) -> u32 {
        let mut hasher = Crc32c::new();
        hasher.update(&table_id.get().to_le_bytes());
        hasher.update(&key_hash.get().to_le_bytes());
        hasher.update(&client_lease_id.get().to_le_bytes());
        hasher.update(&rpc_id.get().to_le_bytes());
        hasher.update(&segment_id.get().to_le_bytes());
        hasher.finalize()
    }

    pub fn assemble_for_log(&self, out: &mut BytesMut) {
        out.extend_from_slice(&self.header.table_id.get().to_le_bytes());
        out.extend_from_slice(&self.header.key_hash.get().to_le_bytes());
        out.extend_from_slice(&self.header.client_lease_id.get().to_le_bytes());
        out.extend_from_slice(&self.header.rpc_id.get().to_le_bytes());
        out.extend_from_slice(&self.header.segment_id.get().to_le_bytes());
        out.extend_from_slice(&self.header.checksum.to_le_bytes());
    }

    #[must_use]
    pub fn check_integrity(&self) -> bool {
        let computed = Self::compute_checksum(
            self.header.table_id,
            self.header.key_hash,
            self.header.client_lease_id,
            self.header.rpc_id,
            self.header.segment_id,
        );
        computed == self.header.checksum
    }

    pub fn from_bytes(data: &Bytes) -> Result<Self, TxLogError> {
        if data.len() < TOMBSTONE_LEN {
            return Err(TxLogError::Truncated {
                need: TOMBSTONE_LEN,
                have: data.len(),
            });
        }

        let table_id = TableId::new(u64::from_le_bytes(data[0..8].try_into().unwrap()));
        let key_hash = KeyHash::new(u64::from_le_bytes(data[8..16].try_into().unwrap()));
        let client_lease_id =
            ClientLeaseId::new(u64::from_le_bytes(data[16..24].try_into().unwrap()));
        let rpc_id = RpcId::new(u64::from_le_bytes(data[24..32].try_into().unwrap()));
        let segment_id = SegmentId::new(u64::from_le_bytes(data[32..40].try_into().unwrap()));
        let checksum = u32::from_le_bytes(data[40..44].try_into().unwrap());

        let computed =
            Self::compute_checksum(table_id, key_hash, client_lease_id, rpc_id, segment_id);
        if computed != checksum {
            return Err(TxLogError::Checksum {
                expected: checksum,
                computed,
            });
        }

        Ok(Self {
            header: PreparedOpTombstoneHeader {
                table_id,
                key_hash,
                client_lease_id,
                rpc_id,
                segment_id,
                checksum,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PreparedOpTombstone {
        PreparedOpTombstone::new(
            TableId::new(1),
            KeyHash::new(100),
            ClientLeaseId::new(7),
            RpcId::new(11),
            SegmentId::new(42),
        )
    }

    #[test]
    fn round_trips_and_checks_integrity() {
        let tombstone = sample();
        assert!(tombstone.check_integrity());

        let mut buf = BytesMut::new();
        tombstone.assemble_for_log(&mut buf);

        let parsed = PreparedOpTombstone::from_bytes(&buf.freeze()).unwrap();
        assert_eq!(parsed, tombstone);
    }

    #[test]
    fn single_bit_flip_breaks_integrity() {
        let tombstone = sample();
        let mut buf = BytesMut::new();
        tombstone.assemble_for_log(&mut buf);

        let mut corrupted = buf.to_vec();
        corrupted[0] ^= 0x01;

        let result = PreparedOpTombstone::from_bytes(&Bytes::from(corrupted));
        assert!(matches!(result, Err(TxLogError::Checksum { .. })));
    }
}
