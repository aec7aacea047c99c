//! `PreparedOpRecord`: the on-log binary format for a staged transaction
//! operation.
//!
//! Layout (little-endian, packed, no padding):
//! ```text
//! [ op_type: u8 | client_id: u64 | rpc_id: u64 | participant_count: u32 | checksum: u32
//!   | TxParticipant[participant_count] | object bytes ]
//! ```
//! `checksum` is CRC32C over every other byte of the record: the header
//! fields before it, then the participants, then the object. This layout is
//! a public contract with peers reading the log; it must never change shape.

use crate::error::TxLogError;
use crate::participant::TxParticipant;
use bytes::{Bytes, BytesMut};
use wardcore_crypto::Crc32c;
use wardcore_types::{ClientLeaseId, OpType, RpcId};

/// Header fields, excluding `checksum`, in on-wire order.
const HEADER_TAIL_LEN: usize = 1 + 8 + 8 + 4;
/// Full header length including `checksum`.
const HEADER_LEN: usize = HEADER_TAIL_LEN + 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreparedOpRecordHeader {
    pub op_type: OpType,
    pub client_id: ClientLeaseId,
    pub rpc_id: RpcId,
    pub participant_count: u32,
    pub checksum: u32,
}

/// A prepared-op log record: a staged two-phase-commit operation, durably
/// logged and held as an in-memory lock until the decision phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedOpRecord {
    pub header: PreparedOpRecordHeader,
    pub participants: Vec<TxParticipant>,
    /// The post-commit payload (key+value) for WRITE; keys-only for
    /// READ/REMOVE.
    pub object: Bytes,
}

impl PreparedOpRecord {
    /// Builds a new record from its fields, computing and storing the
    /// checksum.
    #[must_use]
    pub fn new(
        op_type: OpType,
        client_id: ClientLeaseId,
        rpc_id: RpcId,
        participants: Vec<TxParticipant>,
        object: Bytes,
    ) -> Self {
        let participant_count = u32::try_from(participants.len()).expect("participant count overflow");
        let checksum = Self::compute_checksum(
            op_type,
            client_id,
            rpc_id,
            participant_count,
            &participants,
            &object,
        );
        Self {
            header: PreparedOpRecordHeader {
                op_type,
                client_id,
                rpc_id,
                participant_count,
                checksum,
            },
            participants,
            object,
        }
    }

    /// Computes the CRC32C checksum deterministically from the record's
    /// fields. Used both when constructing a fresh record and when
    /// re-verifying one read back from the log.
    pub fn compute_checksum(
        op_type: OpType,
        client_id: ClientLeaseId,
        rpc_id: RpcId,
        participant_count: u32,
        participants: &[TxParticipant],
        object: &[u8],
    ) -> u32 {
        let mut hasher = Crc32c::new();
        hasher.update(&[op_type as u8]);
        hasher.update(&client_id.get().to_le_bytes());
        hasher.update(&rpc_id.get().to_le_bytes());
        hasher.update(&participant_count.to_le_bytes());
        for participant in participants {
            let mut buf = Vec::with_capacity(TxParticipant::ENCODED_LEN);
            participant.write_into(&mut buf);
            hasher.update(&buf);
        }
        hasher.update(object);
        hasher.finalize()
    }

    /// Appends the record's on-log bytes to `out`: header, then
    /// participants, then object.
    pub fn assemble_for_log(&self, out: &mut BytesMut) {
        out.extend_from_slice(&[self.header.op_type as u8]);
        out.extend_from_slice(&self.header.client_id.get().to_le_bytes());
        out.extend_from_slice(&self.header.rpc_id.get().to_le_bytes());
        out.extend_from_slice(&self.header.participant_count.to_le_bytes());
        out.extend_from_slice(&self.header.checksum.to_le_bytes());
        let mut participant_bytes = Vec::with_capacity(self.participants.len() * TxParticipant::ENCODED_LEN);
        for participant in &self.participants {
            participant.write_into(&mut participant_bytes);
        }
        out.extend_from_slice(&participant_bytes);
        out.extend_from_slice(&self.object);
    }

    /// Recomputes the checksum over the same span used at construction and
    /// compares it to the stored header value.
    #[must_use]
    pub fn check_integrity(&self) -> bool {
        let computed = Self::compute_checksum(
            self.header.op_type,
            self.header.client_id,
            self.header.rpc_id,
            self.header.participant_count,
            &self.participants,
            &self.object,
        );
        computed == self.header.checksum
    }

    /// Parses a record from a log buffer view. The object's length is not
    /// carried in the header; it is whatever remains in `data` after the
    /// header and participant array, since a `LogStore::read` returns
    /// exactly the bytes a matching `append` wrote.
    pub fn from_bytes(data: &Bytes) -> Result<Self, TxLogError> {
        if data.len() < HEADER_LEN {
            return Err(TxLogError::Truncated {
                need: HEADER_LEN,
                have: data.len(),
            });
        }

        let op_type_byte = data[0];
        let op_type =
            OpType::from_u8(op_type_byte).ok_or(TxLogError::UnknownOpType(op_type_byte))?;
        let client_id = ClientLeaseId::new(u64::from_le_bytes(data[1..9].try_into().unwrap()));
        let rpc_id = RpcId::new(u64::from_le_bytes(data[9..17].try_into().unwrap()));
        let participant_count = u32::from_le_bytes(data[17..21].try_into().unwrap());
        let checksum = u32::from_le_bytes(data[21..25].try_into().unwrap());

        let participants_len = participant_count as usize * TxParticipant::ENCODED_LEN;
        let need = HEADER_LEN + participants_len;
        if data.len() < need {
            return Err(TxLogError::Truncated {
                need,
                have: data.len(),
            });
        }
        let participants_bytes = data.slice(HEADER_LEN..HEADER_LEN + participants_len);
        let participants = TxParticipant::read_all(&participants_bytes, participant_count)?;
        let object = data.slice(need..data.len());

        let record = Self {
            header: PreparedOpRecordHeader {
                op_type,
                client_id,
                rpc_id,
                participant_count,
                checksum,
            },
            participants,
            object,
        };

        let computed = Self::compute_checksum(
            op_type,
            client_id,
            rpc_id,
            participant_count,
            &record.participants,
            &record.object,
        );
        if computed != checksum {
            return Err(TxLogError::Checksum {
                expected: checksum,
                computed,
            });
        }

        Ok(record)
    }
}
