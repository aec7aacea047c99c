//! Prepared-op log record errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TxLogError {
    #[error("record buffer too short: need at least {need} bytes, have {have}")]
    Truncated { need: usize, have: usize },

    #[error("unknown op type byte {0:#x}")]
    UnknownOpType(u8),

    #[error("checksum mismatch: expected {expected:#x}, computed {computed:#x}")]
    Checksum { expected: u32, computed: u32 },

    #[error("log store I/O error: {0}")]
    Io(#[from] std::io::Error),
}
