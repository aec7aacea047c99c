//! Failure detector errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("socket I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed datagram: {0}")]
    Malformed(String),

    #[error("fatal failure detector startup error: {0}")]
    Fatal(String),
}
