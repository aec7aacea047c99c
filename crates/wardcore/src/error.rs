//! Crate-boundary error aggregation.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WardcoreError {
    #[error(transparent)]
    Detector(#[from] wardcore_detector::DetectorError),

    #[error(transparent)]
    TxLog(#[from] wardcore_txlog::TxLogError),

    #[error(transparent)]
    TxTable(#[from] wardcore_txtable::TxTableError),

    #[error(transparent)]
    Config(#[from] wardcore_config::ConfigError),

    #[error("dispatch command queue is full")]
    DispatchQueueFull,

    #[error("dispatch thread is no longer reachable")]
    DispatchUnreachable,
}
