//! Checksum primitives shared across the prepared-op log format.

pub mod crc32c;

pub use crc32c::{crc32c, Crc32c};
