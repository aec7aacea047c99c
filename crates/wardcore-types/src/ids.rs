//! Identifiers shared across the failure detector, the prepared-ops table,
//! and the on-log record formats.

use std::fmt;

macro_rules! id_newtype {
    ($name:ident, $repr:ty, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct $name(pub $repr);

        impl $name {
            #[must_use]
            pub const fn new(value: $repr) -> Self {
                Self(value)
            }

            #[must_use]
            pub const fn get(self) -> $repr {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$repr> for $name {
            fn from(value: $repr) -> Self {
                Self(value)
            }
        }
    };
}

id_newtype!(ClientLeaseId, u64, "A client's lease identifier, stable for the life of the lease.");
id_newtype!(RpcId, u64, "An RPC sequence number, unique within a single client lease.");
id_newtype!(TableId, u64, "A table identifier.");
id_newtype!(KeyHash, u64, "A hash of an object key within a table.");
id_newtype!(SegmentId, u64, "A log segment identifier.");

/// An opaque handle into the append-only log store, returned by
/// `LogStore::append` and consumed by `LogStore::read`.
///
/// The all-ones value is reserved as the null sentinel returned by
/// `PreparedOps::popOp`/`peekOp` when no entry exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LogRef(pub u64);

impl LogRef {
    pub const NULL: Self = Self(u64::MAX);

    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == Self::NULL.0
    }
}

impl fmt::Display for LogRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "LogRef(null)")
        } else {
            write!(f, "LogRef({:#x})", self.0)
        }
    }
}

impl Default for LogRef {
    fn default() -> Self {
        Self::NULL
    }
}

/// Uniquely identifies a prepared operation across the cluster and the log.
pub type OpKey = (ClientLeaseId, RpcId);

/// The kind of operation a prepared-op record stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum OpType {
    Read = 0,
    Remove = 1,
    Write = 2,
}

impl OpType {
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Read),
            1 => Some(Self::Remove),
            2 => Some(Self::Write),
            _ => None,
        }
    }
}

/// The role a peer advertises in the coordinator's server list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u32)]
pub enum ServerType {
    Master = 0,
    Backup = 1,
}
