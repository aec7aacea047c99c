//! The object manager is an external collaborator that owns per-key locks.
//! Only the interface the prepared-ops table consumes is pinned here.

use wardcore_types::{KeyHash, TableId};

pub trait ObjectManager: Send + Sync {
    fn lock(&self, table_id: TableId, key_hash: KeyHash);
    fn unlock(&self, table_id: TableId, key_hash: KeyHash);
}
