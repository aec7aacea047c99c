//! The detector's view of cluster membership, refreshed wholesale from the
//! coordinator and otherwise treated as immutable.

use wardcore_net::Rng;

use crate::wire::{GetServerListResponse, ServerListEntry};

/// Cluster membership as last reported by the coordinator.
#[derive(Debug, Clone, Default)]
pub struct ServerList {
    entries: Vec<ServerListEntry>,
}

impl ServerList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wholesale replacement, as happens on every `GET_SERVER_LIST` reply.
    pub fn replace(&mut self, response: GetServerListResponse) {
        self.entries = response.entries;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn entries(&self) -> &[ServerListEntry] {
        &self.entries
    }

    /// Picks a random peer other than `self_locator`, resampling until a
    /// different entry turns up. Returns `None` when the list is empty or
    /// contains only `self_locator`.
    pub fn pick_random_peer(&self, self_locator: &str, rng: &dyn Rng) -> Option<&ServerListEntry> {
        let candidates: Vec<&ServerListEntry> = self
            .entries
            .iter()
            .filter(|entry| entry.locator != self_locator)
            .collect();
        if candidates.is_empty() {
            return None;
        }
        let index = (rng.next_u64() as usize) % candidates.len();
        Some(candidates[index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wardcore_net::FakeRng;

    fn entry(locator: &str) -> ServerListEntry {
        ServerListEntry {
            locator: locator.to_string(),
            server_type: 0,
        }
    }

    #[test]
    fn replace_overwrites_prior_list() {
        let mut list = ServerList::new();
        list.replace(GetServerListResponse {
            entries: vec![entry("a"), entry("b")],
        });
        assert_eq!(list.len(), 2);

        list.replace(GetServerListResponse {
            entries: vec![entry("c")],
        });
        assert_eq!(list.len(), 1);
        assert_eq!(list.entries()[0].locator, "c");
    }

    #[test]
    fn pick_random_peer_excludes_self() {
        let mut list = ServerList::new();
        list.replace(GetServerListResponse {
            entries: vec![entry("self"), entry("a"), entry("b")],
        });
        let rng = FakeRng::sequence(vec![0, 1, 2, 3, 4]);
        for _ in 0..5 {
            let picked = list.pick_random_peer("self", &rng).unwrap();
            assert_ne!(picked.locator, "self");
        }
    }

    #[test]
    fn pick_random_peer_empty_list_returns_none() {
        let list = ServerList::new();
        let rng = FakeRng::constant(0);
        assert!(list.pick_random_peer("self", &rng).is_none());
    }

    #[test]
    fn pick_random_peer_only_self_returns_none() {
        let mut list = ServerList::new();
        list.replace(GetServerListResponse {
            entries: vec![entry("self")],
        });
        let rng = FakeRng::constant(0);
        assert!(list.pick_random_peer("self", &rng).is_none());
    }
}
