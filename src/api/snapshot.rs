use std::net::Ipv4Addr;
use std::sync::Arc;

use ipnet::Ipv4Net;

use super::routing_trie::{PrefixTrie, RoutingNumber};
use crate::utils::ip_utils::AddressBits;

/// A finished trie, shared read-only between threads.
///
/// Lookups never mutate the trie, so clones of a snapshot can be handed to
/// any number of threads without locking.
#[derive(Debug, Clone)]
pub struct TrieSnapshot {
    trie: Arc<PrefixTrie>,
}

impl TrieSnapshot {
    pub fn new(trie: PrefixTrie) -> Self {
        TrieSnapshot { trie: Arc::new(trie) }
    }

    pub fn search(&self, bits: AddressBits) -> Option<RoutingNumber> {
        self.trie.search(bits)
    }

    pub fn lookup(&self, o1: u8, o2: u8, o3: u8, o4: u8) -> Option<RoutingNumber> {
        self.trie.lookup(o1, o2, o3, o4)
    }

    pub fn lookup_addr(&self, addr: Ipv4Addr) -> Option<RoutingNumber> {
        self.trie.lookup_addr(addr)
    }

    pub fn longest_match(&self, addr: Ipv4Addr) -> Option<(Ipv4Net, RoutingNumber)> {
        self.trie.longest_match(addr)
    }

    pub fn routes(&self) -> Vec<(Ipv4Net, RoutingNumber)> {
        self.trie.routes()
    }

    pub fn len(&self) -> usize {
        self.trie.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trie.is_empty()
    }
}
