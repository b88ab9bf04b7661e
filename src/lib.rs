//! IPv4 longest prefix matching over a binary trie.
//!
//! Routes are inserted as (prefix, mask length, routing number) and queries
//! return the routing number of the most specific prefix that contains the
//! address. See [`api::routing_trie::PrefixTrie`].

pub mod api;   // Trie, adapters and console
pub mod utils; // Address helpers

pub use api::error::{LpmError, Result};
pub use api::routing_trie::{PrefixTrie, RoutingNumber};
pub use api::snapshot::TrieSnapshot;
pub use utils::ip_utils::{bits_of, AddressBits};
