use std::net::Ipv4Addr;

use ipnet::Ipv4Net;

pub mod batch;
pub mod error;
pub mod parser;
pub mod repl;
pub mod routing_trie;
pub mod snapshot;

use routing_trie::RoutingNumber;

/// Commands sent from the interactive console to the thread owning the trie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    AddRoute(Ipv4Net, RoutingNumber),
    Lookup(Ipv4Addr),
    ListRoutes,
    Exit,
}
