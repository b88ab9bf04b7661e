//! Parsing for the text line protocol.
//!
//! Entry lines look like `10.0.0.0/8 100`, query lines like `10.1.2.3`.
//! Every function takes the 1-based line number so errors point back at
//! the offending input.

use std::net::Ipv4Addr;

use ipnet::Ipv4Net;

use super::error::{LpmError, Result};
use super::routing_trie::RoutingNumber;
use crate::utils::ip_utils::check_mask_len;

/// Printed in place of a routing number when nothing matched.
pub const NO_MATCH: RoutingNumber = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteEntry {
    pub prefix: Ipv4Net,
    pub routing_number: RoutingNumber,
}

pub fn parse_count(line_no: usize, line: &str) -> Result<usize> {
    line.trim()
        .parse::<usize>()
        .map_err(|e| LpmError::parse(line_no, format!("invalid count '{}': {}", line.trim(), e)))
}

pub fn parse_entry(line_no: usize, line: &str) -> Result<RouteEntry> {
    let args: Vec<&str> = line.split_whitespace().collect();
    if args.len() != 2 {
        return Err(LpmError::parse(
            line_no,
            format!("expected '<a.b.c.d>/<mask> <routing number>', got '{}'", line.trim()),
        ));
    }

    let (addr, mask) = args[0]
        .split_once('/')
        .ok_or_else(|| LpmError::parse(line_no, format!("missing '/<mask>' in '{}'", args[0])))?;
    let addr = parse_octets(line_no, addr)?;
    let mask_len = mask
        .parse::<u8>()
        .map_err(|_| LpmError::parse(line_no, format!("invalid mask length '{}'", mask)))?;
    check_mask_len(mask_len).map_err(|e| LpmError::parse(line_no, e.to_string()))?;
    let prefix = Ipv4Net::new(addr, mask_len).map_err(|e| LpmError::parse(line_no, e.to_string()))?;

    let routing_number = args[1]
        .parse::<RoutingNumber>()
        .map_err(|_| LpmError::parse(line_no, format!("invalid routing number '{}'", args[1])))?;
    if routing_number == NO_MATCH {
        return Err(LpmError::parse(
            line_no,
            format!("routing number {} is reserved for 'no match'", NO_MATCH),
        ));
    }

    Ok(RouteEntry { prefix, routing_number })
}

pub fn parse_query(line_no: usize, line: &str) -> Result<Ipv4Addr> {
    parse_octets(line_no, line.trim())
}

/// Parse a dotted quad, each octet 0-255. Leading zeros are accepted.
fn parse_octets(line_no: usize, text: &str) -> Result<Ipv4Addr> {
    let parts: Vec<&str> = text.split('.').collect();
    if parts.len() != 4 {
        return Err(LpmError::parse(line_no, format!("expected 4 octets in '{}'", text)));
    }

    let mut octets = [0u8; 4];
    for (octet, part) in octets.iter_mut().zip(&parts) {
        *octet = part
            .parse::<u8>()
            .map_err(|_| LpmError::parse(line_no, format!("octet '{}' is not in 0-255", part)))?;
    }
    Ok(Ipv4Addr::from(octets))
}
