use std::net::Ipv4Addr;

use ipnet::Ipv4Net;
use tracing::{debug, trace};

use super::error::Result;
use super::snapshot::TrieSnapshot;
use crate::utils::ip_utils::{bits_of, check_mask_len, AddressBits, ADDRESS_BITS};

/// Next-hop identifier stored with a prefix.
pub type RoutingNumber = i32;

#[derive(Debug, Default)]
struct TrieNode {
    route: Option<RoutingNumber>,
    left: Option<Box<TrieNode>>,
    right: Option<Box<TrieNode>>,
}

impl TrieNode {
    fn child(&self, bit: bool) -> Option<&TrieNode> {
        if bit {
            self.right.as_deref()
        } else {
            self.left.as_deref()
        }
    }

    /// Descend into the child for `bit`, creating it if it does not exist yet.
    fn child_or_insert(&mut self, bit: bool, node_count: &mut usize) -> &mut TrieNode {
        let slot = if bit { &mut self.right } else { &mut self.left };
        &mut **slot.get_or_insert_with(|| {
            *node_count += 1;
            Box::default()
        })
    }
}

/// Binary trie over IPv4 address bits for longest prefix matching.
///
/// Each level consumes one bit of the address, most significant first, so a
/// node at depth `d` stands for the `d`-bit prefix spelled by its path. The
/// root is the `/0` position.
#[derive(Debug)]
pub struct PrefixTrie {
    root: TrieNode,
    route_count: usize,
    node_count: usize,
}

impl Default for PrefixTrie {
    fn default() -> Self {
        Self::new()
    }
}

impl PrefixTrie {
    /// Create a new empty PrefixTrie
    pub fn new() -> Self {
        PrefixTrie { root: TrieNode::default(), route_count: 0, node_count: 1 }
    }

    /// Build a trie from a list of prefixes, in the order given.
    pub fn from_entries<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (Ipv4Net, RoutingNumber)>,
    {
        let mut trie = PrefixTrie::new();
        for (prefix, routing_number) in entries {
            trie.insert_prefix(prefix, routing_number)?;
        }
        Ok(trie)
    }

    /// Insert a prefix into the Trie
    ///
    /// # Arguments
    ///
    /// * `bits`: The address bits of the prefix; bits past `mask_len` are ignored
    /// * `mask_len`: The number of leading bits that make up the prefix (0-32)
    /// * `routing_number`: The routing number to store at the end of the prefix
    ///
    /// # Returns
    ///
    /// The routing number previously stored for the same prefix, if any. A
    /// mask length above 32 is rejected and leaves the trie unchanged.
    pub fn insert(
        &mut self,
        bits: AddressBits,
        mask_len: u8,
        routing_number: RoutingNumber,
    ) -> Result<Option<RoutingNumber>> {
        let len = check_mask_len(mask_len)?;

        let mut node = &mut self.root;
        for bit in bits.iter().take(len) {
            node = node.child_or_insert(bit, &mut self.node_count);
        }

        let previous = node.route.replace(routing_number);
        match previous {
            Some(old) => debug!(
                prefix = %Ipv4Addr::from(bits),
                mask_len,
                old,
                new = routing_number,
                "overwrote existing route"
            ),
            None => {
                self.route_count += 1;
                trace!(prefix = %Ipv4Addr::from(bits), mask_len, routing_number, "inserted route");
            }
        }
        Ok(previous)
    }

    /// Lookup the longest matching prefix for an address
    ///
    /// # Arguments
    ///
    /// * `bits`: The address bits to look up
    ///
    /// # Returns
    ///
    /// The routing number of the most specific stored prefix containing the
    /// address, or None if no stored prefix contains it.
    pub fn search(&self, bits: AddressBits) -> Option<RoutingNumber> {
        self.walk(bits).map(|(_, routing_number)| routing_number)
    }

    /// Same as [`search`](Self::search), also reporting which prefix matched.
    pub fn longest_match(&self, addr: Ipv4Addr) -> Option<(Ipv4Net, RoutingNumber)> {
        let (depth, routing_number) = self.walk(AddressBits::from(addr))?;
        let prefix = Ipv4Net::new(addr, depth).ok()?.trunc();
        Some((prefix, routing_number))
    }

    /// Walk down the path of `bits`, remembering the last routed node seen.
    /// Deeper nodes are visited later, so the last one is the longest match.
    fn walk(&self, bits: AddressBits) -> Option<(u8, RoutingNumber)> {
        let mut node = &self.root;
        let mut best = node.route.map(|routing_number| (0, routing_number));

        for (depth, bit) in (1..=ADDRESS_BITS as u8).zip(bits.iter()) {
            match node.child(bit) {
                Some(child) => node = child,
                None => break,
            }
            if let Some(routing_number) = node.route {
                best = Some((depth, routing_number));
            }
        }
        best
    }

    /// Feed one prefix, given as octets, into the trie.
    pub fn build_entry(
        &mut self,
        o1: u8,
        o2: u8,
        o3: u8,
        o4: u8,
        mask_len: u8,
        routing_number: RoutingNumber,
    ) -> Result<Option<RoutingNumber>> {
        self.insert(bits_of(o1, o2, o3, o4), mask_len, routing_number)
    }

    /// Look up one address, given as octets.
    pub fn lookup(&self, o1: u8, o2: u8, o3: u8, o4: u8) -> Option<RoutingNumber> {
        self.search(bits_of(o1, o2, o3, o4))
    }

    /// Insert a typed prefix; host bits past the prefix length are ignored.
    pub fn insert_prefix(
        &mut self,
        prefix: Ipv4Net,
        routing_number: RoutingNumber,
    ) -> Result<Option<RoutingNumber>> {
        self.insert(AddressBits::from(prefix.addr()), prefix.prefix_len(), routing_number)
    }

    /// Look up a typed address.
    pub fn lookup_addr(&self, addr: Ipv4Addr) -> Option<RoutingNumber> {
        self.search(AddressBits::from(addr))
    }

    /// All stored prefixes, shorter prefixes before the longer ones under
    /// them and the 0 branch before the 1 branch.
    pub fn routes(&self) -> Vec<(Ipv4Net, RoutingNumber)> {
        let mut routes = Vec::with_capacity(self.route_count);
        let mut stack: Vec<(&TrieNode, u32, u8)> = vec![(&self.root, 0, 0)];

        while let Some((node, prefix, depth)) = stack.pop() {
            if let Some(routing_number) = node.route {
                if let Ok(net) = Ipv4Net::new(Ipv4Addr::from(prefix), depth) {
                    routes.push((net, routing_number));
                }
            }
            if depth as usize == ADDRESS_BITS {
                continue;
            }
            let shift = 31 - u32::from(depth);
            if let Some(right) = node.right.as_deref() {
                stack.push((right, prefix | (1 << shift), depth + 1));
            }
            if let Some(left) = node.left.as_deref() {
                stack.push((left, prefix, depth + 1));
            }
        }
        routes
    }

    /// Number of stored prefixes.
    pub fn len(&self) -> usize {
        self.route_count
    }

    pub fn is_empty(&self) -> bool {
        self.route_count == 0
    }

    /// Number of allocated nodes, root included.
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Publish the trie as an immutable, shareable snapshot.
    pub fn freeze(self) -> TrieSnapshot {
        TrieSnapshot::new(self)
    }

    /// Free every node. Taking `self` makes a second release impossible.
    pub fn release(self) {
        debug!(nodes = self.node_count, routes = self.route_count, "releasing trie");
        drop(self);
    }
}

impl Drop for PrefixTrie {
    // Tear down with an explicit stack instead of one recursive drop per level.
    fn drop(&mut self) {
        let mut stack: Vec<Box<TrieNode>> = Vec::new();
        stack.extend(self.root.left.take());
        stack.extend(self.root.right.take());
        while let Some(mut node) = stack.pop() {
            stack.extend(node.left.take());
            stack.extend(node.right.take());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::api::error::LpmError;

    fn net(s: &str) -> Ipv4Net {
        s.parse().unwrap()
    }

    fn addr(s: &str) -> Ipv4Addr {
        s.parse().unwrap()
    }

    #[test]
    fn test_empty_trie_has_no_match() {
        let trie = PrefixTrie::new();
        assert!(trie.is_empty());
        assert_eq!(trie.lookup(0, 0, 0, 0), None);
        assert_eq!(trie.lookup(10, 1, 2, 3), None);
        assert_eq!(trie.lookup(255, 255, 255, 255), None);
    }

    #[test]
    fn test_longer_prefix_wins() {
        let mut trie = PrefixTrie::new();
        trie.build_entry(10, 0, 0, 0, 8, 1).unwrap();
        trie.build_entry(10, 0, 0, 0, 16, 2).unwrap();

        assert_eq!(trie.lookup(10, 0, 5, 5), Some(2));
        assert_eq!(trie.lookup(10, 1, 0, 0), Some(1));
        assert_eq!(trie.lookup(11, 0, 0, 0), None);
    }

    #[test]
    fn test_reinsert_overwrites() {
        let mut trie = PrefixTrie::new();
        assert_eq!(trie.build_entry(192, 168, 1, 0, 24, 5).unwrap(), None);
        let nodes = trie.node_count();
        assert_eq!(trie.build_entry(192, 168, 1, 0, 24, 6).unwrap(), Some(5));

        assert_eq!(trie.lookup(192, 168, 1, 77), Some(6));
        assert_eq!(trie.len(), 1);
        assert_eq!(trie.node_count(), nodes);
    }

    #[test]
    fn test_default_route_matches_everything() {
        let mut trie = PrefixTrie::new();
        trie.build_entry(0, 0, 0, 0, 0, 9).unwrap();

        assert_eq!(trie.node_count(), 1);
        assert_eq!(trie.lookup(0, 0, 0, 0), Some(9));
        assert_eq!(trie.lookup(8, 8, 8, 8), Some(9));
        assert_eq!(trie.lookup(255, 255, 255, 255), Some(9));
    }

    #[test]
    fn test_host_route_is_matched() {
        let mut trie = PrefixTrie::new();
        trie.build_entry(10, 0, 0, 0, 8, 1).unwrap();
        trie.build_entry(10, 0, 0, 7, 32, 2).unwrap();

        assert_eq!(trie.lookup(10, 0, 0, 7), Some(2));
        assert_eq!(trie.lookup(10, 0, 0, 6), Some(1));
        assert_eq!(trie.node_count(), 33);
    }

    #[test]
    fn test_mask_above_32_rejected() {
        let mut trie = PrefixTrie::new();
        let err = trie.build_entry(10, 0, 0, 0, 33, 1).unwrap_err();

        assert!(matches!(err, LpmError::InvalidMaskLength { mask_len: 33 }));
        assert!(trie.is_empty());
        assert_eq!(trie.node_count(), 1);
    }

    #[test]
    fn test_bits_past_mask_are_ignored() {
        let mut trie = PrefixTrie::new();
        trie.build_entry(10, 1, 2, 3, 8, 4).unwrap();

        assert_eq!(trie.lookup(10, 200, 0, 0), Some(4));
        assert_eq!(trie.routes(), vec![(net("10.0.0.0/8"), 4)]);
    }

    #[test]
    fn test_shared_prefixes_share_nodes() {
        let mut trie = PrefixTrie::new();
        trie.insert_prefix(net("10.0.0.0/8"), 1).unwrap();
        assert_eq!(trie.node_count(), 9);
        trie.insert_prefix(net("10.0.0.0/16"), 2).unwrap();
        assert_eq!(trie.node_count(), 17);
    }

    #[test]
    fn test_nested_prefixes() {
        let trie = PrefixTrie::from_entries([
            (net("10.0.0.0/8"), 100),
            (net("10.10.0.0/16"), 200),
            (net("10.10.10.0/24"), 300),
        ])
        .unwrap();

        assert_eq!(trie.lookup_addr(addr("10.10.10.5")), Some(300));
        assert_eq!(trie.lookup_addr(addr("10.10.1.1")), Some(200));
        assert_eq!(trie.lookup_addr(addr("10.20.1.1")), Some(100));
        assert_eq!(trie.lookup_addr(addr("192.168.0.1")), None);
    }

    #[test]
    fn test_longest_match_reports_prefix() {
        let trie = PrefixTrie::from_entries([
            (net("0.0.0.0/0"), 1),
            (net("172.16.0.0/12"), 2),
        ])
        .unwrap();

        assert_eq!(
            trie.longest_match(addr("172.20.1.1")),
            Some((net("172.16.0.0/12"), 2))
        );
        assert_eq!(
            trie.longest_match(addr("8.8.8.8")),
            Some((net("0.0.0.0/0"), 1))
        );
    }

    #[test]
    fn test_routes_listed_in_preorder() {
        let trie = PrefixTrie::from_entries([
            (net("192.168.0.0/16"), 3),
            (net("10.10.0.0/16"), 2),
            (net("10.0.0.0/8"), 1),
            (net("0.0.0.0/0"), 0),
        ])
        .unwrap();

        assert_eq!(
            trie.routes(),
            vec![
                (net("0.0.0.0/0"), 0),
                (net("10.0.0.0/8"), 1),
                (net("10.10.0.0/16"), 2),
                (net("192.168.0.0/16"), 3),
            ]
        );
    }

    #[test]
    fn test_release_consumes_trie() {
        let mut trie = PrefixTrie::new();
        for i in 0..=255u8 {
            trie.build_entry(i, i, i, i, 32, i32::from(i)).unwrap();
        }
        assert_eq!(trie.len(), 256);
        trie.release();
    }

    fn brute_force(entries: &HashMap<Ipv4Net, RoutingNumber>, query: Ipv4Addr) -> Option<RoutingNumber> {
        entries
            .iter()
            .filter(|(prefix, _)| prefix.contains(&query))
            .max_by_key(|(prefix, _)| prefix.prefix_len())
            .map(|(_, routing_number)| *routing_number)
    }

    #[test]
    fn test_insertion_order_does_not_matter() {
        let mut rng = StdRng::seed_from_u64(0x1b_2c);
        let mut entries: HashMap<Ipv4Net, RoutingNumber> = HashMap::new();
        // A few anchors keep nested prefixes in play alongside random ones.
        for (i, s) in ["10.0.0.0/8", "10.128.0.0/9", "10.128.64.0/18", "0.0.0.0/1"].iter().enumerate() {
            entries.insert(net(s), i as RoutingNumber);
        }
        while entries.len() < 200 {
            let prefix = Ipv4Net::new(Ipv4Addr::from(rng.gen::<u32>()), rng.gen_range(0..=32u8))
                .unwrap()
                .trunc();
            let next = entries.len() as RoutingNumber;
            entries.entry(prefix).or_insert(next);
        }

        let mut ordered: Vec<(Ipv4Net, RoutingNumber)> = entries.iter().map(|(p, r)| (*p, *r)).collect();
        ordered.sort();
        let baseline = PrefixTrie::from_entries(ordered.clone()).unwrap();

        let mut queries: Vec<Ipv4Addr> = (0..500).map(|_| Ipv4Addr::from(rng.gen::<u32>())).collect();
        queries.extend(entries.keys().map(|p| p.addr()));
        queries.extend(entries.keys().map(|p| p.broadcast()));

        for _ in 0..5 {
            ordered.shuffle(&mut rng);
            let shuffled = PrefixTrie::from_entries(ordered.clone()).unwrap();
            assert_eq!(shuffled.node_count(), baseline.node_count());
            assert_eq!(shuffled.routes(), baseline.routes());
            for query in &queries {
                assert_eq!(shuffled.lookup_addr(*query), baseline.lookup_addr(*query));
            }
        }

        for query in &queries {
            assert_eq!(baseline.lookup_addr(*query), brute_force(&entries, *query), "query {query}");
        }
    }
}
