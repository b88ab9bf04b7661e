use std::net::Ipv4Addr;

use crate::api::error::{LpmError, Result};

/// Number of bits in an IPv4 address, and the deepest level of the trie.
pub const ADDRESS_BITS: usize = 32;

/// An IPv4 address as 32 ordered bits, most significant bit first.
///
/// Index 0 is the high bit of the first octet, index 31 the low bit of the
/// fourth octet (network bit order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AddressBits([bool; ADDRESS_BITS]);

impl AddressBits {
    /// The bit at `index`, `true` for 1.
    ///
    /// Panics if `index >= 32`.
    pub fn bit(&self, index: usize) -> bool {
        self.0[index]
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        self.0.iter().copied()
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.0
    }

    /// Reassemble the four octets, big-endian.
    pub fn to_octets(&self) -> [u8; 4] {
        let mut octets = [0u8; 4];
        for (i, &bit) in self.0.iter().enumerate() {
            if bit {
                octets[i / 8] |= 0x80 >> (i % 8);
            }
        }
        octets
    }
}

impl From<Ipv4Addr> for AddressBits {
    fn from(addr: Ipv4Addr) -> Self {
        let [a, b, c, d] = addr.octets();
        bits_of(a, b, c, d)
    }
}

impl From<u32> for AddressBits {
    fn from(addr: u32) -> Self {
        AddressBits::from(Ipv4Addr::from(addr))
    }
}

impl From<AddressBits> for Ipv4Addr {
    fn from(bits: AddressBits) -> Self {
        Ipv4Addr::from(bits.to_octets())
    }
}

/// Convert four octets into their 32 bits, most significant bit first.
pub fn bits_of(a: u8, b: u8, c: u8, d: u8) -> AddressBits {
    let mut bits = [false; ADDRESS_BITS];
    for (n, octet) in [a, b, c, d].into_iter().enumerate() {
        // Iterate over the bits of the octet, high bit first
        for i in 0..8 {
            bits[n * 8 + i] = (octet >> (7 - i)) & 1 == 1;
        }
    }
    AddressBits(bits)
}

/// Check that a mask length fits inside an IPv4 address.
pub fn check_mask_len(mask_len: u8) -> Result<usize> {
    let len = usize::from(mask_len);
    if len > ADDRESS_BITS {
        return Err(LpmError::InvalidMaskLength { mask_len });
    }
    Ok(len)
}
