// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

/// Fixed width occupancy bitmap of a HAMT node.
///
/// Holds `2^bit_width` bits; bit `i` is stored in byte `i / 8` under mask
/// `1 << (i % 8)`. The byte length is part of the wire format and is how the
/// bit width of a stored map is recovered on load.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Bitfield(Vec<u8>);

impl Bitfield {
    pub fn zero(bit_width: u32) -> Self {
        Bitfield(vec![0; Self::byte_len(bit_width)])
    }

    /// Byte length of a bitmap for the given bit width.
    pub fn byte_len(bit_width: u32) -> usize {
        ((1usize << bit_width) / 8).max(1)
    }

    /// Bit width identified by a bitmap byte length, if the length is a valid one.
    pub fn bit_width_for(byte_len: usize) -> Option<u32> {
        if byte_len == 0 || !byte_len.is_power_of_two() {
            return None;
        }
        Some((byte_len * 8).trailing_zeros())
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Bitfield(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn test_bit(&self, idx: u32) -> bool {
        let idx = idx as usize;
        self.0
            .get(idx / 8)
            .is_some_and(|byte| byte & (1 << (idx % 8)) != 0)
    }

    pub fn set_bit(&mut self, idx: u32) {
        let idx = idx as usize;
        self.0[idx / 8] |= 1 << (idx % 8);
    }

    pub fn clear_bit(&mut self, idx: u32) {
        let idx = idx as usize;
        self.0[idx / 8] &= !(1 << (idx % 8));
    }

    pub fn count_ones(&self) -> usize {
        self.0.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// Number of set bits strictly below `idx`; the position of slot `idx` in
    /// the node's element array.
    pub fn rank(&self, idx: u32) -> usize {
        let idx = idx as usize;
        let full = idx / 8;
        let mut count: usize = self.0[..full].iter().map(|b| b.count_ones() as usize).sum();
        let rem = idx % 8;
        if rem > 0 {
            count += (self.0[full] & ((1u8 << rem) - 1)).count_ones() as usize;
        }
        count
    }

    /// Indexes of all set bits, low to high.
    pub fn ones(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.0.len() * 8)
            .filter(|&i| self.0[i / 8] & (1 << (i % 8)) != 0)
            .map(|i| i as u32)
    }
}
