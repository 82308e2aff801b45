// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::Error;

/// Largest supported index width. A node bitmap then spans 8 KiB.
pub const MAX_BIT_WIDTH: u32 = 16;

/// Extracts the `bit_width`-bit index used at `depth` from a key digest.
///
/// Bits are read most-significant first: bit 0 of the digest is the high bit of
/// its first byte, and level `depth` consumes bits
/// `[depth * bit_width, (depth + 1) * bit_width)`. Changing this ordering changes
/// every CID produced by the map.
pub fn extract_index(digest: &[u8], depth: u32, bit_width: u32) -> Result<u32, Error> {
    debug_assert!(bit_width > 0 && bit_width <= MAX_BIT_WIDTH);
    let start = depth as usize * bit_width as usize;
    let end = start + bit_width as usize;
    if end > digest.len() * 8 {
        return Err(Error::DepthExceeded { depth });
    }

    let mut index = 0u32;
    for bit in start..end {
        let byte = digest[bit / 8];
        let set = (byte >> (7 - (bit % 8))) & 1;
        index = (index << 1) | u32::from(set);
    }
    Ok(index)
}

/// Number of complete levels a digest of `hash_bytes` bytes can index.
pub fn max_depth(hash_bytes: usize, bit_width: u32) -> u32 {
    (hash_bytes * 8 / bit_width as usize) as u32
}
