// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Hash functions used to index keys into the trie.
//!
//! The hash algorithm of a map is persisted in its root block as a multicodec
//! code, so a hasher must be resolvable from that code when the map is loaded.
//! Instead of a process wide table, every map handle receives a
//! [`HasherRegistry`] through its configuration.

mod registry;

pub use registry::HasherRegistry;

use std::fmt;

use multihash_codetable::{Code, MultihashDigest as _};

/// Multicodec code of the identity "hash".
pub const IDENTITY_CODE: u64 = 0x00;

/// A hash function that turns a key into a fixed length digest.
pub trait KeyHasher: fmt::Debug + Send + Sync {
    /// Multicodec code persisted in the map root as `hashAlg`.
    fn code(&self) -> u64;

    /// Length in bytes of every digest returned by [`KeyHasher::digest`].
    fn hash_bytes(&self) -> usize;

    fn digest(&self, key: &[u8]) -> Vec<u8>;
}

/// [`KeyHasher`] backed by a [`multihash_codetable::Code`].
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct MultihashHasher {
    code: Code,
    hash_bytes: usize,
}

impl MultihashHasher {
    pub fn new(code: Code) -> Self {
        let hash_bytes = usize::from(code.digest(&[]).size());
        Self { code, hash_bytes }
    }

    /// SHA2-256, the default indexing hash.
    pub fn sha2_256() -> Self {
        Self::new(Code::Sha2_256)
    }
}

impl fmt::Debug for MultihashHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultihashHasher")
            .field("code", &format_args!("{:#x}", u64::from(self.code)))
            .field("hash_bytes", &self.hash_bytes)
            .finish()
    }
}

impl KeyHasher for MultihashHasher {
    fn code(&self) -> u64 {
        self.code.into()
    }

    fn hash_bytes(&self) -> usize {
        self.hash_bytes
    }

    fn digest(&self, key: &[u8]) -> Vec<u8> {
        self.code.digest(key).digest().to_vec()
    }
}

/// Uses the key itself as its digest, zero padded or truncated to `hash_bytes`.
///
/// Useful to place keys at chosen slots; keys sharing their first `hash_bytes`
/// bytes collide at every depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityHasher {
    hash_bytes: usize,
}

impl IdentityHasher {
    pub fn new(hash_bytes: usize) -> Self {
        Self { hash_bytes }
    }
}

impl KeyHasher for IdentityHasher {
    fn code(&self) -> u64 {
        IDENTITY_CODE
    }

    fn hash_bytes(&self) -> usize {
        self.hash_bytes
    }

    fn digest(&self, key: &[u8]) -> Vec<u8> {
        let mut out = vec![0; self.hash_bytes];
        let n = key.len().min(self.hash_bytes);
        out[..n].copy_from_slice(&key[..n]);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multihash_hasher_lengths() {
        let sha = MultihashHasher::sha2_256();
        assert_eq!(sha.code(), 0x12);
        assert_eq!(sha.hash_bytes(), 32);
        assert_eq!(sha.digest(b"foo").len(), 32);
        assert_eq!(sha.digest(b"foo"), sha.digest(b"foo"));
        assert_ne!(sha.digest(b"foo"), sha.digest(b"bar"));

        let sha512 = MultihashHasher::new(Code::Sha2_512);
        assert_eq!(sha512.hash_bytes(), 64);
        assert_eq!(sha512.digest(b"foo").len(), 64);
    }

    #[test]
    fn identity_pads_and_truncates() {
        let id = IdentityHasher::new(4);
        assert_eq!(id.code(), IDENTITY_CODE);
        assert_eq!(id.digest(&[1, 2]), vec![1, 2, 0, 0]);
        assert_eq!(id.digest(&[1, 2, 3, 4, 5, 6]), vec![1, 2, 3, 4]);
    }
}
