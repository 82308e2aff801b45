// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::sync::Arc;

use ahash::HashMap;
use multihash_codetable::Code;

use super::{KeyHasher, MultihashHasher};

/// Multihash codes registered by [`HasherRegistry::default`].
const BUILTIN_CODES: &[Code] = &[
    Code::Sha2_256,
    Code::Sha2_512,
    Code::Sha3_256,
    Code::Sha3_512,
    Code::Keccak256,
    Code::Blake2b256,
    Code::Blake2b512,
    Code::Blake2s256,
    Code::Blake3_256,
];

/// Maps `hashAlg` codes to the hashers able to reproduce a stored map's indexes.
#[derive(Debug, Clone)]
pub struct HasherRegistry {
    hashers: HashMap<u64, Arc<dyn KeyHasher>>,
}

impl HasherRegistry {
    /// A registry with no hashers at all.
    pub fn empty() -> Self {
        Self {
            hashers: HashMap::default(),
        }
    }

    /// Registers `hasher` under its own code, replacing any previous entry.
    pub fn register(&mut self, hasher: Arc<dyn KeyHasher>) -> &mut Self {
        self.hashers.insert(hasher.code(), hasher);
        self
    }

    pub fn get(&self, code: u64) -> Option<Arc<dyn KeyHasher>> {
        self.hashers.get(&code).cloned()
    }

    pub fn contains(&self, code: u64) -> bool {
        self.hashers.contains_key(&code)
    }
}

impl Default for HasherRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        for &code in BUILTIN_CODES {
            registry.register(Arc::new(MultihashHasher::new(code)));
        }
        registry
    }
}
