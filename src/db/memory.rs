// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use ahash::HashMap;
use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use itertools::Itertools;
use parking_lot::RwLock;

/// Content-addressed block store kept in memory.
#[derive(Debug, Default)]
pub struct MemoryDB {
    blocks: RwLock<HashMap<Cid, Vec<u8>>>,
}

impl MemoryDB {
    /// Number of stored blocks.
    pub fn len(&self) -> usize {
        self.blocks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.read().is_empty()
    }

    /// CIDs of all stored blocks, in no particular order.
    pub fn keys(&self) -> Vec<Cid> {
        self.blocks.read().keys().copied().collect_vec()
    }
}

impl Blockstore for MemoryDB {
    fn get(&self, k: &Cid) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.blocks.read().get(k).cloned())
    }

    fn put_keyed(&self, k: &Cid, block: &[u8]) -> anyhow::Result<()> {
        self.blocks.write().insert(*k, block.to_vec());
        Ok(())
    }

    fn has(&self, k: &Cid) -> anyhow::Result<bool> {
        Ok(self.blocks.read().contains_key(k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use multihash_codetable::{Code, MultihashDigest as _};

    #[test]
    fn put_get() {
        let db = MemoryDB::default();
        let cid = Cid::new_v1(0x55, Code::Sha2_256.digest(b"block"));
        assert_eq!(db.get(&cid).unwrap(), None);
        assert!(db.is_empty());

        db.put_keyed(&cid, b"block").unwrap();
        assert_eq!(db.get(&cid).unwrap(), Some(b"block".to_vec()));
        assert!(db.has(&cid).unwrap());
        assert_eq!(db.len(), 1);
        assert_eq!(db.keys(), vec![cid]);
    }
}
