// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use parking_lot::Mutex;

/// Stats for a [`TrackingBlockstore`]: the amount of data read from and
/// written to the wrapped store.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BlockstoreStats {
    /// Number of reads
    pub r: usize,
    /// Number of writes
    pub w: usize,
    /// Bytes Read
    pub br: usize,
    /// Bytes Written
    pub bw: usize,
}

/// Wrapper around a [`Blockstore`] counting reads and writes.
#[derive(Debug)]
pub struct TrackingBlockstore<BS> {
    base: BS,
    stats: Mutex<BlockstoreStats>,
}

impl<BS> TrackingBlockstore<BS> {
    pub fn new(base: BS) -> Self {
        Self {
            base,
            stats: Default::default(),
        }
    }

    pub fn stats(&self) -> BlockstoreStats {
        *self.stats.lock()
    }

    pub fn reset_stats(&self) {
        *self.stats.lock() = BlockstoreStats::default();
    }
}

impl<BS> Blockstore for TrackingBlockstore<BS>
where
    BS: Blockstore,
{
    fn get(&self, cid: &Cid) -> anyhow::Result<Option<Vec<u8>>> {
        let bytes = self.base.get(cid)?;
        let mut stats = self.stats.lock();
        stats.r += 1;
        if let Some(bytes) = &bytes {
            stats.br += bytes.len();
        }
        Ok(bytes)
    }

    fn put_keyed(&self, cid: &Cid, block: &[u8]) -> anyhow::Result<()> {
        {
            let mut stats = self.stats.lock();
            stats.w += 1;
            stats.bw += block.len();
        }
        self.base.put_keyed(cid, block)
    }

    fn has(&self, cid: &Cid) -> anyhow::Result<bool> {
        self.base.has(cid)
    }
}
