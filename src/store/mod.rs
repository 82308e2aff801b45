// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Translation between trie nodes and persisted blocks.

pub mod schema;

use std::sync::Arc;

use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use ipld_core::ipld::Ipld;
use multihash_codetable::{Code, MultihashDigest as _};
use tracing::trace;

use crate::codec::BlockCodec;
use crate::hamt::Error;
use crate::hamt::node::{Node, Root};

/// Saves and loads HAMT blocks through a [`Blockstore`].
///
/// Every block is encoded with the configured codec and addressed by a CIDv1
/// over the configured block hash. Loaded blocks are checked against their CID
/// and against the HAMT schema before they are handed to the trie.
#[derive(Debug)]
pub struct NodeStore<BS> {
    store: BS,
    codec: Arc<dyn BlockCodec>,
    block_hasher: Code,
}

impl<BS> NodeStore<BS>
where
    BS: Blockstore,
{
    pub fn new(store: BS, codec: Arc<dyn BlockCodec>, block_hasher: Code) -> Self {
        Self {
            store,
            codec,
            block_hasher,
        }
    }

    /// Returns a reference to the underlying block store.
    pub fn store(&self) -> &BS {
        &self.store
    }

    pub fn codec(&self) -> &dyn BlockCodec {
        self.codec.as_ref()
    }

    /// CID the given block bytes are stored under.
    pub fn cid_of(&self, bytes: &[u8]) -> Cid {
        Cid::new_v1(self.codec.code(), self.block_hasher.digest(bytes))
    }

    fn save(&self, ipld: &Ipld) -> Result<Cid, Error> {
        let bytes = self.codec.encode(ipld)?;
        let cid = self.cid_of(&bytes);
        self.store.put_keyed(&cid, &bytes).map_err(Error::Store)?;
        trace!(%cid, len = bytes.len(), "put block");
        Ok(cid)
    }

    pub fn save_node(&self, node: &Node) -> Result<Cid, Error> {
        self.save(&node.to_ipld())
    }

    pub fn save_root(&self, root: &Root) -> Result<Cid, Error> {
        self.save(&root.to_ipld())
    }

    fn load(&self, cid: &Cid) -> Result<Ipld, Error> {
        let bytes = self
            .store
            .get(cid)
            .map_err(Error::Store)?
            .ok_or(Error::NotFound(*cid))?;
        trace!(%cid, len = bytes.len(), "get block");

        let code = Code::try_from(cid.hash().code()).map_err(|_| Error::BlockIntegrity(*cid))?;
        if code.digest(&bytes) != *cid.hash() {
            return Err(Error::BlockIntegrity(*cid));
        }
        if cid.codec() != self.codec.code() {
            return Err(Error::Codec(format!(
                "block {cid} uses codec {:#x}, expected {:#x}",
                cid.codec(),
                self.codec.code()
            )));
        }
        self.codec.decode(&bytes)
    }

    /// Loads and validates a root block.
    pub fn load_root(&self, cid: &Cid) -> Result<Root, Error> {
        schema::root_from_ipld(cid, self.load(cid)?)
    }

    /// Loads and validates a non-root node of a map with the given parameters.
    pub fn load_node(&self, cid: &Cid, bit_width: u32, bucket_size: usize) -> Result<Node, Error> {
        schema::node_from_ipld(cid, self.load(cid)?, Some(bit_width), bucket_size)
    }
}
