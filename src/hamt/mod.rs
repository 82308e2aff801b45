// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

pub mod bitfield;
pub mod config;
mod error;
pub mod hash_bits;
mod iter;
pub mod node;
mod trie;

pub use self::config::{Config, Settings};
pub use self::error::Error;

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use ipld_core::ipld::Ipld;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use self::bitfield::Bitfield;
use self::hash_bits::max_depth;
use self::iter::{Visit, Walk};
use self::node::{Node, Root};
use self::trie::Trie;
use crate::hash::KeyHasher;
use crate::store::NodeStore;

/// Handle to a persistent, content-addressed HAMT.
///
/// The handle tracks the current root of the map. Every successful mutation
/// writes the new nodes and a new root block to the store and only then moves
/// the handle to the new root CID; on error the handle stays where it was.
/// Blocks are never modified, so any number of handles may read overlapping
/// data concurrently.
///
/// # Examples
///
/// ```
/// use ipld_hashmap::{Config, Hamt, MemoryDB};
///
/// let store = MemoryDB::default();
/// let mut map: Hamt<_, u64> = Hamt::create(&store, Config::dag_cbor_sha256()).unwrap();
/// map.set("a", &1).unwrap();
/// assert_eq!(map.get("a").unwrap(), Some(1));
/// map.delete("a").unwrap();
/// assert_eq!(map.get("a").unwrap(), None);
/// ```
pub struct Hamt<BS, V = Ipld> {
    store: NodeStore<BS>,
    hasher: Arc<dyn KeyHasher>,
    bit_width: u32,
    bucket_size: usize,
    root: Arc<Node>,
    cid: Cid,
    value: PhantomData<fn() -> V>,
}

impl<BS, V> fmt::Debug for Hamt<BS, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hamt")
            .field("cid", &self.cid)
            .field("hasher", &self.hasher)
            .field("bit_width", &self.bit_width)
            .field("bucket_size", &self.bucket_size)
            .finish_non_exhaustive()
    }
}

impl<BS, V> PartialEq for Hamt<BS, V> {
    fn eq(&self, other: &Self) -> bool {
        self.cid == other.cid
    }
}

impl<BS, V> Hamt<BS, V>
where
    BS: Blockstore,
    V: Serialize + DeserializeOwned,
{
    /// Creates an empty map and persists its root block.
    pub fn create(store: BS, config: Config) -> Result<Self, Error> {
        let config = config.validate()?;
        let store = NodeStore::new(store, config.block_codec, config.block_hasher);
        let root = Root {
            hash_alg: config.hasher.code(),
            bucket_size: config.bucket_size,
            hamt: Node::empty(config.bit_width),
        };
        let cid = store.save_root(&root)?;
        debug!(
            %cid,
            bit_width = config.bit_width,
            bucket_size = config.bucket_size,
            "created HAMT"
        );

        Ok(Self {
            store,
            hasher: config.hasher,
            bit_width: config.bit_width,
            bucket_size: config.bucket_size,
            root: Arc::new(root.hamt),
            cid,
            value: PhantomData,
        })
    }

    /// Loads an existing map from its root CID.
    ///
    /// The bit width, bucket size and hash algorithm come from the stored root;
    /// the matching options of `config` are ignored. The root's hash algorithm
    /// must be registered in `config.registry` or be `config.hasher`.
    pub fn load(cid: &Cid, store: BS, config: Config) -> Result<Self, Error> {
        let config = config.validate()?;
        let store = NodeStore::new(store, config.block_codec, config.block_hasher);
        let root = store.load_root(cid)?;

        let hasher = config.registry.get(root.hash_alg).ok_or_else(|| {
            Error::configuration(format!(
                "no hasher registered for hash algorithm {:#x}",
                root.hash_alg
            ))
        })?;
        let bit_width = Bitfield::bit_width_for(root.hamt.bitmap().as_bytes().len())
            .ok_or_else(|| Error::schema(*cid, "root bitmap does not identify a bit width"))?;
        if max_depth(hasher.hash_bytes(), bit_width) == 0 {
            return Err(Error::configuration(format!(
                "hasher {:#x} digests are too short for bit width {bit_width}",
                root.hash_alg
            )));
        }
        debug!(%cid, bit_width, bucket_size = root.bucket_size, "loaded HAMT");

        Ok(Self {
            store,
            hasher,
            bit_width,
            bucket_size: root.bucket_size,
            root: Arc::new(root.hamt),
            cid: *cid,
            value: PhantomData,
        })
    }

    /// CID of the current root block.
    pub fn cid(&self) -> &Cid {
        &self.cid
    }

    pub fn bit_width(&self) -> u32 {
        self.bit_width
    }

    pub fn bucket_size(&self) -> usize {
        self.bucket_size
    }

    /// Code of the hash algorithm indexing keys.
    pub fn hash_alg(&self) -> u64 {
        self.hasher.code()
    }

    /// Returns a reference to the underlying store of the HAMT.
    pub fn store(&self) -> &BS {
        self.store.store()
    }

    fn trie(&self) -> Trie<'_, BS> {
        Trie {
            store: &self.store,
            hasher: self.hasher.as_ref(),
            bit_width: self.bit_width,
            bucket_size: self.bucket_size,
        }
    }

    fn walk(&self) -> Walk<'_, BS> {
        Walk::new(
            &self.store,
            self.cid,
            self.root.clone(),
            self.bit_width,
            self.bucket_size,
        )
    }

    /// Returns the value stored under `key`, if any.
    pub fn get(&self, key: impl AsRef<[u8]>) -> Result<Option<V>, Error> {
        match self.trie().get(&self.root, key.as_ref())? {
            Some(ipld) => Ok(Some(ipld_core::serde::from_ipld(ipld)?)),
            None => Ok(None),
        }
    }

    /// Returns `true` if `key` is present.
    pub fn has(&self, key: impl AsRef<[u8]>) -> Result<bool, Error> {
        Ok(self.trie().get(&self.root, key.as_ref())?.is_some())
    }

    /// Inserts or replaces the value under `key`.
    ///
    /// Setting a key to the value it already holds (compared by canonical
    /// encoding) writes nothing and leaves [`Hamt::cid`] unchanged.
    pub fn set(&mut self, key: impl AsRef<[u8]>, value: &V) -> Result<(), Error> {
        let value = ipld_core::serde::to_ipld(value)?;
        let key = key.as_ref();
        match self.trie().set(&self.root, key, value)? {
            Some(hamt) => self.commit(hamt),
            None => Ok(()),
        }
    }

    /// Removes `key` and its value. Removing an absent key writes nothing and
    /// leaves [`Hamt::cid`] unchanged.
    pub fn delete(&mut self, key: impl AsRef<[u8]>) -> Result<(), Error> {
        match self.trie().delete(&self.root, key.as_ref())? {
            Some(hamt) => self.commit(hamt),
            None => Ok(()),
        }
    }

    /// Persists a new root around `hamt` and moves the handle to it.
    fn commit(&mut self, hamt: Node) -> Result<(), Error> {
        let root = Root {
            hash_alg: self.hasher.code(),
            bucket_size: self.bucket_size,
            hamt,
        };
        let cid = self.store.save_root(&root)?;
        debug!(from = %self.cid, to = %cid, "HAMT root updated");
        self.root = Arc::new(root.hamt);
        self.cid = cid;
        Ok(())
    }

    /// Number of entries, counted by a full traversal.
    pub fn size(&self) -> Result<usize, Error> {
        let mut size = 0;
        for visit in self.walk() {
            if let Visit::Entry(_) = visit? {
                size += 1;
            }
        }
        Ok(size)
    }

    /// Returns `true` if the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// All keys, in traversal order.
    pub fn keys(&self) -> impl Iterator<Item = Result<Vec<u8>, Error>> + '_ {
        self.walk().filter_map(|visit| match visit {
            Ok(Visit::Entry(entry)) => Some(Ok(entry.key)),
            Ok(Visit::Block(_)) => None,
            Err(e) => Some(Err(e)),
        })
    }

    /// All values, in traversal order.
    pub fn values(&self) -> impl Iterator<Item = Result<V, Error>> + '_ {
        self.walk().filter_map(|visit| match visit {
            Ok(Visit::Entry(entry)) => {
                Some(ipld_core::serde::from_ipld(entry.value).map_err(Error::from))
            }
            Ok(Visit::Block(_)) => None,
            Err(e) => Some(Err(e)),
        })
    }

    /// All key/value pairs, in traversal order.
    pub fn entries(&self) -> impl Iterator<Item = Result<(Vec<u8>, V), Error>> + '_ {
        self.walk().filter_map(|visit| match visit {
            Ok(Visit::Entry(entry)) => Some(
                ipld_core::serde::from_ipld(entry.value)
                    .map(|value| (entry.key, value))
                    .map_err(Error::from),
            ),
            Ok(Visit::Block(_)) => None,
            Err(e) => Some(Err(e)),
        })
    }

    /// CIDs of every block making up the map: the root block first, then each
    /// child node in traversal order.
    pub fn cids(&self) -> impl Iterator<Item = Result<Cid, Error>> + '_ {
        self.walk().filter_map(|visit| match visit {
            Ok(Visit::Block(cid)) => Some(Ok(cid)),
            Ok(Visit::Entry(_)) => None,
            Err(e) => Some(Err(e)),
        })
    }
}
