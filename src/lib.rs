// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Content-addressed IPLD HashMap.
//!
//! [Data structure reference](https://ipld.io/specs/advanced-data-layouts/hamt/spec/)
//!
//! The map is a Hash Array Mapped Trie whose nodes are persisted as immutable,
//! canonically encoded blocks addressed by their CID. Every mutation produces a
//! new root block; all untouched subtrees are shared by CID with the previous
//! version of the map.
//!
//! ```
//! use ipld_hashmap::{Config, Hamt, MemoryDB};
//!
//! let store = MemoryDB::default();
//! let mut map: Hamt<_, String> = Hamt::create(&store, Config::dag_cbor_sha256()).unwrap();
//! map.set("foo", &"bar".to_string()).unwrap();
//! assert_eq!(map.get("foo").unwrap(), Some("bar".to_string()));
//!
//! let reloaded: Hamt<_, String> =
//!     Hamt::load(map.cid(), &store, Config::dag_cbor_sha256()).unwrap();
//! assert_eq!(reloaded.cid(), map.cid());
//! ```

pub mod codec;
pub mod db;
pub mod hamt;
pub mod hash;
pub mod store;

pub use self::codec::{BlockCodec, DagCbor};
pub use self::db::{BlockstoreStats, MemoryDB, TrackingBlockstore};
pub use self::hamt::{Config, Error, Hamt, Settings};
pub use self::hash::{HasherRegistry, IdentityHasher, KeyHasher, MultihashHasher};

pub use cid::Cid;
pub use fvm_ipld_blockstore::Blockstore;
pub use ipld_core::ipld::Ipld;
pub use multihash_codetable::Code;
