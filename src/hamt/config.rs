// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::fmt;
use std::sync::Arc;

use multihash_codetable::Code;
use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;

use super::Error;
use super::hash_bits::max_depth;
use crate::codec::{BlockCodec, DAG_CBOR, DagCbor};
use crate::hash::{HasherRegistry, KeyHasher, MultihashHasher};

pub use super::hash_bits::MAX_BIT_WIDTH;

/// Default bit width for indexing a hash at each depth level
pub const DEFAULT_BIT_WIDTH: u32 = 5;
/// Default maximum number of entries in a bucket before it overflows
pub const DEFAULT_BUCKET_SIZE: usize = 3;
/// Smallest supported bit width; narrower bitmaps would not identify their width.
pub const MIN_BIT_WIDTH: u32 = 3;

/// Options of a HAMT instance.
///
/// `block_codec` and `block_hasher` have no default and must be set, see
/// [`Config::dag_cbor_sha256`]. When loading an existing map, `bit_width` and
/// `bucket_size` are ignored in favor of the values stored in its root.
#[derive(Clone, SmartDefault)]
pub struct Config {
    /// Codec used to encode every block.
    pub block_codec: Option<Arc<dyn BlockCodec>>,
    /// Hash function of the CIDs addressing blocks.
    pub block_hasher: Option<Code>,
    /// Hash function indexing keys into the trie; SHA2-256 when unset.
    pub hasher: Option<Arc<dyn KeyHasher>>,
    /// Expected digest length of `hasher`; checked against the hasher when set.
    pub hash_bytes: Option<usize>,
    /// The `bit_width` drives how wide and high the tree is going to be.
    /// Each node in the tree will have `2^bit_width` number of slots,
    /// and consume `bit_width` number of bits from the hashed keys at each level.
    #[default(DEFAULT_BIT_WIDTH)]
    pub bit_width: u32,
    /// Maximum number of key-value pairs in a bucket before it's pushed down.
    #[default(DEFAULT_BUCKET_SIZE)]
    pub bucket_size: usize,
    /// Hashers resolvable from the `hashAlg` code of a loaded root.
    pub registry: HasherRegistry,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("block_codec", &self.block_codec)
            .field("block_hasher", &self.block_hasher.map(u64::from))
            .field("hasher", &self.hasher)
            .field("hash_bytes", &self.hash_bytes)
            .field("bit_width", &self.bit_width)
            .field("bucket_size", &self.bucket_size)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// DAG-CBOR blocks addressed by SHA2-256, every other option at its default.
    pub fn dag_cbor_sha256() -> Self {
        Self {
            block_codec: Some(Arc::new(DagCbor)),
            block_hasher: Some(Code::Sha2_256),
            ..Default::default()
        }
    }

    pub fn with_bit_width(mut self, bit_width: u32) -> Self {
        self.bit_width = bit_width;
        self
    }

    pub fn with_bucket_size(mut self, bucket_size: usize) -> Self {
        self.bucket_size = bucket_size;
        self
    }

    pub fn with_hasher(mut self, hasher: Arc<dyn KeyHasher>) -> Self {
        self.hasher = Some(hasher);
        self
    }

    /// Checks every option and resolves the defaults.
    pub(crate) fn validate(&self) -> Result<Validated, Error> {
        let block_codec = self
            .block_codec
            .clone()
            .ok_or_else(|| Error::configuration("requires a `block_codec` option"))?;
        let block_hasher = self
            .block_hasher
            .ok_or_else(|| Error::configuration("requires a `block_hasher` option"))?;
        let hasher: Arc<dyn KeyHasher> = match &self.hasher {
            Some(hasher) => hasher.clone(),
            None => Arc::new(MultihashHasher::sha2_256()),
        };
        if let Some(hash_bytes) = self.hash_bytes.filter(|&n| n != hasher.hash_bytes()) {
            return Err(Error::configuration(format!(
                "`hash_bytes` is {hash_bytes} but the hasher {:#x} produces {} bytes",
                hasher.code(),
                hasher.hash_bytes()
            )));
        }
        if !(MIN_BIT_WIDTH..=MAX_BIT_WIDTH).contains(&self.bit_width) {
            return Err(Error::configuration(format!(
                "`bit_width` must be between {MIN_BIT_WIDTH} and {MAX_BIT_WIDTH}, got {}",
                self.bit_width
            )));
        }
        if self.bucket_size == 0 {
            return Err(Error::configuration("`bucket_size` must be at least 1"));
        }
        if max_depth(hasher.hash_bytes(), self.bit_width) == 0 {
            return Err(Error::configuration(format!(
                "a {} byte digest cannot index {} bits",
                hasher.hash_bytes(),
                self.bit_width
            )));
        }

        let mut registry = self.registry.clone();
        if self.hasher.is_some() {
            registry.register(hasher.clone());
        }

        Ok(Validated {
            block_codec,
            block_hasher,
            hasher,
            bit_width: self.bit_width,
            bucket_size: self.bucket_size,
            registry,
        })
    }
}

/// [`Config`] with all required options present and defaults resolved.
#[derive(Debug, Clone)]
pub(crate) struct Validated {
    pub block_codec: Arc<dyn BlockCodec>,
    pub block_hasher: Code,
    pub hasher: Arc<dyn KeyHasher>,
    pub bit_width: u32,
    pub bucket_size: usize,
    pub registry: HasherRegistry,
}

/// Serializable HAMT options, referring to codecs and hash functions by their
/// multicodec codes.
///
/// ```toml
/// block_codec = 0x71
/// block_hasher = 0x12
/// hash_alg = 0x12
/// bit_width = 5
/// bucket_size = 3
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SmartDefault)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    #[default(DAG_CBOR)]
    pub block_codec: u64,
    #[default(0x12)]
    pub block_hasher: u64,
    #[default(0x12)]
    pub hash_alg: u64,
    #[default(DEFAULT_BIT_WIDTH)]
    pub bit_width: u32,
    #[default(DEFAULT_BUCKET_SIZE)]
    pub bucket_size: usize,
}

impl Settings {
    pub fn from_toml(s: &str) -> Result<Self, Error> {
        toml::from_str(s).map_err(|e| Error::configuration(format!("invalid settings: {e}")))
    }

    pub fn to_toml(&self) -> Result<String, Error> {
        toml::to_string(self).map_err(|e| Error::configuration(format!("invalid settings: {e}")))
    }

    /// Resolves the codes into a [`Config`]; `hash_alg` is looked up in `registry`.
    pub fn into_config(self, registry: HasherRegistry) -> Result<Config, Error> {
        if self.block_codec != DAG_CBOR {
            return Err(Error::configuration(format!(
                "unsupported `block_codec` {:#x}",
                self.block_codec
            )));
        }
        let block_hasher = Code::try_from(self.block_hasher).map_err(|_| {
            Error::configuration(format!(
                "unsupported `block_hasher` {:#x}",
                self.block_hasher
            ))
        })?;
        let hasher = registry.get(self.hash_alg).ok_or_else(|| {
            Error::configuration(format!("unregistered `hash_alg` {:#x}", self.hash_alg))
        })?;
        Ok(Config {
            block_codec: Some(Arc::new(DagCbor)),
            block_hasher: Some(block_hasher),
            hasher: Some(hasher),
            hash_bytes: None,
            bit_width: self.bit_width,
            bucket_size: self.bucket_size,
            registry,
        })
    }
}
