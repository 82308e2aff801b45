// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::collections::BTreeMap;

use cid::Cid;
use ipld_core::ipld::Ipld;

use super::bitfield::Bitfield;

/// Root block field holding the indexing hash algorithm code.
pub const ROOT_HASH_ALG: &str = "hashAlg";
/// Root block field holding the maximum bucket length.
pub const ROOT_BUCKET_SIZE: &str = "bucketSize";
/// Root block field holding the top level node.
pub const ROOT_HAMT: &str = "hamt";

/// Key/value pair stored inline in a bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketEntry {
    pub key: Vec<u8>,
    pub value: Ipld,
}

impl BucketEntry {
    pub fn new(key: Vec<u8>, value: Ipld) -> Self {
        Self { key, value }
    }

    fn to_ipld(&self) -> Ipld {
        Ipld::List(vec![Ipld::Bytes(self.key.clone()), self.value.clone()])
    }
}

/// Content of an occupied slot: a link to a child node, or a bucket of entries
/// sorted by key bytes.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Link(Cid),
    Bucket(Vec<BucketEntry>),
}

impl Element {
    pub fn is_link(&self) -> bool {
        matches!(self, Element::Link(_))
    }

    fn to_ipld(&self) -> Ipld {
        match self {
            Element::Link(cid) => Ipld::Link(*cid),
            Element::Bucket(entries) => {
                Ipld::List(entries.iter().map(BucketEntry::to_ipld).collect())
            }
        }
    }
}

/// One level of the trie. Never mutated once built; changes go through
/// [`Node::with_element`] and [`Node::without_element`], which return new nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    bitmap: Bitfield,
    data: Vec<Element>,
}

impl Node {
    pub fn empty(bit_width: u32) -> Self {
        Node {
            bitmap: Bitfield::zero(bit_width),
            data: Vec::new(),
        }
    }

    /// Assembles a node from decoded parts. The caller guarantees that
    /// `data.len()` equals the popcount of `bitmap`.
    pub(crate) fn from_parts(bitmap: Bitfield, data: Vec<Element>) -> Self {
        debug_assert_eq!(bitmap.count_ones(), data.len());
        Node { bitmap, data }
    }

    pub fn bitmap(&self) -> &Bitfield {
        &self.bitmap
    }

    pub fn data(&self) -> &[Element] {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Element at logical slot `idx`, if occupied.
    pub fn element(&self, idx: u32) -> Option<&Element> {
        if self.bitmap.test_bit(idx) {
            Some(&self.data[self.bitmap.rank(idx)])
        } else {
            None
        }
    }

    /// Occupied slots with their elements, low to high.
    pub fn slots(&self) -> impl Iterator<Item = (u32, &Element)> + '_ {
        self.bitmap.ones().zip(self.data.iter())
    }

    /// Copy of this node with `element` stored at slot `idx`, replacing any
    /// previous occupant.
    pub fn with_element(&self, idx: u32, element: Element) -> Node {
        let mut bitmap = self.bitmap.clone();
        let mut data = self.data.clone();
        let pos = bitmap.rank(idx);
        if bitmap.test_bit(idx) {
            data[pos] = element;
        } else {
            bitmap.set_bit(idx);
            data.insert(pos, element);
        }
        Node { bitmap, data }
    }

    /// Copy of this node with slot `idx` emptied.
    pub fn without_element(&self, idx: u32) -> Node {
        if !self.bitmap.test_bit(idx) {
            return self.clone();
        }
        let mut bitmap = self.bitmap.clone();
        let mut data = self.data.clone();
        data.remove(bitmap.rank(idx));
        bitmap.clear_bit(idx);
        Node { bitmap, data }
    }

    pub fn has_links(&self) -> bool {
        self.data.iter().any(Element::is_link)
    }

    /// Number of entries held directly in this node's buckets.
    pub fn bucket_entry_count(&self) -> usize {
        self.data
            .iter()
            .map(|e| match e {
                Element::Bucket(entries) => entries.len(),
                Element::Link(_) => 0,
            })
            .sum()
    }

    /// Wire form: `[bitmap bytes, [element...]]`.
    pub fn to_ipld(&self) -> Ipld {
        Ipld::List(vec![
            Ipld::Bytes(self.bitmap.as_bytes().to_vec()),
            Ipld::List(self.data.iter().map(Element::to_ipld).collect()),
        ])
    }
}

/// Top level block of a map version.
#[derive(Debug, Clone, PartialEq)]
pub struct Root {
    pub hash_alg: u64,
    pub bucket_size: usize,
    pub hamt: Node,
}

impl Root {
    /// Wire form: `{hashAlg, bucketSize, hamt}`.
    pub fn to_ipld(&self) -> Ipld {
        let mut map = BTreeMap::new();
        map.insert(
            ROOT_HASH_ALG.to_owned(),
            Ipld::Integer(i128::from(self.hash_alg)),
        );
        map.insert(
            ROOT_BUCKET_SIZE.to_owned(),
            Ipld::Integer(self.bucket_size as i128),
        );
        map.insert(ROOT_HAMT.to_owned(), self.hamt.to_ipld());
        Ipld::Map(map)
    }
}
