// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::borrow::Cow;
use std::collections::BTreeMap;

use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use ipld_core::ipld::Ipld;
use tracing::debug;

use super::Error;
use super::hash_bits::extract_index;
use super::node::{BucketEntry, Element, Node};
use crate::hash::KeyHasher;
use crate::store::NodeStore;

/// Lookup and copy-on-write mutation over one map's nodes.
///
/// Mutations never touch their input: they return the replacement for the node
/// they were given (or `None` when nothing changed), persisting every new
/// child node on the way back up. Only the caller decides whether the result
/// becomes the map's new root.
pub(crate) struct Trie<'a, BS> {
    pub store: &'a NodeStore<BS>,
    pub hasher: &'a dyn KeyHasher,
    pub bit_width: u32,
    pub bucket_size: usize,
}

impl<BS> Trie<'_, BS>
where
    BS: Blockstore,
{
    fn index(&self, digest: &[u8], depth: u32) -> Result<u32, Error> {
        extract_index(digest, depth, self.bit_width)
    }

    fn load_child(&self, cid: &Cid) -> Result<Node, Error> {
        self.store.load_node(cid, self.bit_width, self.bucket_size)
    }

    pub fn get(&self, root: &Node, key: &[u8]) -> Result<Option<Ipld>, Error> {
        let digest = self.hasher.digest(key);
        let mut node = Cow::Borrowed(root);
        let mut depth = 0;
        loop {
            let idx = self.index(&digest, depth)?;
            let link = match node.element(idx) {
                None => return Ok(None),
                Some(Element::Bucket(entries)) => {
                    return Ok(entries
                        .iter()
                        .find(|e| e.key == key)
                        .map(|e| e.value.clone()));
                }
                Some(Element::Link(cid)) => *cid,
            };
            node = Cow::Owned(self.load_child(&link)?);
            depth += 1;
        }
    }

    pub fn set(&self, root: &Node, key: &[u8], value: Ipld) -> Result<Option<Node>, Error> {
        let digest = self.hasher.digest(key);
        self.set_at(root, 0, &digest, key, value)
    }

    pub fn delete(&self, root: &Node, key: &[u8]) -> Result<Option<Node>, Error> {
        let digest = self.hasher.digest(key);
        self.delete_at(root, 0, &digest, key)
    }

    fn same_value(&self, a: &Ipld, b: &Ipld) -> Result<bool, Error> {
        let codec = self.store.codec();
        Ok(codec.encode(a)? == codec.encode(b)?)
    }

    fn set_at(
        &self,
        node: &Node,
        depth: u32,
        digest: &[u8],
        key: &[u8],
        value: Ipld,
    ) -> Result<Option<Node>, Error> {
        let idx = self.index(digest, depth)?;

        let entries = match node.element(idx) {
            // No existing values at this point.
            None => {
                let bucket = Element::Bucket(vec![BucketEntry::new(key.to_vec(), value)]);
                return Ok(Some(node.with_element(idx, bucket)));
            }
            Some(Element::Link(cid)) => {
                let child = self.load_child(cid)?;
                let Some(child) = self.set_at(&child, depth + 1, digest, key, value)? else {
                    return Ok(None);
                };
                let cid = self.store.save_node(&child)?;
                return Ok(Some(node.with_element(idx, Element::Link(cid))));
            }
            Some(Element::Bucket(entries)) => entries,
        };

        // Update, if the key already exists.
        if let Some(pos) = entries.iter().position(|e| e.key == key) {
            if self.same_value(&entries[pos].value, &value)? {
                return Ok(None);
            }
            let mut entries = entries.clone();
            entries[pos].value = value;
            return Ok(Some(node.with_element(idx, Element::Bucket(entries))));
        }

        // Otherwise insert the entry into the bucket in key order.
        if entries.len() < self.bucket_size {
            let pos = entries
                .iter()
                .position(|e| e.key.as_slice() > key)
                .unwrap_or(entries.len());
            let mut entries = entries.clone();
            entries.insert(pos, BucketEntry::new(key.to_vec(), value));
            return Ok(Some(node.with_element(idx, Element::Bucket(entries))));
        }

        // The bucket is full, push everything down into a new child node.
        let mut overflow = entries.clone();
        overflow.push(BucketEntry::new(key.to_vec(), value));
        let child = self.build_subtree(overflow, depth + 1)?;
        let cid = self.store.save_node(&child)?;
        debug!(depth, %cid, "bucket overflowed into child node");
        Ok(Some(node.with_element(idx, Element::Link(cid))))
    }

    /// Distributes `entries` over a fresh node at `depth`, overflowing again
    /// wherever more than `bucket_size` of them share a slot.
    fn build_subtree(&self, entries: Vec<BucketEntry>, depth: u32) -> Result<Node, Error> {
        let mut slots: BTreeMap<u32, Vec<BucketEntry>> = BTreeMap::new();
        for entry in entries {
            let idx = self.index(&self.hasher.digest(&entry.key), depth)?;
            slots.entry(idx).or_default().push(entry);
        }

        let mut node = Node::empty(self.bit_width);
        for (idx, mut bucket) in slots {
            let element = if bucket.len() > self.bucket_size {
                let child = self.build_subtree(bucket, depth + 1)?;
                Element::Link(self.store.save_node(&child)?)
            } else {
                bucket.sort_by(|a, b| a.key.cmp(&b.key));
                Element::Bucket(bucket)
            };
            node = node.with_element(idx, element);
        }
        Ok(node)
    }

    fn delete_at(
        &self,
        node: &Node,
        depth: u32,
        digest: &[u8],
        key: &[u8],
    ) -> Result<Option<Node>, Error> {
        let idx = self.index(digest, depth)?;

        match node.element(idx) {
            None => Ok(None),
            Some(Element::Bucket(entries)) => {
                let Some(pos) = entries.iter().position(|e| e.key == key) else {
                    return Ok(None);
                };
                if entries.len() == 1 {
                    return Ok(Some(node.without_element(idx)));
                }
                let mut entries = entries.clone();
                entries.remove(pos);
                Ok(Some(node.with_element(idx, Element::Bucket(entries))))
            }
            Some(Element::Link(cid)) => {
                let child = self.load_child(cid)?;
                let Some(child) = self.delete_at(&child, depth + 1, digest, key)? else {
                    return Ok(None);
                };

                // Keep the canonical form: a child only exists while its
                // subtree holds more entries than fit in one bucket.
                if !child.has_links() && child.bucket_entry_count() <= self.bucket_size {
                    let mut entries: Vec<BucketEntry> = child
                        .data()
                        .iter()
                        .flat_map(|e| match e {
                            Element::Bucket(entries) => entries.clone(),
                            Element::Link(_) => Vec::new(),
                        })
                        .collect();
                    if entries.is_empty() {
                        return Ok(Some(node.without_element(idx)));
                    }
                    entries.sort_by(|a, b| a.key.cmp(&b.key));
                    debug!(
                        depth,
                        entries = entries.len(),
                        "collapsing child node into bucket"
                    );
                    return Ok(Some(node.with_element(idx, Element::Bucket(entries))));
                }

                let cid = self.store.save_node(&child)?;
                Ok(Some(node.with_element(idx, Element::Link(cid))))
            }
        }
    }
}
