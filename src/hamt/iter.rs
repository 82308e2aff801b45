// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::collections::VecDeque;
use std::sync::Arc;

use cid::Cid;
use fvm_ipld_blockstore::Blockstore;

use super::Error;
use super::node::{BucketEntry, Element, Node};
use crate::store::NodeStore;

/// Item produced by a [`Walk`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Visit {
    /// A block of the map: the root block first, then every child node as it
    /// is entered.
    Block(Cid),
    Entry(BucketEntry),
}

struct Frame {
    node: Arc<Node>,
    pos: usize,
}

/// Lazy depth-first walk over a map version, slots visited low to high.
///
/// Child nodes are loaded from the store only when the walk reaches them. The
/// walk is finite and forward only; after an error it yields nothing more.
pub(crate) struct Walk<'a, BS> {
    store: &'a NodeStore<BS>,
    bit_width: u32,
    bucket_size: usize,
    root_cid: Option<Cid>,
    stack: Vec<Frame>,
    pending: VecDeque<BucketEntry>,
}

impl<'a, BS> Walk<'a, BS> {
    pub fn new(
        store: &'a NodeStore<BS>,
        root_cid: Cid,
        root: Arc<Node>,
        bit_width: u32,
        bucket_size: usize,
    ) -> Self {
        Self {
            store,
            bit_width,
            bucket_size,
            root_cid: Some(root_cid),
            stack: vec![Frame { node: root, pos: 0 }],
            pending: VecDeque::new(),
        }
    }
}

impl<BS> Iterator for Walk<'_, BS>
where
    BS: Blockstore,
{
    type Item = Result<Visit, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(cid) = self.root_cid.take() {
            return Some(Ok(Visit::Block(cid)));
        }
        loop {
            if let Some(entry) = self.pending.pop_front() {
                return Some(Ok(Visit::Entry(entry)));
            }
            let frame = self.stack.last_mut()?;
            let Some(element) = frame.node.data().get(frame.pos).cloned() else {
                self.stack.pop();
                continue;
            };
            frame.pos += 1;

            match element {
                Element::Bucket(entries) => self.pending.extend(entries),
                Element::Link(cid) => {
                    return match self.store.load_node(&cid, self.bit_width, self.bucket_size) {
                        Ok(child) => {
                            self.stack.push(Frame {
                                node: Arc::new(child),
                                pos: 0,
                            });
                            Some(Ok(Visit::Block(cid)))
                        }
                        Err(e) => {
                            self.stack.clear();
                            Some(Err(e))
                        }
                    };
                }
            }
        }
    }
}
