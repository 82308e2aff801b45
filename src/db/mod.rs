// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Block stores shipped with the crate. Any [`fvm_ipld_blockstore::Blockstore`]
//! works as a backend; these cover in-memory use and instrumentation.

mod memory;
mod tracking;

pub use memory::MemoryDB;
pub use tracking::{BlockstoreStats, TrackingBlockstore};
