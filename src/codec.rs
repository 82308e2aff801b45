// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Canonical block codecs.

use std::fmt;

use ipld_core::ipld::Ipld;

use crate::hamt::Error;

/// Multicodec code of DAG-CBOR.
pub const DAG_CBOR: u64 = 0x71;

/// Deterministic serialization of IPLD data to block bytes.
///
/// Implementations must be canonical: logically identical data always encodes
/// to identical bytes, otherwise structurally equal maps would get different
/// CIDs.
pub trait BlockCodec: fmt::Debug + Send + Sync {
    /// Multicodec code recorded in the CIDs of encoded blocks.
    fn code(&self) -> u64;

    fn encode(&self, ipld: &Ipld) -> Result<Vec<u8>, Error>;

    fn decode(&self, bytes: &[u8]) -> Result<Ipld, Error>;
}

/// DAG-CBOR, map keys sorted length first as the format requires.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DagCbor;

impl BlockCodec for DagCbor {
    fn code(&self) -> u64 {
        DAG_CBOR
    }

    fn encode(&self, ipld: &Ipld) -> Result<Vec<u8>, Error> {
        serde_ipld_dagcbor::to_vec(ipld).map_err(|e| Error::Codec(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Ipld, Error> {
        serde_ipld_dagcbor::from_slice(bytes)
            .map_err(|e| Error::Codec(format!("decode error: {e}")))
    }
}
