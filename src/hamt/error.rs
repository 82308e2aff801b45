// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::Cid;
use thiserror::Error;

/// HAMT Error
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid option, or a hash algorithm code with no registered hasher.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// The block store has no bytes for the requested CID.
    #[error("Cid ({0}) did not match any in database")]
    NotFound(Cid),
    /// A decoded block does not have the shape of a HAMT root or node.
    #[error("Block {cid} does not match the HAMT schema: {reason}")]
    SchemaViolation { cid: Cid, reason: String },
    /// All digest bits were consumed without resolving a unique slot.
    #[error("Maximum depth reached ({depth})")]
    DepthExceeded { depth: u32 },
    /// The bytes returned by the store do not hash to the CID they were requested under.
    #[error("Loaded block for {0} did not validate bytes against CID")]
    BlockIntegrity(Cid),
    /// Canonical encoding or decoding of a block failed.
    #[error("Codec error: {0}")]
    Codec(String),
    /// A value could not be converted to or from the IPLD data model.
    #[error("Value conversion error: {0}")]
    Value(String),
    /// Error forwarded as is from the underlying block store.
    #[error("Block store error: {0}")]
    Store(#[source] anyhow::Error),
}

impl Error {
    pub(crate) fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub(crate) fn schema(cid: Cid, reason: impl Into<String>) -> Self {
        Self::SchemaViolation {
            cid,
            reason: reason.into(),
        }
    }
}

impl From<ipld_core::serde::SerdeError> for Error {
    fn from(e: ipld_core::serde::SerdeError) -> Self {
        Self::Value(e.to_string())
    }
}
