// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Shape validation of decoded blocks.
//!
//! ```text
//! type HashMapRoot struct {
//!   hashAlg Int
//!   bucketSize Int
//!   hamt HashMapNode
//! }
//!
//! type HashMapNode struct {
//!   map Bytes
//!   data [ Element ]
//! } representation tuple
//!
//! type Element union {
//!   | &HashMapNode link
//!   | Bucket list
//! } representation kinded
//!
//! type Bucket [ BucketEntry ]
//!
//! type BucketEntry struct {
//!   key Bytes
//!   value Any
//! } representation tuple
//! ```
//!
//! Besides the schema itself, nodes must agree with the map parameters: the
//! bitmap length identifies the bit width, the element count equals the bitmap
//! population and buckets hold between one and `bucketSize` entries.

use cid::Cid;
use ipld_core::ipld::Ipld;

use crate::hamt::Error;
use crate::hamt::bitfield::Bitfield;
use crate::hamt::config::{MAX_BIT_WIDTH, MIN_BIT_WIDTH};
use crate::hamt::node::{
    BucketEntry, Element, Node, ROOT_BUCKET_SIZE, ROOT_HAMT, ROOT_HASH_ALG, Root,
};

fn kind(ipld: &Ipld) -> &'static str {
    match ipld {
        Ipld::Null => "null",
        Ipld::Bool(_) => "bool",
        Ipld::Integer(_) => "int",
        Ipld::Float(_) => "float",
        Ipld::String(_) => "string",
        Ipld::Bytes(_) => "bytes",
        Ipld::List(_) => "list",
        Ipld::Map(_) => "map",
        Ipld::Link(_) => "link",
    }
}

fn int_field<T: TryFrom<i128>>(cid: &Cid, name: &str, ipld: Ipld) -> Result<T, Error> {
    let reason = match ipld {
        Ipld::Integer(i) => match T::try_from(i) {
            Ok(value) => return Ok(value),
            Err(_) => format!("`{name}` out of range: {i}"),
        },
        other => format!("`{name}` must be an int, got {}", kind(&other)),
    };
    Err(Error::schema(*cid, reason))
}

pub fn root_from_ipld(cid: &Cid, ipld: Ipld) -> Result<Root, Error> {
    let Ipld::Map(mut map) = ipld else {
        return Err(Error::schema(
            *cid,
            format!("root must be a map, got {}", kind(&ipld)),
        ));
    };
    if let Some(unknown) = map
        .keys()
        .find(|k| ![ROOT_HASH_ALG, ROOT_BUCKET_SIZE, ROOT_HAMT].contains(&k.as_str()))
    {
        return Err(Error::schema(
            *cid,
            format!("unknown root field `{unknown}`"),
        ));
    }
    let mut field = |name: &str| {
        map.remove(name)
            .ok_or_else(|| Error::schema(*cid, format!("root is missing `{name}`")))
    };

    let hash_alg: u64 = int_field(cid, ROOT_HASH_ALG, field(ROOT_HASH_ALG)?)?;
    let bucket_size: usize = int_field(cid, ROOT_BUCKET_SIZE, field(ROOT_BUCKET_SIZE)?)?;
    if bucket_size == 0 {
        return Err(Error::schema(*cid, "`bucketSize` must be positive"));
    }
    let hamt = node_from_ipld(cid, field(ROOT_HAMT)?, None, bucket_size)?;

    Ok(Root {
        hash_alg,
        bucket_size,
        hamt,
    })
}

/// Validates a node. With `bit_width` unset (the root's top level node) the
/// width is taken from the bitmap length, which must still be a supported one.
pub fn node_from_ipld(
    cid: &Cid,
    ipld: Ipld,
    bit_width: Option<u32>,
    bucket_size: usize,
) -> Result<Node, Error> {
    let Ipld::List(parts) = ipld else {
        return Err(Error::schema(
            *cid,
            format!("node must be a list, got {}", kind(&ipld)),
        ));
    };
    let Ok([bitmap, data]) = <[Ipld; 2]>::try_from(parts) else {
        return Err(Error::schema(*cid, "node must have exactly two fields"));
    };
    let Ipld::Bytes(bitmap) = bitmap else {
        return Err(Error::schema(
            *cid,
            format!("node bitmap must be bytes, got {}", kind(&bitmap)),
        ));
    };
    let Ipld::List(data) = data else {
        return Err(Error::schema(
            *cid,
            format!("node data must be a list, got {}", kind(&data)),
        ));
    };

    match (bit_width, Bitfield::bit_width_for(bitmap.len())) {
        (Some(expected), _) if bitmap.len() != Bitfield::byte_len(expected) => {
            return Err(Error::schema(
                *cid,
                format!(
                    "bitmap has {} bytes, expected {} for bit width {expected}",
                    bitmap.len(),
                    Bitfield::byte_len(expected)
                ),
            ));
        }
        (None, Some(bw)) if (MIN_BIT_WIDTH..=MAX_BIT_WIDTH).contains(&bw) => {}
        (None, _) => {
            return Err(Error::schema(
                *cid,
                format!("unsupported bitmap length {}", bitmap.len()),
            ));
        }
        _ => {}
    }
    let bitmap = Bitfield::from_bytes(bitmap);
    if bitmap.count_ones() != data.len() {
        return Err(Error::schema(
            *cid,
            format!(
                "bitmap population {} does not match {} elements",
                bitmap.count_ones(),
                data.len()
            ),
        ));
    }

    let data = data
        .into_iter()
        .map(|e| element_from_ipld(cid, e, bucket_size))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Node::from_parts(bitmap, data))
}

fn element_from_ipld(cid: &Cid, ipld: Ipld, bucket_size: usize) -> Result<Element, Error> {
    match ipld {
        Ipld::Link(link) => Ok(Element::Link(link)),
        Ipld::List(entries) => {
            if entries.is_empty() || entries.len() > bucket_size {
                return Err(Error::schema(
                    *cid,
                    format!(
                        "bucket holds {} entries, expected 1 to {bucket_size}",
                        entries.len()
                    ),
                ));
            }
            entries
                .into_iter()
                .map(|entry| entry_from_ipld(cid, entry))
                .collect::<Result<Vec<_>, _>>()
                .map(Element::Bucket)
        }
        other => Err(Error::schema(
            *cid,
            format!("element must be a link or a list, got {}", kind(&other)),
        )),
    }
}

fn entry_from_ipld(cid: &Cid, ipld: Ipld) -> Result<BucketEntry, Error> {
    match ipld {
        Ipld::List(pair) => match <[Ipld; 2]>::try_from(pair) {
            Ok([Ipld::Bytes(key), value]) => Ok(BucketEntry::new(key, value)),
            Ok([key, _]) => Err(Error::schema(
                *cid,
                format!("bucket entry key must be bytes, got {}", kind(&key)),
            )),
            Err(_) => Err(Error::schema(*cid, "bucket entry must have two fields")),
        },
        other => Err(Error::schema(
            *cid,
            format!("bucket entry must be a list, got {}", kind(&other)),
        )),
    }
}
