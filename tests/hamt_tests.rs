// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use ipld_hashmap::codec::DAG_CBOR;
use ipld_hashmap::{
    BlockCodec as _, Blockstore, Cid, Code, Config, DagCbor, Error, Hamt, IdentityHasher, Ipld,
    MemoryDB, TrackingBlockstore,
};
use multihash_codetable::MultihashDigest as _;
use pretty_assertions::assert_eq;
use quickcheck_macros::quickcheck;
use rstest::rstest;

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn config(bit_width: u32, bucket_size: usize) -> Config {
    Config::dag_cbor_sha256()
        .with_bit_width(bit_width)
        .with_bucket_size(bucket_size)
}

fn put_raw(store: &MemoryDB, bytes: &[u8]) -> Cid {
    let cid = Cid::new_v1(DAG_CBOR, Code::Sha2_256.digest(bytes));
    store.put_keyed(&cid, bytes).unwrap();
    cid
}

fn entries<BS: Blockstore>(hamt: &Hamt<BS, String>) -> BTreeMap<Vec<u8>, String> {
    hamt.entries().collect::<Result<_, _>>().unwrap()
}

/// Blockstore that rejects every write once its write budget is spent.
struct FlakyStore {
    inner: MemoryDB,
    budget: AtomicUsize,
}

impl FlakyStore {
    fn new() -> Self {
        Self {
            inner: MemoryDB::default(),
            budget: AtomicUsize::new(usize::MAX),
        }
    }

    fn allow_writes(&self, n: usize) {
        self.budget.store(n, Ordering::Relaxed);
    }
}

impl Blockstore for FlakyStore {
    fn get(&self, cid: &Cid) -> anyhow::Result<Option<Vec<u8>>> {
        self.inner.get(cid)
    }

    fn put_keyed(&self, cid: &Cid, block: &[u8]) -> anyhow::Result<()> {
        let budget = self.budget.load(Ordering::Relaxed);
        if budget == 0 {
            anyhow::bail!("write budget exhausted");
        }
        self.budget.store(budget - 1, Ordering::Relaxed);
        self.inner.put_keyed(cid, block)
    }
}

#[test]
fn basic_set_delete() {
    init_logging();
    let store = MemoryDB::default();
    let mut hamt: Hamt<_, String> = Hamt::create(&store, config(4, 2)).unwrap();
    hamt.set("foo", &"bar".to_owned()).unwrap();
    hamt.set("bar", &"baz".to_owned()).unwrap();
    hamt.set("baz", &"boom".to_owned()).unwrap();

    assert_eq!(hamt.size().unwrap(), 3);
    assert_eq!(
        entries(&hamt),
        BTreeMap::from([
            (b"foo".to_vec(), "bar".to_owned()),
            (b"bar".to_vec(), "baz".to_owned()),
            (b"baz".to_vec(), "boom".to_owned()),
        ])
    );

    let before = *hamt.cid();
    hamt.delete("bar").unwrap();
    assert_eq!(hamt.size().unwrap(), 2);
    assert_ne!(hamt.cid(), &before);
    assert!(!hamt.has("bar").unwrap());
    assert_eq!(hamt.get("baz").unwrap(), Some("boom".to_owned()));
}

#[test]
fn load_reproduces_map() {
    let store = MemoryDB::default();
    let mut hamt: Hamt<_, String> = Hamt::create(&store, config(4, 2)).unwrap();
    for (k, v) in [("foo", "bar"), ("bar", "baz"), ("baz", "boom")] {
        hamt.set(k, &v.to_owned()).unwrap();
    }

    let loaded: Hamt<_, String> =
        Hamt::load(hamt.cid(), &store, Config::dag_cbor_sha256()).unwrap();
    assert_eq!(loaded.cid(), hamt.cid());
    assert_eq!(loaded.bit_width(), 4);
    assert_eq!(loaded.bucket_size(), 2);
    assert_eq!(entries(&loaded), entries(&hamt));
    assert_eq!(
        loaded.cids().collect::<Result<Vec<_>, _>>().unwrap(),
        hamt.cids().collect::<Result<Vec<_>, _>>().unwrap()
    );
}

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .filter(|w| !w.is_empty())
        .map(str::to_ascii_lowercase)
}

#[test]
fn word_index() {
    init_logging();
    let corpus = [
        include_str!("../src/hamt/trie.rs"),
        include_str!("../src/hamt/mod.rs"),
        include_str!("../src/hamt/config.rs"),
        include_str!("../src/store/schema.rs"),
        include_str!("../src/store/mod.rs"),
    ]
    .join("\n");

    let store = MemoryDB::default();
    let mut hamt: Hamt<_, Vec<u64>> = Hamt::create(&store, Config::dag_cbor_sha256()).unwrap();
    let mut expected: BTreeMap<Vec<u8>, Vec<u64>> = BTreeMap::new();
    for (pos, word) in (0u64..).zip(words(&corpus)) {
        let mut positions = hamt.get(&word).unwrap().unwrap_or_default();
        positions.push(pos);
        hamt.set(&word, &positions).unwrap();
        expected.entry(word.into_bytes()).or_default().push(pos);
    }

    let actual: BTreeMap<Vec<u8>, Vec<u64>> = hamt.entries().collect::<Result<_, _>>().unwrap();
    assert_eq!(actual, expected);
    assert_eq!(hamt.size().unwrap(), expected.len());
    for (word, positions) in &expected {
        assert_eq!(hamt.get(word).unwrap().as_ref(), Some(positions));
    }

    let cids = hamt.cids().collect::<Result<Vec<_>, _>>().unwrap();
    assert_eq!(cids.first(), Some(hamt.cid()));
    assert!(cids.len() >= 20, "only {} blocks", cids.len());
    assert_eq!(cids.iter().collect::<HashSet<_>>().len(), cids.len());

    let cid = *hamt.cid();
    hamt.delete("not a word in the corpus").unwrap();
    assert_eq!(hamt.cid(), &cid);
    hamt.delete("hamt").unwrap();
    assert_ne!(hamt.cid(), &cid);
    assert_eq!(hamt.get("hamt").unwrap(), None);
    assert_eq!(hamt.size().unwrap(), expected.len() - 1);
}

#[test]
fn repeated_set_is_idempotent() {
    let store = TrackingBlockstore::new(MemoryDB::default());
    let mut hamt: Hamt<_, String> = Hamt::create(&store, config(3, 1)).unwrap();
    for i in 0..50 {
        hamt.set(format!("key-{i}"), &format!("value-{i}")).unwrap();
    }
    hamt.set("key-7", &"changed".to_owned()).unwrap();
    let cid = *hamt.cid();

    store.reset_stats();
    hamt.set("key-7", &"changed".to_owned()).unwrap();
    hamt.delete("key-50").unwrap();
    assert_eq!(hamt.cid(), &cid);
    assert_eq!(store.stats().w, 0);
}

#[test]
fn size_tracks_sets_and_deletes() {
    let store = MemoryDB::default();
    let mut hamt: Hamt<_, u32> = Hamt::create(&store, config(3, 2)).unwrap();
    let mut live = HashSet::new();
    for i in 0..120u32 {
        hamt.set(i.to_be_bytes(), &i).unwrap();
        live.insert(i);
        if i % 3 == 0 {
            let victim = i / 2;
            hamt.delete(victim.to_be_bytes()).unwrap();
            live.remove(&victim);
        }
    }
    assert_eq!(hamt.size().unwrap(), live.len());
    for i in 0..120u32 {
        assert_eq!(hamt.has(i.to_be_bytes()).unwrap(), live.contains(&i));
    }
}

#[rstest]
#[case(3)]
#[case(4)]
#[case(5)]
#[case(6)]
#[case(7)]
#[case(8)]
#[case(12)]
#[case(16)]
fn every_bit_width(#[case] bit_width: u32) {
    let store = MemoryDB::default();
    let mut hamt: Hamt<_, u64> = Hamt::create(&store, config(bit_width, 1)).unwrap();
    for i in 0..200u64 {
        hamt.set(format!("{i}"), &i).unwrap();
    }
    for i in (0..200u64).step_by(2) {
        hamt.delete(format!("{i}")).unwrap();
    }
    assert_eq!(hamt.size().unwrap(), 100);

    let loaded: Hamt<_, u64> = Hamt::load(hamt.cid(), &store, Config::dag_cbor_sha256()).unwrap();
    assert_eq!(loaded.bit_width(), bit_width);
    for i in 0..200u64 {
        let expected = (i % 2 == 1).then_some(i);
        assert_eq!(loaded.get(format!("{i}")).unwrap(), expected);
    }
}

#[test]
fn emptied_map_matches_new_map() {
    let store = MemoryDB::default();
    let empty: Hamt<_, u8> = Hamt::create(&store, config(3, 1)).unwrap();
    let mut hamt: Hamt<_, u8> = Hamt::create(&store, config(3, 1)).unwrap();
    for i in 0..64u8 {
        hamt.set([i], &i).unwrap();
    }
    for i in 0..64u8 {
        hamt.delete([i]).unwrap();
    }
    assert!(hamt.is_empty());
    assert_eq!(hamt, empty);
}

/// Applies `ops` in order (`None` deletes) and checks the result against a map
/// built from the final state directly.
#[quickcheck]
fn shape_is_independent_of_history(ops: Vec<(u8, Option<u16>)>) -> bool {
    let store = MemoryDB::default();
    let mut replayed: Hamt<_, u16> = Hamt::create(&store, config(3, 1)).unwrap();
    let mut state = BTreeMap::new();
    for (key, value) in ops {
        match value {
            Some(v) => {
                replayed.set([key], &v).unwrap();
                state.insert(key, v);
            }
            None => {
                replayed.delete([key]).unwrap();
                state.remove(&key);
            }
        }
    }

    let mut direct: Hamt<_, u16> = Hamt::create(&store, config(3, 1)).unwrap();
    for (key, value) in state.iter().rev() {
        direct.set([*key], value).unwrap();
    }
    replayed == direct && replayed.size().unwrap() == state.len()
}

#[test]
fn full_collision_exceeds_depth() {
    let store = MemoryDB::default();
    let colliding = config(8, 1).with_hasher(Arc::new(IdentityHasher::new(1)));
    let mut hamt: Hamt<_, u8> = Hamt::create(&store, colliding).unwrap();
    hamt.set([1, 0], &0).unwrap();
    let cid = *hamt.cid();

    assert!(matches!(
        hamt.set([1, 1], &1),
        Err(Error::DepthExceeded { .. })
    ));
    assert_eq!(hamt.cid(), &cid);
    assert_eq!(hamt.get([1, 0]).unwrap(), Some(0));
    assert_eq!(hamt.get([1, 1]).unwrap(), None);
}

#[test]
fn failed_write_keeps_previous_root() {
    let store = FlakyStore::new();
    let slotted = config(8, 1).with_hasher(Arc::new(IdentityHasher::new(4)));
    let mut hamt: Hamt<_, String> = Hamt::create(&store, slotted).unwrap();
    hamt.set([1, 0], &"a".to_owned()).unwrap();
    let cid = *hamt.cid();

    store.allow_writes(0);
    let err = hamt.delete([1, 0]).unwrap_err();
    assert!(matches!(err, Error::Store(_)));
    assert_eq!(hamt.cid(), &cid);

    // [1, 1] shares slot 1 with [1, 0] and overflows into a child node: the
    // child is written, the new root is not.
    store.allow_writes(1);
    let blocks = store.inner.len();
    let err = hamt.set([1, 1], &"b".to_owned()).unwrap_err();
    assert!(matches!(err, Error::Store(_)));
    assert_eq!(store.inner.len(), blocks + 1);
    assert_eq!(hamt.cid(), &cid);
    assert_eq!(hamt.get([1, 0]).unwrap(), Some("a".to_owned()));
    assert!(!hamt.has([1, 1]).unwrap());
    assert_eq!(hamt.cids().count(), 1);

    // the orphaned child is reused once the write goes through
    store.allow_writes(usize::MAX);
    hamt.set([1, 1], &"b".to_owned()).unwrap();
    assert_eq!(store.inner.len(), blocks + 2);
    assert_eq!(hamt.cids().count(), 2);
    assert_eq!(hamt.size().unwrap(), 2);
}

#[test]
fn missing_root() {
    let store = MemoryDB::default();
    let cid = Cid::new_v1(DAG_CBOR, Code::Sha2_256.digest(b"nothing here"));
    assert!(matches!(
        Hamt::<_, Ipld>::load(&cid, &store, Config::dag_cbor_sha256()),
        Err(Error::NotFound(c)) if c == cid
    ));
}

#[test]
fn corrupt_blocks() {
    let store = MemoryDB::default();

    // bytes that are not DAG-CBOR
    let garbage = put_raw(&store, &[0xff, 0x00, 0x13, 0x37]);
    assert!(matches!(
        Hamt::<_, Ipld>::load(&garbage, &store, Config::dag_cbor_sha256()),
        Err(Error::Codec(_))
    ));

    // bytes that do not match their address
    let forged = Cid::new_v1(DAG_CBOR, Code::Sha2_256.digest(b"original"));
    store.put_keyed(&forged, b"tampered").unwrap();
    assert!(matches!(
        Hamt::<_, Ipld>::load(&forged, &store, Config::dag_cbor_sha256()),
        Err(Error::BlockIntegrity(_))
    ));

    // valid DAG-CBOR of the wrong shape
    let text = DagCbor.encode(&Ipld::String("not a root".into())).unwrap();
    let wrong_shape = put_raw(&store, &text);
    assert!(matches!(
        Hamt::<_, Ipld>::load(&wrong_shape, &store, Config::dag_cbor_sha256()),
        Err(Error::SchemaViolation { .. })
    ));
}

#[test]
fn unregistered_hash_alg() {
    let store = MemoryDB::default();
    let root = Ipld::Map(BTreeMap::from([
        ("hashAlg".to_owned(), Ipld::Integer(0x9999)),
        ("bucketSize".to_owned(), Ipld::Integer(3)),
        (
            "hamt".to_owned(),
            Ipld::List(vec![Ipld::Bytes(vec![0; 4]), Ipld::List(vec![])]),
        ),
    ]));
    let cid = put_raw(&store, &DagCbor.encode(&root).unwrap());
    assert!(matches!(
        Hamt::<_, Ipld>::load(&cid, &store, Config::dag_cbor_sha256()),
        Err(Error::Configuration(_))
    ));
}

#[test]
fn invalid_configuration() {
    let store = MemoryDB::default();
    for config in [Config::default(), config(2, 3), config(17, 3), config(5, 0)] {
        assert!(matches!(
            Hamt::<_, Ipld>::create(&store, config),
            Err(Error::Configuration(_))
        ));
    }
    assert!(store.is_empty());
}
