//! End-to-end scenarios across the type operators, run on the memory engine.

use engine::MemoryEngine;
use std::sync::Arc;
use store::{Aggregate, Db, ScorePair, Store};

fn open_db() -> Arc<Db> {
    Store::open(Arc::new(MemoryEngine::new())).select(0).unwrap()
}

fn pair(score: i64, member: &[u8]) -> ScorePair {
    ScorePair {
        score,
        member: member.to_vec(),
    }
}

fn now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

#[test]
fn set_lifecycle() {
    let db = open_db();
    assert_eq!(db.sadd(b"S", &[b"a", b"b", b"c"]).unwrap(), 3);
    assert_eq!(db.scard(b"S").unwrap(), 3);
    assert_eq!(db.sadd(b"S", &[b"a"]).unwrap(), 0);
    assert_eq!(db.srem(b"S", &[b"a", b"b", b"c"]).unwrap(), 3);
    assert_eq!(db.scard(b"S").unwrap(), 0);
    // no size entry remains once the set is empty
    assert_eq!(db.sttl(b"S").unwrap(), -2);
}

#[test]
fn zset_scores_and_ranges() {
    let db = open_db();
    db.zadd(b"Z", &[pair(1, b"a"), pair(2, b"b"), pair(3, b"c")])
        .unwrap();

    let r = db.zrange_by_score(b"Z", 2, 3, 0, -1, false).unwrap();
    assert_eq!(r, vec![pair(2, b"b"), pair(3, b"c")]);

    assert_eq!(db.zincr_by(b"Z", -5, b"b").unwrap(), -3);

    let r = db.zrange(b"Z", 0, -1, false).unwrap();
    assert_eq!(r, vec![pair(-3, b"b"), pair(1, b"a"), pair(3, b"c")]);
}

#[test]
fn hash_fields() {
    let db = open_db();
    db.hset(b"H", b"f1", b"v1").unwrap();
    db.hset(b"H", b"f2", b"v2").unwrap();
    assert_eq!(db.hlen(b"H").unwrap(), 2);
    assert_eq!(db.hdel(b"H", &[b"f1"]).unwrap(), 1);
    assert_eq!(
        db.hgetall(b"H").unwrap(),
        vec![(b"f2".to_vec(), b"v2".to_vec())]
    );
}

#[test]
fn list_push_pop() {
    let db = open_db();
    db.lpush(b"L", &[b"1", b"2", b"3"]).unwrap();
    db.rpush(b"L", &[b"4", b"5"]).unwrap();
    assert_eq!(
        db.lrange(b"L", 0, -1).unwrap(),
        vec![
            b"3".to_vec(),
            b"2".to_vec(),
            b"1".to_vec(),
            b"4".to_vec(),
            b"5".to_vec()
        ]
    );
    assert_eq!(db.lpop(b"L").unwrap(), Some(b"3".to_vec()));
    assert_eq!(db.llen(b"L").unwrap(), 4);
}

#[test]
fn sinterstore_result() {
    let db = open_db();
    db.sadd(b"A", &[b"1", b"2", b"3"]).unwrap();
    db.sadd(b"B", &[b"2", b"3", b"4"]).unwrap();
    assert_eq!(db.sinter_store(b"D", &[b"A", b"B"]).unwrap(), 2);

    let mut members = db.smembers(b"D").unwrap();
    members.sort();
    assert_eq!(members, vec![b"2".to_vec(), b"3".to_vec()]);
}

#[test]
fn kv_expiry_sweep() {
    let db = open_db();
    db.set(b"k", b"hello").unwrap();
    let deadline = now() + 60;
    assert_eq!(db.expire_at(b"k", deadline).unwrap(), 1);
    assert!(db.ttl(b"k").unwrap() > 0);

    // deadline passes, sweep collects the key
    assert_eq!(db.purge_expired(deadline + 1).unwrap(), 1);
    assert_eq!(db.get(b"k").unwrap(), None);
    assert_eq!(db.ttl(b"k").unwrap(), -2);
}

#[test]
fn sweep_spans_types() {
    let db = open_db();
    let deadline = now() + 60;

    db.sadd(b"s", &[b"m"]).unwrap();
    db.hset(b"h", b"f", b"v").unwrap();
    db.rpush(b"l", &[b"e"]).unwrap();
    db.zadd(b"z", &[pair(1, b"m")]).unwrap();
    db.bset_bit(b"b", 3, 1).unwrap();
    db.set(b"k", b"v").unwrap();

    db.sexpire_at(b"s", deadline).unwrap();
    db.hexpire_at(b"h", deadline).unwrap();
    db.lexpire_at(b"l", deadline).unwrap();
    db.zexpire_at(b"z", deadline).unwrap();
    db.bexpire_at(b"b", deadline).unwrap();
    db.expire_at(b"k", deadline).unwrap();

    assert_eq!(db.purge_expired(deadline).unwrap(), 6);
    assert_eq!(db.scard(b"s").unwrap(), 0);
    assert_eq!(db.hlen(b"h").unwrap(), 0);
    assert_eq!(db.llen(b"l").unwrap(), 0);
    assert_eq!(db.zcard(b"z").unwrap(), 0);
    assert_eq!(db.bget(b"b").unwrap(), None);
    assert_eq!(db.get(b"k").unwrap(), None);
}

#[test]
fn databases_are_isolated() {
    let store = Store::open(Arc::new(MemoryEngine::new()));
    let db0 = store.select(0).unwrap();
    let db1 = store.select(1).unwrap();

    db0.set(b"k", b"zero").unwrap();
    db1.set(b"k", b"one").unwrap();
    db0.sadd(b"s", &[b"a"]).unwrap();

    assert_eq!(db0.get(b"k").unwrap(), Some(b"zero".to_vec()));
    assert_eq!(db1.get(b"k").unwrap(), Some(b"one".to_vec()));
    assert_eq!(db1.scard(b"s").unwrap(), 0);
}

#[test]
fn store_ops_across_types_keep_invariants() {
    let db = open_db();
    db.zadd(b"za", &[pair(1, b"m"), pair(2, b"n")]).unwrap();
    db.zadd(b"zb", &[pair(4, b"n"), pair(8, b"o")]).unwrap();

    assert_eq!(
        db.zunion_store(b"zd", &[b"za", b"zb"], Some(&[1, 2]), Aggregate::Sum)
            .unwrap(),
        3
    );
    assert_eq!(db.zscore(b"zd", b"n").unwrap(), 10);
    assert_eq!(db.zcard(b"zd").unwrap(), 3);

    // size entry equals what a full range scan sees
    assert_eq!(
        db.zrange(b"zd", 0, -1, false).unwrap().len() as i64,
        db.zcard(b"zd").unwrap()
    );
}

#[test]
fn same_key_different_types_coexist() {
    let db = open_db();
    db.set(b"x", b"kv").unwrap();
    db.sadd(b"x", &[b"member"]).unwrap();
    db.hset(b"x", b"f", b"v").unwrap();
    db.rpush(b"x", &[b"elem"]).unwrap();
    db.zadd(b"x", &[pair(1, b"zm")]).unwrap();
    db.bset_bit(b"x", 0, 1).unwrap();

    // each namespace decodes to its own logical entity
    assert_eq!(db.get(b"x").unwrap(), Some(b"kv".to_vec()));
    assert_eq!(db.scard(b"x").unwrap(), 1);
    assert_eq!(db.hlen(b"x").unwrap(), 1);
    assert_eq!(db.llen(b"x").unwrap(), 1);
    assert_eq!(db.zcard(b"x").unwrap(), 1);
    assert_eq!(db.bget_bit(b"x", 0).unwrap(), 1);

    // clearing one type leaves the others intact
    db.sclear(b"x").unwrap();
    assert_eq!(db.get(b"x").unwrap(), Some(b"kv".to_vec()));
    assert_eq!(db.hlen(b"x").unwrap(), 1);
}
