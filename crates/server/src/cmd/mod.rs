//! Command dispatch
//!
//! One handler function per command, grouped by type. Handlers validate
//! arity, parse arguments, call the operator, and shape the reply; the
//! operators own all data semantics.

mod bit;
mod hash;
mod kv;
mod list;
mod set;
mod srv;
mod zset;

use crate::session::Session;
use bytes::Bytes;
use resp::RespValue;
use store::{StoreError, MAX_SCORE, MIN_SCORE};

/// Router-level command error
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("invalid command param")]
    CmdParams,
    #[error("value is not an integer or out of range")]
    Value,
    #[error("syntax error")]
    Syntax,
    #[error("unknown command '{0}'")]
    Unknown(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type CmdResult = Result<RespValue, CommandError>;

type Handler = fn(&mut Session, &[Bytes]) -> CmdResult;

fn lookup(name: &str) -> Option<Handler> {
    Some(match name {
        // server
        "ping" => srv::ping,
        "echo" => srv::echo,
        "select" => srv::select,

        // kv
        "get" => kv::get,
        "set" => kv::set,
        "setnx" => kv::setnx,
        "getset" => kv::getset,
        "incr" => kv::incr,
        "incrby" => kv::incrby,
        "decr" => kv::decr,
        "decrby" => kv::decrby,
        "mget" => kv::mget,
        "mset" => kv::mset,
        "del" => kv::del,
        "exists" => kv::exists,
        "expire" => kv::expire,
        "expireat" => kv::expireat,
        "ttl" => kv::ttl,
        "persist" => kv::persist,

        // hash
        "hset" => hash::hset,
        "hget" => hash::hget,
        "hmset" => hash::hmset,
        "hmget" => hash::hmget,
        "hdel" => hash::hdel,
        "hincrby" => hash::hincrby,
        "hexists" => hash::hexists,
        "hlen" => hash::hlen,
        "hkeys" => hash::hkeys,
        "hvals" => hash::hvals,
        "hgetall" => hash::hgetall,
        "hclear" => hash::hclear,
        "hmclear" => hash::hmclear,
        "hexpire" => hash::hexpire,
        "hexpireat" => hash::hexpireat,
        "httl" => hash::httl,
        "hpersist" => hash::hpersist,

        // list
        "lpush" => list::lpush,
        "rpush" => list::rpush,
        "lpop" => list::lpop,
        "rpop" => list::rpop,
        "llen" => list::llen,
        "lindex" => list::lindex,
        "lrange" => list::lrange,
        "lclear" => list::lclear,
        "lmclear" => list::lmclear,
        "lexpire" => list::lexpire,
        "lexpireat" => list::lexpireat,
        "lttl" => list::lttl,
        "lpersist" => list::lpersist,

        // set
        "sadd" => set::sadd,
        "srem" => set::srem,
        "scard" => set::scard,
        "sismember" => set::sismember,
        "smembers" => set::smembers,
        "sdiff" => set::sdiff,
        "sdiffstore" => set::sdiffstore,
        "sinter" => set::sinter,
        "sinterstore" => set::sinterstore,
        "sunion" => set::sunion,
        "sunionstore" => set::sunionstore,
        "sclear" => set::sclear,
        "smclear" => set::smclear,
        "sexpire" => set::sexpire,
        "sexpireat" => set::sexpireat,
        "sttl" => set::sttl,
        "spersist" => set::spersist,

        // zset
        "zadd" => zset::zadd,
        "zcard" => zset::zcard,
        "zscore" => zset::zscore,
        "zrem" => zset::zrem,
        "zincrby" => zset::zincrby,
        "zcount" => zset::zcount,
        "zrank" => zset::zrank,
        "zrevrank" => zset::zrevrank,
        "zrange" => zset::zrange,
        "zrevrange" => zset::zrevrange,
        "zrangebyscore" => zset::zrangebyscore,
        "zrevrangebyscore" => zset::zrevrangebyscore,
        "zremrangebyrank" => zset::zremrangebyrank,
        "zremrangebyscore" => zset::zremrangebyscore,
        "zclear" => zset::zclear,
        "zmclear" => zset::zmclear,
        "zexpire" => zset::zexpire,
        "zexpireat" => zset::zexpireat,
        "zttl" => zset::zttl,
        "zpersist" => zset::zpersist,
        "zunionstore" => zset::zunionstore,
        "zinterstore" => zset::zinterstore,

        // bitmap
        "bget" => bit::bget,
        "bdelete" => bit::bdelete,
        "bsetbit" => bit::bsetbit,
        "bgetbit" => bit::bgetbit,
        "bmsetbit" => bit::bmsetbit,
        "bcount" => bit::bcount,
        "bopt" => bit::bopt,
        "bexpire" => bit::bexpire,
        "bexpireat" => bit::bexpireat,
        "bttl" => bit::bttl,
        "bpersist" => bit::bpersist,

        _ => return None,
    })
}

/// Route one request; errors become wire error replies.
pub fn dispatch(session: &mut Session, args: &[Bytes]) -> RespValue {
    let Some((name, args)) = args.split_first() else {
        return RespValue::error("ERR empty command");
    };
    let name = String::from_utf8_lossy(name).to_lowercase();
    let result = match lookup(&name) {
        Some(handler) => handler(session, args),
        None => Err(CommandError::Unknown(name)),
    };
    match result {
        Ok(reply) => reply,
        Err(e) => RespValue::error(format!("ERR {}", e)),
    }
}

// ---------------------------------------------------------------------------
// Argument parsing helpers
// ---------------------------------------------------------------------------

fn parse_i64(arg: &[u8]) -> Result<i64, CommandError> {
    std::str::from_utf8(arg)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or(CommandError::Value)
}

/// One bound of a score range: `-inf`/`+inf` map to the sentinels, a leading
/// `(` makes the bound exclusive (stripped exactly once).
fn parse_score_bound(arg: &[u8], is_min: bool) -> Result<i64, CommandError> {
    if arg.eq_ignore_ascii_case(b"-inf") {
        return Ok(MIN_SCORE);
    }
    if arg.eq_ignore_ascii_case(b"+inf") {
        return Ok(MAX_SCORE);
    }
    if arg.is_empty() {
        return Err(CommandError::CmdParams);
    }
    let (open, digits) = match arg[0] {
        b'(' => (true, &arg[1..]),
        _ => (false, arg),
    };
    let v = parse_i64(digits)?;
    if v <= MIN_SCORE || v >= MAX_SCORE {
        return Err(CommandError::Store(StoreError::ScoreOverflow));
    }
    Ok(if open {
        if is_min {
            v + 1
        } else {
            v - 1
        }
    } else {
        v
    })
}

fn parse_score_range(min: &[u8], max: &[u8]) -> Result<(i64, i64), CommandError> {
    Ok((parse_score_bound(min, true)?, parse_score_bound(max, false)?))
}

// ---------------------------------------------------------------------------
// Reply builders
// ---------------------------------------------------------------------------

fn integer(n: i64) -> RespValue {
    RespValue::Integer(n)
}

fn bulk_opt(v: Option<Vec<u8>>) -> RespValue {
    match v {
        Some(v) => RespValue::bulk(v),
        None => RespValue::nil(),
    }
}

fn bulk_array(items: Vec<Vec<u8>>) -> RespValue {
    RespValue::Array(items.into_iter().map(RespValue::bulk).collect())
}

fn opt_bulk_array(items: Vec<Option<Vec<u8>>>) -> RespValue {
    RespValue::Array(items.into_iter().map(bulk_opt).collect())
}

fn score_pair_array(pairs: Vec<store::ScorePair>, with_scores: bool) -> RespValue {
    let mut items = Vec::with_capacity(pairs.len() * if with_scores { 2 } else { 1 });
    for p in pairs {
        items.push(RespValue::bulk(p.member));
        if with_scores {
            items.push(RespValue::bulk(p.score.to_string().into_bytes()));
        }
    }
    RespValue::Array(items)
}

fn as_slices(args: &[Bytes]) -> Vec<&[u8]> {
    args.iter().map(|a| a.as_ref()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::MemoryEngine;
    use std::sync::Arc;
    use store::Store;

    fn session() -> Session {
        Session::new(Arc::new(Store::open(Arc::new(MemoryEngine::new())))).unwrap()
    }

    fn run(session: &mut Session, parts: &[&[u8]]) -> RespValue {
        let args: Vec<Bytes> = parts.iter().map(|p| Bytes::copy_from_slice(p)).collect();
        dispatch(session, &args)
    }

    #[test]
    fn kv_round_trip_over_dispatch() {
        let mut s = session();
        assert_eq!(run(&mut s, &[b"SET", b"k", b"v"]), RespValue::ok());
        assert_eq!(
            run(&mut s, &[b"GET", b"k"]),
            RespValue::bulk(&b"v"[..])
        );
        assert_eq!(run(&mut s, &[b"DEL", b"k"]), RespValue::Integer(1));
        assert_eq!(run(&mut s, &[b"GET", b"k"]), RespValue::nil());
    }

    #[test]
    fn arity_violations_report_errors() {
        let mut s = session();
        assert!(matches!(run(&mut s, &[b"GET"]), RespValue::Error(_)));
        assert!(matches!(run(&mut s, &[b"SET", b"k"]), RespValue::Error(_)));
        assert!(matches!(
            run(&mut s, &[b"MSET", b"k", b"v", b"dangling"]),
            RespValue::Error(_)
        ));
        assert!(matches!(run(&mut s, &[b"NOSUCH"]), RespValue::Error(_)));
    }

    #[test]
    fn select_switches_database() {
        let mut s = session();
        run(&mut s, &[b"SET", b"k", b"zero"]);
        assert_eq!(run(&mut s, &[b"SELECT", b"1"]), RespValue::ok());
        assert_eq!(run(&mut s, &[b"GET", b"k"]), RespValue::nil());
        assert_eq!(run(&mut s, &[b"SELECT", b"0"]), RespValue::ok());
        assert_eq!(run(&mut s, &[b"GET", b"k"]), RespValue::bulk(&b"zero"[..]));
        assert!(matches!(
            run(&mut s, &[b"SELECT", b"16"]),
            RespValue::Error(_)
        ));
    }

    #[test]
    fn zrangebyscore_with_scores_and_limit() {
        let mut s = session();
        run(&mut s, &[b"ZADD", b"z", b"1", b"a", b"2", b"b", b"3", b"c"]);
        let reply = run(
            &mut s,
            &[b"ZRANGEBYSCORE", b"z", b"2", b"3", b"WITHSCORES"],
        );
        assert_eq!(
            reply,
            RespValue::Array(vec![
                RespValue::bulk(&b"b"[..]),
                RespValue::bulk(&b"2"[..]),
                RespValue::bulk(&b"c"[..]),
                RespValue::bulk(&b"3"[..]),
            ])
        );

        let reply = run(
            &mut s,
            &[b"ZRANGEBYSCORE", b"z", b"-inf", b"+inf", b"LIMIT", b"1", b"1"],
        );
        assert_eq!(reply, RespValue::Array(vec![RespValue::bulk(&b"b"[..])]));

        // negative offset yields an empty array
        let reply = run(
            &mut s,
            &[b"ZRANGEBYSCORE", b"z", b"1", b"3", b"LIMIT", b"-1", b"2"],
        );
        assert_eq!(reply, RespValue::Array(vec![]));
    }

    #[test]
    fn exclusive_bounds_strip_once() {
        let mut s = session();
        run(&mut s, &[b"ZADD", b"z", b"1", b"a", b"2", b"b", b"3", b"c"]);
        let reply = run(&mut s, &[b"ZCOUNT", b"z", b"(1", b"(3"]);
        assert_eq!(reply, RespValue::Integer(1));
        let reply = run(&mut s, &[b"ZCOUNT", b"z", b"-inf", b"(2"]);
        assert_eq!(reply, RespValue::Integer(1));
    }

    #[test]
    fn zscore_missing_member_is_nil() {
        let mut s = session();
        run(&mut s, &[b"ZADD", b"z", b"1", b"a"]);
        assert_eq!(run(&mut s, &[b"ZSCORE", b"z", b"a"]), RespValue::bulk(&b"1"[..]));
        assert_eq!(run(&mut s, &[b"ZSCORE", b"z", b"x"]), RespValue::nil());
        assert_eq!(run(&mut s, &[b"ZRANK", b"z", b"x"]), RespValue::nil());
    }

    #[test]
    fn zunionstore_full_syntax() {
        let mut s = session();
        run(&mut s, &[b"ZADD", b"a", b"1", b"x"]);
        run(&mut s, &[b"ZADD", b"b", b"2", b"x", b"3", b"y"]);
        let reply = run(
            &mut s,
            &[
                b"ZUNIONSTORE",
                b"d",
                b"2",
                b"a",
                b"b",
                b"WEIGHTS",
                b"10",
                b"1",
                b"AGGREGATE",
                b"SUM",
            ],
        );
        assert_eq!(reply, RespValue::Integer(2));
        assert_eq!(run(&mut s, &[b"ZSCORE", b"d", b"x"]), RespValue::bulk(&b"12"[..]));
    }

    #[test]
    fn hash_and_set_flow() {
        let mut s = session();
        run(&mut s, &[b"HMSET", b"h", b"f1", b"v1", b"f2", b"v2"]);
        assert_eq!(run(&mut s, &[b"HLEN", b"h"]), RespValue::Integer(2));
        assert_eq!(
            run(&mut s, &[b"HGETALL", b"h"]),
            RespValue::Array(vec![
                RespValue::bulk(&b"f1"[..]),
                RespValue::bulk(&b"v1"[..]),
                RespValue::bulk(&b"f2"[..]),
                RespValue::bulk(&b"v2"[..]),
            ])
        );

        run(&mut s, &[b"SADD", b"s", b"a", b"b"]);
        assert_eq!(run(&mut s, &[b"SCARD", b"s"]), RespValue::Integer(2));
        assert_eq!(
            run(&mut s, &[b"SISMEMBER", b"s", b"a"]),
            RespValue::Integer(1)
        );
    }

    #[test]
    fn bitmap_flow() {
        let mut s = session();
        assert_eq!(
            run(&mut s, &[b"BSETBIT", b"b", b"7", b"1"]),
            RespValue::Integer(0)
        );
        assert_eq!(
            run(&mut s, &[b"BGETBIT", b"b", b"7"]),
            RespValue::Integer(1)
        );
        assert_eq!(run(&mut s, &[b"BCOUNT", b"b"]), RespValue::Integer(1));
        assert_eq!(run(&mut s, &[b"BGET", b"b"]), RespValue::bulk(&[1u8][..]));
    }
}
