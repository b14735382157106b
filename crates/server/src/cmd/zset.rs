//! Sorted-set commands
//!
//! Only i64 scores are supported. Score-range arguments accept `-inf`/`+inf`
//! and `(`-prefixed exclusive bounds.

use super::{
    as_slices, integer, parse_i64, parse_score_range, score_pair_array, CmdResult, CommandError,
};
use crate::session::Session;
use bytes::Bytes;
use resp::RespValue;
use store::{Aggregate, ScorePair, StoreError};

pub fn zadd(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() < 3 || (args.len() - 1) % 2 != 0 {
        return Err(CommandError::CmdParams);
    }
    let mut pairs = Vec::with_capacity((args.len() - 1) / 2);
    for chunk in args[1..].chunks_exact(2) {
        pairs.push(ScorePair {
            score: parse_i64(&chunk[0])?,
            member: chunk[1].to_vec(),
        });
    }
    Ok(integer(session.db().zadd(&args[0], &pairs)?))
}

pub fn zcard(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 1 {
        return Err(CommandError::CmdParams);
    }
    Ok(integer(session.db().zcard(&args[0])?))
}

pub fn zscore(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 2 {
        return Err(CommandError::CmdParams);
    }
    match session.db().zscore(&args[0], &args[1]) {
        Ok(score) => Ok(RespValue::bulk(score.to_string().into_bytes())),
        Err(StoreError::ScoreMiss) => Ok(RespValue::nil()),
        Err(e) => Err(e.into()),
    }
}

pub fn zrem(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() < 2 {
        return Err(CommandError::CmdParams);
    }
    Ok(integer(session.db().zrem(&args[0], &as_slices(&args[1..]))?))
}

pub fn zincrby(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 3 {
        return Err(CommandError::CmdParams);
    }
    let delta = parse_i64(&args[1])?;
    let score = session.db().zincr_by(&args[0], delta, &args[2])?;
    Ok(RespValue::bulk(score.to_string().into_bytes()))
}

pub fn zcount(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 3 {
        return Err(CommandError::CmdParams);
    }
    let (min, max) = parse_score_range(&args[1], &args[2])?;
    if min > max {
        return Ok(integer(0));
    }
    Ok(integer(session.db().zcount(&args[0], min, max)?))
}

pub fn zrank(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 2 {
        return Err(CommandError::CmdParams);
    }
    rank_reply(session.db().zrank(&args[0], &args[1])?)
}

pub fn zrevrank(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 2 {
        return Err(CommandError::CmdParams);
    }
    rank_reply(session.db().zrevrank(&args[0], &args[1])?)
}

fn rank_reply(rank: i64) -> CmdResult {
    if rank == -1 {
        Ok(RespValue::nil())
    } else {
        Ok(integer(rank))
    }
}

pub fn zrange(session: &mut Session, args: &[Bytes]) -> CmdResult {
    zrange_generic(session, args, false)
}

pub fn zrevrange(session: &mut Session, args: &[Bytes]) -> CmdResult {
    zrange_generic(session, args, true)
}

fn zrange_generic(session: &mut Session, args: &[Bytes], reverse: bool) -> CmdResult {
    if args.len() < 3 {
        return Err(CommandError::CmdParams);
    }
    let start = parse_i64(&args[1])?;
    let stop = parse_i64(&args[2])?;
    let with_scores = match &args[3..] {
        [] => false,
        [flag] if flag.eq_ignore_ascii_case(b"withscores") => true,
        [_] => return Err(CommandError::Syntax),
        _ => return Err(CommandError::CmdParams),
    };
    let pairs = session.db().zrange(&args[0], start, stop, reverse)?;
    Ok(score_pair_array(pairs, with_scores))
}

pub fn zrangebyscore(session: &mut Session, args: &[Bytes]) -> CmdResult {
    zrangebyscore_generic(session, args, false)
}

pub fn zrevrangebyscore(session: &mut Session, args: &[Bytes]) -> CmdResult {
    zrangebyscore_generic(session, args, true)
}

fn zrangebyscore_generic(session: &mut Session, args: &[Bytes], reverse: bool) -> CmdResult {
    if args.len() < 3 {
        return Err(CommandError::CmdParams);
    }
    let key = &args[0];
    // reversed form takes max before min on the wire
    let (min_arg, max_arg) = if reverse {
        (&args[2], &args[1])
    } else {
        (&args[1], &args[2])
    };
    let (min, max) = parse_score_range(min_arg, max_arg)?;

    let mut rest = &args[3..];
    let mut with_scores = false;
    if let Some(flag) = rest.first() {
        if flag.eq_ignore_ascii_case(b"withscores") {
            with_scores = true;
            rest = &rest[1..];
        }
    }

    let mut offset = 0i64;
    let mut count = -1i64;
    if !rest.is_empty() {
        if rest.len() != 3 {
            return Err(CommandError::CmdParams);
        }
        if !rest[0].eq_ignore_ascii_case(b"limit") {
            return Err(CommandError::Syntax);
        }
        offset = parse_i64(&rest[1])?;
        count = parse_i64(&rest[2])?;
    }

    if offset < 0 {
        return Ok(RespValue::Array(Vec::new()));
    }

    let pairs = session
        .db()
        .zrange_by_score(key, min, max, offset, count, reverse)?;
    Ok(score_pair_array(pairs, with_scores))
}

pub fn zremrangebyrank(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 3 {
        return Err(CommandError::CmdParams);
    }
    let start = parse_i64(&args[1])?;
    let stop = parse_i64(&args[2])?;
    Ok(integer(session.db().zrem_range_by_rank(&args[0], start, stop)?))
}

pub fn zremrangebyscore(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 3 {
        return Err(CommandError::CmdParams);
    }
    let (min, max) = parse_score_range(&args[1], &args[2])?;
    Ok(integer(session.db().zrem_range_by_score(&args[0], min, max)?))
}

pub fn zclear(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 1 {
        return Err(CommandError::CmdParams);
    }
    Ok(integer(session.db().zclear(&args[0])?))
}

pub fn zmclear(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.is_empty() {
        return Err(CommandError::CmdParams);
    }
    Ok(integer(session.db().zmclear(&as_slices(args))?))
}

pub fn zexpire(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 2 {
        return Err(CommandError::CmdParams);
    }
    let duration = parse_i64(&args[1])?;
    Ok(integer(session.db().zexpire(&args[0], duration)?))
}

pub fn zexpireat(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 2 {
        return Err(CommandError::CmdParams);
    }
    let when = parse_i64(&args[1])?;
    Ok(integer(session.db().zexpire_at(&args[0], when)?))
}

pub fn zttl(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 1 {
        return Err(CommandError::CmdParams);
    }
    Ok(integer(session.db().zttl(&args[0])?))
}

pub fn zpersist(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 1 {
        return Err(CommandError::CmdParams);
    }
    Ok(integer(session.db().zpersist(&args[0])?))
}

pub fn zunionstore(session: &mut Session, args: &[Bytes]) -> CmdResult {
    let (dst, srcs, weights, aggregate) = parse_store_args(args)?;
    let src_refs: Vec<&[u8]> = srcs.iter().map(|s| s.as_ref()).collect();
    Ok(integer(session.db().zunion_store(
        dst,
        &src_refs,
        weights.as_deref(),
        aggregate,
    )?))
}

pub fn zinterstore(session: &mut Session, args: &[Bytes]) -> CmdResult {
    let (dst, srcs, weights, aggregate) = parse_store_args(args)?;
    let src_refs: Vec<&[u8]> = srcs.iter().map(|s| s.as_ref()).collect();
    Ok(integer(session.db().zinter_store(
        dst,
        &src_refs,
        weights.as_deref(),
        aggregate,
    )?))
}

/// `dst numkeys key [key ...] [WEIGHTS w ...] [AGGREGATE SUM|MIN|MAX]`
fn parse_store_args(
    args: &[Bytes],
) -> Result<(&[u8], &[Bytes], Option<Vec<i64>>, Aggregate), CommandError> {
    if args.len() < 3 {
        return Err(CommandError::CmdParams);
    }
    let dst = args[0].as_ref();
    let num_keys = parse_i64(&args[1])?;
    if num_keys <= 0 {
        return Err(CommandError::Value);
    }
    let num_keys = num_keys as usize;
    let mut rest = &args[2..];
    if rest.len() < num_keys {
        return Err(CommandError::Syntax);
    }
    let srcs = &rest[..num_keys];
    rest = &rest[num_keys..];

    let mut weights = None;
    let mut aggregate = Aggregate::Sum;
    let mut weights_seen = false;
    let mut aggregate_seen = false;

    while let Some(flag) = rest.first() {
        if flag.eq_ignore_ascii_case(b"weights") {
            if weights_seen {
                return Err(CommandError::Syntax);
            }
            rest = &rest[1..];
            if rest.len() < num_keys {
                return Err(CommandError::Syntax);
            }
            let mut w = Vec::with_capacity(num_keys);
            for arg in &rest[..num_keys] {
                w.push(parse_i64(arg)?);
            }
            weights = Some(w);
            rest = &rest[num_keys..];
            weights_seen = true;
        } else if flag.eq_ignore_ascii_case(b"aggregate") {
            if aggregate_seen || rest.len() < 2 {
                return Err(CommandError::Syntax);
            }
            aggregate = if rest[1].eq_ignore_ascii_case(b"sum") {
                Aggregate::Sum
            } else if rest[1].eq_ignore_ascii_case(b"min") {
                Aggregate::Min
            } else if rest[1].eq_ignore_ascii_case(b"max") {
                Aggregate::Max
            } else {
                return Err(CommandError::Syntax);
            };
            rest = &rest[2..];
            aggregate_seen = true;
        } else {
            return Err(CommandError::Syntax);
        }
    }

    Ok((dst, srcs, weights, aggregate))
}
