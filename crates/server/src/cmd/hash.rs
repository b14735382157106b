//! Hash commands

use super::{as_slices, bulk_array, bulk_opt, integer, opt_bulk_array, parse_i64, CmdResult, CommandError};
use crate::session::Session;
use bytes::Bytes;
use resp::RespValue;

pub fn hset(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 3 {
        return Err(CommandError::CmdParams);
    }
    Ok(integer(session.db().hset(&args[0], &args[1], &args[2])?))
}

pub fn hget(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 2 {
        return Err(CommandError::CmdParams);
    }
    Ok(bulk_opt(session.db().hget(&args[0], &args[1])?))
}

pub fn hmset(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() < 3 || (args.len() - 1) % 2 != 0 {
        return Err(CommandError::CmdParams);
    }
    let fvs: Vec<(&[u8], &[u8])> = args[1..]
        .chunks_exact(2)
        .map(|c| (c[0].as_ref(), c[1].as_ref()))
        .collect();
    session.db().hmset(&args[0], &fvs)?;
    Ok(RespValue::ok())
}

pub fn hmget(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() < 2 {
        return Err(CommandError::CmdParams);
    }
    Ok(opt_bulk_array(
        session.db().hmget(&args[0], &as_slices(&args[1..]))?,
    ))
}

pub fn hdel(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() < 2 {
        return Err(CommandError::CmdParams);
    }
    Ok(integer(session.db().hdel(&args[0], &as_slices(&args[1..]))?))
}

pub fn hincrby(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 3 {
        return Err(CommandError::CmdParams);
    }
    let delta = parse_i64(&args[2])?;
    Ok(integer(session.db().hincr_by(&args[0], &args[1], delta)?))
}

pub fn hexists(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 2 {
        return Err(CommandError::CmdParams);
    }
    Ok(integer(session.db().hexists(&args[0], &args[1])?))
}

pub fn hlen(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 1 {
        return Err(CommandError::CmdParams);
    }
    Ok(integer(session.db().hlen(&args[0])?))
}

pub fn hkeys(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 1 {
        return Err(CommandError::CmdParams);
    }
    Ok(bulk_array(session.db().hkeys(&args[0])?))
}

pub fn hvals(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 1 {
        return Err(CommandError::CmdParams);
    }
    Ok(bulk_array(session.db().hvals(&args[0])?))
}

pub fn hgetall(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 1 {
        return Err(CommandError::CmdParams);
    }
    let mut items = Vec::new();
    for (field, value) in session.db().hgetall(&args[0])? {
        items.push(RespValue::bulk(field));
        items.push(RespValue::bulk(value));
    }
    Ok(RespValue::Array(items))
}

pub fn hclear(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 1 {
        return Err(CommandError::CmdParams);
    }
    Ok(integer(session.db().hclear(&args[0])?))
}

pub fn hmclear(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.is_empty() {
        return Err(CommandError::CmdParams);
    }
    Ok(integer(session.db().hmclear(&as_slices(args))?))
}

pub fn hexpire(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 2 {
        return Err(CommandError::CmdParams);
    }
    let duration = parse_i64(&args[1])?;
    Ok(integer(session.db().hexpire(&args[0], duration)?))
}

pub fn hexpireat(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 2 {
        return Err(CommandError::CmdParams);
    }
    let when = parse_i64(&args[1])?;
    Ok(integer(session.db().hexpire_at(&args[0], when)?))
}

pub fn httl(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 1 {
        return Err(CommandError::CmdParams);
    }
    Ok(integer(session.db().httl(&args[0])?))
}

pub fn hpersist(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 1 {
        return Err(CommandError::CmdParams);
    }
    Ok(integer(session.db().hpersist(&args[0])?))
}
