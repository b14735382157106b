//! KV commands

use super::{as_slices, bulk_opt, integer, opt_bulk_array, parse_i64, CmdResult, CommandError};
use crate::session::Session;
use bytes::Bytes;
use resp::RespValue;

pub fn get(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 1 {
        return Err(CommandError::CmdParams);
    }
    Ok(bulk_opt(session.db().get(&args[0])?))
}

pub fn set(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 2 {
        return Err(CommandError::CmdParams);
    }
    session.db().set(&args[0], &args[1])?;
    Ok(RespValue::ok())
}

pub fn setnx(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 2 {
        return Err(CommandError::CmdParams);
    }
    Ok(integer(session.db().setnx(&args[0], &args[1])?))
}

pub fn getset(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 2 {
        return Err(CommandError::CmdParams);
    }
    Ok(bulk_opt(session.db().getset(&args[0], &args[1])?))
}

pub fn incr(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 1 {
        return Err(CommandError::CmdParams);
    }
    Ok(integer(session.db().incr(&args[0])?))
}

pub fn incrby(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 2 {
        return Err(CommandError::CmdParams);
    }
    let delta = parse_i64(&args[1])?;
    Ok(integer(session.db().incr_by(&args[0], delta)?))
}

pub fn decr(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 1 {
        return Err(CommandError::CmdParams);
    }
    Ok(integer(session.db().decr(&args[0])?))
}

pub fn decrby(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 2 {
        return Err(CommandError::CmdParams);
    }
    let delta = parse_i64(&args[1])?;
    Ok(integer(session.db().decr_by(&args[0], delta)?))
}

pub fn mget(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.is_empty() {
        return Err(CommandError::CmdParams);
    }
    Ok(opt_bulk_array(session.db().mget(&as_slices(args))?))
}

pub fn mset(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.is_empty() || args.len() % 2 != 0 {
        return Err(CommandError::CmdParams);
    }
    let kvs: Vec<(&[u8], &[u8])> = args
        .chunks_exact(2)
        .map(|c| (c[0].as_ref(), c[1].as_ref()))
        .collect();
    session.db().mset(&kvs)?;
    Ok(RespValue::ok())
}

pub fn del(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.is_empty() {
        return Err(CommandError::CmdParams);
    }
    Ok(integer(session.db().del(&as_slices(args))?))
}

pub fn exists(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 1 {
        return Err(CommandError::CmdParams);
    }
    Ok(integer(session.db().exists(&args[0])?))
}

pub fn expire(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 2 {
        return Err(CommandError::CmdParams);
    }
    let duration = parse_i64(&args[1])?;
    Ok(integer(session.db().expire(&args[0], duration)?))
}

pub fn expireat(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 2 {
        return Err(CommandError::CmdParams);
    }
    let when = parse_i64(&args[1])?;
    Ok(integer(session.db().expire_at(&args[0], when)?))
}

pub fn ttl(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 1 {
        return Err(CommandError::CmdParams);
    }
    Ok(integer(session.db().ttl(&args[0])?))
}

pub fn persist(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 1 {
        return Err(CommandError::CmdParams);
    }
    Ok(integer(session.db().persist(&args[0])?))
}
