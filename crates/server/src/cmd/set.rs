//! Set commands

use super::{as_slices, bulk_array, integer, parse_i64, CmdResult, CommandError};
use crate::session::Session;
use bytes::Bytes;

pub fn sadd(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() < 2 {
        return Err(CommandError::CmdParams);
    }
    Ok(integer(session.db().sadd(&args[0], &as_slices(&args[1..]))?))
}

pub fn srem(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() < 2 {
        return Err(CommandError::CmdParams);
    }
    Ok(integer(session.db().srem(&args[0], &as_slices(&args[1..]))?))
}

pub fn scard(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 1 {
        return Err(CommandError::CmdParams);
    }
    Ok(integer(session.db().scard(&args[0])?))
}

pub fn sismember(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 2 {
        return Err(CommandError::CmdParams);
    }
    Ok(integer(session.db().sismember(&args[0], &args[1])?))
}

pub fn smembers(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 1 {
        return Err(CommandError::CmdParams);
    }
    Ok(bulk_array(session.db().smembers(&args[0])?))
}

pub fn sdiff(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.is_empty() {
        return Err(CommandError::CmdParams);
    }
    Ok(bulk_array(session.db().sdiff(&as_slices(args))?))
}

pub fn sdiffstore(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() < 2 {
        return Err(CommandError::CmdParams);
    }
    Ok(integer(
        session.db().sdiff_store(&args[0], &as_slices(&args[1..]))?,
    ))
}

pub fn sinter(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.is_empty() {
        return Err(CommandError::CmdParams);
    }
    Ok(bulk_array(session.db().sinter(&as_slices(args))?))
}

pub fn sinterstore(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() < 2 {
        return Err(CommandError::CmdParams);
    }
    Ok(integer(
        session.db().sinter_store(&args[0], &as_slices(&args[1..]))?,
    ))
}

pub fn sunion(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.is_empty() {
        return Err(CommandError::CmdParams);
    }
    Ok(bulk_array(session.db().sunion(&as_slices(args))?))
}

pub fn sunionstore(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() < 2 {
        return Err(CommandError::CmdParams);
    }
    Ok(integer(
        session.db().sunion_store(&args[0], &as_slices(&args[1..]))?,
    ))
}

pub fn sclear(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 1 {
        return Err(CommandError::CmdParams);
    }
    Ok(integer(session.db().sclear(&args[0])?))
}

pub fn smclear(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.is_empty() {
        return Err(CommandError::CmdParams);
    }
    Ok(integer(session.db().smclear(&as_slices(args))?))
}

pub fn sexpire(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 2 {
        return Err(CommandError::CmdParams);
    }
    let duration = parse_i64(&args[1])?;
    Ok(integer(session.db().sexpire(&args[0], duration)?))
}

pub fn sexpireat(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 2 {
        return Err(CommandError::CmdParams);
    }
    let when = parse_i64(&args[1])?;
    Ok(integer(session.db().sexpire_at(&args[0], when)?))
}

pub fn sttl(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 1 {
        return Err(CommandError::CmdParams);
    }
    Ok(integer(session.db().sttl(&args[0])?))
}

pub fn spersist(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 1 {
        return Err(CommandError::CmdParams);
    }
    Ok(integer(session.db().spersist(&args[0])?))
}
