//! List commands

use super::{as_slices, bulk_array, bulk_opt, integer, parse_i64, CmdResult, CommandError};
use crate::session::Session;
use bytes::Bytes;

pub fn lpush(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() < 2 {
        return Err(CommandError::CmdParams);
    }
    Ok(integer(session.db().lpush(&args[0], &as_slices(&args[1..]))?))
}

pub fn rpush(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() < 2 {
        return Err(CommandError::CmdParams);
    }
    Ok(integer(session.db().rpush(&args[0], &as_slices(&args[1..]))?))
}

pub fn lpop(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 1 {
        return Err(CommandError::CmdParams);
    }
    Ok(bulk_opt(session.db().lpop(&args[0])?))
}

pub fn rpop(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 1 {
        return Err(CommandError::CmdParams);
    }
    Ok(bulk_opt(session.db().rpop(&args[0])?))
}

pub fn llen(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 1 {
        return Err(CommandError::CmdParams);
    }
    Ok(integer(session.db().llen(&args[0])?))
}

pub fn lindex(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 2 {
        return Err(CommandError::CmdParams);
    }
    let index = parse_i64(&args[1])?;
    Ok(bulk_opt(session.db().lindex(&args[0], index)?))
}

pub fn lrange(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 3 {
        return Err(CommandError::CmdParams);
    }
    let start = parse_i64(&args[1])?;
    let stop = parse_i64(&args[2])?;
    Ok(bulk_array(session.db().lrange(&args[0], start, stop)?))
}

pub fn lclear(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 1 {
        return Err(CommandError::CmdParams);
    }
    Ok(integer(session.db().lclear(&args[0])?))
}

pub fn lmclear(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.is_empty() {
        return Err(CommandError::CmdParams);
    }
    Ok(integer(session.db().lmclear(&as_slices(args))?))
}

pub fn lexpire(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 2 {
        return Err(CommandError::CmdParams);
    }
    let duration = parse_i64(&args[1])?;
    Ok(integer(session.db().lexpire(&args[0], duration)?))
}

pub fn lexpireat(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 2 {
        return Err(CommandError::CmdParams);
    }
    let when = parse_i64(&args[1])?;
    Ok(integer(session.db().lexpire_at(&args[0], when)?))
}

pub fn lttl(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 1 {
        return Err(CommandError::CmdParams);
    }
    Ok(integer(session.db().lttl(&args[0])?))
}

pub fn lpersist(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 1 {
        return Err(CommandError::CmdParams);
    }
    Ok(integer(session.db().lpersist(&args[0])?))
}
