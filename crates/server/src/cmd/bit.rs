//! Bitmap commands

use super::{as_slices, bulk_opt, integer, parse_i64, CmdResult, CommandError};
use crate::session::Session;
use bytes::Bytes;
use store::BitOp;

pub fn bget(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 1 {
        return Err(CommandError::CmdParams);
    }
    Ok(bulk_opt(session.db().bget(&args[0])?))
}

pub fn bdelete(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 1 {
        return Err(CommandError::CmdParams);
    }
    Ok(integer(session.db().bdelete(&args[0])?))
}

pub fn bsetbit(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 3 {
        return Err(CommandError::CmdParams);
    }
    let offset = parse_i64(&args[1])?;
    let value = parse_bit(&args[2])?;
    Ok(integer(session.db().bset_bit(&args[0], offset, value)?))
}

pub fn bgetbit(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 2 {
        return Err(CommandError::CmdParams);
    }
    let offset = parse_i64(&args[1])?;
    Ok(integer(session.db().bget_bit(&args[0], offset)?))
}

pub fn bmsetbit(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() < 3 || (args.len() - 1) % 2 != 0 {
        return Err(CommandError::CmdParams);
    }
    let mut pairs = Vec::with_capacity((args.len() - 1) / 2);
    for chunk in args[1..].chunks_exact(2) {
        pairs.push((parse_i64(&chunk[0])?, parse_bit(&chunk[1])?));
    }
    Ok(integer(session.db().bmset_bit(&args[0], &pairs)?))
}

pub fn bcount(session: &mut Session, args: &[Bytes]) -> CmdResult {
    let (key, start, end) = match args {
        [key] => (key, None, None),
        [key, start, end] => (key, Some(parse_i64(start)?), Some(parse_i64(end)?)),
        _ => return Err(CommandError::CmdParams),
    };
    Ok(integer(session.db().bcount(key, start, end)?))
}

pub fn bopt(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() < 3 {
        return Err(CommandError::CmdParams);
    }
    let op = if args[0].eq_ignore_ascii_case(b"and") {
        BitOp::And
    } else if args[0].eq_ignore_ascii_case(b"or") {
        BitOp::Or
    } else if args[0].eq_ignore_ascii_case(b"xor") {
        BitOp::Xor
    } else if args[0].eq_ignore_ascii_case(b"not") {
        BitOp::Not
    } else {
        return Err(CommandError::Syntax);
    };
    Ok(integer(
        session.db().bopt(op, &args[1], &as_slices(&args[2..]))?,
    ))
}

pub fn bexpire(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 2 {
        return Err(CommandError::CmdParams);
    }
    let duration = parse_i64(&args[1])?;
    Ok(integer(session.db().bexpire(&args[0], duration)?))
}

pub fn bexpireat(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 2 {
        return Err(CommandError::CmdParams);
    }
    let when = parse_i64(&args[1])?;
    Ok(integer(session.db().bexpire_at(&args[0], when)?))
}

pub fn bttl(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 1 {
        return Err(CommandError::CmdParams);
    }
    Ok(integer(session.db().bttl(&args[0])?))
}

pub fn bpersist(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 1 {
        return Err(CommandError::CmdParams);
    }
    Ok(integer(session.db().bpersist(&args[0])?))
}

fn parse_bit(arg: &[u8]) -> Result<u8, CommandError> {
    match arg {
        b"0" => Ok(0),
        b"1" => Ok(1),
        _ => Err(CommandError::Value),
    }
}
