//! Connection-level commands

use super::{parse_i64, CmdResult, CommandError};
use crate::session::Session;
use bytes::Bytes;
use resp::RespValue;

pub fn ping(_session: &mut Session, args: &[Bytes]) -> CmdResult {
    match args {
        [] => Ok(RespValue::SimpleString(Bytes::from_static(b"PONG"))),
        [msg] => Ok(RespValue::bulk(msg.clone())),
        _ => Err(CommandError::CmdParams),
    }
}

pub fn echo(_session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 1 {
        return Err(CommandError::CmdParams);
    }
    Ok(RespValue::bulk(args[0].clone()))
}

pub fn select(session: &mut Session, args: &[Bytes]) -> CmdResult {
    if args.len() != 1 {
        return Err(CommandError::CmdParams);
    }
    let index = parse_i64(&args[0])?;
    if !(0..=store::MAX_DB_INDEX as i64).contains(&index) {
        return Err(CommandError::Value);
    }
    session.select(index as u8)?;
    Ok(RespValue::ok())
}
