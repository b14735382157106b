//! Incremental RESP frame parser

use crate::{RespError, RespValue, DEFAULT_MAX_FRAME_SIZE};
use bytes::{Buf, Bytes, BytesMut};

/// Parses frames out of a growing byte buffer.
///
/// `parse` inspects the buffer without consuming until a complete frame is
/// present, then splits it off and returns the decoded value. `Ok(None)`
/// means "read more bytes and call again".
pub struct RespParser {
    max_frame_size: usize,
}

impl Default for RespParser {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_SIZE)
    }
}

impl RespParser {
    pub fn new(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    pub fn parse(&self, buf: &mut BytesMut) -> Result<Option<RespValue>, RespError> {
        if buf.len() > self.max_frame_size {
            return Err(RespError::FrameTooLarge(buf.len(), self.max_frame_size));
        }
        let mut pos = 0;
        match self.parse_at(buf, &mut pos)? {
            Some(value) => {
                buf.advance(pos);
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn parse_at(&self, buf: &BytesMut, pos: &mut usize) -> Result<Option<RespValue>, RespError> {
        let Some(line) = read_line(buf, pos)? else {
            return Ok(None);
        };
        if line.is_empty() {
            return Err(RespError::InvalidFormat("empty line".into()));
        }
        match line[0] {
            b'+' => Ok(Some(RespValue::SimpleString(Bytes::copy_from_slice(
                &line[1..],
            )))),
            b'-' => Ok(Some(RespValue::Error(Bytes::copy_from_slice(&line[1..])))),
            b':' => Ok(Some(RespValue::Integer(parse_integer(&line[1..])?))),
            b'$' => self.parse_bulk(buf, pos, &line[1..]),
            b'*' => self.parse_array(buf, pos, &line[1..]),
            t => Err(RespError::InvalidType(t)),
        }
    }

    fn parse_bulk(
        &self,
        buf: &BytesMut,
        pos: &mut usize,
        len_bytes: &[u8],
    ) -> Result<Option<RespValue>, RespError> {
        let len = parse_integer(len_bytes)?;
        if len == -1 {
            return Ok(Some(RespValue::BulkString(None)));
        }
        if len < 0 {
            return Err(RespError::InvalidFormat(format!(
                "invalid bulk length: {}",
                len
            )));
        }
        let len = len as usize;
        if len > self.max_frame_size {
            return Err(RespError::FrameTooLarge(len, self.max_frame_size));
        }
        if buf.len() < *pos + len + 2 {
            return Ok(None);
        }
        let data = Bytes::copy_from_slice(&buf[*pos..*pos + len]);
        if &buf[*pos + len..*pos + len + 2] != b"\r\n" {
            return Err(RespError::InvalidFormat("bulk missing CRLF".into()));
        }
        *pos += len + 2;
        Ok(Some(RespValue::BulkString(Some(data))))
    }

    fn parse_array(
        &self,
        buf: &BytesMut,
        pos: &mut usize,
        len_bytes: &[u8],
    ) -> Result<Option<RespValue>, RespError> {
        let len = parse_integer(len_bytes)?;
        if len < 0 {
            return Ok(Some(RespValue::Array(Vec::new())));
        }
        let len = len as usize;
        if len > self.max_frame_size {
            return Err(RespError::FrameTooLarge(len, self.max_frame_size));
        }
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            match self.parse_at(buf, pos)? {
                Some(item) => items.push(item),
                None => return Ok(None),
            }
        }
        Ok(Some(RespValue::Array(items)))
    }
}

/// Line up to the next CRLF, starting at `pos`; advances `pos` past it.
fn read_line<'a>(buf: &'a BytesMut, pos: &mut usize) -> Result<Option<&'a [u8]>, RespError> {
    let slice = &buf[*pos..];
    match slice.windows(2).position(|w| w == b"\r\n") {
        Some(idx) => {
            let line = &slice[..idx];
            *pos += idx + 2;
            Ok(Some(line))
        }
        None => Ok(None),
    }
}

fn parse_integer(bytes: &[u8]) -> Result<i64, RespError> {
    let s = std::str::from_utf8(bytes)
        .map_err(|_| RespError::InvalidFormat("non-utf8 integer".into()))?;
    s.parse::<i64>().map_err(|e| {
        if matches!(
            e.kind(),
            std::num::IntErrorKind::PosOverflow | std::num::IntErrorKind::NegOverflow
        ) {
            RespError::IntegerOverflow
        } else {
            RespError::InvalidFormat(format!("invalid integer: {}", s))
        }
    })
}
