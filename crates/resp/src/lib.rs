//! RESP (REdis Serialization Protocol) support library
//!
//! Value model, incremental frame parser, and encoder. The parser consumes
//! from a `BytesMut` and returns `Ok(None)` while a frame is incomplete, so
//! the server can keep reading from the socket and retry.

mod encoder;
mod parser;

pub use encoder::{encode_to_vec, RespEncoder};
pub use parser::RespParser;

use bytes::Bytes;

/// Default maximum frame size: 512MB, guards against memory exhaustion.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 512 * 1024 * 1024;

/// RESP data type
#[derive(Debug, Clone, PartialEq)]
pub enum RespValue {
    /// Simple string: `+OK\r\n`
    SimpleString(Bytes),
    /// Error: `-ERR message\r\n`
    Error(Bytes),
    /// Integer: `:123\r\n`
    Integer(i64),
    /// Bulk string: `$5\r\nhello\r\n`; `None` is the nil bulk `$-1\r\n`
    BulkString(Option<Bytes>),
    /// Array: `*2\r\n$3\r\nGET\r\n$3\r\nkey\r\n`
    Array(Vec<RespValue>),
}

impl RespValue {
    pub fn ok() -> Self {
        RespValue::SimpleString(Bytes::from_static(b"OK"))
    }

    pub fn error(msg: impl Into<String>) -> Self {
        RespValue::Error(Bytes::from(msg.into()))
    }

    pub fn bulk(data: impl Into<Bytes>) -> Self {
        RespValue::BulkString(Some(data.into()))
    }

    pub fn nil() -> Self {
        RespValue::BulkString(None)
    }

    /// Flatten a request array into the command's argument strings.
    pub fn into_command(self) -> Option<Vec<Bytes>> {
        match self {
            RespValue::Array(items) => {
                let mut cmd = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        RespValue::BulkString(Some(bytes)) => cmd.push(bytes),
                        RespValue::SimpleString(s) => cmd.push(s),
                        _ => return None,
                    }
                }
                Some(cmd)
            }
            _ => None,
        }
    }
}

/// RESP parsing error
#[derive(Debug, thiserror::Error)]
pub enum RespError {
    #[error("invalid RESP format: {0}")]
    InvalidFormat(String),
    #[error("invalid RESP type: {0}")]
    InvalidType(u8),
    #[error("integer overflow")]
    IntegerOverflow,
    #[error("frame too large: {0} bytes (max: {1} bytes)")]
    FrameTooLarge(usize, usize),
}
