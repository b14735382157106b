//! RESP frame encoder

use crate::RespValue;
use bytes::{BufMut, BytesMut};

/// Writes values into an output buffer in wire format.
#[derive(Default)]
pub struct RespEncoder;

impl RespEncoder {
    pub fn new() -> Self {
        Self
    }

    pub fn encode(&self, value: &RespValue, buf: &mut BytesMut) {
        match value {
            RespValue::SimpleString(s) => {
                buf.put_u8(b'+');
                buf.put_slice(s);
                buf.put_slice(b"\r\n");
            }
            RespValue::Error(e) => {
                buf.put_u8(b'-');
                buf.put_slice(e);
                buf.put_slice(b"\r\n");
            }
            RespValue::Integer(i) => {
                buf.put_u8(b':');
                buf.put_slice(i.to_string().as_bytes());
                buf.put_slice(b"\r\n");
            }
            RespValue::BulkString(Some(data)) => {
                buf.put_u8(b'$');
                buf.put_slice(data.len().to_string().as_bytes());
                buf.put_slice(b"\r\n");
                buf.put_slice(data);
                buf.put_slice(b"\r\n");
            }
            RespValue::BulkString(None) => {
                buf.put_slice(b"$-1\r\n");
            }
            RespValue::Array(items) => {
                buf.put_u8(b'*');
                buf.put_slice(items.len().to_string().as_bytes());
                buf.put_slice(b"\r\n");
                for item in items {
                    self.encode(item, buf);
                }
            }
        }
    }
}

/// Encode a value into a fresh byte vector.
pub fn encode_to_vec(value: &RespValue) -> Vec<u8> {
    let mut buf = BytesMut::new();
    RespEncoder::new().encode(value, &mut buf);
    buf.to_vec()
}
