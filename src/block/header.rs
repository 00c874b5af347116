//! Block header codec
//!
//! One pair of pure functions maps the packed on-disk header to and from
//! its decoded fields. Everything is big-endian.

use bytes::{Buf, BufMut};

use super::{HEADER_SIZE, MAGIC};

/// Raw header fields exactly as stored on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub magic: u32,
    pub size: i32,
    pub next: i32,
    pub prev: i32,
    pub next_empty: i32,
}

impl BlockHeader {
    /// Header for a block with the expected magic
    pub fn new(size: i32, next: i32, prev: i32, next_empty: i32) -> Self {
        Self {
            magic: MAGIC,
            size,
            next,
            prev,
            next_empty,
        }
    }

    pub fn has_valid_magic(&self) -> bool {
        self.magic == MAGIC
    }
}

/// Encode a header into its fixed 20-byte form
pub fn encode_header(header: &BlockHeader) -> [u8; HEADER_SIZE] {
    let mut out = [0u8; HEADER_SIZE];
    let mut buf = &mut out[..];
    buf.put_u32(header.magic);
    buf.put_i32(header.size);
    buf.put_i32(header.next);
    buf.put_i32(header.prev);
    buf.put_i32(header.next_empty);
    out
}

/// Decode a 20-byte header. Validation is left to the caller.
pub fn decode_header(bytes: &[u8; HEADER_SIZE]) -> BlockHeader {
    let mut buf = &bytes[..];
    BlockHeader {
        magic: buf.get_u32(),
        size: buf.get_i32(),
        next: buf.get_i32(),
        prev: buf.get_i32(),
        next_empty: buf.get_i32(),
    }
}
