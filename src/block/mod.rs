//! Block Module
//!
//! A block is a fixed-format header followed by a fixed-capacity payload at a
//! known file offset. The offset doubles as the block's handle.
//!
//! ## On-Disk Layout
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Header (20 bytes, big-endian)                                │
//! │ ┌──────────┬──────────┬──────────┬──────────┬──────────────┐ │
//! │ │Magic (4) │ Size (4) │ Next (4) │ Prev (4) │NextEmpty (4) │ │
//! │ └──────────┴──────────┴──────────┴──────────┴──────────────┘ │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Payload (Size bytes)                                         │
//! │   [written bytes .. NextEmpty][fill pattern .. Size]         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! `Next`/`Prev` hold file offsets of neighbouring blocks, or `-1` (NONE).

mod header;

pub use header::{decode_header, encode_header, BlockHeader};

use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};

use tracing::warn;

use crate::backing::Backing;
use crate::error::{Result, StoreError};

// =============================================================================
// Shared Constants
// =============================================================================

/// Magic value identifying a block start ("BLK1")
pub const MAGIC: u32 = 0x424C_4B31;

/// Header size: Magic (4) + Size (4) + Next (4) + Prev (4) + NextEmpty (4)
pub const HEADER_SIZE: usize = 20;

/// Sentinel for "no link" and "unused slot"
pub const NONE: i32 = -1;

/// Default payload fill: every unwritten 4-byte slot decodes to NONE
pub const DEFAULT_FILL: &[u8] = &[0xFF];

pub(crate) fn encode_link(link: Option<u32>) -> i32 {
    link.map(|offset| offset as i32).unwrap_or(NONE)
}

fn decode_link(value: i32, start: u32, field: &str) -> Result<Option<u32>> {
    match value {
        NONE => Ok(None),
        v if v >= 0 => Ok(Some(v as u32)),
        v => Err(StoreError::corruption(
            start as u64,
            format!("invalid {} link {}", field, v),
        )),
    }
}

// =============================================================================
// Block
// =============================================================================

/// In-memory copy of one block header.
///
/// The file is the source of truth; a `Block` is only a cache of what was
/// last read or written at `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    /// File offset of the header
    pub start: u32,
    /// Payload capacity, fixed at creation
    pub size: u32,
    /// Offset of the following block
    pub next: Option<u32>,
    /// Offset of the preceding block
    pub prev: Option<u32>,
    /// High-water mark: payload bytes written so far
    pub next_empty: u32,
}

impl Block {
    /// A detached block with no links and nothing written
    pub fn new(start: u32, size: u32) -> Self {
        Self {
            start,
            size,
            next: None,
            prev: None,
            next_empty: 0,
        }
    }

    /// File offset of the first payload byte
    pub fn data_start(&self) -> u64 {
        self.start as u64 + HEADER_SIZE as u64
    }

    /// File offset just past the payload
    pub fn end(&self) -> u64 {
        self.data_start() + self.size as u64
    }

    /// Bytes still free above the high-water mark
    pub fn remaining(&self) -> u32 {
        self.size - self.next_empty
    }

    pub fn header(&self) -> BlockHeader {
        BlockHeader::new(
            self.size as i32,
            encode_link(self.next),
            encode_link(self.prev),
            self.next_empty as i32,
        )
    }

    /// Serialize the header at `start`
    pub fn write_header<F: Backing>(&self, file: &mut F) -> Result<()> {
        file.seek(SeekFrom::Start(self.start as u64))?;
        file.write_all(&encode_header(&self.header()))?;
        Ok(())
    }

    /// Fail unless `pattern` tiles a payload of `size` bytes exactly
    pub fn check_fill(size: u32, pattern: &[u8]) -> Result<()> {
        if pattern.is_empty() || size as usize % pattern.len() != 0 {
            return Err(StoreError::Alignment {
                size,
                pattern_len: pattern.len(),
            });
        }
        Ok(())
    }

    /// Stamp the whole payload with a repeating pattern
    pub fn fill_data<F: Backing>(&self, file: &mut F, pattern: &[u8]) -> Result<()> {
        Self::check_fill(self.size, pattern)?;

        let payload = pattern.repeat(self.size as usize / pattern.len());
        file.seek(SeekFrom::Start(self.data_start()))?;
        file.write_all(&payload)?;
        Ok(())
    }

    /// Raw positional write inside the payload.
    ///
    /// Does not touch `next_empty`; callers own the high-water mark.
    pub fn write_data<F: Backing>(&self, file: &mut F, position: u32, data: &[u8]) -> Result<()> {
        self.check_range(position, data.len())?;
        file.seek(SeekFrom::Start(self.data_start() + position as u64))?;
        file.write_all(data)?;
        Ok(())
    }

    /// Raw positional read inside the payload, ignoring the high-water mark
    pub fn read_data<F: Backing>(&self, file: &mut F, position: u32, len: usize) -> Result<Vec<u8>> {
        self.check_range(position, len)?;
        let mut buf = vec![0u8; len];
        file.seek(SeekFrom::Start(self.data_start() + position as u64))?;
        file.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn check_range(&self, position: u32, len: usize) -> Result<()> {
        if position as u64 + len as u64 > self.size as u64 {
            return Err(StoreError::Bounds {
                position,
                len,
                size: self.size,
            });
        }
        Ok(())
    }

    /// Read and verify the block whose header sits at `start`.
    ///
    /// A wrong magic, an impossible field or a header cut short by the end
    /// of the file is reported as corruption.
    pub fn read_block<F: Backing>(file: &mut F, start: u32) -> Result<Self> {
        let mut bytes = [0u8; HEADER_SIZE];
        file.seek(SeekFrom::Start(start as u64))?;
        if let Err(e) = file.read_exact(&mut bytes) {
            if e.kind() == ErrorKind::UnexpectedEof {
                warn!(offset = start, "block header truncated by end of file");
                return Err(StoreError::corruption(start as u64, "truncated block header"));
            }
            return Err(e.into());
        }

        let header = decode_header(&bytes);
        if !header.has_valid_magic() {
            warn!(offset = start, magic = header.magic, "bad block magic");
            return Err(StoreError::corruption(
                start as u64,
                format!("not a block (magic {:#010x})", header.magic),
            ));
        }

        Self::from_header(start, &header)
    }

    /// Build a block from a decoded header, rejecting impossible values
    pub fn from_header(start: u32, header: &BlockHeader) -> Result<Self> {
        if header.size <= 0 {
            return Err(StoreError::corruption(
                start as u64,
                format!("invalid block size {}", header.size),
            ));
        }
        if header.next_empty < 0 || header.next_empty > header.size {
            return Err(StoreError::corruption(
                start as u64,
                format!(
                    "high-water mark {} outside capacity {}",
                    header.next_empty, header.size
                ),
            ));
        }

        Ok(Self {
            start,
            size: header.size as u32,
            next: decode_link(header.next, start, "next")?,
            prev: decode_link(header.prev, start, "prev")?,
            next_empty: header.next_empty as u32,
        })
    }
}
