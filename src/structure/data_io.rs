//! Ordered data I/O over one block chain
//!
//! A cursor-based byte stream layered on a `BlockStructure`. Seeking walks
//! block **capacities**; reading is bounded by each block's **high-water
//! mark**. Writing grows the chain on demand and can cut it short.
//!
//! ```text
//!   logical:  0               16              32         39
//!             ├───────────────┼───────────────┼──────────┤
//!   blocks:   │ blk@0  (16/16)│ blk@36 (16/16)│blk@72 (7/16)
//!             └──────▲────────┴───────────────┴──────────┘
//!                    cursor = (block 0, offset 8)
//! ```

use std::io::{self, Write};

use tracing::trace;

use crate::backing::Backing;
use crate::error::{Result, StoreError};

use super::BlockStructure;

/// Seekable, growable, truncatable byte stream over a block chain
pub struct OrderedDataIo<'a, F: Backing> {
    file: &'a mut F,
    structure: &'a mut BlockStructure,
    /// Capacity used for blocks allocated while writing
    block_size: u32,
    /// Index of the block under the cursor
    block_index: usize,
    /// Byte offset inside that block's payload
    block_offset: u32,
}

impl<'a, F: Backing> OrderedDataIo<'a, F> {
    /// Open a stream positioned at 0; new blocks copy the head's capacity
    pub fn new(file: &'a mut F, structure: &'a mut BlockStructure) -> Self {
        let block_size = structure.head().size;
        Self::with_block_size(file, structure, block_size)
    }

    /// Open a stream that allocates `block_size` blocks when it grows
    pub fn with_block_size(file: &'a mut F, structure: &'a mut BlockStructure, block_size: u32) -> Self {
        Self {
            file,
            structure,
            block_size,
            block_index: 0,
            block_offset: 0,
        }
    }

    /// Move the cursor to logical offset `pos`.
    ///
    /// Lands anywhere inside allocated capacity, written or not. Seeking to
    /// exactly the total capacity parks the cursor at the end of the tail.
    pub fn seek(&mut self, pos: u64) -> Result<()> {
        let mut base = 0u64;
        for (index, block) in self.structure.blocks().iter().enumerate() {
            let size = block.size as u64;
            if pos < base + size {
                self.block_index = index;
                self.block_offset = (pos - base) as u32;
                return Ok(());
            }
            base += size;
        }

        if pos == base {
            self.block_index = self.structure.len() - 1;
            self.block_offset = self.structure.tail().size;
            return Ok(());
        }

        Err(StoreError::Offset {
            position: pos,
            capacity: base,
        })
    }

    /// Write `data` at the cursor, allocating blocks as needed.
    ///
    /// High-water marks only grow, unless `truncate` is set: then the current
    /// block's mark is forced to the cursor and every later block is cut off.
    pub fn write(&mut self, data: &[u8], truncate: bool) -> Result<()> {
        let mut remaining = data;

        while !remaining.is_empty() {
            let block = self.structure.blocks()[self.block_index];
            let room = block.size - self.block_offset;
            if room == 0 {
                self.advance_for_write()?;
                continue;
            }

            let n = remaining.len().min(room as usize);
            block.write_data(self.file, self.block_offset, &remaining[..n])?;
            self.block_offset += n as u32;

            if self.block_offset > block.next_empty {
                self.structure
                    .set_next_empty(self.file, self.block_index, self.block_offset)?;
            }

            remaining = &remaining[n..];
        }

        if truncate {
            let start = self.structure.blocks()[self.block_index].start;
            self.structure
                .set_next_empty(self.file, self.block_index, self.block_offset)?;
            self.structure.truncate(self.file, start)?;
        }

        self.file.flush()?;
        trace!(
            position = self.structure.position(),
            len = data.len(),
            truncate,
            "wrote stream data"
        );
        Ok(())
    }

    /// Step onto the next block, appending one if the cursor is at the tail
    fn advance_for_write(&mut self) -> Result<()> {
        if self.block_index + 1 >= self.structure.len() {
            self.structure.add_block(self.file, self.block_size, None)?;
        }
        self.block_index += 1;
        self.block_offset = 0;
        Ok(())
    }

    /// Read up to `size` bytes (everything left if `None`) from the cursor.
    ///
    /// Stops at high-water marks, so a short or empty result means the end
    /// of written data, including after a seek into unwritten capacity.
    pub fn read(&mut self, size: Option<usize>) -> Result<Vec<u8>> {
        let limit = size.unwrap_or(usize::MAX);
        let mut out = Vec::new();

        while out.len() < limit {
            let block = self.structure.blocks()[self.block_index];
            if self.block_offset < block.next_empty {
                let available = (block.next_empty - self.block_offset) as usize;
                let n = available.min(limit - out.len());
                out.extend(block.read_data(self.file, self.block_offset, n)?);
                self.block_offset += n as u32;
            } else if self.block_index + 1 < self.structure.len() {
                self.block_index += 1;
                self.block_offset = 0;
            } else {
                break;
            }
        }

        Ok(out)
    }

    /// Everything from the cursor to the end of written data
    pub fn read_all(&mut self) -> Result<Vec<u8>> {
        self.read(None)
    }

    /// Restartable chunked iteration from `pos`; the last chunk may be short
    pub fn chunks(&mut self, pos: u64, chunk_size: usize) -> Result<DataChunks<'_, 'a, F>> {
        if chunk_size == 0 {
            return Err(StoreError::ChunkSize);
        }
        self.seek(pos)?;
        Ok(DataChunks {
            io: self,
            chunk_size,
            done: false,
        })
    }

    /// Total bytes written across the chain
    pub fn size(&self) -> u64 {
        self.structure.written()
    }

    /// Logical cursor position
    pub fn position(&self) -> u64 {
        let before: u64 = self.structure.blocks()[..self.block_index]
            .iter()
            .map(|b| b.size as u64)
            .sum();
        before + self.block_offset as u64
    }

    pub fn structure(&self) -> &BlockStructure {
        &*self.structure
    }
}

// =============================================================================
// Chunk Iterator
// =============================================================================

/// Forward-only chunk sequence over a stream, ending at the last written byte
pub struct DataChunks<'b, 'a, F: Backing> {
    io: &'b mut OrderedDataIo<'a, F>,
    chunk_size: usize,
    done: bool,
}

impl<'b, 'a, F: Backing> Iterator for DataChunks<'b, 'a, F> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.io.read(Some(self.chunk_size)) {
            Ok(chunk) if chunk.is_empty() => {
                self.done = true;
                None
            }
            Ok(chunk) => Some(Ok(chunk)),
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

// =============================================================================
// std::io Adapters
// =============================================================================

impl<'a, F: Backing> io::Read for OrderedDataIo<'a, F> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let bytes = OrderedDataIo::read(self, Some(buf.len()))?;
        buf[..bytes.len()].copy_from_slice(&bytes);
        Ok(bytes.len())
    }
}

impl<'a, F: Backing> io::Write for OrderedDataIo<'a, F> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        OrderedDataIo::write(self, buf, false)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl<'a, F: Backing> io::Seek for OrderedDataIo<'a, F> {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        let target = match pos {
            io::SeekFrom::Start(offset) => Some(offset),
            io::SeekFrom::End(delta) => self.size().checked_add_signed(delta),
            io::SeekFrom::Current(delta) => self.position().checked_add_signed(delta),
        };
        let target = target.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "seek before start of stream")
        })?;

        OrderedDataIo::seek(self, target)?;
        Ok(target)
    }
}
