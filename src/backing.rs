//! Backing store abstraction
//!
//! The core only needs a seekable, readable, writable handle with a flush
//! primitive. Files grow solely by seeking to the end and writing there.

use std::io::{Read, Seek, SeekFrom, Write};

use crate::error::{Result, StoreError};

/// Anything a block chain can live in: `std::fs::File`, `Cursor<Vec<u8>>`, ...
pub trait Backing: Read + Write + Seek {}

impl<T: Read + Write + Seek> Backing for T {}

/// Offset where the next block will be allocated (current end of file)
pub fn end_of_file<F: Backing>(file: &mut F) -> Result<u32> {
    let end = file.seek(SeekFrom::End(0))?;
    link_offset(end)
}

/// Narrow a file offset to the 4-byte signed link width used on disk
pub(crate) fn link_offset(offset: u64) -> Result<u32> {
    if offset > i32::MAX as u64 {
        return Err(StoreError::FileTooLarge(offset));
    }
    Ok(offset as u32)
}
