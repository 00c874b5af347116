//! Shared helpers for blockstore tests

#![allow(dead_code)]

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use blockstore::block::MAGIC;
use tempfile::TempDir;

/// Magic as it appears when the file is decoded into signed ints
pub const M: i32 = MAGIC as i32;

/// Scratch directory plus a fresh, empty read/write file inside it
pub fn setup_temp_file() -> (TempDir, PathBuf, File) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("test.db");
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(&path)
        .unwrap();
    (temp_dir, path, file)
}

/// Close-and-reopen: a brand new handle on the same path
pub fn reopen(path: &Path) -> File {
    OpenOptions::new().read(true).write(true).open(path).unwrap()
}

/// Entire file content from offset 0
pub fn read_file(file: &mut File) -> Vec<u8> {
    let mut content = Vec::new();
    file.seek(SeekFrom::Start(0)).unwrap();
    file.read_to_end(&mut content).unwrap();
    content
}

/// Decode content as consecutive big-endian i32s
pub fn bytes_to_ints(bytes: &[u8]) -> Vec<i32> {
    bytes
        .chunks(4)
        .map(|c| i32::from_be_bytes(c.try_into().unwrap()))
        .collect()
}

/// Overwrite raw bytes at `offset`
pub fn poke(file: &mut File, offset: u64, bytes: &[u8]) {
    file.seek(SeekFrom::Start(offset)).unwrap();
    file.write_all(bytes).unwrap();
    file.flush().unwrap();
}
