//! Error types for blockstore
//!
//! Provides a unified error type for all operations. None of these are
//! retried internally: each one reflects either a corrupt file or a misuse
//! of the API.

use std::io;

use thiserror::Error;

/// Result type alias using StoreError
pub type Result<T> = std::result::Result<T, StoreError>;

/// Unified error type for blockstore operations
#[derive(Debug, Error)]
pub enum StoreError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // -------------------------------------------------------------------------
    // Integrity Errors
    // -------------------------------------------------------------------------
    /// Bad magic (or an impossible header) at an expected block start.
    #[error("Corruption detected at offset {offset}: {reason}")]
    Corruption { offset: u64, reason: String },

    // -------------------------------------------------------------------------
    // Block Errors
    // -------------------------------------------------------------------------
    #[error("Fill pattern of {pattern_len} bytes does not align with block size {size}")]
    Alignment { size: u32, pattern_len: usize },

    #[error("Write of {len} bytes at position {position} exceeds block capacity {size}")]
    Bounds { position: u32, len: usize, size: u32 },

    #[error("Block at offset {0} is not part of this chain")]
    BlockNotInChain(u32),

    #[error("File offset {0} does not fit a 4-byte block link")]
    FileTooLarge(u64),

    // -------------------------------------------------------------------------
    // Stream Errors
    // -------------------------------------------------------------------------
    #[error("Seek to {position} exceeds chain capacity {capacity}")]
    Offset { position: u64, capacity: u64 },

    #[error("Chunk size must be greater than zero")]
    ChunkSize,

    #[error("Stream {0} not found")]
    StreamNotFound(usize),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl StoreError {
    pub(crate) fn corruption(offset: u64, reason: impl Into<String>) -> Self {
        StoreError::Corruption {
            offset,
            reason: reason.into(),
        }
    }

    /// Whether this error means the file itself cannot be trusted
    pub fn is_corruption(&self) -> bool {
        matches!(self, StoreError::Corruption { .. })
    }
}

impl From<StoreError> for io::Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Io(e) => e,
            StoreError::Offset { .. } | StoreError::ChunkSize => {
                io::Error::new(io::ErrorKind::InvalidInput, err)
            }
            StoreError::Corruption { .. } => io::Error::new(io::ErrorKind::InvalidData, err),
            other => io::Error::other(other),
        }
    }
}
