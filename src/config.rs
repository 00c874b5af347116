//! Configuration for blockstore
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::block::DEFAULT_FILL;
use crate::error::{Result, StoreError};

/// Main configuration for a BlockFile instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // File Configuration
    // -------------------------------------------------------------------------
    /// Path of the single backing file.
    /// Internal layout:
    ///   offset 0     directory chain (child stream head offsets)
    ///   offset 0+    stream blocks, appended as they are allocated
    pub path: PathBuf,

    /// Create the backing file if it does not exist
    pub create_if_missing: bool,

    // -------------------------------------------------------------------------
    // Block Configuration
    // -------------------------------------------------------------------------
    /// Payload capacity of blocks allocated for streams (in bytes)
    pub block_size: u32,

    /// Payload capacity of directory blocks (in bytes)
    pub directory_block_size: u32,

    /// Byte pattern stamped into every fresh payload
    pub fill_pattern: Vec<u8>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./blockstore.db"),
            create_if_missing: true,
            block_size: 1024,
            directory_block_size: 64,
            fill_pattern: DEFAULT_FILL.to_vec(),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check that block sizes and the fill pattern can work together
    pub fn validate(&self) -> Result<()> {
        if self.fill_pattern.is_empty() {
            return Err(StoreError::Config("fill pattern must not be empty".to_string()));
        }

        for (name, size) in [
            ("block_size", self.block_size),
            ("directory_block_size", self.directory_block_size),
        ] {
            if size == 0 {
                return Err(StoreError::Config(format!("{} must be greater than zero", name)));
            }
            if size as usize % self.fill_pattern.len() != 0 {
                return Err(StoreError::Config(format!(
                    "{} {} is not a multiple of the fill pattern length {}",
                    name,
                    size,
                    self.fill_pattern.len()
                )));
            }
        }

        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the backing file path
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.path = path.into();
        self
    }

    /// Create the file on open if missing
    pub fn create_if_missing(mut self, create: bool) -> Self {
        self.config.create_if_missing = create;
        self
    }

    /// Set the stream block size (in bytes)
    pub fn block_size(mut self, size: u32) -> Self {
        self.config.block_size = size;
        self
    }

    /// Set the directory block size (in bytes)
    pub fn directory_block_size(mut self, size: u32) -> Self {
        self.config.directory_block_size = size;
        self
    }

    /// Set the payload fill pattern
    pub fn fill_pattern(mut self, pattern: impl Into<Vec<u8>>) -> Self {
        self.config.fill_pattern = pattern.into();
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
