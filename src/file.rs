//! BlockFile
//!
//! Owns the backing file and the directory of streams inside it.
//!
//! ## Responsibilities
//! - Create or reopen the backing file
//! - Initialize the directory on an empty file, reload it otherwise
//! - Hand out streams by index

use std::fs::{File, OpenOptions};
use std::path::Path;

use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Result, StoreError};
use crate::structure::{MultiBlockStructure, OrderedDataIo};

/// A single file holding any number of independent byte streams
///
/// ## Ownership
/// The file handle and every in-memory chain are owned here; each stream
/// borrows both mutably, so only one stream is open at a time.
pub struct BlockFile {
    config: Config,
    file: File,
    directory: MultiBlockStructure,
}

impl BlockFile {
    /// The directory always starts at the beginning of the file
    const DIRECTORY_POSITION: u64 = 0;

    /// Open or create a block file with the given config
    ///
    /// On open:
    /// 1. Validate the config
    /// 2. Open the file (creating it if allowed)
    /// 3. Empty file: write a fresh directory; otherwise read it back
    pub fn open(config: Config) -> Result<Self> {
        // Step 1: Reject sizes the fill pattern cannot tile
        config.validate()?;

        // Step 2: Open the backing file
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(config.create_if_missing)
            .truncate(false)
            .open(&config.path)?;

        // Step 3: Load or create the directory
        let directory = if file.metadata()?.len() == 0 {
            info!(path = %config.path.display(), "initializing new block file");
            let mut directory = MultiBlockStructure::initialize(
                &mut file,
                Self::DIRECTORY_POSITION,
                config.directory_block_size,
            )?;
            directory.set_fill(&config.fill_pattern);
            directory
        } else {
            let mut directory = MultiBlockStructure::read(&mut file, Self::DIRECTORY_POSITION)?;
            directory.set_fill(&config.fill_pattern);
            info!(
                path = %config.path.display(),
                streams = directory.len(),
                "opened block file"
            );
            directory
        };

        Ok(Self {
            config,
            file,
            directory,
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified file path
    pub fn open_path(path: &Path) -> Result<Self> {
        let config = Config {
            path: path.to_path_buf(),
            ..Config::default()
        };
        Self::open(config)
    }

    /// Create a new, empty stream and return its index
    pub fn create_stream(&mut self) -> Result<usize> {
        self.directory
            .add_structure(&mut self.file, self.config.block_size)?;

        let index = self.directory.len() - 1;
        debug!(index, "created stream");
        Ok(index)
    }

    /// Open the stream at `index`, cursor at 0
    pub fn stream(&mut self, index: usize) -> Result<OrderedDataIo<'_, File>> {
        let block_size = self.config.block_size;
        let structure = self
            .directory
            .structure_mut(index)
            .ok_or(StoreError::StreamNotFound(index))?;
        Ok(OrderedDataIo::with_block_size(&mut self.file, structure, block_size))
    }

    /// Number of streams recorded in the directory
    pub fn stream_count(&self) -> usize {
        self.directory.len()
    }

    /// Force file contents and metadata to disk
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Close the file gracefully
    pub fn close(mut self) -> Result<()> {
        self.sync()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    pub fn directory(&self) -> &MultiBlockStructure {
        &self.directory
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Raw handle for audits
    pub fn file_mut(&mut self) -> &mut File {
        &mut self.file
    }
}
