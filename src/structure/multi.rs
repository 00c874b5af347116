//! MultiBlockStructure
//!
//! A directory of independent block chains sharing one file. The header
//! chain's payload is a list of child head offsets:
//!
//! ```text
//! ┌──────────┬──────────┬──────────┬──────────┐
//! │ head (4) │ head (4) │  -1 (4)  │  -1 (4)  │ ...
//! └──────────┴──────────┴──────────┴──────────┘
//!   big-endian i32, terminated by the NONE sentinel
//! ```

use bytes::Buf;
use tracing::debug;

use crate::backing::{end_of_file, Backing};
use crate::block::{DEFAULT_FILL, NONE};
use crate::error::{Result, StoreError};

use super::{BlockStructure, OrderedDataIo};

/// Width of one directory entry
pub const ENTRY_SIZE: usize = 4;

/// Header chain plus the child chains it points at
#[derive(Debug, Clone)]
pub struct MultiBlockStructure {
    header: BlockStructure,
    structures: Vec<BlockStructure>,
    fill: Vec<u8>,
}

impl MultiBlockStructure {
    /// Start an empty directory at `position`
    pub fn initialize<F: Backing>(file: &mut F, position: u64, block_size: u32) -> Result<Self> {
        Self::initialize_with_fill(file, position, block_size, DEFAULT_FILL)
    }

    /// Start an empty directory whose blocks are stamped with `fill`.
    ///
    /// The header chain itself always uses the 0xFF fill so that unused
    /// slots decode as the sentinel.
    pub fn initialize_with_fill<F: Backing>(
        file: &mut F,
        position: u64,
        block_size: u32,
        fill: &[u8],
    ) -> Result<Self> {
        let header = BlockStructure::initialize(file, position, block_size)?;
        Ok(Self {
            header,
            structures: Vec::new(),
            fill: fill.to_vec(),
        })
    }

    /// Load the directory at `position` and open every child chain
    pub fn read<F: Backing>(file: &mut F, position: u64) -> Result<Self> {
        let mut header = BlockStructure::read(file, position)?;
        let structures = Self::read_structure(file, &mut header)?;
        Ok(Self {
            header,
            structures,
            fill: DEFAULT_FILL.to_vec(),
        })
    }

    /// Use `fill` for every child chain, existing or created from now on
    pub fn set_fill(&mut self, fill: &[u8]) {
        self.fill = fill.to_vec();
        for structure in &mut self.structures {
            structure.set_fill(fill);
        }
    }

    /// Decode the header stream in 4-byte entries up to the sentinel
    fn read_structure<F: Backing>(
        file: &mut F,
        header: &mut BlockStructure,
    ) -> Result<Vec<BlockStructure>> {
        let directory = header.position() as u64;
        let mut offsets = Vec::new();
        {
            let mut io = OrderedDataIo::new(file, header);
            for chunk in io.chunks(0, ENTRY_SIZE)? {
                let chunk = chunk?;
                if chunk.len() < ENTRY_SIZE {
                    return Err(StoreError::corruption(
                        directory,
                        format!("partial directory entry of {} bytes", chunk.len()),
                    ));
                }
                match (&chunk[..]).get_i32() {
                    NONE => break,
                    offset if offset >= 0 => offsets.push(offset as u64),
                    offset => {
                        return Err(StoreError::corruption(
                            directory,
                            format!("invalid structure offset {}", offset),
                        ))
                    }
                }
            }
        }

        offsets
            .into_iter()
            .map(|offset| BlockStructure::read(file, offset))
            .collect()
    }

    /// Allocate a new child chain at end-of-file and record its head.
    ///
    /// The header chain grows by itself when its last block is full. The
    /// returned chain is empty and ready for the caller to fill.
    pub fn add_structure<F: Backing>(
        &mut self,
        file: &mut F,
        block_size: u32,
    ) -> Result<&mut BlockStructure> {
        let start = end_of_file(file)?;
        let child = BlockStructure::initialize_with_fill(file, start as u64, block_size, &self.fill)?;

        {
            let mut io = OrderedDataIo::new(file, &mut self.header);
            let end = io.size();
            io.seek(end)?;
            io.write(&(start as i32).to_be_bytes(), false)?;
        }

        debug!(
            directory = self.header.position(),
            start,
            index = self.structures.len(),
            "added structure"
        );

        self.structures.push(child);
        let index = self.structures.len() - 1;
        Ok(&mut self.structures[index])
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The directory's own chain
    pub fn header(&self) -> &BlockStructure {
        &self.header
    }

    pub fn structures(&self) -> &[BlockStructure] {
        &self.structures
    }

    pub fn structure(&self, index: usize) -> Option<&BlockStructure> {
        self.structures.get(index)
    }

    pub fn structure_mut(&mut self, index: usize) -> Option<&mut BlockStructure> {
        self.structures.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.structures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.structures.is_empty()
    }
}
