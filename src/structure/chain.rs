//! BlockStructure
//!
//! An ordered, doubly-linked chain of blocks forming one logical extent.
//!
//! ## Invariants
//! - `blocks` is in on-disk forward-link order, starting at `position`
//! - the first block's `prev` and the last block's `next` are NONE
//! - space is only ever appended; truncated blocks stay on disk unreachable

use std::collections::HashSet;
use std::io::Write;

use tracing::{debug, trace, warn};

use crate::backing::{end_of_file, link_offset, Backing};
use crate::block::{Block, DEFAULT_FILL};
use crate::error::{Result, StoreError};

/// In-memory mirror of one on-disk block chain
#[derive(Debug, Clone)]
pub struct BlockStructure {
    /// Offset of the head block (fixed for the lifetime of the chain)
    position: u32,
    /// Cached headers in chain order
    blocks: Vec<Block>,
    /// Pattern stamped into newly allocated payloads
    fill: Vec<u8>,
}

impl BlockStructure {
    /// Write one fresh block at `position` and return a chain holding it
    pub fn initialize<F: Backing>(file: &mut F, position: u64, block_size: u32) -> Result<Self> {
        Self::initialize_with_fill(file, position, block_size, DEFAULT_FILL)
    }

    /// Same as `initialize`, stamping payloads with `fill` instead of 0xFF
    pub fn initialize_with_fill<F: Backing>(
        file: &mut F,
        position: u64,
        block_size: u32,
        fill: &[u8],
    ) -> Result<Self> {
        check_block_size(block_size)?;
        Block::check_fill(block_size, fill)?;

        let position = link_offset(position)?;
        let block = Block::new(position, block_size);
        block.write_header(file)?;
        block.fill_data(file, fill)?;
        file.flush()?;

        debug!(position, block_size, "initialized block structure");

        Ok(Self {
            position,
            blocks: vec![block],
            fill: fill.to_vec(),
        })
    }

    /// Load the chain at `position` by chasing `next` links until NONE
    pub fn read<F: Backing>(file: &mut F, position: u64) -> Result<Self> {
        let position = link_offset(position)?;
        let mut blocks = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor = Some(position);

        while let Some(start) = cursor {
            if !seen.insert(start) {
                warn!(position, offset = start, "cycle in block chain");
                return Err(StoreError::corruption(
                    start as u64,
                    "block chain loops back on itself",
                ));
            }
            let block = Block::read_block(file, start)?;
            cursor = block.next;
            blocks.push(block);
        }

        trace!(position, blocks = blocks.len(), "read block structure");

        Ok(Self {
            position,
            blocks,
            fill: DEFAULT_FILL.to_vec(),
        })
    }

    /// Use `fill` for blocks allocated from now on
    pub fn set_fill(&mut self, fill: &[u8]) {
        self.fill = fill.to_vec();
    }

    /// Allocate a new block at end-of-file and link it into the chain.
    ///
    /// With `after == None` (or the tail's offset) the block is appended.
    /// With a mid-chain offset the block is spliced in right after it, and
    /// the headers of both neighbours are rewritten. Returns the new block.
    pub fn add_block<F: Backing>(
        &mut self,
        file: &mut F,
        block_size: u32,
        after: Option<u32>,
    ) -> Result<Block> {
        check_block_size(block_size)?;
        Block::check_fill(block_size, &self.fill)?;

        let index = match after {
            Some(start) => self.index_of(start)?,
            None => self.blocks.len() - 1,
        };

        let start = end_of_file(file)?;
        let mut block = Block::new(start, block_size);
        block.prev = Some(self.blocks[index].start);
        block.next = self.blocks[index].next;

        // New block first, so end-of-file already accounts for it
        block.write_header(file)?;
        block.fill_data(file, &self.fill)?;

        self.blocks[index].next = Some(start);
        self.blocks[index].write_header(file)?;

        if let Some(successor) = self.blocks.get_mut(index + 1) {
            successor.prev = Some(start);
            successor.write_header(file)?;
        }

        self.blocks.insert(index + 1, block);
        file.flush()?;

        debug!(
            position = self.position,
            start,
            block_size,
            after = self.blocks[index].start,
            spliced = index + 2 < self.blocks.len(),
            "added block"
        );

        Ok(block)
    }

    /// Sever the chain right after the block at `after`.
    ///
    /// Dropped blocks get their links poisoned to NONE; their bytes stay in
    /// the file and are never reused.
    pub fn truncate<F: Backing>(&mut self, file: &mut F, after: u32) -> Result<()> {
        let index = self.index_of(after)?;
        let dropped = self.blocks.split_off(index + 1);

        for mut block in dropped.iter().copied() {
            block.next = None;
            block.prev = None;
            block.write_header(file)?;
        }

        self.blocks[index].next = None;
        self.blocks[index].write_header(file)?;
        file.flush()?;

        if !dropped.is_empty() {
            debug!(
                position = self.position,
                after,
                dropped = dropped.len(),
                "truncated block structure"
            );
        }

        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Offset of the head block
    pub fn position(&self) -> u32 {
        self.position
    }

    /// Blocks in chain order
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// A chain always holds at least its head block
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn head(&self) -> &Block {
        &self.blocks[0]
    }

    pub fn tail(&self) -> &Block {
        &self.blocks[self.blocks.len() - 1]
    }

    /// Sum of payload capacities
    pub fn capacity(&self) -> u64 {
        self.blocks.iter().map(|b| b.size as u64).sum()
    }

    /// Sum of high-water marks
    pub fn written(&self) -> u64 {
        self.blocks.iter().map(|b| b.next_empty as u64).sum()
    }

    /// Position of the block starting at `start`
    pub fn index_of(&self, start: u32) -> Result<usize> {
        self.blocks
            .iter()
            .position(|b| b.start == start)
            .ok_or(StoreError::BlockNotInChain(start))
    }

    /// Raise or force a block's high-water mark and persist its header
    pub(crate) fn set_next_empty<F: Backing>(
        &mut self,
        file: &mut F,
        index: usize,
        next_empty: u32,
    ) -> Result<()> {
        let block = &mut self.blocks[index];
        if block.next_empty != next_empty {
            block.next_empty = next_empty;
            block.write_header(file)?;
        }
        Ok(())
    }
}

fn check_block_size(block_size: u32) -> Result<()> {
    if block_size == 0 || block_size > i32::MAX as u32 {
        return Err(StoreError::Config(format!(
            "block size {} out of range",
            block_size
        )));
    }
    Ok(())
}
