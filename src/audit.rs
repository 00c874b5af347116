//! Audit Module
//!
//! Read-only integrity scans over a file's chains.
//!
//! ## Checks
//! - forward walk: magic on every block, no cycles (via `BlockStructure::read`)
//! - backward walk: following `prev` from the tail mirrors the forward walk
//! - whole file: bytes not reachable from any chain are reported as orphaned
//!   (left behind by truncation or an interrupted `add_structure`)

use std::collections::HashSet;
use std::io::{Seek, SeekFrom};

use tracing::warn;

use crate::backing::Backing;
use crate::block::Block;
use crate::error::Result;
use crate::structure::{BlockStructure, MultiBlockStructure};

/// Summary of one chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainReport {
    /// Offset of the head block
    pub head: u32,
    /// Block offsets in forward order
    pub blocks: Vec<u32>,
    /// Sum of payload capacities
    pub capacity: u64,
    /// Sum of high-water marks
    pub written: u64,
    /// Bytes occupied on disk, headers included
    pub footprint: u64,
    /// Whether the `prev` walk from the tail reproduces `blocks` reversed
    pub backward_consistent: bool,
}

impl ChainReport {
    /// Walk the chain at `head` forward, then back again over `prev`
    pub fn scan<F: Backing>(file: &mut F, head: u64) -> Result<Self> {
        let structure = BlockStructure::read(file, head)?;
        let forward: Vec<u32> = structure.blocks().iter().map(|b| b.start).collect();

        let mut backward = Vec::with_capacity(forward.len());
        let mut seen = HashSet::new();
        let mut cursor = Some(structure.tail().start);
        while let Some(start) = cursor {
            if backward.len() > forward.len() || !seen.insert(start) {
                break;
            }
            let block = Block::read_block(file, start)?;
            backward.push(start);
            cursor = block.prev;
        }
        backward.reverse();

        let backward_consistent = backward == forward;
        if !backward_consistent {
            warn!(head, "prev links do not mirror next links");
        }

        Ok(Self {
            head: structure.position(),
            capacity: structure.capacity(),
            written: structure.written(),
            footprint: footprint(&structure),
            blocks: forward,
            backward_consistent,
        })
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }
}

/// Summary of a whole directory-organized file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub directory: ChainReport,
    pub streams: Vec<ChainReport>,
    /// Total file length
    pub file_len: u64,
    /// Bytes belonging to some reachable block
    pub reachable: u64,
}

impl FileReport {
    /// Audit the directory at `position` and every stream it lists
    pub fn scan<F: Backing>(file: &mut F, position: u64) -> Result<Self> {
        let multi = MultiBlockStructure::read(file, position)?;
        let directory = ChainReport::scan(file, position)?;

        let streams = multi
            .structures()
            .iter()
            .map(|s| ChainReport::scan(file, s.position() as u64))
            .collect::<Result<Vec<_>>>()?;

        let file_len = file.seek(SeekFrom::End(0))?;
        let reachable = directory.footprint + streams.iter().map(|s| s.footprint).sum::<u64>();

        Ok(Self {
            directory,
            streams,
            file_len,
            reachable,
        })
    }

    /// Bytes no chain can reach any more
    pub fn orphaned(&self) -> u64 {
        self.file_len.saturating_sub(self.reachable)
    }

    /// Every chain's back-links agree with its forward links
    pub fn is_consistent(&self) -> bool {
        self.directory.backward_consistent && self.streams.iter().all(|s| s.backward_consistent)
    }
}

fn footprint(structure: &BlockStructure) -> u64 {
    structure.blocks().iter().map(|b| b.end() - b.start as u64).sum()
}
