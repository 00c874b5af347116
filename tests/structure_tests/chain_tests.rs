//! Tests for BlockStructure
//!
//! These tests verify:
//! - Initialization layout
//! - Appending and mid-chain splicing of blocks
//! - Reloading a chain from disk by following links
//! - Truncation and link poisoning
//! - Corruption detection (bad magic, cycles)

#[path = "../common/mod.rs"]
mod common;

use std::io::Cursor;

use blockstore::block::Block;
use blockstore::{BlockStructure, StoreError};
use common::{bytes_to_ints, poke, read_file, reopen, setup_temp_file, M};

// =============================================================================
// Helper Functions
// =============================================================================

/// Forward offsets, and the offsets found by walking `prev` from the tail
fn walk_both_ways(file: &mut std::fs::File, head: u32) -> (Vec<u32>, Vec<u32>) {
    let mut forward = Vec::new();
    let mut cursor = Some(head);
    let mut tail = head;
    while let Some(start) = cursor {
        let block = Block::read_block(file, start).unwrap();
        forward.push(start);
        tail = start;
        cursor = block.next;
    }

    let mut backward = Vec::new();
    let mut cursor = Some(tail);
    while let Some(start) = cursor {
        let block = Block::read_block(file, start).unwrap();
        backward.push(start);
        cursor = block.prev;
    }

    (forward, backward)
}

// =============================================================================
// Initialization Tests
// =============================================================================

#[test]
fn test_initialization() {
    let (_temp, _path, mut file) = setup_temp_file();

    let structure = BlockStructure::initialize(&mut file, 0, 16).unwrap();

    let got = bytes_to_ints(&read_file(&mut file));
    assert_eq!(got, vec![M, 16, -1, -1, 0, -1, -1, -1, -1]);
    assert_eq!(structure.len(), 1);
    assert_eq!(structure.position(), 0);
    assert_eq!(structure.capacity(), 16);
    assert_eq!(structure.written(), 0);
}

#[test]
fn test_initialization_rejects_zero_block_size() {
    let (_temp, _path, mut file) = setup_temp_file();

    let result = BlockStructure::initialize(&mut file, 0, 0);
    assert!(matches!(result, Err(StoreError::Config(_))));
}

#[test]
fn test_initialization_with_misaligned_fill() {
    let (_temp, _path, mut file) = setup_temp_file();

    let result = BlockStructure::initialize_with_fill(&mut file, 0, 16, b"abc");
    assert!(matches!(result, Err(StoreError::Alignment { .. })));
    // Nothing was written
    assert!(read_file(&mut file).is_empty());
}

// =============================================================================
// add_block Tests
// =============================================================================

#[test]
fn test_add_block() {
    let (_temp, _path, mut file) = setup_temp_file();

    let mut structure = BlockStructure::initialize(&mut file, 0, 16).unwrap();
    let block = structure.add_block(&mut file, 16, None).unwrap();

    assert_eq!(block.start, 36);
    let got = bytes_to_ints(&read_file(&mut file));
    let expected = vec![
        M, 16, 36, -1, 0,
        -1, -1, -1, -1,
        M, 16, -1, 0, 0,
        -1, -1, -1, -1,
    ];
    assert_eq!(got, expected);
}

#[test]
fn test_add_block_after_tail_is_append() {
    let (_temp, _path, mut file) = setup_temp_file();

    let mut structure = BlockStructure::initialize(&mut file, 0, 16).unwrap();
    structure.add_block(&mut file, 16, None).unwrap();
    structure.add_block(&mut file, 16, Some(36)).unwrap();

    let starts: Vec<u32> = structure.blocks().iter().map(|b| b.start).collect();
    assert_eq!(starts, vec![0, 36, 72]);
    assert_eq!(structure.tail().next, None);
}

#[test]
fn test_read_structure_header() {
    let (_temp, path, mut file) = setup_temp_file();

    let mut structure = BlockStructure::initialize(&mut file, 0, 16).unwrap();
    structure.add_block(&mut file, 16, None).unwrap();
    let head = structure.blocks()[0].start;
    structure.add_block(&mut file, 16, Some(head)).unwrap();

    let mut file = reopen(&path);
    let reread = BlockStructure::read(&mut file, 0).unwrap();

    assert_eq!(reread.len(), 3);
    let got: Vec<_> = reread
        .blocks()
        .iter()
        .map(|b| (b.size, b.next, b.prev, b.next_empty))
        .collect();
    let expected = vec![
        (16, Some(72), None, 0),
        (16, Some(36), Some(0), 0),
        (16, None, Some(72), 0),
    ];
    assert_eq!(got, expected);
}

#[test]
fn test_splice_with_custom_fill() {
    let (_temp, path, mut file) = setup_temp_file();

    let mut structure = BlockStructure::initialize(&mut file, 0, 16).unwrap();
    structure.set_fill(&[0, 0, 0, 0x10]);
    structure.add_block(&mut file, 16, None).unwrap();
    structure.set_fill(&[0, 0, 0, 0x20]);
    structure.add_block(&mut file, 16, Some(0)).unwrap();

    let mut file = reopen(&path);
    let reread = BlockStructure::read(&mut file, 0).unwrap();
    let mut payloads = Vec::new();
    for block in reread.blocks() {
        payloads.extend(bytes_to_ints(&block.read_data(&mut file, 0, 16).unwrap()));
    }
    assert_eq!(payloads, vec![-1, -1, -1, -1, 32, 32, 32, 32, 16, 16, 16, 16]);
}

#[test]
fn test_add_block_with_different_size() {
    let (_temp, path, mut file) = setup_temp_file();

    let mut structure = BlockStructure::initialize(&mut file, 0, 16).unwrap();
    structure.add_block(&mut file, 64, None).unwrap();

    let mut file = reopen(&path);
    let reread = BlockStructure::read(&mut file, 0).unwrap();
    assert_eq!(reread.blocks()[1].size, 64);
    assert_eq!(reread.capacity(), 80);
}

#[test]
fn test_add_block_after_unknown_block() {
    let (_temp, _path, mut file) = setup_temp_file();

    let mut structure = BlockStructure::initialize(&mut file, 0, 16).unwrap();
    let result = structure.add_block(&mut file, 16, Some(999));

    assert!(matches!(result, Err(StoreError::BlockNotInChain(999))));
    assert_eq!(structure.len(), 1);
}

#[test]
fn test_chain_integrity_after_many_splices() {
    let (_temp, path, mut file) = setup_temp_file();

    let mut structure = BlockStructure::initialize(&mut file, 0, 16).unwrap();
    for i in 0..8u32 {
        let after = structure.blocks()[(i as usize * 3) % structure.len()].start;
        structure.add_block(&mut file, 16, Some(after)).unwrap();
    }

    let mut file = reopen(&path);
    let (forward, mut backward) = walk_both_ways(&mut file, 0);
    backward.reverse();

    let in_memory: Vec<u32> = structure.blocks().iter().map(|b| b.start).collect();
    assert_eq!(forward.len(), 9);
    assert_eq!(forward, in_memory);
    assert_eq!(backward, forward);
}

// =============================================================================
// Truncation Tests
// =============================================================================

#[test]
fn test_truncate_drops_suffix() {
    let (_temp, path, mut file) = setup_temp_file();

    let mut structure = BlockStructure::initialize(&mut file, 0, 16).unwrap();
    for _ in 0..3 {
        structure.add_block(&mut file, 16, None).unwrap();
    }
    structure.truncate(&mut file, 36).unwrap();

    assert_eq!(structure.len(), 2);
    assert_eq!(structure.tail().next, None);

    let mut file = reopen(&path);
    let reread = BlockStructure::read(&mut file, 0).unwrap();
    assert_eq!(reread.len(), 2);

    // Dropped blocks stay on disk with poisoned links
    for start in [72, 108] {
        let orphan = Block::read_block(&mut file, start).unwrap();
        assert_eq!(orphan.next, None);
        assert_eq!(orphan.prev, None);
    }
    assert_eq!(read_file(&mut file).len(), 4 * 36);
}

#[test]
fn test_truncate_at_tail_is_noop() {
    let (_temp, _path, mut file) = setup_temp_file();

    let mut structure = BlockStructure::initialize(&mut file, 0, 16).unwrap();
    structure.add_block(&mut file, 16, None).unwrap();
    structure.truncate(&mut file, 36).unwrap();

    assert_eq!(structure.len(), 2);
}

#[test]
fn test_add_after_truncate_never_reuses_space() {
    let (_temp, _path, mut file) = setup_temp_file();

    let mut structure = BlockStructure::initialize(&mut file, 0, 16).unwrap();
    structure.add_block(&mut file, 16, None).unwrap();
    structure.truncate(&mut file, 0).unwrap();

    let block = structure.add_block(&mut file, 16, None).unwrap();
    assert_eq!(block.start, 72);
}

#[test]
fn test_truncate_unknown_block() {
    let (_temp, _path, mut file) = setup_temp_file();

    let mut structure = BlockStructure::initialize(&mut file, 0, 16).unwrap();
    let result = structure.truncate(&mut file, 36);
    assert!(matches!(result, Err(StoreError::BlockNotInChain(36))));
}

// =============================================================================
// Corruption Tests
// =============================================================================

#[test]
fn test_bad_magic() {
    let (_temp, path, mut file) = setup_temp_file();

    let mut structure = BlockStructure::initialize(&mut file, 0, 16).unwrap();
    structure.add_block(&mut file, 16, None).unwrap();
    poke(&mut file, 36, &123_424_736i32.to_be_bytes());

    let mut file = reopen(&path);
    let err = BlockStructure::read(&mut file, 0).unwrap_err();
    assert!(matches!(err, StoreError::Corruption { offset: 36, .. }));
}

#[test]
fn test_flipped_magic_on_every_block_is_detected() {
    for victim in [0u64, 36, 72] {
        let (_temp, path, mut file) = setup_temp_file();

        let mut structure = BlockStructure::initialize(&mut file, 0, 16).unwrap();
        structure.add_block(&mut file, 16, None).unwrap();
        structure.add_block(&mut file, 16, None).unwrap();
        poke(&mut file, victim, &[0xDE, 0xAD, 0xBE, 0xEF]);

        let mut file = reopen(&path);
        let err = BlockStructure::read(&mut file, 0).unwrap_err();
        assert!(
            matches!(err, StoreError::Corruption { offset, .. } if offset == victim),
            "victim {}: {:?}",
            victim,
            err
        );
    }
}

#[test]
fn test_cycle_is_corruption() {
    let (_temp, _path, mut file) = setup_temp_file();

    let mut structure = BlockStructure::initialize(&mut file, 0, 16).unwrap();
    structure.add_block(&mut file, 16, None).unwrap();
    // Point the tail's `next` back at the head
    poke(&mut file, 36 + 8, &0i32.to_be_bytes());

    let err = BlockStructure::read(&mut file, 0).unwrap_err();
    assert!(err.is_corruption());
}

#[test]
fn test_structure_in_memory_backing() {
    let mut file = Cursor::new(Vec::new());

    let mut structure = BlockStructure::initialize(&mut file, 0, 8).unwrap();
    structure.add_block(&mut file, 8, None).unwrap();

    let reread = BlockStructure::read(&mut file, 0).unwrap();
    assert_eq!(reread.blocks(), structure.blocks());
    assert_eq!(file.get_ref().len(), 2 * 28);
}
