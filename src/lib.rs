//! # blockstore
//!
//! Storage substrate for a minimal embedded database:
//! - One flat backing file organized into self-describing fixed-size blocks
//! - Blocks chained into growable, seekable, truncatable byte streams
//! - A directory stream recording the heads of many independent streams
//! - Magic-number check on every block read
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      BlockFile                               │
//! │              (open / create_stream / stream)                 │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                 MultiBlockStructure                          │
//! │          (directory chain of child head offsets)             │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │OrderedDataIo│ ───────▶ │BlockStructure│
//!   │  (cursor)   │          │   (chain)    │
//!   └─────────────┘          └──────┬──────┘
//!                                   │
//!                                   ▼
//!                           ┌─────────────┐
//!                           │    Block    │
//!                           │(header+data)│
//!                           └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod backing;
pub mod block;
pub mod structure;
pub mod file;
pub mod audit;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{StoreError, Result};
pub use config::Config;
pub use backing::Backing;
pub use block::Block;
pub use structure::{BlockStructure, MultiBlockStructure, OrderedDataIo};
pub use file::BlockFile;
pub use audit::{ChainReport, FileReport};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of blockstore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
