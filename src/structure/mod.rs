//! Structure Module
//!
//! Block chains and the streams built on top of them.
//!
//! ## Layers
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ MultiBlockStructure                         │
//! │   header chain = [head, head, ..., -1]      │
//! ├─────────────────────────────────────────────┤
//! │ OrderedDataIo                               │
//! │   seek / read / write(truncate) / size      │
//! ├─────────────────────────────────────────────┤
//! │ BlockStructure                              │
//! │   blk ⇄ blk ⇄ blk  (next/prev file offsets) │
//! └─────────────────────────────────────────────┘
//! ```

mod chain;
mod data_io;
mod multi;

pub use chain::BlockStructure;
pub use data_io::{DataChunks, OrderedDataIo};
pub use multi::{MultiBlockStructure, ENTRY_SIZE};
