//! # sampledb - Memory-Mapped Sample Count Store
//!
//! sampledb is the on-disk store a sampling profiler uses to keep one counter
//! per instruction address. Each store file holds a balanced multiway tree of
//! `(key, value)` pairs where inserting an existing key adds to its value
//! instead of creating a duplicate.
//!
//! - **Zero-copy access**: pages are read and written in place in the mapping
//! - **Grow-only**: pages are never freed, the file doubles when full
//! - **Saturating counters**: accumulation clamps at the value maximum
//!
//! ## Quick Start
//!
//! ```ignore
//! use sampledb::SampleDb;
//!
//! let mut db = SampleDb::builder()
//!     .path("samples.db")
//!     .header_size(64)
//!     .open()?;
//!
//! db.insert(0x0804_8a10, 1)?;
//! db.insert(0x0804_8a10, 1)?;
//!
//! assert_eq!(db.get(0x0804_8a10)?, Some(2));
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │     Public API (SampleDb/Builder)    │
//! ├─────────────────────────────────────┤
//! │ Insert/Accumulate │ Travel │ Check   │
//! ├─────────────────────────────────────┤
//! │   Page Store (mmap + grow + lock)    │
//! ├─────────────────────────────────────┤
//! │          Memory-Mapped File          │
//! └─────────────────────────────────────┘
//! ```
//!
//! ## File Layout
//!
//! ```text
//! +----------------------+  offset 0
//! | caller header        |  header_size bytes, opaque
//! +----------------------+
//! | descriptor (16 B)    |  capacity | used | root | reserved
//! +----------------------+
//! | page 0 .. capacity-1 |  152 bytes each
//! +----------------------+
//! ```
//!
//! ## Module Overview
//!
//! - [`storage`]: mapping, growth, descriptor, page layout, file lock
//! - [`btree`]: search, insert/accumulate, travel, consistency check, stats
//! - [`database`]: the `SampleDb` handle and its builder
//! - [`config`]: layout and fan-out constants
//! - [`error`]: `StoreError` kinds carried inside `eyre` reports

#[macro_use]
mod macros;

pub mod btree;
pub mod config;
pub mod database;
pub mod error;
pub mod storage;

pub use btree::{InsertOutcome, SearchStrategy, TreeStats, Violation};
pub use database::{SampleDb, SampleDbBuilder};
pub use error::StoreError;
pub use storage::{Key, OpenMode, Value};
