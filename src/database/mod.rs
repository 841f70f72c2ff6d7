//! # Database Module
//!
//! The high-level store handle used by collaborators:
//!
//! ```ignore
//! use sampledb::SampleDb;
//!
//! let mut db = SampleDb::open("samples.db")?;
//! db.insert(0x0804_8a10, 1)?;
//! db.travel(0x0804_8000, 0x0804_9000, |addr, count| {
//!     println!("{:#x} {}", addr, count);
//! })?;
//! ```
//!
//! - `database`: the [`SampleDb`] handle and its insert/lock protocol
//! - `builder`: [`SampleDbBuilder`] for open options

mod builder;
#[allow(clippy::module_inception)]
mod database;

pub use builder::SampleDbBuilder;
pub use database::SampleDb;
