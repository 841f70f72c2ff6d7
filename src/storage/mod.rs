//! # Storage Module
//!
//! The storage layer maps one store file into memory and exposes it as an
//! array of fixed-size pages addressed by index.
//!
//! ## Architecture Overview
//!
//! Instead of copying pages between kernel and user space, the file is mapped
//! `MAP_SHARED` and pages are read as zero-copy `&Page` views. This gives:
//!
//! - **Zero-copy reads**: page views point straight into the mapping
//! - **Cross-process visibility**: every handle on the file sees value updates
//!   as soon as they are stored
//! - **Cheap growth**: doubling the file is amortised O(1) per page
//!
//! ## Safety Model
//!
//! ```text
//! PageStore::page(&self, no) -> Result<&Page>   // Borrows &self immutably
//! PageStore::add_page(&mut self)                // Requires &mut self exclusively
//! ```
//!
//! The borrow checker prevents holding page references across a call that
//! may remap, with zero runtime cost. Code that needs a page after growth
//! keeps its index and resolves it again.
//!
//! ## Module Organization
//!
//! - `mmap`: the mapped file, growth and refresh (`PageStore`)
//! - `page`: page and item layout (`Page`, `Item`)
//! - `descriptor`: capacity / used / root bookkeeping (`Descriptor`)
//! - `lock`: advisory structural writer lock (`FileLock`)
//!
//! ## Thread Safety
//!
//! `PageStore` is `Send`. Every mutating method takes `&mut self`, so one
//! handle is never mutated from two threads at once. Coordination between
//! handles goes through [`FileLock`].

mod descriptor;
mod lock;
mod mmap;
mod page;

pub use descriptor::Descriptor;
pub use lock::{FileLock, LockGuard};
pub use mmap::{Layout, OpenMode, PageStore};
pub use page::{Item, Key, Page, Value};
