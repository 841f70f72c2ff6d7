//! # SampleDb Handle
//!
//! `SampleDb` ties the page store, the B-tree engine and the structural lock
//! together behind the API the profiler daemon and post-processing tools use.
//!
//! ## Insert Protocol
//!
//! ```text
//! insert(key, value)
//!     │
//!     ├─ refresh mapping if another handle grew the file
//!     ├─ key present?        ──yes──> accumulate in place, no lock, done
//!     ├─ leaf has a free slot? ─yes──> store the item in place, no lock, done
//!     │
//!     └─ leaf full: take structural lock (blocks, no timeout)
//!             ├─ refresh mapping again
//!             ├─ descend again, insert, split, grow root as needed
//!             └─ release lock when the guard drops
//! ```
//!
//! The lock is only taken when a split, and possibly growth, is about to
//! happen. The second descent under the lock means a structural writer in
//! another process that got there first (and perhaps inserted the same key)
//! is observed rather than overwritten.
//!
//! ## Reads After Growth
//!
//! Every read (`get`, `travel`, `check`, `stats`, ...) first picks up growth
//! performed by other handles, so a long-lived reader keeps working while a
//! writer doubles the file. Reads take `&mut self` because the remap replaces
//! the mapping that page references point into.
//!
//! ## Preconditions
//!
//! - One handle is used from one thread at a time.
//! - Only one structural writer runs at a time; the lock enforces this for
//!   every handle that goes through `insert`.
//! - A traversal through one handle is only valid while no other handle
//!   restructures the tree. In-place accumulation is safe to interleave.

use std::ops::RangeBounds;
use std::path::Path;

use eyre::Result;
use tracing::trace;

use super::builder::SampleDbBuilder;
use crate::btree::{self, BTree, InsertOutcome, SearchStrategy, TreeStats, Violation};
use crate::error::StoreError;
use crate::storage::{FileLock, Key, OpenMode, PageStore, Value};

#[derive(Debug)]
pub struct SampleDb {
    store: PageStore,
    lock: FileLock,
    strategy: SearchStrategy,
}

impl SampleDb {
    pub fn builder() -> SampleDbBuilder {
        SampleDbBuilder::new()
    }

    /// Opens or creates a read-write store with no caller header.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, OpenMode::ReadWrite, 0)
    }

    pub fn open_with<P: AsRef<Path>>(path: P, mode: OpenMode, header_size: usize) -> Result<Self> {
        Self::builder()
            .path(path)
            .mode(mode)
            .header_size(header_size)
            .open()
    }

    pub(crate) fn from_store(store: PageStore, strategy: SearchStrategy) -> Result<Self> {
        let lock = FileLock::new(store.try_clone_file()?, store.path());
        Ok(Self {
            store,
            lock,
            strategy,
        })
    }

    /// Adds `value` to the counter for `key`, creating it if absent.
    /// Counters saturate instead of wrapping.
    pub fn insert(&mut self, key: Key, value: Value) -> Result<InsertOutcome> {
        if self.store.mode() == OpenMode::ReadOnly {
            return Err(StoreError::ReadOnly {
                path: self.store.path().to_path_buf(),
            }
            .into());
        }

        self.store.refresh()?;
        if let Some(outcome) =
            BTree::new(&mut self.store, self.strategy).insert_without_split(key, value)?
        {
            return Ok(outcome);
        }

        let _guard = self.lock.exclusive()?;
        self.store.refresh()?;
        let outcome = BTree::new(&mut self.store, self.strategy).insert(key, value)?;
        trace!(key, ?outcome, "inserted under structural lock");
        Ok(outcome)
    }

    /// Exact-match lookup. Lock-free.
    pub fn get(&mut self, key: Key) -> Result<Option<Value>> {
        self.store.refresh()?;
        btree::lookup(&self.store, self.strategy, key)
    }

    /// Visits every `(key, value)` with `first <= key < last` in ascending
    /// key order.
    pub fn travel<F>(&mut self, first: Key, last: Key, visit: F) -> Result<()>
    where
        F: FnMut(Key, Value),
    {
        self.store.refresh()?;
        btree::travel(&self.store, first, last, visit)
    }

    pub fn travel_range<R, F>(&mut self, range: R, visit: F) -> Result<()>
    where
        R: RangeBounds<Key>,
        F: FnMut(Key, Value),
    {
        self.store.refresh()?;
        btree::travel_range(&self.store, range, visit)
    }

    /// Every `(key, value)` pair in ascending key order.
    pub fn entries(&mut self) -> Result<Vec<(Key, Value)>> {
        let mut entries = Vec::new();
        self.travel_range(.., |k, v| entries.push((k, v)))?;
        Ok(entries)
    }

    pub fn check(&mut self) -> Result<Vec<Violation>> {
        self.store.refresh()?;
        btree::check(&self.store)
    }

    pub fn stats(&mut self) -> Result<TreeStats> {
        self.store.refresh()?;
        btree::stats(&self.store)
    }

    /// Picks up growth performed by other handles on the same file.
    pub fn refresh(&mut self) -> Result<bool> {
        self.store.refresh()
    }

    pub fn sync(&self) -> Result<()> {
        self.store.sync()
    }

    pub fn close(self) -> Result<()> {
        self.store.close()
    }

    pub fn header(&self) -> &[u8] {
        self.store.header()
    }

    pub fn header_mut(&mut self) -> Result<&mut [u8]> {
        self.store.header_mut()
    }

    pub fn page_capacity(&self) -> u32 {
        self.store.page_capacity()
    }

    pub fn used_pages(&self) -> Result<u32> {
        self.store.used_pages()
    }

    pub fn root_page(&self) -> Result<u32> {
        self.store.root_page()
    }

    pub fn path(&self) -> &Path {
        self.store.path()
    }

    pub fn mode(&self) -> OpenMode {
        self.store.mode()
    }

    pub fn search_strategy(&self) -> SearchStrategy {
        self.strategy
    }

    /// Read access to the underlying pages, for diagnostics.
    pub fn store(&self) -> &PageStore {
        &self.store
    }
}
