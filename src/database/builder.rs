//! # SampleDb Builder
//!
//! `SampleDbBuilder` configures how a store file is opened.
//!
//! ## Configuration Options
//!
//! | Option           | Default                     | Description                               |
//! |------------------|-----------------------------|-------------------------------------------|
//! | mode             | `ReadWrite`                 | `ReadOnly` never creates or writes        |
//! | header_size      | 0                           | Caller header bytes, multiple of 4        |
//! | initial_capacity | pages fitting in 4096 bytes | Pages in a newly created file             |
//! | search           | by fan-out (`Linear`)       | In-page search strategy                   |
//!
//! `header_size` is part of the file layout: a file must always be reopened
//! with the header size it was created with. `initial_capacity` only matters
//! when the file is created.
//!
//! ```ignore
//! let db = SampleDb::builder()
//!     .path("samples/{root}/bin/ls")
//!     .header_size(128)
//!     .open()?;
//! ```

use std::path::{Path, PathBuf};

use eyre::{eyre, Result};

use super::database::SampleDb;
use crate::btree::SearchStrategy;
use crate::storage::{OpenMode, PageStore};

#[derive(Debug, Clone, Default)]
pub struct SampleDbBuilder {
    path: Option<PathBuf>,
    mode: OpenMode,
    header_size: usize,
    initial_capacity: Option<u32>,
    search: Option<SearchStrategy>,
}

impl SampleDbBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn mode(mut self, mode: OpenMode) -> Self {
        self.mode = mode;
        self
    }

    /// Reserves `bytes` at the start of the file for the caller's own header.
    /// Must be a multiple of 4 so every stored value stays 4-byte aligned.
    pub fn header_size(mut self, bytes: usize) -> Self {
        self.header_size = bytes;
        self
    }

    /// Page capacity of a newly created file. Ignored for existing files.
    pub fn initial_capacity(mut self, pages: u32) -> Self {
        self.initial_capacity = Some(pages);
        self
    }

    pub fn search(mut self, strategy: SearchStrategy) -> Self {
        self.search = Some(strategy);
        self
    }

    pub fn get_path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get_search(&self) -> SearchStrategy {
        self.search.unwrap_or_default()
    }

    pub fn open(self) -> Result<SampleDb> {
        let path = self
            .path
            .as_deref()
            .ok_or_else(|| eyre!("store path not specified"))?;
        let store =
            PageStore::open_with_capacity(path, self.mode, self.header_size, self.initial_capacity)?;
        SampleDb::from_store(store, self.get_search())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn builder_path_sets_path() {
        let builder = SampleDbBuilder::new().path("/tmp/samples.db");

        assert_eq!(builder.get_path(), Some(Path::new("/tmp/samples.db")));
    }

    #[test]
    fn builder_search_defaults_by_fanout() {
        assert_eq!(SampleDbBuilder::new().get_search(), SearchStrategy::default());
        assert_eq!(
            SampleDbBuilder::new()
                .search(SearchStrategy::Bisect)
                .get_search(),
            SearchStrategy::Bisect
        );
    }

    #[test]
    fn builder_open_without_path_fails() {
        let err = SampleDbBuilder::new().open().unwrap_err();

        assert!(err.to_string().contains("store path not specified"));
    }

    #[test]
    fn builder_rejects_unaligned_header_size() {
        let dir = tempdir().unwrap();

        let err = SampleDbBuilder::new()
            .path(dir.path().join("samples.db"))
            .header_size(6)
            .open()
            .unwrap_err();

        assert!(err.to_string().contains("not a multiple of 4"));
    }

    #[test]
    fn builder_initial_capacity_applies_to_new_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("samples.db");

        let db = SampleDbBuilder::new()
            .path(&path)
            .initial_capacity(3)
            .open()
            .unwrap();
        assert_eq!(db.store().page_capacity(), 3);
        drop(db);

        let db = SampleDbBuilder::new()
            .path(&path)
            .initial_capacity(50)
            .open()
            .unwrap();
        assert_eq!(db.store().page_capacity(), 3);
    }
}
