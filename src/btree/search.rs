//! # In-Page Key Search
//!
//! Locating a key inside one page is done by either a linear scan or a
//! bisecting search. Which one is faster depends on the page fan-out: with a
//! dozen items the branch-predictable linear scan wins, with hundreds the
//! logarithmic bisection does. The choice is a runtime [`SearchStrategy`]
//! so it can be measured (see `benches/search.rs`) rather than fixed by a
//! build flag. Both strategies return identical results.

use std::cmp::Ordering;

use crate::config::LINEAR_SEARCH_MAX_FANOUT;
use crate::storage::{Item, Key};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchResult {
    /// The key is stored at this index.
    Found(usize),
    /// The key is absent; this is the index it would be inserted at.
    NotFound(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStrategy {
    Linear,
    Bisect,
}

impl SearchStrategy {
    /// The faster strategy for pages holding up to `fanout` items.
    pub const fn for_fanout(fanout: usize) -> Self {
        if fanout <= LINEAR_SEARCH_MAX_FANOUT {
            SearchStrategy::Linear
        } else {
            SearchStrategy::Bisect
        }
    }

    pub fn locate(self, items: &[Item], key: Key) -> SearchResult {
        match self {
            SearchStrategy::Linear => linear(items, key),
            SearchStrategy::Bisect => bisect(items, key),
        }
    }
}

impl Default for SearchStrategy {
    fn default() -> Self {
        Self::for_fanout(crate::config::MAX_PAGE)
    }
}

fn linear(items: &[Item], key: Key) -> SearchResult {
    for (i, item) in items.iter().enumerate() {
        match item.key().cmp(&key) {
            Ordering::Less => continue,
            Ordering::Equal => return SearchResult::Found(i),
            Ordering::Greater => return SearchResult::NotFound(i),
        }
    }
    SearchResult::NotFound(items.len())
}

fn bisect(items: &[Item], key: Key) -> SearchResult {
    match items.binary_search_by(|item| item.key().cmp(&key)) {
        Ok(i) => SearchResult::Found(i),
        Err(i) => SearchResult::NotFound(i),
    }
}
