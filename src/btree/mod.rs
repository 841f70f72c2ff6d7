//! # Key-Accumulator B-Tree
//!
//! This module implements the balanced multiway tree that maps 32-bit keys
//! (instruction addresses) to 32-bit saturating sample counters.
//!
//! ## Architecture Overview
//!
//! The tree is a classic B-tree: interior pages store items too, not just
//! separators. Each page holds up to `MAX_PAGE` items plus a leftmost child
//! link, and every item carries a right child link:
//!
//! ```text
//!                 [ leftmost | 40 | 80 ]              root
//!                 /           |       \
//!    [ 10 20 30 ]      [ 50 60 70 ]     [ 90 95 ]      leaves
//! ```
//!
//! Keys in the subtree right of item `40` lie strictly between 40 and 80.
//!
//! ## Operations
//!
//! - [`BTree::insert`]: accumulate into an existing key, or insert and split
//! - [`lookup`]: exact-match read
//! - [`travel`] / [`travel_range`]: ordered visit of a key range
//! - [`check`]: invariant validation producing [`Violation`]s
//! - [`stats`]: shape statistics
//!
//! ## Concurrency
//!
//! One structural writer at a time, enforced across processes by the store's
//! advisory lock. Readers never lock. A concurrent accumulate only rewrites
//! one 4-byte aligned value field. On the targets memmap2 supports such a
//! store is not split in practice, so readers observe the old or the new
//! value; no stronger guarantee is made.
//! A concurrent structural change (split, growth) invalidates any traversal
//! running through another handle at that moment.

mod accumulate;
mod check;
mod search;
mod stats;
mod travel;
mod tree;

pub use accumulate::Accumulate;
pub use check::{check, Violation};
pub use search::{SearchResult, SearchStrategy};
pub use stats::{stats, TreeStats};
pub use travel::{travel, travel_range};
pub use tree::{lookup, BTree, InsertOutcome};
