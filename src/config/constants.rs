//! # sampledb Configuration Constants
//!
//! Every constant that shapes the on-disk layout lives here. Page fan-out is a
//! build-time tuning parameter rather than a runtime option: changing it changes
//! the size of every page and therefore the file format.
//!
//! ## Dependency Graph
//!
//! ```text
//! MIN_PAGE (6)
//!       │
//!       └─> MAX_PAGE (must equal 2 * MIN_PAGE)
//!             │
//!             ├─> ITEM_SIZE (12 bytes: right | value | key)
//!             │
//!             └─> PAGE_SIZE (derived: PAGE_HEADER_SIZE + MAX_PAGE * ITEM_SIZE)
//!
//! DEFAULT_INITIAL_BYTES (4096)
//!       │
//!       └─> initial page capacity of a freshly created file, after the
//!           caller header and DESCRIPTOR_SIZE are subtracted
//!
//! LINEAR_SEARCH_MAX_FANOUT (32)
//!       │
//!       └─> SearchStrategy::for_fanout(MAX_PAGE) picks Linear at or below it
//! ```
//!
//! ## Critical Invariants
//!
//! Enforced by compile-time assertions at the bottom of this file:
//!
//! 1. `MAX_PAGE == 2 * MIN_PAGE` (every split yields two half-full pages)
//! 2. `PAGE_SIZE == PAGE_HEADER_SIZE + MAX_PAGE * ITEM_SIZE`
//! 3. `PAGE_SIZE` and `DESCRIPTOR_SIZE` are multiples of `HEADER_ALIGN`;
//!    together with the header size check at open time this keeps every
//!    on-disk `u32` 4-byte aligned in the mapping

/// Minimum number of items held by every non-root page.
pub const MIN_PAGE: usize = 6;

/// Maximum number of items a page can hold.
pub const MAX_PAGE: usize = 2 * MIN_PAGE;

/// Sentinel page index meaning "no child". Page 0 is a valid page.
pub const NIL_PAGE: u32 = u32::MAX;

/// Bytes per item: right child, value, key.
pub const ITEM_SIZE: usize = 12;

/// Bytes before the item array: count and leftmost child.
pub const PAGE_HEADER_SIZE: usize = 8;

pub const PAGE_SIZE: usize = PAGE_HEADER_SIZE + MAX_PAGE * ITEM_SIZE;

/// Descriptor: page capacity, used pages, root page, reserved.
pub const DESCRIPTOR_SIZE: usize = 16;

/// The caller header size must be a multiple of this.
pub const HEADER_ALIGN: usize = 4;

/// A freshly created file is sized to roughly this many bytes.
pub const DEFAULT_INITIAL_BYTES: usize = 4096;

/// Largest fan-out for which a linear scan beats bisection.
pub const LINEAR_SEARCH_MAX_FANOUT: usize = 32;

/// Tree height up to which the insert path stack stays inline.
pub const MAX_TREE_DEPTH: usize = 16;

/// A descent deeper than this can only come from a cyclic, corrupt tree.
/// With MIN_PAGE = 6 a valid tree of 2^32 keys is under 13 levels deep.
pub const MAX_DESCENT_DEPTH: usize = 64;

const _: () = assert!(MAX_PAGE == 2 * MIN_PAGE);
const _: () = assert!(PAGE_SIZE == PAGE_HEADER_SIZE + MAX_PAGE * ITEM_SIZE);
const _: () = assert!(PAGE_SIZE % HEADER_ALIGN == 0);
const _: () = assert!(DESCRIPTOR_SIZE % HEADER_ALIGN == 0);
