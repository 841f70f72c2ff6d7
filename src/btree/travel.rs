//! # Range Traversal
//!
//! In-order walk over a key range, calling a visitor for every item in
//! strictly ascending key order. Nothing is collected; the visitor sees each
//! `(key, value)` as the walk reaches it.
//!
//! Subtrees that cannot intersect the range are skipped: the leftmost
//! subtree only when `first` lies below the page's first key, and an item's
//! right subtree only when the next item's key is still above `first`. The
//! walk stops scanning a page at the first key at or past the upper bound.
//!
//! The walk borrows the store immutably, so the handle that traverses cannot
//! restructure the tree meanwhile. Another handle may still accumulate
//! values in place; each value is read once, from one 4-byte aligned field.

use std::ops::{Bound, RangeBounds};

use eyre::{ensure, Result};

use crate::config::{MAX_DESCENT_DEPTH, NIL_PAGE};
use crate::storage::{Key, PageStore, Value};

/// Visits every item with `first <= key < last`.
pub fn travel<F>(store: &PageStore, first: Key, last: Key, visit: F) -> Result<()>
where
    F: FnMut(Key, Value),
{
    travel_range(store, first..last, visit)
}

/// Visits every item whose key lies in `range`. Unlike [`travel`], this can
/// reach `Key::MAX`.
pub fn travel_range<R, F>(store: &PageStore, range: R, mut visit: F) -> Result<()>
where
    R: RangeBounds<Key>,
    F: FnMut(Key, Value),
{
    let lo = match range.start_bound() {
        Bound::Included(&k) => k as u64,
        Bound::Excluded(&k) => k as u64 + 1,
        Bound::Unbounded => 0,
    };
    let hi = match range.end_bound() {
        Bound::Included(&k) => k as u64 + 1,
        Bound::Excluded(&k) => k as u64,
        Bound::Unbounded => Key::MAX as u64 + 1,
    };
    if lo >= hi {
        return Ok(());
    }

    let mut walk = Walk {
        store,
        lo,
        hi,
        visit: &mut visit,
    };
    walk.page(store.root_page()?, 0)
}

struct Walk<'a, F> {
    store: &'a PageStore,
    lo: u64,
    hi: u64,
    visit: &'a mut F,
}

impl<F> Walk<'_, F>
where
    F: FnMut(Key, Value),
{
    fn page(&mut self, page_no: u32, depth: usize) -> Result<()> {
        if page_no == NIL_PAGE {
            return Ok(());
        }
        ensure!(
            depth < MAX_DESCENT_DEPTH,
            "traversal deeper than {} levels at page {}; tree is corrupt",
            MAX_DESCENT_DEPTH,
            page_no
        );

        let store = self.store;
        let page = store.page(page_no)?;
        let items = page.items();

        if items.first().map_or(true, |first| self.lo < first.key() as u64) {
            self.page(page.leftmost(), depth + 1)?;
        }

        for (i, item) in items.iter().enumerate() {
            let key = item.key() as u64;
            if key >= self.hi {
                break;
            }
            if key >= self.lo {
                (self.visit)(item.key(), item.value());
            }
            let subtree_below_range = items
                .get(i + 1)
                .is_some_and(|next| (next.key() as u64) <= self.lo);
            if !subtree_below_range {
                self.page(item.right(), depth + 1)?;
            }
        }
        Ok(())
    }
}
