//! # Insert / Accumulate Engine
//!
//! A classic B-tree (not a B+tree): every page, interior or leaf, stores
//! `(key, value)` items, and each item's right link points at the subtree of
//! keys between it and the next item.
//!
//! ## Insert Algorithm
//!
//! 1. Descend from the root, locating the key in each page. The visited
//!    `(page, position)` pairs go on a path stack.
//! 2. If the key is found on the way down, add the value in place
//!    (saturating) and stop. No page changes shape.
//! 3. Otherwise the descent ends at a leaf. Insert the new item there; if
//!    the page is full, split it and carry the pivot item up the path stack
//!    into the parent at the recorded position, splitting again as needed.
//! 4. If the pivot climbs past the root, a new root holding only the pivot
//!    is allocated with its leftmost link set to the old root.
//!
//! ## Split Policy
//!
//! A full page holds `MAX_PAGE = 2 * MIN_PAGE` items `a[0..MAX)`. The new
//! item `x` belongs at position `pos`. Which item is promoted depends on
//! where `pos` falls relative to the median position `MIN_PAGE`:
//!
//! ```text
//! pos <  MIN:  pivot = a[MIN-1]   lower = a[0..MIN-1] + x at pos   upper = a[MIN..MAX)
//! pos == MIN:  pivot = x          lower = a[0..MIN)                upper = a[MIN..MAX)
//! pos >  MIN:  pivot = a[MIN]     lower = a[0..MIN)                upper = a[MIN+1..pos) + x + a[pos..MAX)
//! ```
//!
//! Both halves end up with exactly `MIN_PAGE` items. The upper half moves to
//! a freshly allocated page whose leftmost link is the pivot's old right
//! link; the pivot's right link then points at the new page.
//!
//! ## Page References and Growth
//!
//! Allocating the new page may remap the file. The split therefore copies
//! the full page out of the mapping first, allocates, and only then writes
//! both halves back through fresh `page_mut` lookups.

use std::cmp::Ordering;

use eyre::{ensure, eyre, Result};
use smallvec::SmallVec;
use tracing::{debug, trace};

use super::accumulate::Accumulate;
use super::search::{SearchResult, SearchStrategy};
use crate::config::{MAX_DESCENT_DEPTH, MAX_PAGE, MAX_TREE_DEPTH, MIN_PAGE, NIL_PAGE};
use crate::storage::{Item, Key, PageStore, Value};

type PathStack = SmallVec<[(u32, usize); MAX_TREE_DEPTH]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The key existed; its value was accumulated in place.
    Accumulated,
    /// A new item was stored. `splits` pages were split on the way, and
    /// `new_root` tells whether the tree grew a level.
    Inserted { splits: usize, new_root: bool },
}

enum Descent {
    Found { page_no: u32, index: usize },
    Leaf(PathStack),
}

fn descend(store: &PageStore, strategy: SearchStrategy, key: Key) -> Result<Descent> {
    let mut path = PathStack::new();
    let mut page_no = store.root_page()?;

    loop {
        ensure!(
            path.len() < MAX_DESCENT_DEPTH,
            "descent deeper than {} levels at page {}; tree is corrupt",
            MAX_DESCENT_DEPTH,
            page_no
        );

        let page = store.page(page_no)?;
        match strategy.locate(page.items(), key) {
            SearchResult::Found(index) => return Ok(Descent::Found { page_no, index }),
            SearchResult::NotFound(pos) => {
                path.push((page_no, pos));
                let child = page.child_before(pos);
                if child == NIL_PAGE {
                    return Ok(Descent::Leaf(path));
                }
                page_no = child;
            }
        }
    }
}

/// Exact-match lookup. Takes no lock.
pub fn lookup(store: &PageStore, strategy: SearchStrategy, key: Key) -> Result<Option<Value>> {
    match descend(store, strategy, key)? {
        Descent::Found { page_no, index } => Ok(Some(store.page(page_no)?.items()[index].value())),
        Descent::Leaf(_) => Ok(None),
    }
}

#[derive(Debug)]
pub struct BTree<'a> {
    store: &'a mut PageStore,
    strategy: SearchStrategy,
}

impl<'a> BTree<'a> {
    pub fn new(store: &'a mut PageStore, strategy: SearchStrategy) -> Self {
        Self { store, strategy }
    }

    pub fn get(&self, key: Key) -> Result<Option<Value>> {
        lookup(self.store, self.strategy, key)
    }

    /// Accumulates into an existing key. Returns `false`, changing nothing,
    /// when the key is absent.
    pub fn accumulate(&mut self, key: Key, value: Value) -> Result<bool> {
        match descend(self.store, self.strategy, key)? {
            Descent::Found { page_no, index } => {
                self.accumulate_at(page_no, index, value)?;
                Ok(true)
            }
            Descent::Leaf(_) => Ok(false),
        }
    }

    /// Accumulates into an existing key, or stores a new key when its leaf
    /// has a free slot. Returns `None`, changing nothing, when storing the
    /// key would split a page.
    pub fn insert_without_split(&mut self, key: Key, value: Value) -> Result<Option<InsertOutcome>> {
        let mut path = match descend(self.store, self.strategy, key)? {
            Descent::Found { page_no, index } => {
                self.accumulate_at(page_no, index, value)?;
                return Ok(Some(InsertOutcome::Accumulated));
            }
            Descent::Leaf(path) => path,
        };

        let (page_no, pos) = path
            .pop()
            .ok_or_else(|| eyre!("descent for key {:#x} recorded no leaf", key))?;
        if self.store.page(page_no)?.is_full() {
            return Ok(None);
        }
        self.store
            .page_mut(page_no)?
            .insert_at(pos, Item::new(key, value));
        Ok(Some(InsertOutcome::Inserted {
            splits: 0,
            new_root: false,
        }))
    }

    pub fn insert(&mut self, key: Key, value: Value) -> Result<InsertOutcome> {
        let mut path = match descend(self.store, self.strategy, key)? {
            Descent::Found { page_no, index } => {
                self.accumulate_at(page_no, index, value)?;
                return Ok(InsertOutcome::Accumulated);
            }
            Descent::Leaf(path) => path,
        };

        let mut pending = Item::new(key, value);
        let mut splits = 0;

        while let Some((page_no, pos)) = path.pop() {
            if !self.store.page(page_no)?.is_full() {
                self.store.page_mut(page_no)?.insert_at(pos, pending);
                return Ok(InsertOutcome::Inserted {
                    splits,
                    new_root: false,
                });
            }
            pending = self.split(page_no, pos, pending)?;
            splits += 1;
        }

        self.grow_root(pending)?;
        Ok(InsertOutcome::Inserted {
            splits,
            new_root: true,
        })
    }

    fn accumulate_at(&mut self, page_no: u32, index: usize, value: Value) -> Result<()> {
        let item = self.store.page_mut(page_no)?.item_mut(index);
        let total = item.value().accumulate(value);
        item.set_value(total);
        Ok(())
    }

    /// Splits the full page `page_no` around `item`, which belongs at `pos`.
    /// Returns the pivot to insert into the parent.
    fn split(&mut self, page_no: u32, pos: usize, item: Item) -> Result<Item> {
        let old = *self.store.page(page_no)?;
        let items = old.items();
        ensure!(
            items.len() == MAX_PAGE,
            "split of page {} holding {} items",
            page_no,
            items.len()
        );

        let mut lower = [Item::vacant(); MIN_PAGE];
        let mut upper = [Item::vacant(); MIN_PAGE];

        let mut pivot = match pos.cmp(&MIN_PAGE) {
            Ordering::Less => {
                splice(&mut lower, &items[..MIN_PAGE - 1], pos, item);
                upper.copy_from_slice(&items[MIN_PAGE..]);
                items[MIN_PAGE - 1]
            }
            Ordering::Equal => {
                lower.copy_from_slice(&items[..MIN_PAGE]);
                upper.copy_from_slice(&items[MIN_PAGE..]);
                item
            }
            Ordering::Greater => {
                lower.copy_from_slice(&items[..MIN_PAGE]);
                splice(&mut upper, &items[MIN_PAGE + 1..], pos - MIN_PAGE - 1, item);
                items[MIN_PAGE]
            }
        };

        let new_page = self.store.add_page()?;
        self.store.page_mut(new_page)?.fill(pivot.right(), &upper);
        self.store.page_mut(page_no)?.fill(old.leftmost(), &lower);
        pivot.set_right(new_page);

        trace!(page_no, new_page, pivot = pivot.key(), "split page");
        Ok(pivot)
    }

    fn grow_root(&mut self, pivot: Item) -> Result<()> {
        let old_root = self.store.root_page()?;
        let new_root = self.store.add_page()?;
        self.store.page_mut(new_root)?.fill(old_root, &[pivot]);
        self.store.set_root_page(new_root)?;

        debug!(old_root, new_root, pivot = pivot.key(), "tree grew a level");
        Ok(())
    }
}

/// Copies `src` (MIN_PAGE - 1 items) into `dst` with `item` inserted at `pos`.
fn splice(dst: &mut [Item; MIN_PAGE], src: &[Item], pos: usize, item: Item) {
    debug_assert_eq!(src.len(), MIN_PAGE - 1);
    dst[..pos].copy_from_slice(&src[..pos]);
    dst[pos] = item;
    dst[pos + 1..].copy_from_slice(&src[pos..]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::OpenMode;
    use tempfile::tempdir;

    fn keys_of(store: &PageStore, page_no: u32) -> Vec<Key> {
        store
            .page(page_no)
            .unwrap()
            .items()
            .iter()
            .map(|i| i.key())
            .collect()
    }

    /// Fills the root leaf with 10, 20, ..., 120 and inserts `extra`.
    fn split_root_with(extra: Key) -> (tempfile::TempDir, PageStore) {
        let dir = tempdir().unwrap();
        let mut store = PageStore::open(dir.path().join("split.db"), OpenMode::ReadWrite, 0).unwrap();
        {
            let mut tree = BTree::new(&mut store, SearchStrategy::Linear);
            for k in 1..=MAX_PAGE as Key {
                tree.insert(k * 10, 1).unwrap();
            }
            assert_eq!(
                tree.insert(extra, 1).unwrap(),
                InsertOutcome::Inserted {
                    splits: 1,
                    new_root: true
                }
            );
        }
        (dir, store)
    }

    fn assert_split(extra: Key, pivot: Key, lower: &[Key], upper: &[Key]) {
        let (_dir, store) = split_root_with(extra);
        let root = store.root_page().unwrap();
        let root_page = store.page(root).unwrap();

        assert_eq!(keys_of(&store, root), vec![pivot]);
        let left = root_page.leftmost();
        let right = root_page.items()[0].right();
        assert_eq!(keys_of(&store, left), lower);
        assert_eq!(keys_of(&store, right), upper);
        assert!(store.page(right).unwrap().is_leaf());
    }

    #[test]
    fn split_below_median_promotes_lower_median() {
        assert_split(5, 60, &[5, 10, 20, 30, 40, 50], &[70, 80, 90, 100, 110, 120]);
    }

    #[test]
    fn split_at_median_promotes_new_item() {
        assert_split(65, 65, &[10, 20, 30, 40, 50, 60], &[70, 80, 90, 100, 110, 120]);
    }

    #[test]
    fn split_above_median_promotes_upper_median() {
        assert_split(125, 70, &[10, 20, 30, 40, 50, 60], &[80, 90, 100, 110, 120, 125]);
        assert_split(75, 70, &[10, 20, 30, 40, 50, 60], &[75, 80, 90, 100, 110, 120]);
    }

    #[test]
    fn existing_key_accumulates_without_structural_change() {
        let dir = tempdir().unwrap();
        let mut store = PageStore::open(dir.path().join("acc.db"), OpenMode::ReadWrite, 0).unwrap();
        let mut tree = BTree::new(&mut store, SearchStrategy::Bisect);

        tree.insert(0x4000_1000, 3).unwrap();
        assert_eq!(tree.insert(0x4000_1000, 4).unwrap(), InsertOutcome::Accumulated);
        assert!(tree.accumulate(0x4000_1000, 1).unwrap());
        assert!(!tree.accumulate(0x4000_2000, 1).unwrap());

        assert_eq!(tree.get(0x4000_1000).unwrap(), Some(8));
        assert_eq!(tree.get(0x4000_2000).unwrap(), None);
        drop(tree);
        assert_eq!(store.used_pages().unwrap(), 1);
    }

    #[test]
    fn insert_without_split_stops_at_full_leaf() {
        let dir = tempdir().unwrap();
        let mut store = PageStore::open(dir.path().join("nosplit.db"), OpenMode::ReadWrite, 0).unwrap();
        let mut tree = BTree::new(&mut store, SearchStrategy::Linear);

        for k in 1..=MAX_PAGE as Key {
            assert_eq!(
                tree.insert_without_split(k * 10, 1).unwrap(),
                Some(InsertOutcome::Inserted {
                    splits: 0,
                    new_root: false
                })
            );
        }
        assert_eq!(
            tree.insert_without_split(50, 2).unwrap(),
            Some(InsertOutcome::Accumulated)
        );
        assert_eq!(tree.insert_without_split(55, 1).unwrap(), None);

        assert_eq!(tree.get(50).unwrap(), Some(3));
        assert_eq!(tree.get(55).unwrap(), None);
        drop(tree);
        assert_eq!(store.used_pages().unwrap(), 1);
    }

    #[test]
    fn accumulation_saturates() {
        let dir = tempdir().unwrap();
        let mut store = PageStore::open(dir.path().join("sat.db"), OpenMode::ReadWrite, 0).unwrap();
        let mut tree = BTree::new(&mut store, SearchStrategy::Linear);

        tree.insert(1, u32::MAX - 1).unwrap();
        tree.insert(1, 5).unwrap();

        assert_eq!(tree.get(1).unwrap(), Some(u32::MAX));
    }

    #[test]
    fn interior_split_keeps_every_key_reachable() {
        let dir = tempdir().unwrap();
        let mut store =
            PageStore::open_with_capacity(dir.path().join("deep.db"), OpenMode::ReadWrite, 0, Some(1))
                .unwrap();
        let mut tree = BTree::new(&mut store, SearchStrategy::Linear);

        for k in 0..2000u32 {
            tree.insert(k.wrapping_mul(2_654_435_761), k).unwrap();
        }

        for k in 0..2000u32 {
            assert_eq!(tree.get(k.wrapping_mul(2_654_435_761)).unwrap(), Some(k));
        }
        drop(tree);
        let root = store.page(store.root_page().unwrap()).unwrap();
        assert!(!root.is_leaf());
    }

    #[test]
    fn lookup_works_on_shared_store() {
        let dir = tempdir().unwrap();
        let mut store = PageStore::open(dir.path().join("get.db"), OpenMode::ReadWrite, 0).unwrap();
        BTree::new(&mut store, SearchStrategy::Linear).insert(9, 9).unwrap();

        assert_eq!(lookup(&store, SearchStrategy::Bisect, 9).unwrap(), Some(9));
    }
}
