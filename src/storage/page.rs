//! # Page and Item Layout
//!
//! Every page is a fixed-size B-tree node. Unlike slotted pages, nothing is
//! variable-length: a page is a count, a leftmost child link and an inline
//! array of `MAX_PAGE` items.
//!
//! ## Page Layout (152 bytes with MIN_PAGE = 6)
//!
//! ```text
//! Offset  Size  Field      Description
//! ------  ----  ---------  ----------------------------------------
//! 0       4     count      Number of used item slots (0..=MAX_PAGE)
//! 4       4     leftmost   Child holding keys below items[0].key
//! 8       12×N  items      (right, value, key) triples, ascending by key
//! ```
//!
//! Slots at `count..MAX_PAGE` are vacant: key and value zero, right link nil.
//!
//! ## Zero-Copy Access
//!
//! `Page` and `Item` derive the zerocopy traits and use unaligned
//! little-endian integers, so a `&Page` is read straight out of the mapping.
//! The store additionally keeps every field 4-byte aligned by requiring a
//! header size that is a multiple of `HEADER_ALIGN`.

use zerocopy::little_endian::U32;
use zerocopy::{FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::config::{ITEM_SIZE, MAX_PAGE, NIL_PAGE, PAGE_SIZE};

pub type Key = u32;
pub type Value = u32;

#[repr(C)]
#[derive(
    Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned, PartialEq, Eq,
)]
pub struct Item {
    right: U32,
    value: U32,
    key: U32,
}

const _: () = assert!(std::mem::size_of::<Item>() == ITEM_SIZE);

impl Item {
    pub fn new(key: Key, value: Value) -> Self {
        Self {
            right: U32::new(NIL_PAGE),
            value: U32::new(value),
            key: U32::new(key),
        }
    }

    pub fn vacant() -> Self {
        Self::new(0, 0)
    }

    zerocopy_accessors! {
        right,
        value,
        key,
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct Page {
    count: U32,
    leftmost: U32,
    items: [Item; MAX_PAGE],
}

const _: () = assert!(std::mem::size_of::<Page>() == PAGE_SIZE);

impl Page {
    /// An empty page whose child links are all nil.
    pub fn empty() -> Self {
        let mut page = Self::new_zeroed();
        page.reset(NIL_PAGE);
        page
    }

    /// Clears every slot and sets the leftmost link.
    pub fn reset(&mut self, leftmost: u32) {
        self.count = U32::new(0);
        self.leftmost = U32::new(leftmost);
        self.items = [Item::vacant(); MAX_PAGE];
    }

    zerocopy_accessors! {
        leftmost,
    }

    /// Number of used slots, clamped so a corrupt count can never index past
    /// the item array.
    pub fn len(&self) -> usize {
        (self.count.get() as usize).min(MAX_PAGE)
    }

    /// Raw count as stored, which may exceed `MAX_PAGE` on a corrupt page.
    pub fn raw_count(&self) -> u32 {
        self.count.get()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() >= MAX_PAGE
    }

    pub fn is_leaf(&self) -> bool {
        self.leftmost() == NIL_PAGE
    }

    pub fn items(&self) -> &[Item] {
        &self.items[..self.len()]
    }

    pub fn item_mut(&mut self, index: usize) -> &mut Item {
        &mut self.items[index]
    }

    /// Child to the left of insertion position `pos`: the leftmost link for
    /// position 0, otherwise the right link of the item before it.
    pub fn child_before(&self, pos: usize) -> u32 {
        if pos == 0 {
            self.leftmost()
        } else {
            self.items[pos - 1].right()
        }
    }

    /// Inserts `item` at `pos`, shifting later items up. The page must not be full.
    pub fn insert_at(&mut self, pos: usize, item: Item) {
        let len = self.len();
        debug_assert!(len < MAX_PAGE, "insert_at on a full page");
        debug_assert!(pos <= len);
        self.items.copy_within(pos..len, pos + 1);
        self.items[pos] = item;
        self.count = U32::new(len as u32 + 1);
    }

    /// Replaces the page contents with `items` under a new leftmost link.
    pub fn fill(&mut self, leftmost: u32, items: &[Item]) {
        debug_assert!(items.len() <= MAX_PAGE);
        self.reset(leftmost);
        self.items[..items.len()].copy_from_slice(items);
        self.count = U32::new(items.len() as u32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_with(keys: &[Key]) -> Page {
        let items: Vec<Item> = keys.iter().map(|&k| Item::new(k, 1)).collect();
        let mut page = Page::empty();
        page.fill(NIL_PAGE, &items);
        page
    }

    #[test]
    fn empty_page_has_nil_links() {
        let page = Page::empty();

        assert!(page.is_empty());
        assert!(page.is_leaf());
        assert_eq!(page.child_before(0), NIL_PAGE);
        assert_eq!(page.as_bytes().len(), PAGE_SIZE);
    }

    #[test]
    fn insert_at_shifts_later_items() {
        let mut page = page_with(&[10, 30, 40]);

        page.insert_at(1, Item::new(20, 7));

        let keys: Vec<Key> = page.items().iter().map(|i| i.key()).collect();
        assert_eq!(keys, vec![10, 20, 30, 40]);
        assert_eq!(page.items()[1].value(), 7);
    }

    #[test]
    fn child_before_uses_leftmost_then_right_links() {
        let mut page = page_with(&[10, 20]);
        page.set_leftmost(3);
        page.item_mut(0).set_right(4);
        page.item_mut(1).set_right(5);

        assert_eq!(page.child_before(0), 3);
        assert_eq!(page.child_before(1), 4);
        assert_eq!(page.child_before(2), 5);
        assert!(!page.is_leaf());
    }

    #[test]
    fn corrupt_count_is_clamped() {
        let mut bytes = Page::empty().as_bytes().to_vec();
        bytes[..4].copy_from_slice(&1000u32.to_le_bytes());

        let page = Page::ref_from_bytes(&bytes).unwrap();

        assert_eq!(page.raw_count(), 1000);
        assert_eq!(page.len(), MAX_PAGE);
    }

    #[test]
    fn fields_are_little_endian_on_disk() {
        let item = Item::new(0x0102_0304, 0x0A0B_0C0D);
        let bytes = item.as_bytes();

        assert_eq!(&bytes[0..4], &NIL_PAGE.to_le_bytes());
        assert_eq!(&bytes[4..8], &[0x0D, 0x0C, 0x0B, 0x0A]);
        assert_eq!(&bytes[8..12], &[0x04, 0x03, 0x02, 0x01]);
    }
}
