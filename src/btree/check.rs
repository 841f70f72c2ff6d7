//! # Consistency Checker
//!
//! Walks the whole tree and reports every broken invariant as a
//! [`Violation`]. Nothing is repaired. Intended for tests and offline
//! validation, not for the insert path.
//!
//! Checked invariants:
//!
//! - every referenced page is visited at most once (no cycles, no aliasing)
//! - every referenced page index is below the used page count
//! - the in-order walk yields strictly ascending keys
//! - every non-root page holds `MIN_PAGE..=MAX_PAGE` items
//! - all leaves sit at the same depth
//! - no path from the root is longer than `MAX_DESCENT_DEPTH` pages; deeper
//!   links are reported and not followed, so a corrupt chain cannot exhaust
//!   the stack

use std::fmt;

use eyre::Result;
use hashbrown::HashSet;

use crate::config::{MAX_DESCENT_DEPTH, MAX_PAGE, MIN_PAGE, NIL_PAGE};
use crate::storage::{Key, PageStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    PageRevisited { page: u32 },
    PageOutOfRange { page: u32, used_pages: u32 },
    KeysNotAscending { page: u32, previous: Key, key: Key },
    PageOverfull { page: u32, count: u32 },
    PageUnderfull { page: u32, count: usize },
    UnevenLeafDepth { page: u32, depth: usize, expected: usize },
    TreeTooDeep { page: u32, depth: usize },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::PageRevisited { page } => {
                write!(f, "page {} is referenced more than once", page)
            }
            Violation::PageOutOfRange { page, used_pages } => {
                write!(f, "page {} out of range (used_pages={})", page, used_pages)
            }
            Violation::KeysNotAscending {
                page,
                previous,
                key,
            } => write!(
                f,
                "key {:#x} in page {} does not follow {:#x}",
                key, page, previous
            ),
            Violation::PageOverfull { page, count } => {
                write!(f, "page {} holds {} items (max {})", page, count, MAX_PAGE)
            }
            Violation::PageUnderfull { page, count } => {
                write!(f, "page {} holds {} items (min {})", page, count, MIN_PAGE)
            }
            Violation::UnevenLeafDepth {
                page,
                depth,
                expected,
            } => write!(
                f,
                "leaf page {} at depth {}, other leaves at depth {}",
                page, depth, expected
            ),
            Violation::TreeTooDeep { page, depth } => write!(
                f,
                "page {} sits at depth {}, past the {}-level limit",
                page, depth, MAX_DESCENT_DEPTH
            ),
        }
    }
}

pub fn check(store: &PageStore) -> Result<Vec<Violation>> {
    let used_pages = store.used_pages()?.min(store.page_capacity());
    let root = store.root_page()?;

    let mut checker = Checker {
        store,
        root,
        used_pages,
        visited: HashSet::new(),
        previous: None,
        leaf_depth: None,
        violations: Vec::new(),
    };
    checker.visit(root, 0)?;
    Ok(checker.violations)
}

struct Checker<'a> {
    store: &'a PageStore,
    root: u32,
    used_pages: u32,
    visited: HashSet<u32>,
    previous: Option<Key>,
    leaf_depth: Option<usize>,
    violations: Vec<Violation>,
}

impl Checker<'_> {
    fn visit(&mut self, page_no: u32, depth: usize) -> Result<()> {
        if page_no >= self.used_pages {
            self.violations.push(Violation::PageOutOfRange {
                page: page_no,
                used_pages: self.used_pages,
            });
            return Ok(());
        }
        if !self.visited.insert(page_no) {
            self.violations
                .push(Violation::PageRevisited { page: page_no });
            return Ok(());
        }

        let store = self.store;
        let page = store.page(page_no)?;

        let count = page.raw_count();
        if count as usize > MAX_PAGE {
            self.violations.push(Violation::PageOverfull {
                page: page_no,
                count,
            });
        } else if page_no != self.root && page.len() < MIN_PAGE {
            self.violations.push(Violation::PageUnderfull {
                page: page_no,
                count: page.len(),
            });
        }

        if page.is_leaf() {
            match self.leaf_depth {
                None => self.leaf_depth = Some(depth),
                Some(expected) if expected != depth => {
                    self.violations.push(Violation::UnevenLeafDepth {
                        page: page_no,
                        depth,
                        expected,
                    });
                }
                Some(_) => {}
            }
        }

        self.child(page.leftmost(), depth)?;
        for item in page.items() {
            let key = item.key();
            if let Some(previous) = self.previous {
                if key <= previous {
                    self.violations.push(Violation::KeysNotAscending {
                        page: page_no,
                        previous,
                        key,
                    });
                }
            }
            self.previous = Some(key);
            self.child(item.right(), depth)?;
        }
        Ok(())
    }

    fn child(&mut self, link: u32, depth: usize) -> Result<()> {
        if link == NIL_PAGE {
            return Ok(());
        }
        let depth = depth + 1;
        if depth > MAX_DESCENT_DEPTH {
            self.violations.push(Violation::TreeTooDeep { page: link, depth });
            return Ok(());
        }
        self.visit(link, depth)
    }
}
