//! Tree shape statistics, for diagnostics and the `sampledb stats` command.

use std::fmt;

use eyre::{bail, ensure, Result};
use hashbrown::HashSet;

use crate::config::{MAX_DESCENT_DEPTH, MAX_PAGE, NIL_PAGE};
use crate::storage::PageStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TreeStats {
    pub items: u64,
    pub pages: u32,
    pub leaf_pages: u32,
    pub depth: u32,
    pub page_capacity: u32,
    pub used_pages: u32,
}

impl TreeStats {
    /// Share of item slots in reachable pages that hold an item.
    pub fn fill_ratio(&self) -> f64 {
        if self.pages == 0 {
            return 0.0;
        }
        self.items as f64 / (self.pages as f64 * MAX_PAGE as f64)
    }
}

impl fmt::Display for TreeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "items:         {}", self.items)?;
        writeln!(f, "depth:         {}", self.depth)?;
        writeln!(f, "pages:         {} ({} leaves)", self.pages, self.leaf_pages)?;
        writeln!(f, "used pages:    {}", self.used_pages)?;
        writeln!(f, "page capacity: {}", self.page_capacity)?;
        write!(f, "fill ratio:    {:.1}%", self.fill_ratio() * 100.0)
    }
}

pub fn stats(store: &PageStore) -> Result<TreeStats> {
    let mut stats = TreeStats {
        page_capacity: store.page_capacity(),
        used_pages: store.used_pages()?,
        ..TreeStats::default()
    };

    let mut visited = HashSet::new();
    let mut stack = vec![(store.root_page()?, 1u32)];
    while let Some((page_no, depth)) = stack.pop() {
        if !visited.insert(page_no) {
            bail!("page {} is reached more than once; run check", page_no);
        }
        ensure!(
            (depth as usize) <= MAX_DESCENT_DEPTH,
            "tree deeper than {} levels at page {}; run check",
            MAX_DESCENT_DEPTH,
            page_no
        );

        let page = store.page(page_no)?;
        stats.pages += 1;
        stats.items += page.len() as u64;
        stats.depth = stats.depth.max(depth);

        if page.is_leaf() {
            stats.leaf_pages += 1;
            continue;
        }
        stack.push((page.leftmost(), depth + 1));
        for item in page.items() {
            if item.right() != NIL_PAGE {
                stack.push((item.right(), depth + 1));
            }
        }
    }
    Ok(stats)
}
