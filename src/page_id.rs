use std::fmt;

/// Identifies a page within the whole store: which table's heap file it
/// lives in, and its offset within that file. Ordered by
/// `(table_id, page_number)` so cache iteration (eviction scans, test
/// assertions) is deterministic — field declaration order drives the
/// derived `Ord`.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Copy, Clone, Debug)]
pub struct PageId {
    pub table_id: i32,
    pub page_number: u32,
}

impl PageId {
    pub fn new(table_id: i32, page_number: u32) -> Self {
        PageId {
            table_id,
            page_number,
        }
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page({}, {})", self.table_id, self.page_number)
    }
}
