//! The bounded in-memory page cache (§4.A). A plain `HashMap` guarded
//! by a mutex from the caller's side (the buffer pool holds the lock
//! while it consults eviction policy), mirroring the teacher's
//! `PageCache` buffers before it grew `ConcurrentHashMap` sharding.

use std::collections::HashMap;

use itertools::Itertools;

use crate::page::Page;
use crate::page_id::PageId;

pub struct PageCache {
    capacity: usize,
    pages: HashMap<PageId, Page>,
}

impl PageCache {
    pub fn new(capacity: usize) -> Self {
        PageCache {
            capacity,
            pages: HashMap::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.pages.len() >= self.capacity
    }

    pub fn contains(&self, pid: &PageId) -> bool {
        self.pages.contains_key(pid)
    }

    pub fn get(&self, pid: &PageId) -> Option<&Page> {
        self.pages.get(pid)
    }

    pub fn get_mut(&mut self, pid: &PageId) -> Option<&mut Page> {
        self.pages.get_mut(pid)
    }

    /// Insert or replace `page`. Does not enforce capacity — callers
    /// must run eviction first when `is_full()` and the page is new.
    pub fn put(&mut self, page: Page) {
        self.pages.insert(page.id(), page);
    }

    pub fn remove(&mut self, pid: &PageId) -> Option<Page> {
        self.pages.remove(pid)
    }

    /// Page ids currently resident, in an unspecified but stable order
    /// for the duration of the borrow — used by the eviction scan.
    pub fn keys(&self) -> impl Iterator<Item = &PageId> {
        self.pages.keys()
    }

    /// A point-in-time, deterministically ordered copy of the resident
    /// page ids (sorted by `PageId`'s `(table_id, page_number)` order),
    /// per §4.A. Unlike `keys`, this detaches from the cache's borrow —
    /// callers that need to act on a consistent id list while the cache
    /// may change underneath them (e.g. test assertions, `flush_all_pages`
    /// iterating while each `flush_page` briefly re-locks the cache) want
    /// this instead of the live iterator.
    pub fn snapshot_keys(&self) -> Vec<PageId> {
        self.pages.keys().copied().sorted().collect()
    }

    pub fn values(&self) -> impl Iterator<Item = &Page> {
        self.pages.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page_id::PageId;

    fn pid(n: u32) -> PageId {
        PageId::new(1, n)
    }

    #[test]
    fn put_get_remove_roundtrip() {
        let mut cache = PageCache::new(2);
        assert!(!cache.contains(&pid(0)));
        cache.put(Page::new(pid(0), vec![1, 2, 3]));
        assert!(cache.contains(&pid(0)));
        assert_eq!(cache.get(&pid(0)).unwrap().data(), &[1, 2, 3]);
        assert_eq!(cache.remove(&pid(0)).unwrap().data(), &[1, 2, 3]);
        assert!(!cache.contains(&pid(0)));
    }

    #[test]
    fn is_full_tracks_capacity() {
        let mut cache = PageCache::new(1);
        assert!(!cache.is_full());
        cache.put(Page::new(pid(0), vec![]));
        assert!(cache.is_full());
    }

    #[test]
    fn snapshot_keys_is_sorted_regardless_of_insertion_order() {
        let mut cache = PageCache::new(3);
        cache.put(Page::new(pid(2), vec![]));
        cache.put(Page::new(pid(0), vec![]));
        cache.put(Page::new(pid(1), vec![]));
        assert_eq!(cache.snapshot_keys(), vec![pid(0), pid(1), pid(2)]);
    }
}
