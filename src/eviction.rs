//! Eviction policy (§4.B): NO-STEAL means a dirty page can never be
//! chosen, so this is a "skip-dirty, first-eligible" scan rather than
//! a real LRU. The teacher's bufferpool carried an explicit LRU
//! ordering for the clean set; this just takes the first clean page it
//! finds, since §4.B makes recency-based tie-breaking optional, not
//! required.

use crate::cache::PageCache;
use crate::error::DbError;
use crate::page_id::PageId;
use crate::types::DbResult;

/// Pick a clean page to evict from `cache`, returning its id. Returns
/// `Err` if every resident page is dirty — the caller (buffer pool)
/// turns this into an aborted transaction rather than ever stealing a
/// dirty page.
pub fn pick_victim(cache: &PageCache) -> DbResult<PageId> {
    cache
        .values()
        .find(|p| !p.is_dirty())
        .map(|p| p.id())
        .ok_or_else(|| DbError::internal("all pages are dirty"))
}
