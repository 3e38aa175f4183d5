//! The buffer pool orchestrator (§4.F): wires the page cache, eviction
//! policy, and lock manager together behind `get_page`/mutation/
//! transaction-completion entry points. Grounded in the shape of the
//! teacher's `btree::page_cache::PageCache` (`request_lock` before
//! touching buffers, `flush_pages`/`tx_complete`/`discard_page`), with
//! the ConcurrentHashMap sharding replaced by one `Mutex<PageCache>`
//! per the `tree_latch` feature (see `Cargo.toml`).

use std::sync::{Arc, Mutex};

use log::debug;

use crate::cache::PageCache;
use crate::catalog::Catalog;
use crate::eviction;
use crate::heap_file::{HeapFile, PageSource, RecordId, Tuple};
use crate::lock_manager::LockManager;
use crate::page;
use crate::page::Page;
use crate::page_id::PageId;
use crate::permission::Permission;
use crate::transaction_id::TransactionId;
use crate::types::DbResult;

#[derive(Clone, Copy, Debug)]
pub struct BufferPoolConfig {
    pub num_pages: usize,
    pub page_size: usize,
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        BufferPoolConfig {
            num_pages: 50,
            page_size: page::page_size(),
        }
    }
}

pub struct BufferPool {
    config: BufferPoolConfig,
    cache: Mutex<PageCache>,
    lock_manager: LockManager,
    catalog: Arc<Catalog>,
}

impl BufferPool {
    pub fn new(config: BufferPoolConfig, catalog: Arc<Catalog>) -> Self {
        BufferPool {
            cache: Mutex::new(PageCache::new(config.num_pages)),
            config,
            lock_manager: LockManager::new(),
            catalog,
        }
    }

    pub fn config(&self) -> BufferPoolConfig {
        self.config
    }

    /// Fetch `pid` under the given permission, acquiring the matching
    /// page lock first so 2PL covers every access, cached or not.
    pub fn get_page(&self, tid: TransactionId, pid: PageId, perm: Permission) -> DbResult<Page> {
        self.lock_manager.acquire(tid, pid, perm)?;

        if let Some(page) = self.cache.lock().unwrap().get(&pid) {
            return Ok(page.clone());
        }

        let heap_file = self.catalog.heap_file(pid.table_id)?;
        let page = heap_file.read_page(pid, self.config.page_size)?;
        self.insert_into_cache(page.clone())?;
        Ok(page)
    }

    /// Insert or replace a page in the cache, evicting a clean victim
    /// first if the cache is full and the page is new. NO-STEAL: if
    /// every resident page is dirty, this fails rather than evicting
    /// one — the caller propagates that as an aborted transaction.
    fn insert_into_cache(&self, page: Page) -> DbResult<()> {
        let mut cache = self.cache.lock().unwrap();
        if !cache.contains(&page.id()) && cache.is_full() {
            let victim = eviction::pick_victim(&cache)?;
            let evicted = cache.remove(&victim).expect("victim id came from this cache");
            debug!("evicted clean page {} to make room for {}", evicted.id(), page.id());
        }
        cache.put(page);
        Ok(())
    }

    fn mark_dirty(&self, tid: TransactionId, pid: PageId) {
        if let Some(page) = self.cache.lock().unwrap().get_mut(&pid) {
            page.mark_dirty(tid);
        }
    }

    pub fn insert_tuple(&self, tid: TransactionId, table_id: i32, tuple: Tuple) -> DbResult<()> {
        let heap_file = self.catalog.heap_file(table_id)?;
        let dirtied = heap_file.insert_tuple(tid, tuple, self)?;
        for pid in dirtied {
            self.mark_dirty(tid, pid);
        }
        Ok(())
    }

    pub fn delete_tuple(&self, tid: TransactionId, rid: RecordId) -> DbResult<()> {
        let heap_file = self.catalog.heap_file(rid.page_id.table_id)?;
        let dirtied = heap_file.delete_tuple(tid, rid, self)?;
        for pid in dirtied {
            self.mark_dirty(tid, pid);
        }
        Ok(())
    }

    fn flush_page(&self, pid: PageId) -> DbResult<()> {
        let mut cache = self.cache.lock().unwrap();
        if let Some(page) = cache.get_mut(&pid) {
            if page.is_dirty() {
                let heap_file = self.catalog.heap_file(pid.table_id)?;
                heap_file.write_page(page)?;
                page.mark_clean();
            }
        }
        Ok(())
    }

    /// Flush every dirty page in the cache. Idempotent — a page
    /// already clean is skipped.
    pub fn flush_all_pages(&self) -> DbResult<()> {
        let pids = self.cache.lock().unwrap().snapshot_keys();
        for pid in pids {
            self.flush_page(pid)?;
        }
        Ok(())
    }

    /// Drop `pid` from the cache without flushing it, regardless of
    /// dirty state. Bypasses NO-STEAL — callers must know what they're
    /// doing (abort path, or tests asserting on cache misses).
    pub fn discard_page(&self, pid: PageId) {
        self.cache.lock().unwrap().remove(&pid);
    }

    pub fn holds_lock(&self, tid: TransactionId, pid: PageId) -> bool {
        self.lock_manager.holds(tid, pid).is_some()
    }

    /// Release a single page lock early, without ending the
    /// transaction. An explicit escape hatch from strict 2PL — using
    /// it before the transaction completes breaks the serializability
    /// guarantee 2PL exists to provide, so callers must be certain the
    /// page is never touched again this transaction.
    pub fn release_page(&self, tid: TransactionId, pid: PageId) {
        self.lock_manager.release(tid, pid);
    }

    /// End `tid`: on commit, FORCE-flush every page it holds; on
    /// abort, discard every page it dirtied (NO-STEAL means nothing
    /// else could have persisted them). Either way, release every lock
    /// it holds.
    pub fn transaction_complete(&self, tid: TransactionId, commit: bool) -> DbResult<()> {
        let pages = self.lock_manager.locks_held_by(tid);
        if commit {
            for pid in &pages {
                self.flush_page(*pid)?;
            }
        } else {
            let mut cache = self.cache.lock().unwrap();
            for pid in &pages {
                if let Some(page) = cache.get(pid) {
                    if page.dirtied_by() == Some(tid) {
                        cache.remove(pid);
                    }
                }
            }
        }
        self.lock_manager.release_all(tid);
        Ok(())
    }
}

impl PageSource for BufferPool {
    fn get_page(&self, tid: TransactionId, pid: PageId, perm: Permission) -> DbResult<Page> {
        BufferPool::get_page(self, tid, pid, perm)
    }

    fn put_page(&self, page: Page) -> DbResult<()> {
        self.insert_into_cache(page)
    }

    fn page_size(&self) -> usize {
        self.config.page_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap_file::SimpleHeapFile;

    fn pool_with(num_pages: usize, page_size: usize) -> (BufferPool, Arc<Catalog>) {
        let catalog = Arc::new(Catalog::new());
        catalog.register(Arc::new(SimpleHeapFile::new_in_memory(1, page_size)));
        let pool = BufferPool::new(
            BufferPoolConfig {
                num_pages,
                page_size,
            },
            catalog.clone(),
        );
        (pool, catalog)
    }

    #[test]
    fn insert_then_read_back_round_trips() {
        let (pool, _catalog) = pool_with(4, page::DEFAULT_PAGE_SIZE);
        let tid = TransactionId::new();
        pool.insert_tuple(tid, 1, Tuple::new(vec![9u8; 8])).unwrap();
        pool.transaction_complete(tid, true).unwrap();

        let reader = TransactionId::new();
        let page = pool.get_page(reader, PageId::new(1, 0), Permission::Shared).unwrap();
        assert!(!page.is_dirty());
    }

    #[test]
    fn eviction_refuses_when_everything_dirty() {
        let page_size = page::DEFAULT_PAGE_SIZE;
        let catalog = Arc::new(Catalog::new());
        let table1 = Arc::new(SimpleHeapFile::new_in_memory(1, page_size));
        let table2 = Arc::new(SimpleHeapFile::new_in_memory(2, page_size));
        table2
            .write_page(&Page::new(PageId::new(2, 0), vec![0u8; page_size]))
            .unwrap();
        catalog.register(table1);
        catalog.register(table2);
        let pool = BufferPool::new(
            BufferPoolConfig {
                num_pages: 1,
                page_size,
            },
            catalog,
        );

        let tid = TransactionId::new();
        pool.insert_tuple(tid, 1, Tuple::new(vec![1u8; 4])).unwrap();
        assert!(pool.cache.lock().unwrap().contains(&PageId::new(1, 0)));

        // The only cache slot holds a dirty page; NO-STEAL means the
        // miss on table 2's page can't evict it, so the fetch fails
        // instead of silently discarding uncommitted work.
        let err = pool.get_page(tid, PageId::new(2, 0), Permission::Shared);
        assert!(err.is_err());
    }

    #[test]
    fn abort_discards_dirty_pages() {
        let (pool, _catalog) = pool_with(4, page::DEFAULT_PAGE_SIZE);
        let tid = TransactionId::new();
        pool.insert_tuple(tid, 1, Tuple::new(vec![7u8; 8])).unwrap();
        assert!(pool.cache.lock().unwrap().contains(&PageId::new(1, 0)));
        pool.transaction_complete(tid, false).unwrap();
        assert!(!pool.cache.lock().unwrap().contains(&PageId::new(1, 0)));
    }
}
