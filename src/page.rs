use std::sync::atomic::{AtomicUsize, Ordering};

use crate::page_id::PageId;
use crate::transaction_id::TransactionId;

pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Global page size, overridable for tests only (grounded in the
/// teacher's `btree::page_cache::{PAGE_SIZE, set_page_size}`). Most
/// callers should size their `BufferPoolConfig` directly rather than
/// reach for this; it exists for tests that want a smaller page to make
/// eviction and split scenarios cheap to set up, and need every
/// component that defaults to `DEFAULT_PAGE_SIZE` to agree on the
/// override without threading it through every call site.
static PAGE_SIZE: AtomicUsize = AtomicUsize::new(DEFAULT_PAGE_SIZE);

/// Current global page size (`DEFAULT_PAGE_SIZE` unless overridden).
pub fn page_size() -> usize {
    PAGE_SIZE.load(Ordering::Relaxed)
}

/// Override the global page size. Test-only — see §6.
#[cfg(test)]
pub fn set_page_size(page_size: usize) {
    PAGE_SIZE.store(page_size, Ordering::Relaxed);
}

/// Restore the global page size to `DEFAULT_PAGE_SIZE`. Tests that call
/// `set_page_size` should call this during teardown so later tests in
/// the same process see the default again.
#[cfg(test)]
pub fn reset_page_size() {
    PAGE_SIZE.store(DEFAULT_PAGE_SIZE, Ordering::Relaxed);
}

/// A fixed-size unit of I/O and locking. The core treats `data` as an
/// opaque byte image — tuple encoding and slot layout are the heap
/// file's business (see `heap_file`), per the scope note in §1.
#[derive(Clone, Debug)]
pub struct Page {
    id: PageId,
    data: Vec<u8>,
    dirtied_by: Option<TransactionId>,
}

impl Page {
    pub fn new(id: PageId, data: Vec<u8>) -> Self {
        Page {
            id,
            data,
            dirtied_by: None,
        }
    }

    pub fn id(&self) -> PageId {
        self.id
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn is_dirty(&self) -> bool {
        self.dirtied_by.is_some()
    }

    pub fn dirtied_by(&self) -> Option<TransactionId> {
        self.dirtied_by
    }

    /// Mark this page as modified by `tid`. Called by the buffer pool
    /// after a mutation, never by `get_page` itself — `get_page` does
    /// not imply dirtiness (see §4.F).
    pub fn mark_dirty(&mut self, tid: TransactionId) {
        self.dirtied_by = Some(tid);
    }

    /// Clear the dirty flag, e.g. after a successful flush to disk.
    pub fn mark_clean(&mut self) {
        self.dirtied_by = None;
    }
}
