//! Shared test scaffolding. Not a test binary itself (lives in a
//! subdirectory of `tests/`, so Cargo only picks it up via the explicit
//! `mod test_support;` each integration test file declares) — mirrors
//! the teacher's `tests/test_utils` split between test binaries and
//! shared setup.

use std::sync::Once;

use small_db_core::catalog::Catalog;
use small_db_core::heap_file::SimpleHeapFile;
use small_db_core::page;
use small_db_core::{BufferPool, BufferPoolConfig};
use std::sync::Arc;

static INIT: Once = Once::new();

/// Install the logger once per process. Integration test binaries each
/// run in their own process, but within one binary several `#[test]`
/// functions share it, same as the teacher's per-binary `setup()`.
pub fn init_log() {
    INIT.call_once(small_db_core::log::init);
}

/// A fresh buffer pool over one in-memory table, sized to `num_pages`
/// pages of `page_size` bytes each. Returns the heap file handle too,
/// so tests can seed pages directly (`write_page`) without going
/// through `insert_tuple` when a scenario just needs *some* bytes at a
/// known `PageId`.
pub fn fresh_pool(num_pages: usize, page_size: usize) -> (Arc<BufferPool>, Arc<SimpleHeapFile>, i32) {
    init_log();
    let table_id = 10;
    let heap_file = Arc::new(SimpleHeapFile::new_in_memory(table_id, page_size));
    let catalog = Arc::new(Catalog::new());
    catalog.register(heap_file.clone());
    let pool = Arc::new(BufferPool::new(
        BufferPoolConfig { num_pages, page_size },
        catalog,
    ));
    (pool, heap_file, table_id)
}

/// `fresh_pool` at the global default page size.
pub fn fresh_pool_default(num_pages: usize) -> (Arc<BufferPool>, Arc<SimpleHeapFile>, i32) {
    fresh_pool(num_pages, page::DEFAULT_PAGE_SIZE)
}

/// Materialize a zero-filled page at `pid` directly in `heap_file`, so
/// a subsequent `get_page` sees a real (if empty) page instead of
/// erroring on a read past the end of the backing store.
pub fn seed_zero_page(heap_file: &SimpleHeapFile, pid: small_db_core::PageId, page_size: usize) {
    use small_db_core::heap_file::HeapFile;
    use small_db_core::Page;
    heap_file.write_page(&Page::new(pid, vec![0u8; page_size])).unwrap();
}
