//! Process-wide wiring of the catalog and buffer pool, grounded in the
//! teacher's `Database::global()` singleton (`common/database.rs`),
//! swapping its raw-pointer-plus-`Once` implementation for
//! `once_cell::sync::OnceCell`, which gives the same one-time lazy
//! init without `unsafe`.

use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::buffer_pool::{BufferPool, BufferPoolConfig};
use crate::catalog::Catalog;

static INSTANCE: OnceCell<Database> = OnceCell::new();

pub struct Database {
    catalog: Arc<Catalog>,
    buffer_pool: Arc<BufferPool>,
}

impl Database {
    fn new(config: BufferPoolConfig) -> Self {
        let catalog = Arc::new(Catalog::new());
        let buffer_pool = Arc::new(BufferPool::new(config, catalog.clone()));
        Database { catalog, buffer_pool }
    }

    /// Initialize the global database with `config`. Only the first
    /// call takes effect; later calls are ignored, so tests and
    /// embedding applications can call this once at startup without
    /// worrying about double-init races.
    pub fn init(config: BufferPoolConfig) {
        let _ = INSTANCE.set(Database::new(config));
    }

    /// The global instance, lazily created with default config if
    /// `init` was never called.
    pub fn global() -> &'static Database {
        INSTANCE.get_or_init(|| Database::new(BufferPoolConfig::default()))
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn buffer_pool(&self) -> &Arc<BufferPool> {
        &self.buffer_pool
    }
}
