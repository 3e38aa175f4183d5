//! Maps table ids to their backing heap file. Deliberately thin —
//! schema, column types, and query-facing table metadata are out of
//! scope per §1; this is just enough indirection for the buffer pool
//! to find the right `HeapFile` collaborator.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::DbError;
use crate::heap_file::HeapFile;
use crate::types::{DbResult, HandyRwLock};

pub struct Catalog {
    tables: RwLock<HashMap<i32, Arc<dyn HeapFile>>>,
}

impl Catalog {
    pub fn new() -> Self {
        Catalog {
            tables: RwLock::new(HashMap::new()),
        }
    }

    pub fn register(&self, heap_file: Arc<dyn HeapFile>) {
        self.tables.wl().insert(heap_file.table_id(), heap_file);
    }

    pub fn heap_file(&self, table_id: i32) -> DbResult<Arc<dyn HeapFile>> {
        self.tables
            .rl()
            .get(&table_id)
            .cloned()
            .ok_or_else(|| DbError::internal(format!("no table registered with id {}", table_id)))
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}
