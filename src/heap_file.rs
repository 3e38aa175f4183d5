//! The heap file is an external collaborator per the scope note in spec
//! §1: on-disk layout, tuple encoding, and the catalog are deliberately
//! out of scope for the core. This module still needs *something*
//! concrete to exercise the buffer pool and lock manager against, so it
//! provides the minimal `HeapFile` contract from §6 plus one faithful,
//! slot-bitmap implementation of it (grounded in the teacher's
//! `HeapPage` header-bit logic), backed by either memory or a real file.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Mutex;

use bit_vec::BitVec;
use log::debug;

use crate::error::DbError;
use crate::page::Page;
use crate::page_id::PageId;
use crate::permission::Permission;
use crate::transaction_id::TransactionId;
use crate::types::DbResult;

/// Fixed payload size of a tuple. Real tuple encoding (typed fields,
/// variable length) is out of scope per §1; a fixed-size record keeps
/// the slot directory math simple while still exercising real
/// allocate/free/scan behavior.
pub const RECORD_SIZE: usize = 64;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tuple(pub Vec<u8>);

impl Tuple {
    /// Pads or truncates `bytes` to `RECORD_SIZE`.
    pub fn new(mut bytes: Vec<u8>) -> Self {
        bytes.resize(RECORD_SIZE, 0);
        Tuple(bytes)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RecordId {
    pub page_id: PageId,
    pub slot: u32,
}

/// A page-addressable source/sink of page bytes, and the operations
/// that mutate it. Consumed by the buffer pool; never constructed by
/// it.
pub trait HeapFile: Send + Sync {
    fn table_id(&self) -> i32;

    /// Number of pages currently allocated (`ceil(file_length /
    /// page_size)` for a disk-backed file, per §6's on-disk layout).
    fn num_pages(&self) -> usize;

    fn read_page(&self, pid: PageId, page_size: usize) -> DbResult<Page>;

    fn write_page(&self, page: &Page) -> DbResult<()>;

    /// Insert `tuple`, acquiring page locks through `source` (so 2PL is
    /// enforced transitively through `get_page`, per §4.F). Returns the
    /// set of pages the insert dirtied.
    fn insert_tuple(
        &self,
        tid: TransactionId,
        tuple: Tuple,
        source: &dyn PageSource,
    ) -> DbResult<HashSet<PageId>>;

    /// Delete the tuple at `rid`, acquiring the page lock through
    /// `source`. Returns the set of pages the delete dirtied (just the
    /// one page, for this fixed-slot layout).
    fn delete_tuple(
        &self,
        tid: TransactionId,
        rid: RecordId,
        source: &dyn PageSource,
    ) -> DbResult<HashSet<PageId>>;
}

/// The callback surface a `HeapFile` uses to go through 2PL instead of
/// touching the cache directly. Implemented by `BufferPool`.
pub trait PageSource {
    fn get_page(&self, tid: TransactionId, pid: PageId, perm: Permission) -> DbResult<Page>;

    /// Replace the cached bytes for `page.id()` with `page`, evicting a
    /// clean victim first if the cache is full and `page.id()` isn't
    /// already resident. Does not touch the dirty flag — callers mark
    /// dirty explicitly once all of a mutation's pages are written
    /// back.
    fn put_page(&self, page: Page) -> DbResult<()>;

    fn page_size(&self) -> usize;
}

fn slot_count(page_size: usize) -> usize {
    // header_bits + slot*8 <= page_size*8, header_bits = ceil(slots/8)
    page_size * 8 / (RECORD_SIZE * 8 + 1)
}

fn header_size(page_size: usize) -> usize {
    (slot_count(page_size) + 7) / 8
}

/// The slot-occupancy bitmap, read out of a page's header bytes, matching
/// the teacher's `BitVec<u32>` header field (`btree::page::BTreeLeafPage`).
fn read_header(page: &Page, page_size: usize) -> BitVec<u32> {
    BitVec::from_bytes(&page.data()[..header_size(page_size)])
}

fn write_header(page: &mut Page, header: &BitVec<u32>) {
    let bytes = header.to_bytes();
    page.data_mut()[..bytes.len()].copy_from_slice(&bytes);
}

fn slot_offset(page_size: usize, slot: usize) -> usize {
    header_size(page_size) + slot * RECORD_SIZE
}

/// Find a free slot in `page`, if any, returning its index.
fn find_free_slot(page: &Page, page_size: usize) -> Option<usize> {
    let header = read_header(page, page_size);
    (0..slot_count(page_size)).find(|&s| !header[s])
}

fn zero_page(pid: PageId, page_size: usize) -> Page {
    Page::new(pid, vec![0u8; page_size])
}

trait Storage: Send + Sync {
    fn len_bytes(&self) -> u64;
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> DbResult<()>;
    fn write_at(&self, offset: u64, buf: &[u8]) -> DbResult<()>;
}

struct MemoryStorage {
    bytes: Mutex<Vec<u8>>,
}

impl MemoryStorage {
    fn new() -> Self {
        MemoryStorage {
            bytes: Mutex::new(Vec::new()),
        }
    }
}

impl Storage for MemoryStorage {
    fn len_bytes(&self) -> u64 {
        self.bytes.lock().unwrap().len() as u64
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> DbResult<()> {
        let data = self.bytes.lock().unwrap();
        let start = offset as usize;
        let end = start + buf.len();
        if end > data.len() {
            return Err(DbError::internal("read past end of heap file"));
        }
        buf.copy_from_slice(&data[start..end]);
        Ok(())
    }

    fn write_at(&self, offset: u64, buf: &[u8]) -> DbResult<()> {
        let mut data = self.bytes.lock().unwrap();
        let start = offset as usize;
        let end = start + buf.len();
        if end > data.len() {
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(buf);
        Ok(())
    }
}

struct FileStorage {
    file: Mutex<File>,
}

impl FileStorage {
    fn open(path: &Path) -> DbResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        Ok(FileStorage {
            file: Mutex::new(file),
        })
    }
}

impl Storage for FileStorage {
    fn len_bytes(&self) -> u64 {
        self.file.lock().unwrap().metadata().map(|m| m.len()).unwrap_or(0)
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> DbResult<()> {
        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(buf)?;
        Ok(())
    }

    fn write_at(&self, offset: u64, buf: &[u8]) -> DbResult<()> {
        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(buf)?;
        file.sync_data()?;
        Ok(())
    }
}

/// A `HeapFile` over a slot-bitmap page layout: each page starts with a
/// `ceil(slots/8)`-byte bitmap header, followed by fixed-size record
/// slots, matching the teacher's `HeapPage` header/slot arithmetic.
pub struct SimpleHeapFile {
    table_id: i32,
    page_size: usize,
    storage: Box<dyn Storage>,
}

impl SimpleHeapFile {
    pub fn new_in_memory(table_id: i32, page_size: usize) -> Self {
        SimpleHeapFile {
            table_id,
            page_size,
            storage: Box::new(MemoryStorage::new()),
        }
    }

    pub fn new_on_disk(table_id: i32, page_size: usize, path: &Path) -> DbResult<Self> {
        Ok(SimpleHeapFile {
            table_id,
            page_size,
            storage: Box::new(FileStorage::open(path)?),
        })
    }

    fn append_zero_page(&self) -> DbResult<PageId> {
        let page_number = self.num_pages() as u32;
        let pid = PageId::new(self.table_id, page_number);
        self.storage
            .write_at(page_number as u64 * self.page_size as u64, &vec![0u8; self.page_size])?;
        Ok(pid)
    }
}

impl HeapFile for SimpleHeapFile {
    fn table_id(&self) -> i32 {
        self.table_id
    }

    fn num_pages(&self) -> usize {
        (self.storage.len_bytes() as usize + self.page_size - 1) / self.page_size
    }

    fn read_page(&self, pid: PageId, page_size: usize) -> DbResult<Page> {
        let mut buf = vec![0u8; page_size];
        self.storage
            .read_at(pid.page_number as u64 * page_size as u64, &mut buf)?;
        Ok(Page::new(pid, buf))
    }

    fn write_page(&self, page: &Page) -> DbResult<()> {
        self.storage
            .write_at(page.id().page_number as u64 * self.page_size as u64, page.data())
    }

    fn insert_tuple(
        &self,
        tid: TransactionId,
        tuple: Tuple,
        source: &dyn PageSource,
    ) -> DbResult<HashSet<PageId>> {
        let page_size = self.page_size;

        for page_number in 0..self.num_pages() as u32 {
            let pid = PageId::new(self.table_id, page_number);
            let mut page = source.get_page(tid, pid, Permission::Exclusive)?;
            if let Some(slot) = find_free_slot(&page, page_size) {
                write_slot(&mut page, page_size, slot, &tuple.0);
                source.put_page(page)?;
                let mut touched = HashSet::new();
                touched.insert(pid);
                return Ok(touched);
            }
        }

        // No page had room: append a fresh zero-initialized page directly
        // to the heap file (outside the lock/cache path, matching §6:
        // "appends a fresh page via a zero-initialized write"), then pull
        // it through `get_page` like any other page so 2PL and the cache
        // see it consistently.
        let pid = self.append_zero_page()?;
        let mut page = source.get_page(tid, pid, Permission::Exclusive)?;
        let slot = find_free_slot(&page, page_size)
            .ok_or_else(|| DbError::internal("fresh page has no free slot"))?;
        write_slot(&mut page, page_size, slot, &tuple.0);
        source.put_page(page)?;
        debug!("appended page {:?} for insert", pid);

        let mut touched = HashSet::new();
        touched.insert(pid);
        Ok(touched)
    }

    fn delete_tuple(
        &self,
        tid: TransactionId,
        rid: RecordId,
        source: &dyn PageSource,
    ) -> DbResult<HashSet<PageId>> {
        let page_size = self.page_size;
        let mut page = source.get_page(tid, rid.page_id, Permission::Exclusive)?;
        let mut header = read_header(&page, page_size);
        header.set(rid.slot as usize, false);
        write_header(&mut page, &header);
        source.put_page(page)?;

        let mut touched = HashSet::new();
        touched.insert(rid.page_id);
        Ok(touched)
    }
}

fn write_slot(page: &mut Page, page_size: usize, slot: usize, bytes: &[u8]) {
    let mut header = read_header(page, page_size);
    header.set(slot, true);
    write_header(page, &header);
    let offset = slot_offset(page_size, slot);
    page.data_mut()[offset..offset + RECORD_SIZE].copy_from_slice(bytes);
}

/// Read the tuple bytes out of `slot` of `page`, if allocated.
pub fn read_slot(page: &Page, page_size: usize, slot: usize) -> Option<Tuple> {
    if !read_header(page, page_size)[slot] {
        return None;
    }
    let offset = slot_offset(page_size, slot);
    Some(Tuple(page.data()[offset..offset + RECORD_SIZE].to_vec()))
}
