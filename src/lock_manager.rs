//! Per-transaction lock bookkeeping and deadlock avoidance (§4.E),
//! grounded in the teacher's `ConcurrentStatus` (its `hold_pages` /
//! `s_latch_map` / `x_latch_map` tables, minus the polling loop) wired
//! to the `WaitForGraph` cycle search from `wait_for_graph.rs`.
//!
//! A request that would block first asks "would waiting on this
//! holder close a cycle back to me?" under the single `tree_latch`
//! mutex that also guards the wait-for graph; if so, the *requester*
//! is aborted and never blocks at all, so the graph itself never holds
//! a real cycle. Only once that check passes does the transaction
//! drop the mutex and block on the page's own condvar — so a slow
//! waiter never holds up unrelated lock decisions on other pages.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use log::{debug, warn};

use crate::error::DbError;
use crate::page_id::PageId;
use crate::page_lock::PageLock;
use crate::permission::{LockMode, Permission};
use crate::transaction_id::TransactionId;
use crate::types::DbResult;
use crate::wait_for_graph::WaitForGraph;

struct Inner {
    page_locks: HashMap<PageId, Arc<PageLock>>,
    held: HashMap<TransactionId, HashMap<PageId, LockMode>>,
    wait_for: WaitForGraph,
}

pub struct LockManager {
    inner: Mutex<Inner>,
}

impl LockManager {
    pub fn new() -> Self {
        LockManager {
            inner: Mutex::new(Inner {
                page_locks: HashMap::new(),
                held: HashMap::new(),
                wait_for: WaitForGraph::new(),
            }),
        }
    }

    fn page_lock_for(&self, pid: PageId) -> Arc<PageLock> {
        self.inner
            .lock()
            .unwrap()
            .page_locks
            .entry(pid)
            .or_insert_with(|| Arc::new(PageLock::new()))
            .clone()
    }

    fn record(&self, tid: TransactionId, pid: PageId, mode: LockMode) {
        self.inner
            .lock()
            .unwrap()
            .held
            .entry(tid)
            .or_insert_with(HashMap::new)
            .insert(pid, mode);
    }

    /// `Some(mode)` already held by `tid` on `pid`, without blocking.
    pub fn holds(&self, tid: TransactionId, pid: PageId) -> Option<LockMode> {
        self.inner.lock().unwrap().held.get(&tid).and_then(|m| m.get(&pid).copied())
    }

    pub fn locks_held_by(&self, tid: TransactionId) -> HashSet<PageId> {
        self.inner
            .lock()
            .unwrap()
            .held
            .get(&tid)
            .map(|m| m.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Acquire `perm` on `pid` for `tid`, blocking if necessary.
    /// Reentrant: a transaction that already holds a mode satisfying
    /// the request returns immediately.
    pub fn acquire(&self, tid: TransactionId, pid: PageId, perm: Permission) -> DbResult<()> {
        let requested = perm.lock_mode();
        if let Some(mode) = self.holds(tid, pid) {
            if mode.satisfies(requested) {
                return Ok(());
            }
            debug_assert_eq!(mode, LockMode::Shared, "exclusive already satisfies anything");
            let page_lock = self.page_lock_for(pid);
            return self.upgrade(tid, pid, &page_lock);
        }

        let page_lock = self.page_lock_for(pid);
        match requested {
            LockMode::Shared => self.acquire_shared(tid, pid, &page_lock),
            LockMode::Exclusive => self.acquire_exclusive(tid, pid, &page_lock),
        }
    }

    fn check_and_wait_on(&self, tid: TransactionId, blockers: &[TransactionId]) -> DbResult<()> {
        let mut inner = self.inner.lock().unwrap();
        for &holder in blockers {
            if inner.wait_for.would_cycle(tid, holder) {
                for &added in blockers {
                    inner.wait_for.remove_edge(tid, added);
                }
                warn!("{} aborted: granting its request would close a wait-for cycle", tid);
                return Err(DbError::aborted(tid));
            }
        }
        for &holder in blockers {
            inner.wait_for.add_edge(tid, holder);
        }
        Ok(())
    }

    fn clear_wait(&self, tid: TransactionId) {
        self.inner.lock().unwrap().wait_for.remove_waiter(tid);
    }

    fn acquire_shared(&self, tid: TransactionId, pid: PageId, page_lock: &Arc<PageLock>) -> DbResult<()> {
        if page_lock.try_acquire_shared(tid) {
            self.record(tid, pid, LockMode::Shared);
            return Ok(());
        }
        let holder = page_lock.writer();
        if let Some(holder) = holder {
            self.check_and_wait_on(tid, &[holder])?;
        }
        debug!("{} blocking for shared lock on {}", tid, pid);
        page_lock.acquire_shared_blocking(tid);
        self.clear_wait(tid);
        self.record(tid, pid, LockMode::Shared);
        Ok(())
    }

    fn acquire_exclusive(&self, tid: TransactionId, pid: PageId, page_lock: &Arc<PageLock>) -> DbResult<()> {
        if page_lock.try_acquire_exclusive(tid) {
            self.record(tid, pid, LockMode::Exclusive);
            return Ok(());
        }
        let blockers = match page_lock.writer() {
            Some(w) => vec![w],
            None => page_lock.readers_excluding(tid),
        };
        self.check_and_wait_on(tid, &blockers)?;
        debug!("{} blocking for exclusive lock on {}", tid, pid);
        page_lock.acquire_exclusive_blocking(tid);
        self.clear_wait(tid);
        self.record(tid, pid, LockMode::Exclusive);
        Ok(())
    }

    fn upgrade(&self, tid: TransactionId, pid: PageId, page_lock: &Arc<PageLock>) -> DbResult<()> {
        if page_lock.try_upgrade(tid)? {
            self.record(tid, pid, LockMode::Exclusive);
            return Ok(());
        }
        let blockers = page_lock.readers_excluding(tid);
        self.check_and_wait_on(tid, &blockers)?;
        debug!("{} blocking to upgrade lock on {}", tid, pid);
        page_lock.upgrade_blocking(tid)?;
        self.clear_wait(tid);
        self.record(tid, pid, LockMode::Exclusive);
        Ok(())
    }

    /// Release `tid`'s hold on `pid`, if any.
    pub fn release(&self, tid: TransactionId, pid: PageId) {
        let page_lock = {
            let mut inner = self.inner.lock().unwrap();
            if let Some(m) = inner.held.get_mut(&tid) {
                m.remove(&pid);
            }
            inner.page_locks.get(&pid).cloned()
        };
        if let Some(pl) = page_lock {
            pl.release(tid);
        }
    }

    /// Release every page `tid` holds (end of transaction).
    pub fn release_all(&self, tid: TransactionId) {
        let pages: Vec<PageId> = {
            let mut inner = self.inner.lock().unwrap();
            inner
                .held
                .remove(&tid)
                .map(|m| m.keys().copied().collect())
                .unwrap_or_default()
        };
        for pid in pages {
            let page_lock = self.inner.lock().unwrap().page_locks.get(&pid).cloned();
            if let Some(pl) = page_lock {
                pl.release(tid);
            }
        }
    }
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tid() -> TransactionId {
        TransactionId::new()
    }

    fn pid() -> PageId {
        PageId::new(1, 0)
    }

    #[test]
    fn reentrant_shared_then_shared_is_a_noop() {
        let lm = LockManager::new();
        let t = tid();
        let p = pid();
        lm.acquire(t, p, Permission::Shared).unwrap();
        lm.acquire(t, p, Permission::Shared).unwrap();
        assert_eq!(lm.holds(t, p), Some(LockMode::Shared));
    }

    #[test]
    fn shared_then_exclusive_upgrades_in_place() {
        let lm = LockManager::new();
        let t = tid();
        let p = pid();
        lm.acquire(t, p, Permission::Shared).unwrap();
        lm.acquire(t, p, Permission::Exclusive).unwrap();
        assert_eq!(lm.holds(t, p), Some(LockMode::Exclusive));
    }

    #[test]
    fn release_all_frees_every_page() {
        let lm = LockManager::new();
        let t = tid();
        let p1 = PageId::new(1, 0);
        let p2 = PageId::new(1, 1);
        lm.acquire(t, p1, Permission::Shared).unwrap();
        lm.acquire(t, p2, Permission::Exclusive).unwrap();
        lm.release_all(t);
        assert!(lm.locks_held_by(t).is_empty());

        let other = tid();
        lm.acquire(other, p2, Permission::Exclusive).unwrap();
    }

    #[test]
    fn two_way_wait_aborts_the_requester() {
        let lm = LockManager::new();
        let (a, b) = (tid(), tid());
        let (p1, p2) = (PageId::new(1, 0), PageId::new(1, 1));

        lm.acquire(a, p1, Permission::Exclusive).unwrap();
        lm.acquire(b, p2, Permission::Exclusive).unwrap();

        // a already waits-for nothing; have a's thread logically "wait for" b
        // by manufacturing the edge through a blocked acquire check: b now
        // requests p1 (blocks behind a), then a requests p2 (would close the
        // cycle with b) and must be refused outright instead of blocking.
        lm.inner.lock().unwrap().wait_for.add_edge(b, a);
        let err = lm.acquire(a, p2, Permission::Exclusive);
        assert!(err.is_err());
    }
}
