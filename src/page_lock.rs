//! Per-page shared/exclusive lock with upgrade (§4.C), redesigned per
//! §9 as a single monitor (`Mutex` + `Condvar`) instead of the
//! teacher's polling `request_latch` loop (`concurrent_status.rs`,
//! `TIMEOUT` + `sleep(10ms)`). The condition is checked under the
//! mutex and blocking waiters are woken by `release`/`downgrade`
//! rather than spun on.

use std::collections::HashSet;
use std::sync::{Condvar, Mutex};

use crate::error::DbError;
use crate::transaction_id::TransactionId;
use crate::types::DbResult;

struct State {
    readers: HashSet<TransactionId>,
    writer: Option<TransactionId>,
}

pub struct PageLock {
    state: Mutex<State>,
    cv: Condvar,
}

impl PageLock {
    pub fn new() -> Self {
        PageLock {
            state: Mutex::new(State {
                readers: HashSet::new(),
                writer: None,
            }),
            cv: Condvar::new(),
        }
    }

    pub fn writer(&self) -> Option<TransactionId> {
        self.state.lock().unwrap().writer
    }

    /// Current readers, excluding `tid` itself — the set of
    /// transactions an exclusive request from `tid` would conflict
    /// with.
    pub fn readers_excluding(&self, tid: TransactionId) -> Vec<TransactionId> {
        self.state
            .lock()
            .unwrap()
            .readers
            .iter()
            .copied()
            .filter(|r| *r != tid)
            .collect()
    }

    fn only_self_reads(state: &State, tid: TransactionId) -> bool {
        state.readers.is_empty() || (state.readers.len() == 1 && state.readers.contains(&tid))
    }

    /// Grant a shared lock to `tid` without blocking, if possible.
    pub fn try_acquire_shared(&self, tid: TransactionId) -> bool {
        let mut s = self.state.lock().unwrap();
        if s.writer.is_none() || s.writer == Some(tid) {
            s.readers.insert(tid);
            true
        } else {
            false
        }
    }

    /// Grant an exclusive lock to `tid` without blocking, if possible.
    pub fn try_acquire_exclusive(&self, tid: TransactionId) -> bool {
        let mut s = self.state.lock().unwrap();
        if (s.writer.is_none() || s.writer == Some(tid)) && Self::only_self_reads(&s, tid) {
            s.readers.remove(&tid);
            s.writer = Some(tid);
            true
        } else {
            false
        }
    }

    /// Upgrade `tid`'s shared lock to exclusive without blocking, if
    /// possible. `Err` if `tid` holds neither mode on this page.
    pub fn try_upgrade(&self, tid: TransactionId) -> DbResult<bool> {
        let mut s = self.state.lock().unwrap();
        if s.writer == Some(tid) {
            return Ok(true);
        }
        if !s.readers.contains(&tid) {
            return Err(DbError::internal("upgrade requested without holding a shared lock"));
        }
        if s.readers.len() == 1 {
            s.readers.remove(&tid);
            s.writer = Some(tid);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Block until `tid` can be added as a reader.
    pub fn acquire_shared_blocking(&self, tid: TransactionId) {
        let mut s = self.state.lock().unwrap();
        while !(s.writer.is_none() || s.writer == Some(tid)) {
            s = self.cv.wait(s).unwrap();
        }
        s.readers.insert(tid);
    }

    /// Block until `tid` can become the sole writer.
    pub fn acquire_exclusive_blocking(&self, tid: TransactionId) {
        let mut s = self.state.lock().unwrap();
        loop {
            if (s.writer.is_none() || s.writer == Some(tid)) && Self::only_self_reads(&s, tid) {
                break;
            }
            s = self.cv.wait(s).unwrap();
        }
        s.readers.remove(&tid);
        s.writer = Some(tid);
    }

    /// Block until `tid`'s shared lock can become exclusive.
    pub fn upgrade_blocking(&self, tid: TransactionId) -> DbResult<()> {
        let mut s = self.state.lock().unwrap();
        if s.writer != Some(tid) && !s.readers.contains(&tid) {
            return Err(DbError::internal("upgrade requested without holding a shared lock"));
        }
        while s.writer != Some(tid) && !(s.readers.len() == 1 && s.readers.contains(&tid)) {
            s = self.cv.wait(s).unwrap();
        }
        if s.writer != Some(tid) {
            s.readers.remove(&tid);
            s.writer = Some(tid);
        }
        Ok(())
    }

    /// Release any hold `tid` has on this page (reader or writer) and
    /// wake everyone blocked on it — they'll recheck their own
    /// condition on wakeup.
    pub fn release(&self, tid: TransactionId) {
        let mut s = self.state.lock().unwrap();
        s.readers.remove(&tid);
        if s.writer == Some(tid) {
            s.writer = None;
        }
        drop(s);
        self.cv.notify_all();
    }
}

impl Default for PageLock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn shared_locks_are_concurrent() {
        let lock = PageLock::new();
        let (a, b) = (TransactionId::new(), TransactionId::new());
        assert!(lock.try_acquire_shared(a));
        assert!(lock.try_acquire_shared(b));
    }

    #[test]
    fn exclusive_excludes_shared() {
        let lock = PageLock::new();
        let (a, b) = (TransactionId::new(), TransactionId::new());
        assert!(lock.try_acquire_exclusive(a));
        assert!(!lock.try_acquire_shared(b));
    }

    #[test]
    fn reentrant_exclusive_is_a_noop() {
        let lock = PageLock::new();
        let a = TransactionId::new();
        assert!(lock.try_acquire_exclusive(a));
        assert!(lock.try_acquire_exclusive(a));
    }

    #[test]
    fn upgrade_fails_with_other_readers_present() {
        let lock = PageLock::new();
        let (a, b) = (TransactionId::new(), TransactionId::new());
        lock.try_acquire_shared(a);
        lock.try_acquire_shared(b);
        assert_eq!(lock.try_upgrade(a).unwrap(), false);
    }

    #[test]
    fn upgrade_succeeds_as_sole_reader() {
        let lock = PageLock::new();
        let a = TransactionId::new();
        lock.try_acquire_shared(a);
        assert_eq!(lock.try_upgrade(a).unwrap(), true);
        assert_eq!(lock.writer(), Some(a));
    }

    #[test]
    fn blocking_exclusive_wakes_on_release() {
        let lock = Arc::new(PageLock::new());
        let (a, b) = (TransactionId::new(), TransactionId::new());
        assert!(lock.try_acquire_exclusive(a));

        let lock2 = lock.clone();
        let handle = thread::spawn(move || {
            lock2.acquire_exclusive_blocking(b);
        });

        thread::sleep(Duration::from_millis(50));
        lock.release(a);
        handle.join().unwrap();
        assert_eq!(lock.writer(), Some(b));
    }
}
