use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::DbError;

/// A shared, interior-mutable handle. Not a new type (so the underlying
/// `Arc<RwLock<T>>` methods stay usable directly), matching the teacher's
/// `Pod<T>` alias.
pub type Pod<T> = Arc<RwLock<T>>;

pub type DbResult<T> = Result<T, DbError>;

/// Shorthand for results that carry no payload on success.
pub type EmptyResult = Result<(), DbError>;

/// Shortcut to replace the `RwLock` `.write().unwrap()` / `.read().unwrap()`
/// pattern, copied in spirit from the teacher's `utils::HandyRwLock`
/// (itself credited there to tikv). A poisoned lock means some other
/// thread already panicked while holding it and left shared bookkeeping
/// (the cache map, the lock table) in an inconsistent state, so unwrapping
/// here is deliberate: there is nothing sound to do but propagate.
pub trait HandyRwLock<T: ?Sized> {
    fn wl(&self) -> RwLockWriteGuard<'_, T>;
    fn rl(&self) -> RwLockReadGuard<'_, T>;
}

impl<T: ?Sized> HandyRwLock<T> for RwLock<T> {
    fn wl(&self) -> RwLockWriteGuard<'_, T> {
        self.write().unwrap()
    }

    fn rl(&self) -> RwLockReadGuard<'_, T> {
        self.read().unwrap()
    }
}
