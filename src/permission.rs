/// Caller-facing intent for a page access. Maps 1:1 onto the internal
/// lock mode, named separately because callers think in terms of
/// "how am I going to use this page" rather than lock vocabulary,
/// mirroring the `Permission` / `Lock` split in the teacher's
/// `concurrent_status` module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Shared,
    Exclusive,
}

/// The lock mode actually tracked by the lock table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockMode {
    Shared,
    Exclusive,
}

impl Permission {
    pub fn lock_mode(&self) -> LockMode {
        match self {
            Permission::Shared => LockMode::Shared,
            Permission::Exclusive => LockMode::Exclusive,
        }
    }
}

impl LockMode {
    /// `true` if holding `self` already satisfies a request for `other`
    /// at the same or weaker mode (reentrant-acquire short circuit).
    pub fn satisfies(&self, requested: LockMode) -> bool {
        match (self, requested) {
            (LockMode::Exclusive, _) => true,
            (LockMode::Shared, LockMode::Shared) => true,
            (LockMode::Shared, LockMode::Exclusive) => false,
        }
    }
}
