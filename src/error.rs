use std::fmt;

use backtrace::Backtrace;

use crate::transaction_id::TransactionId;

/// The three error kinds the core can surface, per the error handling
/// design: a forced transaction termination, an invariant/capacity
/// failure, or an I/O failure bubbled up from the heap file.
#[derive(Debug)]
pub enum DbError {
    /// Raised by the deadlock detector. The caller must invoke
    /// `transaction_complete(tid, false)` to roll back.
    TransactionAborted(TransactionId),

    /// Invariant or capacity failure, e.g. "all pages are dirty" when
    /// eviction has no clean victim to pick.
    Internal(String),

    /// Propagated as-is from the heap file.
    Io(std::io::Error),
}

impl DbError {
    pub fn aborted(tid: TransactionId) -> Self {
        DbError::TransactionAborted(tid)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        DbError::Internal(msg.into())
    }

    /// Print a backtrace to stderr. Kept for parity with the teacher's
    /// `SmallError::show_backtrace`; useful when chasing down a
    /// deadlock-detector false positive interactively.
    pub fn show_backtrace(&self) {
        eprintln!("{}\n{:?}", self, Backtrace::new());
    }
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbError::TransactionAborted(tid) => {
                write!(f, "transaction aborted: {:?}", tid)
            }
            DbError::Internal(msg) => write!(f, "{}", msg),
            DbError::Io(e) => write!(f, "io error: {}", e),
        }
    }
}

impl std::error::Error for DbError {}

impl From<std::io::Error> for DbError {
    fn from(e: std::io::Error) -> Self {
        DbError::Io(e)
    }
}
