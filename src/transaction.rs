//! Transaction lifecycle wrapper (§4.F / §5), grounded in the
//! teacher's `transaction::tx::Transaction` (state machine over
//! `TransactionStatus`, `commit`/`abort` delegating to the buffer
//! pool), simplified to the two terminal states the core actually
//! needs — no separate "aborting" phase, since NO-STEAL + FORCE makes
//! abort a single synchronous step.

use std::sync::Mutex;

use crate::database::Database;
use crate::error::DbError;
use crate::transaction_id::TransactionId;
use crate::types::DbResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    Active,
    Committed,
    Aborted,
}

pub struct Transaction {
    id: TransactionId,
    status: Mutex<TransactionStatus>,
}

impl Transaction {
    pub fn new() -> Self {
        Transaction {
            id: TransactionId::new(),
            status: Mutex::new(TransactionStatus::Active),
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn status(&self) -> TransactionStatus {
        *self.status.lock().unwrap()
    }

    /// FORCE-flush every page this transaction holds and release its
    /// locks.
    pub fn commit(&self) -> DbResult<()> {
        let mut status = self.status.lock().unwrap();
        if *status != TransactionStatus::Active {
            return Err(DbError::internal(format!("{} is not active, cannot commit", self.id)));
        }
        Database::global().buffer_pool().transaction_complete(self.id, true)?;
        *status = TransactionStatus::Committed;
        Ok(())
    }

    /// Discard every page this transaction dirtied and release its
    /// locks. Idempotent once aborted.
    pub fn abort(&self) -> DbResult<()> {
        let mut status = self.status.lock().unwrap();
        if *status == TransactionStatus::Aborted {
            return Ok(());
        }
        Database::global().buffer_pool().transaction_complete(self.id, false)?;
        *status = TransactionStatus::Aborted;
        Ok(())
    }
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}
