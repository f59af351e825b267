use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::PlatformError;
use crate::models::{Membership, Organization, User};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IsolationLevel {
    /// Reads see committed data plus the transaction's own writes.
    #[default]
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

/// Opens and finishes transactions.
#[async_trait]
pub trait Database: Send + Sync {
    async fn begin(&self, isolation: IsolationLevel) -> Result<TxContext, PlatformError>;

    async fn commit(&self, tx: &TxContext) -> Result<(), PlatformError>;

    async fn rollback(&self, tx: &TxContext) -> Result<(), PlatformError>;
}

/// A row write buffered inside a transaction. Deletes are soft, so every
/// write is an upsert.
#[derive(Debug, Clone)]
pub(crate) enum StagedWrite {
    Organization(Organization),
    User(User),
    Membership(Membership),
}

#[derive(Debug, Default)]
struct TxState {
    writes: Vec<StagedWrite>,
    finished: bool,
}

/// Handle to one open transaction, shared by every repository bound to it.
///
/// Cloning shares the same transaction. Once finished, staging more writes
/// fails with [`PlatformError::TransactionFinished`].
#[derive(Debug, Clone)]
pub struct TxContext {
    id: Uuid,
    isolation: IsolationLevel,
    state: Arc<Mutex<TxState>>,
}

impl TxContext {
    pub fn new(isolation: IsolationLevel) -> Self {
        Self {
            id: Uuid::new_v4(),
            isolation,
            state: Arc::new(Mutex::new(TxState::default())),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn isolation(&self) -> IsolationLevel {
        self.isolation
    }

    pub fn is_finished(&self) -> bool {
        self.state.lock().map(|s| s.finished).unwrap_or(true)
    }

    /// Discard staged writes and mark the transaction finished. Returns
    /// whether the transaction was still open.
    pub fn abort(&self) -> bool {
        match self.state.lock() {
            Ok(mut state) => {
                let was_open = !state.finished;
                state.finished = true;
                state.writes.clear();
                was_open
            }
            // A poisoned state can never be committed either.
            Err(_) => false,
        }
    }

    pub fn pending_writes(&self) -> usize {
        self.state.lock().map(|s| s.writes.len()).unwrap_or(0)
    }

    pub(crate) fn stage(&self, write: StagedWrite) -> Result<(), PlatformError> {
        let mut state = self.state.lock().map_err(|_| PlatformError::Poisoned)?;
        if state.finished {
            return Err(PlatformError::TransactionFinished(self.id));
        }
        state.writes.push(write);
        Ok(())
    }

    pub(crate) fn staged(&self) -> Result<Vec<StagedWrite>, PlatformError> {
        let state = self.state.lock().map_err(|_| PlatformError::Poisoned)?;
        if state.finished {
            return Err(PlatformError::TransactionFinished(self.id));
        }
        Ok(state.writes.clone())
    }

    /// Take the staged writes and mark the transaction finished.
    pub(crate) fn finish(&self) -> Result<Vec<StagedWrite>, PlatformError> {
        let mut state = self.state.lock().map_err(|_| PlatformError::Poisoned)?;
        if state.finished {
            return Err(PlatformError::TransactionFinished(self.id));
        }
        state.finished = true;
        Ok(std::mem::take(&mut state.writes))
    }
}
