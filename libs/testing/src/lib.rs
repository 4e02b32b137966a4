//! # fleetcal-testing
//!
//! In-memory [`ScheduleStore`] for tests.
//!
//! [`MemoryStore`] keeps actions in a vector, enforces name uniqueness the way
//! the remote store does, records every call, and can be told to fail the
//! n-th call of an operation with a given [`ErrorCode`].

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use fleetcal_store::{ErrorCode, ScheduleStore, ScheduledAction, StoreError};

/// Store operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Create,
    Delete,
    List,
}

/// A call observed by the store, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Create(String),
    Delete(String),
    List(usize),
}

impl StoreCall {
    fn op(&self) -> StoreOp {
        match self {
            StoreCall::Create(_) => StoreOp::Create,
            StoreCall::Delete(_) => StoreOp::Delete,
            StoreCall::List(_) => StoreOp::List,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Fault {
    op: StoreOp,
    nth: usize,
    code: ErrorCode,
}

#[derive(Debug, Default)]
struct State {
    actions: Vec<ScheduledAction>,
    calls: Vec<StoreCall>,
    faults: Vec<Fault>,
}

/// In-memory store for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `actions`.
    pub fn with_actions(actions: Vec<ScheduledAction>) -> Self {
        Self {
            state: Mutex::new(State {
                actions,
                ..State::default()
            }),
        }
    }

    /// Fail the `nth` (1-based) call of `op` with `code`.
    #[must_use]
    pub fn fail_nth(self, op: StoreOp, nth: usize, code: ErrorCode) -> Self {
        self.lock().faults.push(Fault { op, nth, code });
        self
    }

    /// Actions currently stored.
    pub fn actions(&self) -> Vec<ScheduledAction> {
        self.lock().actions.clone()
    }

    /// Every call received so far.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Records `call` and returns the injected fault for it, if any.
    fn record(state: &mut State, call: StoreCall) -> Result<(), StoreError> {
        let op = call.op();
        state.calls.push(call);
        let nth = state.calls.iter().filter(|c| c.op() == op).count();

        match state.faults.iter().find(|f| f.op == op && f.nth == nth) {
            Some(fault) => Err(StoreError::remote(
                fault.code,
                format!("injected {:?} failure on call {}", op, nth),
            )),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ScheduleStore for MemoryStore {
    async fn create(&self, action: &ScheduledAction) -> Result<(), StoreError> {
        let mut state = self.lock();
        Self::record(&mut state, StoreCall::Create(action.identifier.clone()))?;

        if state
            .actions
            .iter()
            .any(|a| a.identifier == action.identifier)
        {
            return Err(StoreError::remote(
                ErrorCode::AlreadyExists,
                format!("scheduled action '{}' already exists", action.identifier),
            ));
        }

        state.actions.push(action.clone());
        Ok(())
    }

    async fn delete(&self, identifier: &str) -> Result<(), StoreError> {
        let mut state = self.lock();
        Self::record(&mut state, StoreCall::Delete(identifier.to_string()))?;

        let before = state.actions.len();
        state.actions.retain(|a| a.identifier != identifier);
        if state.actions.len() == before {
            return Err(StoreError::remote(
                ErrorCode::Unknown,
                format!("scheduled action '{}' not found", identifier),
            ));
        }
        Ok(())
    }

    async fn list(&self, max_records: usize) -> Result<Vec<ScheduledAction>, StoreError> {
        let mut state = self.lock();
        Self::record(&mut state, StoreCall::List(max_records))?;

        Ok(state.actions.iter().take(max_records).cloned().collect())
    }
}
