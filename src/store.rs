//! Durable session record with atomic conditional updates
//!
//! Every mutation of a session goes through [`SessionStore::update`]: the
//! caller hands over a closure that checks its preconditions and applies
//! its changes in one step, and the store runs it while holding the write
//! lock. The mutation is applied to a scratch copy and only committed on
//! `Ok`, so a failed precondition leaves no observable intermediate state.
//! This is what makes concurrent join/submit/leave safe - there is never a
//! read-then-write split across two store calls.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::{EngineError, EngineResult};
use crate::types::{GameCode, Session, SessionId, SessionStatus};

/// A predicate-guarded mutation of one session. Returning `Err` aborts the
/// whole update and the error is reported to the caller unchanged.
pub type Mutation = Box<dyn FnOnce(&mut Session) -> EngineResult<()> + Send>;

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a new session, atomically reserving its game code and routing
    /// key against all non-finished sessions. Fails with
    /// [`EngineError::CodeCollision`] if either is already taken.
    async fn create(&self, session: Session) -> EngineResult<Session>;

    async fn get(&self, id: &SessionId) -> EngineResult<Session>;

    /// Look up an active (non-finished) session by its join code
    async fn find_by_code(&self, code: GameCode) -> EngineResult<Session>;

    /// Apply one atomic conditional update and return the committed state
    async fn update(&self, id: &SessionId, mutation: Mutation) -> EngineResult<Session>;
}

#[derive(Default)]
struct Inner {
    sessions: HashMap<SessionId, Session>,
    /// Reservations, scoped to non-finished sessions
    active_codes: HashMap<GameCode, SessionId>,
    active_keys: HashMap<String, SessionId>,
}

/// In-memory store. All state sits behind one `RwLock`, so the reservation
/// indexes can never drift from the session map.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create(&self, session: Session) -> EngineResult<Session> {
        let mut inner = self.inner.write().await;

        if inner.active_codes.contains_key(&session.game_code)
            || inner.active_keys.contains_key(&session.routing_key)
        {
            return Err(EngineError::CodeCollision);
        }

        inner
            .active_codes
            .insert(session.game_code, session.id.clone());
        inner
            .active_keys
            .insert(session.routing_key.clone(), session.id.clone());
        inner.sessions.insert(session.id.clone(), session.clone());

        Ok(session)
    }

    async fn get(&self, id: &SessionId) -> EngineResult<Session> {
        self.inner
            .read()
            .await
            .sessions
            .get(id)
            .cloned()
            .ok_or(EngineError::SessionNotFound)
    }

    async fn find_by_code(&self, code: GameCode) -> EngineResult<Session> {
        let inner = self.inner.read().await;
        let id = inner
            .active_codes
            .get(&code)
            .ok_or(EngineError::SessionNotFound)?;
        inner
            .sessions
            .get(id)
            .cloned()
            .ok_or(EngineError::SessionNotFound)
    }

    async fn update(&self, id: &SessionId, mutation: Mutation) -> EngineResult<Session> {
        let mut inner = self.inner.write().await;

        let current = inner
            .sessions
            .get(id)
            .ok_or(EngineError::SessionNotFound)?;
        let previous_status = current.status;

        // Mutate a scratch copy so a rejected precondition commits nothing
        let mut candidate = current.clone();
        mutation(&mut candidate)?;

        // A session that just finished gives its code and key back to the
        // active space
        if candidate.status == SessionStatus::Finished
            && previous_status != SessionStatus::Finished
        {
            inner.active_codes.remove(&candidate.game_code);
            inner.active_keys.remove(&candidate.routing_key);
        }

        inner.sessions.insert(id.clone(), candidate.clone());
        Ok(candidate)
    }
}
