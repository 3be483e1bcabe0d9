mod answer;
mod codes;
mod leaderboard;
mod participant;
mod session;

pub use leaderboard::compute_leaderboard;

use std::future::Future;
use std::sync::Arc;

use crate::auth::IdentityResolver;
use crate::broadcast::Broadcaster;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::protocol::ServerMessage;
use crate::quiz::QuizDirectory;
use crate::store::{Mutation, SessionStore};
use crate::types::{Session, SessionId};

/// The session engine: every join/leave/start/stop/submit goes through
/// here. Mutations are delegated to the store as single atomic conditional
/// updates, and committed state fans out through the injected broadcaster.
pub struct SessionEngine {
    store: Arc<dyn SessionStore>,
    quizzes: Arc<dyn QuizDirectory>,
    broadcaster: Arc<dyn Broadcaster>,
    config: EngineConfig,
}

impl SessionEngine {
    pub fn new(
        store: Arc<dyn SessionStore>,
        quizzes: Arc<dyn QuizDirectory>,
        broadcaster: Arc<dyn Broadcaster>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            quizzes,
            broadcaster,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn broadcaster(&self) -> &Arc<dyn Broadcaster> {
        &self.broadcaster
    }

    /// Run one store operation under the configured deadline. A timeout is
    /// reported as its own error kind so callers can retry; every engine
    /// operation is idempotent or uniqueness-guarded, which makes that safe.
    pub(crate) async fn with_deadline<T>(
        &self,
        fut: impl Future<Output = EngineResult<T>>,
    ) -> EngineResult<T> {
        match tokio::time::timeout(self.config.storage_timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("storage operation exceeded its deadline");
                Err(EngineError::StorageTimeout)
            }
        }
    }

    /// Read one session by id
    pub async fn session(&self, id: &SessionId) -> EngineResult<Session> {
        self.with_deadline(self.store.get(id)).await
    }

    /// Look up an active session by its join code
    pub async fn session_by_code(&self, code: crate::types::GameCode) -> EngineResult<Session> {
        self.with_deadline(self.store.find_by_code(code)).await
    }

    /// Apply one atomic conditional update and return the committed state
    pub(crate) async fn commit(
        &self,
        id: &SessionId,
        mutation: Mutation,
    ) -> EngineResult<Session> {
        self.with_deadline(self.store.update(id, mutation)).await
    }

    /// Fan a committed state change out to everyone in the room
    pub(crate) async fn publish(&self, routing_key: &str, message: ServerMessage) {
        self.broadcaster.publish(routing_key, message).await;
    }
}

/// Shared application state handed to the transport layer
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SessionEngine>,
    pub identities: Arc<dyn IdentityResolver>,
}

impl AppState {
    pub fn new(
        engine: Arc<SessionEngine>,
        identities: Arc<dyn IdentityResolver>,
    ) -> Self {
        Self { engine, identities }
    }
}
