//! Session lifecycle: create, start, stop
//!
//! The status machine is strictly waiting -> playing -> finished. Finished
//! is absorbing: the mutation closures in this file and in
//! participant/answer handling all re-check status inside the atomic
//! update, so a session can never move backwards no matter how calls
//! interleave.

use chrono::Utc;

use super::{codes, compute_leaderboard, SessionEngine};
use crate::error::{EngineError, EngineResult};
use crate::protocol::ServerMessage;
use crate::types::{
    QuizId, Session, SessionId, SessionResults, SessionSettings, SessionStatus, UserId,
};

impl SessionEngine {
    /// Open a new waiting session for a quiz. Draws a game code and routing
    /// key at random and reserves both atomically via the store's create;
    /// collisions are retried up to the configured budget.
    pub async fn create_session(
        &self,
        host_id: &UserId,
        quiz_id: &QuizId,
        settings: Option<SessionSettings>,
    ) -> EngineResult<Session> {
        let settings = settings.unwrap_or_default();
        settings.validate().map_err(EngineError::Validation)?;

        if !self.quizzes.quiz_exists(quiz_id).await {
            return Err(EngineError::QuizNotFound);
        }

        let attempts = self.config.max_code_attempts;
        for _ in 0..attempts {
            let session = Session {
                id: ulid::Ulid::new().to_string(),
                quiz_id: quiz_id.clone(),
                host_id: host_id.clone(),
                game_code: codes::random_game_code(),
                routing_key: codes::random_routing_key(),
                status: SessionStatus::Waiting,
                settings: settings.clone(),
                participants: Vec::new(),
                results: SessionResults::default(),
                created_at: Utc::now(),
                started_at: None,
                finished_at: None,
            };

            match self.with_deadline(self.store.create(session)).await {
                Ok(created) => {
                    tracing::info!(
                        session_id = %created.id,
                        game_code = created.game_code,
                        "session created"
                    );
                    self.publish(
                        &created.routing_key,
                        ServerMessage::SessionCreated {
                            game_code: created.game_code,
                            routing_key: created.routing_key.clone(),
                            session: created.clone(),
                        },
                    )
                    .await;
                    return Ok(created);
                }
                Err(EngineError::CodeCollision) => continue,
                Err(e) => return Err(e),
            }
        }

        tracing::error!("game code space exhausted after {attempts} attempts");
        Err(EngineError::ExhaustedSpace(attempts))
    }

    /// Host action: waiting -> playing
    pub async fn start_session(
        &self,
        session_id: &SessionId,
        caller: &UserId,
    ) -> EngineResult<Session> {
        let caller = caller.clone();
        let session = self
            .commit(
                session_id,
                Box::new(move |s| {
                    if s.host_id != caller {
                        return Err(EngineError::NotHost);
                    }
                    match s.status {
                        SessionStatus::Finished => Err(EngineError::SessionClosed),
                        SessionStatus::Playing => Err(EngineError::AlreadyStarted),
                        SessionStatus::Waiting => {
                            s.status = SessionStatus::Playing;
                            s.started_at = Some(Utc::now());
                            Ok(())
                        }
                    }
                }),
            )
            .await?;

        tracing::info!(session_id = %session.id, "session started");
        self.publish(
            &session.routing_key,
            ServerMessage::SessionStarted {
                session: session.clone(),
            },
        )
        .await;
        Ok(session)
    }

    /// Host action: -> finished. Valid from playing and also from waiting
    /// (ending a lobby early), producing an empty leaderboard in that case.
    /// The final recompute happens inside the same atomic update as the
    /// status change.
    pub async fn stop_session(
        &self,
        session_id: &SessionId,
        caller: &UserId,
    ) -> EngineResult<Session> {
        let caller = caller.clone();
        let session = self
            .commit(
                session_id,
                Box::new(move |s| {
                    if s.host_id != caller {
                        return Err(EngineError::NotHost);
                    }
                    if s.status == SessionStatus::Finished {
                        return Err(EngineError::SessionClosed);
                    }
                    s.status = SessionStatus::Finished;
                    s.finished_at = Some(Utc::now());
                    s.results = compute_leaderboard(s);
                    Ok(())
                }),
            )
            .await?;

        tracing::info!(
            session_id = %session.id,
            participants = session.participants.len(),
            "session finished"
        );
        self.publish(
            &session.routing_key,
            ServerMessage::SessionFinished {
                session: session.clone(),
            },
        )
        .await;
        // The room is history now; new sessions may reuse the key
        self.broadcaster.remove_room(&session.routing_key).await;
        Ok(session)
    }
}
