//! Participant admission and removal
//!
//! Both operations run as one predicate-guarded store update. The
//! preconditions (joinable status, username uniqueness, capacity) are
//! re-checked inside the atomic closure even though `join` already looked
//! the session up by code - anything can interleave between those two store
//! calls, and only the closure's view is authoritative.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::SessionEngine;
use crate::error::{EngineError, EngineResult};
use crate::protocol::ServerMessage;
use crate::types::{GameCode, Identity, Participant, Session, SessionId, SessionStatus};

const MAX_USERNAME_LEN: usize = 30;

impl SessionEngine {
    /// Admit a participant to the session with this game code. Exactly one
    /// caller wins a contested last slot or username; the loser gets the
    /// specific violated precondition. A registered user retrying a join
    /// they already won gets the current session back instead of a second
    /// participant entry.
    pub async fn join(
        &self,
        game_code: GameCode,
        identity: Identity,
        username: &str,
    ) -> EngineResult<Session> {
        let username = username.trim().to_string();
        if username.is_empty() || username.len() > MAX_USERNAME_LEN {
            return Err(EngineError::Validation(format!(
                "username must be 1-{MAX_USERNAME_LEN} characters"
            )));
        }

        let session = self.session_by_code(game_code).await?;
        let allow_late_join = self.config.allow_late_join;
        let admitted = Arc::new(AtomicBool::new(false));
        let admitted_flag = admitted.clone();

        let session = self
            .commit(
                &session.id,
                Box::new(move |s| {
                    match s.status {
                        SessionStatus::Finished => return Err(EngineError::SessionClosed),
                        SessionStatus::Playing if !allow_late_join => {
                            return Err(EngineError::SessionNotJoinable)
                        }
                        _ => {}
                    }

                    // Crash/retry safety: the same registered user never
                    // becomes two participants
                    if let Identity::User { ref user_id } = identity {
                        let already_in = s.participants.iter().any(|p| {
                            matches!(&p.identity, Identity::User { user_id: existing }
                                if existing == user_id)
                        });
                        if already_in {
                            return Ok(());
                        }
                    }

                    if s.participant(&username).is_some() {
                        return Err(EngineError::UsernameTaken);
                    }
                    if s.participants.len() >= s.settings.max_participants {
                        return Err(EngineError::SessionFull);
                    }

                    s.participants.push(Participant::new(identity, username));
                    admitted_flag.store(true, Ordering::Relaxed);
                    Ok(())
                }),
            )
            .await?;

        // The idempotent rejoin path commits nothing; the room only hears
        // about actual admissions
        if admitted.load(Ordering::Relaxed) {
            tracing::debug!(
                session_id = %session.id,
                participants = session.participants.len(),
                "participant joined"
            );
            self.publish(
                &session.routing_key,
                ServerMessage::ParticipantJoined {
                    session: session.clone(),
                },
            )
            .await;
        }
        Ok(session)
    }

    /// Remove a participant. Idempotent: leaving a session you are not in
    /// (any more) is a successful no-op, because disconnect handling and
    /// network retries are expected to fire this redundantly.
    pub async fn leave(&self, session_id: &SessionId, username: &str) -> EngineResult<Session> {
        let username = username.trim().to_string();
        let removed = Arc::new(AtomicBool::new(false));
        let removed_flag = removed.clone();

        let session = self
            .commit(
                session_id,
                Box::new(move |s| {
                    if s.status == SessionStatus::Finished {
                        return Err(EngineError::SessionClosed);
                    }
                    let before = s.participants.len();
                    s.participants.retain(|p| p.username != username);
                    removed_flag.store(s.participants.len() < before, Ordering::Relaxed);
                    Ok(())
                }),
            )
            .await?;

        if removed.load(Ordering::Relaxed) {
            tracing::debug!(session_id = %session.id, "participant left");
            self.publish(
                &session.routing_key,
                ServerMessage::ParticipantLeft {
                    session: session.clone(),
                },
            )
            .await;
        }
        Ok(session)
    }
}
