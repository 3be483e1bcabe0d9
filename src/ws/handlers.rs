//! Inbound message dispatch
//!
//! One entry point per connection event. Every engine failure is converted
//! to a wire `error` for the originating caller only; the room broadcasts
//! are published by the engine itself after each committed mutation.

use std::sync::Arc;

use crate::error::EngineError;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::SessionEngine;
use crate::types::{Identity, SessionId, UserId};

/// What the transport knows about the caller of one connection
#[derive(Debug, Clone, Default)]
pub struct Caller {
    /// Registered user resolved from the connection token; `None` = guest
    pub user_id: Option<UserId>,
}

impl Caller {
    pub fn identity(&self) -> Identity {
        match &self.user_id {
            Some(user_id) => Identity::User {
                user_id: user_id.clone(),
            },
            None => Identity::Guest,
        }
    }
}

/// Room membership a successful create/join grants the connection
#[derive(Debug, Clone)]
pub struct Attachment {
    pub session_id: SessionId,
    pub routing_key: String,
    /// Set for participants; the implicit leave on disconnect uses it.
    /// Hosts attach without one.
    pub username: Option<String>,
}

/// Result of handling one client message
#[derive(Default)]
pub struct Outcome {
    /// Direct reply to the originating connection
    pub reply: Option<ServerMessage>,
    /// New room subscription for this connection
    pub attach: Option<Attachment>,
}

impl Outcome {
    fn reply(msg: ServerMessage) -> Self {
        Self {
            reply: Some(msg),
            attach: None,
        }
    }

    fn error(err: EngineError) -> Self {
        Self::reply(ServerMessage::error(&err))
    }
}

pub async fn handle_message(
    engine: &Arc<SessionEngine>,
    caller: &Caller,
    msg: ClientMessage,
) -> Outcome {
    match msg {
        ClientMessage::CreateSession { quiz_id, settings } => {
            // Hosting requires a registered account; guests can only join
            let host_id = match &caller.user_id {
                Some(id) => id.clone(),
                None => return Outcome::error(EngineError::NotHost),
            };
            match engine.create_session(&host_id, &quiz_id, settings).await {
                Ok(session) => Outcome {
                    attach: Some(Attachment {
                        session_id: session.id.clone(),
                        routing_key: session.routing_key.clone(),
                        username: None,
                    }),
                    reply: Some(ServerMessage::SessionCreated {
                        game_code: session.game_code,
                        routing_key: session.routing_key.clone(),
                        session,
                    }),
                },
                Err(e) => Outcome::error(e),
            }
        }

        ClientMessage::JoinSession {
            game_code,
            username,
        } => match engine.join(game_code, caller.identity(), &username).await {
            Ok(session) => {
                // A registered user retrying a join stays attached under
                // the name they were admitted with, whatever this attempt
                // said
                let username = caller
                    .user_id
                    .as_ref()
                    .and_then(|uid| {
                        session.participants.iter().find(|p| {
                            matches!(&p.identity, Identity::User { user_id } if user_id == uid)
                        })
                    })
                    .map(|p| p.username.clone())
                    .unwrap_or(username);
                Outcome {
                    attach: Some(Attachment {
                        session_id: session.id.clone(),
                        routing_key: session.routing_key.clone(),
                        username: Some(username),
                    }),
                    reply: Some(ServerMessage::ParticipantJoined { session }),
                }
            }
            Err(e) => Outcome::error(e),
        },

        ClientMessage::LeaveSession {
            session_id,
            username,
        } => match engine.leave(&session_id, &username).await {
            Ok(session) => Outcome::reply(ServerMessage::ParticipantLeft { session }),
            Err(e) => Outcome::error(e),
        },

        ClientMessage::StartSession { session_id } => {
            let caller_id = match &caller.user_id {
                Some(id) => id.clone(),
                None => return Outcome::error(EngineError::NotHost),
            };
            match engine.start_session(&session_id, &caller_id).await {
                Ok(session) => Outcome::reply(ServerMessage::SessionStarted { session }),
                Err(e) => Outcome::error(e),
            }
        }

        ClientMessage::StopSession { session_id } => {
            let caller_id = match &caller.user_id {
                Some(id) => id.clone(),
                None => return Outcome::error(EngineError::NotHost),
            };
            match engine.stop_session(&session_id, &caller_id).await {
                Ok(session) => Outcome::reply(ServerMessage::SessionFinished { session }),
                Err(e) => Outcome::error(e),
            }
        }

        ClientMessage::SubmitAnswer {
            session_id,
            username,
            question_id,
            value,
            time_taken_ms,
        } => {
            match engine
                .submit_answer(&session_id, &username, &question_id, &value, time_taken_ms)
                .await
            {
                Ok(session) => Outcome::reply(ServerMessage::ScoresUpdated { session }),
                Err(e) => Outcome::error(e),
            }
        }
    }
}
