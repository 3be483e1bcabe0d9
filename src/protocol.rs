use crate::types::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Host opens a new waiting session for a quiz
    CreateSession {
        quiz_id: QuizId,
        #[serde(default)]
        settings: Option<SessionSettings>,
    },
    /// Enter a session by its human-enterable code. The caller's registered
    /// identity (if any) comes from the connection token; without one they
    /// join as a guest.
    JoinSession {
        game_code: GameCode,
        username: String,
    },
    LeaveSession {
        session_id: SessionId,
        username: String,
    },
    /// Host only: waiting -> playing
    StartSession {
        session_id: SessionId,
    },
    /// Host only: -> finished, computes the final leaderboard
    StopSession {
        session_id: SessionId,
    },
    SubmitAnswer {
        session_id: SessionId,
        username: String,
        question_id: QuestionId,
        value: String,
        time_taken_ms: u64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent to the creating host; the code and key are also in the snapshot
    /// but are pulled up top so lobby UIs don't have to dig for them
    SessionCreated {
        game_code: GameCode,
        routing_key: String,
        session: Session,
    },
    ParticipantJoined {
        session: Session,
    },
    ParticipantLeft {
        session: Session,
    },
    SessionStarted {
        session: Session,
    },
    SessionFinished {
        session: Session,
    },
    ScoresUpdated {
        session: Session,
    },
    /// Sent only to the originating caller, never broadcast
    Error {
        code: String,
        msg: String,
    },
}

impl ServerMessage {
    pub fn error(err: &crate::error::EngineError) -> Self {
        ServerMessage::Error {
            code: err.code().to_string(),
            msg: err.to_string(),
        }
    }
}
