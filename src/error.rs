//! Error taxonomy for the session engine
//!
//! Every fallible engine operation returns one of these. Handlers convert
//! them into a wire `error` message for the originating caller; nothing in
//! here should ever take down the process or another session.

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur while mutating or reading a session
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("session not found")]
    SessionNotFound,

    #[error("participant not found in this session")]
    ParticipantNotFound,

    #[error("question not found in this quiz")]
    QuestionNotFound,

    #[error("quiz not found")]
    QuizNotFound,

    #[error("username is already taken in this session")]
    UsernameTaken,

    #[error("session is full")]
    SessionFull,

    #[error("session is not accepting new participants")]
    SessionNotJoinable,

    #[error("answer already submitted for this question")]
    DuplicateSubmission,

    #[error("session is not currently playing")]
    SessionNotPlaying,

    #[error("session has already started")]
    AlreadyStarted,

    #[error("session is finished")]
    SessionClosed,

    #[error("only the session host can do that")]
    NotHost,

    /// Internal to code/key generation: the candidate collided with an
    /// active session. Consumed by the bounded retry loop, never sent to
    /// clients.
    #[error("game code or routing key already reserved")]
    CodeCollision,

    #[error("could not reserve a unique code after {0} attempts")]
    ExhaustedSpace(u32),

    #[error("storage operation timed out")]
    StorageTimeout,
}

impl EngineError {
    /// Stable wire code reported in `error` messages
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "VALIDATION_ERROR",
            EngineError::SessionNotFound => "SESSION_NOT_FOUND",
            EngineError::ParticipantNotFound => "PARTICIPANT_NOT_FOUND",
            EngineError::QuestionNotFound => "QUESTION_NOT_FOUND",
            EngineError::QuizNotFound => "QUIZ_NOT_FOUND",
            EngineError::UsernameTaken => "USERNAME_TAKEN",
            EngineError::SessionFull => "SESSION_FULL",
            EngineError::SessionNotJoinable => "SESSION_NOT_JOINABLE",
            EngineError::DuplicateSubmission => "DUPLICATE_SUBMISSION",
            EngineError::SessionNotPlaying => "SESSION_NOT_PLAYING",
            EngineError::AlreadyStarted => "ALREADY_STARTED",
            EngineError::SessionClosed => "SESSION_CLOSED",
            EngineError::NotHost => "NOT_HOST",
            EngineError::CodeCollision => "CODE_COLLISION",
            EngineError::ExhaustedSpace(_) => "EXHAUSTED_SPACE",
            EngineError::StorageTimeout => "STORAGE_TIMEOUT",
        }
    }
}
