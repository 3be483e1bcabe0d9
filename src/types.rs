use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque ID types for type safety
pub type SessionId = String;
pub type QuizId = String;
pub type UserId = String;
pub type QuestionId = String;

/// Human-enterable 6-digit join code
pub type GameCode = u32;

pub const GAME_CODE_MIN: GameCode = 100_000;
pub const GAME_CODE_MAX: GameCode = 999_999;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Waiting,
    Playing,
    Finished,
}

/// Host-chosen knobs for one session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    pub max_participants: usize,
    /// Seconds a participant has to answer each question
    pub time_per_question: u32,
    pub max_points_per_question: u32,
    pub is_public: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_participants: 50,
            time_per_question: 30,
            max_points_per_question: 100,
            is_public: true,
        }
    }
}

impl SessionSettings {
    /// Bounds match what the quiz editor lets hosts pick
    pub fn validate(&self) -> Result<(), String> {
        if !(2..=50).contains(&self.max_participants) {
            return Err("max_participants must be between 2 and 50".to_string());
        }
        if !(10..=300).contains(&self.time_per_question) {
            return Err("time_per_question must be between 10 and 300 seconds".to_string());
        }
        if !(100..=4000).contains(&self.max_points_per_question) {
            return Err("max_points_per_question must be between 100 and 4000".to_string());
        }
        Ok(())
    }
}

/// Who a participant is: a registered account or a guest who only has a
/// display name for this session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Identity {
    User { user_id: UserId },
    Guest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub identity: Identity,
    /// Unique within the session
    pub username: String,
    pub score: u32,
    /// At most one entry per question_id
    pub answers: Vec<Answer>,
    pub joined_at: DateTime<Utc>,
}

impl Participant {
    pub fn new(identity: Identity, username: String) -> Self {
        Self {
            identity,
            username,
            score: 0,
            answers: Vec::new(),
            joined_at: Utc::now(),
        }
    }

    pub fn has_answered(&self, question_id: &QuestionId) -> bool {
        self.answers.iter().any(|a| a.question_id == *question_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub question_id: QuestionId,
    pub submitted_value: String,
    pub is_correct: bool,
    pub time_taken_ms: u64,
    pub points: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeaderboardEntry {
    pub username: String,
    pub identity: Identity,
    /// 1-based; ties on score are ordered by response time, so ranks are
    /// strictly sequential
    pub rank: u32,
    pub score: u32,
    pub correct_answers: u32,
    pub avg_response_time_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionResults {
    pub leaderboard: Vec<LeaderboardEntry>,
    /// Username of the rank-1 entry, none until somebody plays
    pub winner: Option<String>,
}

/// One hosted quiz room, from lobby to final leaderboard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub quiz_id: QuizId,
    pub host_id: UserId,
    pub game_code: GameCode,
    /// Opaque room identifier for the broadcast layer; knowing it is what
    /// authorizes receiving room events
    pub routing_key: String,
    pub status: SessionStatus,
    pub settings: SessionSettings,
    /// Insertion order == join order
    pub participants: Vec<Participant>,
    pub results: SessionResults,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn participant(&self, username: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.username == username)
    }

    pub fn participant_mut(&mut self, username: &str) -> Option<&mut Participant> {
        self.participants.iter_mut().find(|p| p.username == username)
    }
}
