//! Read-only quiz/question lookup
//!
//! Quiz content is authored elsewhere; the engine only needs to resolve a
//! question by id to score an answer. The trait keeps that collaborator
//! swappable (a database-backed directory in production, a static one in
//! tests).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::{QuestionId, QuizId};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    Mcq,
    TrueFalse,
    OpenEnded,
    MultipleAnswer,
    Reorder,
}

/// One question as the engine sees it. `correct_answers` is never sent to
/// clients; it only feeds server-side scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub id: QuestionId,
    pub quiz_id: QuizId,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answers: Vec<String>,
    /// Position within the quiz
    pub order: u32,
}

impl QuizQuestion {
    /// Authoritative correctness check. Case-insensitive and
    /// whitespace-trimmed; multiple-answer questions accept any member of
    /// the correct set.
    pub fn is_correct(&self, submitted: &str) -> bool {
        let submitted = submitted.trim();
        self.correct_answers
            .iter()
            .any(|c| c.trim().eq_ignore_ascii_case(submitted))
    }
}

/// Collaborator interface for quiz content lookup
#[async_trait]
pub trait QuizDirectory: Send + Sync {
    /// Whether a quiz with this id exists at all
    async fn quiz_exists(&self, quiz_id: &QuizId) -> bool;

    /// Look up one question of one quiz
    async fn question(&self, quiz_id: &QuizId, question_id: &QuestionId) -> Option<QuizQuestion>;
}

/// In-memory directory used by tests and the demo server
#[derive(Debug, Default)]
pub struct StaticQuizDirectory {
    questions: HashMap<(QuizId, QuestionId), QuizQuestion>,
    quiz_ids: Vec<QuizId>,
}

impl StaticQuizDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_questions(questions: Vec<QuizQuestion>) -> Self {
        let mut dir = Self::new();
        for q in questions {
            dir.insert(q);
        }
        dir
    }

    /// Load questions from a JSON array (the format quiz exports use)
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let questions: Vec<QuizQuestion> = serde_json::from_str(json)?;
        Ok(Self::with_questions(questions))
    }

    pub fn insert(&mut self, question: QuizQuestion) {
        if !self.quiz_ids.contains(&question.quiz_id) {
            self.quiz_ids.push(question.quiz_id.clone());
        }
        self.questions
            .insert((question.quiz_id.clone(), question.id.clone()), question);
    }
}

#[async_trait]
impl QuizDirectory for StaticQuizDirectory {
    async fn quiz_exists(&self, quiz_id: &QuizId) -> bool {
        self.quiz_ids.contains(quiz_id)
    }

    async fn question(&self, quiz_id: &QuizId, question_id: &QuestionId) -> Option<QuizQuestion> {
        self.questions
            .get(&(quiz_id.clone(), question_id.clone()))
            .cloned()
    }
}
