//! Answer submission and scoring
//!
//! Correctness and points are computed here, on the server, from the stored
//! question's correct-answer set and the reported response time. Nothing
//! scoring-relevant is trusted from the caller. The append of the answer
//! and the score increment are guarded by the duplicate-submission check
//! inside one atomic store update.

use super::SessionEngine;
use crate::error::{EngineError, EngineResult};
use crate::types::{Answer, QuestionId, Session, SessionId, SessionSettings, SessionStatus};

/// Points for one answer: full marks at 0ms decaying linearly to zero at
/// the per-question time limit. Incorrect answers score nothing.
pub(crate) fn score_points(settings: &SessionSettings, is_correct: bool, time_taken_ms: u64) -> u32 {
    if !is_correct {
        return 0;
    }
    let total_ms = u64::from(settings.time_per_question) * 1000;
    let left_ms = total_ms.saturating_sub(time_taken_ms);
    let points =
        (left_ms as f64 / total_ms as f64 * f64::from(settings.max_points_per_question)).round();
    (points as u32).min(settings.max_points_per_question)
}

impl SessionEngine {
    /// Record one participant's answer to one question and update their
    /// score. Exactly one submission per (participant, question) ever
    /// commits; a concurrent or retried duplicate fails with
    /// `DuplicateSubmission` and leaves the score untouched.
    pub async fn submit_answer(
        &self,
        session_id: &SessionId,
        username: &str,
        question_id: &QuestionId,
        submitted_value: &str,
        time_taken_ms: u64,
    ) -> EngineResult<Session> {
        if submitted_value.trim().is_empty() {
            return Err(EngineError::Validation("answer must not be empty".into()));
        }

        // Quiz content is immutable while a session runs, so resolving the
        // question before the atomic update is safe
        let session = self.session(session_id).await?;
        let question = self
            .quizzes
            .question(&session.quiz_id, question_id)
            .await
            .ok_or(EngineError::QuestionNotFound)?;

        let is_correct = question.is_correct(submitted_value);
        let username = username.to_string();
        let question_id = question_id.clone();
        let submitted_value = submitted_value.to_string();

        let session = self
            .commit(
                session_id,
                Box::new(move |s| {
                    match s.status {
                        SessionStatus::Finished => return Err(EngineError::SessionClosed),
                        SessionStatus::Waiting => return Err(EngineError::SessionNotPlaying),
                        SessionStatus::Playing => {}
                    }

                    let points = score_points(&s.settings, is_correct, time_taken_ms);
                    let participant = s
                        .participant_mut(&username)
                        .ok_or(EngineError::ParticipantNotFound)?;

                    if participant.has_answered(&question_id) {
                        return Err(EngineError::DuplicateSubmission);
                    }

                    participant.answers.push(Answer {
                        question_id,
                        submitted_value,
                        is_correct,
                        time_taken_ms,
                        points,
                    });
                    participant.score += points;
                    Ok(())
                }),
            )
            .await?;

        tracing::debug!(
            session_id = %session.id,
            correct = is_correct,
            "answer recorded"
        );

        // Standings change with every accepted answer; recompute and push
        // them to the room right away
        self.broadcast_scores(session_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::{engine_with_quiz, HOST};
    use crate::types::{Identity, SessionSettings};

    async fn playing_session(
        engine: &std::sync::Arc<SessionEngine>,
        usernames: &[&str],
    ) -> crate::types::Session {
        let settings = SessionSettings {
            max_points_per_question: 1000,
            ..Default::default()
        };
        let session = engine
            .create_session(&HOST.to_string(), &"quiz1".to_string(), Some(settings))
            .await
            .unwrap();
        for name in usernames {
            engine
                .join(session.game_code, Identity::Guest, name)
                .await
                .unwrap();
        }
        engine
            .start_session(&session.id, &HOST.to_string())
            .await
            .unwrap()
    }

    #[test]
    fn scoring_decays_linearly_with_time() {
        let settings = SessionSettings {
            time_per_question: 30,
            max_points_per_question: 1000,
            ..Default::default()
        };
        // 10s of a 30s window leaves two thirds of the points
        assert_eq!(score_points(&settings, true, 10_000), 667);
        assert_eq!(score_points(&settings, true, 0), 1000);
        assert_eq!(score_points(&settings, true, 30_000), 0);
        // Over-time answers clamp to zero rather than going negative
        assert_eq!(score_points(&settings, true, 90_000), 0);
        // Incorrect answers score nothing at any speed
        assert_eq!(score_points(&settings, false, 0), 0);
    }

    #[tokio::test]
    async fn correct_answer_is_scored_server_side() {
        let engine = engine_with_quiz().await;
        let session = playing_session(&engine, &["ada"]).await;

        let updated = engine
            .submit_answer(&session.id, "ada", &"q1".to_string(), "paris", 10_000)
            .await
            .unwrap();

        let p = updated.participant("ada").unwrap();
        assert_eq!(p.answers.len(), 1);
        assert!(p.answers[0].is_correct);
        assert_eq!(p.answers[0].points, 667);
        assert_eq!(p.score, 667);
    }

    #[tokio::test]
    async fn incorrect_answer_scores_zero() {
        let engine = engine_with_quiz().await;
        let session = playing_session(&engine, &["ada"]).await;

        let updated = engine
            .submit_answer(&session.id, "ada", &"q1".to_string(), "Lyon", 1_000)
            .await
            .unwrap();

        let p = updated.participant("ada").unwrap();
        assert!(!p.answers[0].is_correct);
        assert_eq!(p.score, 0);
    }

    #[tokio::test]
    async fn duplicate_submission_is_rejected() {
        let engine = engine_with_quiz().await;
        let session = playing_session(&engine, &["ada"]).await;

        engine
            .submit_answer(&session.id, "ada", &"q1".to_string(), "Paris", 5_000)
            .await
            .unwrap();
        let err = engine
            .submit_answer(&session.id, "ada", &"q1".to_string(), "Paris", 1_000)
            .await
            .unwrap_err();
        assert_eq!(err, EngineError::DuplicateSubmission);

        // Score reflects only the first submission
        let current = engine.session(&session.id).await.unwrap();
        let p = current.participant("ada").unwrap();
        assert_eq!(p.answers.len(), 1);
        assert_eq!(p.answers[0].time_taken_ms, 5_000);
    }

    #[tokio::test]
    async fn duplicate_race_commits_exactly_one() {
        let engine = engine_with_quiz().await;
        let session = playing_session(&engine, &["ada"]).await;

        let e1 = engine.clone();
        let e2 = engine.clone();
        let id1 = session.id.clone();
        let id2 = session.id.clone();
        let (a, b) = tokio::join!(
            tokio::spawn(async move {
                e1.submit_answer(&id1, "ada", &"q1".to_string(), "Paris", 4_000)
                    .await
            }),
            tokio::spawn(async move {
                e2.submit_answer(&id2, "ada", &"q1".to_string(), "Paris", 6_000)
                    .await
            }),
        );
        let results = [a.unwrap(), b.unwrap()];

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| r.as_ref().err() == Some(&EngineError::DuplicateSubmission)));

        let current = engine.session(&session.id).await.unwrap();
        assert_eq!(current.participant("ada").unwrap().answers.len(), 1);
    }

    #[tokio::test]
    async fn submission_requires_playing_status() {
        let engine = engine_with_quiz().await;
        let session = engine
            .create_session(&HOST.to_string(), &"quiz1".to_string(), None)
            .await
            .unwrap();
        engine
            .join(session.game_code, Identity::Guest, "ada")
            .await
            .unwrap();

        let err = engine
            .submit_answer(&session.id, "ada", &"q1".to_string(), "Paris", 1_000)
            .await
            .unwrap_err();
        assert_eq!(err, EngineError::SessionNotPlaying);
    }

    #[tokio::test]
    async fn unknown_participant_and_question_are_distinct_errors() {
        let engine = engine_with_quiz().await;
        let session = playing_session(&engine, &["ada"]).await;

        assert_eq!(
            engine
                .submit_answer(&session.id, "ghost", &"q1".to_string(), "Paris", 1_000)
                .await
                .unwrap_err(),
            EngineError::ParticipantNotFound
        );
        assert_eq!(
            engine
                .submit_answer(&session.id, "ada", &"q99".to_string(), "Paris", 1_000)
                .await
                .unwrap_err(),
            EngineError::QuestionNotFound
        );
    }
}
