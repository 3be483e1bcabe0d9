//! Leaderboard derivation
//!
//! Standings are always derived from the participants' answer history, never
//! accumulated incrementally, so recomputing is idempotent and cannot drift
//! from the answers. `recompute` runs the derivation inside the store's
//! atomic update, which means it always sees the freshest committed
//! participant list even under concurrent submissions.

use std::cmp::Ordering;

use super::SessionEngine;
use crate::error::EngineResult;
use crate::protocol::ServerMessage;
use crate::types::{LeaderboardEntry, Session, SessionId, SessionResults};

/// Derive ranked standings from a session's participants. Primary key is
/// score descending; ties go to the faster average response time.
pub fn compute_leaderboard(session: &Session) -> SessionResults {
    let mut entries: Vec<LeaderboardEntry> = session
        .participants
        .iter()
        .map(|p| {
            let answered = p.answers.len() as u64;
            let avg_response_time_ms = if answered == 0 {
                0
            } else {
                p.answers.iter().map(|a| a.time_taken_ms).sum::<u64>() / answered
            };
            LeaderboardEntry {
                username: p.username.clone(),
                identity: p.identity.clone(),
                rank: 0,
                score: p.score,
                correct_answers: p.answers.iter().filter(|a| a.is_correct).count() as u32,
                avg_response_time_ms,
            }
        })
        .collect();

    // Stable sort keeps join order for exact ties, so repeated recomputes
    // over the same data produce identical orderings
    entries.sort_by(|a, b| match b.score.cmp(&a.score) {
        Ordering::Equal => a.avg_response_time_ms.cmp(&b.avg_response_time_ms),
        other => other,
    });

    for (i, entry) in entries.iter_mut().enumerate() {
        entry.rank = (i + 1) as u32;
    }

    let winner = entries.first().map(|e| e.username.clone());
    SessionResults {
        leaderboard: entries,
        winner,
    }
}

impl SessionEngine {
    /// Recompute standings from the authoritative participant list and
    /// atomically replace `results` with the snapshot
    pub async fn recompute(&self, session_id: &SessionId) -> EngineResult<Session> {
        self.commit(
            session_id,
            Box::new(|s| {
                s.results = compute_leaderboard(s);
                Ok(())
            }),
        )
        .await
    }

    /// Recompute and push the standings to the room
    pub async fn broadcast_scores(&self, session_id: &SessionId) -> EngineResult<Session> {
        let session = self.recompute(session_id).await?;
        self.publish(
            &session.routing_key,
            ServerMessage::ScoresUpdated {
                session: session.clone(),
            },
        )
        .await;
        Ok(session)
    }
}
