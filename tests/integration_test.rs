use quizroom::broadcast::ChannelBroadcaster;
use quizroom::config::EngineConfig;
use quizroom::protocol::{ClientMessage, ServerMessage};
use quizroom::quiz::{QuestionType, QuizQuestion, StaticQuizDirectory};
use quizroom::state::SessionEngine;
use quizroom::store::MemoryStore;
use quizroom::types::{Identity, SessionStatus};
use quizroom::ws::handlers::{handle_message, Caller};
use std::sync::Arc;

const HOST: &str = "host-user";
const QUIZ: &str = "geo-quiz";

fn question(id: &str, correct: &str, order: u32) -> QuizQuestion {
    QuizQuestion {
        id: id.to_string(),
        quiz_id: QUIZ.to_string(),
        question_type: QuestionType::Mcq,
        question: format!("Question {id}"),
        options: vec![correct.to_string(), "wrong".to_string()],
        correct_answers: vec![correct.to_string()],
        order,
    }
}

fn engine() -> Arc<SessionEngine> {
    engine_with_config(EngineConfig::default())
}

fn engine_with_config(config: EngineConfig) -> Arc<SessionEngine> {
    let quizzes = StaticQuizDirectory::with_questions(vec![
        question("q1", "Paris", 1),
        question("q2", "Nile", 2),
    ]);
    Arc::new(SessionEngine::new(
        Arc::new(MemoryStore::new()),
        Arc::new(quizzes),
        Arc::new(ChannelBroadcaster::new()),
        config,
    ))
}

fn host_caller() -> Caller {
    Caller {
        user_id: Some(HOST.to_string()),
    }
}

fn guest_caller() -> Caller {
    Caller { user_id: None }
}

/// End-to-end flow: create, join, start, answer, stop, final leaderboard
#[tokio::test]
async fn test_full_session_flow() {
    let engine = engine();

    // 1. Host creates a session
    let outcome = handle_message(
        &engine,
        &host_caller(),
        ClientMessage::CreateSession {
            quiz_id: QUIZ.to_string(),
            settings: None,
        },
    )
    .await;

    let (game_code, session_id, routing_key) = match outcome.reply {
        Some(ServerMessage::SessionCreated {
            game_code,
            routing_key,
            session,
        }) => {
            assert_eq!(session.status, SessionStatus::Waiting);
            assert!((100_000..=999_999).contains(&game_code));
            (game_code, session.id, routing_key)
        }
        other => panic!("expected SessionCreated, got {other:?}"),
    };

    // The room channel receives every subsequent state change
    let mut room_rx = engine.broadcaster().subscribe(&routing_key).await;

    // 2. Two guests join with the human-enterable code
    for name in ["alice", "bob"] {
        let outcome = handle_message(
            &engine,
            &guest_caller(),
            ClientMessage::JoinSession {
                game_code,
                username: name.to_string(),
            },
        )
        .await;
        match outcome.reply {
            Some(ServerMessage::ParticipantJoined { session }) => {
                assert!(session.participant(name).is_some());
            }
            other => panic!("expected ParticipantJoined, got {other:?}"),
        }
    }

    // 3. Host starts the session
    let outcome = handle_message(
        &engine,
        &host_caller(),
        ClientMessage::StartSession {
            session_id: session_id.clone(),
        },
    )
    .await;
    match outcome.reply {
        Some(ServerMessage::SessionStarted { session }) => {
            assert_eq!(session.status, SessionStatus::Playing);
            assert!(session.started_at.is_some());
        }
        other => panic!("expected SessionStarted, got {other:?}"),
    }

    // 4. Both answer q1; alice is correct and faster
    for (name, value, time) in [("alice", "Paris", 5_000u64), ("bob", "London", 3_000)] {
        let outcome = handle_message(
            &engine,
            &guest_caller(),
            ClientMessage::SubmitAnswer {
                session_id: session_id.clone(),
                username: name.to_string(),
                question_id: "q1".to_string(),
                value: value.to_string(),
                time_taken_ms: time,
            },
        )
        .await;
        assert!(
            matches!(outcome.reply, Some(ServerMessage::ScoresUpdated { .. })),
            "submit for {name} should update scores"
        );
    }

    // 5. Host stops the session; final leaderboard is computed
    let outcome = handle_message(
        &engine,
        &host_caller(),
        ClientMessage::StopSession {
            session_id: session_id.clone(),
        },
    )
    .await;
    let finished = match outcome.reply {
        Some(ServerMessage::SessionFinished { session }) => session,
        other => panic!("expected SessionFinished, got {other:?}"),
    };

    assert_eq!(finished.status, SessionStatus::Finished);
    assert!(finished.finished_at.is_some());
    assert_eq!(finished.results.leaderboard.len(), 2);
    assert_eq!(finished.results.winner.as_deref(), Some("alice"));
    let top = &finished.results.leaderboard[0];
    assert_eq!(top.username, "alice");
    assert_eq!(top.rank, 1);
    assert_eq!(top.correct_answers, 1);
    assert_eq!(finished.results.leaderboard[1].score, 0);

    // 6. The room saw every transition, in commit order
    let mut seen = Vec::new();
    while let Ok(msg) = room_rx.try_recv() {
        seen.push(match msg {
            ServerMessage::ParticipantJoined { .. } => "joined",
            ServerMessage::SessionStarted { .. } => "started",
            ServerMessage::ScoresUpdated { .. } => "scores",
            ServerMessage::SessionFinished { .. } => "finished",
            other => panic!("unexpected room event {other:?}"),
        });
    }
    assert_eq!(
        seen,
        vec!["joined", "joined", "started", "scores", "scores", "finished"]
    );

    // 7. Finished is absorbing: further mutations are rejected
    let outcome = handle_message(
        &engine,
        &guest_caller(),
        ClientMessage::SubmitAnswer {
            session_id: session_id.clone(),
            username: "alice".to_string(),
            question_id: "q2".to_string(),
            value: "Nile".to_string(),
            time_taken_ms: 1_000,
        },
    )
    .await;
    match outcome.reply {
        Some(ServerMessage::Error { code, .. }) => assert_eq!(code, "SESSION_CLOSED"),
        other => panic!("expected SESSION_CLOSED error, got {other:?}"),
    }

    // The game code no longer resolves for joins either
    let outcome = handle_message(
        &engine,
        &guest_caller(),
        ClientMessage::JoinSession {
            game_code,
            username: "carol".to_string(),
        },
    )
    .await;
    match outcome.reply {
        Some(ServerMessage::Error { code, .. }) => assert_eq!(code, "SESSION_NOT_FOUND"),
        other => panic!("expected SESSION_NOT_FOUND error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_registered_user_joins_with_identity() {
    let engine = engine();
    let session = engine
        .create_session(&HOST.to_string(), &QUIZ.to_string(), None)
        .await
        .unwrap();

    let caller = Caller {
        user_id: Some("user-42".to_string()),
    };
    let outcome = handle_message(
        &engine,
        &caller,
        ClientMessage::JoinSession {
            game_code: session.game_code,
            username: "ada".to_string(),
        },
    )
    .await;

    match outcome.reply {
        Some(ServerMessage::ParticipantJoined { session }) => {
            assert_eq!(
                session.participant("ada").unwrap().identity,
                Identity::User {
                    user_id: "user-42".to_string()
                }
            );
        }
        other => panic!("expected ParticipantJoined, got {other:?}"),
    }
}

#[tokio::test]
async fn test_non_host_cannot_start_or_stop() {
    let engine = engine();
    let session = engine
        .create_session(&HOST.to_string(), &QUIZ.to_string(), None)
        .await
        .unwrap();

    let imposter = Caller {
        user_id: Some("not-the-host".to_string()),
    };
    let outcome = handle_message(
        &engine,
        &imposter,
        ClientMessage::StartSession {
            session_id: session.id.clone(),
        },
    )
    .await;
    match outcome.reply {
        Some(ServerMessage::Error { code, .. }) => assert_eq!(code, "NOT_HOST"),
        other => panic!("expected NOT_HOST error, got {other:?}"),
    }

    let current = engine.session(&session.id).await.unwrap();
    assert_eq!(current.status, SessionStatus::Waiting);
}

#[tokio::test]
async fn test_late_join_allowed_when_configured() {
    let config = EngineConfig {
        allow_late_join: true,
        ..Default::default()
    };
    let engine = engine_with_config(config);

    let session = engine
        .create_session(&HOST.to_string(), &QUIZ.to_string(), None)
        .await
        .unwrap();
    engine
        .start_session(&session.id, &HOST.to_string())
        .await
        .unwrap();

    let joined = engine
        .join(session.game_code, Identity::Guest, "late")
        .await
        .unwrap();
    assert_eq!(joined.participants.len(), 1);
}

/// Many concurrent joins against one session: capacity holds exactly and
/// every admitted username is distinct
#[tokio::test]
async fn test_concurrent_joins_respect_capacity() {
    let engine = engine();
    let settings = quizroom::types::SessionSettings {
        max_participants: 10,
        ..Default::default()
    };
    let session = engine
        .create_session(&HOST.to_string(), &QUIZ.to_string(), Some(settings))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for i in 0..25 {
        let engine = engine.clone();
        let code = session.game_code;
        handles.push(tokio::spawn(async move {
            engine
                .join(code, Identity::Guest, &format!("player-{i}"))
                .await
        }));
    }

    let mut admitted = 0;
    let mut full = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => admitted += 1,
            Err(e) => {
                assert_eq!(e, quizroom::error::EngineError::SessionFull);
                full += 1;
            }
        }
    }
    assert_eq!(admitted, 10);
    assert_eq!(full, 15);

    let current = engine.session(&session.id).await.unwrap();
    assert_eq!(current.participants.len(), 10);
    let mut names: Vec<_> = current
        .participants
        .iter()
        .map(|p| p.username.clone())
        .collect();
    names.sort();
    names.dedup();
    assert_eq!(names.len(), 10);
}

/// Concurrent submissions from many participants all commit, scores add up,
/// and the leaderboard stays consistent
#[tokio::test]
async fn test_concurrent_submissions_are_all_recorded() {
    let engine = engine();
    let settings = quizroom::types::SessionSettings {
        max_points_per_question: 1000,
        ..Default::default()
    };
    let session = engine
        .create_session(&HOST.to_string(), &QUIZ.to_string(), Some(settings))
        .await
        .unwrap();
    for i in 0..8 {
        engine
            .join(session.game_code, Identity::Guest, &format!("p{i}"))
            .await
            .unwrap();
    }
    engine
        .start_session(&session.id, &HOST.to_string())
        .await
        .unwrap();

    let mut handles = Vec::new();
    for i in 0..8 {
        let engine = engine.clone();
        let id = session.id.clone();
        handles.push(tokio::spawn(async move {
            engine
                .submit_answer(&id, &format!("p{i}"), &"q1".to_string(), "Paris", 6_000)
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let current = engine.session(&session.id).await.unwrap();
    // 6s of a 30s window leaves 80% of 1000 points
    for p in &current.participants {
        assert_eq!(p.score, 800);
        assert_eq!(p.answers.len(), 1);
    }
    assert_eq!(current.results.leaderboard.len(), 8);
    assert!(current.results.leaderboard.iter().all(|e| e.score == 800));
}

/// Sessions do not contend with each other: codes are unique among active
/// sessions and parallel creates all succeed
#[tokio::test]
async fn test_parallel_sessions_get_unique_codes() {
    let engine = engine();

    let mut handles = Vec::new();
    for _ in 0..50 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine
                .create_session(&HOST.to_string(), &QUIZ.to_string(), None)
                .await
        }));
    }

    let mut codes = Vec::new();
    let mut keys = Vec::new();
    for handle in handles {
        let session = handle.await.unwrap().unwrap();
        codes.push(session.game_code);
        keys.push(session.routing_key);
    }
    codes.sort_unstable();
    codes.dedup();
    keys.sort();
    keys.dedup();
    assert_eq!(codes.len(), 50);
    assert_eq!(keys.len(), 50);
}

/// Leaderboard recomputation over unchanged data is byte-stable
#[tokio::test]
async fn test_leaderboard_is_deterministic() {
    let engine = engine();
    let session = engine
        .create_session(&HOST.to_string(), &QUIZ.to_string(), None)
        .await
        .unwrap();
    for name in ["a", "b", "c"] {
        engine
            .join(session.game_code, Identity::Guest, name)
            .await
            .unwrap();
    }
    engine
        .start_session(&session.id, &HOST.to_string())
        .await
        .unwrap();
    for (name, time) in [("a", 4_000u64), ("b", 4_000), ("c", 9_000)] {
        engine
            .submit_answer(&session.id, name, &"q1".to_string(), "Paris", time)
            .await
            .unwrap();
    }

    let first = engine.recompute(&session.id).await.unwrap();
    let second = engine.recompute(&session.id).await.unwrap();
    let a = serde_json::to_string(&first.results).unwrap();
    let b = serde_json::to_string(&second.results).unwrap();
    assert_eq!(a, b);
}
