mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tokio_test::{assert_err, assert_ok};

use cert_quiz::error::{AppError, ConfigError, GenerationError, SessionError};
use cert_quiz::{
    NavigationEvent, QuestionGenerator, QuizSession, RetryPolicy, SessionOrchestrator,
    SessionPhase,
};
use common::{generator, memory_store, quiz_config, saved_quiz, NumberedBackend};

/// 答对当前题并进入下一题
async fn answer_current(orchestrator: &mut SessionOrchestrator, correct: bool) -> Option<NavigationEvent> {
    let question = orchestrator.current_question().cloned().expect("当前题目应存在");
    let pick = if correct {
        question.correct_answer
    } else {
        (question.correct_answer + 1) % 4
    };
    orchestrator.select_answer(pick);
    let outcome = orchestrator.submit_answer().await.expect("提交应被接受");
    assert_eq!(outcome.record.is_correct, correct);
    assert_ok!(orchestrator.session().check_invariants());
    assert_eq!(orchestrator.score(), orchestrator.session().computed_score());
    orchestrator.advance().await
}

#[tokio::test(start_paused = true)]
async fn background_generation_fills_the_session() {
    let backend = Arc::new(NumberedBackend::new());
    let store = memory_store();
    let mut orchestrator =
        SessionOrchestrator::new(quiz_config(3), generator(&backend), store.clone()).unwrap();

    orchestrator.start().await.unwrap();
    assert_eq!(orchestrator.phase(), &SessionPhase::Ready);
    assert_eq!(orchestrator.session().current_questions.len(), 1);
    assert!(orchestrator.is_preparing_questions());

    sleep(Duration::from_secs(5)).await;
    assert_eq!(orchestrator.poll_background(), 2);
    assert!(!orchestrator.is_preparing_questions());

    let texts: Vec<&str> = orchestrator
        .session()
        .current_questions
        .iter()
        .map(|q| q.question.as_str())
        .collect();
    assert_eq!(texts, ["Question 1?", "Question 2?", "Question 3?"]);

    assert_eq!(answer_current(&mut orchestrator, true).await, Some(NavigationEvent::Moved { index: 1 }));
    assert_eq!(answer_current(&mut orchestrator, true).await, Some(NavigationEvent::Moved { index: 2 }));
    assert!(matches!(
        answer_current(&mut orchestrator, true).await,
        Some(NavigationEvent::Completed(answers)) if answers.len() == 3
    ));

    // 题目都由后台提前生成，作答过程中没有额外请求
    assert_eq!(backend.calls(), vec![1, 2, 3]);
    assert_eq!(orchestrator.score(), 3);
}

#[tokio::test(start_paused = true)]
async fn completed_session_is_persisted_with_quiz_record() {
    let backend = Arc::new(NumberedBackend::new());
    let store = memory_store();
    let mut orchestrator =
        SessionOrchestrator::new(quiz_config(2), generator(&backend), store.clone()).unwrap();
    orchestrator.start().await.unwrap();

    answer_current(&mut orchestrator, true).await;
    let saved = store
        .load_session(&orchestrator.session().id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(saved.answers.len(), 1);
    assert!(!saved.completed);

    let event = answer_current(&mut orchestrator, false).await;
    assert!(matches!(event, Some(NavigationEvent::Completed(ref a)) if a.len() == 2));
    assert!(orchestrator.is_completed());
    assert_eq!(orchestrator.score(), 1);

    let saved = store
        .load_session(&orchestrator.session().id)
        .await
        .unwrap()
        .unwrap();
    assert!(saved.completed);
    assert_eq!(saved.answers.len(), 2);
    assert_eq!(saved.score, 1);

    let quizzes = store.load_quizzes().await.unwrap();
    assert_eq!(quizzes.len(), 1);
    assert_eq!(quizzes[0].title, "AWS SAA Practice Quiz (Complete)");
    assert_eq!(quizzes[0].questions.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn first_question_failure_is_terminal_until_retry() {
    let backend = Arc::new(NumberedBackend::new().fail_times(1, 3));
    let mut orchestrator =
        SessionOrchestrator::new(quiz_config(2), generator(&backend), memory_store()).unwrap();

    let err = orchestrator.start().await.unwrap_err();
    assert!(matches!(
        err,
        AppError::Generation(GenerationError::Exhausted { attempts: 3, .. })
    ));
    assert!(matches!(orchestrator.phase(), SessionPhase::Failed(_)));
    assert!(orchestrator.error().is_some());
    assert!(!orchestrator.is_preparing_questions());
    assert!(orchestrator.current_question().is_none());
    assert_eq!(backend.calls(), vec![1, 1, 1]);

    // 还没作答，提交无效
    orchestrator.select_answer(0);
    assert!(orchestrator.submit_answer().await.is_none());

    orchestrator.retry().await.unwrap();
    assert_eq!(orchestrator.phase(), &SessionPhase::Ready);
    assert!(orchestrator.error().is_none());
    assert_eq!(orchestrator.current_question().unwrap().question, "Question 1?");
    assert!(matches!(
        orchestrator.retry().await,
        Err(AppError::Session(SessionError::NothingToRetry))
    ));
}

#[tokio::test(start_paused = true)]
async fn exit_without_questions_saves_nothing() {
    let backend = Arc::new(NumberedBackend::new().always_fail(1));
    let store = memory_store();
    let mut orchestrator =
        SessionOrchestrator::new(quiz_config(2), generator(&backend), store.clone()).unwrap();

    assert_err!(orchestrator.start().await);
    let snapshot = orchestrator.exit().await;

    assert!(snapshot.current_questions.is_empty());
    assert_eq!(orchestrator.phase(), &SessionPhase::Exited);
    assert!(store.load_sessions().await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn missing_question_is_requested_synchronously() {
    let backend = Arc::new(NumberedBackend::new());
    let mut orchestrator =
        SessionOrchestrator::new(quiz_config(2), generator(&backend), memory_store())
            .unwrap()
            .with_stagger(Duration::from_secs(600));
    orchestrator.start().await.unwrap();

    assert_eq!(
        answer_current(&mut orchestrator, true).await,
        Some(NavigationEvent::Moved { index: 1 })
    );
    assert_eq!(orchestrator.current_question().unwrap().question, "Question 2?");

    assert!(matches!(
        answer_current(&mut orchestrator, true).await,
        Some(NavigationEvent::Completed(_))
    ));
    assert!(!orchestrator.is_preparing_questions());
    assert_eq!(backend.calls(), vec![1, 2]);
}

#[tokio::test(start_paused = true)]
async fn failed_synchronous_request_waits_for_background() {
    let backend = Arc::new(NumberedBackend::new().fail_times(2, 1));
    let no_retries = RetryPolicy {
        max_retries: 0,
        ..RetryPolicy::single_question()
    };
    let generator = QuestionGenerator::new(backend.clone()).with_policy(no_retries);
    let mut orchestrator =
        SessionOrchestrator::new(quiz_config(2), generator, memory_store()).unwrap();
    orchestrator.start().await.unwrap();

    let event = answer_current(&mut orchestrator, true).await;

    assert_eq!(event, Some(NavigationEvent::Moved { index: 1 }));
    assert_eq!(orchestrator.current_question().unwrap().question, "Question 2?");
    assert_eq!(backend.calls(), vec![1, 2, 2]);
}

#[tokio::test(start_paused = true)]
async fn unobtainable_question_shortens_the_quiz() {
    let backend = Arc::new(NumberedBackend::new().always_fail(3));
    let store = memory_store();
    let mut orchestrator =
        SessionOrchestrator::new(quiz_config(3), generator(&backend), store.clone()).unwrap();
    orchestrator.start().await.unwrap();

    // 等后台任务跑完（第 3 题重试耗尽）
    sleep(Duration::from_secs(10)).await;
    assert_eq!(orchestrator.poll_background(), 1);

    answer_current(&mut orchestrator, true).await;
    let event = answer_current(&mut orchestrator, true).await;

    assert!(matches!(event, Some(NavigationEvent::Completed(ref a)) if a.len() == 2));
    assert!(orchestrator.is_completed());
    assert_eq!(orchestrator.session().target_questions, 2);
    assert_eq!(orchestrator.session().config.number_of_questions, 3);
    assert_ok!(orchestrator.session().check_invariants());
    // 后台 3 次 + 同步 3 次
    assert_eq!(backend.calls().iter().filter(|n| **n == 3).count(), 6);

    let quizzes = store.load_quizzes().await.unwrap();
    assert_eq!(quizzes[0].questions.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn replay_uses_saved_questions_and_marks_source_complete() {
    let backend = Arc::new(NumberedBackend::new());
    let store = memory_store();
    let quiz = saved_quiz(2);
    store.upsert_quiz(quiz.clone()).await.unwrap();

    let mut orchestrator =
        SessionOrchestrator::replay(&quiz, generator(&backend), store.clone()).unwrap();
    orchestrator.start().await.unwrap();
    assert!(!orchestrator.is_preparing_questions());
    assert_eq!(orchestrator.session().target_questions, 2);

    answer_current(&mut orchestrator, true).await;
    answer_current(&mut orchestrator, true).await;

    assert!(orchestrator.is_completed());
    assert!(backend.calls().is_empty());

    let quizzes = store.load_quizzes().await.unwrap();
    assert_eq!(quizzes.len(), 1);
    assert_eq!(quizzes[0].id, quiz.id);
    assert_eq!(quizzes[0].title, "AWS SAA Practice Quiz (Complete)");
}

#[tokio::test]
async fn replay_of_empty_quiz_is_rejected() {
    let backend = Arc::new(NumberedBackend::new());
    let quiz = saved_quiz(0);

    let result = SessionOrchestrator::replay(&quiz, generator(&backend), memory_store());
    assert!(matches!(result, Err(SessionError::NoQuestions)));
}

#[tokio::test(start_paused = true)]
async fn resumed_replay_still_marks_its_source_quiz() {
    let backend = Arc::new(NumberedBackend::new());
    let store = memory_store();
    let quiz = saved_quiz(2);
    store.upsert_quiz(quiz.clone()).await.unwrap();

    let mut first = SessionOrchestrator::replay(&quiz, generator(&backend), store.clone()).unwrap();
    first.start().await.unwrap();
    answer_current(&mut first, true).await;
    let snapshot = first.exit().await;
    drop(first);

    let stored = store.load_session(&snapshot.id).await.unwrap().unwrap();
    assert_eq!(stored.source_quiz_id.as_deref(), Some(quiz.id.as_str()));

    let mut resumed = SessionOrchestrator::resume(stored, generator(&backend), store.clone()).unwrap();
    resumed.start().await.unwrap();
    let event = answer_current(&mut resumed, true).await;
    assert!(matches!(event, Some(NavigationEvent::Completed(_))));

    let quizzes = store.load_quizzes().await.unwrap();
    assert_eq!(quizzes.len(), 1);
    assert_eq!(quizzes[0].id, quiz.id);
    assert_eq!(quizzes[0].title, "AWS SAA Practice Quiz (Complete)");
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn resume_reports_why_a_stored_session_is_inconsistent() {
    let backend = Arc::new(NumberedBackend::new());
    let quiz = saved_quiz(3);

    let mut session = QuizSession::new(quiz_config(2));
    session.current_questions = quiz.questions.clone();

    match SessionOrchestrator::resume(session, generator(&backend), memory_store()) {
        Err(SessionError::Corrupt(reason)) => assert!(reason.contains("超过目标数"), "{}", reason),
        Err(other) => panic!("unexpected error: {:?}", other),
        Ok(_) => panic!("inconsistent session was accepted"),
    }
}

#[tokio::test(start_paused = true)]
async fn resume_continues_a_stored_session() {
    let backend = Arc::new(NumberedBackend::new());
    let store = memory_store();

    let mut first =
        SessionOrchestrator::new(quiz_config(3), generator(&backend), store.clone())
            .unwrap()
            .with_stagger(Duration::from_secs(600));
    first.start().await.unwrap();
    answer_current(&mut first, true).await;
    let snapshot = first.exit().await;
    drop(first);

    let stored = store.load_session(&snapshot.id).await.unwrap().unwrap();
    assert_eq!(stored.answers.len(), 1);

    let mut resumed = SessionOrchestrator::resume(stored, generator(&backend), store.clone())
        .unwrap()
        .with_stagger(Duration::from_millis(10));
    resumed.start().await.unwrap();

    assert_eq!(resumed.navigation().current_index(), 1);
    assert_eq!(resumed.score(), 1);
    assert_eq!(resumed.current_question().unwrap().question, "Question 2?");

    answer_current(&mut resumed, true).await;
    let event = answer_current(&mut resumed, false).await;
    assert!(matches!(event, Some(NavigationEvent::Completed(ref a)) if a.len() == 3));
    assert_eq!(resumed.score(), 2);
    assert_eq!(resumed.session().id, snapshot.id);

    let finished = store.load_session(&snapshot.id).await.unwrap().unwrap();
    assert!(finished.completed);
    assert!(matches!(
        SessionOrchestrator::resume(finished, generator(&backend), store),
        Err(SessionError::Finished)
    ));
}

#[tokio::test(start_paused = true)]
async fn restart_requires_all_questions() {
    let backend = Arc::new(NumberedBackend::new());
    let mut pending =
        SessionOrchestrator::new(quiz_config(3), generator(&backend), memory_store())
            .unwrap()
            .with_stagger(Duration::from_secs(600));
    pending.start().await.unwrap();
    assert!(matches!(
        pending.restart(),
        Err(SessionError::QuestionsPending { acquired: 1, target: 3 })
    ));

    let quiz = saved_quiz(1);
    let mut replay = SessionOrchestrator::replay(&quiz, generator(&backend), memory_store()).unwrap();
    replay.start().await.unwrap();
    answer_current(&mut replay, true).await;
    assert!(replay.is_completed());

    replay.restart().unwrap();
    assert_eq!(replay.phase(), &SessionPhase::Ready);
    assert_eq!(replay.score(), 0);
    assert!(replay.session().answers.is_empty());
    assert!(!replay.session().completed);
    assert_eq!(replay.navigation().current_index(), 0);
}

#[tokio::test(start_paused = true)]
async fn exit_mid_session_saves_progress_and_stops_generation() {
    let backend = Arc::new(NumberedBackend::new());
    let store = memory_store();
    let mut orchestrator =
        SessionOrchestrator::new(quiz_config(5), generator(&backend), store.clone())
            .unwrap()
            .with_stagger(Duration::from_secs(600));
    orchestrator.start().await.unwrap();
    answer_current(&mut orchestrator, true).await;

    let snapshot = orchestrator.exit().await;

    assert_eq!(snapshot.answers.len(), 1);
    assert_eq!(orchestrator.phase(), &SessionPhase::Exited);
    assert!(!orchestrator.is_preparing_questions());
    assert!(orchestrator.submit_answer().await.is_none());
    assert!(orchestrator.advance().await.is_none());
    assert_eq!(store.load_session(&snapshot.id).await.unwrap().unwrap(), snapshot);

    sleep(Duration::from_secs(3600)).await;
    assert_eq!(backend.calls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn repeated_submit_and_start_are_ignored() {
    let backend = Arc::new(NumberedBackend::new());
    let mut orchestrator =
        SessionOrchestrator::new(quiz_config(2), generator(&backend), memory_store()).unwrap();
    orchestrator.start().await.unwrap();

    assert!(matches!(
        orchestrator.start().await,
        Err(AppError::Session(SessionError::AlreadyStarted))
    ));

    orchestrator.select_answer(1);
    orchestrator.select_answer(1);
    assert!(orchestrator.submit_answer().await.is_some());
    assert!(orchestrator.submit_answer().await.is_none());
    assert_eq!(orchestrator.session().answers.len(), 1);
}

#[test]
fn invalid_configuration_never_reaches_the_provider() {
    let backend = Arc::new(NumberedBackend::new());

    for count in [0, 21] {
        let result = SessionOrchestrator::new(quiz_config(count), generator(&backend), memory_store());
        assert!(matches!(
            result,
            Err(ConfigError::QuestionCountOutOfRange { .. })
        ));
    }

    let mut missing_key = quiz_config(5);
    missing_key.api_key.clear();
    assert!(matches!(
        SessionOrchestrator::new(missing_key, generator(&backend), memory_store()),
        Err(ConfigError::MissingApiKey)
    ));
    assert!(backend.calls().is_empty());
}
