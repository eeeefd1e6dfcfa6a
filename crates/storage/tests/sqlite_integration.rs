use chrono::Duration;
use study_core::model::{
    AnsweredQuestion, Difficulty, GenerationSettings, MaterialId, PlanSession, Priority,
    QuizResult, QuizResultId, QuizSummary, Schedule, ScheduleDay, ScheduleId, SchedulePlan,
    SessionId, SessionKind, StudySession, User, UserId,
};
use study_core::time::fixed_now;
use storage::repository::{
    QuizResultRepository, ScheduleRepository, StorageError, StudySessionRepository,
    UserRepository,
};
use storage::sqlite::SqliteRepository;

fn build_session(user: &str, offset_minutes: i64) -> StudySession {
    StudySession::start(
        SessionId::generate(),
        UserId::new(user),
        MaterialId::new("m1"),
        "Material",
        SessionKind::Reading,
        Some(1),
        30,
        vec!["Topic".to_owned()],
        fixed_now() + Duration::minutes(offset_minutes),
    )
    .unwrap()
}

fn build_quiz(user: &str, offset_days: i64) -> QuizResult {
    let answers = vec![AnsweredQuestion {
        question_number: 1,
        question: "Q?".to_owned(),
        selected_answer: "A".to_owned(),
        correct_answer: "A".to_owned(),
        is_correct: true,
        topic: Some("Topic".to_owned()),
        time_taken_secs: 15,
    }];
    QuizResult::new(
        QuizResultId::generate(),
        UserId::new(user),
        MaterialId::new("m1"),
        "Material",
        QuizSummary::new(1, 1, 100, Difficulty::Medium).unwrap(),
        answers,
        60,
        fixed_now() + Duration::days(offset_days),
    )
}

fn build_schedule(user: &str, material: &str, offset_minutes: i64) -> Schedule {
    let plan = SchedulePlan {
        total_estimated_hours: 1.0,
        recommended_days_needed: 1,
        days: vec![ScheduleDay {
            day: 1,
            date: fixed_now().date_naive(),
            sessions: vec![PlanSession {
                title: "Read".to_owned(),
                duration_minutes: 60,
                kind: SessionKind::Reading,
                topics: vec!["Topic".to_owned()],
                description: String::new(),
                priority: Priority::High,
            }],
            daily_goal: "Finish chapter one".to_owned(),
            total_minutes: 60,
        }],
        study_tips: vec!["Take breaks".to_owned()],
        milestones: Vec::new(),
    };
    Schedule::new(
        ScheduleId::generate(),
        UserId::new(user),
        MaterialId::new(material),
        "Material",
        plan,
        GenerationSettings::default(),
        fixed_now() + Duration::minutes(offset_minutes),
    )
}

#[tokio::test]
async fn sqlite_roundtrips_users_and_sessions() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_sessions?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let mut user = User::new(UserId::new("u1"), fixed_now());
    repo.upsert_user(&user).await.unwrap();

    user.stats.record_study_event(fixed_now());
    user.touch(fixed_now());
    repo.upsert_user(&user).await.unwrap();

    let fetched = repo.get_user(&UserId::new("u1")).await.unwrap().unwrap();
    assert_eq!(fetched.stats.current_streak, 1);
    assert_eq!(fetched, user);

    let mut session = build_session("u1", 0);
    repo.insert_session(&session).await.unwrap();
    assert!(matches!(
        repo.insert_session(&session).await,
        Err(StorageError::Conflict)
    ));

    session
        .complete(Some(fixed_now() + Duration::minutes(25)), None, None)
        .unwrap();
    repo.update_session(&session).await.unwrap();

    let stored = repo.get_session(session.id()).await.unwrap().unwrap();
    assert!(stored.is_completed());
    assert_eq!(stored.actual_minutes(), Some(25));
    assert_eq!(stored, session);
}

#[tokio::test]
async fn sqlite_session_window_is_newest_first() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_window?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let old = build_session("u1", -120);
    let newer = build_session("u1", 0);
    let newest = build_session("u1", 45);
    for s in [&old, &newer, &newest] {
        repo.insert_session(s).await.unwrap();
    }

    let listed = repo
        .list_sessions_since(&UserId::new("u1"), fixed_now() - Duration::minutes(30))
        .await
        .unwrap();

    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id(), newest.id());
    assert_eq!(listed[1].id(), newer.id());
}

#[tokio::test]
async fn sqlite_quiz_queries_order_and_limit() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_quiz?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let day0 = build_quiz("u1", 0);
    let day1 = build_quiz("u1", 1);
    let day2 = build_quiz("u1", 2);
    for q in [&day0, &day1, &day2] {
        repo.insert_result(q).await.unwrap();
    }

    let windowed = repo
        .list_results_since(&UserId::new("u1"), fixed_now() + Duration::days(1))
        .await
        .unwrap();
    assert_eq!(windowed.len(), 2);
    assert_eq!(windowed[0].id(), day2.id());
    assert_eq!(windowed[1].id(), day1.id());

    let recent = repo
        .list_recent_results(&UserId::new("u1"), 2)
        .await
        .unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].id(), day2.id());

    // Weak topics survive the document round trip.
    assert_eq!(recent[0].weak_topics().len(), 1);
    assert_eq!(recent[0].weak_topics()[0].accuracy, 100);
}

#[tokio::test]
async fn sqlite_schedule_active_queries_and_deactivation() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_sched?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let first = build_schedule("u1", "m1", 0);
    repo.insert_schedule(&first).await.unwrap();

    // Saving a replacement plan deactivates the old one first.
    let touched = repo
        .deactivate_for_material(&UserId::new("u1"), &MaterialId::new("m1"))
        .await
        .unwrap();
    assert_eq!(touched, 1);

    let second = build_schedule("u1", "m1", 10);
    repo.insert_schedule(&second).await.unwrap();

    let active = repo
        .find_active_for_material(&UserId::new("u1"), &MaterialId::new("m1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(active.id(), second.id());

    let superseded = repo.get_schedule(first.id()).await.unwrap().unwrap();
    assert!(!superseded.is_active());
    assert!(superseded.completed_at().is_none());

    // Completing the only session flips the document and the active column.
    let mut active = active;
    active.complete_session(1, 0, fixed_now()).unwrap();
    repo.update_schedule(&active).await.unwrap();

    assert!(
        repo.list_active_schedules(&UserId::new("u1"))
            .await
            .unwrap()
            .is_empty()
    );
    let finished = repo.get_schedule(second.id()).await.unwrap().unwrap();
    assert!(finished.is_complete());
    assert_eq!(finished.progress().percent_complete(), 100);
}
