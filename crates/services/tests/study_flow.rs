use std::sync::Arc;

use async_trait::async_trait;

use services::error::{ExtractionError, GenerationError};
use services::extractor::{ExtractedText, TextExtractor};
use services::generator::{ContentGenerator, QuizQuestion, QuizRequest, ScheduleRequest};
use services::progress_service::{CompleteSessionInput, QuizSubmission, StartSessionInput};
use services::{AppServices, GenerateScheduleInput};
use storage::repository::Storage;
use study_core::model::{
    AnsweredQuestion, Difficulty, LearningStyle, MaterialId, PlanSession, Priority, ScheduleDay,
    SchedulePlan, SessionKind, UserId,
};
use study_core::time::{fixed_clock, fixed_now};

struct StubExtractor;

#[async_trait]
impl TextExtractor for StubExtractor {
    async fn extract(&self, _source: &str) -> Result<ExtractedText, ExtractionError> {
        Ok(ExtractedText {
            text: "Chapter 1. Limits and continuity. Chapter 2. Derivatives.".to_owned(),
            page_count: 24,
        })
    }
}

struct StubGenerator;

#[async_trait]
impl ContentGenerator for StubGenerator {
    async fn generate_quiz(
        &self,
        _material_text: &str,
        _request: &QuizRequest,
    ) -> Result<Vec<QuizQuestion>, GenerationError> {
        Err(GenerationError::Disabled)
    }

    async fn generate_schedule(
        &self,
        _material_text: &str,
        request: &ScheduleRequest,
    ) -> Result<SchedulePlan, GenerationError> {
        let session = |title: &str, kind| PlanSession {
            title: title.to_owned(),
            duration_minutes: 30,
            kind,
            topics: vec!["Limits".to_owned()],
            description: String::new(),
            priority: Priority::High,
        };
        Ok(SchedulePlan {
            total_estimated_hours: 1.5,
            recommended_days_needed: 2,
            days: vec![
                ScheduleDay {
                    day: 1,
                    date: request.start_date,
                    sessions: vec![
                        session("Read the chapter", SessionKind::Reading),
                        session("Work examples", SessionKind::Practice),
                    ],
                    daily_goal: "Understand limits".to_owned(),
                    total_minutes: 60,
                },
                ScheduleDay {
                    day: 2,
                    date: request.start_date.succ_opt().unwrap(),
                    sessions: vec![session("Review notes", SessionKind::Review)],
                    daily_goal: "Consolidate".to_owned(),
                    total_minutes: 30,
                },
            ],
            study_tips: vec!["Short sessions beat marathons".to_owned()],
            milestones: Vec::new(),
        })
    }
}

fn answer(number: u32, topic: &str, correct: bool) -> AnsweredQuestion {
    AnsweredQuestion {
        question_number: number,
        question: format!("Question {number}?"),
        selected_answer: "A".to_owned(),
        correct_answer: if correct { "A" } else { "B" }.to_owned(),
        is_correct: correct,
        topic: Some(topic.to_owned()),
        time_taken_secs: 20,
    }
}

#[tokio::test]
async fn generate_study_complete_and_review_flow() {
    let storage = Storage::in_memory();
    let services = AppServices::with_storage(
        &storage,
        fixed_clock(),
        Arc::new(StubGenerator),
        Arc::new(StubExtractor),
    );

    // Generate and persist a plan for the uploaded material.
    let schedule = services
        .content()
        .generate_schedule(GenerateScheduleInput {
            user_id: UserId::new("u1"),
            material_id: MaterialId::new("m1"),
            material_title: "Calculus".to_owned(),
            source: "uploads/calculus.pdf".to_owned(),
            hours_per_day: 2.0,
            target_date: None,
            difficulty: Difficulty::Medium,
            learning_style: LearningStyle::Balanced,
        })
        .await
        .unwrap();

    assert!(schedule.is_active());
    assert_eq!(schedule.days().len(), 2);
    assert_eq!(schedule.status().total_sessions, 3);

    // Study the first planned session; completion links back to the plan.
    let session = services
        .progress()
        .start_session(StartSessionInput {
            user_id: UserId::new("u1"),
            material_id: MaterialId::new("m1"),
            material_title: "Calculus".to_owned(),
            kind: SessionKind::Reading,
            scheduled_day: Some(1),
            planned_minutes: 30,
            topics: vec!["Limits".to_owned()],
        })
        .await
        .unwrap();
    services
        .progress()
        .complete_session(session.id(), CompleteSessionInput::default())
        .await
        .unwrap();

    let status = services.schedules().get_status(schedule.id()).await.unwrap();
    assert_eq!(status.completed_sessions, 1);
    assert_eq!(status.percent_complete, 33);
    assert_eq!(status.current_day, 1);

    // Take a quiz on the same material.
    services
        .progress()
        .submit_quiz(QuizSubmission {
            user_id: UserId::new("u1"),
            material_id: MaterialId::new("m1"),
            material_title: "Calculus".to_owned(),
            total_questions: 4,
            correct_answers: 3,
            score: 75,
            difficulty: Difficulty::Medium,
            answers: vec![
                answer(1, "Limits", true),
                answer(2, "Limits", true),
                answer(3, "Derivatives", true),
                answer(4, "Derivatives", false),
            ],
            time_spent_secs: 300,
        })
        .await
        .unwrap();

    // The dashboard folds ledger, streak, weak topics, and schedule state.
    let view = services
        .dashboard()
        .compose_dashboard(&UserId::new("u1"), 30)
        .await
        .unwrap();

    assert_eq!(view.analytics.completed_sessions, 1);
    assert_eq!(view.analytics.total_quizzes, 1);
    assert_eq!(view.analytics.average_quiz_score, 75);
    assert_eq!(view.analytics.current_streak, 1);
    assert_eq!(view.user.stats.total_quizzes_taken, 1);

    assert_eq!(view.weak_topics[0].topic, "Derivatives");
    assert_eq!(view.weak_topics[0].accuracy, 50);

    assert_eq!(view.active_schedules.len(), 1);
    assert_eq!(view.active_schedules[0].percent_complete, 33);

    assert_eq!(view.charts.study_time_by_day.len(), 1);
    assert_eq!(view.charts.study_time_by_day[0].date, fixed_now().date_naive());

    // Finish the remaining plan sessions directly; the schedule turns
    // terminal and leaves the active list.
    services
        .schedules()
        .complete_session(schedule.id(), 1, 1)
        .await
        .unwrap();
    let final_status = services
        .schedules()
        .complete_session(schedule.id(), 2, 0)
        .await
        .unwrap();

    assert!(final_status.is_complete);
    assert_eq!(final_status.percent_complete, 100);

    let view = services
        .dashboard()
        .compose_dashboard(&UserId::new("u1"), 30)
        .await
        .unwrap();
    assert!(view.active_schedules.is_empty());
}
