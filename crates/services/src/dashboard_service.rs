use std::sync::Arc;

use chrono::{Duration, NaiveDate};

use study_core::Clock;
use study_core::analytics::{
    self, DEFAULT_TREND_LEN, DEFAULT_WEAK_TOPIC_LIMIT, ScorePoint, TopicInsight,
    WeakTopicSummary,
};
use study_core::model::{
    Preferences, QuizResult, Schedule, ScheduleStatus, StudySession, UserId, UserStats,
};
use storage::repository::{
    QuizResultRepository, ScheduleRepository, StudySessionRepository, UserRepository,
};

use crate::error::DashboardError;
use crate::progress_service::get_or_create_user;

/// How many ledger entries the recent-activity block carries.
const RECENT_SESSION_COUNT: usize = 10;
const RECENT_QUIZ_COUNT: usize = 5;

/// How far back the detailed weak-topic analysis reads.
const TOPIC_ANALYSIS_QUIZ_COUNT: u32 = 20;

//
// ─── VIEW SHAPES ───────────────────────────────────────────────────────────────
//

/// The user block of the dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct UserSnapshot {
    pub id: UserId,
    pub preferences: Preferences,
    pub stats: UserStats,
}

/// Headline analytics over the requested window.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsSummary {
    pub time_range_days: u32,
    pub total_study_minutes: u64,
    /// Total study time in hours, rounded to one decimal place.
    pub total_study_hours: f64,
    pub completed_sessions: usize,
    pub total_quizzes: usize,
    pub average_quiz_score: u32,
    pub current_streak: u32,
    pub longest_streak: u32,
}

/// One bar of the study-time chart.
#[derive(Debug, Clone, PartialEq)]
pub struct DayMinutes {
    pub date: NaiveDate,
    pub minutes: u32,
    /// Same value in hours, rounded to one decimal place.
    pub hours: f64,
}

/// Chart inputs, pre-shaped for the UI layer.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardCharts {
    /// Minutes bucketed by calendar date, ascending by date.
    pub study_time_by_day: Vec<DayMinutes>,
    /// Newest-first; callers plotting chronologically must reverse.
    pub quiz_scores_over_time: Vec<ScorePoint>,
}

/// The latest ledger entries, newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct RecentActivity {
    pub sessions: Vec<StudySession>,
    pub quizzes: Vec<QuizResult>,
}

/// Everything the dashboard renders for one user and time window.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub user: UserSnapshot,
    pub analytics: AnalyticsSummary,
    pub weak_topics: Vec<WeakTopicSummary>,
    pub active_schedules: Vec<ScheduleStatus>,
    pub charts: DashboardCharts,
    pub recent_activity: RecentActivity,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Read-only composition of ledger, streak, weak-topic, and schedule state.
/// The only write it ever performs is creating the default user record on
/// first sight of a user id.
#[derive(Clone)]
pub struct DashboardService {
    clock: Clock,
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn StudySessionRepository>,
    quiz_results: Arc<dyn QuizResultRepository>,
    schedules: Arc<dyn ScheduleRepository>,
    weak_topic_limit: usize,
}

impl DashboardService {
    #[must_use]
    pub fn new(
        clock: Clock,
        users: Arc<dyn UserRepository>,
        sessions: Arc<dyn StudySessionRepository>,
        quiz_results: Arc<dyn QuizResultRepository>,
        schedules: Arc<dyn ScheduleRepository>,
    ) -> Self {
        Self {
            clock,
            users,
            sessions,
            quiz_results,
            schedules,
            weak_topic_limit: DEFAULT_WEAK_TOPIC_LIMIT,
        }
    }

    /// Overrides how many weakest topics the dashboard shows.
    #[must_use]
    pub fn with_weak_topic_limit(mut self, limit: usize) -> Self {
        self.weak_topic_limit = limit;
        self
    }

    /// Builds the dashboard for `user_id` over the trailing
    /// `time_range_days` window.
    ///
    /// # Errors
    ///
    /// Returns `DashboardError::Storage` when any read fails.
    pub async fn compose_dashboard(
        &self,
        user_id: &UserId,
        time_range_days: u32,
    ) -> Result<DashboardView, DashboardError> {
        let now = self.clock.now();
        let from = now - Duration::days(i64::from(time_range_days));

        let user = get_or_create_user(self.users.as_ref(), user_id, now).await?;
        let sessions = self.sessions.list_sessions_since(user_id, from).await?;
        let quizzes = self.quiz_results.list_results_since(user_id, from).await?;
        let schedules = self.schedules.list_active_schedules(user_id).await?;

        let total_study_minutes = analytics::total_study_minutes(&sessions);
        let study_time_by_day = analytics::bucket_study_minutes(&sessions)
            .into_iter()
            .map(|(date, minutes)| DayMinutes {
                date,
                minutes,
                hours: tenth_hours(u64::from(minutes)),
            })
            .collect();

        let summary = AnalyticsSummary {
            time_range_days,
            total_study_minutes,
            total_study_hours: tenth_hours(total_study_minutes),
            completed_sessions: sessions.iter().filter(|s| s.is_completed()).count(),
            total_quizzes: quizzes.len(),
            average_quiz_score: analytics::average_quiz_score(&quizzes),
            current_streak: user.stats.current_streak,
            longest_streak: user.stats.longest_streak,
        };

        Ok(DashboardView {
            user: UserSnapshot {
                id: user.id.clone(),
                preferences: user.preferences.clone(),
                stats: user.stats.clone(),
            },
            analytics: summary,
            weak_topics: analytics::aggregate_weak_topics(&quizzes, self.weak_topic_limit),
            active_schedules: schedules.iter().map(Schedule::status).collect(),
            charts: DashboardCharts {
                study_time_by_day,
                quiz_scores_over_time: analytics::quiz_scores_over_time(&quizzes),
            },
            recent_activity: RecentActivity {
                sessions: sessions.into_iter().take(RECENT_SESSION_COUNT).collect(),
                quizzes: quizzes.into_iter().take(RECENT_QUIZ_COUNT).collect(),
            },
        })
    }

    /// Detailed weak-topic analysis over the user's recent quiz history.
    ///
    /// # Errors
    ///
    /// Returns `DashboardError::Storage` when the read fails.
    pub async fn weak_topic_report(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<TopicInsight>, DashboardError> {
        let results = self
            .quiz_results
            .list_recent_results(user_id, TOPIC_ANALYSIS_QUIZ_COUNT)
            .await?;
        Ok(analytics::analyze_topics(&results, DEFAULT_TREND_LEN))
    }
}

#[allow(clippy::cast_precision_loss)]
fn tenth_hours(minutes: u64) -> f64 {
    ((minutes as f64) / 60.0 * 10.0).round() / 10.0
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use storage::repository::Storage;
    use study_core::model::{
        AnsweredQuestion, Difficulty, GenerationSettings, MaterialId, PlanSession, Priority,
        QuizResultId, QuizSummary, Schedule, ScheduleDay, ScheduleId, SchedulePlan, SessionId,
        SessionKind,
    };
    use study_core::time::{fixed_clock, fixed_now};

    fn service(storage: &Storage) -> DashboardService {
        DashboardService::new(
            fixed_clock(),
            Arc::clone(&storage.users),
            Arc::clone(&storage.sessions),
            Arc::clone(&storage.quiz_results),
            Arc::clone(&storage.schedules),
        )
    }

    fn answer(topic: &str, correct: bool) -> AnsweredQuestion {
        AnsweredQuestion {
            question_number: 1,
            question: "Q?".to_owned(),
            selected_answer: "A".to_owned(),
            correct_answer: "A".to_owned(),
            is_correct: correct,
            topic: Some(topic.to_owned()),
            time_taken_secs: 10,
        }
    }

    async fn seed_session(
        storage: &Storage,
        offset_days: i64,
        planned: u32,
        complete_minutes: Option<i64>,
    ) -> StudySession {
        let started = fixed_now() - Duration::days(offset_days);
        let mut session = StudySession::start(
            SessionId::generate(),
            UserId::new("u1"),
            MaterialId::new("m1"),
            "Material",
            SessionKind::Reading,
            None,
            planned,
            Vec::new(),
            started,
        )
        .unwrap();
        if let Some(minutes) = complete_minutes {
            session
                .complete(Some(started + Duration::minutes(minutes)), None, None)
                .unwrap();
        }
        storage.sessions.insert_session(&session).await.unwrap();
        session
    }

    async fn seed_quiz(
        storage: &Storage,
        offset_days: i64,
        score: u32,
        answers: Vec<AnsweredQuestion>,
    ) {
        let total = u32::try_from(answers.len()).unwrap();
        let correct = u32::try_from(answers.iter().filter(|a| a.is_correct).count()).unwrap();
        let result = QuizResult::new(
            QuizResultId::generate(),
            UserId::new("u1"),
            MaterialId::new("m1"),
            "Material",
            QuizSummary::new(total, correct, score, Difficulty::Medium).unwrap(),
            answers,
            90,
            fixed_now() - Duration::days(offset_days),
        );
        storage.quiz_results.insert_result(&result).await.unwrap();
    }

    async fn seed_schedule(storage: &Storage) -> Schedule {
        let plan = SchedulePlan {
            days: vec![ScheduleDay {
                day: 1,
                date: fixed_now().date_naive(),
                sessions: vec![PlanSession {
                    title: "Read".to_owned(),
                    duration_minutes: 30,
                    kind: SessionKind::Reading,
                    topics: Vec::new(),
                    description: String::new(),
                    priority: Priority::Medium,
                }],
                daily_goal: String::new(),
                total_minutes: 30,
            }],
            ..SchedulePlan::default()
        };
        let schedule = Schedule::new(
            ScheduleId::generate(),
            UserId::new("u1"),
            MaterialId::new("m1"),
            "Material",
            plan,
            GenerationSettings::default(),
            fixed_now(),
        );
        storage.schedules.insert_schedule(&schedule).await.unwrap();
        schedule
    }

    #[tokio::test]
    async fn dashboard_composes_window_and_totals() {
        let storage = Storage::in_memory();

        seed_session(&storage, 0, 30, Some(25)).await;
        seed_session(&storage, 2, 45, None).await;
        // Outside the 7-day window, must not count.
        seed_session(&storage, 30, 500, Some(500)).await;

        seed_quiz(&storage, 1, 80, vec![answer("Algebra", true)]).await;
        seed_quiz(&storage, 3, 40, vec![answer("Algebra", false)]).await;
        seed_schedule(&storage).await;

        let view = service(&storage)
            .compose_dashboard(&UserId::new("u1"), 7)
            .await
            .unwrap();

        assert_eq!(view.analytics.time_range_days, 7);
        assert_eq!(view.analytics.total_study_minutes, 70);
        assert!((view.analytics.total_study_hours - 1.2).abs() < 1e-9);
        assert_eq!(view.analytics.completed_sessions, 1);
        assert_eq!(view.analytics.total_quizzes, 2);
        assert_eq!(view.analytics.average_quiz_score, 60);

        // Cross-quiz weak topics: 1 of 2 Algebra answers correct.
        assert_eq!(view.weak_topics.len(), 1);
        assert_eq!(view.weak_topics[0].topic, "Algebra");
        assert_eq!(view.weak_topics[0].accuracy, 50);

        assert_eq!(view.active_schedules.len(), 1);
        assert_eq!(view.active_schedules[0].total_sessions, 1);

        // Charts: two in-window study days ascending, scores newest-first.
        assert_eq!(view.charts.study_time_by_day.len(), 2);
        assert!(view.charts.study_time_by_day[0].date < view.charts.study_time_by_day[1].date);
        assert_eq!(view.charts.quiz_scores_over_time.len(), 2);
        assert_eq!(view.charts.quiz_scores_over_time[0].score, 80);

        // Recent activity is newest-first.
        assert_eq!(view.recent_activity.sessions.len(), 2);
        assert!(
            view.recent_activity.sessions[0].started_at()
                > view.recent_activity.sessions[1].started_at()
        );
        assert_eq!(view.recent_activity.quizzes.len(), 2);
    }

    #[tokio::test]
    async fn dashboard_for_unknown_user_creates_the_record() {
        let storage = Storage::in_memory();

        let view = service(&storage)
            .compose_dashboard(&UserId::new("fresh"), 30)
            .await
            .unwrap();

        assert_eq!(view.analytics.total_study_minutes, 0);
        assert_eq!(view.analytics.average_quiz_score, 0);
        assert!(view.weak_topics.is_empty());
        assert!(view.recent_activity.sessions.is_empty());

        // The get-or-create write is visible to later reads.
        assert!(
            storage
                .users
                .get_user(&UserId::new("fresh"))
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn recent_activity_is_capped() {
        let storage = Storage::in_memory();
        for n in 0..12 {
            seed_session(&storage, 0, 10 + n, None).await;
        }

        let view = service(&storage)
            .compose_dashboard(&UserId::new("u1"), 7)
            .await
            .unwrap();
        assert_eq!(view.recent_activity.sessions.len(), 10);
    }

    #[tokio::test]
    async fn weak_topic_limit_is_configurable() {
        let storage = Storage::in_memory();
        let answers = (0..8)
            .map(|n| answer(&format!("Topic {n}"), false))
            .collect();
        seed_quiz(&storage, 0, 0, answers).await;

        let view = service(&storage)
            .with_weak_topic_limit(3)
            .compose_dashboard(&UserId::new("u1"), 7)
            .await
            .unwrap();
        assert_eq!(view.weak_topics.len(), 3);
    }

    #[tokio::test]
    async fn topic_report_reads_recent_history() {
        let storage = Storage::in_memory();
        seed_quiz(&storage, 0, 50, vec![answer("Algebra", false)]).await;
        seed_quiz(&storage, 1, 50, vec![answer("Algebra", true)]).await;

        let report = service(&storage)
            .weak_topic_report(&UserId::new("u1"))
            .await
            .unwrap();

        assert_eq!(report.len(), 1);
        assert_eq!(report[0].total_questions, 2);
        assert_eq!(report[0].accuracy, 50);
        assert!(report[0].needs_review);
        assert_eq!(report[0].trend.len(), 2);
        // Newest attempt last.
        assert!(!report[0].trend[1].correct);
    }
}
