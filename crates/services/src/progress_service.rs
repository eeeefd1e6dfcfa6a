use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;

use study_core::Clock;
use study_core::model::{
    AnsweredQuestion, Difficulty, MaterialId, QuizResult, QuizResultId, QuizSummary, SelfRating,
    SessionId, SessionKind, StudySession, User, UserId,
};
use storage::repository::{
    QuizResultRepository, ScheduleRepository, StorageError, StudySessionRepository,
    UserRepository,
};

use crate::error::{ProgressError, ValidationError};

//
// ─── INPUTS ────────────────────────────────────────────────────────────────────
//

/// Request to open a study session.
#[derive(Debug, Clone, PartialEq)]
pub struct StartSessionInput {
    pub user_id: UserId,
    pub material_id: MaterialId,
    pub material_title: String,
    pub kind: SessionKind,
    pub scheduled_day: Option<u32>,
    pub planned_minutes: u32,
    pub topics: Vec<String>,
}

/// Request to close a study session. Without an explicit end time the
/// service clock supplies one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompleteSessionInput {
    pub ended_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub rating: Option<SelfRating>,
}

/// Request to record a finished quiz attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizSubmission {
    pub user_id: UserId,
    pub material_id: MaterialId,
    pub material_title: String,
    pub total_questions: u32,
    pub correct_answers: u32,
    pub score: u32,
    pub difficulty: Difficulty,
    pub answers: Vec<AnsweredQuestion>,
    pub time_spent_secs: u32,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Append-only ledger of study-session and quiz attempts.
///
/// Recording a completion also rolls the user's aggregate stats and streak
/// forward, and best-effort links the session back to its schedule slot.
/// Those side effects are non-critical: a persistence failure there is
/// logged and swallowed so the primary write still succeeds.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn StudySessionRepository>,
    quiz_results: Arc<dyn QuizResultRepository>,
    schedules: Arc<dyn ScheduleRepository>,
}

impl ProgressService {
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
        }
    }

    /// Opens a study session and appends it to the ledger.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Validation` listing every missing field, or
    /// a storage error when the insert fails.
    pub async fn start_session(
        &self,
        input: StartSessionInput,
    ) -> Result<StudySession, ProgressError> {
        let mut missing = Vec::new();
        if input.user_id.is_blank() {
            missing.push("user_id".to_owned());
        }
        if input.material_id.is_blank() {
            missing.push("material_id".to_owned());
        }
        if input.material_title.trim().is_empty() {
            missing.push("material_title".to_owned());
        }
        if input.planned_minutes == 0 {
            missing.push("planned_minutes".to_owned());
        }
        if !missing.is_empty() {
            return Err(ValidationError::new(missing).into());
        }

        let session = StudySession::start(
            SessionId::generate(),
            input.user_id,
            input.material_id,
            input.material_title,
            input.kind,
            input.scheduled_day,
            input.planned_minutes,
            input.topics,
            self.clock.now(),
        )?;

        self.sessions.insert_session(&session).await?;
        Ok(session)
    }

    /// Completes a previously started session.
    ///
    /// The session write is fatal on failure; the user-stat update and the
    /// schedule link are logged and swallowed.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::SessionNotFound` for an unknown id,
    /// `ProgressError::Session` for a second completion, or a storage
    /// error when the primary write fails.
    pub async fn complete_session(
        &self,
        id: SessionId,
        input: CompleteSessionInput,
    ) -> Result<StudySession, ProgressError> {
        let mut session = self
            .sessions
            .get_session(id)
            .await?
            .ok_or(ProgressError::SessionNotFound(id))?;

        let ended_at = input.ended_at.unwrap_or_else(|| self.clock.now());
        let actual = session.complete(Some(ended_at), input.notes, input.rating)?;

        self.sessions.update_session(&session).await?;

        if let Err(e) = self.apply_study_side_effects(session.user_id(), actual).await {
            warn!(
                user = %session.user_id(),
                error = %e,
                "user stats update after session completion failed; continuing"
            );
        }
        if let Some(day) = session.scheduled_day() {
            if let Err(e) = self.link_schedule_completion(&session, day).await {
                warn!(
                    user = %session.user_id(),
                    day,
                    error = %e,
                    "schedule link for completed session failed; continuing"
                );
            }
        }

        Ok(session)
    }

    /// Records a completed quiz attempt. Weak topics are derived as part
    /// of constructing the result; callers never invoke that separately.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Validation` listing every missing field,
    /// `ProgressError::Quiz` for inconsistent summary numbers, or a
    /// storage error when the insert fails.
    pub async fn submit_quiz(
        &self,
        submission: QuizSubmission,
    ) -> Result<QuizResult, ProgressError> {
        let mut missing = Vec::new();
        if submission.user_id.is_blank() {
            missing.push("user_id".to_owned());
        }
        if submission.material_id.is_blank() {
            missing.push("material_id".to_owned());
        }
        if submission.material_title.trim().is_empty() {
            missing.push("material_title".to_owned());
        }
        if submission.total_questions == 0 {
            missing.push("total_questions".to_owned());
        }
        if !missing.is_empty() {
            return Err(ValidationError::new(missing).into());
        }

        let summary = QuizSummary::new(
            submission.total_questions,
            submission.correct_answers,
            submission.score,
            submission.difficulty,
        )?;

        let now = self.clock.now();
        let result = QuizResult::new(
            QuizResultId::generate(),
            submission.user_id,
            submission.material_id,
            submission.material_title,
            summary,
            submission.answers,
            submission.time_spent_secs,
            now,
        );

        self.quiz_results.insert_result(&result).await?;

        if let Err(e) = self.apply_quiz_side_effects(result.user_id(), summary.score()).await {
            warn!(
                user = %result.user_id(),
                error = %e,
                "user stats update after quiz submission failed; continuing"
            );
        }

        Ok(result)
    }

    async fn apply_study_side_effects(
        &self,
        user_id: &UserId,
        actual_minutes: u32,
    ) -> Result<(), StorageError> {
        let now = self.clock.now();
        let mut user = get_or_create_user(self.users.as_ref(), user_id, now).await?;
        user.stats.add_study_minutes(actual_minutes);
        user.stats.record_study_event(now);
        user.touch(now);
        self.users.upsert_user(&user).await
    }

    async fn apply_quiz_side_effects(
        &self,
        user_id: &UserId,
        score: u8,
    ) -> Result<(), StorageError> {
        let now = self.clock.now();
        let mut user = get_or_create_user(self.users.as_ref(), user_id, now).await?;
        user.stats.record_quiz_score(score);
        user.stats.record_study_event(now);
        user.touch(now);
        self.users.upsert_user(&user).await
    }

    /// Best-effort match of a completed study session onto its schedule
    /// slot: day entry by number, then the first plan session of the same
    /// kind. No active schedule or no matching slot is a quiet no-op.
    async fn link_schedule_completion(
        &self,
        session: &StudySession,
        day: u32,
    ) -> Result<(), StorageError> {
        let Some(mut schedule) = self
            .schedules
            .find_active_for_material(session.user_id(), session.material_id())
            .await?
        else {
            return Ok(());
        };
        let Some(index) = schedule.find_session_index(day, session.kind()) else {
            return Ok(());
        };

        if let Ok(true) = schedule.complete_session(day, index, self.clock.now()) {
            self.schedules.update_schedule(&schedule).await?;
        }
        Ok(())
    }
}

/// Fetches a user, creating the default record on first reference.
pub(crate) async fn get_or_create_user(
    users: &dyn UserRepository,
    id: &UserId,
    now: DateTime<Utc>,
) -> Result<User, StorageError> {
    match users.get_user(id).await? {
        Some(user) => Ok(user),
        None => {
            let user = User::new(id.clone(), now);
            users.upsert_user(&user).await?;
            Ok(user)
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
