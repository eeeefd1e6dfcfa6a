use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

use crate::model::ids::{MaterialId, ScheduleId, UserId};
use crate::model::session::SessionKind;
use crate::model::user::{Difficulty, LearningStyle};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ScheduleError {
    #[error("schedule has no day {0}")]
    UnknownDay(u32),

    #[error("day {day} has no session at index {index}")]
    SessionIndexOutOfRange { day: u32, index: usize },
}

//
// ─── PLAN STRUCTURE ────────────────────────────────────────────────────────────
//

/// Priority assigned to a plan session by the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

/// One slot within a schedule day. Distinct from a logged `StudySession`;
/// the shared `SessionKind` is what links the two.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSession {
    pub title: String,
    pub duration_minutes: u32,
    pub kind: SessionKind,
    pub topics: Vec<String>,
    pub description: String,
    pub priority: Priority,
}

/// One day of the generated study plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleDay {
    pub day: u32,
    pub date: NaiveDate,
    pub sessions: Vec<PlanSession>,
    pub daily_goal: String,
    pub total_minutes: u32,
}

/// A checkpoint the generator places part-way through the plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub day: u32,
    pub milestone: String,
    pub assessment: String,
}

/// Parameters the schedule was generated with, kept for display and
/// regeneration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSettings {
    pub hours_per_day: f32,
    pub target_date: Option<NaiveDate>,
    pub difficulty: Difficulty,
    pub learning_style: LearningStyle,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            hours_per_day: 2.0,
            target_date: None,
            difficulty: Difficulty::Medium,
            learning_style: LearningStyle::Balanced,
        }
    }
}

/// Validated content of a generated plan, ready to become a `Schedule`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SchedulePlan {
    pub total_estimated_hours: f32,
    pub recommended_days_needed: u32,
    pub days: Vec<ScheduleDay>,
    pub study_tips: Vec<String>,
    pub milestones: Vec<Milestone>,
}

//
// ─── PROGRESS ──────────────────────────────────────────────────────────────────
//

/// Record of one completed (day, sessionIndex) unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedSessionRecord {
    pub day: u32,
    pub session_index: usize,
    pub completed_at: DateTime<Utc>,
}

/// Record of one started (day, sessionIndex) unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartedSessionRecord {
    pub day: u32,
    pub session_index: usize,
    pub started_at: DateTime<Utc>,
}

/// Completion state embedded in a schedule. Mutated only through
/// `Schedule::start_session` / `Schedule::complete_session`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleProgress {
    current_day: u32,
    completed_days: BTreeSet<u32>,
    completed_sessions: Vec<CompletedSessionRecord>,
    started_sessions: Vec<StartedSessionRecord>,
    percent_complete: u8,
}

impl ScheduleProgress {
    fn new() -> Self {
        Self {
            current_day: 1,
            completed_days: BTreeSet::new(),
            completed_sessions: Vec::new(),
            started_sessions: Vec::new(),
            percent_complete: 0,
        }
    }

    /// 1-based pointer to the day the user should work on next.
    #[must_use]
    pub fn current_day(&self) -> u32 {
        self.current_day
    }

    #[must_use]
    pub fn completed_days(&self) -> &BTreeSet<u32> {
        &self.completed_days
    }

    #[must_use]
    pub fn completed_sessions(&self) -> &[CompletedSessionRecord] {
        &self.completed_sessions
    }

    #[must_use]
    pub fn started_sessions(&self) -> &[StartedSessionRecord] {
        &self.started_sessions
    }

    /// Integer percentage in [0, 100], derived after every completion.
    #[must_use]
    pub fn percent_complete(&self) -> u8 {
        self.percent_complete
    }
}

impl Default for ScheduleProgress {
    fn default() -> Self {
        Self::new()
    }
}

//
// ─── STATUS VIEW ───────────────────────────────────────────────────────────────
//

/// Pure read of a schedule's progress, shaped for dashboards and lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleStatus {
    pub current_day: u32,
    pub total_days: u32,
    pub completed_days: u32,
    pub percent_complete: u8,
    pub is_complete: bool,
    pub next_session: Option<PlanSession>,
    pub days_remaining: u32,
    pub total_sessions: u32,
    pub completed_sessions: u32,
}

//
// ─── SCHEDULE ──────────────────────────────────────────────────────────────────
//

/// A multi-day study plan for one (user, material) pair.
///
/// Lifecycle: created active; progressively mutated as plan sessions are
/// started and completed; once every day is complete the schedule turns
/// inactive with a completion timestamp (terminal). A schedule may instead
/// be deactivated without completion when a newer plan for the same
/// material supersedes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    id: ScheduleId,
    user_id: UserId,
    material_id: MaterialId,
    material_title: String,
    total_estimated_hours: f32,
    recommended_days_needed: u32,
    days: Vec<ScheduleDay>,
    study_tips: Vec<String>,
    milestones: Vec<Milestone>,
    settings: GenerationSettings,
    progress: ScheduleProgress,
    active: bool,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl Schedule {
    #[must_use]
    pub fn new(
        id: ScheduleId,
        user_id: UserId,
        material_id: MaterialId,
        material_title: impl Into<String>,
        plan: SchedulePlan,
        settings: GenerationSettings,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            material_id,
            material_title: material_title.into(),
            total_estimated_hours: plan.total_estimated_hours,
            recommended_days_needed: plan.recommended_days_needed,
            days: plan.days,
            study_tips: plan.study_tips,
            milestones: plan.milestones,
            settings,
            progress: ScheduleProgress::new(),
            active: true,
            started_at,
            completed_at: None,
        }
    }

    /// Records that a plan session was started. Idempotent: a repeat start
    /// for the same (day, sessionIndex) pair is a no-op.
    ///
    /// Returns true when a new record was appended.
    ///
    /// # Errors
    ///
    /// Returns `ScheduleError` when the (day, sessionIndex) pair does not
    /// exist in the plan.
    pub fn start_session(
        &mut self,
        day: u32,
        session_index: usize,
        at: DateTime<Utc>,
    ) -> Result<bool, ScheduleError> {
        self.require_slot(day, session_index)?;

        let already = self
            .progress
            .started_sessions
            .iter()
            .any(|r| r.day == day && r.session_index == session_index);
        if already {
            return Ok(false);
        }

        self.progress.started_sessions.push(StartedSessionRecord {
            day,
            session_index,
            started_at: at,
        });
        Ok(true)
    }

    /// Records that a plan session was completed, then rolls the derived
    /// state forward: day completion, current-day advancement, overall
    /// percentage, and the terminal transition once every day is done.
    ///
    /// Completion is idempotent by (day, sessionIndex): a duplicate call is
    /// a no-op and leaves every derived count unchanged.
    ///
    /// Returns true when a new record was appended.
    ///
    /// # Errors
    ///
    /// Returns `ScheduleError` when the (day, sessionIndex) pair does not
    /// exist in the plan.
    pub fn complete_session(
        &mut self,
        day: u32,
        session_index: usize,
        at: DateTime<Utc>,
    ) -> Result<bool, ScheduleError> {
        let day_session_count = self.require_slot(day, session_index)?;

        let already = self
            .progress
            .completed_sessions
            .iter()
            .any(|r| r.day == day && r.session_index == session_index);
        if already {
            return Ok(false);
        }

        self.progress.completed_sessions.push(CompletedSessionRecord {
            day,
            session_index,
            completed_at: at,
        });

        let completed_for_day = self
            .progress
            .completed_sessions
            .iter()
            .filter(|r| r.day == day)
            .count();
        if completed_for_day >= day_session_count && !self.progress.completed_days.contains(&day) {
            self.progress.completed_days.insert(day);
            self.progress.current_day = day + 1;
        }

        let total = self.total_sessions();
        self.progress.percent_complete = if total == 0 {
            0
        } else {
            rounded_percent(self.progress.completed_sessions.len(), total)
        };

        if self.progress.completed_days.len() >= self.days.len() {
            self.completed_at = Some(at);
            self.active = false;
        }

        Ok(true)
    }

    /// Marks this schedule as superseded by a newer plan: inactive, but
    /// without a completion timestamp. Distinguishes "abandoned" from
    /// "finished".
    pub fn deactivate(&mut self) {
        self.active = false;
    }

    /// Pure read of the current progress state.
    #[must_use]
    pub fn status(&self) -> ScheduleStatus {
        let total_days = self.days.len();
        let completed_days = self.progress.completed_days.len();
        let next_session = self
            .days
            .iter()
            .find(|d| d.day == self.progress.current_day)
            .and_then(|d| d.sessions.first())
            .cloned();

        ScheduleStatus {
            current_day: self.progress.current_day,
            total_days: clamp_u32(total_days),
            completed_days: clamp_u32(completed_days),
            percent_complete: self.progress.percent_complete,
            is_complete: self.is_complete(),
            next_session,
            days_remaining: clamp_u32(total_days.saturating_sub(completed_days)),
            total_sessions: clamp_u32(self.total_sessions()),
            completed_sessions: clamp_u32(self.progress.completed_sessions.len()),
        }
    }

    /// Finds the first plan session of `day` with the given kind. This is
    /// the best-effort positional match used when linking a logged study
    /// session back to its schedule slot; when a day holds several sessions
    /// of one kind, the first match wins.
    #[must_use]
    pub fn find_session_index(&self, day: u32, kind: SessionKind) -> Option<usize> {
        self.days
            .iter()
            .find(|d| d.day == day)?
            .sessions
            .iter()
            .position(|s| s.kind == kind)
    }

    /// Whole days since the schedule started, floored; 0 for a schedule
    /// started in the future.
    #[must_use]
    pub fn days_elapsed(&self, now: DateTime<Utc>) -> u32 {
        u32::try_from((now - self.started_at).num_days()).unwrap_or(0)
    }

    #[must_use]
    pub fn total_sessions(&self) -> usize {
        self.days.iter().map(|d| d.sessions.len()).sum()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.active && self.completed_at.is_some()
    }

    fn require_slot(&self, day: u32, session_index: usize) -> Result<usize, ScheduleError> {
        let day_entry = self
            .days
            .iter()
            .find(|d| d.day == day)
            .ok_or(ScheduleError::UnknownDay(day))?;
        if session_index >= day_entry.sessions.len() {
            return Err(ScheduleError::SessionIndexOutOfRange {
                day,
                index: session_index,
            });
        }
        Ok(day_entry.sessions.len())
    }

    #[must_use]
    pub fn id(&self) -> ScheduleId {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    #[must_use]
    pub fn material_id(&self) -> &MaterialId {
        &self.material_id
    }

    #[must_use]
    pub fn material_title(&self) -> &str {
        &self.material_title
    }

    #[must_use]
    pub fn total_estimated_hours(&self) -> f32 {
        self.total_estimated_hours
    }

    #[must_use]
    pub fn recommended_days_needed(&self) -> u32 {
        self.recommended_days_needed
    }

    #[must_use]
    pub fn days(&self) -> &[ScheduleDay] {
        &self.days
    }

    #[must_use]
    pub fn study_tips(&self) -> &[String] {
        &self.study_tips
    }

    #[must_use]
    pub fn milestones(&self) -> &[Milestone] {
        &self.milestones
    }

    #[must_use]
    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    #[must_use]
    pub fn progress(&self) -> &ScheduleProgress {
        &self.progress
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }
}

fn rounded_percent(completed: usize, total: usize) -> u8 {
    #[allow(clippy::cast_possible_truncation)]
    let pct = ((100 * completed + total / 2) / total).min(100) as u8;
    pct
}

fn clamp_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
