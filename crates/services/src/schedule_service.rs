use std::sync::Arc;

use chrono::{DateTime, Utc};

use study_core::Clock;
use study_core::model::{
    GenerationSettings, MaterialId, Schedule, ScheduleId, SchedulePlan, ScheduleStatus, UserId,
};
use storage::repository::ScheduleRepository;

use crate::error::{ScheduleServiceError, ValidationError};

/// Request to persist a freshly generated plan.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveScheduleInput {
    pub user_id: UserId,
    pub material_id: MaterialId,
    pub material_title: String,
    pub plan: SchedulePlan,
    pub settings: GenerationSettings,
}

/// List row for a user's active schedules.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleOverview {
    pub id: ScheduleId,
    pub material_title: String,
    pub status: ScheduleStatus,
    pub started_at: DateTime<Utc>,
    pub settings: GenerationSettings,
}

/// Owns schedule persistence and progress transitions: starting and
/// completing plan sessions, and the one-active-schedule-per-material
/// invariant.
#[derive(Clone)]
pub struct ScheduleService {
    clock: Clock,
    schedules: Arc<dyn ScheduleRepository>,
}

impl ScheduleService {
    #[must_use]
    pub fn new(clock: Clock, schedules: Arc<dyn ScheduleRepository>) -> Self {
        Self { clock, schedules }
    }

    /// Persists a generated plan as the new active schedule for its
    /// (user, material) pair, deactivating any prior active schedule for
    /// that pair first. The superseded plan keeps no completion timestamp.
    ///
    /// # Errors
    ///
    /// Returns `ScheduleServiceError::Validation` listing missing fields,
    /// or a storage error.
    pub async fn save_schedule(
        &self,
        input: SaveScheduleInput,
    ) -> Result<Schedule, ScheduleServiceError> {
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
        if input.plan.days.is_empty() {
            missing.push("plan.days".to_owned());
        }
        if !missing.is_empty() {
            return Err(ValidationError::new(missing).into());
        }

        self.schedules
            .deactivate_for_material(&input.user_id, &input.material_id)
            .await?;

        let schedule = Schedule::new(
            ScheduleId::generate(),
            input.user_id,
            input.material_id,
            input.material_title,
            input.plan,
            input.settings,
            self.clock.now(),
        );
        self.schedules.insert_schedule(&schedule).await?;

        Ok(schedule)
    }

    /// Records the start of a plan session; repeats are no-ops and skip
    /// the write entirely.
    ///
    /// # Errors
    ///
    /// Returns `ScheduleServiceError::ScheduleNotFound`, a slot error from
    /// the schedule itself, or a storage error.
    pub async fn start_session(
        &self,
        id: ScheduleId,
        day: u32,
        session_index: usize,
    ) -> Result<ScheduleStatus, ScheduleServiceError> {
        let mut schedule = self.load(id).await?;

        if schedule.start_session(day, session_index, self.clock.now())? {
            self.schedules.update_schedule(&schedule).await?;
        }
        Ok(schedule.status())
    }

    /// Records the completion of a plan session and persists the rolled-
    /// forward state. Duplicate completions are no-ops and skip the write.
    ///
    /// # Errors
    ///
    /// Returns `ScheduleServiceError::ScheduleNotFound`, a slot error from
    /// the schedule itself, or a storage error.
    pub async fn complete_session(
        &self,
        id: ScheduleId,
        day: u32,
        session_index: usize,
    ) -> Result<ScheduleStatus, ScheduleServiceError> {
        let mut schedule = self.load(id).await?;

        if schedule.complete_session(day, session_index, self.clock.now())? {
            self.schedules.update_schedule(&schedule).await?;
        }
        Ok(schedule.status())
    }

    /// Pure status read.
    ///
    /// # Errors
    ///
    /// Returns `ScheduleServiceError::ScheduleNotFound` or a storage error.
    pub async fn get_status(&self, id: ScheduleId) -> Result<ScheduleStatus, ScheduleServiceError> {
        Ok(self.load(id).await?.status())
    }

    /// Full schedule fetch for the detail view.
    ///
    /// # Errors
    ///
    /// Returns `ScheduleServiceError::ScheduleNotFound` or a storage error.
    pub async fn get_detail(&self, id: ScheduleId) -> Result<Schedule, ScheduleServiceError> {
        self.load(id).await
    }

    /// A user's active schedules, newest first, shaped for listing.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the query fails.
    pub async fn list_active(
        &self,
        user: &UserId,
    ) -> Result<Vec<ScheduleOverview>, ScheduleServiceError> {
        let schedules = self.schedules.list_active_schedules(user).await?;
        Ok(schedules
            .into_iter()
            .map(|s| ScheduleOverview {
                id: s.id(),
                material_title: s.material_title().to_owned(),
                status: s.status(),
                started_at: s.started_at(),
                settings: s.settings().clone(),
            })
            .collect())
    }

    async fn load(&self, id: ScheduleId) -> Result<Schedule, ScheduleServiceError> {
        self.schedules
            .get_schedule(id)
            .await?
            .ok_or(ScheduleServiceError::ScheduleNotFound(id))
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
