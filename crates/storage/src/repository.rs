use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use study_core::model::{
    MaterialId, QuizResult, QuizResultId, Schedule, ScheduleId, SessionId, StudySession, User,
    UserId,
};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Repository contract for user records.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fetch a user by id, `None` when the user has never been stored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn get_user(&self, id: &UserId) -> Result<Option<User>, StorageError>;

    /// Persist or update a user record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the user cannot be stored.
    async fn upsert_user(&self, user: &User) -> Result<(), StorageError>;
}

/// Repository contract for the study-session ledger.
#[async_trait]
pub trait StudySessionRepository: Send + Sync {
    /// Append a newly started session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the id already exists.
    async fn insert_session(&self, session: &StudySession) -> Result<(), StorageError>;

    /// Fetch a session by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn get_session(&self, id: SessionId) -> Result<Option<StudySession>, StorageError>;

    /// Replace a stored session (used for the single completion mutation).
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the session was never inserted.
    async fn update_session(&self, session: &StudySession) -> Result<(), StorageError>;

    /// Sessions for a user started at or after `from`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_sessions_since(
        &self,
        user: &UserId,
        from: DateTime<Utc>,
    ) -> Result<Vec<StudySession>, StorageError>;
}

/// Repository contract for completed quiz attempts.
#[async_trait]
pub trait QuizResultRepository: Send + Sync {
    /// Append a completed quiz attempt.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the id already exists.
    async fn insert_result(&self, result: &QuizResult) -> Result<(), StorageError>;

    /// Results for a user completed at or after `from`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_results_since(
        &self,
        user: &UserId,
        from: DateTime<Utc>,
    ) -> Result<Vec<QuizResult>, StorageError>;

    /// The user's most recent results, newest first, capped at `limit`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_recent_results(
        &self,
        user: &UserId,
        limit: u32,
    ) -> Result<Vec<QuizResult>, StorageError>;
}

/// Repository contract for study schedules.
#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    /// Persist a freshly generated schedule.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the id already exists.
    async fn insert_schedule(&self, schedule: &Schedule) -> Result<(), StorageError>;

    /// Fetch a schedule by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn get_schedule(&self, id: ScheduleId) -> Result<Option<Schedule>, StorageError>;

    /// Replace a stored schedule after a progress mutation.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the schedule was never inserted.
    async fn update_schedule(&self, schedule: &Schedule) -> Result<(), StorageError>;

    /// All active schedules for a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_active_schedules(&self, user: &UserId) -> Result<Vec<Schedule>, StorageError>;

    /// The active schedule for one (user, material) pair, if any. At most
    /// one exists; with a racy store the newest wins.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn find_active_for_material(
        &self,
        user: &UserId,
        material: &MaterialId,
    ) -> Result<Option<Schedule>, StorageError>;

    /// Deactivate every active schedule for one (user, material) pair,
    /// returning how many were touched. Deactivation does not set a
    /// completion timestamp.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn deactivate_for_material(
        &self,
        user: &UserId,
        material: &MaterialId,
    ) -> Result<u64, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    users: Arc<Mutex<HashMap<UserId, User>>>,
    sessions: Arc<Mutex<HashMap<SessionId, StudySession>>>,
    quiz_results: Arc<Mutex<HashMap<QuizResultId, QuizResult>>>,
    schedules: Arc<Mutex<HashMap<ScheduleId, Schedule>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<std::sync::MutexGuard<'_, T>, StorageError> {
    mutex.lock().map_err(|e| StorageError::Connection(e.to_string()))
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn get_user(&self, id: &UserId) -> Result<Option<User>, StorageError> {
        let guard = lock(&self.users)?;
        Ok(guard.get(id).cloned())
    }

    async fn upsert_user(&self, user: &User) -> Result<(), StorageError> {
        let mut guard = lock(&self.users)?;
        guard.insert(user.id.clone(), user.clone());
        Ok(())
    }
}

#[async_trait]
impl StudySessionRepository for InMemoryRepository {
    async fn insert_session(&self, session: &StudySession) -> Result<(), StorageError> {
        let mut guard = lock(&self.sessions)?;
        if guard.contains_key(&session.id()) {
            return Err(StorageError::Conflict);
        }
        guard.insert(session.id(), session.clone());
        Ok(())
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<StudySession>, StorageError> {
        let guard = lock(&self.sessions)?;
        Ok(guard.get(&id).cloned())
    }

    async fn update_session(&self, session: &StudySession) -> Result<(), StorageError> {
        let mut guard = lock(&self.sessions)?;
        if !guard.contains_key(&session.id()) {
            return Err(StorageError::NotFound);
        }
        guard.insert(session.id(), session.clone());
        Ok(())
    }

    async fn list_sessions_since(
        &self,
        user: &UserId,
        from: DateTime<Utc>,
    ) -> Result<Vec<StudySession>, StorageError> {
        let guard = lock(&self.sessions)?;
        let mut found: Vec<StudySession> = guard
            .values()
            .filter(|s| s.user_id() == user && s.started_at() >= from)
            .cloned()
            .collect();
        found.sort_by_key(|s| std::cmp::Reverse(s.started_at()));
        Ok(found)
    }
}

#[async_trait]
impl QuizResultRepository for InMemoryRepository {
    async fn insert_result(&self, result: &QuizResult) -> Result<(), StorageError> {
        let mut guard = lock(&self.quiz_results)?;
        if guard.contains_key(&result.id()) {
            return Err(StorageError::Conflict);
        }
        guard.insert(result.id(), result.clone());
        Ok(())
    }

    async fn list_results_since(
        &self,
        user: &UserId,
        from: DateTime<Utc>,
    ) -> Result<Vec<QuizResult>, StorageError> {
        let guard = lock(&self.quiz_results)?;
        let mut found: Vec<QuizResult> = guard
            .values()
            .filter(|r| r.user_id() == user && r.completed_at() >= from)
            .cloned()
            .collect();
        found.sort_by_key(|r| std::cmp::Reverse(r.completed_at()));
        Ok(found)
    }

    async fn list_recent_results(
        &self,
        user: &UserId,
        limit: u32,
    ) -> Result<Vec<QuizResult>, StorageError> {
        let guard = lock(&self.quiz_results)?;
        let mut found: Vec<QuizResult> = guard
            .values()
            .filter(|r| r.user_id() == user)
            .cloned()
            .collect();
        found.sort_by_key(|r| std::cmp::Reverse(r.completed_at()));
        found.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(found)
    }
}

#[async_trait]
impl ScheduleRepository for InMemoryRepository {
    async fn insert_schedule(&self, schedule: &Schedule) -> Result<(), StorageError> {
        let mut guard = lock(&self.schedules)?;
        if guard.contains_key(&schedule.id()) {
            return Err(StorageError::Conflict);
        }
        guard.insert(schedule.id(), schedule.clone());
        Ok(())
    }

    async fn get_schedule(&self, id: ScheduleId) -> Result<Option<Schedule>, StorageError> {
        let guard = lock(&self.schedules)?;
        Ok(guard.get(&id).cloned())
    }

    async fn update_schedule(&self, schedule: &Schedule) -> Result<(), StorageError> {
        let mut guard = lock(&self.schedules)?;
        if !guard.contains_key(&schedule.id()) {
            return Err(StorageError::NotFound);
        }
        guard.insert(schedule.id(), schedule.clone());
        Ok(())
    }

    async fn list_active_schedules(&self, user: &UserId) -> Result<Vec<Schedule>, StorageError> {
        let guard = lock(&self.schedules)?;
        let mut found: Vec<Schedule> = guard
            .values()
            .filter(|s| s.user_id() == user && s.is_active())
            .cloned()
            .collect();
        found.sort_by_key(|s| std::cmp::Reverse(s.started_at()));
        Ok(found)
    }

    async fn find_active_for_material(
        &self,
        user: &UserId,
        material: &MaterialId,
    ) -> Result<Option<Schedule>, StorageError> {
        let guard = lock(&self.schedules)?;
        let found = guard
            .values()
            .filter(|s| s.user_id() == user && s.material_id() == material && s.is_active())
            .max_by_key(|s| s.started_at())
            .cloned();
        Ok(found)
    }

    async fn deactivate_for_material(
        &self,
        user: &UserId,
        material: &MaterialId,
    ) -> Result<u64, StorageError> {
        let mut guard = lock(&self.schedules)?;
        let mut touched = 0;
        for schedule in guard.values_mut() {
            if schedule.user_id() == user && schedule.material_id() == material
                && schedule.is_active()
            {
                schedule.deactivate();
                touched += 1;
            }
        }
        Ok(touched)
    }
}

/// Aggregates the per-entity repositories behind trait objects for easy
/// backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub users: Arc<dyn UserRepository>,
    pub sessions: Arc<dyn StudySessionRepository>,
    pub quiz_results: Arc<dyn QuizResultRepository>,
    pub schedules: Arc<dyn ScheduleRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let users: Arc<dyn UserRepository> = Arc::new(repo.clone());
        let sessions: Arc<dyn StudySessionRepository> = Arc::new(repo.clone());
        let quiz_results: Arc<dyn QuizResultRepository> = Arc::new(repo.clone());
        let schedules: Arc<dyn ScheduleRepository> = Arc::new(repo);
        Self {
            users,
            sessions,
            quiz_results,
            schedules,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use study_core::model::{
        GenerationSettings, SchedulePlan, SessionKind, StudySession,
    };
    use study_core::time::fixed_now;

    fn build_session(user: &str, offset_minutes: i64) -> StudySession {
        StudySession::start(
            SessionId::generate(),
            UserId::new(user),
            MaterialId::new("m1"),
            "Material",
            SessionKind::Reading,
            None,
            30,
            Vec::new(),
            fixed_now() + Duration::minutes(offset_minutes),
        )
        .unwrap()
    }

    fn build_schedule(user: &str, material: &str, offset_minutes: i64) -> Schedule {
        Schedule::new(
            ScheduleId::generate(),
            UserId::new(user),
            MaterialId::new(material),
            "Material",
            SchedulePlan::default(),
            GenerationSettings::default(),
            fixed_now() + Duration::minutes(offset_minutes),
        )
    }

    #[tokio::test]
    async fn user_round_trip() {
        let repo = InMemoryRepository::new();
        let id = UserId::new("u1");

        assert!(repo.get_user(&id).await.unwrap().is_none());

        let user = User::new(id.clone(), fixed_now());
        repo.upsert_user(&user).await.unwrap();
        assert_eq!(repo.get_user(&id).await.unwrap(), Some(user));
    }

    #[tokio::test]
    async fn session_listing_is_newest_first_and_windowed() {
        let repo = InMemoryRepository::new();
        let old = build_session("u1", -60);
        let newer = build_session("u1", 0);
        let newest = build_session("u1", 30);
        let other_user = build_session("u2", 30);

        for s in [&old, &newer, &newest, &other_user] {
            repo.insert_session(s).await.unwrap();
        }

        let listed = repo
            .list_sessions_since(&UserId::new("u1"), fixed_now() - Duration::minutes(10))
            .await
            .unwrap();

        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id(), newest.id());
        assert_eq!(listed[1].id(), newer.id());
    }

    #[tokio::test]
    async fn duplicate_insert_conflicts_and_update_requires_existing() {
        let repo = InMemoryRepository::new();
        let session = build_session("u1", 0);

        repo.insert_session(&session).await.unwrap();
        assert!(matches!(
            repo.insert_session(&session).await,
            Err(StorageError::Conflict)
        ));

        let phantom = build_session("u1", 5);
        assert!(matches!(
            repo.update_session(&phantom).await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn deactivation_touches_only_matching_pair() {
        let repo = InMemoryRepository::new();
        let target = build_schedule("u1", "m1", 0);
        let other_material = build_schedule("u1", "m2", 0);
        let other_user = build_schedule("u2", "m1", 0);

        for s in [&target, &other_material, &other_user] {
            repo.insert_schedule(s).await.unwrap();
        }

        let touched = repo
            .deactivate_for_material(&UserId::new("u1"), &MaterialId::new("m1"))
            .await
            .unwrap();
        assert_eq!(touched, 1);

        assert!(
            repo.find_active_for_material(&UserId::new("u1"), &MaterialId::new("m1"))
                .await
                .unwrap()
                .is_none()
        );
        // The superseded schedule is inactive but not completed.
        let stored = repo.get_schedule(target.id()).await.unwrap().unwrap();
        assert!(!stored.is_active());
        assert!(stored.completed_at().is_none());

        assert!(
            repo.find_active_for_material(&UserId::new("u1"), &MaterialId::new("m2"))
                .await
                .unwrap()
                .is_some()
        );
        assert_eq!(
            repo.list_active_schedules(&UserId::new("u2")).await.unwrap().len(),
            1
        );
    }
}
