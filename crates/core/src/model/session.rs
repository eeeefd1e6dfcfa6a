use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{MaterialId, SessionId, UserId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("planned duration must be at least one minute")]
    ZeroPlannedDuration,

    #[error("session is already completed")]
    AlreadyCompleted,

    #[error("self rating {field} must be between 0 and 5, got {value}")]
    RatingOutOfRange { field: &'static str, value: u8 },

    #[error("unknown session kind: {0}")]
    UnknownKind(String),
}

//
// ─── SESSION KIND ──────────────────────────────────────────────────────────────
//

/// The kind of study activity a session represents. Shared with plan
/// sessions inside a schedule, which is what makes best-effort matching of
/// a logged session back to its schedule slot possible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    Reading,
    Practice,
    Quiz,
    Review,
}

impl SessionKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionKind::Reading => "reading",
            SessionKind::Practice => "practice",
            SessionKind::Quiz => "quiz",
            SessionKind::Review => "review",
        }
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionKind {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reading" => Ok(SessionKind::Reading),
            "practice" => Ok(SessionKind::Practice),
            "quiz" => Ok(SessionKind::Quiz),
            "review" => Ok(SessionKind::Review),
            other => Err(SessionError::UnknownKind(other.to_owned())),
        }
    }
}

//
// ─── SELF RATING ───────────────────────────────────────────────────────────────
//

/// Optional self-assessment recorded at completion, both axes on 0-5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelfRating {
    understood: u8,
    difficulty: u8,
}

impl SelfRating {
    pub const MAX: u8 = 5;

    /// # Errors
    ///
    /// Returns `SessionError::RatingOutOfRange` if either axis exceeds 5.
    pub fn new(understood: u8, difficulty: u8) -> Result<Self, SessionError> {
        if understood > Self::MAX {
            return Err(SessionError::RatingOutOfRange {
                field: "understood",
                value: understood,
            });
        }
        if difficulty > Self::MAX {
            return Err(SessionError::RatingOutOfRange {
                field: "difficulty",
                value: difficulty,
            });
        }
        Ok(Self {
            understood,
            difficulty,
        })
    }

    #[must_use]
    pub fn understood(&self) -> u8 {
        self.understood
    }

    #[must_use]
    pub fn difficulty(&self) -> u8 {
        self.difficulty
    }
}

//
// ─── STUDY SESSION ─────────────────────────────────────────────────────────────
//

/// One bounded study activity, created at start and mutated exactly once at
/// completion. Immutable thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudySession {
    id: SessionId,
    user_id: UserId,
    material_id: MaterialId,
    material_title: String,
    kind: SessionKind,
    scheduled_day: Option<u32>,
    planned_minutes: u32,
    actual_minutes: Option<u32>,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    completed: bool,
    topics: Vec<String>,
    notes: Option<String>,
    rating: Option<SelfRating>,
}

impl StudySession {
    /// Opens a new session at `started_at`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::ZeroPlannedDuration` if no planned duration is
    /// given; a session cannot be started without one.
    #[allow(clippy::too_many_arguments)]
    pub fn start(
        id: SessionId,
        user_id: UserId,
        material_id: MaterialId,
        material_title: impl Into<String>,
        kind: SessionKind,
        scheduled_day: Option<u32>,
        planned_minutes: u32,
        topics: Vec<String>,
        started_at: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        if planned_minutes == 0 {
            return Err(SessionError::ZeroPlannedDuration);
        }

        Ok(Self {
            id,
            user_id,
            material_id,
            material_title: material_title.into(),
            kind,
            scheduled_day,
            planned_minutes,
            actual_minutes: None,
            started_at,
            ended_at: None,
            completed: false,
            topics,
            notes: None,
            rating: None,
        })
    }

    /// Completes the session, computing the actual duration.
    ///
    /// With an end time the duration is the wall-clock delta rounded to
    /// whole minutes; a delta that comes out negative is clamped to 0.
    /// Without an end time the planned duration is taken as actual, so the
    /// actual duration is never left unset.
    ///
    /// Returns the actual duration in minutes.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadyCompleted` on a second completion; a
    /// session is mutated exactly once.
    pub fn complete(
        &mut self,
        ended_at: Option<DateTime<Utc>>,
        notes: Option<String>,
        rating: Option<SelfRating>,
    ) -> Result<u32, SessionError> {
        if self.completed {
            return Err(SessionError::AlreadyCompleted);
        }

        let actual = match ended_at {
            Some(end) => {
                self.ended_at = Some(end);
                let secs = (end - self.started_at).num_seconds();
                if secs <= 0 {
                    0
                } else {
                    u32::try_from((secs + 30) / 60).unwrap_or(u32::MAX)
                }
            }
            None => self.planned_minutes,
        };

        self.actual_minutes = Some(actual);
        if notes.is_some() {
            self.notes = notes;
        }
        if rating.is_some() {
            self.rating = rating;
        }
        self.completed = true;

        Ok(actual)
    }

    /// Actual duration when recorded, otherwise the planned duration. This
    /// is the value analytics folds use for time accounting.
    #[must_use]
    pub fn actual_or_planned_minutes(&self) -> u32 {
        self.actual_minutes.unwrap_or(self.planned_minutes)
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
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
    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    #[must_use]
    pub fn scheduled_day(&self) -> Option<u32> {
        self.scheduled_day
    }

    #[must_use]
    pub fn planned_minutes(&self) -> u32 {
        self.planned_minutes
    }

    #[must_use]
    pub fn actual_minutes(&self) -> Option<u32> {
        self.actual_minutes
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    #[must_use]
    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    #[must_use]
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    #[must_use]
    pub fn rating(&self) -> Option<SelfRating> {
        self.rating
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
