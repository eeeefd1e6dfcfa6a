use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::UserId;
use crate::streak::{StreakState, advance_streak};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum UserError {
    #[error("default study hours must be between 0.5 and 12, got {0}")]
    StudyHoursOutOfRange(f32),
}

//
// ─── PREFERENCES ───────────────────────────────────────────────────────────────
//

/// How the user prefers generated study plans to be weighted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LearningStyle {
    Visual,
    Reading,
    Practice,
    #[default]
    Balanced,
}

impl LearningStyle {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LearningStyle::Visual => "visual",
            LearningStyle::Reading => "reading",
            LearningStyle::Practice => "practice",
            LearningStyle::Balanced => "balanced",
        }
    }
}

/// Difficulty level shared by quizzes and generated schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

/// Per-user defaults applied when generation parameters are not supplied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    pub learning_style: LearningStyle,
    pub default_study_hours: f32,
    pub default_difficulty: Difficulty,
}

impl Preferences {
    pub const MIN_STUDY_HOURS: f32 = 0.5;
    pub const MAX_STUDY_HOURS: f32 = 12.0;

    /// Builds preferences, validating the daily study-hours bound.
    ///
    /// # Errors
    ///
    /// Returns `UserError::StudyHoursOutOfRange` if `default_study_hours`
    /// falls outside [0.5, 12].
    pub fn new(
        learning_style: LearningStyle,
        default_study_hours: f32,
        default_difficulty: Difficulty,
    ) -> Result<Self, UserError> {
        if !(Self::MIN_STUDY_HOURS..=Self::MAX_STUDY_HOURS).contains(&default_study_hours) {
            return Err(UserError::StudyHoursOutOfRange(default_study_hours));
        }
        Ok(Self {
            learning_style,
            default_study_hours,
            default_difficulty,
        })
    }
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            learning_style: LearningStyle::Balanced,
            default_study_hours: 2.0,
            default_difficulty: Difficulty::Medium,
        }
    }
}

//
// ─── STATS ─────────────────────────────────────────────────────────────────────
//

/// Aggregate snapshot of a user's study history. Mutated only through the
/// recording methods below plus `add_study_minutes`; never recomputed from
/// scratch.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UserStats {
    pub total_study_hours: f64,
    pub total_quizzes_taken: u32,
    pub average_quiz_score: u32,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_study_date: Option<DateTime<Utc>>,
}

impl UserStats {
    /// Applies one study event to the streak counters and records the event
    /// timestamp. The full timestamp is retained for display; streak
    /// comparisons truncate to the calendar day.
    pub fn record_study_event(&mut self, at: DateTime<Utc>) -> StreakState {
        let state = advance_streak(
            self.last_study_date,
            self.current_streak,
            self.longest_streak,
            at,
        );
        self.current_streak = state.current;
        self.longest_streak = state.longest;
        self.last_study_date = Some(at);
        state
    }

    /// Folds one quiz score into the running average and bumps the count.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn record_quiz_score(&mut self, score: u8) {
        let old_count = f64::from(self.total_quizzes_taken);
        let new_avg = (f64::from(self.average_quiz_score) * old_count + f64::from(score))
            / (old_count + 1.0);
        self.total_quizzes_taken += 1;
        self.average_quiz_score = new_avg.round() as u32;
    }

    /// Adds completed study time, kept in fractional hours.
    pub fn add_study_minutes(&mut self, minutes: u32) {
        self.total_study_hours += f64::from(minutes) / 60.0;
    }
}

//
// ─── USER ──────────────────────────────────────────────────────────────────────
//

/// A registered (or anonymous) user with preferences and a stats snapshot.
/// Users are never deleted by this subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Option<String>,
    pub preferences: Preferences,
    pub stats: UserStats,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Creates a user with default preferences and empty stats.
    #[must_use]
    pub fn new(id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: "Anonymous User".to_owned(),
            email: None,
            preferences: Preferences::default(),
            stats: UserStats::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Refreshes the modification timestamp; callers do this before saving.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    #[test]
    fn new_user_has_defaults() {
        let user = User::new(UserId::new("u1"), fixed_now());
        assert_eq!(user.name, "Anonymous User");
        assert_eq!(user.preferences.learning_style, LearningStyle::Balanced);
        assert_eq!(user.stats.current_streak, 0);
        assert!(user.stats.last_study_date.is_none());
    }

    #[test]
    fn preferences_reject_out_of_range_hours() {
        let err = Preferences::new(LearningStyle::Visual, 0.25, Difficulty::Easy).unwrap_err();
        assert!(matches!(err, UserError::StudyHoursOutOfRange(_)));
        assert!(Preferences::new(LearningStyle::Visual, 12.0, Difficulty::Easy).is_ok());
    }

    #[test]
    fn quiz_score_running_average_rounds_to_integer() {
        let mut stats = UserStats::default();
        stats.record_quiz_score(80);
        assert_eq!(stats.average_quiz_score, 80);
        assert_eq!(stats.total_quizzes_taken, 1);

        stats.record_quiz_score(65);
        // (80 + 65) / 2 = 72.5, rounded
        assert_eq!(stats.average_quiz_score, 73);
        assert_eq!(stats.total_quizzes_taken, 2);
    }

    #[test]
    fn study_minutes_accumulate_as_hours() {
        let mut stats = UserStats::default();
        stats.add_study_minutes(90);
        assert!((stats.total_study_hours - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn streak_walkthrough_matches_day_sequence() {
        // First study on day D, again on D+1, then a gap to D+4.
        let mut stats = UserStats::default();
        let day = fixed_now();

        stats.record_study_event(day);
        assert_eq!(stats.current_streak, 1);
        assert_eq!(stats.longest_streak, 1);

        stats.record_study_event(day + Duration::days(1));
        assert_eq!(stats.current_streak, 2);
        assert_eq!(stats.longest_streak, 2);

        stats.record_study_event(day + Duration::days(4));
        assert_eq!(stats.current_streak, 1);
        assert_eq!(stats.longest_streak, 2);
        assert_eq!(stats.last_study_date, Some(day + Duration::days(4)));
    }
}
