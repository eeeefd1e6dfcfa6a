use chrono::{DateTime, Utc};

use crate::time::days_between;

/// Current and longest consecutive-day study streak after an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakState {
    pub current: u32,
    pub longest: u32,
}

/// Advances a streak for one study event, at calendar-day granularity.
///
/// Rules:
/// - no prior study date: the streak starts at 1;
/// - the event is exactly one day after the last study date: increment;
/// - same day: no change;
/// - any larger gap, or an event dated before the last study date: reset
///   to 1. Out-of-order events are not expected, but they must not panic
///   or drive the streak negative.
///
/// The longest streak is raised to the new current streak if exceeded.
#[must_use]
pub fn advance_streak(
    last_study: Option<DateTime<Utc>>,
    current: u32,
    longest: u32,
    event_at: DateTime<Utc>,
) -> StreakState {
    let current = match last_study {
        None => 1,
        Some(last) => match days_between(last, event_at) {
            0 => current,
            1 => current.saturating_add(1),
            _ => 1,
        },
    };

    StreakState {
        current,
        longest: longest.max(current),
    }
}
