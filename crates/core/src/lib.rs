#![forbid(unsafe_code)]

pub mod analytics;
pub mod model;
pub mod streak;
pub mod time;

pub use streak::{StreakState, advance_streak};
pub use time::Clock;
