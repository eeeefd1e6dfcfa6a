mod ids;
mod quiz;
mod schedule;
mod session;
mod user;

pub use ids::{MaterialId, ParseIdError, QuizResultId, ScheduleId, SessionId, UserId};

pub use quiz::{
    AnsweredQuestion, DEFAULT_TOPIC, QuizError, QuizResult, QuizSummary, TopicAccuracy,
    derive_weak_topics,
};
pub use schedule::{
    CompletedSessionRecord, GenerationSettings, Milestone, PlanSession, Priority, Schedule,
    ScheduleDay, ScheduleError, SchedulePlan, ScheduleProgress, ScheduleStatus,
    StartedSessionRecord,
};
pub use session::{SelfRating, SessionError, SessionKind, StudySession};
pub use user::{Difficulty, LearningStyle, Preferences, User, UserError, UserStats};
