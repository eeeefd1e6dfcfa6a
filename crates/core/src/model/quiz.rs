use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{MaterialId, QuizResultId, UserId};
use crate::model::user::Difficulty;

/// Topic bucket applied when an answer carries no topic tag.
pub const DEFAULT_TOPIC: &str = "General";

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("score must be between 0 and 100, got {0}")]
    ScoreOutOfRange(u32),

    #[error("correct answers ({correct}) exceed total questions ({total})")]
    CorrectExceedsTotal { correct: u32, total: u32 },
}

//
// ─── SUMMARY ───────────────────────────────────────────────────────────────────
//

/// Headline numbers for one quiz attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizSummary {
    total_questions: u32,
    correct_answers: u32,
    score: u8,
    difficulty: Difficulty,
}

impl QuizSummary {
    /// # Errors
    ///
    /// Returns `QuizError::ScoreOutOfRange` for a score above 100, or
    /// `QuizError::CorrectExceedsTotal` if counts do not line up.
    pub fn new(
        total_questions: u32,
        correct_answers: u32,
        score: u32,
        difficulty: Difficulty,
    ) -> Result<Self, QuizError> {
        let score = u8::try_from(score).map_err(|_| QuizError::ScoreOutOfRange(score))?;
        if score > 100 {
            return Err(QuizError::ScoreOutOfRange(u32::from(score)));
        }
        if correct_answers > total_questions {
            return Err(QuizError::CorrectExceedsTotal {
                correct: correct_answers,
                total: total_questions,
            });
        }

        Ok(Self {
            total_questions,
            correct_answers,
            score,
            difficulty,
        })
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    #[must_use]
    pub fn correct_answers(&self) -> u32 {
        self.correct_answers
    }

    #[must_use]
    pub fn score(&self) -> u8 {
        self.score
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }
}

//
// ─── ANSWERS ───────────────────────────────────────────────────────────────────
//

/// One answered question within a quiz attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnsweredQuestion {
    pub question_number: u32,
    pub question: String,
    pub selected_answer: String,
    pub correct_answer: String,
    pub is_correct: bool,
    pub topic: Option<String>,
    pub time_taken_secs: u32,
}

/// Per-topic accuracy derived from a set of answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicAccuracy {
    pub topic: String,
    pub questions_asked: u32,
    pub questions_correct: u32,
    /// Integer percentage in [0, 100].
    pub accuracy: u8,
}

fn rounded_percent(correct: u32, asked: u32) -> u8 {
    if asked == 0 {
        return 0;
    }
    #[allow(clippy::cast_possible_truncation)]
    let pct = ((100 * correct + asked / 2) / asked) as u8;
    pct
}

/// Folds answers into per-topic accuracy stats, sorted ascending by
/// accuracy (weakest first). Buckets are created on first occurrence of a
/// topic, so a bucket always has at least one question asked. Untagged
/// answers fall under [`DEFAULT_TOPIC`].
#[must_use]
pub fn derive_weak_topics(answers: &[AnsweredQuestion]) -> Vec<TopicAccuracy> {
    let mut stats: Vec<TopicAccuracy> = Vec::new();

    for answer in answers {
        let topic = answer
            .topic
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(DEFAULT_TOPIC);

        match stats.iter().position(|s| s.topic == topic) {
            Some(index) => {
                let entry = &mut stats[index];
                entry.questions_asked += 1;
                if answer.is_correct {
                    entry.questions_correct += 1;
                }
            }
            None => stats.push(TopicAccuracy {
                topic: topic.to_owned(),
                questions_asked: 1,
                questions_correct: u32::from(answer.is_correct),
                accuracy: 0,
            }),
        }
    }

    for entry in &mut stats {
        entry.accuracy = rounded_percent(entry.questions_correct, entry.questions_asked);
    }
    stats.sort_by_key(|entry| entry.accuracy);

    stats
}

//
// ─── QUIZ RESULT ───────────────────────────────────────────────────────────────
//

/// One completed quiz attempt. Weak topics are derived from the answers at
/// construction and never edited independently; the record is immutable
/// after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizResult {
    id: QuizResultId,
    user_id: UserId,
    material_id: MaterialId,
    material_title: String,
    summary: QuizSummary,
    answers: Vec<AnsweredQuestion>,
    weak_topics: Vec<TopicAccuracy>,
    time_spent_secs: u32,
    completed_at: DateTime<Utc>,
}

impl QuizResult {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: QuizResultId,
        user_id: UserId,
        material_id: MaterialId,
        material_title: impl Into<String>,
        summary: QuizSummary,
        answers: Vec<AnsweredQuestion>,
        time_spent_secs: u32,
        completed_at: DateTime<Utc>,
    ) -> Self {
        let weak_topics = derive_weak_topics(&answers);
        Self {
            id,
            user_id,
            material_id,
            material_title: material_title.into(),
            summary,
            answers,
            weak_topics,
            time_spent_secs,
            completed_at,
        }
    }

    #[must_use]
    pub fn id(&self) -> QuizResultId {
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
    pub fn summary(&self) -> QuizSummary {
        self.summary
    }

    #[must_use]
    pub fn answers(&self) -> &[AnsweredQuestion] {
        &self.answers
    }

    #[must_use]
    pub fn weak_topics(&self) -> &[TopicAccuracy] {
        &self.weak_topics
    }

    #[must_use]
    pub fn time_spent_secs(&self) -> u32 {
        self.time_spent_secs
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
