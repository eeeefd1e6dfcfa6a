//! Pure folds over ledger records, shared by the dashboard composition.
//!
//! Everything here takes plain slices and returns plain values; storage
//! access and time windows are the caller's concern.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::{DEFAULT_TOPIC, QuizResult, StudySession};

/// Aggregate accuracy drops below this ratio and the topic is flagged for
/// review.
const NEEDS_REVIEW_RATIO: f64 = 0.7;

/// How many of the latest attempts the per-topic trend keeps.
pub const DEFAULT_TREND_LEN: usize = 5;

/// How many weakest topics the dashboard shows by default.
pub const DEFAULT_WEAK_TOPIC_LIMIT: usize = 5;

//
// ─── WEAK TOPICS ACROSS QUIZZES ────────────────────────────────────────────────
//

/// Dashboard row for one weak topic, folded across quizzes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeakTopicSummary {
    pub topic: String,
    /// Integer percentage in [0, 100].
    pub accuracy: u8,
    pub questions_asked: u32,
}

/// Folds the stored per-quiz topic stats across quizzes, recomputes the
/// aggregate accuracy, and returns the `top_k` weakest topics, weakest
/// first.
///
/// Buckets are created lazily from the first occurrence of a topic, so a
/// materialized topic always has at least one question asked and the
/// accuracy division cannot see a zero.
#[must_use]
pub fn aggregate_weak_topics(results: &[QuizResult], top_k: usize) -> Vec<WeakTopicSummary> {
    struct Bucket {
        asked: u32,
        correct: u32,
    }

    let mut buckets: Vec<(String, Bucket)> = Vec::new();
    for result in results {
        for stat in result.weak_topics() {
            match buckets.iter().position(|(topic, _)| *topic == stat.topic) {
                Some(index) => {
                    let bucket = &mut buckets[index].1;
                    bucket.asked += stat.questions_asked;
                    bucket.correct += stat.questions_correct;
                }
                None => buckets.push((
                    stat.topic.clone(),
                    Bucket {
                        asked: stat.questions_asked,
                        correct: stat.questions_correct,
                    },
                )),
            }
        }
    }

    let mut topics: Vec<WeakTopicSummary> = buckets
        .into_iter()
        .map(|(topic, bucket)| WeakTopicSummary {
            topic,
            accuracy: rounded_percent(bucket.correct, bucket.asked),
            questions_asked: bucket.asked,
        })
        .collect();
    topics.sort_by_key(|t| t.accuracy);
    topics.truncate(top_k);
    topics
}

//
// ─── DETAILED TOPIC ANALYSIS ───────────────────────────────────────────────────
//

/// One attempt in a topic's recent trend, newest-last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: DateTime<Utc>,
    pub correct: bool,
}

/// Detailed per-topic view for the weak-topics analysis screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicInsight {
    pub topic: String,
    pub total_questions: u32,
    pub correct_answers: u32,
    /// Integer percentage in [0, 100].
    pub accuracy: u8,
    pub average_time_taken_secs: u32,
    pub needs_review: bool,
    pub last_seen: DateTime<Utc>,
    /// Bounded recent trend, newest-last, for sparkline-style display.
    pub trend: Vec<TrendPoint>,
}

/// Folds raw answers of the given quiz results into per-topic insight,
/// sorted ascending by accuracy.
///
/// `results` is expected newest-first (the ledger's return order); the
/// trend is rebuilt oldest-to-newest so its tail holds the latest attempts.
#[must_use]
pub fn analyze_topics(results: &[QuizResult], trend_len: usize) -> Vec<TopicInsight> {
    struct Bucket {
        total: u32,
        correct: u32,
        time_taken: u64,
        last_seen: DateTime<Utc>,
        trend: Vec<TrendPoint>,
    }

    let mut buckets: Vec<(String, Bucket)> = Vec::new();

    // Oldest first, so each topic's trend accumulates in chronological
    // order and `last_seen` settles on the newest attempt.
    for result in results.iter().rev() {
        for answer in result.answers() {
            let topic = answer
                .topic
                .as_deref()
                .filter(|t| !t.trim().is_empty())
                .unwrap_or(DEFAULT_TOPIC);

            let index = match buckets.iter().position(|(name, _)| *name == topic) {
                Some(index) => index,
                None => {
                    buckets.push((
                        topic.to_owned(),
                        Bucket {
                            total: 0,
                            correct: 0,
                            time_taken: 0,
                            last_seen: result.completed_at(),
                            trend: Vec::new(),
                        },
                    ));
                    buckets.len() - 1
                }
            };
            let bucket = &mut buckets[index].1;

            bucket.total += 1;
            if answer.is_correct {
                bucket.correct += 1;
            }
            bucket.time_taken += u64::from(answer.time_taken_secs);
            bucket.last_seen = result.completed_at();
            bucket.trend.push(TrendPoint {
                date: result.completed_at(),
                correct: answer.is_correct,
            });
        }
    }

    let mut topics: Vec<TopicInsight> = buckets
        .into_iter()
        .map(|(topic, bucket)| {
            let trend_start = bucket.trend.len().saturating_sub(trend_len);
            TopicInsight {
                topic,
                total_questions: bucket.total,
                correct_answers: bucket.correct,
                accuracy: rounded_percent(bucket.correct, bucket.total),
                average_time_taken_secs: mean_u32(bucket.time_taken, bucket.total),
                needs_review: (f64::from(bucket.correct) / f64::from(bucket.total))
                    < NEEDS_REVIEW_RATIO,
                last_seen: bucket.last_seen,
                trend: bucket.trend[trend_start..].to_vec(),
            }
        })
        .collect();
    topics.sort_by_key(|t| t.accuracy);
    topics
}

//
// ─── STUDY TIME & SCORES ───────────────────────────────────────────────────────
//

/// A quiz score positioned in time, for charting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScorePoint {
    pub date: DateTime<Utc>,
    pub score: u8,
    pub material_title: String,
}

/// Total study time in minutes, counting each session's actual duration
/// and falling back to its planned duration.
#[must_use]
pub fn total_study_minutes(sessions: &[StudySession]) -> u64 {
    sessions
        .iter()
        .map(|s| u64::from(s.actual_or_planned_minutes()))
        .sum()
}

/// Study minutes bucketed by the calendar date each session was created
/// (started), not the day it was scheduled for.
#[must_use]
pub fn bucket_study_minutes(sessions: &[StudySession]) -> BTreeMap<NaiveDate, u32> {
    let mut by_day = BTreeMap::new();
    for session in sessions {
        let date = session.started_at().date_naive();
        *by_day.entry(date).or_insert(0) += session.actual_or_planned_minutes();
    }
    by_day
}

/// Integer-rounded mean quiz score; 0 when there are no results.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub fn average_quiz_score(results: &[QuizResult]) -> u32 {
    if results.is_empty() {
        return 0;
    }
    let sum: u64 = results.iter().map(|r| u64::from(r.summary().score())).sum();
    ((sum as f64) / (results.len() as f64)).round() as u32
}

/// (date, score, material) triples in the order the results were given:
/// the ledger returns newest-first, so callers needing a chronological
/// ascending series must reverse.
#[must_use]
pub fn quiz_scores_over_time(results: &[QuizResult]) -> Vec<ScorePoint> {
    results
        .iter()
        .map(|r| ScorePoint {
            date: r.completed_at(),
            score: r.summary().score(),
            material_title: r.material_title().to_owned(),
        })
        .collect()
}

fn rounded_percent(correct: u32, asked: u32) -> u8 {
    if asked == 0 {
        return 0;
    }
    #[allow(clippy::cast_possible_truncation)]
    let pct = ((100 * correct + asked / 2) / asked) as u8;
    pct
}

fn mean_u32(sum: u64, count: u32) -> u32 {
    if count == 0 {
        return 0;
    }
    u32::try_from((sum + u64::from(count) / 2) / u64::from(count)).unwrap_or(u32::MAX)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
