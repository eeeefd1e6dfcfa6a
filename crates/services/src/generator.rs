//! Boundary to the external content-generation collaborator.
//!
//! The generator is an OpenAI-compatible chat-completions endpoint that is
//! asked for pure JSON. Model output is never trusted: responses are
//! cleaned of markdown wrapping, sliced to the outermost JSON block,
//! parsed, and structurally validated before anything downstream sees
//! them. The client instance is built at the edge and injected into
//! whichever service needs it; there is no ambient singleton.

use std::env;
use std::fmt;

use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use study_core::model::{
    Difficulty, LearningStyle, Milestone, PlanSession, Priority, ScheduleDay, SchedulePlan,
    SessionKind,
};

use crate::error::GenerationError;

/// Character budget for material text in a quiz prompt.
pub const MAX_QUIZ_MATERIAL_CHARS: usize = 12_000;

/// Character budget for material text in a schedule prompt.
pub const MAX_SCHEDULE_MATERIAL_CHARS: usize = 50_000;

/// Plan horizon assumed when the caller gives no target date.
pub const DEFAULT_DAYS_AVAILABLE: u32 = 14;

/// How much raw generator output an error report carries.
const MAX_RAW_DIAGNOSTIC_CHARS: usize = 500;

//
// ─── CONFIG ────────────────────────────────────────────────────────────────────
//

#[derive(Clone, Debug)]
pub struct GeneratorConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl GeneratorConfig {
    /// Reads `STUDY_AI_API_KEY`, `STUDY_AI_BASE_URL`, and `STUDY_AI_MODEL`.
    /// Returns `None` without an API key, which leaves generation disabled
    /// rather than failing at startup.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("STUDY_AI_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        let base_url = env::var("STUDY_AI_BASE_URL")
            .unwrap_or_else(|_| "https://api.groq.com/openai/v1".into());
        let model =
            env::var("STUDY_AI_MODEL").unwrap_or_else(|_| "llama-3.3-70b-versatile".into());
        Some(Self {
            base_url,
            api_key,
            model,
        })
    }
}

//
// ─── REQUESTS ──────────────────────────────────────────────────────────────────
//

/// Parameters for quiz generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizRequest {
    pub num_questions: u32,
    pub difficulty: Difficulty,
}

/// Parameters for schedule generation.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleRequest {
    pub hours_per_day: f32,
    pub target_date: Option<NaiveDate>,
    pub difficulty: Difficulty,
    pub learning_style: LearningStyle,
    pub page_count: u32,
    /// The plan's first day; generated day dates are filled from here when
    /// the model omits them.
    pub start_date: NaiveDate,
}

impl ScheduleRequest {
    /// Days between start and target date, at least 1; the default horizon
    /// when no target date was given.
    #[must_use]
    pub fn days_available(&self) -> u32 {
        match self.target_date {
            Some(target) => {
                let days = (target - self.start_date).num_days();
                u32::try_from(days).unwrap_or(0).max(1)
            }
            None => DEFAULT_DAYS_AVAILABLE,
        }
    }
}

//
// ─── QUIZ OUTPUT ───────────────────────────────────────────────────────────────
//

/// Label of a multiple-choice option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnswerLabel {
    A,
    B,
    C,
    D,
}

impl fmt::Display for AnswerLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AnswerLabel::A => "A",
            AnswerLabel::B => "B",
            AnswerLabel::C => "C",
            AnswerLabel::D => "D",
        };
        f.write_str(label)
    }
}

/// The four labeled options of a generated question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizOptions {
    #[serde(rename = "A")]
    pub a: String,
    #[serde(rename = "B")]
    pub b: String,
    #[serde(rename = "C")]
    pub c: String,
    #[serde(rename = "D")]
    pub d: String,
}

/// One generated multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub question: String,
    pub options: QuizOptions,
    pub correct_answer: AnswerLabel,
    #[serde(default)]
    pub explanation: String,
}

//
// ─── WIRE SHAPES (schedule) ────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSchedule {
    #[serde(default)]
    total_estimated_hours: f32,
    #[serde(default)]
    recommended_days_needed: u32,
    #[serde(default)]
    schedule: Vec<WireDay>,
    #[serde(default)]
    study_tips: Vec<String>,
    #[serde(default)]
    milestones: Vec<WireMilestone>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireDay {
    #[serde(default)]
    day: Option<u32>,
    #[serde(default)]
    date: Option<NaiveDate>,
    #[serde(default)]
    sessions: Option<Vec<WireSession>>,
    #[serde(default)]
    daily_goal: String,
    #[serde(default)]
    total_minutes: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSession {
    title: String,
    duration: u32,
    #[serde(rename = "type")]
    kind: SessionKind,
    #[serde(default)]
    topics: Vec<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    priority: Priority,
}

#[derive(Debug, Deserialize)]
struct WireMilestone {
    #[serde(default)]
    day: u32,
    #[serde(default)]
    milestone: String,
    #[serde(default)]
    assessment: String,
}

//
// ─── RESPONSE PARSING ──────────────────────────────────────────────────────────
//

fn truncate_raw(raw: &str) -> String {
    raw.chars().take(MAX_RAW_DIAGNOSTIC_CHARS).collect()
}

fn malformed(reason: impl Into<String>, raw: &str) -> GenerationError {
    GenerationError::Malformed {
        reason: reason.into(),
        raw: truncate_raw(raw),
    }
}

/// Drops markdown code fences the model was told not to emit but often
/// does anyway.
fn strip_markdown_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "")
}

/// Slices to the outermost `open`..`close` block, dropping any prose the
/// model wrapped around the JSON. Both delimiters are ASCII.
fn slice_json_block(raw: &str, open: char, close: char) -> Option<&str> {
    let start = raw.find(open)?;
    let end = raw.rfind(close)?;
    (end >= start).then(|| &raw[start..=end])
}

/// Parses and validates generated quiz output.
///
/// # Errors
///
/// Returns `GenerationError::Malformed` when no JSON array is present, the
/// array fails to parse, or it is empty.
pub fn parse_quiz(raw: &str) -> Result<Vec<QuizQuestion>, GenerationError> {
    let cleaned = strip_markdown_fences(raw);
    let sliced = slice_json_block(&cleaned, '[', ']')
        .ok_or_else(|| malformed("no JSON array found in response", raw))?;

    let questions: Vec<QuizQuestion> = serde_json::from_str(sliced)
        .map_err(|e| malformed(format!("invalid quiz JSON: {e}"), raw))?;

    if questions.is_empty() {
        return Err(malformed("quiz contains no questions", raw));
    }
    Ok(questions)
}

/// Parses and validates generated schedule output into a plan.
///
/// Missing day numbers and dates are filled from `start_date`; a missing
/// per-day total falls back to the sum of its session durations. A day
/// without a sessions list, or an empty day list, is rejected.
///
/// # Errors
///
/// Returns `GenerationError::Malformed` on any structural violation.
pub fn parse_schedule(raw: &str, start_date: NaiveDate) -> Result<SchedulePlan, GenerationError> {
    let cleaned = strip_markdown_fences(raw);
    let sliced = slice_json_block(&cleaned, '{', '}')
        .ok_or_else(|| malformed("no JSON object found in response", raw))?;

    let wire: WireSchedule = serde_json::from_str(sliced)
        .map_err(|e| malformed(format!("invalid schedule JSON: {e}"), raw))?;

    if wire.schedule.is_empty() {
        return Err(malformed("schedule has an empty day list", raw));
    }

    let mut days = Vec::with_capacity(wire.schedule.len());
    for (index, day) in wire.schedule.into_iter().enumerate() {
        let number = match day.day {
            Some(n) if n > 0 => n,
            _ => u32::try_from(index).unwrap_or(u32::MAX).saturating_add(1),
        };
        let Some(sessions) = day.sessions else {
            return Err(malformed(
                format!("day {number} is missing its sessions list"),
                raw,
            ));
        };

        let sessions: Vec<PlanSession> = sessions
            .into_iter()
            .map(|s| PlanSession {
                title: s.title,
                duration_minutes: s.duration,
                kind: s.kind,
                topics: s.topics,
                description: s.description,
                priority: s.priority,
            })
            .collect();
        let total_minutes = day
            .total_minutes
            .unwrap_or_else(|| sessions.iter().map(|s| s.duration_minutes).sum());
        let date = day.date.unwrap_or_else(|| {
            start_date
                .checked_add_days(Days::new(u64::try_from(index).unwrap_or_default()))
                .unwrap_or(start_date)
        });

        days.push(ScheduleDay {
            day: number,
            date,
            sessions,
            daily_goal: day.daily_goal,
            total_minutes,
        });
    }

    Ok(SchedulePlan {
        total_estimated_hours: wire.total_estimated_hours,
        recommended_days_needed: wire.recommended_days_needed,
        days,
        study_tips: wire.study_tips,
        milestones: wire
            .milestones
            .into_iter()
            .map(|m| Milestone {
                day: m.day,
                milestone: m.milestone,
                assessment: m.assessment,
            })
            .collect(),
    })
}

//
// ─── PROMPTS ───────────────────────────────────────────────────────────────────
//

fn quiz_prompt(material_text: &str, request: &QuizRequest) -> String {
    format!(
        "You are an expert educational quiz generator.\n\n\
         Create a {difficulty} difficulty quiz based ONLY on the material below.\n\n\
         Material:\n{material_text}\n\n\
         Generate exactly {count} multiple-choice questions.\n\n\
         Each question must include:\n\
         - question (string)\n\
         - options (A, B, C, D)\n\
         - correctAnswer (A/B/C/D)\n\
         - explanation (short explanation)\n\n\
         Return ONLY a valid JSON array. Do NOT include markdown. Do NOT \
         include text before or after the JSON.",
        difficulty = request.difficulty.as_str(),
        count = request.num_questions,
    )
}

fn schedule_prompt(material_text: &str, request: &ScheduleRequest) -> String {
    format!(
        "Analyze this educational material and create an optimal study schedule.\n\n\
         Material to study:\n{material_text}\n\n\
         Constraints:\n\
         - Available study time: {hours} hours per day\n\
         - Days until deadline: {days} days\n\
         - Difficulty level: {difficulty}\n\
         - Learning style: {style}\n\
         - Number of pages: {pages}\n\n\
         Requirements:\n\
         1. Break content into logical daily sessions\n\
         2. Use spaced repetition principles\n\
         3. Session types are: reading, practice, quiz, review\n\
         4. Each session has a duration in minutes and specific topics\n\
         5. Priority levels are: high, medium, low\n\n\
         Return ONLY a JSON object with this shape, no markdown and no \
         surrounding text:\n\
         {{\"totalEstimatedHours\": 24, \"recommendedDaysNeeded\": 12, \
         \"schedule\": [{{\"day\": 1, \"date\": \"{start}\", \"sessions\": \
         [{{\"title\": \"...\", \"duration\": 60, \"type\": \"reading\", \
         \"topics\": [\"...\"], \"description\": \"...\", \"priority\": \
         \"high\"}}], \"dailyGoal\": \"...\", \"totalMinutes\": 120}}], \
         \"studyTips\": [\"...\"], \"milestones\": [{{\"day\": 4, \
         \"milestone\": \"...\", \"assessment\": \"...\"}}]}}",
        hours = request.hours_per_day,
        days = request.days_available(),
        difficulty = request.difficulty.as_str(),
        style = request.learning_style.as_str(),
        pages = request.page_count,
        start = request.start_date,
    )
}

//
// ─── GENERATOR CONTRACT & HTTP CLIENT ──────────────────────────────────────────
//

/// External collaborator that turns material text into quizzes and
/// schedules.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Generate a quiz from extracted material text.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError` when generation is disabled, the request
    /// fails, or the output does not validate.
    async fn generate_quiz(
        &self,
        material_text: &str,
        request: &QuizRequest,
    ) -> Result<Vec<QuizQuestion>, GenerationError>;

    /// Generate a study plan from extracted material text.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError` when generation is disabled, the request
    /// fails, or the output does not validate.
    async fn generate_schedule(
        &self,
        material_text: &str,
        request: &ScheduleRequest,
    ) -> Result<SchedulePlan, GenerationError>;
}

/// Chat-completions implementation of [`ContentGenerator`].
#[derive(Clone)]
pub struct HttpContentGenerator {
    client: Client,
    config: Option<GeneratorConfig>,
}

impl HttpContentGenerator {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(GeneratorConfig::from_env())
    }

    #[must_use]
    pub fn new(config: Option<GeneratorConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    async fn chat(
        &self,
        system: Option<&str>,
        prompt: String,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, GenerationError> {
        let config = self.config.as_ref().ok_or(GenerationError::Disabled)?;

        let url = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system {
            messages.push(ChatMessage {
                role: "system",
                content: system.to_owned(),
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
        });

        let payload = ChatRequest {
            model: config.model.clone(),
            messages,
            temperature,
            max_tokens,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&config.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GenerationError::HttpStatus(response.status()));
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(GenerationError::EmptyResponse)?;

        Ok(content.trim().to_string())
    }
}

#[async_trait]
impl ContentGenerator for HttpContentGenerator {
    async fn generate_quiz(
        &self,
        material_text: &str,
        request: &QuizRequest,
    ) -> Result<Vec<QuizQuestion>, GenerationError> {
        let raw = self
            .chat(None, quiz_prompt(material_text, request), 0.4, 2_000)
            .await?;
        parse_quiz(&raw)
    }

    async fn generate_schedule(
        &self,
        material_text: &str,
        request: &ScheduleRequest,
    ) -> Result<SchedulePlan, GenerationError> {
        let system = "You are an expert learning scientist and study planner. \
                      You MUST return ONLY valid JSON with no markdown, no code \
                      blocks, no backticks, no explanatory text.";
        let raw = self
            .chat(
                Some(system),
                schedule_prompt(material_text, request),
                0.7,
                4_000,
            )
            .await?;
        parse_schedule(&raw, request.start_date)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
