use std::sync::Arc;

use chrono::NaiveDate;

use study_core::Clock;
use study_core::model::{Difficulty, GenerationSettings, LearningStyle, MaterialId, Schedule, UserId};

use crate::error::ContentError;
use crate::extractor::{TextExtractor, clean_text, truncate_for_prompt};
use crate::generator::{
    ContentGenerator, MAX_QUIZ_MATERIAL_CHARS, MAX_SCHEDULE_MATERIAL_CHARS, QuizQuestion,
    QuizRequest, ScheduleRequest,
};
use crate::schedule_service::{SaveScheduleInput, ScheduleService};

/// Request to generate and persist a study plan for one material.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateScheduleInput {
    pub user_id: UserId,
    pub material_id: MaterialId,
    pub material_title: String,
    /// Reference to the stored material file, as understood by the
    /// extractor.
    pub source: String,
    pub hours_per_day: f32,
    pub target_date: Option<NaiveDate>,
    pub difficulty: Difficulty,
    pub learning_style: LearningStyle,
}

/// Orchestrates the extract -> generate -> validate -> save pipeline.
///
/// Both collaborators are injected instances; extraction and generation
/// failures propagate to the caller and are never papered over with
/// fabricated content.
#[derive(Clone)]
pub struct ContentService {
    clock: Clock,
    extractor: Arc<dyn TextExtractor>,
    generator: Arc<dyn ContentGenerator>,
    schedules: Arc<ScheduleService>,
}

impl ContentService {
    #[must_use]
    pub fn new(
        clock: Clock,
        extractor: Arc<dyn TextExtractor>,
        generator: Arc<dyn ContentGenerator>,
        schedules: Arc<ScheduleService>,
    ) -> Self {
        Self {
            clock,
            extractor,
            generator,
            schedules,
        }
    }

    /// Generates a quiz from a stored material file.
    ///
    /// # Errors
    ///
    /// Propagates extraction and generation failures unchanged.
    pub async fn generate_quiz(
        &self,
        source: &str,
        num_questions: u32,
        difficulty: Difficulty,
    ) -> Result<Vec<QuizQuestion>, ContentError> {
        let extracted = self.extractor.extract(source).await?;
        let cleaned = clean_text(&extracted.text);
        let material = truncate_for_prompt(&cleaned, MAX_QUIZ_MATERIAL_CHARS);

        let request = QuizRequest {
            num_questions,
            difficulty,
        };
        Ok(self.generator.generate_quiz(material, &request).await?)
    }

    /// Generates a study plan from a stored material file and saves it as
    /// the new active schedule for the (user, material) pair.
    ///
    /// # Errors
    ///
    /// Propagates extraction, generation, and persistence failures.
    pub async fn generate_schedule(
        &self,
        input: GenerateScheduleInput,
    ) -> Result<Schedule, ContentError> {
        let extracted = self.extractor.extract(&input.source).await?;
        let cleaned = clean_text(&extracted.text);
        let material = truncate_for_prompt(&cleaned, MAX_SCHEDULE_MATERIAL_CHARS);

        let request = ScheduleRequest {
            hours_per_day: input.hours_per_day,
            target_date: input.target_date,
            difficulty: input.difficulty,
            learning_style: input.learning_style,
            page_count: extracted.page_count,
            start_date: self.clock.now().date_naive(),
        };
        let plan = self.generator.generate_schedule(material, &request).await?;

        let schedule = self
            .schedules
            .save_schedule(SaveScheduleInput {
                user_id: input.user_id,
                material_id: input.material_id,
                material_title: input.material_title,
                plan,
                settings: GenerationSettings {
                    hours_per_day: input.hours_per_day,
                    target_date: input.target_date,
                    difficulty: input.difficulty,
                    learning_style: input.learning_style,
                },
            })
            .await?;

        Ok(schedule)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use storage::repository::Storage;
    use study_core::model::{
        PlanSession, Priority, ScheduleDay, SchedulePlan, SessionKind,
    };
    use study_core::time::{fixed_clock, fixed_now};

    use crate::error::{ExtractionError, GenerationError};
    use crate::extractor::ExtractedText;

    struct StubExtractor {
        text: String,
        fail: bool,
    }

    #[async_trait]
    impl TextExtractor for StubExtractor {
        async fn extract(&self, _source: &str) -> Result<ExtractedText, ExtractionError> {
            if self.fail {
                return Err(ExtractionError::Failed("unreadable file".to_owned()));
            }
            Ok(ExtractedText {
                text: self.text.clone(),
                page_count: 12,
            })
        }
    }

    struct StubGenerator {
        plan: Option<SchedulePlan>,
        seen_material: Mutex<Option<String>>,
    }

    #[async_trait]
    impl ContentGenerator for StubGenerator {
        async fn generate_quiz(
            &self,
            material_text: &str,
            request: &QuizRequest,
        ) -> Result<Vec<QuizQuestion>, GenerationError> {
            *self.seen_material.lock().unwrap() = Some(material_text.to_owned());
            let question = crate::generator::QuizQuestion {
                question: "Q?".to_owned(),
                options: crate::generator::QuizOptions {
                    a: "1".to_owned(),
                    b: "2".to_owned(),
                    c: "3".to_owned(),
                    d: "4".to_owned(),
                },
                correct_answer: crate::generator::AnswerLabel::A,
                explanation: String::new(),
            };
            Ok(vec![question; usize::try_from(request.num_questions).unwrap_or(1)])
        }

        async fn generate_schedule(
            &self,
            material_text: &str,
            _request: &ScheduleRequest,
        ) -> Result<SchedulePlan, GenerationError> {
            *self.seen_material.lock().unwrap() = Some(material_text.to_owned());
            self.plan.clone().ok_or(GenerationError::Malformed {
                reason: "empty day list".to_owned(),
                raw: "{}".to_owned(),
            })
        }
    }

    fn one_day_plan() -> SchedulePlan {
        SchedulePlan {
            days: vec![ScheduleDay {
                day: 1,
                date: fixed_now().date_naive(),
                sessions: vec![PlanSession {
                    title: "Read".to_owned(),
                    duration_minutes: 30,
                    kind: SessionKind::Reading,
                    topics: Vec::new(),
                    description: String::new(),
                    priority: Priority::Medium,
                }],
                daily_goal: String::new(),
                total_minutes: 30,
            }],
            ..SchedulePlan::default()
        }
    }

    fn build_service(
        storage: &Storage,
        extractor: StubExtractor,
        generator: StubGenerator,
    ) -> ContentService {
        let schedules = Arc::new(ScheduleService::new(
            fixed_clock(),
            Arc::clone(&storage.schedules),
        ));
        ContentService::new(
            fixed_clock(),
            Arc::new(extractor),
            Arc::new(generator),
            schedules,
        )
    }

    fn schedule_input() -> GenerateScheduleInput {
        GenerateScheduleInput {
            user_id: UserId::new("u1"),
            material_id: MaterialId::new("m1"),
            material_title: "Calculus".to_owned(),
            source: "uploads/calculus.pdf".to_owned(),
            hours_per_day: 2.0,
            target_date: None,
            difficulty: Difficulty::Medium,
            learning_style: LearningStyle::Balanced,
        }
    }

    #[tokio::test]
    async fn schedule_pipeline_saves_and_supersedes() {
        let storage = Storage::in_memory();
        let extractor = StubExtractor {
            text: "Chapter  one\n\ncontent".to_owned(),
            fail: false,
        };
        let generator = StubGenerator {
            plan: Some(one_day_plan()),
            seen_material: Mutex::new(None),
        };
        let service = build_service(&storage, extractor, generator);

        let first = service.generate_schedule(schedule_input()).await.unwrap();
        let second = service.generate_schedule(schedule_input()).await.unwrap();

        let active = storage
            .schedules
            .list_active_schedules(&UserId::new("u1"))
            .await
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id(), second.id());
        assert_ne!(first.id(), second.id());
        assert_eq!(second.days().len(), 1);
        assert!((second.settings().hours_per_day - 2.0).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn generation_failure_saves_nothing() {
        let storage = Storage::in_memory();
        let extractor = StubExtractor {
            text: "content".to_owned(),
            fail: false,
        };
        let generator = StubGenerator {
            plan: None,
            seen_material: Mutex::new(None),
        };
        let service = build_service(&storage, extractor, generator);

        let err = service.generate_schedule(schedule_input()).await.unwrap_err();
        assert!(matches!(
            err,
            ContentError::Generation(GenerationError::Malformed { .. })
        ));
        assert!(
            storage
                .schedules
                .list_active_schedules(&UserId::new("u1"))
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn extraction_failure_propagates() {
        let storage = Storage::in_memory();
        let extractor = StubExtractor {
            text: String::new(),
            fail: true,
        };
        let generator = StubGenerator {
            plan: Some(one_day_plan()),
            seen_material: Mutex::new(None),
        };
        let service = build_service(&storage, extractor, generator);

        let err = service
            .generate_quiz("uploads/missing.pdf", 5, Difficulty::Easy)
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::Extraction(_)));
    }

    #[tokio::test]
    async fn quiz_material_is_cleaned_before_generation() {
        let storage = Storage::in_memory();
        let extractor = StubExtractor {
            text: "Some   spaced\n\n\ntext".to_owned(),
            fail: false,
        };
        let generator = StubGenerator {
            plan: None,
            seen_material: Mutex::new(None),
        };
        let schedules = Arc::new(ScheduleService::new(
            fixed_clock(),
            Arc::clone(&storage.schedules),
        ));
        let generator = Arc::new(generator);
        let service = ContentService::new(
            fixed_clock(),
            Arc::new(extractor),
            Arc::clone(&generator) as Arc<dyn ContentGenerator>,
            schedules,
        );

        let quiz = service
            .generate_quiz("uploads/a.pdf", 3, Difficulty::Hard)
            .await
            .unwrap();
        assert_eq!(quiz.len(), 3);
        assert_eq!(
            generator.seen_material.lock().unwrap().as_deref(),
            Some("Some spaced\ntext")
        );
    }
}
