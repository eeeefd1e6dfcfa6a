#![forbid(unsafe_code)]

pub mod app_services;
pub mod content_service;
pub mod dashboard_service;
pub mod error;
pub mod extractor;
pub mod generator;
pub mod progress_service;
pub mod schedule_service;

pub use study_core::Clock;

pub use app_services::AppServices;
pub use content_service::{ContentService, GenerateScheduleInput};
pub use dashboard_service::{DashboardService, DashboardView};
pub use error::{
    AppServicesError, ContentError, DashboardError, ExtractionError, GenerationError,
    ProgressError, ScheduleServiceError, ValidationError,
};
pub use extractor::{ExtractedText, TextExtractor};
pub use generator::{
    AnswerLabel, ContentGenerator, GeneratorConfig, HttpContentGenerator, QuizQuestion,
    QuizRequest, ScheduleRequest,
};
pub use progress_service::{
    CompleteSessionInput, ProgressService, QuizSubmission, StartSessionInput,
};
pub use schedule_service::{SaveScheduleInput, ScheduleOverview, ScheduleService};
