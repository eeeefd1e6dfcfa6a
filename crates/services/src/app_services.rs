use std::sync::Arc;

use storage::repository::Storage;
use study_core::Clock;

use crate::content_service::ContentService;
use crate::dashboard_service::DashboardService;
use crate::error::AppServicesError;
use crate::extractor::TextExtractor;
use crate::generator::ContentGenerator;
use crate::progress_service::ProgressService;
use crate::schedule_service::ScheduleService;

/// Assembles the app-facing services over one storage backend and the two
/// injected external collaborators.
#[derive(Clone)]
pub struct AppServices {
    progress: Arc<ProgressService>,
    schedules: Arc<ScheduleService>,
    dashboard: Arc<DashboardService>,
    content: Arc<ContentService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        generator: Arc<dyn ContentGenerator>,
        extractor: Arc<dyn TextExtractor>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::with_storage(&storage, clock, generator, extractor))
    }

    /// Build services over an already constructed storage backend.
    #[must_use]
    pub fn with_storage(
        storage: &Storage,
        clock: Clock,
        generator: Arc<dyn ContentGenerator>,
        extractor: Arc<dyn TextExtractor>,
    ) -> Self {
        let progress = Arc::new(ProgressService::new(
            clock,
            Arc::clone(&storage.users),
            Arc::clone(&storage.sessions),
            Arc::clone(&storage.quiz_results),
            Arc::clone(&storage.schedules),
        ));
        let schedules = Arc::new(ScheduleService::new(clock, Arc::clone(&storage.schedules)));
        let dashboard = Arc::new(DashboardService::new(
            clock,
            Arc::clone(&storage.users),
            Arc::clone(&storage.sessions),
            Arc::clone(&storage.quiz_results),
            Arc::clone(&storage.schedules),
        ));
        let content = Arc::new(ContentService::new(
            clock,
            extractor,
            generator,
            Arc::clone(&schedules),
        ));

        Self {
            progress,
            schedules,
            dashboard,
            content,
        }
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn schedules(&self) -> Arc<ScheduleService> {
        Arc::clone(&self.schedules)
    }

    #[must_use]
    pub fn dashboard(&self) -> Arc<DashboardService> {
        Arc::clone(&self.dashboard)
    }

    #[must_use]
    pub fn content(&self) -> Arc<ContentService> {
        Arc::clone(&self.content)
    }
}
