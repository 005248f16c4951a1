use std::collections::HashSet;
use std::sync::Arc;

use exam_core::model::{ExamId, ProgressSnapshot, QuestionId, SessionSettings, UserId};
use storage::repository::{
    ExamRepository, FavoriteRepository, MistakeRepository, ProgressGateway, QuestionRepository,
    ResultRepository, Storage,
};

use super::controller::{SessionController, SessionDeps};
use super::loader::{ExamLoader, LoadedExam};
use crate::Clock;
use crate::error::SessionError;
use crate::identity::CurrentUser;

/// Starts exam sessions for the current user.
#[derive(Clone)]
pub struct SessionEngine {
    clock: Clock,
    settings: SessionSettings,
    loader: ExamLoader,
    progress: Arc<dyn ProgressGateway>,
    results: Arc<dyn ResultRepository>,
    mistakes: Arc<dyn MistakeRepository>,
    favorites: Arc<dyn FavoriteRepository>,
    user: Arc<dyn CurrentUser>,
}

impl SessionEngine {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        clock: Clock,
        settings: SessionSettings,
        exams: Arc<dyn ExamRepository>,
        questions: Arc<dyn QuestionRepository>,
        progress: Arc<dyn ProgressGateway>,
        results: Arc<dyn ResultRepository>,
        mistakes: Arc<dyn MistakeRepository>,
        favorites: Arc<dyn FavoriteRepository>,
        user: Arc<dyn CurrentUser>,
    ) -> Self {
        Self {
            clock,
            settings,
            loader: ExamLoader::new(exams, questions),
            progress,
            results,
            mistakes,
            favorites,
            user,
        }
    }

    /// Build an engine over every repository of a `Storage` bundle.
    #[must_use]
    pub fn from_storage(
        clock: Clock,
        settings: SessionSettings,
        storage: &Storage,
        user: Arc<dyn CurrentUser>,
    ) -> Self {
        Self::new(
            clock,
            settings,
            Arc::clone(&storage.exams),
            Arc::clone(&storage.questions),
            Arc::clone(&storage.progress),
            Arc::clone(&storage.results),
            Arc::clone(&storage.mistakes),
            Arc::clone(&storage.favorites),
            user,
        )
    }

    #[must_use]
    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Load the exam and start an active session, resuming a saved checkpoint when
    /// enabled.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Load` when the exam cannot be loaded. Checkpoint lookup
    /// failures only skip resuming.
    pub async fn start_session(&self, exam_id: &ExamId) -> Result<SessionController, SessionError> {
        let loaded = self.loader.load(exam_id).await?;
        self.start_loaded(loaded).await
    }

    /// Start a session for an exam the caller already loaded.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Scheduler` if the session timers cannot be scheduled.
    pub async fn start_loaded(&self, loaded: LoadedExam) -> Result<SessionController, SessionError> {
        let user_id = self.user.id();
        let resume = self.resumable_checkpoint(&user_id, loaded.exam().id()).await;
        let favorites = self.favorite_questions(&user_id, loaded.exam().id()).await;

        SessionController::start(
            loaded,
            user_id,
            resume.as_ref(),
            favorites,
            &self.settings,
            SessionDeps {
                progress: Arc::clone(&self.progress),
                results: Arc::clone(&self.results),
                mistakes: Arc::clone(&self.mistakes),
                favorites: Arc::clone(&self.favorites),
            },
            self.clock,
        )
    }

    async fn resumable_checkpoint(
        &self,
        user_id: &UserId,
        exam_id: &ExamId,
    ) -> Option<ProgressSnapshot> {
        if !self.settings.resume_from_checkpoint() {
            return None;
        }
        match self.progress.load_progress(user_id, exam_id).await {
            Ok(Some(snapshot)) if snapshot.remaining_seconds > 0 => Some(snapshot),
            Ok(Some(_)) => {
                tracing::debug!(exam_id = %exam_id, "ignoring checkpoint with no time left");
                None
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(exam_id = %exam_id, error = %e, "could not read checkpoint");
                None
            }
        }
    }

    async fn favorite_questions(&self, user_id: &UserId, exam_id: &ExamId) -> HashSet<QuestionId> {
        match self.favorites.list_favorites(user_id).await {
            Ok(favorites) => favorites
                .into_iter()
                .filter(|f| &f.exam_id == exam_id)
                .map(|f| f.question_id)
                .collect(),
            Err(e) => {
                tracing::warn!(exam_id = %exam_id, error = %e, "could not read favorites");
                HashSet::new()
            }
        }
    }
}
