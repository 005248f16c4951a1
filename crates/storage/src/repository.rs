use async_trait::async_trait;
use chrono::{DateTime, Utc};
use exam_core::model::{
    AnswerOption, Exam, ExamError, ExamId, Favorite, MistakeSummary, OptionId, ProgressSnapshot, Question,
    QuestionError, QuestionId, ResultId, SessionResult, UserId,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── RECORDS ───────────────────────────────────────────────────────────────────
//

/// Persisted shape of an exam. Durations are authored in minutes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamRecord {
    pub id: ExamId,
    pub title: String,
    pub duration_minutes: u32,
}

impl ExamRecord {
    /// Convert the record into a domain `Exam`.
    ///
    /// # Errors
    ///
    /// Returns `ExamError` if the title is blank or the duration is zero.
    pub fn into_exam(self) -> Result<Exam, ExamError> {
        Exam::from_minutes(self.id, self.title, self.duration_minutes)
    }
}

/// Persisted shape of a question, including the flags the loader filters on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionRecord {
    pub id: QuestionId,
    pub exam_id: ExamId,
    pub position: u32,
    pub prompt: String,
    pub options: Vec<AnswerOption>,
    pub correct_option: OptionId,
    pub is_active: bool,
}

impl QuestionRecord {
    #[must_use]
    pub fn from_question(question: &Question, position: u32) -> Self {
        Self {
            id: question.id().clone(),
            exam_id: question.exam_id().clone(),
            position,
            prompt: question.prompt().to_owned(),
            options: question.options().to_vec(),
            correct_option: question.correct_option().clone(),
            is_active: true,
        }
    }

    /// Convert the record back into a domain `Question`.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the stored shape violates question invariants.
    pub fn into_question(self) -> Result<Question, QuestionError> {
        Question::new(
            self.id,
            self.exam_id,
            self.prompt,
            self.options,
            self.correct_option,
        )
    }
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

#[async_trait]
pub trait ExamRepository: Send + Sync {
    /// Persist or update an exam.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the exam cannot be stored.
    async fn upsert_exam(&self, exam: &ExamRecord) -> Result<(), StorageError>;

    /// Fetch an exam by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_exam(&self, id: &ExamId) -> Result<ExamRecord, StorageError>;
}

#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Persist or update a question.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the question cannot be stored.
    async fn upsert_question(&self, question: &QuestionRecord) -> Result<(), StorageError>;

    /// Fetch the active questions of an exam, ordered by position.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails. An exam without questions is not an
    /// error at this layer.
    async fn get_active_questions(
        &self,
        exam_id: &ExamId,
    ) -> Result<Vec<QuestionRecord>, StorageError>;
}

/// Durable checkpoints of in-progress attempts, keyed by (user, exam).
#[async_trait]
pub trait ProgressGateway: Send + Sync {
    /// Overwrite the checkpoint for this user and exam.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the checkpoint cannot be written.
    async fn save_progress(
        &self,
        user_id: &UserId,
        exam_id: &ExamId,
        snapshot: &ProgressSnapshot,
    ) -> Result<(), StorageError>;

    /// Fetch the last checkpoint, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the checkpoint cannot be read.
    async fn load_progress(
        &self,
        user_id: &UserId,
        exam_id: &ExamId,
    ) -> Result<Option<ProgressSnapshot>, StorageError>;

    /// Remove the checkpoint. Removing a missing checkpoint succeeds.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the delete fails.
    async fn clear_progress(&self, user_id: &UserId, exam_id: &ExamId)
    -> Result<(), StorageError>;
}

#[async_trait]
pub trait ResultRepository: Send + Sync {
    /// Persist a result. Saving a result whose id is already stored is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the result cannot be stored.
    async fn save_result(&self, result: &SessionResult) -> Result<(), StorageError>;

    /// List a user's results, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails.
    async fn list_results(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<SessionResult>, StorageError>;
}

/// Per-user wrong-answer counters.
#[async_trait]
pub trait MistakeRepository: Send + Sync {
    /// Increment the wrong-answer count of each question and stamp `at` as the last attempt.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the counters cannot be updated.
    async fn record_mistakes(
        &self,
        user_id: &UserId,
        exam_id: &ExamId,
        question_ids: &[QuestionId],
        at: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// List a user's mistakes, most recent attempt first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails.
    async fn list_mistakes(&self, user_id: &UserId) -> Result<Vec<MistakeSummary>, StorageError>;
}

/// Per-user bookmarked questions.
#[async_trait]
pub trait FavoriteRepository: Send + Sync {
    /// Add the question to the user's favorites, or remove it if it is already there.
    /// Returns whether the question is a favorite afterwards.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the favorite cannot be written or removed.
    async fn toggle_favorite(
        &self,
        user_id: &UserId,
        exam_id: &ExamId,
        question_id: &QuestionId,
        at: DateTime<Utc>,
    ) -> Result<bool, StorageError>;

    /// List a user's favorites, most recently added first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails.
    async fn list_favorites(&self, user_id: &UserId) -> Result<Vec<Favorite>, StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

type ProgressKey = (UserId, ExamId);
type MistakeKey = (UserId, QuestionId);
type FavoriteKey = (UserId, QuestionId);

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    exams: Arc<Mutex<HashMap<ExamId, ExamRecord>>>,
    questions: Arc<Mutex<HashMap<QuestionId, QuestionRecord>>>,
    progress: Arc<Mutex<HashMap<ProgressKey, ProgressSnapshot>>>,
    results: Arc<Mutex<HashMap<ResultId, SessionResult>>>,
    mistakes: Arc<Mutex<HashMap<MistakeKey, MistakeSummary>>>,
    favorites: Arc<Mutex<HashMap<FavoriteKey, Favorite>>>,
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored results across all users.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn result_count(&self) -> Result<usize, StorageError> {
        Ok(self.results.lock().map_err(poisoned)?.len())
    }
}

#[async_trait]
impl ExamRepository for InMemoryRepository {
    async fn upsert_exam(&self, exam: &ExamRecord) -> Result<(), StorageError> {
        let mut guard = self.exams.lock().map_err(poisoned)?;
        guard.insert(exam.id.clone(), exam.clone());
        Ok(())
    }

    async fn get_exam(&self, id: &ExamId) -> Result<ExamRecord, StorageError> {
        let guard = self.exams.lock().map_err(poisoned)?;
        guard.get(id).cloned().ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn upsert_question(&self, question: &QuestionRecord) -> Result<(), StorageError> {
        let mut guard = self.questions.lock().map_err(poisoned)?;
        guard.insert(question.id.clone(), question.clone());
        Ok(())
    }

    async fn get_active_questions(
        &self,
        exam_id: &ExamId,
    ) -> Result<Vec<QuestionRecord>, StorageError> {
        let guard = self.questions.lock().map_err(poisoned)?;
        let mut found: Vec<_> = guard
            .values()
            .filter(|q| q.is_active && &q.exam_id == exam_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.id.cmp(&b.id)));
        Ok(found)
    }
}

#[async_trait]
impl ProgressGateway for InMemoryRepository {
    async fn save_progress(
        &self,
        user_id: &UserId,
        exam_id: &ExamId,
        snapshot: &ProgressSnapshot,
    ) -> Result<(), StorageError> {
        let mut guard = self.progress.lock().map_err(poisoned)?;
        guard.insert((user_id.clone(), exam_id.clone()), snapshot.clone());
        Ok(())
    }

    async fn load_progress(
        &self,
        user_id: &UserId,
        exam_id: &ExamId,
    ) -> Result<Option<ProgressSnapshot>, StorageError> {
        let guard = self.progress.lock().map_err(poisoned)?;
        Ok(guard.get(&(user_id.clone(), exam_id.clone())).cloned())
    }

    async fn clear_progress(
        &self,
        user_id: &UserId,
        exam_id: &ExamId,
    ) -> Result<(), StorageError> {
        let mut guard = self.progress.lock().map_err(poisoned)?;
        guard.remove(&(user_id.clone(), exam_id.clone()));
        Ok(())
    }
}

#[async_trait]
impl ResultRepository for InMemoryRepository {
    async fn save_result(&self, result: &SessionResult) -> Result<(), StorageError> {
        let mut guard = self.results.lock().map_err(poisoned)?;
        guard.entry(result.id()).or_insert_with(|| result.clone());
        Ok(())
    }

    async fn list_results(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<SessionResult>, StorageError> {
        let guard = self.results.lock().map_err(poisoned)?;
        let mut found: Vec<_> = guard
            .values()
            .filter(|r| r.user_id() == user_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.completed_at().cmp(&a.completed_at()));
        found.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(found)
    }
}

#[async_trait]
impl MistakeRepository for InMemoryRepository {
    async fn record_mistakes(
        &self,
        user_id: &UserId,
        exam_id: &ExamId,
        question_ids: &[QuestionId],
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut guard = self.mistakes.lock().map_err(poisoned)?;
        for question_id in question_ids {
            guard
                .entry((user_id.clone(), question_id.clone()))
                .and_modify(|m| {
                    m.count += 1;
                    m.exam_id = exam_id.clone();
                    m.last_attempt = m.last_attempt.max(at);
                })
                .or_insert_with(|| MistakeSummary {
                    question_id: question_id.clone(),
                    exam_id: exam_id.clone(),
                    count: 1,
                    last_attempt: at,
                });
        }
        Ok(())
    }

    async fn list_mistakes(&self, user_id: &UserId) -> Result<Vec<MistakeSummary>, StorageError> {
        let guard = self.mistakes.lock().map_err(poisoned)?;
        let mut found: Vec<_> = guard
            .iter()
            .filter(|((owner, _), _)| owner == user_id)
            .map(|(_, m)| m.clone())
            .collect();
        found.sort_by(|a, b| {
            b.last_attempt
                .cmp(&a.last_attempt)
                .then_with(|| a.question_id.cmp(&b.question_id))
        });
        Ok(found)
    }
}

#[async_trait]
impl FavoriteRepository for InMemoryRepository {
    async fn toggle_favorite(
        &self,
        user_id: &UserId,
        exam_id: &ExamId,
        question_id: &QuestionId,
        at: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        let mut guard = self.favorites.lock().map_err(poisoned)?;
        let key = (user_id.clone(), question_id.clone());
        if guard.remove(&key).is_some() {
            return Ok(false);
        }
        guard.insert(
            key,
            Favorite {
                question_id: question_id.clone(),
                exam_id: exam_id.clone(),
                added_at: at,
            },
        );
        Ok(true)
    }

    async fn list_favorites(&self, user_id: &UserId) -> Result<Vec<Favorite>, StorageError> {
        let guard = self.favorites.lock().map_err(poisoned)?;
        let mut found: Vec<_> = guard
            .iter()
            .filter(|((owner, _), _)| owner == user_id)
            .map(|(_, f)| f.clone())
            .collect();
        found.sort_by(|a, b| {
            b.added_at
                .cmp(&a.added_at)
                .then_with(|| a.question_id.cmp(&b.question_id))
        });
        Ok(found)
    }
}

//
// ─── AGGREGATE ─────────────────────────────────────────────────────────────────
//

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub exams: Arc<dyn ExamRepository>,
    pub questions: Arc<dyn QuestionRepository>,
    pub progress: Arc<dyn ProgressGateway>,
    pub results: Arc<dyn ResultRepository>,
    pub mistakes: Arc<dyn MistakeRepository>,
    pub favorites: Arc<dyn FavoriteRepository>,
}

impl Storage {
    /// Share one backend across every contract.
    #[must_use]
    pub fn from_repository<R>(repo: R) -> Self
    where
        R: ExamRepository
            + QuestionRepository
            + ProgressGateway
            + ResultRepository
            + MistakeRepository
            + FavoriteRepository
            + Clone
            + 'static,
    {
        Self {
            exams: Arc::new(repo.clone()),
            questions: Arc::new(repo.clone()),
            progress: Arc::new(repo.clone()),
            results: Arc::new(repo.clone()),
            mistakes: Arc::new(repo.clone()),
            favorites: Arc::new(repo),
        }
    }
}
