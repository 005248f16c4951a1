#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use exam_core::model::{
    AnswerOption, Exam, ExamId, OptionId, ProgressSnapshot, Question, QuestionId, SessionResult,
    SessionSettings, UserId,
};
use exam_core::time::fixed_clock;
use services::{LoadedExam, SessionEngine, SessionEvent};
use storage::repository::{
    InMemoryRepository, ProgressGateway, ResultRepository, StorageError,
};

pub const USER: &str = "u1";
pub const EXAM: &str = "e1";

/// Question with options `A` and `B`; `A` is correct.
pub fn question(id: &str) -> Question {
    Question::new(
        QuestionId::new(id),
        ExamId::new(EXAM),
        format!("Prompt {id}"),
        vec![
            AnswerOption::new(OptionId::new("A"), "first"),
            AnswerOption::new(OptionId::new("B"), "second"),
        ],
        OptionId::new("A"),
    )
    .unwrap()
}

pub fn loaded(duration_secs: u32, questions: usize) -> LoadedExam {
    LoadedExam::new(
        Exam::new(ExamId::new(EXAM), "Deneme", duration_secs).unwrap(),
        (1..=questions).map(|i| question(&format!("q{i}"))).collect(),
    )
    .unwrap()
}

pub fn qid(id: &str) -> QuestionId {
    QuestionId::new(id)
}

pub fn correct() -> OptionId {
    OptionId::new("A")
}

pub fn wrong() -> OptionId {
    OptionId::new("B")
}

pub fn ticks(events: &[SessionEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, SessionEvent::Tick { .. }))
        .count()
}

pub fn count(events: &[SessionEvent], pred: impl Fn(&SessionEvent) -> bool) -> usize {
    events.iter().filter(|e| pred(e)).count()
}

//
// ─── FAKES ─────────────────────────────────────────────────────────────────────
//

/// Result store that counts write attempts and can fail the first few.
#[derive(Clone, Default)]
pub struct CountingResults {
    pub inner: InMemoryRepository,
    attempts: Arc<AtomicU32>,
    failures_left: Arc<AtomicU32>,
}

impl CountingResults {
    pub fn failing_first(inner: InMemoryRepository, failures: u32) -> Self {
        let results = Self {
            inner,
            ..Self::default()
        };
        results.failures_left.store(failures, Ordering::SeqCst);
        results
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResultRepository for CountingResults {
    async fn save_result(&self, result: &SessionResult) -> Result<(), StorageError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(StorageError::Connection("result store offline".into()));
        }
        self.inner.save_result(result).await
    }

    async fn list_results(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<SessionResult>, StorageError> {
        self.inner.list_results(user_id, limit).await
    }
}

/// Progress gateway that keeps every written snapshot and can refuse writes.
#[derive(Clone, Default)]
pub struct RecordingProgress {
    pub inner: InMemoryRepository,
    saved: Arc<Mutex<Vec<ProgressSnapshot>>>,
    offline: Arc<AtomicBool>,
}

impl RecordingProgress {
    pub fn new(inner: InMemoryRepository) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn saved(&self) -> Vec<ProgressSnapshot> {
        self.saved.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProgressGateway for RecordingProgress {
    async fn save_progress(
        &self,
        user_id: &UserId,
        exam_id: &ExamId,
        snapshot: &ProgressSnapshot,
    ) -> Result<(), StorageError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StorageError::Connection("progress store offline".into()));
        }
        self.saved.lock().unwrap().push(snapshot.clone());
        self.inner.save_progress(user_id, exam_id, snapshot).await
    }

    async fn load_progress(
        &self,
        user_id: &UserId,
        exam_id: &ExamId,
    ) -> Result<Option<ProgressSnapshot>, StorageError> {
        self.inner.load_progress(user_id, exam_id).await
    }

    async fn clear_progress(&self, user_id: &UserId, exam_id: &ExamId) -> Result<(), StorageError> {
        self.inner.clear_progress(user_id, exam_id).await
    }
}

//
// ─── HARNESS ───────────────────────────────────────────────────────────────────
//

pub struct Harness {
    pub repo: InMemoryRepository,
    pub results: CountingResults,
    pub progress: RecordingProgress,
    pub engine: SessionEngine,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(SessionSettings::default(), 0)
    }

    pub fn with(settings: SessionSettings, result_failures: u32) -> Self {
        let repo = InMemoryRepository::new();
        let results = CountingResults::failing_first(repo.clone(), result_failures);
        let progress = RecordingProgress::new(repo.clone());
        let engine = SessionEngine::new(
            fixed_clock(),
            settings,
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            Arc::new(progress.clone()),
            Arc::new(results.clone()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            Arc::new(UserId::new(USER)),
        );
        Self {
            repo,
            results,
            progress,
            engine,
        }
    }

    pub fn stored_results(&self) -> usize {
        self.repo.result_count().unwrap()
    }
}
