use exam_core::model::{AnswerMap, ExamId};

/// Lifecycle of a session. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Loading,
    Active,
    Finished,
}

/// Authoritative in-memory data of one attempt.
///
/// Read-only outside the crate; the answer tracker, the timer and the controller
/// are the only writers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    exam_id: ExamId,
    question_count: usize,
    current_question_index: usize,
    remaining_seconds: u32,
    answers: AnswerMap,
    status: SessionStatus,
}

impl SessionState {
    pub(crate) fn new(exam_id: ExamId, question_count: usize, remaining_seconds: u32) -> Self {
        Self {
            exam_id,
            question_count,
            current_question_index: 0,
            remaining_seconds,
            answers: AnswerMap::new(),
            status: SessionStatus::Loading,
        }
    }

    #[must_use]
    pub fn exam_id(&self) -> &ExamId {
        &self.exam_id
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.question_count
    }

    #[must_use]
    pub fn current_question_index(&self) -> usize {
        self.current_question_index
    }

    #[must_use]
    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    pub(crate) fn answers_mut(&mut self) -> &mut AnswerMap {
        &mut self.answers
    }

    pub(crate) fn remaining_seconds_mut(&mut self) -> &mut u32 {
        &mut self.remaining_seconds
    }

    /// Clamp and store the current index. No-op for an empty question set.
    pub(crate) fn set_current_question_index(&mut self, index: usize) {
        let last = self.question_count.saturating_sub(1);
        self.current_question_index = index.min(last);
    }

    pub(crate) fn activate(&mut self) {
        if self.status == SessionStatus::Loading {
            self.status = SessionStatus::Active;
        }
    }

    pub(crate) fn finish(&mut self) {
        self.status = SessionStatus::Finished;
    }
}
