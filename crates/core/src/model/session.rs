use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::answers::AnswerMap;
use crate::model::ids::{ExamId, ResultId, UserId};
use crate::scoring::Score;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ResultError {
    #[error("correct count ({correct}) exceeds total count ({total})")]
    CorrectExceedsTotal { correct: u32, total: u32 },
}

//
// ─── SESSION RESULT ────────────────────────────────────────────────────────────
//

/// Final outcome of one finished exam attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionResult {
    id: ResultId,
    exam_id: ExamId,
    user_id: UserId,
    correct_count: u32,
    total_count: u32,
    completed_at: DateTime<Utc>,
}

impl SessionResult {
    /// Builds a fresh result from a computed score.
    #[must_use]
    pub fn new(exam_id: ExamId, user_id: UserId, score: Score, completed_at: DateTime<Utc>) -> Self {
        Self {
            id: ResultId::generate(),
            exam_id,
            user_id,
            correct_count: score.correct(),
            total_count: score.total(),
            completed_at,
        }
    }

    /// Rehydrate a result from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `ResultError::CorrectExceedsTotal` if the counts are inconsistent.
    pub fn from_persisted(
        id: ResultId,
        exam_id: ExamId,
        user_id: UserId,
        correct_count: u32,
        total_count: u32,
        completed_at: DateTime<Utc>,
    ) -> Result<Self, ResultError> {
        if correct_count > total_count {
            return Err(ResultError::CorrectExceedsTotal {
                correct: correct_count,
                total: total_count,
            });
        }

        Ok(Self {
            id,
            exam_id,
            user_id,
            correct_count,
            total_count,
            completed_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> ResultId {
        self.id
    }

    #[must_use]
    pub fn exam_id(&self) -> &ExamId {
        &self.exam_id
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    #[must_use]
    pub fn correct_count(&self) -> u32 {
        self.correct_count
    }

    #[must_use]
    pub fn total_count(&self) -> u32 {
        self.total_count
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn score(&self) -> Score {
        Score::new(self.correct_count, self.total_count)
    }
}

//
// ─── PROGRESS SNAPSHOT ─────────────────────────────────────────────────────────
//

/// Checkpoint payload: everything needed to resume an interrupted attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub answers: AnswerMap,
    pub remaining_seconds: u32,
    pub updated_at: DateTime<Utc>,
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn result_copies_score_counts() {
        let result = SessionResult::new(
            ExamId::new("e1"),
            UserId::new("u1"),
            Score::new(3, 5),
            fixed_now(),
        );
        assert_eq!(result.correct_count(), 3);
        assert_eq!(result.total_count(), 5);
        assert_eq!(result.completed_at(), fixed_now());
    }

    #[test]
    fn persisted_result_rejects_inconsistent_counts() {
        let err = SessionResult::from_persisted(
            ResultId::generate(),
            ExamId::new("e1"),
            UserId::new("u1"),
            6,
            5,
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(err, ResultError::CorrectExceedsTotal { correct: 6, total: 5 });
    }

    #[test]
    fn new_results_get_distinct_ids() {
        let a = SessionResult::new(ExamId::new("e"), UserId::new("u"), Score::new(0, 1), fixed_now());
        let b = SessionResult::new(ExamId::new("e"), UserId::new("u"), Score::new(0, 1), fixed_now());
        assert_ne!(a.id(), b.id());
    }
}
