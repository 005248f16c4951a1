use thiserror::Error;

use crate::model::ids::ExamId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExamError {
    #[error("exam title cannot be empty")]
    EmptyTitle,

    #[error("exam duration must be > 0 seconds")]
    ZeroDuration,

    #[error("exam duration of {minutes} minutes is too long")]
    DurationOverflow { minutes: u32 },
}

//
// ─── EXAM ──────────────────────────────────────────────────────────────────────
//

/// Exam metadata as seen by a session.
///
/// Immutable once loaded; the question set is carried separately by the loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exam {
    id: ExamId,
    title: String,
    duration_secs: u32,
}

impl Exam {
    /// Creates a validated exam.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::EmptyTitle` for a blank title and
    /// `ExamError::ZeroDuration` when the duration is zero.
    pub fn new(id: ExamId, title: impl Into<String>, duration_secs: u32) -> Result<Self, ExamError> {
        let title = title.into().trim().to_owned();
        if title.is_empty() {
            return Err(ExamError::EmptyTitle);
        }
        if duration_secs == 0 {
            return Err(ExamError::ZeroDuration);
        }

        Ok(Self {
            id,
            title,
            duration_secs,
        })
    }

    /// Creates an exam from a duration expressed in whole minutes, the unit exams are
    /// authored in.
    ///
    /// # Errors
    ///
    /// Same as [`Exam::new`], plus `ExamError::DurationOverflow` if the duration does
    /// not fit in seconds.
    pub fn from_minutes(
        id: ExamId,
        title: impl Into<String>,
        duration_minutes: u32,
    ) -> Result<Self, ExamError> {
        let secs = duration_minutes
            .checked_mul(60)
            .ok_or(ExamError::DurationOverflow {
                minutes: duration_minutes,
            })?;
        Self::new(id, title, secs)
    }

    #[must_use]
    pub fn id(&self) -> &ExamId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Total time allowed for one attempt, in seconds.
    #[must_use]
    pub fn duration_secs(&self) -> u32 {
        self.duration_secs
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exam_rejects_blank_title() {
        let err = Exam::new(ExamId::new("e1"), "   ", 60).unwrap_err();
        assert_eq!(err, ExamError::EmptyTitle);
    }

    #[test]
    fn exam_rejects_zero_duration() {
        let err = Exam::new(ExamId::new("e1"), "Deneme 1", 0).unwrap_err();
        assert_eq!(err, ExamError::ZeroDuration);
    }

    #[test]
    fn exam_from_minutes_converts_to_seconds() {
        let exam = Exam::from_minutes(ExamId::new("e1"), " Deneme 1 ", 90).unwrap();
        assert_eq!(exam.duration_secs(), 5_400);
        assert_eq!(exam.title(), "Deneme 1");
    }

    #[test]
    fn exam_from_minutes_detects_overflow() {
        let err = Exam::from_minutes(ExamId::new("e1"), "Long", u32::MAX).unwrap_err();
        assert!(matches!(err, ExamError::DurationOverflow { .. }));
    }
}
