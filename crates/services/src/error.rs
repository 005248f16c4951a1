//! Shared error types for the services crate.

use thiserror::Error;

use exam_core::model::{ExamError, ExamId, OptionId, QuestionError, QuestionId, SessionResult};
use exam_core::scheduler::SchedulerError;
use storage::repository::StorageError;

/// Errors that prevent a session from starting. Not retried automatically.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadError {
    #[error("exam {0} not found")]
    ExamNotFound(ExamId),
    #[error("exam {0} has no active questions")]
    NoActiveQuestions(ExamId),
    #[error("question {question_id} belongs to exam {exam_id}")]
    ForeignQuestion {
        question_id: QuestionId,
        exam_id: ExamId,
    },
    #[error("question {0} appears more than once")]
    DuplicateQuestion(QuestionId),
    #[error("invalid exam record: {0}")]
    InvalidExam(#[from] ExamError),
    #[error("invalid question {question_id}: {source}")]
    InvalidQuestion {
        question_id: QuestionId,
        #[source]
        source: QuestionError,
    },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Answer input that was refused. Nothing in the session changes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AnswerRejected {
    #[error("session is not active")]
    NotActive,
    #[error("question {0} is not part of this exam")]
    UnknownQuestion(QuestionId),
    #[error("question {question_id} has no option number {position}")]
    NoSuchChoice {
        question_id: QuestionId,
        position: usize,
    },
    #[error("option {option_id} does not belong to question {question_id}")]
    UnknownOption {
        question_id: QuestionId,
        option_id: OptionId,
    },
}

/// Errors emitted by session services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error(transparent)]
    Load(#[from] LoadError),
    /// The session finished but its result could not be stored. The result can be
    /// re-submitted as-is.
    #[error("session finished but the result could not be saved: {source}")]
    ResultWrite {
        result: Box<SessionResult>,
        #[source]
        source: StorageError,
    },
    #[error("session has not finished yet")]
    NotFinished,
    #[error(transparent)]
    Rejected(#[from] AnswerRejected),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
