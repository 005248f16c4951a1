#![forbid(unsafe_code)]

pub mod error;
pub mod identity;
pub mod sessions;

pub use exam_core::Clock;

pub use error::{AnswerRejected, LoadError, SessionError};
pub use identity::CurrentUser;

pub use sessions::{
    ExamLoader, FinishOutcome, FinishReason, LoadedExam, ResultHistoryService, ResultListItem,
    SessionCommand, SessionController, SessionEngine, SessionEvent, SessionProgress, SessionRun,
    SessionStatus, format_clock, run_session,
};
