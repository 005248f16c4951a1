mod answers;
mod autosave;
mod controller;
mod loader;
mod progress;
mod runner;
mod state;
mod timer;
mod view;
mod workflow;

// Public API of the session subsystem.
pub use answers::{AnswerTracker, SelectOutcome};
pub use autosave::AutosavePersister;
pub use controller::{FinishOutcome, FinishReason, SessionController, SessionEvent};
pub use loader::{ExamLoader, LoadedExam};
pub use progress::{SessionProgress, format_clock};
pub use runner::{SessionCommand, SessionRun, run_session};
pub use state::{SessionState, SessionStatus};
pub use timer::{Tick, TimerController, TimerState};
pub use view::{ResultHistoryService, ResultListItem};
pub use workflow::SessionEngine;
