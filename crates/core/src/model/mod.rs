mod answers;
mod exam;
mod favorite;
mod ids;
mod mistake;
mod question;
mod session;
mod settings;

pub use ids::{ExamId, OptionId, ParseIdError, QuestionId, ResultId, UserId};

pub use answers::AnswerMap;
pub use exam::{Exam, ExamError};
pub use favorite::Favorite;
pub use mistake::MistakeSummary;
pub use question::{AnswerOption, Question, QuestionError};
pub use session::{ProgressSnapshot, ResultError, SessionResult};
pub use settings::{SessionSettings, SessionSettingsDraft, SettingsError, TICK_PERIOD};
