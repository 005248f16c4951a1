use chrono::{DateTime, Utc};

use crate::model::ids::{ExamId, QuestionId};

/// Aggregated wrong answers for one question of one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MistakeSummary {
    pub question_id: QuestionId,
    pub exam_id: ExamId,
    pub count: u32,
    pub last_attempt: DateTime<Utc>,
}
