use chrono::{DateTime, Utc};

use crate::model::ids::{ExamId, QuestionId};

/// A question a user bookmarked for later study.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Favorite {
    pub question_id: QuestionId,
    pub exam_id: ExamId,
    pub added_at: DateTime<Utc>,
}
