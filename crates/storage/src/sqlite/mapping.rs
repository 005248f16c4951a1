use exam_core::model::{
    ExamId, Favorite, MistakeSummary, QuestionId, ResultId, SessionResult, UserId,
};
use sqlx::Row;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn map_result_row(row: &sqlx::sqlite::SqliteRow) -> Result<SessionResult, StorageError> {
    let id: ResultId = row
        .try_get::<String, _>("id")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let user_id = UserId::new(row.try_get::<String, _>("user_id").map_err(ser)?);
    let exam_id = ExamId::new(row.try_get::<String, _>("exam_id").map_err(ser)?);
    let correct = u32_from_i64(
        "correct_count",
        row.try_get::<i64, _>("correct_count").map_err(ser)?,
    )?;
    let total = u32_from_i64(
        "total_count",
        row.try_get::<i64, _>("total_count").map_err(ser)?,
    )?;
    let completed_at = row.try_get("completed_at").map_err(ser)?;

    SessionResult::from_persisted(id, exam_id, user_id, correct, total, completed_at).map_err(ser)
}

pub(crate) fn map_mistake_row(row: &sqlx::sqlite::SqliteRow) -> Result<MistakeSummary, StorageError> {
    Ok(MistakeSummary {
        question_id: QuestionId::new(row.try_get::<String, _>("question_id").map_err(ser)?),
        exam_id: ExamId::new(row.try_get::<String, _>("exam_id").map_err(ser)?),
        count: u32_from_i64(
            "wrong_count",
            row.try_get::<i64, _>("wrong_count").map_err(ser)?,
        )?,
        last_attempt: row.try_get("last_attempt").map_err(ser)?,
    })
}

pub(crate) fn map_favorite_row(row: &sqlx::sqlite::SqliteRow) -> Result<Favorite, StorageError> {
    Ok(Favorite {
        question_id: QuestionId::new(row.try_get::<String, _>("question_id").map_err(ser)?),
        exam_id: ExamId::new(row.try_get::<String, _>("exam_id").map_err(ser)?),
        added_at: row.try_get("added_at").map_err(ser)?,
    })
}
