use async_trait::async_trait;
use exam_core::model::{AnswerMap, ExamId, ProgressSnapshot, UserId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, ser, u32_from_i64};
use crate::repository::{ProgressGateway, StorageError};

#[async_trait]
impl ProgressGateway for SqliteRepository {
    async fn save_progress(
        &self,
        user_id: &UserId,
        exam_id: &ExamId,
        snapshot: &ProgressSnapshot,
    ) -> Result<(), StorageError> {
        let answers = serde_json::to_string(&snapshot.answers).map_err(ser)?;
        sqlx::query(
            r"
                INSERT INTO exam_progress (user_id, exam_id, answers, remaining_seconds, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(user_id, exam_id) DO UPDATE SET
                    answers = excluded.answers,
                    remaining_seconds = excluded.remaining_seconds,
                    updated_at = excluded.updated_at
            ",
        )
        .bind(user_id.as_str())
        .bind(exam_id.as_str())
        .bind(answers)
        .bind(i64::from(snapshot.remaining_seconds))
        .bind(snapshot.updated_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn load_progress(
        &self,
        user_id: &UserId,
        exam_id: &ExamId,
    ) -> Result<Option<ProgressSnapshot>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT answers, remaining_seconds, updated_at
                FROM exam_progress
                WHERE user_id = ?1 AND exam_id = ?2
            ",
        )
        .bind(user_id.as_str())
        .bind(exam_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let answers_json: String = row.try_get("answers").map_err(ser)?;
        let answers: AnswerMap = serde_json::from_str(&answers_json).map_err(ser)?;
        Ok(Some(ProgressSnapshot {
            answers,
            remaining_seconds: u32_from_i64(
                "remaining_seconds",
                row.try_get::<i64, _>("remaining_seconds").map_err(ser)?,
            )?,
            updated_at: row.try_get("updated_at").map_err(ser)?,
        }))
    }

    async fn clear_progress(
        &self,
        user_id: &UserId,
        exam_id: &ExamId,
    ) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM exam_progress WHERE user_id = ?1 AND exam_id = ?2")
            .bind(user_id.as_str())
            .bind(exam_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(())
    }
}
