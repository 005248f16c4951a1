use async_trait::async_trait;
use exam_core::model::ExamId;
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, ser, u32_from_i64};
use crate::repository::{ExamRecord, ExamRepository, StorageError};

#[async_trait]
impl ExamRepository for SqliteRepository {
    async fn upsert_exam(&self, exam: &ExamRecord) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO exams (id, title, duration_minutes)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(id) DO UPDATE SET
                    title = excluded.title,
                    duration_minutes = excluded.duration_minutes
            ",
        )
        .bind(exam.id.as_str())
        .bind(&exam.title)
        .bind(i64::from(exam.duration_minutes))
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn get_exam(&self, id: &ExamId) -> Result<ExamRecord, StorageError> {
        let row = sqlx::query(
            r"
                SELECT id, title, duration_minutes
                FROM exams
                WHERE id = ?1
            ",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;

        Ok(ExamRecord {
            id: ExamId::new(row.try_get::<String, _>("id").map_err(ser)?),
            title: row.try_get("title").map_err(ser)?,
            duration_minutes: u32_from_i64(
                "duration_minutes",
                row.try_get::<i64, _>("duration_minutes").map_err(ser)?,
            )?,
        })
    }
}
