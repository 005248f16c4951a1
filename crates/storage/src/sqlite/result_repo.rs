use async_trait::async_trait;
use exam_core::model::{SessionResult, UserId};

use super::SqliteRepository;
use super::mapping::{conn, map_result_row};
use crate::repository::{ResultRepository, StorageError};

#[async_trait]
impl ResultRepository for SqliteRepository {
    async fn save_result(&self, result: &SessionResult) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO exam_results (
                    id, user_id, exam_id, correct_count, total_count, completed_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(id) DO NOTHING
            ",
        )
        .bind(result.id().to_string())
        .bind(result.user_id().as_str())
        .bind(result.exam_id().as_str())
        .bind(i64::from(result.correct_count()))
        .bind(i64::from(result.total_count()))
        .bind(result.completed_at())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        if res.rows_affected() == 0 {
            tracing::debug!(result_id = %result.id(), "result already stored");
        }
        Ok(())
    }

    async fn list_results(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<SessionResult>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, user_id, exam_id, correct_count, total_count, completed_at
                FROM exam_results
                WHERE user_id = ?1
                ORDER BY completed_at DESC, id DESC
                LIMIT ?2
            ",
        )
        .bind(user_id.as_str())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_result_row).collect()
    }
}
