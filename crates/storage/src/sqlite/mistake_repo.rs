use async_trait::async_trait;
use chrono::{DateTime, Utc};
use exam_core::model::{ExamId, MistakeSummary, QuestionId, UserId};

use super::SqliteRepository;
use super::mapping::{conn, map_mistake_row};
use crate::repository::{MistakeRepository, StorageError};

#[async_trait]
impl MistakeRepository for SqliteRepository {
    async fn record_mistakes(
        &self,
        user_id: &UserId,
        exam_id: &ExamId,
        question_ids: &[QuestionId],
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        if question_ids.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(conn)?;
        for question_id in question_ids {
            sqlx::query(
                r"
                    INSERT INTO mistakes (user_id, question_id, exam_id, wrong_count, last_attempt)
                    VALUES (?1, ?2, ?3, 1, ?4)
                    ON CONFLICT(user_id, question_id) DO UPDATE SET
                        wrong_count = wrong_count + 1,
                        exam_id = excluded.exam_id,
                        last_attempt = MAX(last_attempt, excluded.last_attempt)
                ",
            )
            .bind(user_id.as_str())
            .bind(question_id.as_str())
            .bind(exam_id.as_str())
            .bind(at)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }
        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn list_mistakes(&self, user_id: &UserId) -> Result<Vec<MistakeSummary>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT question_id, exam_id, wrong_count, last_attempt
                FROM mistakes
                WHERE user_id = ?1
                ORDER BY last_attempt DESC, question_id ASC
            ",
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_mistake_row).collect()
    }
}
