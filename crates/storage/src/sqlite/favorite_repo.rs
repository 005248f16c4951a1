use async_trait::async_trait;
use chrono::{DateTime, Utc};
use exam_core::model::{ExamId, Favorite, QuestionId, UserId};

use super::SqliteRepository;
use super::mapping::{conn, map_favorite_row};
use crate::repository::{FavoriteRepository, StorageError};

#[async_trait]
impl FavoriteRepository for SqliteRepository {
    async fn toggle_favorite(
        &self,
        user_id: &UserId,
        exam_id: &ExamId,
        question_id: &QuestionId,
        at: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;
        let removed = sqlx::query(
            r"
                DELETE FROM favorites
                WHERE user_id = ?1 AND question_id = ?2
            ",
        )
        .bind(user_id.as_str())
        .bind(question_id.as_str())
        .execute(&mut *tx)
        .await
        .map_err(conn)?
        .rows_affected();

        if removed == 0 {
            sqlx::query(
                r"
                    INSERT INTO favorites (user_id, question_id, exam_id, added_at)
                    VALUES (?1, ?2, ?3, ?4)
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
        Ok(removed == 0)
    }

    async fn list_favorites(&self, user_id: &UserId) -> Result<Vec<Favorite>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT question_id, exam_id, added_at
                FROM favorites
                WHERE user_id = ?1
                ORDER BY added_at DESC, question_id ASC
            ",
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_favorite_row).collect()
    }
}
