use async_trait::async_trait;
use exam_core::model::{AnswerOption, ExamId, OptionId, QuestionId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, ser, u32_from_i64};
use crate::repository::{QuestionRecord, QuestionRepository, StorageError};

fn map_question_row(row: &sqlx::sqlite::SqliteRow) -> Result<QuestionRecord, StorageError> {
    let options_json: String = row.try_get("options").map_err(ser)?;
    let options: Vec<AnswerOption> = serde_json::from_str(&options_json).map_err(ser)?;

    Ok(QuestionRecord {
        id: QuestionId::new(row.try_get::<String, _>("id").map_err(ser)?),
        exam_id: ExamId::new(row.try_get::<String, _>("exam_id").map_err(ser)?),
        position: u32_from_i64("position", row.try_get::<i64, _>("position").map_err(ser)?)?,
        prompt: row.try_get("prompt").map_err(ser)?,
        options,
        correct_option: OptionId::new(row.try_get::<String, _>("correct_option").map_err(ser)?),
        is_active: row.try_get("is_active").map_err(ser)?,
    })
}

#[async_trait]
impl QuestionRepository for SqliteRepository {
    async fn upsert_question(&self, question: &QuestionRecord) -> Result<(), StorageError> {
        let options = serde_json::to_string(&question.options).map_err(ser)?;
        sqlx::query(
            r"
                INSERT INTO questions (
                    id, exam_id, position, prompt, options, correct_option, is_active
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(id) DO UPDATE SET
                    exam_id = excluded.exam_id,
                    position = excluded.position,
                    prompt = excluded.prompt,
                    options = excluded.options,
                    correct_option = excluded.correct_option,
                    is_active = excluded.is_active
            ",
        )
        .bind(question.id.as_str())
        .bind(question.exam_id.as_str())
        .bind(i64::from(question.position))
        .bind(&question.prompt)
        .bind(options)
        .bind(question.correct_option.as_str())
        .bind(question.is_active)
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn get_active_questions(
        &self,
        exam_id: &ExamId,
    ) -> Result<Vec<QuestionRecord>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, exam_id, position, prompt, options, correct_option, is_active
                FROM questions
                WHERE exam_id = ?1 AND is_active = 1
                ORDER BY position ASC, id ASC
            ",
        )
        .bind(exam_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_question_row).collect()
    }
}
