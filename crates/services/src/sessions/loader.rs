use std::collections::HashSet;
use std::sync::Arc;

use exam_core::model::{Exam, ExamId, Question};
use storage::repository::{ExamRepository, QuestionRepository, StorageError};

use crate::error::LoadError;

/// Exam metadata plus its active questions, ready for a session.
///
/// The question set is non-empty, belongs to the exam and has unique ids.
#[derive(Debug, Clone)]
pub struct LoadedExam {
    exam: Exam,
    questions: Vec<Question>,
}

impl LoadedExam {
    /// Pair an exam with its question set, in display order.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::NoActiveQuestions` for an empty set,
    /// `LoadError::ForeignQuestion` for a question of another exam, and
    /// `LoadError::DuplicateQuestion` when an id appears twice.
    pub fn new(exam: Exam, questions: Vec<Question>) -> Result<Self, LoadError> {
        if questions.is_empty() {
            return Err(LoadError::NoActiveQuestions(exam.id().clone()));
        }
        let mut seen = HashSet::with_capacity(questions.len());
        for question in &questions {
            if question.exam_id() != exam.id() {
                return Err(LoadError::ForeignQuestion {
                    question_id: question.id().clone(),
                    exam_id: question.exam_id().clone(),
                });
            }
            if !seen.insert(question.id()) {
                return Err(LoadError::DuplicateQuestion(question.id().clone()));
            }
        }
        Ok(Self { exam, questions })
    }

    #[must_use]
    pub fn exam(&self) -> &Exam {
        &self.exam
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn into_parts(self) -> (Exam, Vec<Question>) {
        (self.exam, self.questions)
    }
}

/// Reads an exam and its active question set from storage.
#[derive(Clone)]
pub struct ExamLoader {
    exams: Arc<dyn ExamRepository>,
    questions: Arc<dyn QuestionRepository>,
}

impl ExamLoader {
    #[must_use]
    pub fn new(exams: Arc<dyn ExamRepository>, questions: Arc<dyn QuestionRepository>) -> Self {
        Self { exams, questions }
    }

    /// Load the exam and its active questions in display order.
    ///
    /// Question records that are inactive or belong to another exam are skipped even
    /// if the repository returns them.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::ExamNotFound` for an unknown exam,
    /// `LoadError::NoActiveQuestions` for an empty set, `LoadError::InvalidExam` or
    /// `LoadError::InvalidQuestion` for malformed records, and `LoadError::Storage`
    /// when a query fails.
    pub async fn load(&self, exam_id: &ExamId) -> Result<LoadedExam, LoadError> {
        let record = self.exams.get_exam(exam_id).await.map_err(|e| match e {
            StorageError::NotFound => LoadError::ExamNotFound(exam_id.clone()),
            other => LoadError::Storage(other),
        })?;
        let exam = record.into_exam()?;

        let mut records = self.questions.get_active_questions(exam_id).await?;
        records.retain(|r| r.is_active && &r.exam_id == exam_id);
        records.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.id.cmp(&b.id)));

        let mut questions = Vec::with_capacity(records.len());
        for record in records {
            let question_id = record.id.clone();
            let question = record
                .into_question()
                .map_err(|source| LoadError::InvalidQuestion {
                    question_id,
                    source,
                })?;
            questions.push(question);
        }

        let loaded = LoadedExam::new(exam, questions)?;
        tracing::debug!(exam_id = %exam_id, questions = loaded.questions().len(), "exam loaded");
        Ok(loaded)
    }
}
