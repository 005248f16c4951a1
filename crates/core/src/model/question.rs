use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::model::ids::{ExamId, OptionId, QuestionId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question prompt cannot be empty")]
    EmptyPrompt,

    #[error("question must have at least one option")]
    NoOptions,

    #[error("option label cannot be empty (option {0})")]
    EmptyOptionLabel(OptionId),

    #[error("duplicate option id: {0}")]
    DuplicateOption(OptionId),

    #[error("correct option {0} is not one of the question's options")]
    UnknownCorrectOption(OptionId),
}

//
// ─── OPTION ────────────────────────────────────────────────────────────────────
//

/// One selectable answer of a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub id: OptionId,
    pub label: String,
}

impl AnswerOption {
    #[must_use]
    pub fn new(id: OptionId, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
        }
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A multiple-choice question with exactly one correct option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    exam_id: ExamId,
    prompt: String,
    options: Vec<AnswerOption>,
    correct_option: OptionId,
}

impl Question {
    /// Creates a validated question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the prompt is blank, there are no options, an option
    /// label is blank, option ids repeat, or the correct option is not among the options.
    pub fn new(
        id: QuestionId,
        exam_id: ExamId,
        prompt: impl Into<String>,
        options: Vec<AnswerOption>,
        correct_option: OptionId,
    ) -> Result<Self, QuestionError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(QuestionError::EmptyPrompt);
        }
        if options.is_empty() {
            return Err(QuestionError::NoOptions);
        }

        let mut seen = HashSet::with_capacity(options.len());
        for option in &options {
            if option.label.trim().is_empty() {
                return Err(QuestionError::EmptyOptionLabel(option.id.clone()));
            }
            if !seen.insert(&option.id) {
                return Err(QuestionError::DuplicateOption(option.id.clone()));
            }
        }
        if !seen.contains(&correct_option) {
            return Err(QuestionError::UnknownCorrectOption(correct_option));
        }

        Ok(Self {
            id,
            exam_id,
            prompt,
            options,
            correct_option,
        })
    }

    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    #[must_use]
    pub fn exam_id(&self) -> &ExamId {
        &self.exam_id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Options in display order.
    #[must_use]
    pub fn options(&self) -> &[AnswerOption] {
        &self.options
    }

    #[must_use]
    pub fn correct_option(&self) -> &OptionId {
        &self.correct_option
    }

    #[must_use]
    pub fn has_option(&self, option_id: &OptionId) -> bool {
        self.options.iter().any(|o| &o.id == option_id)
    }

    #[must_use]
    pub fn is_correct(&self, option_id: &OptionId) -> bool {
        &self.correct_option == option_id
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn options(ids: &[&str]) -> Vec<AnswerOption> {
        ids.iter()
            .map(|id| AnswerOption::new(OptionId::new(*id), format!("Option {id}")))
            .collect()
    }

    fn build(options: Vec<AnswerOption>, correct: &str) -> Result<Question, QuestionError> {
        Question::new(
            QuestionId::new("q1"),
            ExamId::new("e1"),
            "Which one?",
            options,
            OptionId::new(correct),
        )
    }

    #[test]
    fn question_accepts_valid_shape() {
        let q = build(options(&["A", "B", "C"]), "B").unwrap();
        assert!(q.has_option(&OptionId::new("C")));
        assert!(q.is_correct(&OptionId::new("B")));
        assert!(!q.is_correct(&OptionId::new("A")));
    }

    #[test]
    fn question_requires_options() {
        assert_eq!(build(Vec::new(), "A").unwrap_err(), QuestionError::NoOptions);
    }

    #[test]
    fn question_rejects_duplicate_options() {
        let err = build(options(&["A", "A"]), "A").unwrap_err();
        assert_eq!(err, QuestionError::DuplicateOption(OptionId::new("A")));
    }

    #[test]
    fn question_rejects_unknown_correct_option() {
        let err = build(options(&["A", "B"]), "E").unwrap_err();
        assert_eq!(err, QuestionError::UnknownCorrectOption(OptionId::new("E")));
    }

    #[test]
    fn question_rejects_blank_prompt() {
        let err = Question::new(
            QuestionId::new("q1"),
            ExamId::new("e1"),
            "  ",
            options(&["A"]),
            OptionId::new("A"),
        )
        .unwrap_err();
        assert_eq!(err, QuestionError::EmptyPrompt);
    }
}
