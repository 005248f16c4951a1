//! Pure scoring of an answer map against a question set.

use crate::model::{AnswerMap, Question, QuestionId};

/// Number of correctly answered questions out of the question count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    correct: u32,
    total: u32,
}

/// Coarse feedback band for a finished attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// 90% or better.
    Excellent,
    /// 70% or better.
    Passed,
    NeedsReview,
}

impl Score {
    #[must_use]
    pub fn new(correct: u32, total: u32) -> Self {
        Self {
            correct: correct.min(total),
            total,
        }
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    #[must_use]
    pub fn wrong_or_blank(&self) -> u32 {
        self.total - self.correct
    }

    /// Percentage of correct answers, rounded half up. An empty set scores 0.
    #[must_use]
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        let correct = u64::from(self.correct);
        let total = u64::from(self.total);
        // correct <= total, so the quotient is at most 100
        u32::try_from((correct * 200 + total) / (total * 2)).unwrap_or(100)
    }

    #[must_use]
    pub fn verdict(&self) -> Verdict {
        match self.percent() {
            90.. => Verdict::Excellent,
            70..=89 => Verdict::Passed,
            _ => Verdict::NeedsReview,
        }
    }
}

/// How a single question was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Correct,
    Wrong,
    Unanswered,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionOutcome {
    pub question_id: QuestionId,
    pub outcome: Outcome,
}

/// Counts questions whose recorded option equals the correct option.
///
/// Missing answers count as incorrect.
#[must_use]
pub fn score(questions: &[Question], answers: &AnswerMap) -> Score {
    let correct = questions
        .iter()
        .filter(|q| answers.get(q.id()).is_some_and(|chosen| q.is_correct(chosen)))
        .count();
    Score::new(
        u32::try_from(correct).unwrap_or(u32::MAX),
        u32::try_from(questions.len()).unwrap_or(u32::MAX),
    )
}

/// Per-question outcomes, in question order.
#[must_use]
pub fn grade(questions: &[Question], answers: &AnswerMap) -> Vec<QuestionOutcome> {
    questions
        .iter()
        .map(|q| {
            let outcome = match answers.get(q.id()) {
                None => Outcome::Unanswered,
                Some(chosen) if q.is_correct(chosen) => Outcome::Correct,
                Some(_) => Outcome::Wrong,
            };
            QuestionOutcome {
                question_id: q.id().clone(),
                outcome,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnswerOption, ExamId, OptionId};

    fn question(id: &str, correct: &str) -> Question {
        Question::new(
            QuestionId::new(id),
            ExamId::new("e1"),
            format!("Prompt {id}"),
            vec![
                AnswerOption::new(OptionId::new("A"), "first"),
                AnswerOption::new(OptionId::new("B"), "second"),
            ],
            OptionId::new(correct),
        )
        .unwrap()
    }

    #[test]
    fn one_right_one_wrong_scores_half() {
        let questions = vec![question("q1", "A"), question("q2", "A")];
        let answers: AnswerMap = [
            (QuestionId::new("q1"), OptionId::new("A")),
            (QuestionId::new("q2"), OptionId::new("B")),
        ]
        .into_iter()
        .collect();

        let s = score(&questions, &answers);
        assert_eq!(s, Score::new(1, 2));
        assert_eq!(s.wrong_or_blank(), 1);
        // deterministic
        assert_eq!(score(&questions, &answers), s);
    }

    #[test]
    fn unanswered_questions_count_as_incorrect() {
        let questions = vec![question("q1", "A"), question("q2", "B")];
        let s = score(&questions, &AnswerMap::new());
        assert_eq!(s.correct(), 0);
        assert_eq!(s.total(), 2);
    }

    #[test]
    fn percent_rounds_half_up() {
        assert_eq!(Score::new(1, 3).percent(), 33);
        assert_eq!(Score::new(2, 3).percent(), 67);
        assert_eq!(Score::new(1, 8).percent(), 13);
        assert_eq!(Score::new(0, 0).percent(), 0);
        assert_eq!(Score::new(5, 5).percent(), 100);
    }

    #[test]
    fn verdict_bands() {
        assert_eq!(Score::new(9, 10).verdict(), Verdict::Excellent);
        assert_eq!(Score::new(7, 10).verdict(), Verdict::Passed);
        assert_eq!(Score::new(69, 100).verdict(), Verdict::NeedsReview);
    }

    #[test]
    fn grade_reports_each_question_in_order() {
        let questions = vec![question("q1", "A"), question("q2", "A"), question("q3", "B")];
        let answers: AnswerMap = [
            (QuestionId::new("q1"), OptionId::new("A")),
            (QuestionId::new("q3"), OptionId::new("A")),
        ]
        .into_iter()
        .collect();

        let outcomes: Vec<_> = grade(&questions, &answers)
            .into_iter()
            .map(|o| o.outcome)
            .collect();
        assert_eq!(
            outcomes,
            vec![Outcome::Correct, Outcome::Unanswered, Outcome::Wrong]
        );
    }
}
