use std::collections::HashMap;

use exam_core::model::{AnswerMap, OptionId, Question, QuestionId};

use super::state::SessionState;
use crate::error::AnswerRejected;

/// Whether a selection changed the answer map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    Changed,
    Unchanged,
}

/// Records answers and moves the cursor over a fixed question set.
#[derive(Debug, Clone)]
pub struct AnswerTracker {
    questions: Vec<Question>,
    index: HashMap<QuestionId, usize>,
}

impl AnswerTracker {
    #[must_use]
    pub fn new(questions: Vec<Question>) -> Self {
        let index = questions
            .iter()
            .enumerate()
            .map(|(i, q)| (q.id().clone(), i))
            .collect();
        Self { questions, index }
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn question(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    #[must_use]
    pub fn contains(&self, question_id: &QuestionId) -> bool {
        self.index.contains_key(question_id)
    }

    /// Record `option_id` as the answer to `question_id`. The last selection wins.
    ///
    /// # Errors
    ///
    /// Returns `AnswerRejected` if the session is not active, the question is not part
    /// of this exam, or the option does not belong to the question. The answer map is
    /// left untouched.
    pub fn select(
        &self,
        state: &mut SessionState,
        question_id: &QuestionId,
        option_id: &OptionId,
    ) -> Result<SelectOutcome, AnswerRejected> {
        if !state.is_active() {
            return Err(AnswerRejected::NotActive);
        }
        let question = self
            .index
            .get(question_id)
            .and_then(|&i| self.questions.get(i))
            .ok_or_else(|| AnswerRejected::UnknownQuestion(question_id.clone()))?;
        if !question.has_option(option_id) {
            return Err(AnswerRejected::UnknownOption {
                question_id: question_id.clone(),
                option_id: option_id.clone(),
            });
        }

        let previous = state
            .answers_mut()
            .record(question_id.clone(), option_id.clone());
        if previous.as_ref() == Some(option_id) {
            Ok(SelectOutcome::Unchanged)
        } else {
            Ok(SelectOutcome::Changed)
        }
    }

    /// Answer the question under the cursor.
    ///
    /// # Errors
    ///
    /// Same as [`AnswerTracker::select`].
    pub fn select_current(
        &self,
        state: &mut SessionState,
        option_id: &OptionId,
    ) -> Result<(QuestionId, SelectOutcome), AnswerRejected> {
        if !state.is_active() {
            return Err(AnswerRejected::NotActive);
        }
        let question_id = self
            .questions
            .get(state.current_question_index())
            .map(|q| q.id().clone())
            .ok_or(AnswerRejected::NotActive)?;
        let outcome = self.select(state, &question_id, option_id)?;
        Ok((question_id, outcome))
    }

    /// Answer the question under the cursor with its option at `position` (zero-based,
    /// in display order).
    ///
    /// # Errors
    ///
    /// Returns `AnswerRejected::NoSuchChoice` for a position past the last option, or
    /// the errors of [`AnswerTracker::select`].
    pub fn choose(
        &self,
        state: &mut SessionState,
        position: usize,
    ) -> Result<(QuestionId, OptionId, SelectOutcome), AnswerRejected> {
        if !state.is_active() {
            return Err(AnswerRejected::NotActive);
        }
        let question = self
            .questions
            .get(state.current_question_index())
            .ok_or(AnswerRejected::NotActive)?;
        let option_id = question
            .options()
            .get(position)
            .map(|o| o.id.clone())
            .ok_or_else(|| AnswerRejected::NoSuchChoice {
                question_id: question.id().clone(),
                position,
            })?;
        let question_id = question.id().clone();
        let outcome = self.select(state, &question_id, &option_id)?;
        Ok((question_id, option_id, outcome))
    }

    /// Move the cursor by `delta`, clamped to the question set. Returns the new index.
    pub fn navigate(&self, state: &mut SessionState, delta: isize) -> usize {
        let target = state.current_question_index().saturating_add_signed(delta);
        state.set_current_question_index(target);
        state.current_question_index()
    }

    /// Move the cursor to `index`, clamped to the question set. Returns the new index.
    pub fn jump_to(&self, state: &mut SessionState, index: usize) -> usize {
        state.set_current_question_index(index);
        state.current_question_index()
    }

    /// Copy saved answers into the state, keeping only pairs that still match the
    /// question set. Returns how many were restored.
    pub fn restore(&self, state: &mut SessionState, saved: &AnswerMap) -> usize {
        let mut restored = 0;
        for (question_id, option_id) in saved.iter() {
            let valid = self
                .index
                .get(question_id)
                .and_then(|&i| self.questions.get(i))
                .is_some_and(|q| q.has_option(option_id));
            if valid {
                state
                    .answers_mut()
                    .record(question_id.clone(), option_id.clone());
                restored += 1;
            }
        }
        restored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::{AnswerOption, ExamId};

    fn question(id: &str) -> Question {
        Question::new(
            QuestionId::new(id),
            ExamId::new("e1"),
            format!("Prompt {id}"),
            vec![
                AnswerOption::new(OptionId::new("A"), "a"),
                AnswerOption::new(OptionId::new("B"), "b"),
            ],
            OptionId::new("A"),
        )
        .unwrap()
    }

    fn setup(n: usize) -> (AnswerTracker, SessionState) {
        let questions: Vec<_> = (1..=n).map(|i| question(&format!("q{i}"))).collect();
        let mut state = SessionState::new(ExamId::new("e1"), n, 60);
        state.activate();
        (AnswerTracker::new(questions), state)
    }

    #[test]
    fn selecting_twice_keeps_one_entry_with_last_value() {
        let (tracker, mut state) = setup(2);
        let q1 = QuestionId::new("q1");

        let first = tracker.select(&mut state, &q1, &OptionId::new("A")).unwrap();
        let again = tracker.select(&mut state, &q1, &OptionId::new("A")).unwrap();
        let changed = tracker.select(&mut state, &q1, &OptionId::new("B")).unwrap();

        assert_eq!(first, SelectOutcome::Changed);
        assert_eq!(again, SelectOutcome::Unchanged);
        assert_eq!(changed, SelectOutcome::Changed);
        assert_eq!(state.answers().len(), 1);
        assert_eq!(state.answers().get(&q1), Some(&OptionId::new("B")));
    }

    #[test]
    fn unknown_question_is_rejected_without_orphan_key() {
        let (tracker, mut state) = setup(2);
        let err = tracker
            .select(&mut state, &QuestionId::new("nope"), &OptionId::new("A"))
            .unwrap_err();
        assert_eq!(err, AnswerRejected::UnknownQuestion(QuestionId::new("nope")));
        assert!(state.answers().is_empty());
    }

    #[test]
    fn contains_only_questions_of_the_set() {
        let (tracker, _) = setup(2);
        assert!(tracker.contains(&QuestionId::new("q2")));
        assert!(!tracker.contains(&QuestionId::new("q3")));
    }

    #[test]
    fn unknown_option_is_rejected() {
        let (tracker, mut state) = setup(1);
        let err = tracker
            .select(&mut state, &QuestionId::new("q1"), &OptionId::new("Z"))
            .unwrap_err();
        assert!(matches!(err, AnswerRejected::UnknownOption { .. }));
        assert!(state.answers().is_empty());
    }

    #[test]
    fn inactive_session_rejects_answers() {
        let (tracker, mut state) = setup(1);
        state.finish();
        let err = tracker
            .select(&mut state, &QuestionId::new("q1"), &OptionId::new("A"))
            .unwrap_err();
        assert_eq!(err, AnswerRejected::NotActive);
    }

    #[test]
    fn navigate_stays_in_bounds_for_any_sequence() {
        let (tracker, mut state) = setup(3);
        let deltas = [-1, -1, 1, 1, 1, 1, 1, -1, -1, -1, -1, 1, 5, -7, isize::MAX, isize::MIN];
        for delta in deltas {
            let index = tracker.navigate(&mut state, delta);
            assert!(index < 3, "index {index} out of range after {delta}");
        }
    }

    #[test]
    fn navigate_clamps_at_both_ends() {
        let (tracker, mut state) = setup(3);
        assert_eq!(tracker.navigate(&mut state, -1), 0);
        assert_eq!(tracker.navigate(&mut state, 10), 2);
        assert_eq!(tracker.jump_to(&mut state, 1), 1);
        assert_eq!(tracker.jump_to(&mut state, 50), 2);
    }

    #[test]
    fn select_current_answers_question_under_cursor() {
        let (tracker, mut state) = setup(2);
        tracker.navigate(&mut state, 1);
        let (question_id, _) = tracker
            .select_current(&mut state, &OptionId::new("B"))
            .unwrap();
        assert_eq!(question_id, QuestionId::new("q2"));
    }

    #[test]
    fn choose_picks_option_by_display_position() {
        let (tracker, mut state) = setup(1);
        let (_, option_id, _) = tracker.choose(&mut state, 1).unwrap();
        assert_eq!(option_id, OptionId::new("B"));

        let err = tracker.choose(&mut state, 2).unwrap_err();
        assert!(matches!(err, AnswerRejected::NoSuchChoice { position: 2, .. }));
        assert_eq!(state.answers().len(), 1);
    }

    #[test]
    fn restore_keeps_only_valid_pairs() {
        let (tracker, mut state) = setup(2);
        let saved: AnswerMap = [
            (QuestionId::new("q1"), OptionId::new("B")),
            (QuestionId::new("q2"), OptionId::new("Z")),
            (QuestionId::new("gone"), OptionId::new("A")),
        ]
        .into_iter()
        .collect();

        assert_eq!(tracker.restore(&mut state, &saved), 1);
        assert_eq!(state.answers().len(), 1);
        assert_eq!(
            state.answers().get(&QuestionId::new("q1")),
            Some(&OptionId::new("B"))
        );
    }
}
