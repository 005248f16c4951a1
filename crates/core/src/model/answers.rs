use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::ids::{OptionId, QuestionId};

/// Selected option per question.
///
/// Entries can be overwritten but never removed; there is exactly one entry per
/// answered question.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerMap(BTreeMap<QuestionId, OptionId>);

impl AnswerMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `option_id` for `question_id`, returning the previous selection.
    pub fn record(&mut self, question_id: QuestionId, option_id: OptionId) -> Option<OptionId> {
        self.0.insert(question_id, option_id)
    }

    #[must_use]
    pub fn get(&self, question_id: &QuestionId) -> Option<&OptionId> {
        self.0.get(question_id)
    }

    #[must_use]
    pub fn contains(&self, question_id: &QuestionId) -> bool {
        self.0.contains_key(question_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&QuestionId, &OptionId)> {
        self.0.iter()
    }
}

impl FromIterator<(QuestionId, OptionId)> for AnswerMap {
    fn from_iter<T: IntoIterator<Item = (QuestionId, OptionId)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_overwrites_and_keeps_single_entry() {
        let mut answers = AnswerMap::new();
        assert_eq!(answers.record(QuestionId::new("q1"), OptionId::new("A")), None);
        let prev = answers.record(QuestionId::new("q1"), OptionId::new("C"));

        assert_eq!(prev, Some(OptionId::new("A")));
        assert_eq!(answers.len(), 1);
        assert_eq!(answers.get(&QuestionId::new("q1")), Some(&OptionId::new("C")));
    }

    #[test]
    fn serializes_as_plain_object() {
        let answers: AnswerMap = [(QuestionId::new("q1"), OptionId::new("B"))]
            .into_iter()
            .collect();
        let json = serde_json::to_string(&answers).unwrap();
        assert_eq!(json, r#"{"q1":"B"}"#);
    }
}
