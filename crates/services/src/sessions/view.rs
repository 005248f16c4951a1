use chrono::{DateTime, Utc};
use std::sync::Arc;

use exam_core::model::{ExamId, Favorite, MistakeSummary, ResultId, SessionResult, UserId};
use exam_core::scoring::Verdict;
use storage::repository::{FavoriteRepository, MistakeRepository, ResultRepository};

use crate::error::SessionError;

/// Presentation-agnostic list item for a stored result.
///
/// Carries raw values; the UI decides how to format percentages and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultListItem {
    pub id: ResultId,
    pub exam_id: ExamId,
    pub completed_at: DateTime<Utc>,

    pub correct: u32,
    pub total: u32,
    pub percent: u32,
    pub verdict: Verdict,
}

impl ResultListItem {
    #[must_use]
    pub fn from_result(result: &SessionResult) -> Self {
        let score = result.score();
        Self {
            id: result.id(),
            exam_id: result.exam_id().clone(),
            completed_at: result.completed_at(),
            correct: score.correct(),
            total: score.total(),
            percent: score.percent(),
            verdict: score.verdict(),
        }
    }
}

/// Read-side queries over finished sessions.
#[derive(Clone)]
pub struct ResultHistoryService {
    results: Arc<dyn ResultRepository>,
    mistakes: Arc<dyn MistakeRepository>,
    favorites: Arc<dyn FavoriteRepository>,
}

impl ResultHistoryService {
    #[must_use]
    pub fn new(
        results: Arc<dyn ResultRepository>,
        mistakes: Arc<dyn MistakeRepository>,
        favorites: Arc<dyn FavoriteRepository>,
    ) -> Self {
        Self {
            results,
            mistakes,
            favorites,
        }
    }

    /// Most recent results of a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the query fails.
    pub async fn recent_results(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<ResultListItem>, SessionError> {
        let results = self.results.list_results(user_id, limit).await?;
        Ok(results.iter().map(ResultListItem::from_result).collect())
    }

    /// Wrong-answer counters of a user, most recent attempt first.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the query fails.
    pub async fn wrong_summary(&self, user_id: &UserId) -> Result<Vec<MistakeSummary>, SessionError> {
        let mut mistakes = self.mistakes.list_mistakes(user_id).await?;
        mistakes.sort_by(|a, b| b.last_attempt.cmp(&a.last_attempt));
        Ok(mistakes)
    }

    /// Bookmarked questions of a user, most recently added first.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the query fails.
    pub async fn favorites(&self, user_id: &UserId) -> Result<Vec<Favorite>, SessionError> {
        Ok(self.favorites.list_favorites(user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::scoring::Score;
    use exam_core::time::fixed_now;
    use exam_core::model::QuestionId;
    use storage::repository::InMemoryRepository;

    #[tokio::test]
    async fn lists_results_with_percent_and_verdict() {
        let repo = InMemoryRepository::new();
        let user = UserId::new("u1");
        let result = SessionResult::new(ExamId::new("e1"), user.clone(), Score::new(7, 10), fixed_now());
        repo.save_result(&result).await.unwrap();

        let service = ResultHistoryService::new(
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            Arc::new(repo),
        );
        let items = service.recent_results(&user, 10).await.unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, result.id());
        assert_eq!(items[0].percent, 70);
        assert_eq!(items[0].verdict, Verdict::Passed);
    }

    #[tokio::test]
    async fn lists_favorites_of_the_user() {
        let repo = InMemoryRepository::new();
        let user = UserId::new("u1");
        repo.toggle_favorite(&user, &ExamId::new("e1"), &QuestionId::new("q1"), fixed_now())
            .await
            .unwrap();

        let service = ResultHistoryService::new(
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            Arc::new(repo),
        );
        let favorites = service.favorites(&user).await.unwrap();

        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].question_id, QuestionId::new("q1"));
        assert!(service.favorites(&UserId::new("u2")).await.unwrap().is_empty());
    }
}
