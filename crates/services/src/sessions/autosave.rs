use std::time::Duration;

use exam_core::model::{ExamId, ProgressSnapshot, UserId};
use exam_core::scheduler::{Scheduler, SchedulerError, TimerToken};
use storage::repository::{ProgressGateway, StorageError};

/// Periodic checkpoint writer for an active session.
///
/// Only schedules and writes; the controller decides when a firing is a checkpoint
/// and supplies the snapshot, so the payload always reflects the state at firing
/// time.
#[derive(Debug)]
pub struct AutosavePersister {
    period: Duration,
    token: Option<TimerToken>,
    checkpoints: u32,
    failures: u32,
}

impl AutosavePersister {
    #[must_use]
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            token: None,
            checkpoints: 0,
            failures: 0,
        }
    }

    #[must_use]
    pub fn owns(&self, token: TimerToken) -> bool {
        self.token == Some(token)
    }

    /// Successful checkpoints so far.
    #[must_use]
    pub fn checkpoints(&self) -> u32 {
        self.checkpoints
    }

    /// Failed checkpoint writes so far.
    #[must_use]
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Schedule the repeating checkpoint. No-op if already running.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError` if the period is rejected.
    pub fn start(&mut self, scheduler: &mut Scheduler) -> Result<(), SchedulerError> {
        if self.token.is_none() {
            self.token = Some(scheduler.schedule_repeating(self.period)?);
        }
        Ok(())
    }

    /// Overwrite the stored checkpoint with `snapshot`.
    ///
    /// # Errors
    ///
    /// Returns the gateway's `StorageError`. Callers treat it as non-fatal.
    pub async fn checkpoint(
        &mut self,
        gateway: &dyn ProgressGateway,
        user_id: &UserId,
        exam_id: &ExamId,
        snapshot: &ProgressSnapshot,
    ) -> Result<(), StorageError> {
        match gateway.save_progress(user_id, exam_id, snapshot).await {
            Ok(()) => {
                self.checkpoints += 1;
                tracing::debug!(
                    exam_id = %exam_id,
                    answered = snapshot.answers.len(),
                    remaining = snapshot.remaining_seconds,
                    "checkpoint saved"
                );
                Ok(())
            }
            Err(e) => {
                self.failures += 1;
                tracing::warn!(exam_id = %exam_id, error = %e, "checkpoint failed");
                Err(e)
            }
        }
    }

    /// Cancel future checkpoints. Idempotent.
    pub fn stop(&mut self, scheduler: &mut Scheduler) {
        if let Some(token) = self.token.take() {
            scheduler.cancel(token);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::AnswerMap;
    use exam_core::time::fixed_now;
    use storage::repository::InMemoryRepository;

    fn snapshot(remaining: u32) -> ProgressSnapshot {
        ProgressSnapshot {
            answers: AnswerMap::new(),
            remaining_seconds: remaining,
            updated_at: fixed_now(),
        }
    }

    #[test]
    fn start_and_stop_manage_one_timer() {
        let mut scheduler = Scheduler::new();
        let mut autosave = AutosavePersister::new(Duration::from_secs(5));
        autosave.start(&mut scheduler).unwrap();
        autosave.start(&mut scheduler).unwrap();
        assert_eq!(scheduler.pending(), 1);

        autosave.stop(&mut scheduler);
        autosave.stop(&mut scheduler);
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test]
    async fn checkpoint_overwrites_snapshot() {
        let repo = InMemoryRepository::new();
        let mut autosave = AutosavePersister::new(Duration::from_secs(5));
        let user = UserId::new("u1");
        let exam = ExamId::new("e1");

        autosave.checkpoint(&repo, &user, &exam, &snapshot(30)).await.unwrap();
        autosave.checkpoint(&repo, &user, &exam, &snapshot(25)).await.unwrap();

        let stored = repo.load_progress(&user, &exam).await.unwrap().unwrap();
        assert_eq!(stored.remaining_seconds, 25);
        assert_eq!(autosave.checkpoints(), 2);
        assert_eq!(autosave.failures(), 0);
    }
}
