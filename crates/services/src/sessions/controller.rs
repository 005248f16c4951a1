use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use exam_core::Clock;
use exam_core::model::{
    Exam, OptionId, ProgressSnapshot, Question, QuestionId, SessionResult, SessionSettings, UserId,
};
use exam_core::scheduler::Scheduler;
use exam_core::scoring::{self, Outcome};
use storage::repository::{
    FavoriteRepository, MistakeRepository, ProgressGateway, ResultRepository,
};

use super::answers::{AnswerTracker, SelectOutcome};
use super::autosave::AutosavePersister;
use super::loader::LoadedExam;
use super::progress::SessionProgress;
use super::state::{SessionState, SessionStatus};
use super::timer::{TimerController, TimerState};
use crate::error::{AnswerRejected, SessionError};

//
// ─── EVENTS ────────────────────────────────────────────────────────────────────
//

/// What ended the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Manual,
    Expired,
}

/// Outcome of a finish request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishOutcome {
    /// This call ran the finish sequence and the result was stored.
    Finished(SessionResult),
    /// The session had already finished or was abandoned; nothing ran.
    AlreadyFinished,
}

/// Observable session activity, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionEvent {
    Tick {
        remaining_seconds: u32,
    },
    Checkpoint {
        answered: usize,
        remaining_seconds: u32,
    },
    CheckpointFailed {
        reason: String,
    },
    Expired,
    Finished {
        reason: FinishReason,
        result: SessionResult,
    },
    ResultWriteFailed {
        result: SessionResult,
        reason: String,
    },
    Answered {
        question_id: QuestionId,
        option_id: OptionId,
    },
    AnswerRejected {
        reason: String,
    },
    Navigated {
        index: usize,
    },
    FavoriteToggled {
        question_id: QuestionId,
        favorite: bool,
    },
    FavoriteFailed {
        reason: String,
    },
}

//
// ─── CONTROLLER ────────────────────────────────────────────────────────────────
//

pub(crate) struct SessionDeps {
    pub progress: Arc<dyn ProgressGateway>,
    pub results: Arc<dyn ResultRepository>,
    pub mistakes: Arc<dyn MistakeRepository>,
    pub favorites: Arc<dyn FavoriteRepository>,
}

/// Owns one active attempt: its state, its timers and the finish sequence.
///
/// Time is virtual. Callers drive it with [`SessionController::advance`], either
/// from a real interval (see [`run_session`](super::runner::run_session)) or directly
/// in tests. Dropping the controller drops every timer it scheduled.
pub struct SessionController {
    exam: Exam,
    user_id: UserId,
    state: SessionState,
    tracker: AnswerTracker,
    timer: TimerController,
    autosave: AutosavePersister,
    scheduler: Scheduler,
    deps: SessionDeps,
    clock: Clock,
    record_mistakes: bool,
    favorites: HashSet<QuestionId>,
    finish_claimed: bool,
    result: Option<SessionResult>,
    result_saved: bool,
}

impl SessionController {
    /// Build the session and move it to `Active`, starting the countdown first and
    /// autosave second, so a tick due at the same instant as a checkpoint runs first.
    pub(crate) fn start(
        loaded: LoadedExam,
        user_id: UserId,
        resume: Option<&ProgressSnapshot>,
        favorites: HashSet<QuestionId>,
        settings: &SessionSettings,
        deps: SessionDeps,
        clock: Clock,
    ) -> Result<Self, SessionError> {
        let (exam, questions) = loaded.into_parts();
        let remaining = resume
            .map_or(exam.duration_secs(), |snapshot| {
                snapshot.remaining_seconds.min(exam.duration_secs())
            });

        let mut state = SessionState::new(exam.id().clone(), questions.len(), remaining);
        let tracker = AnswerTracker::new(questions);
        state.activate();
        if let Some(snapshot) = resume {
            let restored = tracker.restore(&mut state, &snapshot.answers);
            tracing::info!(exam_id = %exam.id(), restored, remaining, "resuming from checkpoint");
        }

        let mut scheduler = Scheduler::new();
        let mut timer = TimerController::new();
        let mut autosave = AutosavePersister::new(settings.autosave_period());
        timer.start(&mut scheduler, remaining)?;
        autosave.start(&mut scheduler)?;

        tracing::info!(
            exam_id = %exam.id(),
            user_id = %user_id,
            questions = state.question_count(),
            remaining,
            "session started"
        );

        Ok(Self {
            exam,
            user_id,
            state,
            tracker,
            timer,
            autosave,
            scheduler,
            deps,
            clock,
            record_mistakes: settings.record_mistakes(),
            favorites,
            finish_claimed: false,
            result: None,
            result_saved: false,
        })
    }

    #[must_use]
    pub fn exam(&self) -> &Exam {
        &self.exam
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.state.status()
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        self.tracker.questions()
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.tracker.question(self.state.current_question_index())
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress::from_state(&self.state)
    }

    #[must_use]
    pub fn timer_state(&self) -> TimerState {
        self.timer.state()
    }

    /// Number of timers still scheduled. Zero once the session has ended.
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.scheduler.pending()
    }

    #[must_use]
    pub fn checkpoints(&self) -> u32 {
        self.autosave.checkpoints()
    }

    /// Checkpoint writes that failed so far.
    #[must_use]
    pub fn checkpoint_failures(&self) -> u32 {
        self.autosave.failures()
    }

    #[must_use]
    pub fn is_favorite(&self, question_id: &QuestionId) -> bool {
        self.favorites.contains(question_id)
    }

    /// The computed result, once the session has finished.
    #[must_use]
    pub fn result(&self) -> Option<&SessionResult> {
        self.result.as_ref()
    }

    #[must_use]
    pub fn is_result_saved(&self) -> bool {
        self.result_saved
    }

    //
    // ─── INPUT ─────────────────────────────────────────────────────────────────
    //

    /// Record an answer.
    ///
    /// # Errors
    ///
    /// Returns `AnswerRejected` when the session is not active or the pair is not
    /// part of this exam. Nothing changes in that case.
    pub fn select(
        &mut self,
        question_id: &QuestionId,
        option_id: &OptionId,
    ) -> Result<SelectOutcome, AnswerRejected> {
        let outcome = self.tracker.select(&mut self.state, question_id, option_id)?;
        tracing::debug!(question_id = %question_id, option_id = %option_id, ?outcome, "answer recorded");
        Ok(outcome)
    }

    /// Answer the question under the cursor.
    ///
    /// # Errors
    ///
    /// Same as [`SessionController::select`].
    pub fn select_current(
        &mut self,
        option_id: &OptionId,
    ) -> Result<(QuestionId, SelectOutcome), AnswerRejected> {
        let (question_id, outcome) = self.tracker.select_current(&mut self.state, option_id)?;
        tracing::debug!(question_id = %question_id, option_id = %option_id, ?outcome, "answer recorded");
        Ok((question_id, outcome))
    }

    /// Answer the question under the cursor with its option at `position`.
    ///
    /// # Errors
    ///
    /// Same as [`SessionController::select`], plus `AnswerRejected::NoSuchChoice`.
    pub fn choose(
        &mut self,
        position: usize,
    ) -> Result<(QuestionId, OptionId, SelectOutcome), AnswerRejected> {
        let (question_id, option_id, outcome) = self.tracker.choose(&mut self.state, position)?;
        tracing::debug!(question_id = %question_id, option_id = %option_id, ?outcome, "answer recorded");
        Ok((question_id, option_id, outcome))
    }

    /// Move the cursor by `delta`, clamped. Ignored once the session is not active.
    pub fn navigate(&mut self, delta: isize) -> usize {
        if self.state.is_active() {
            self.tracker.navigate(&mut self.state, delta);
        }
        self.state.current_question_index()
    }

    /// Move the cursor to `index`, clamped. Ignored once the session is not active.
    pub fn jump_to(&mut self, index: usize) -> usize {
        if self.state.is_active() {
            self.tracker.jump_to(&mut self.state, index);
        }
        self.state.current_question_index()
    }

    /// Add the question to the user's favorites, or remove it. Returns whether it is
    /// a favorite afterwards.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Rejected` when the session is not active or the question
    /// is not part of this exam, and `SessionError::Storage` when the toggle cannot be
    /// stored. Nothing changes in either case.
    pub async fn toggle_favorite(&mut self, question_id: &QuestionId) -> Result<bool, SessionError> {
        if !self.state.is_active() {
            return Err(AnswerRejected::NotActive.into());
        }
        if !self.tracker.contains(question_id) {
            return Err(AnswerRejected::UnknownQuestion(question_id.clone()).into());
        }
        let favorite = self
            .deps
            .favorites
            .toggle_favorite(&self.user_id, self.exam.id(), question_id, self.clock.now())
            .await?;
        if favorite {
            self.favorites.insert(question_id.clone());
        } else {
            self.favorites.remove(question_id);
        }
        tracing::debug!(question_id = %question_id, favorite, "favorite toggled");
        Ok(favorite)
    }

    /// Toggle the favorite mark of the question under the cursor.
    ///
    /// # Errors
    ///
    /// Same as [`SessionController::toggle_favorite`].
    pub async fn toggle_favorite_current(&mut self) -> Result<(QuestionId, bool), SessionError> {
        let question_id = self
            .current_question()
            .map(|q| q.id().clone())
            .ok_or(AnswerRejected::NotActive)?;
        let favorite = self.toggle_favorite(&question_id).await?;
        Ok((question_id, favorite))
    }

    //
    // ─── TIME ──────────────────────────────────────────────────────────────────
    //

    /// Let `elapsed` virtual time pass, running every tick and checkpoint that falls
    /// due, one after another.
    ///
    /// Expiry runs the finish sequence inline; its outcome is reported as events.
    pub async fn advance(&mut self, elapsed: Duration) -> Vec<SessionEvent> {
        let deadline = self.scheduler.now() + elapsed;
        let mut events = Vec::new();

        while let Some(firing) = self.scheduler.pop_due(deadline) {
            if self.timer.owns(firing.token) {
                let Some(tick) = self.timer.on_fire(
                    &mut self.scheduler,
                    firing.token,
                    self.state.remaining_seconds_mut(),
                ) else {
                    continue;
                };
                tracing::trace!(remaining = tick.remaining, "tick");
                events.push(SessionEvent::Tick {
                    remaining_seconds: tick.remaining,
                });
                if tick.expired {
                    tracing::info!(exam_id = %self.exam.id(), "time expired");
                    events.push(SessionEvent::Expired);
                    self.finish_into(FinishReason::Expired, &mut events).await;
                }
            } else if self.autosave.owns(firing.token) {
                events.push(self.checkpoint().await);
            }
        }

        self.scheduler.advance_to(deadline);
        events
    }

    async fn checkpoint(&mut self) -> SessionEvent {
        let snapshot = ProgressSnapshot {
            answers: self.state.answers().clone(),
            remaining_seconds: self.state.remaining_seconds(),
            updated_at: self.clock.now(),
        };
        match self
            .autosave
            .checkpoint(
                self.deps.progress.as_ref(),
                &self.user_id,
                self.exam.id(),
                &snapshot,
            )
            .await
        {
            Ok(()) => SessionEvent::Checkpoint {
                answered: snapshot.answers.len(),
                remaining_seconds: snapshot.remaining_seconds,
            },
            Err(e) => SessionEvent::CheckpointFailed {
                reason: e.to_string(),
            },
        }
    }

    //
    // ─── FINISH ────────────────────────────────────────────────────────────────
    //

    /// Finish the session now and store its result.
    ///
    /// Runs at most once per session: later calls, and calls after expiry or
    /// abandonment, return `FinishOutcome::AlreadyFinished`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::ResultWrite` when the result could not be stored. The
    /// session stays finished; use [`SessionController::retry_result_write`].
    pub async fn finish(&mut self) -> Result<FinishOutcome, SessionError> {
        self.finish_with(FinishReason::Manual).await
    }

    pub(crate) async fn finish_into(&mut self, reason: FinishReason, events: &mut Vec<SessionEvent>) {
        match self.finish_with(reason).await {
            Ok(FinishOutcome::Finished(result)) => {
                events.push(SessionEvent::Finished { reason, result });
            }
            Ok(FinishOutcome::AlreadyFinished) => {}
            Err(SessionError::ResultWrite { result, source }) => {
                events.push(SessionEvent::Finished {
                    reason,
                    result: (*result).clone(),
                });
                events.push(SessionEvent::ResultWriteFailed {
                    result: *result,
                    reason: source.to_string(),
                });
            }
            Err(e) => {
                tracing::error!(error = %e, "finish failed");
            }
        }
    }

    async fn finish_with(&mut self, reason: FinishReason) -> Result<FinishOutcome, SessionError> {
        if self.finish_claimed {
            tracing::debug!(?reason, "finish ignored, session already closed");
            return Ok(FinishOutcome::AlreadyFinished);
        }
        self.finish_claimed = true;

        self.timer.stop(&mut self.scheduler);
        self.autosave.stop(&mut self.scheduler);
        self.state.finish();

        let questions = self.tracker.questions();
        let answers = self.state.answers();
        let score = scoring::score(questions, answers);
        let completed_at = self.clock.now();
        let wrong: Vec<QuestionId> = scoring::grade(questions, answers)
            .into_iter()
            .filter(|q| q.outcome == Outcome::Wrong)
            .map(|q| q.question_id)
            .collect();

        let result = SessionResult::new(
            self.exam.id().clone(),
            self.user_id.clone(),
            score,
            completed_at,
        );
        self.result = Some(result.clone());
        tracing::info!(
            exam_id = %self.exam.id(),
            ?reason,
            correct = score.correct(),
            total = score.total(),
            "session finished"
        );

        if self.record_mistakes && !wrong.is_empty() {
            if let Err(e) = self
                .deps
                .mistakes
                .record_mistakes(&self.user_id, self.exam.id(), &wrong, completed_at)
                .await
            {
                tracing::warn!(error = %e, "failed to record mistakes");
            }
        }

        self.store_result(result).await.map(FinishOutcome::Finished)
    }

    /// Re-submit the already computed result.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotFinished` if nothing has been computed yet, or
    /// `SessionError::ResultWrite` if the write fails again.
    pub async fn retry_result_write(&mut self) -> Result<SessionResult, SessionError> {
        let result = self.result.clone().ok_or(SessionError::NotFinished)?;
        self.store_result(result).await
    }

    async fn store_result(&mut self, result: SessionResult) -> Result<SessionResult, SessionError> {
        if let Err(source) = self.deps.results.save_result(&result).await {
            tracing::error!(result_id = %result.id(), error = %source, "result write failed");
            return Err(SessionError::ResultWrite {
                result: Box::new(result),
                source,
            });
        }
        self.result_saved = true;

        if let Err(e) = self
            .deps
            .progress
            .clear_progress(&self.user_id, self.exam.id())
            .await
        {
            tracing::warn!(error = %e, "failed to clear checkpoint");
        }
        Ok(result)
    }

    /// Tear the session down without scoring. Cancels every timer; the last
    /// checkpoint stays stored so the attempt can be resumed.
    pub fn abandon(&mut self) {
        self.timer.stop(&mut self.scheduler);
        self.autosave.stop(&mut self.scheduler);
        self.scheduler.cancel_all();
        if !self.finish_claimed {
            self.finish_claimed = true;
            self.state.finish();
            tracing::info!(exam_id = %self.exam.id(), "session abandoned");
        }
    }
}
