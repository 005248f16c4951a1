use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

use exam_core::model::{OptionId, QuestionId, SessionResult, TICK_PERIOD};

use super::controller::{FinishReason, SessionController, SessionEvent};
use super::state::SessionStatus;
use crate::error::{AnswerRejected, SessionError};

/// Input accepted by a running session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Select {
        question_id: QuestionId,
        option_id: OptionId,
    },
    SelectCurrent(OptionId),
    /// Answer the current question with its option at this zero-based position.
    Choose(usize),
    Navigate(isize),
    JumpTo(usize),
    ToggleFavorite(QuestionId),
    /// Toggle the favorite mark of the question under the cursor.
    ToggleFavoriteCurrent,
    Finish,
    Abandon,
}

/// How a driven session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionRun {
    Finished(SessionResult),
    /// Finished, but the result write failed. The returned controller can retry it.
    ResultUnsaved(SessionResult),
    Abandoned,
}

/// Drive a session in real time until it finishes or is abandoned.
///
/// Advances the controller once per second and applies commands between ticks. A
/// closed command channel abandons the session. Events are forwarded as they
/// happen; a dropped event receiver does not stop the session.
pub async fn run_session(
    mut controller: SessionController,
    mut commands: mpsc::Receiver<SessionCommand>,
    events: mpsc::UnboundedSender<SessionEvent>,
) -> (SessionController, SessionRun) {
    let mut ticker = interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);

    while controller.status() == SessionStatus::Active {
        let mut batch = Vec::new();
        tokio::select! {
            _ = ticker.tick() => {
                batch = controller.advance(TICK_PERIOD).await;
            }
            command = commands.recv() => match command {
                Some(command) => apply(&mut controller, command, &mut batch).await,
                None => {
                    tracing::debug!("command channel closed");
                    controller.abandon();
                }
            }
        }
        for event in batch {
            let _ = events.send(event);
        }
    }

    let run = match controller.result() {
        Some(result) if controller.is_result_saved() => SessionRun::Finished(result.clone()),
        Some(result) => SessionRun::ResultUnsaved(result.clone()),
        None => SessionRun::Abandoned,
    };
    (controller, run)
}

async fn apply(
    controller: &mut SessionController,
    command: SessionCommand,
    events: &mut Vec<SessionEvent>,
) {
    match command {
        SessionCommand::Select {
            question_id,
            option_id,
        } => match controller.select(&question_id, &option_id) {
            Ok(_) => events.push(SessionEvent::Answered {
                question_id,
                option_id,
            }),
            Err(e) => rejected(events, &e),
        },
        SessionCommand::SelectCurrent(option_id) => match controller.select_current(&option_id) {
            Ok((question_id, _)) => events.push(SessionEvent::Answered {
                question_id,
                option_id,
            }),
            Err(e) => rejected(events, &e),
        },
        SessionCommand::Choose(position) => match controller.choose(position) {
            Ok((question_id, option_id, _)) => events.push(SessionEvent::Answered {
                question_id,
                option_id,
            }),
            Err(e) => rejected(events, &e),
        },
        SessionCommand::Navigate(delta) => {
            let index = controller.navigate(delta);
            events.push(SessionEvent::Navigated { index });
        }
        SessionCommand::JumpTo(target) => {
            let index = controller.jump_to(target);
            events.push(SessionEvent::Navigated { index });
        }
        SessionCommand::ToggleFavorite(question_id) => {
            match controller.toggle_favorite(&question_id).await {
                Ok(favorite) => events.push(SessionEvent::FavoriteToggled {
                    question_id,
                    favorite,
                }),
                Err(e) => favorite_failed(events, &e),
            }
        }
        SessionCommand::ToggleFavoriteCurrent => match controller.toggle_favorite_current().await {
            Ok((question_id, favorite)) => events.push(SessionEvent::FavoriteToggled {
                question_id,
                favorite,
            }),
            Err(e) => favorite_failed(events, &e),
        },
        SessionCommand::Finish => controller.finish_into(FinishReason::Manual, events).await,
        SessionCommand::Abandon => controller.abandon(),
    }
}

fn favorite_failed(events: &mut Vec<SessionEvent>, error: &SessionError) {
    tracing::warn!(error = %error, "favorite not toggled");
    events.push(SessionEvent::FavoriteFailed {
        reason: error.to_string(),
    });
}

fn rejected(events: &mut Vec<SessionEvent>, error: &AnswerRejected) {
    tracing::debug!(error = %error, "answer rejected");
    events.push(SessionEvent::AnswerRejected {
        reason: error.to_string(),
    });
}
