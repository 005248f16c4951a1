mod support;

use tokio::sync::mpsc;

use services::{SessionCommand, SessionEvent, SessionRun, run_session};

use support::{Harness, correct, count, loaded, qid, ticks};

#[tokio::test(start_paused = true)]
async fn runs_until_expiry_in_real_time() {
    let h = Harness::new();
    let session = h.engine.start_loaded(loaded(10, 2)).await.unwrap();

    let (commands, rx) = mpsc::channel(8);
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    commands
        .send(SessionCommand::Select {
            question_id: qid("q1"),
            option_id: correct(),
        })
        .await
        .unwrap();

    let (session, run) = run_session(session, rx, events_tx).await;

    let SessionRun::Finished(result) = run else {
        panic!("expected a stored result, got {run:?}");
    };
    assert_eq!(result.correct_count(), 1);
    assert_eq!(result.total_count(), 2);
    assert_eq!(session.pending_timers(), 0);

    let mut events = Vec::new();
    while let Ok(event) = events_rx.try_recv() {
        events.push(event);
    }
    assert_eq!(ticks(&events), 10);
    assert_eq!(count(&events, |e| matches!(e, SessionEvent::Answered { .. })), 1);
    assert_eq!(count(&events, |e| matches!(e, SessionEvent::Expired)), 1);
    drop(commands);
}

#[tokio::test(start_paused = true)]
async fn finish_command_ends_the_run() {
    let h = Harness::new();
    let session = h.engine.start_loaded(loaded(60, 1)).await.unwrap();

    let (commands, rx) = mpsc::channel(8);
    let (events_tx, _events_rx) = mpsc::unbounded_channel();
    commands
        .send(SessionCommand::SelectCurrent(correct()))
        .await
        .unwrap();
    commands.send(SessionCommand::Finish).await.unwrap();

    let (_session, run) = run_session(session, rx, events_tx).await;
    let SessionRun::Finished(result) = run else {
        panic!("expected a stored result, got {run:?}");
    };
    assert_eq!(result.correct_count(), 1);
    assert_eq!(h.stored_results(), 1);
}

#[tokio::test(start_paused = true)]
async fn favorite_commands_report_their_outcome() {
    let h = Harness::new();
    let session = h.engine.start_loaded(loaded(60, 2)).await.unwrap();

    let (commands, rx) = mpsc::channel(8);
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    commands
        .send(SessionCommand::ToggleFavoriteCurrent)
        .await
        .unwrap();
    commands
        .send(SessionCommand::ToggleFavorite(qid("missing")))
        .await
        .unwrap();
    commands.send(SessionCommand::Finish).await.unwrap();

    let (session, _run) = run_session(session, rx, events_tx).await;
    let mut events = Vec::new();
    while let Ok(event) = events_rx.try_recv() {
        events.push(event);
    }

    assert!(events.contains(&SessionEvent::FavoriteToggled {
        question_id: qid("q1"),
        favorite: true,
    }));
    assert_eq!(
        count(&events, |e| matches!(e, SessionEvent::FavoriteFailed { .. })),
        1
    );
    assert!(session.is_favorite(&qid("q1")));
}

#[tokio::test(start_paused = true)]
async fn closed_command_channel_abandons() {
    let h = Harness::new();
    let session = h.engine.start_loaded(loaded(60, 1)).await.unwrap();

    let (commands, rx) = mpsc::channel::<SessionCommand>(1);
    let (events_tx, _events_rx) = mpsc::unbounded_channel();
    drop(commands);

    let (session, run) = run_session(session, rx, events_tx).await;
    assert_eq!(run, SessionRun::Abandoned);
    assert_eq!(session.pending_timers(), 0);
    assert_eq!(h.results.attempts(), 0);
}

#[tokio::test(start_paused = true)]
async fn unsaved_result_is_handed_back_for_retry() {
    let h = Harness::with(Default::default(), 1);
    let session = h.engine.start_loaded(loaded(60, 1)).await.unwrap();

    let (commands, rx) = mpsc::channel(8);
    let (events_tx, _events_rx) = mpsc::unbounded_channel();
    commands.send(SessionCommand::Finish).await.unwrap();

    let (mut session, run) = run_session(session, rx, events_tx).await;
    let SessionRun::ResultUnsaved(result) = run else {
        panic!("expected an unsaved result, got {run:?}");
    };

    let saved = session.retry_result_write().await.unwrap();
    assert_eq!(saved.id(), result.id());
    assert_eq!(h.stored_results(), 1);
}
