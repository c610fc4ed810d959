use super::*;

#[tokio::test]
async fn test_start_with_empty_queue_fails() {
    let harness = create_test_harness();

    match harness.downloader.start(RunOptions::default()).await {
        Err(Error::Run(RunError::EmptyQueue)) => {}
        other => panic!("expected EmptyQueue, got: {:?}", other.map(|h| h.run_id())),
    }
    assert_eq!(harness.downloader.run_state(), RunState::Idle);
}

#[tokio::test]
async fn test_cancel_when_idle_is_not_running() {
    let harness = create_test_harness();

    match harness.downloader.cancel() {
        Err(Error::Run(RunError::NotRunning)) => {}
        other => panic!("expected NotRunning, got: {:?}", other),
    }
}

#[tokio::test]
async fn test_second_start_rejected_while_running() {
    let harness = create_test_harness();
    let downloader = &harness.downloader;
    downloader.enqueue_item(item("a")).await.unwrap();
    harness.engine.script(&source("a"), Script::Stall);

    let run = downloader.start(RunOptions::default()).await.unwrap();
    assert!(downloader.is_running());

    match downloader.start(RunOptions::default()).await {
        Err(Error::Run(RunError::AlreadyRunning)) => {}
        other => panic!("expected AlreadyRunning, got: {:?}", other.map(|h| h.run_id())),
    }

    downloader.cancel().unwrap();
    assert_eq!(downloader.run_state(), RunState::CancelRequested);

    // still blocked until the worker acknowledges the cancellation
    match downloader.start(RunOptions::default()).await {
        Err(Error::Run(RunError::AlreadyRunning)) => {}
        Ok(_) => panic!("start must be rejected while a run is cancelling"),
        Err(e) => panic!("expected AlreadyRunning, got: {:?}", e),
    }

    let outcome = run.wait().await.unwrap();
    assert!(outcome.is_cancelled());
    assert_eq!(downloader.run_state(), RunState::Idle);
}

#[tokio::test]
async fn test_cancel_is_idempotent() {
    let harness = create_test_harness();
    let downloader = &harness.downloader;
    downloader.enqueue_item(item("a")).await.unwrap();
    harness.engine.script(&source("a"), Script::Stall);

    let run = downloader.start(RunOptions::default()).await.unwrap();
    downloader.cancel().unwrap();
    downloader.cancel().unwrap();

    let outcome = run.wait().await.unwrap();
    assert!(outcome.is_cancelled());
}

#[tokio::test]
async fn test_new_run_after_cancel_gets_fresh_token() {
    let harness = create_test_harness();
    let downloader = &harness.downloader;
    downloader.enqueue_item(item("a")).await.unwrap();
    harness.engine.script(&source("a"), Script::Stall);

    let first = downloader.start(RunOptions::default()).await.unwrap();
    downloader.cancel().unwrap();
    let first_outcome = first.wait().await.unwrap();
    assert!(first_outcome.is_cancelled());

    harness.engine.script(&source("a"), Script::Succeed);
    let second = downloader.start(RunOptions::default()).await.unwrap();
    assert!(second.run_id() > first_outcome.run_id);

    let outcome = second.wait().await.unwrap();
    assert_eq!(outcome.status, RunStatus::Completed);
    assert_eq!(outcome.succeeded, 1);
}

#[tokio::test]
async fn test_start_creates_destination_directory() {
    let harness = create_test_harness();
    let downloader = &harness.downloader;
    downloader.enqueue_item(item("a")).await.unwrap();

    let dest = harness.temp_dir.path().join("nested").join("out");
    assert!(!dest.exists());

    let run = downloader
        .start(RunOptions::default().destination(&dest))
        .await
        .unwrap();
    let outcome = run.wait().await.unwrap();

    assert!(dest.is_dir());
    assert_eq!(outcome.destination_dir, dest);
}

#[tokio::test]
async fn test_start_fails_when_destination_cannot_be_created() {
    let harness = create_test_harness();
    let downloader = &harness.downloader;
    downloader.enqueue_item(item("a")).await.unwrap();

    let blocker = harness.temp_dir.path().join("file");
    std::fs::write(&blocker, b"not a directory").unwrap();

    match downloader
        .start(RunOptions::default().destination(blocker.join("sub")))
        .await
    {
        Err(Error::Io(e)) => assert!(e.to_string().contains("destination directory")),
        other => panic!("expected Io error, got: {:?}", other.map(|h| h.run_id())),
    }
    assert_eq!(downloader.run_state(), RunState::Idle);
}

#[tokio::test]
async fn test_state_is_idle_when_run_finished_arrives() {
    let harness = create_test_harness();
    let downloader = harness.downloader.clone();
    downloader.enqueue_item(item("a")).await.unwrap();

    let mut rx = downloader.subscribe();
    let _run = downloader.start(RunOptions::default()).await.unwrap();
    let events = events_until_run_finished(&mut rx).await;

    assert!(matches!(events.last(), Some(Event::RunFinished { .. })));
    assert_eq!(downloader.run_state(), RunState::Idle);

    // a subscriber may start the next run straight from RunFinished
    let next = downloader.start(RunOptions::default()).await.unwrap();
    next.wait().await.unwrap();
}
