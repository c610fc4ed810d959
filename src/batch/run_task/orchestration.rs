//! Run orchestration -- the item loop and worker wrap-up.

use crate::batch::BatchDownloader;
use crate::batch::control::RunGuard;
use crate::error::JobError;
use crate::types::{Event, ItemOutcome, RunOutcome, RunStatus};
use crate::utils::truncate_title;

use super::context::RunContext;
use super::executor::execute_job;

/// Process the snapshot in order, one item at a time
///
/// Cancellation is checked before every item. A failed item is recorded and
/// the loop moves on; a cancelled item stops the loop and is recorded as
/// interrupted. Items after the stop point are never attempted.
pub(crate) async fn run_batch(ctx: &RunContext) -> RunOutcome {
    let total = ctx.snapshot.len();
    let mut outcome = RunOutcome::begin(ctx.run_id, ctx.mode, total, ctx.destination_dir.clone());
    let mut status = RunStatus::Completed;

    ctx.emit(Event::RunStarted {
        run_id: ctx.run_id,
        total,
        mode: ctx.mode,
    });

    for (index, item) in ctx.snapshot.iter().enumerate() {
        if ctx.cancel.is_requested() {
            tracing::info!(
                run_id = %ctx.run_id,
                remaining = total - index,
                "Cancellation observed between items"
            );
            status = RunStatus::Cancelled;
            break;
        }

        ctx.emit(Event::ItemStarted {
            run_id: ctx.run_id,
            index,
            total,
            item: item.clone(),
        });
        tracing::info!(
            run_id = %ctx.run_id,
            position = index + 1,
            total,
            title = %truncate_title(&item.display_title),
            "Processing item"
        );
        outcome.attempted += 1;

        let item_outcome = match execute_job(ctx, index, item).await {
            Ok(()) => {
                outcome.record_success(item);
                ItemOutcome::Succeeded
            }
            Err(JobError::Cancelled) => {
                tracing::info!(
                    run_id = %ctx.run_id,
                    title = %item.display_title,
                    "Item interrupted by cancellation"
                );
                outcome.interrupted = Some(item.clone());
                status = RunStatus::Cancelled;
                ItemOutcome::Cancelled
            }
            Err(JobError::Fetch { cause }) => {
                tracing::warn!(
                    run_id = %ctx.run_id,
                    title = %item.display_title,
                    source = %item.source,
                    error = %cause,
                    "Item failed"
                );
                outcome.record_failure(index, item, cause.clone());
                ItemOutcome::Failed { error: cause }
            }
        };

        ctx.emit(Event::ItemFinished {
            run_id: ctx.run_id,
            index,
            total,
            item: item.clone(),
            outcome: item_outcome,
        });

        if status == RunStatus::Cancelled {
            break;
        }

        // give subscribers of ItemFinished a turn before the next check
        tokio::task::yield_now().await;
    }

    outcome.finish(status);
    outcome
}

/// Body of the spawned run task
///
/// Runs the loop, applies `clear_completed`, releases the run slot and only
/// then emits `RunFinished`, so a subscriber reacting to it can start the
/// next run right away.
pub(crate) async fn run_worker(
    downloader: BatchDownloader,
    ctx: RunContext,
    guard: RunGuard,
) -> RunOutcome {
    let outcome = run_batch(&ctx).await;

    if ctx.clear_completed && outcome.status == RunStatus::Completed {
        downloader.remove_completed(&outcome).await;
    }

    drop(guard);

    tracing::info!(
        run_id = %outcome.run_id,
        succeeded = outcome.succeeded,
        failed = outcome.failed,
        attempted = outcome.attempted,
        total = outcome.total,
        elapsed_secs = outcome.elapsed().num_seconds(),
        "Run {}",
        outcome.summary()
    );
    for failure in &outcome.failures {
        tracing::debug!(
            index = failure.index,
            title = %failure.item.display_title,
            error = %failure.error,
            "Failed item"
        );
    }

    ctx.emit(Event::RunFinished {
        outcome: outcome.clone(),
    });
    outcome
}
