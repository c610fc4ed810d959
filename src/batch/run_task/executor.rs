//! Job executor -- runs the sub-operations of one item.

use crate::batch::cancel::RunCancellation;
use crate::engine::{FetchProgress, FetchRequest, ProgressControl};
use crate::error::JobError;
use crate::types::{Event, FetchVariant, JobReference, RunId};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU32, Ordering};

use super::context::RunContext;

/// Forwards engine progress as events and answers with the cancel state
///
/// Progress is forwarded once per whole percent to keep the event channel
/// from flooding on chatty engines.
struct ProgressForwarder {
    event_tx: tokio::sync::broadcast::Sender<Event>,
    cancel: RunCancellation,
    run_id: RunId,
    index: usize,
    variant: FetchVariant,
    last_percent: AtomicU32,
}

impl ProgressForwarder {
    fn new(ctx: &RunContext, index: usize, variant: FetchVariant) -> Self {
        Self {
            event_tx: ctx.event_tx.clone(),
            cancel: ctx.cancel.clone(),
            run_id: ctx.run_id,
            index,
            variant,
            last_percent: AtomicU32::new(u32::MAX),
        }
    }

    fn report(&self, progress: FetchProgress) -> ProgressControl {
        if self.cancel.is_requested() {
            return ProgressControl::Abort;
        }

        let whole = progress.percent.clamp(0.0, 100.0) as u32;
        if self.last_percent.swap(whole, Ordering::Relaxed) != whole {
            self.event_tx
                .send(Event::ItemProgress {
                    run_id: self.run_id,
                    index: self.index,
                    variant: self.variant,
                    percent: progress.percent.clamp(0.0, 100.0),
                    eta_secs: progress.eta_secs,
                })
                .ok();
        }
        ProgressControl::Continue
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// Run every sub-operation the run's mode requires for one item
///
/// Cancellation is checked before each sub-operation and observed inside
/// the engine through the progress hook. A fetch that returns after
/// cancellation was requested counts as cancelled, even if it succeeded.
/// Only the run's token makes an item cancelled: an engine error, an
/// unrequested `Aborted` included, is a fetch failure, and so is a panic
/// inside the engine.
pub(crate) async fn execute_job(
    ctx: &RunContext,
    index: usize,
    item: &JobReference,
) -> Result<(), JobError> {
    for &variant in ctx.mode.variants() {
        if ctx.cancel.is_requested() {
            return Err(JobError::Cancelled);
        }

        ctx.emit(Event::SubOperationStarted {
            run_id: ctx.run_id,
            index,
            variant,
        });
        tracing::debug!(
            run_id = %ctx.run_id,
            index,
            variant = %variant,
            source = %item.source,
            "Starting sub-operation"
        );

        let request = FetchRequest {
            source: item.source.clone(),
            title: item.display_title.clone(),
            destination_dir: ctx.destination_dir.clone(),
            variant,
            quality: ctx.quality,
            retries: ctx.retries,
        };
        let forwarder = ProgressForwarder::new(ctx, index, variant);
        let result = AssertUnwindSafe(
            ctx.engine
                .fetch(&request, &|progress| forwarder.report(progress)),
        )
        .catch_unwind()
        .await;

        if ctx.cancel.is_requested() {
            return Err(JobError::Cancelled);
        }

        let result = match result {
            Ok(result) => result,
            Err(payload) => {
                let cause = format!("fetch engine panicked: {}", panic_message(&*payload));
                tracing::error!(
                    run_id = %ctx.run_id,
                    index,
                    variant = %variant,
                    error = %cause,
                    "Fetch engine panicked"
                );
                return Err(JobError::Fetch { cause });
            }
        };

        match result {
            Ok(output) => {
                tracing::debug!(
                    run_id = %ctx.run_id,
                    index,
                    variant = %variant,
                    files = ?output.files,
                    "Sub-operation finished"
                );
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}
