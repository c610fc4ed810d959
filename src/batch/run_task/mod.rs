//! Run execution -- the sequential loop over a queue snapshot.
//!
//! Split into focused submodules:
//! - [`context`] - Immutable per-run state shared by the loop and the executor
//! - [`executor`] - One job: its sub-operations and progress forwarding
//! - [`orchestration`] - Item loop, outcome aggregation, worker wrap-up

mod context;
mod executor;
mod orchestration;

pub(crate) use context::RunContext;
pub(crate) use executor::execute_job;
pub(crate) use orchestration::{run_batch, run_worker};
