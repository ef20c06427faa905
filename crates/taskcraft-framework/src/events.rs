//! Event types carried on the scheduler's internal channel: a typed
//! `Submitted`/`Executed` message passed over an explicit `mpsc` channel in
//! place of a synchronous listener callback.

use std::sync::Arc;

use taskcraft_core::Job;

/// The terminal result of a single job run, shared between the job manager's
/// return value and the scheduler's internal event channel.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The job's plugin or container run completed successfully.
    Success(Arc<Job>),
    /// The job is still waiting on a dependency or its trigger; not yet run.
    Pending,
    /// The job failed after exhausting its retries, carrying the job and a
    /// human-readable failure reason.
    Failed(Arc<Job>, String),
    /// The `exit` poison-pill plugin was invoked; the engine should shut down.
    Killed,
}

/// A message posted to the scheduler's event loop by a completed job run or
/// by the scheduler itself at submission time.
#[derive(Debug, Clone)]
pub enum SchedulerEvent {
    /// A job (or hook-triggered job run) has been handed to the scheduler's
    /// underlying cron engine.
    Submitted { scheduling_id: String },
    /// A job run completed, successfully or not.
    Executed {
        scheduling_id: String,
        job_id: String,
        outcome: Outcome,
    },
}
