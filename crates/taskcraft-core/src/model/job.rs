use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a job, tracked across retries and dependant fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    /// Loaded but never submitted to the scheduler.
    Unstarted,
    /// Submitted, waiting for its trigger or its dependencies to clear.
    Pending,
    /// Currently executing (plugin dispatch or container run in flight).
    Running,
    /// Completed with a zero/successful result.
    Success,
    /// Completed with a non-zero result after exhausting retries.
    Error,
}

impl Default for JobStatus {
    fn default() -> Self {
        Self::Unstarted
    }
}

/// Retry policy: how many additional attempts, and the delay between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRetry {
    /// Number of retries after the first attempt. Zero means no retries.
    #[serde(default)]
    pub count: u32,
    /// Delay between attempts, in seconds.
    #[serde(default)]
    pub interval: u64,
}

impl Default for JobRetry {
    fn default() -> Self {
        Self {
            count: 0,
            interval: 0,
        }
    }
}

/// Which container engine a [`JobContainer`] talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerEngine {
    Docker,
    Podman,
}

impl Default for ContainerEngine {
    fn default() -> Self {
        Self::Docker
    }
}

/// Container execution parameters for a job whose work runs inside Docker/Podman
/// instead of an in-process plugin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobContainer {
    /// Which engine to dial.
    #[serde(default)]
    pub engine: ContainerEngine,
    /// Image reference to run.
    pub image: String,
    /// Optional command override; defaults to the image's entrypoint.
    #[serde(default)]
    pub command: Vec<String>,
    /// Extra environment variables, merged with (and overriding on conflict)
    /// the job's templated params when the container starts.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Bind mounts in `host:container[:mode]` form, passed straight to the
    /// container engine's host config.
    #[serde(default)]
    pub volumes: Vec<String>,
    /// Overrides the image's default user, e.g. `"1000:1000"`.
    #[serde(default)]
    pub user: Option<String>,
    /// Runs the container with extended (host-equivalent) privileges.
    #[serde(default)]
    pub privileged: bool,
}

impl JobContainer {
    /// The unix-socket URL for the configured engine: the standard Docker
    /// socket, or the rootless Podman per-user socket.
    pub fn engine_url(&self) -> &'static str {
        match self.engine {
            ContainerEngine::Docker => "unix:///var/run/docker.sock",
            ContainerEngine::Podman => "unix:///run/user/1000/podman/podman.sock",
        }
    }
}

/// Mutable execution record for a single job across its lifetime (including
/// every retry attempt). Lives behind a lock inside [`Job`] because concurrent
/// dependants may observe it while another task is still writing to it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobResult {
    /// How many attempts have been made so far.
    #[serde(default)]
    pub retries: u32,
    /// Wall-clock start of the current/most-recent attempt.
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    /// Wall-clock end of the most recent attempt.
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    /// Current lifecycle status.
    #[serde(default)]
    pub status: JobStatus,
    /// Chain of job ids (ending in this job's own id) that led to the
    /// most recent dispatch, recorded so a re-entrant run along the same
    /// `depends_on`/`on_success`/`on_finish` chain can be detected and
    /// refused at run time instead of recursing forever.
    #[serde(default)]
    pub execution_stack: Vec<String>,
}

impl JobResult {
    /// Marks the start of a new attempt.
    pub fn start(&mut self) {
        self.start_time = Some(Utc::now());
        self.end_time = None;
        self.status = JobStatus::Running;
    }

    /// Marks the end of the current attempt with a terminal status.
    pub fn stop(&mut self, status: JobStatus) {
        self.end_time = Some(Utc::now());
        self.status = status;
    }

    /// Elapsed wall-clock time of the most recent attempt, if it has both
    /// endpoints recorded.
    pub fn elapsed(&self) -> Option<chrono::Duration> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }
}

/// A single unit of work: a plugin or container invocation, its trigger, its
/// retry policy, and the transitions it fans out to on completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique identifier within the loaded document.
    pub id: String,
    /// Human-readable name, defaults to `id` when absent from the document.
    #[serde(default)]
    pub name: String,
    /// Name of the in-process plugin to run. Mutually exclusive with `container`.
    #[serde(default)]
    pub plugin: Option<String>,
    /// Parameters passed to the plugin or templated into the container command.
    #[serde(default)]
    pub params: BTreeMap<String, serde_json::Value>,
    /// Cron expression; absent means "run once, immediately, when triggered".
    #[serde(default)]
    pub schedule: Option<String>,
    /// Job ids to run when this job succeeds.
    #[serde(default)]
    pub on_success: Vec<String>,
    /// Job ids to run when this job fails after exhausting retries.
    #[serde(default)]
    pub on_failure: Vec<String>,
    /// Job ids to run unconditionally after this job reaches a terminal state.
    #[serde(default)]
    pub on_finish: Vec<String>,
    /// Job ids that must reach `SUCCESS` before this job is eligible to run.
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Whether the scheduler will ever submit this job on its own trigger.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Retry policy applied on plugin/container failure.
    #[serde(default)]
    pub retries: JobRetry,
    /// Per-attempt timeout, in seconds. `None` means no timeout.
    #[serde(default)]
    pub timeout: Option<u64>,
    /// Container execution parameters. Mutually exclusive with `plugin`.
    #[serde(default)]
    pub container: Option<JobContainer>,
    /// Raw input token strings (`${result:...}`, `${env:...}`, `${file:...}`)
    /// merged into `params` before templating.
    #[serde(default)]
    pub input: BTreeMap<String, String>,

    /// Mutable per-run state, shared across concurrent readers via a lock so
    /// dependants can poll a running job's status without racing its writer.
    #[serde(skip, default = "default_result")]
    pub result: std::sync::Arc<Mutex<JobResult>>,
}

fn default_enabled() -> bool {
    true
}

fn default_result() -> std::sync::Arc<Mutex<JobResult>> {
    std::sync::Arc::new(Mutex::new(JobResult::default()))
}

impl Job {
    /// The display name: `name` if set, otherwise falls back to `id`.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    /// Whether this job's work is a container run rather than a plugin call.
    pub fn is_container_job(&self) -> bool {
        self.container.is_some()
    }

    /// Current status, taken under the result lock.
    pub fn status(&self) -> JobStatus {
        self.result.lock().status
    }
}
