use serde::{Deserialize, Serialize};

/// The five points in a run where a hook can fire, matching the engine
/// lifecycle: once before anything is scheduled, once after every job has
/// reached a terminal state, and around/on-error of each individual job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookType {
    BeforeAll,
    AfterAll,
    BeforeJob,
    AfterJob,
    OnError,
}

impl HookType {
    /// All variants, in lifecycle order.
    pub const ALL: [HookType; 5] = [
        HookType::BeforeAll,
        HookType::AfterAll,
        HookType::BeforeJob,
        HookType::AfterJob,
        HookType::OnError,
    ];

    /// The `Hook(<type>)` label used for the synthetic job ids the scheduler
    /// assigns to hook-triggered runs.
    pub fn label(&self) -> &'static str {
        match self {
            HookType::BeforeAll => "before_all",
            HookType::AfterAll => "after_all",
            HookType::BeforeJob => "before_job",
            HookType::AfterJob => "after_job",
            HookType::OnError => "on_error",
        }
    }
}

/// A named list of job ids to run at a given [`HookType`] point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hook {
    /// Which lifecycle point this hook fires at.
    #[serde(rename = "type")]
    pub hook_type: HookType,
    /// Job ids to run when the hook fires, resolved against the document's
    /// job list at load time.
    pub jobs: Vec<String>,
}

impl Hook {
    /// Whether a scheduling id belongs to a hook-triggered run rather than a
    /// normal job run, recognized by its `Hook(...)` prefix.
    pub fn is_hook_job_id(scheduling_id: &str) -> bool {
        scheduling_id.starts_with("Hook(")
    }
}
