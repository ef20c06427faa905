//! Hook lookup and job-list materialization: hooks map `HookType` to a list
//! of job ids, resolved against the document's job set at load time.

use std::collections::HashMap;

use taskcraft_core::{EngineError, EngineResult, Hook, HookType, Job};

/// Holds the document's declared hooks, keyed by type (at most one hook per
/// type, matching the document schema).
pub struct HookManager {
    hooks: HashMap<HookType, Hook>,
}

impl HookManager {
    pub fn new(hooks: Vec<Hook>) -> Self {
        let mut map = HashMap::new();
        for hook in hooks {
            map.insert(hook.hook_type, hook);
        }
        Self { hooks: map }
    }

    /// The hook declared for `hook_type`, if any.
    pub fn get(&self, hook_type: HookType) -> Option<&Hook> {
        self.hooks.get(&hook_type)
    }

    /// Whether a hook of this type is declared at all — used by the
    /// scheduler to decide whether an `AFTER_ALL` firing should itself gate
    /// engine termination.
    pub fn has(&self, hook_type: HookType) -> bool {
        self.hooks.contains_key(&hook_type)
    }

    /// Materializes independent, deep-copied [`Job`] instances for every job
    /// id a hook references, so a hook-triggered run never shares mutable
    /// result state with the job's own normally-scheduled instance.
    pub fn jobs_for(
        &self,
        hook_type: HookType,
        job_index: &HashMap<String, Job>,
    ) -> EngineResult<Vec<Job>> {
        let Some(hook) = self.get(hook_type) else {
            return Ok(Vec::new());
        };
        hook.jobs
            .iter()
            .map(|id| {
                job_index
                    .get(id)
                    .cloned()
                    .map(|job| Job {
                        result: std::sync::Arc::new(parking_lot::Mutex::new(
                            taskcraft_core::JobResult::default(),
                        )),
                        ..job
                    })
                    .ok_or_else(|| EngineError::JobNotFound(id.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_hook_type_returns_empty() {
        let mgr = HookManager::new(vec![]);
        assert!(mgr.get(HookType::BeforeAll).is_none());
        assert!(!mgr.has(HookType::AfterAll));
    }

    #[test]
    fn stores_one_hook_per_type() {
        let mgr = HookManager::new(vec![Hook {
            hook_type: HookType::AfterAll,
            jobs: vec!["cleanup".into()],
        }]);
        assert!(mgr.has(HookType::AfterAll));
        assert_eq!(mgr.get(HookType::AfterAll).unwrap().jobs, vec!["cleanup"]);
    }
}
