//! The job run algorithm: status gating, input resolution, templating,
//! isolated dispatch with retries, dependant fan-out, and hook firing.
//! Dependants are swept by taking a consistent snapshot under a brief lock
//! and releasing it before recursing, so a dependant's own dependants can be
//! swept without holding any lock across an `.await`. Every recursive
//! `run_job` call carries the chain of job ids that led to it; re-entering a
//! job already on that chain is refused rather than recursed into.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use taskcraft_core::{ContainerRunner, EngineError, EngineResult, HookType, Job, JobStatus};
use tracing::{error, info, warn};

use crate::cache::CacheManager;
use crate::events::Outcome;
use crate::executor::{PluginExecutor, PluginRef};
use crate::hook_manager::HookManager;
use crate::registry::PluginRegistry;
use crate::resolver::InputResolver;
use crate::templater::TemplateContext;
use taskcraft_core::PluginOutput;

/// Owns the loaded job set and every subsystem required to run one: plugin
/// registry, optional container runner, cache, and input resolver. One
/// instance is shared by the scheduler across the lifetime of a run.
pub struct JobManager {
    jobs: HashMap<String, Arc<Job>>,
    hooks: Arc<HookManager>,
    registry: Arc<PluginRegistry>,
    container_runner: Option<Arc<dyn ContainerRunner>>,
    cache: Arc<CacheManager>,
    resolver: InputResolver,
}

impl JobManager {
    pub fn new(
        jobs: Vec<Job>,
        hooks: Arc<HookManager>,
        registry: Arc<PluginRegistry>,
        container_runner: Option<Arc<dyn ContainerRunner>>,
        cache: Arc<CacheManager>,
    ) -> Self {
        let resolver = InputResolver::new(cache.clone());
        let jobs = jobs
            .into_iter()
            .map(|job| (job.id.clone(), Arc::new(job)))
            .collect();
        Self {
            jobs,
            hooks,
            registry,
            container_runner,
            cache,
            resolver,
        }
    }

    /// Current status of a job, or `None` if it does not exist.
    pub fn status_of(&self, job_id: &str) -> Option<JobStatus> {
        self.jobs.get(job_id).map(|j| j.status())
    }

    /// Number of enabled jobs that have not yet reached a terminal state,
    /// used by the scheduler to decide whether `AFTER_ALL` is due to fire.
    /// Counts `UNSTARTED`/`PENDING`/`RUNNING` jobs, not just `RUNNING` ones,
    /// since a job still waiting on its dependencies is just as much "in
    /// progress" for the purpose of gating the end of a run.
    pub fn in_progress(&self) -> usize {
        self.jobs
            .values()
            .filter(|j| j.enabled && !matches!(j.status(), JobStatus::Success | JobStatus::Error))
            .count()
    }

    fn job_snapshot(&self, job_id: &str) -> Option<Arc<Job>> {
        self.jobs.get(job_id).cloned()
    }

    /// Runs a job (by its real document id): gates on `enabled`/`force` and
    /// on its dependencies, dispatches with retries, sweeps dependants, and
    /// fires `BEFORE_JOB`/`AFTER_JOB`/`ON_ERROR` around the attempt. Hook job
    /// runs reach the engine through [`Self::run_hook_job`] instead, which
    /// skips this wrapping to avoid hook recursion.
    pub async fn run_job(&self, job_id: &str, force: bool) -> EngineResult<Outcome> {
        self.run_job_on_stack(job_id, force, Vec::new()).await
    }

    /// Runs a job, refusing to re-enter one already on `stack` — a
    /// `depends_on`/`on_success`/`on_finish` fan-out loop would otherwise
    /// recurse forever instead of surfacing as a validation-time cycle.
    async fn run_job_on_stack(
        &self,
        job_id: &str,
        force: bool,
        stack: Vec<String>,
    ) -> EngineResult<Outcome> {
        if stack.iter().any(|id| id == job_id) {
            warn!(job = %job_id, stack = ?stack, "refusing to re-enter job already on the execution stack");
            return Ok(Outcome::Pending);
        }

        self.fire_hook(HookType::BeforeJob).await;

        let outcome = self.execute(job_id, force, stack).await;

        match &outcome {
            Ok(Outcome::Killed) => {}
            Ok(_) => self.fire_hook(HookType::AfterJob).await,
            Err(_) => self.fire_hook(HookType::OnError).await,
        }

        outcome
    }

    /// Runs a single hook-referenced job (a deep copy, per
    /// [`HookManager::jobs_for`]) without wrapping it in further hook firing
    /// or dependant fan-out — hooks do not recursively trigger each other.
    pub async fn run_hook_job(&self, job: &Job) -> EngineResult<PluginOutput> {
        self.dispatch_with_retries(job).await
    }

    /// Whether a hook of this type is declared in the loaded document.
    pub fn has_hook(&self, hook_type: HookType) -> bool {
        self.hooks.has(hook_type)
    }

    /// Fires a `BEFORE_ALL`/`AFTER_ALL` hook — the two lifecycle points the
    /// scheduler triggers itself, rather than the job manager triggering
    /// around a single job's run.
    pub async fn fire_lifecycle_hook(&self, hook_type: HookType) {
        self.fire_hook(hook_type).await
    }

    async fn fire_hook(&self, hook_type: HookType) {
        if !self.hooks.has(hook_type) {
            return;
        }
        let index: HashMap<String, Job> = self
            .jobs
            .iter()
            .map(|(id, job)| (id.clone(), (**job).clone()))
            .collect();
        let jobs = match self.hooks.jobs_for(hook_type, &index) {
            Ok(jobs) => jobs,
            Err(e) => {
                warn!(hook = ?hook_type, error = %e, "failed to resolve hook jobs");
                return;
            }
        };
        for job in jobs {
            if let Err(e) = self.run_hook_job(&job).await {
                error!(hook = ?hook_type, job = %job.id, error = %e, "hook job failed");
            }
        }
    }

    async fn execute(&self, job_id: &str, force: bool, stack: Vec<String>) -> EngineResult<Outcome> {
        let job = self
            .job_snapshot(job_id)
            .ok_or_else(|| EngineError::JobNotFound(job_id.to_string()))?;

        if !job.enabled && !force {
            return Ok(Outcome::Pending);
        }

        for dep in &job.depends_on {
            match self.status_of(dep) {
                Some(JobStatus::Success) => continue,
                Some(_) | None => return Ok(Outcome::Pending),
            }
        }

        let mut next_stack = stack;
        next_stack.push(job.id.clone());
        job.result.lock().execution_stack = next_stack.clone();

        match self.dispatch_with_retries(&job).await {
            Ok(_output) => {
                if job.schedule.is_some() {
                    let mut result = job.result.lock();
                    result.stop(JobStatus::Running);
                    result.retries += 1;
                } else {
                    job.result.lock().stop(JobStatus::Success);
                }
                info!(job = %job.id, "job succeeded");

                if is_termination_signal(&job) {
                    return Ok(Outcome::Killed);
                }

                self.sweep(&job.on_success, &next_stack).await;
                self.sweep_dependants(&job.id, &next_stack).await;
                self.sweep(&job.on_finish, &next_stack).await;
                Ok(Outcome::Success(job))
            }
            Err(e) => {
                job.result.lock().stop(JobStatus::Error);
                error!(job = %job.id, error = %e, "job failed after exhausting retries");
                self.sweep(&job.on_failure, &next_stack).await;
                self.sweep(&job.on_finish, &next_stack).await;
                Ok(Outcome::Failed(job, e.to_string()))
            }
        }
    }

    /// Fires `run_job` for every dependant job id, releasing any borrow of
    /// `self.jobs` before recursing so a dependant's own dependants can be
    /// swept without deadlocking on shared state.
    async fn sweep(&self, job_ids: &[String], stack: &[String]) {
        for id in job_ids {
            if let Err(e) = Box::pin(self.run_job_on_stack(id, true, stack.to_vec())).await {
                warn!(job = %id, error = %e, "dependant job run failed");
            }
        }
    }

    /// Re-drives every job whose `depends_on` names `job_id` and that is
    /// still waiting to start, now that one of its dependencies has cleared.
    async fn sweep_dependants(&self, job_id: &str, stack: &[String]) {
        let dependants: Vec<String> = self
            .jobs
            .values()
            .filter(|j| j.depends_on.iter().any(|dep| dep == job_id))
            .filter(|j| matches!(j.status(), JobStatus::Unstarted | JobStatus::Pending))
            .map(|j| j.id.clone())
            .collect();

        for id in dependants {
            if let Err(e) = Box::pin(self.run_job_on_stack(&id, false, stack.to_vec())).await {
                warn!(job = %id, error = %e, "dependant job run failed");
            }
        }
    }

    async fn dispatch_with_retries(&self, job: &Job) -> EngineResult<PluginOutput> {
        let attempts = job.retries.count + 1;
        let mut last_err = None;

        for attempt in 1..=attempts {
            {
                let mut result = job.result.lock();
                result.retries = attempt;
                result.start();
            }

            let resolved_params = self.resolve_params(job);
            let context = TemplateContext::for_job(job);
            let templated: BTreeMap<_, _> = resolved_params
                .into_iter()
                .map(|(k, v)| (k, context.apply_value(&v)))
                .collect();

            let outcome = match &job.container {
                Some(container) => self.dispatch_container(container, &templated).await,
                None => {
                    let plugin_name = job.plugin.as_deref().unwrap_or_default();
                    let plugin_ref = PluginRef::parse(plugin_name);
                    PluginExecutor::execute(&self.registry, &plugin_ref, templated, job.timeout)
                        .await
                }
            };

            match outcome {
                Ok(output) => {
                    self.cache_output(job, attempt, &output);
                    return Ok(output);
                }
                Err(e) => {
                    warn!(job = %job.id, attempt, error = %e, "attempt failed");
                    if let Err(cache_err) = self.cache.write_stderr(&job.id, attempt, &e.to_string()) {
                        warn!(job = %job.id, error = %cache_err, "failed to cache attempt stderr");
                    }
                    last_err = Some(e);
                    if attempt < attempts {
                        tokio::time::sleep(Duration::from_secs(job.retries.interval)).await;
                    }
                }
            }
        }

        Err(last_err.unwrap_or_else(|| EngineError::JobFailed(job.id.clone())))
    }

    async fn dispatch_container(
        &self,
        container: &taskcraft_core::JobContainer,
        params: &BTreeMap<String, serde_json::Value>,
    ) -> EngineResult<PluginOutput> {
        match &self.container_runner {
            Some(runner) => runner.run(container, params).await,
            None => Err(EngineError::Container(
                "no container runner configured".into(),
            )),
        }
    }

    fn resolve_params(&self, job: &Job) -> BTreeMap<String, serde_json::Value> {
        let mut params = job.params.clone();
        for (key, token) in &job.input {
            let resolved = self.resolver.resolve(token, |dep_id| {
                self.jobs.get(dep_id).map(|j| j.result.lock().retries)
            });
            if resolved.is_empty() && !token.is_empty() {
                warn!(job = %job.id, key = %key, token = %token, "input token did not resolve, skipping merge");
                continue;
            }
            params.insert(key.clone(), serde_json::Value::String(resolved));
        }
        params
    }

    fn cache_output(&self, job: &Job, attempt: u32, output: &PluginOutput) {
        let result = match output {
            PluginOutput::Text(text) => self.cache.write_output(&job.id, attempt, None, text),
            PluginOutput::Map(map) => map.iter().try_for_each(|(key, value)| {
                self.cache.write_output(&job.id, attempt, Some(key), value)
            }),
        };
        if let Err(e) = result {
            warn!(job = %job.id, error = %e, "failed to cache job output");
        }
    }
}

/// Whether this job's successful run should signal engine termination: any
/// job whose plugin is literally named `exit` ends the run instead of
/// continuing dependant fan-out.
fn is_termination_signal(job: &Job) -> bool {
    job.plugin.as_deref() == Some("exit")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU32, Ordering};
    use taskcraft_core::{JobContainer, JobResult, JobRetry};

    struct Echo;

    #[async_trait]
    impl taskcraft_core::Plugin for Echo {
        fn name(&self) -> &str {
            "echo"
        }
        async fn run(
            &self,
            params: &BTreeMap<String, serde_json::Value>,
        ) -> Result<PluginOutput, taskcraft_core::PluginError> {
            let message = params
                .get("message")
                .and_then(|v| v.as_str())
                .unwrap_or("Hello World!");
            Ok(PluginOutput::text(message))
        }
    }

    struct FlakyThenOk(AtomicU32);

    #[async_trait]
    impl taskcraft_core::Plugin for FlakyThenOk {
        fn name(&self) -> &str {
            "flaky"
        }
        async fn run(
            &self,
            _params: &BTreeMap<String, serde_json::Value>,
        ) -> Result<PluginOutput, taskcraft_core::PluginError> {
            let attempt = self.0.fetch_add(1, Ordering::SeqCst);
            if attempt < 1 {
                Err(taskcraft_core::PluginError::failed("not yet"))
            } else {
                Ok(PluginOutput::text("recovered"))
            }
        }
    }

    fn bare_job(id: &str, plugin: &str) -> Job {
        Job {
            id: id.into(),
            name: String::new(),
            plugin: Some(plugin.into()),
            params: BTreeMap::new(),
            schedule: None,
            on_success: vec![],
            on_failure: vec![],
            on_finish: vec![],
            depends_on: vec![],
            enabled: true,
            retries: JobRetry::default(),
            timeout: None,
            container: None::<JobContainer>,
            input: BTreeMap::new(),
            result: Arc::new(parking_lot::Mutex::new(JobResult::default())),
        }
    }

    fn test_cache() -> Arc<CacheManager> {
        test_cache_with_dir().0
    }

    fn test_cache_with_dir() -> (Arc<CacheManager>, PathBuf) {
        let dir = std::env::temp_dir().join(format!("taskcraft-jm-test-{}", uuid::Uuid::new_v4()));
        (Arc::new(CacheManager::open(&dir).unwrap()), dir)
    }

    #[tokio::test]
    async fn echo_one_shot_succeeds() {
        let mut registry = PluginRegistry::new();
        registry.register(Arc::new(Echo));
        let (cache, dir) = test_cache_with_dir();
        let mut job = bare_job("a", "echo");
        job.params.insert("message".into(), serde_json::Value::String("hi".into()));
        let manager = JobManager::new(
            vec![job],
            Arc::new(HookManager::new(vec![])),
            Arc::new(registry),
            None,
            cache,
        );
        let outcome = manager.run_job("a", true).await.unwrap();
        assert!(matches!(outcome, Outcome::Success(_)));
        assert_eq!(manager.status_of("a"), Some(JobStatus::Success));
        let stdout = std::fs::read_to_string(dir.join(".a.1.stdout")).unwrap();
        assert_eq!(stdout, "hi");
    }

    #[tokio::test]
    async fn linear_dependency_blocks_until_upstream_succeeds() {
        let mut registry = PluginRegistry::new();
        registry.register(Arc::new(Echo));
        let mut upstream = bare_job("a", "echo");
        upstream.params.insert("message".into(), serde_json::Value::String("1".into()));
        let mut downstream = bare_job("b", "echo");
        downstream.depends_on = vec!["a".into()];
        downstream.input.insert("message".into(), "${result:a}".into());
        let (cache, dir) = test_cache_with_dir();
        let manager = JobManager::new(
            vec![upstream, downstream],
            Arc::new(HookManager::new(vec![])),
            Arc::new(registry),
            None,
            cache,
        );

        let pending = manager.run_job("b", false).await.unwrap();
        assert!(matches!(pending, Outcome::Pending));

        manager.run_job("a", false).await.unwrap();
        let ready = manager.run_job("b", false).await.unwrap();
        assert!(matches!(ready, Outcome::Success(_)));

        let b_stdout = std::fs::read_to_string(dir.join(".b.1.stdout")).unwrap();
        assert_eq!(b_stdout, "1");
    }

    struct AlwaysFails;

    #[async_trait]
    impl taskcraft_core::Plugin for AlwaysFails {
        fn name(&self) -> &str {
            "always_fails"
        }
        async fn run(
            &self,
            _params: &BTreeMap<String, serde_json::Value>,
        ) -> Result<PluginOutput, taskcraft_core::PluginError> {
            Err(taskcraft_core::PluginError::failed("boom"))
        }
    }

    #[tokio::test]
    async fn retry_exhaustion_caches_stderr_per_attempt() {
        let mut registry = PluginRegistry::new();
        registry.register(Arc::new(AlwaysFails));
        let mut job = bare_job("x", "always_fails");
        job.retries = JobRetry {
            count: 2,
            interval: 0,
        };
        let (cache, dir) = test_cache_with_dir();
        let manager = JobManager::new(
            vec![job],
            Arc::new(HookManager::new(vec![])),
            Arc::new(registry),
            None,
            cache,
        );

        let outcome = manager.run_job("x", true).await.unwrap();
        assert!(matches!(outcome, Outcome::Failed(_, _)));
        assert_eq!(manager.status_of("x"), Some(JobStatus::Error));

        for attempt in 1..=3 {
            let stderr = std::fs::read_to_string(dir.join(format!(".x.{attempt}.stderr"))).unwrap();
            assert!(stderr.contains("boom"));
        }
    }

    #[tokio::test]
    async fn retry_recovers_within_budget() {
        let mut registry = PluginRegistry::new();
        registry.register(Arc::new(FlakyThenOk(AtomicU32::new(0))));
        let mut job = bare_job("flaky-job", "flaky");
        job.retries = JobRetry {
            count: 2,
            interval: 0,
        };
        let manager = JobManager::new(
            vec![job],
            Arc::new(HookManager::new(vec![])),
            Arc::new(registry),
            None,
            test_cache(),
        );
        let outcome = manager.run_job("flaky-job", true).await.unwrap();
        assert!(matches!(outcome, Outcome::Success(_)));
    }

    #[tokio::test]
    async fn exit_plugin_reports_killed() {
        let mut registry = PluginRegistry::new();
        registry.register(Arc::new(Echo) as Arc<dyn taskcraft_core::Plugin>);
        struct Exit;
        #[async_trait]
        impl taskcraft_core::Plugin for Exit {
            fn name(&self) -> &str {
                "exit"
            }
            async fn run(
                &self,
                _params: &BTreeMap<String, serde_json::Value>,
            ) -> Result<PluginOutput, taskcraft_core::PluginError> {
                Ok(PluginOutput::text(""))
            }
        }
        registry.register(Arc::new(Exit));
        let manager = JobManager::new(
            vec![bare_job("kill", "exit")],
            Arc::new(HookManager::new(vec![])),
            Arc::new(registry),
            None,
            test_cache(),
        );
        let outcome = manager.run_job("kill", true).await.unwrap();
        assert!(matches!(outcome, Outcome::Killed));
    }

    #[tokio::test]
    async fn dependant_runs_automatically_once_its_dependency_succeeds() {
        let mut registry = PluginRegistry::new();
        registry.register(Arc::new(Echo));
        let upstream = bare_job("a", "echo");
        let mut downstream = bare_job("b", "echo");
        downstream.depends_on = vec!["a".into()];
        let manager = JobManager::new(
            vec![upstream, downstream],
            Arc::new(HookManager::new(vec![])),
            Arc::new(registry),
            None,
            test_cache(),
        );

        // "b" is never driven directly; only running "a" should be enough.
        manager.run_job("a", true).await.unwrap();
        assert_eq!(manager.status_of("b"), Some(JobStatus::Success));
    }

    struct CountingEcho(Arc<AtomicU32>);

    #[async_trait]
    impl taskcraft_core::Plugin for CountingEcho {
        fn name(&self) -> &str {
            "counting-echo"
        }
        async fn run(
            &self,
            _params: &BTreeMap<String, serde_json::Value>,
        ) -> Result<PluginOutput, taskcraft_core::PluginError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(PluginOutput::text(""))
        }
    }

    #[tokio::test]
    async fn on_success_cycle_is_refused_instead_of_recursing_forever() {
        let count = Arc::new(AtomicU32::new(0));
        let mut registry = PluginRegistry::new();
        registry.register(Arc::new(CountingEcho(count.clone())));

        let mut a = bare_job("a", "counting-echo");
        a.on_success = vec!["b".into()];
        let mut b = bare_job("b", "counting-echo");
        b.on_success = vec!["a".into()];

        let manager = JobManager::new(
            vec![a, b],
            Arc::new(HookManager::new(vec![])),
            Arc::new(registry),
            None,
            test_cache(),
        );

        let outcome = manager.run_job("a", true).await.unwrap();
        assert!(matches!(outcome, Outcome::Success(_)));
        // "a" runs, sweeps "b", "b" sweeps "a" again — the second "a" is
        // refused because it is already on the execution stack, so each job
        // runs exactly once rather than looping forever.
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
