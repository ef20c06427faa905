//! Schedules jobs against `tokio-cron-scheduler` and drives the
//! `BEFORE_ALL`/`AFTER_ALL` hook lifecycle and engine termination gate:
//! one-shot jobs run immediately as a spawned task, cron jobs register with
//! the cron scheduler, a single channel consumer reacts to every completed
//! run, and the run exits either when the `exit` plugin fires or (absent an
//! `AFTER_ALL` hook) once no jobs remain in progress.

use std::sync::Arc;

use taskcraft_core::{EngineResult, HookType, Job};
use taskcraft_framework::{JobManager, Outcome};
use tokio::sync::mpsc;
use tokio_cron_scheduler::{Job as CronJob, JobScheduler};
use tracing::{info, warn};

/// Internal message posted once a job run (scheduled or one-shot) completes.
/// `is_cron` records whether the completed run's trigger was a cron
/// schedule: cron-triggered completions never gate `AFTER_ALL` or
/// termination, since the job is expected to fire again.
struct RunCompleted {
    job_id: String,
    outcome: Outcome,
    is_cron: bool,
}

/// Drives a loaded job set to completion.
pub struct Scheduler {
    manager: Arc<JobManager>,
    jobs: Vec<Job>,
}

impl Scheduler {
    pub fn new(manager: Arc<JobManager>, jobs: Vec<Job>) -> Self {
        Self { manager, jobs }
    }

    /// Runs every enabled job to completion (and all the jobs they transitively
    /// fan out to), firing `BEFORE_ALL`/`AFTER_ALL` around the whole run.
    /// Returns once the `exit` plugin fires or every submitted job has
    /// finished and no `AFTER_ALL` hook is registered to keep the run alive.
    pub async fn run(&self) -> EngineResult<()> {
        let has_after_all = self.manager.has_hook(HookType::AfterAll);

        self.manager.fire_lifecycle_hook(HookType::BeforeAll).await;

        let (tx, mut rx) = mpsc::channel::<RunCompleted>(64);
        let mut cron_scheduler = JobScheduler::new()
            .await
            .map_err(|e| taskcraft_core::EngineError::Container(format!("scheduler init failed: {e}")))?;

        let mut submitted = 0usize;

        for job in &self.jobs {
            if !job.enabled {
                continue;
            }
            match &job.schedule {
                Some(cron_expr) => {
                    submitted += 1;
                    let manager = self.manager.clone();
                    let job_id = job.id.clone();
                    let tx = tx.clone();
                    let cron_job = CronJob::new_async(cron_expr.as_str(), move |_uuid, _l| {
                        let manager = manager.clone();
                        let job_id = job_id.clone();
                        let tx = tx.clone();
                        Box::pin(async move {
                            let outcome = manager.run_job(&job_id, false).await;
                            let outcome = outcome.unwrap_or_else(|e| Outcome::Failed(
                                Arc::new(dummy_job(&job_id)),
                                e.to_string(),
                            ));
                            let _ = tx
                                .send(RunCompleted {
                                    job_id,
                                    outcome,
                                    is_cron: true,
                                })
                                .await;
                        })
                    })
                    .map_err(|e| {
                        taskcraft_core::EngineError::Container(format!(
                            "invalid cron schedule '{cron_expr}': {e}"
                        ))
                    })?;
                    cron_scheduler.add(cron_job).await.map_err(|e| {
                        taskcraft_core::EngineError::Container(format!("failed to schedule job: {e}"))
                    })?;
                }
                None => {
                    submitted += 1;
                    let manager = self.manager.clone();
                    let job_id = job.id.clone();
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        let outcome = manager.run_job(&job_id, false).await;
                        let outcome = outcome.unwrap_or_else(|e| {
                            Outcome::Failed(Arc::new(dummy_job(&job_id)), e.to_string())
                        });
                        let _ = tx
                            .send(RunCompleted {
                                job_id,
                                outcome,
                                is_cron: false,
                            })
                            .await;
                    });
                }
            }
        }

        cron_scheduler
            .start()
            .await
            .map_err(|e| taskcraft_core::EngineError::Container(format!("scheduler start failed: {e}")))?;

        drop(tx);

        if submitted == 0 {
            info!("no enabled jobs to run");
        } else {
            self.drain(&mut rx, has_after_all).await;
        }

        let _ = cron_scheduler.shutdown().await;
        Ok(())
    }

    async fn drain(&self, rx: &mut mpsc::Receiver<RunCompleted>, has_after_all: bool) {
        while let Some(RunCompleted {
            job_id,
            outcome,
            is_cron,
        }) = rx.recv().await
        {
            match outcome {
                Outcome::Killed => {
                    info!(job = %job_id, "exit plugin fired, terminating run");
                    return;
                }
                Outcome::Failed(_, reason) => {
                    warn!(job = %job_id, reason = %reason, "job run failed");
                }
                _ => {}
            }

            // A cron-triggered completion never gates AFTER_ALL: the job is
            // expected to run again on its next tick.
            if is_cron {
                continue;
            }

            if self.manager.in_progress() == 0 {
                self.manager.fire_lifecycle_hook(HookType::AfterAll).await;
                if !has_after_all {
                    info!("no AFTER_ALL hook registered and no jobs in progress, ending run");
                    return;
                }
            }
        }
    }
}

fn dummy_job(id: &str) -> Job {
    Job {
        id: id.to_string(),
        name: String::new(),
        plugin: None,
        params: Default::default(),
        schedule: None,
        on_success: vec![],
        on_failure: vec![],
        on_finish: vec![],
        depends_on: vec![],
        enabled: false,
        retries: Default::default(),
        timeout: None,
        container: None,
        input: Default::default(),
        result: Arc::new(parking_lot::Mutex::new(Default::default())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use taskcraft_core::{Hook, HookType, Job, JobRetry, PluginError, PluginOutput};
    use taskcraft_framework::{CacheManager, HookManager, JobManager, PluginRegistry};

    struct CountingPlugin(Arc<AtomicUsize>);

    #[async_trait]
    impl taskcraft_core::Plugin for CountingPlugin {
        fn name(&self) -> &str {
            "counter"
        }

        async fn run(
            &self,
            _params: &BTreeMap<String, serde_json::Value>,
        ) -> Result<PluginOutput, PluginError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(PluginOutput::text("ok"))
        }
    }

    fn enabled_job(id: &str, plugin: &str) -> Job {
        Job {
            id: id.to_string(),
            name: String::new(),
            plugin: Some(plugin.to_string()),
            params: BTreeMap::new(),
            schedule: None,
            on_success: vec![],
            on_failure: vec![],
            on_finish: vec![],
            depends_on: vec![],
            enabled: true,
            retries: JobRetry::default(),
            timeout: None,
            container: None,
            input: BTreeMap::new(),
            result: Arc::new(parking_lot::Mutex::new(Default::default())),
        }
    }

    fn test_cache() -> Arc<CacheManager> {
        let dir = std::env::temp_dir().join(format!("taskcraft-sched-test-{}", uuid::Uuid::new_v4()));
        Arc::new(CacheManager::open(dir).unwrap())
    }

    /// A cron-triggered completion must never gate `AFTER_ALL`: the second,
    /// one-shot-flagged message is what actually fires the hook. If the
    /// `is_cron` check were missing, the first message would fire it too and
    /// the counter would read 2, not 1.
    #[tokio::test]
    async fn cron_completion_does_not_gate_after_all() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut registry = PluginRegistry::new();
        registry.register(Arc::new(CountingPlugin(counter.clone())));

        // Disabled: this job only ever runs as the AFTER_ALL hook's job, never
        // submitted directly by the scheduler loop, so it must not itself
        // count toward `in_progress()`.
        let mut marker_job = enabled_job("marker-job", "counter");
        marker_job.enabled = false;
        let jobs = vec![marker_job];
        let hooks = Arc::new(HookManager::new(vec![Hook {
            hook_type: HookType::AfterAll,
            jobs: vec!["marker-job".into()],
        }]));
        let manager = Arc::new(JobManager::new(
            jobs.clone(),
            hooks,
            Arc::new(registry),
            None,
            test_cache(),
        ));
        let scheduler = Scheduler::new(manager, jobs);

        let (tx, mut rx) = mpsc::channel(8);
        let dummy = Arc::new(dummy_job("cron-job"));
        tx.send(RunCompleted {
            job_id: "cron-job".into(),
            outcome: Outcome::Success(dummy.clone()),
            is_cron: true,
        })
        .await
        .unwrap();
        tx.send(RunCompleted {
            job_id: "one-shot-job".into(),
            outcome: Outcome::Success(dummy),
            is_cron: false,
        })
        .await
        .unwrap();
        drop(tx);

        scheduler.drain(&mut rx, true).await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    /// With no `AFTER_ALL` hook registered, a one-shot completion that leaves
    /// no jobs in progress ends the run immediately, leaving any further
    /// queued messages unconsumed.
    #[tokio::test]
    async fn one_shot_completion_ends_run_without_after_all_hook() {
        let registry = PluginRegistry::new();
        let jobs: Vec<Job> = vec![];
        let manager = Arc::new(JobManager::new(
            jobs.clone(),
            Arc::new(HookManager::new(vec![])),
            Arc::new(registry),
            None,
            test_cache(),
        ));
        let scheduler = Scheduler::new(manager, jobs);

        let (tx, mut rx) = mpsc::channel(8);
        let dummy = Arc::new(dummy_job("solo-job"));
        tx.send(RunCompleted {
            job_id: "solo-job".into(),
            outcome: Outcome::Success(dummy.clone()),
            is_cron: false,
        })
        .await
        .unwrap();
        tx.send(RunCompleted {
            job_id: "never-seen".into(),
            outcome: Outcome::Success(dummy),
            is_cron: false,
        })
        .await
        .unwrap();

        scheduler.drain(&mut rx, false).await;

        assert!(
            rx.try_recv().is_ok(),
            "drain should return as soon as the run ends, before the channel is empty"
        );
    }
}
