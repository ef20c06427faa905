//! Structural validation of a loaded job document: duplicate ids, dangling
//! references, cycles in the `depends_on` graph, and cycles in each of the
//! `on_success`/`on_failure`/`on_finish` transition graphs (checked
//! independently, since a job can legitimately appear in more than one of
//! another job's transition lists without that being a cycle on its own).
//! Also checks that every job has work to do, that named plugins exist in
//! the registry, and that `${result:...}` input tokens are well-formed. The
//! `depends_on` cycle search memoizes globally (each job visited once
//! overall) while each transition-graph search re-runs fresh from every
//! starting job (no cross-root memoization, since a transition chain
//! starting at different jobs can legitimately revisit shared downstream
//! jobs without that being a cycle).

use std::collections::{HashMap, HashSet};

use regex_lite::Regex;
use taskcraft_core::{EngineError, EngineResult, HookType, Job};
use taskcraft_framework::PluginRegistry;

use super::schema::Document;

pub fn validate_document(doc: &Document, registry: &PluginRegistry) -> EngineResult<()> {
    validate_jobs(&doc.jobs, registry)?;
    validate_hooks(doc)?;
    Ok(())
}

fn validate_jobs(jobs: &[Job], registry: &PluginRegistry) -> EngineResult<()> {
    let mut seen = HashSet::new();
    for job in jobs {
        if !seen.insert(job.id.as_str()) {
            return Err(EngineError::job_validation(format!(
                "duplicate job id '{}'",
                job.id
            )));
        }
    }

    let index: HashMap<&str, &Job> = jobs.iter().map(|j| (j.id.as_str(), j)).collect();

    for job in jobs {
        check_refs(job, &index)?;
        check_has_work(job)?;
        check_plugin_registered(job, registry)?;
        check_input_tokens(job)?;
    }

    check_depends_on_cycles(jobs, &index)?;
    for field in [
        TransitionField::OnSuccess,
        TransitionField::OnFailure,
        TransitionField::OnFinish,
    ] {
        check_transition_cycles(jobs, &index, field)?;
    }

    Ok(())
}

/// A job must do something: either run an in-process plugin or a container.
fn check_has_work(job: &Job) -> EngineResult<()> {
    if job.plugin.is_none() && job.container.is_none() {
        return Err(EngineError::job_validation(format!(
            "job '{}' sets neither 'plugin' nor 'container'",
            job.id
        )));
    }
    Ok(())
}

/// A job naming a registered (non-`file:`, non-container) plugin must find
/// it in the registry, so a typo surfaces at validation time rather than at
/// dispatch time.
fn check_plugin_registered(job: &Job, registry: &PluginRegistry) -> EngineResult<()> {
    let Some(plugin) = job.plugin.as_deref() else {
        return Ok(());
    };
    if plugin.starts_with("file:") {
        return Ok(());
    }
    if registry.get(plugin).is_none() {
        return Err(EngineError::job_validation(format!(
            "job '{}' references unknown plugin '{plugin}'",
            job.id
        )));
    }
    Ok(())
}

fn result_token_pattern() -> &'static Regex {
    static PATTERN: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{result:[a-zA-Z0-9\-_.]+(:[a-zA-Z0-9\-_.]+)?\}").expect("valid regex"))
}

/// Every `${result:...}` occurrence in a job's `input` map must match the
/// `${result:<job_id>}` / `${result:<job_id>:<key>}` grammar the resolver
/// understands; a malformed token would otherwise silently resolve to an
/// empty string at run time.
fn check_input_tokens(job: &Job) -> EngineResult<()> {
    let well_formed = result_token_pattern();
    for (key, value) in &job.input {
        for m in find_result_occurrences(value) {
            if !well_formed.is_match(m) {
                return Err(EngineError::job_validation(format!(
                    "job '{}' input '{key}' has a malformed ${{result:...}} token: '{m}'",
                    job.id
                )));
            }
        }
    }
    Ok(())
}

fn find_result_occurrences(value: &str) -> impl Iterator<Item = &str> {
    static LOOSE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    let loose = LOOSE.get_or_init(|| Regex::new(r"\$\{result:[^}]*\}").expect("valid regex"));
    loose.find_iter(value).map(|m| m.as_str())
}

fn check_refs(job: &Job, index: &HashMap<&str, &Job>) -> EngineResult<()> {
    let groups: [(&str, &[String]); 4] = [
        ("depends_on", &job.depends_on),
        ("on_success", &job.on_success),
        ("on_failure", &job.on_failure),
        ("on_finish", &job.on_finish),
    ];
    for (field, ids) in groups {
        for id in ids {
            if !index.contains_key(id.as_str()) {
                return Err(EngineError::job_validation(format!(
                    "job '{}' references unknown job '{id}' in {field}",
                    job.id
                )));
            }
        }
    }
    Ok(())
}

fn check_depends_on_cycles(jobs: &[Job], index: &HashMap<&str, &Job>) -> EngineResult<()> {
    let mut visited: HashSet<&str> = HashSet::new();

    for job in jobs {
        if !visited.contains(job.id.as_str()) {
            let mut path: HashSet<&str> = HashSet::new();
            visit_dep(job.id.as_str(), index, &mut visited, &mut path)?;
        }
    }
    Ok(())
}

fn visit_dep<'a>(
    id: &'a str,
    index: &HashMap<&'a str, &'a Job>,
    visited: &mut HashSet<&'a str>,
    path: &mut HashSet<&'a str>,
) -> EngineResult<()> {
    if path.contains(id) {
        return Err(EngineError::job_validation(format!(
            "cycle detected in depends_on graph at job '{id}'"
        )));
    }
    if visited.contains(id) {
        return Ok(());
    }
    path.insert(id);
    if let Some(job) = index.get(id) {
        for dep in &job.depends_on {
            visit_dep(dep.as_str(), index, visited, path)?;
        }
    }
    path.remove(id);
    visited.insert(id);
    Ok(())
}

#[derive(Debug, Clone, Copy)]
enum TransitionField {
    OnSuccess,
    OnFailure,
    OnFinish,
}

impl TransitionField {
    fn targets<'a>(self, job: &'a Job) -> &'a [String] {
        match self {
            TransitionField::OnSuccess => &job.on_success,
            TransitionField::OnFailure => &job.on_failure,
            TransitionField::OnFinish => &job.on_finish,
        }
    }

    fn label(self) -> &'static str {
        match self {
            TransitionField::OnSuccess => "on_success",
            TransitionField::OnFailure => "on_failure",
            TransitionField::OnFinish => "on_finish",
        }
    }
}

fn check_transition_cycles(
    jobs: &[Job],
    index: &HashMap<&str, &Job>,
    field: TransitionField,
) -> EngineResult<()> {
    for job in jobs {
        let mut path: HashSet<&str> = HashSet::new();
        visit_transition(job.id.as_str(), index, &mut path, field)?;
    }
    Ok(())
}

fn visit_transition<'a>(
    id: &'a str,
    index: &HashMap<&'a str, &'a Job>,
    path: &mut HashSet<&'a str>,
    field: TransitionField,
) -> EngineResult<()> {
    if path.contains(id) {
        return Err(EngineError::job_validation(format!(
            "cycle detected in {} graph at job '{id}'",
            field.label()
        )));
    }
    path.insert(id);
    if let Some(job) = index.get(id) {
        for next in field.targets(job) {
            visit_transition(next.as_str(), index, path, field)?;
        }
    }
    path.remove(id);
    Ok(())
}

fn validate_hooks(doc: &Document) -> EngineResult<()> {
    let job_ids: HashSet<&str> = doc.jobs.iter().map(|j| j.id.as_str()).collect();
    let mut seen_types: HashSet<HookType> = HashSet::new();

    for hook in &doc.hooks {
        if !seen_types.insert(hook.hook_type) {
            return Err(EngineError::hook_validation(format!(
                "duplicate hook declared for type {:?}",
                hook.hook_type
            )));
        }

        if hook.jobs.is_empty() {
            return Err(EngineError::hook_validation(format!(
                "hook {:?} declares no jobs",
                hook.hook_type
            )));
        }

        let mut seen_jobs = HashSet::new();
        for job_id in &hook.jobs {
            if !job_ids.contains(job_id.as_str()) {
                return Err(EngineError::hook_validation(format!(
                    "hook {:?} references unknown job '{job_id}'",
                    hook.hook_type
                )));
            }
            if !seen_jobs.insert(job_id.as_str()) {
                return Err(EngineError::hook_validation(format!(
                    "hook {:?} lists job '{job_id}' more than once",
                    hook.hook_type
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use taskcraft_core::{Hook, JobContainer, JobResult, JobRetry, PluginError, PluginOutput};

    struct Echo;

    #[async_trait]
    impl taskcraft_core::Plugin for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        async fn run(&self, _params: &BTreeMap<String, serde_json::Value>) -> Result<PluginOutput, PluginError> {
            Ok(PluginOutput::text(""))
        }
    }

    fn registry() -> PluginRegistry {
        let mut registry = PluginRegistry::new();
        registry.register(Arc::new(Echo));
        registry
    }

    fn job(id: &str) -> Job {
        Job {
            id: id.into(),
            name: String::new(),
            plugin: Some("echo".into()),
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
            result: std::sync::Arc::new(parking_lot::Mutex::new(JobResult::default())),
        }
    }

    #[test]
    fn rejects_duplicate_job_ids() {
        let doc = Document {
            jobs: vec![job("a"), job("a")],
            hooks: vec![],
        };
        assert!(validate_document(&doc, &registry()).is_err());
    }

    #[test]
    fn rejects_dangling_depends_on() {
        let mut b = job("b");
        b.depends_on = vec!["missing".into()];
        let doc = Document {
            jobs: vec![job("a"), b],
            hooks: vec![],
        };
        assert!(validate_document(&doc, &registry()).is_err());
    }

    #[test]
    fn rejects_depends_on_cycle() {
        let mut a = job("a");
        a.depends_on = vec!["b".into()];
        let mut b = job("b");
        b.depends_on = vec!["a".into()];
        let doc = Document {
            jobs: vec![a, b],
            hooks: vec![],
        };
        assert!(validate_document(&doc, &registry()).is_err());
    }

    #[test]
    fn accepts_valid_linear_chain() {
        let mut b = job("b");
        b.depends_on = vec!["a".into()];
        let doc = Document {
            jobs: vec![job("a"), b],
            hooks: vec![],
        };
        assert!(validate_document(&doc, &registry()).is_ok());
    }

    #[test]
    fn rejects_hook_referencing_unknown_job() {
        let doc = Document {
            jobs: vec![job("a")],
            hooks: vec![Hook {
                hook_type: HookType::AfterAll,
                jobs: vec!["missing".into()],
            }],
        };
        assert!(validate_document(&doc, &registry()).is_err());
    }
}
