//! Builds the per-job template context and substitutes `${UPPERCASE_NAME}`
//! placeholders through a job's parameters.

use std::collections::BTreeMap;

use chrono::Local;
use serde_json::Value;
use taskcraft_core::Job;

/// A flat string-to-string substitution context built from a job and the
/// process environment.
pub struct TemplateContext {
    vars: BTreeMap<String, String>,
}

impl TemplateContext {
    /// Builds the context for `job`: its own fields (`job_id`, `job_name`,
    /// `job_plugin`, ...), each of its params/input under a `job_params_`/
    /// `job_input_` prefix, the current time in several formats, basic host
    /// information, and the current working directory.
    pub fn for_job(job: &Job) -> Self {
        let mut vars = BTreeMap::new();

        for (k, v) in &job.params {
            vars.insert(format!("job_params_{k}"), value_to_string(v));
        }
        for (k, v) in &job.input {
            vars.insert(format!("job_input_{k}"), v.clone());
        }

        vars.insert("job_id".into(), job.id.clone());
        vars.insert("job_name".into(), job.display_name().to_string());
        vars.insert(
            "job_plugin".into(),
            job.plugin.clone().unwrap_or_default(),
        );
        vars.insert(
            "job_schedule".into(),
            job.schedule.clone().unwrap_or_default(),
        );
        vars.insert("job_on_success".into(), job.on_success.join(","));
        vars.insert("job_on_failure".into(), job.on_failure.join(","));
        vars.insert("job_on_finish".into(), job.on_finish.join(","));
        vars.insert("job_depends_on".into(), job.depends_on.join(","));
        vars.insert("job_enabled".into(), job.enabled.to_string());
        vars.insert("job_retries".into(), job.retries.count.to_string());
        vars.insert(
            "job_timeout".into(),
            job.timeout.map(|t| t.to_string()).unwrap_or_default(),
        );

        let now = Local::now();
        vars.insert("current_time".into(), now.format("%H:%M:%S").to_string());
        vars.insert("current_date".into(), now.format("%Y-%m-%d").to_string());
        vars.insert(
            "current_datetime".into(),
            now.format("%Y-%m-%d %H:%M:%S").to_string(),
        );
        vars.insert("current_timestamp".into(), now.timestamp().to_string());

        vars.insert("os_name".into(), std::env::consts::OS.to_string());
        vars.insert("architecture".into(), std::env::consts::ARCH.to_string());
        vars.insert(
            "hostname".into(),
            hostname().unwrap_or_else(|| "unknown".into()),
        );
        vars.insert(
            "username".into(),
            std::env::var("USER")
                .or_else(|_| std::env::var("USERNAME"))
                .unwrap_or_else(|_| "unknown".into()),
        );
        vars.insert(
            "cwd".into(),
            std::env::current_dir()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        );

        Self { vars }
    }

    /// Substitutes every `${KEY}` placeholder in `input` with its uppercased
    /// context lookup, leaving unmatched placeholders untouched.
    pub fn apply(&self, input: &str) -> String {
        let mut out = input.to_string();
        for (key, value) in &self.vars {
            let placeholder = format!("${{{}}}", key.to_uppercase());
            if out.contains(&placeholder) {
                out = out.replace(&placeholder, value);
            }
        }
        out
    }

    /// Recursively applies [`Self::apply`] through a JSON value: strings are
    /// substituted, objects and arrays are walked, everything else passes
    /// through unchanged.
    pub fn apply_value(&self, value: &Value) -> Value {
        match value {
            Value::String(s) => Value::String(self.apply(s)),
            Value::Array(items) => Value::Array(items.iter().map(|v| self.apply_value(v)).collect()),
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), self.apply_value(v)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }
}

fn value_to_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn hostname() -> Option<String> {
    std::env::var("HOSTNAME").ok().or_else(|| {
        #[cfg(unix)]
        {
            std::fs::read_to_string("/etc/hostname")
                .ok()
                .map(|s| s.trim().to_string())
        }
        #[cfg(not(unix))]
        {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use taskcraft_core::{JobContainer, JobResult, JobRetry, JobStatus};

    fn job() -> Job {
        Job {
            id: "job-a".into(),
            name: "Job A".into(),
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
            result: std::sync::Arc::new(parking_lot::Mutex::new(JobResult {
                status: JobStatus::Unstarted,
                ..Default::default()
            })),
        }
    }

    #[test]
    fn substitutes_known_placeholder() {
        let ctx = TemplateContext::for_job(&job());
        assert_eq!(ctx.apply("id is ${JOB_ID}"), "id is job-a");
    }

    #[test]
    fn leaves_unknown_placeholder_untouched() {
        let ctx = TemplateContext::for_job(&job());
        assert_eq!(ctx.apply("${NOT_A_KEY}"), "${NOT_A_KEY}");
    }
}
