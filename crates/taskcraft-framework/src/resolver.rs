//! Resolves a job's `input` token strings (`${result:...}`, `${env:...}`,
//! `${file:...}`) into concrete values merged into its `params` before
//! templating.

use std::sync::Arc;

use regex_lite::Regex;
use tracing::warn;

use crate::cache::CacheManager;

/// Matches `${result:<job_id>}`, `${result:<job_id>:<key>}`, `${env:<NAME>}`,
/// and `${file:<path>}`, accepting path-like and identifier-like operands.
fn token_pattern() -> &'static Regex {
    static PATTERN: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{(result|env|file):([a-zA-Z0-9\-_.:/\\]+)\}").expect("valid regex")
    })
}

/// Resolves `${result:...}` / `${env:...}` / `${file:...}` tokens embedded in
/// a job's declared input strings.
pub struct InputResolver {
    cache: Arc<CacheManager>,
}

impl InputResolver {
    pub fn new(cache: Arc<CacheManager>) -> Self {
        Self { cache }
    }

    /// Resolves every token in `value`, looking up attempt numbers for
    /// `result:` tokens via `attempt_of`. Unresolvable tokens are substituted
    /// with an empty string and a warning is logged.
    pub fn resolve(&self, value: &str, attempt_of: impl Fn(&str) -> Option<u32>) -> String {
        let pattern = token_pattern();
        let mut out = String::with_capacity(value.len());
        let mut last = 0;
        for m in pattern.find_iter(value) {
            out.push_str(&value[last..m.start()]);
            let caps = pattern
                .captures(&value[m.start()..m.end()])
                .expect("find_iter match implies captures match");
            let kind = &caps[1];
            let operand = &caps[2];
            let resolved = match kind {
                "result" => self.resolve_result(operand, &attempt_of),
                "env" => self.resolve_env(operand),
                "file" => self.resolve_file(operand),
                _ => None,
            };
            match resolved {
                Some(v) => out.push_str(&v),
                None => {
                    warn!(token = %&value[m.start()..m.end()], "unresolvable input token, substituting empty string");
                }
            }
            last = m.end();
        }
        out.push_str(&value[last..]);
        out
    }

    fn resolve_result(&self, operand: &str, attempt_of: &impl Fn(&str) -> Option<u32>) -> Option<String> {
        let (job_id, key) = match operand.split_once(':') {
            Some((id, key)) => (id, Some(key)),
            None => (operand, None),
        };
        let attempt = attempt_of(job_id)?;
        self.cache.read_output(job_id, attempt, key).ok().flatten()
    }

    fn resolve_env(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    fn resolve_file(&self, path: &str) -> Option<String> {
        std::fs::read_to_string(path).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> InputResolver {
        let dir = std::env::temp_dir().join(format!("taskcraft-resolver-test-{}", uuid::Uuid::new_v4()));
        InputResolver::new(Arc::new(CacheManager::open(dir).unwrap()))
    }

    #[test]
    fn resolves_env_token() {
        let r = resolver();
        unsafe { std::env::set_var("TASKCRAFT_TEST_VAR", "hello") };
        let out = r.resolve("${env:TASKCRAFT_TEST_VAR}", |_| None);
        assert_eq!(out, "hello");
        unsafe { std::env::remove_var("TASKCRAFT_TEST_VAR") };
    }

    #[test]
    fn missing_token_resolves_to_empty_string() {
        let r = resolver();
        let out = r.resolve("prefix-${env:TASKCRAFT_DOES_NOT_EXIST}-suffix", |_| None);
        assert_eq!(out, "prefix--suffix");
    }

    #[test]
    fn resolves_result_token_with_key() {
        let r = resolver();
        r.cache.write_output("job-a", 0, Some("count"), "3").unwrap();
        let out = r.resolve("${result:job-a:count}", |id| (id == "job-a").then_some(0));
        assert_eq!(out, "3");
    }
}
