//! On-disk cache of per-attempt job output, keyed by job id and attempt
//! number: one file per output (or per output key, for mapping results),
//! named `.{job_id}.{attempt}[.{key}].{stdout|stderr}` under a cache
//! directory that is swept of stale entries on startup.

use std::path::{Path, PathBuf};

use taskcraft_core::prelude::*;
use tracing::{debug, warn};

/// Which stream a cached file represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl OutputStream {
    fn suffix(self) -> &'static str {
        match self {
            OutputStream::Stdout => "stdout",
            OutputStream::Stderr => "stderr",
        }
    }
}

/// Manages the `.cache` directory of per-attempt plugin/container output.
pub struct CacheManager {
    dir: PathBuf,
}

impl CacheManager {
    /// Opens (creating if necessary) the cache directory, and removes any
    /// files left over from a previous run.
    pub fn open(dir: impl Into<PathBuf>) -> EngineResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .map_err(|e| EngineError::Container(format!("cannot create cache dir: {e}")))?;
        let manager = Self { dir };
        manager.clean();
        Ok(manager)
    }

    /// Removes every file matching the `.{job_id}.{attempt}...` naming
    /// convention, leaving any unrelated files in the directory untouched.
    fn clean(&self) {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, dir = %self.dir.display(), "failed to read cache directory for cleanup");
                return;
            }
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with('.') && (name.ends_with(".stdout") || name.ends_with(".stderr")) {
                if let Err(e) = std::fs::remove_file(entry.path()) {
                    warn!(error = %e, file = %entry.path().display(), "failed to remove stale cache file");
                } else {
                    debug!(file = %name.as_ref(), "removed stale cache file");
                }
            }
        }
    }

    /// Path for a given job/attempt/key/stream combination.
    pub fn path_for(
        &self,
        job_id: &str,
        attempt: u32,
        key: Option<&str>,
        stream: OutputStream,
    ) -> PathBuf {
        let mut name = format!(".{job_id}.{attempt}");
        if let Some(key) = key {
            name.push('.');
            name.push_str(key);
        }
        name.push('.');
        name.push_str(stream.suffix());
        self.dir.join(name)
    }

    /// Writes a single named output (or the unkeyed default, when `key` is
    /// `None`) to its stdout cache file.
    pub fn write_output(
        &self,
        job_id: &str,
        attempt: u32,
        key: Option<&str>,
        content: &str,
    ) -> EngineResult<()> {
        let path = self.path_for(job_id, attempt, key, OutputStream::Stdout);
        std::fs::write(&path, content)
            .map_err(|e| EngineError::Container(format!("failed writing {}: {e}", path.display())))
    }

    /// Writes a stderr capture for a job attempt (container/external-plugin
    /// runs only; in-process plugins have no separate error stream).
    pub fn write_stderr(&self, job_id: &str, attempt: u32, content: &str) -> EngineResult<()> {
        let path = self.path_for(job_id, attempt, None, OutputStream::Stderr);
        std::fs::write(&path, content)
            .map_err(|e| EngineError::Container(format!("failed writing {}: {e}", path.display())))
    }

    /// Reads a previously written output. Returns `Ok(None)` rather than an
    /// error when the file does not exist, so callers can fall back to an
    /// empty substitution. Falls back to the most recently written attempt
    /// for this job/key when the requested attempt's file is missing, so a
    /// dependant resolving `${result:dep}` before `dep`'s attempt counter has
    /// caught up still sees its latest completed output.
    pub fn read_output(
        &self,
        job_id: &str,
        attempt: u32,
        key: Option<&str>,
    ) -> EngineResult<Option<String>> {
        let path = self.path_for(job_id, attempt, key, OutputStream::Stdout);
        if let Some(content) = read_if_exists(&path)? {
            return Ok(Some(content));
        }
        match self.latest_attempt_path(job_id, key, OutputStream::Stdout) {
            Some(path) => read_if_exists(&path),
            None => Ok(None),
        }
    }

    /// Finds the most recently modified cache file for `job_id`/`key`/`stream`,
    /// regardless of attempt number.
    fn latest_attempt_path(&self, job_id: &str, key: Option<&str>, stream: OutputStream) -> Option<PathBuf> {
        let prefix = format!(".{job_id}.");
        let suffix = match key {
            Some(key) => format!(".{key}.{}", stream.suffix()),
            None => format!(".{}", stream.suffix()),
        };
        let entries = std::fs::read_dir(&self.dir).ok()?;
        entries
            .flatten()
            .filter_map(|entry| {
                let name = entry.file_name();
                let name = name.to_string_lossy();
                let rest = name.strip_prefix(&prefix)?.strip_suffix(&suffix)?;
                if rest.chars().all(|c| c.is_ascii_digit()) && !rest.is_empty() {
                    let modified = entry.metadata().ok()?.modified().ok()?;
                    Some((modified, entry.path()))
                } else {
                    None
                }
            })
            .max_by_key(|(modified, _)| *modified)
            .map(|(_, path)| path)
    }
}

fn read_if_exists(path: &Path) -> EngineResult<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(EngineError::Container(format!(
            "failed reading {}: {e}",
            path.display()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_roundtrip() {
        let dir = tempdir();
        let cache = CacheManager::open(&dir).unwrap();
        cache.write_output("job-a", 0, None, "hello").unwrap();
        let out = cache.read_output("job-a", 0, None).unwrap();
        assert_eq!(out.as_deref(), Some("hello"));
    }

    #[test]
    fn missing_output_is_none_not_error() {
        let dir = tempdir();
        let cache = CacheManager::open(&dir).unwrap();
        assert!(cache.read_output("nope", 0, None).unwrap().is_none());
    }

    #[test]
    fn keyed_outputs_are_separate_files() {
        let dir = tempdir();
        let cache = CacheManager::open(&dir).unwrap();
        cache.write_output("job-a", 0, Some("stdout"), "a").unwrap();
        cache.write_output("job-a", 0, Some("code"), "0").unwrap();
        assert_eq!(
            cache.read_output("job-a", 0, Some("stdout")).unwrap().as_deref(),
            Some("a")
        );
        assert_eq!(
            cache.read_output("job-a", 0, Some("code")).unwrap().as_deref(),
            Some("0")
        );
    }

    #[test]
    fn stale_files_are_swept_on_open() {
        let dir = tempdir();
        {
            let cache = CacheManager::open(&dir).unwrap();
            cache.write_output("job-a", 0, None, "stale").unwrap();
        }
        let cache = CacheManager::open(&dir).unwrap();
        assert!(cache.read_output("job-a", 0, None).unwrap().is_none());
    }

    fn tempdir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "taskcraft-cache-test-{}",
            uuid::Uuid::new_v4()
        ));
        dir
    }
}
