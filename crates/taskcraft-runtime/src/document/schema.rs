//! The on-disk shape of a job document: a list of jobs and a mapping of
//! hook type to the job ids it triggers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use taskcraft_core::{Hook, HookType, Job};

/// Raw top-level document shape, deserialized directly from YAML before
/// being expanded into the engine's own [`Document`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawDocument {
    #[serde(default)]
    pub jobs: Vec<Job>,
    #[serde(default)]
    pub hooks: HashMap<HookType, Vec<String>>,
}

/// A loaded, not-yet-validated job document.
#[derive(Debug, Clone)]
pub struct Document {
    pub jobs: Vec<Job>,
    pub hooks: Vec<Hook>,
}

impl From<RawDocument> for Document {
    fn from(raw: RawDocument) -> Self {
        let hooks = raw
            .hooks
            .into_iter()
            .map(|(hook_type, jobs)| Hook { hook_type, jobs })
            .collect();
        Document {
            jobs: raw.jobs,
            hooks,
        }
    }
}
