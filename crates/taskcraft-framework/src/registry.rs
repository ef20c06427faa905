//! Plugin discovery and lookup: a flat name-to-implementation map, with no
//! inter-plugin service graph or dependency ordering to resolve.

use std::collections::BTreeMap;
use std::sync::Arc;

use taskcraft_core::Plugin;
use tracing::warn;

/// A flat registry of in-process plugins, keyed by name.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: BTreeMap<String, Arc<dyn Plugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a plugin under its own `name()`. A second registration
    /// under the same name replaces the first; this is logged rather than
    /// rejected.
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) {
        let name = plugin.name().to_string();
        if self.plugins.insert(name.clone(), plugin).is_some() {
            warn!(plugin = %name, "plugin registered twice, later registration wins");
        }
    }

    /// Looks up a plugin by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Plugin>> {
        self.plugins.get(name).cloned()
    }

    /// Names of every registered plugin, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.plugins.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::BTreeMap as Map;
    use taskcraft_core::{PluginError, PluginOutput};

    struct Stub(&'static str, &'static str);

    #[async_trait]
    impl Plugin for Stub {
        fn name(&self) -> &str {
            self.0
        }

        async fn run(&self, _params: &Map<String, serde_json::Value>) -> Result<PluginOutput, PluginError> {
            Ok(PluginOutput::text(self.1))
        }
    }

    #[test]
    fn later_registration_wins() {
        let mut reg = PluginRegistry::new();
        reg.register(Arc::new(Stub("echo", "first")));
        reg.register(Arc::new(Stub("echo", "second")));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn lookup_by_name() {
        let mut reg = PluginRegistry::new();
        reg.register(Arc::new(Stub("echo", "hi")));
        assert!(reg.get("echo").is_some());
        assert!(reg.get("missing").is_none());
    }
}
