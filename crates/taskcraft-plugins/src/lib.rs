//! Built-in plugins shipped with the engine: `echo`, `binary`, `http_fetch`,
//! and `exit`.

pub mod binary;
pub mod echo;
pub mod exit;
pub mod http_fetch;

pub use binary::BinaryPlugin;
pub use echo::EchoPlugin;
pub use exit::ExitPlugin;
pub use http_fetch::HttpFetchPlugin;

use std::sync::Arc;

use taskcraft_core::Plugin;
use taskcraft_framework::PluginRegistry;

/// Registers every built-in plugin into `registry`.
pub fn register_builtins(registry: &mut PluginRegistry) {
    registry.register(Arc::new(EchoPlugin) as Arc<dyn Plugin>);
    registry.register(Arc::new(BinaryPlugin) as Arc<dyn Plugin>);
    registry.register(Arc::new(HttpFetchPlugin::default()) as Arc<dyn Plugin>);
    registry.register(Arc::new(ExitPlugin) as Arc<dyn Plugin>);
}
