//! Acquirers shipped with the engine.

pub mod static_files;

use crate::registry::PluginRegistry;

pub(crate) fn register(registry: &mut PluginRegistry) {
    registry.register_acquirer(static_files::KIND, || Box::new(static_files::StaticAcquirer));
}
