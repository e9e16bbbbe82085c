use std::sync::Arc;

use crate::{Plugin, PluginSpec};

/// Registers a plugin's default spec and builds its instance.
pub trait PluginFactory {
    /// Push this plugin's default spec unless `specs` already holds one with
    /// the same id (a spec from config wins).
    fn register_defaults(&self, specs: &mut Vec<PluginSpec>);

    #[must_use]
    fn build(&self) -> Arc<dyn Plugin>;
}
