use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use plugin_core::factory::PluginFactory;
use plugin_core::{Plugin, PluginContext, PluginSpec, PluginTriggers};
use tracing::info;

#[derive(Debug)]
pub struct AdminInfoPlugin;

impl PluginFactory for AdminInfoPlugin {
    fn register_defaults(&self, specs: &mut Vec<PluginSpec>) {
        if !specs.iter().any(|s| s.id == "admin_info") {
            specs.push(PluginSpec {
                id: "admin_info".to_owned(),
                enabled: true,
                triggers: PluginTriggers {
                    commands: vec!["get_admin_info".to_owned()],
                },
                config: serde_yaml::Value::default(),
            });
        }
    }

    fn build(&self) -> Arc<dyn Plugin> {
        Arc::new(AdminInfo)
    }
}

/// Re-fetches every admin's fingerprint and waits for the result.
#[derive(Debug)]
pub struct AdminInfo;

#[async_trait]
impl Plugin for AdminInfo {
    fn id(&self) -> &'static str {
        "admin_info"
    }

    fn help(&self) -> &'static str {
        "get_admin_info: refresh the cached admin fingerprints"
    }

    async fn run(&self, ctx: &PluginContext, _args: &str, _spec: &PluginSpec) -> Result<()> {
        let fingerprints = ctx.directory.refresh().await?;
        let unmatched = fingerprints.iter().filter(|f| f.fingerprint.is_none()).count();
        info!(requested_by = ?ctx.admin, admins = fingerprints.len(), unmatched, "Admin info refreshed");
        Ok(())
    }
}
