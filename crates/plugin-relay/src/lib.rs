use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use plugin_core::factory::PluginFactory;
use plugin_core::{Plugin, PluginContext, PluginSpec, PluginTriggers, send_text};
use tracing::info;

#[derive(Debug)]
pub struct RelayPlugin;

impl PluginFactory for RelayPlugin {
    fn register_defaults(&self, specs: &mut Vec<PluginSpec>) {
        if !specs.iter().any(|s| s.id == "relay") {
            specs.push(PluginSpec {
                id: "relay".to_owned(),
                enabled: true,
                triggers: PluginTriggers {
                    commands: vec!["send_message".to_owned()],
                },
                config: serde_yaml::Value::default(),
            });
        }
    }

    fn build(&self) -> Arc<dyn Plugin> {
        Arc::new(Relay)
    }
}

/// Sends the command's text on behalf of the admin: into the group the
/// command came from, or back to the admin in a DM.
#[derive(Debug)]
pub struct Relay;

#[async_trait]
impl Plugin for Relay {
    fn id(&self) -> &'static str {
        "relay"
    }

    fn help(&self) -> &'static str {
        "send_message <text>: post <text> to this chat"
    }

    async fn run(&self, ctx: &PluginContext, args: &str, _spec: &PluginSpec) -> Result<()> {
        let target = ctx.reply_target();
        info!(admin = ?ctx.admin, to = %target, "Relaying message");
        // an empty body is sent as-is
        send_text(ctx, target, args.trim()).await
    }
}
