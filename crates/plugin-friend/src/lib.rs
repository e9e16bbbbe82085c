use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use plugin_core::factory::PluginFactory;
use plugin_core::{Plugin, PluginContext, PluginSpec, PluginTriggers, send_text};
use tracing::{debug, info};

pub const CONFIRMATION: &str = "Added you as a friend.";

#[derive(Debug)]
pub struct FriendPlugin;

impl PluginFactory for FriendPlugin {
    fn register_defaults(&self, specs: &mut Vec<PluginSpec>) {
        if !specs.iter().any(|s| s.id == "friend") {
            specs.push(PluginSpec {
                id: "friend".to_owned(),
                enabled: true,
                triggers: PluginTriggers {
                    commands: vec!["add_as_friend".to_owned()],
                },
                config: serde_yaml::Value::default(),
            });
        }
    }

    fn build(&self) -> Arc<dyn Plugin> {
        Arc::new(AddFriend)
    }
}

#[derive(Debug)]
pub struct AddFriend;

#[async_trait]
impl Plugin for AddFriend {
    fn id(&self) -> &'static str {
        "friend"
    }

    fn help(&self) -> &'static str {
        "add_as_friend: (DM only) add the sender to the bot's friends"
    }

    async fn run(&self, ctx: &PluginContext, _args: &str, _spec: &PluginSpec) -> Result<()> {
        if ctx.in_group() {
            debug!(sender = %ctx.sender_jid, "add_as_friend only works in DMs");
            return Ok(());
        }
        info!(peer = %ctx.sender_jid, "Adding as a friend");
        ctx.client.add_friend(&ctx.sender_jid).await?;
        send_text(ctx, &ctx.sender_jid, CONFIRMATION).await
    }
}
