use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use kik_core::{IncomingMediaMessage, MediaKind};
use plugin_core::factory::PluginFactory;
use plugin_core::{Plugin, PluginContext, PluginSpec, PluginTriggers, send_text};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub const DEFAULT_NOTICE: &str = "Please block/ignore this troll. This chat is currently un-moderated, go to #VrChatFurr for a moderated chat.";

#[derive(Debug)]
pub struct ModerationPlugin;

impl PluginFactory for ModerationPlugin {
    fn register_defaults(&self, specs: &mut Vec<PluginSpec>) {
        if !specs.iter().any(|s| s.id == "moderation") {
            let config = serde_yaml::to_value(ModerationConfig::default()).unwrap_or_default();
            specs.push(PluginSpec {
                id: "moderation".to_owned(),
                enabled: true,
                triggers: PluginTriggers {
                    commands: vec!["send_troll_message".to_owned()],
                },
                config,
            });
        }
    }

    fn build(&self) -> Arc<dyn Plugin> {
        Arc::new(Moderation)
    }
}

/// Posts the troll notice on command, and automatically whenever a
/// deny-listed sender posts media in a group.
#[derive(Debug)]
pub struct Moderation;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModerationConfig {
    pub notice: String,
    /// Sender JIDs whose group media triggers the notice.
    pub deny_list: Vec<String>,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            notice: DEFAULT_NOTICE.to_owned(),
            deny_list: Vec::new(),
        }
    }
}

impl ModerationConfig {
    #[must_use]
    pub fn denies(&self, jid: &str) -> bool {
        self.deny_list.iter().any(|d| d.trim() == jid)
    }
}

fn parse_config(spec: &PluginSpec) -> ModerationConfig {
    if spec.config.is_null() {
        return ModerationConfig::default();
    }
    match serde_yaml::from_value::<ModerationConfig>(spec.config.clone()) {
        Ok(cfg) => cfg,
        Err(err) => {
            warn!(plugin = "moderation", error = %err, "Failed to parse moderation config, using defaults");
            ModerationConfig::default()
        }
    }
}

#[async_trait]
impl Plugin for Moderation {
    fn id(&self) -> &'static str {
        "moderation"
    }

    fn help(&self) -> &'static str {
        "send_troll_message: (groups only) post the troll notice"
    }

    fn handles_media(&self) -> bool {
        true
    }

    async fn run(&self, ctx: &PluginContext, _args: &str, spec: &PluginSpec) -> Result<()> {
        let Some(group) = ctx.group_jid.as_deref() else {
            debug!(sender = %ctx.sender_jid, "send_troll_message only works in groups");
            return Ok(());
        };
        let config = parse_config(spec);
        send_text(ctx, group, config.notice).await
    }

    async fn on_media(
        &self,
        ctx: &PluginContext,
        kind: MediaKind,
        media: &IncomingMediaMessage,
        spec: &PluginSpec,
    ) -> Result<()> {
        let Some(group) = media.group_jid.as_deref() else {
            return Ok(());
        };
        let config = parse_config(spec);
        if !config.denies(&media.from_jid) {
            return Ok(());
        }
        info!(sender = %media.from_jid, group = %group, kind = kind.as_str(), "Deny-listed sender posted media");
        send_text(ctx, group, config.notice).await
    }
}
