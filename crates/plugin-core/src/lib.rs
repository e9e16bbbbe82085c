pub mod factory;

use std::{collections::HashMap, sync::Arc};

use admin_directory::AdminDirectory;
use anyhow::Result;
use async_trait::async_trait;
use kik_core::{IncomingMediaMessage, KikClient, MediaKind};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

/// Everything a plugin may touch while handling one inbound event.
#[derive(Clone, Debug)]
pub struct PluginContext {
    pub client: Arc<dyn KikClient>,
    pub directory: Arc<AdminDirectory>,
    pub sender_jid: String,
    pub group_jid: Option<String>,
    /// Resolved admin name; `None` for passive (non-command) handling.
    pub admin: Option<String>,
}

impl PluginContext {
    /// Where a reply goes: the group if there is one, else the sender.
    #[must_use]
    pub fn reply_target(&self) -> &str {
        self.group_jid.as_deref().unwrap_or(&self.sender_jid)
    }

    #[must_use]
    pub const fn in_group(&self) -> bool {
        self.group_jid.is_some()
    }
}

#[async_trait]
pub trait Plugin: Send + Sync {
    fn id(&self) -> &'static str;
    fn help(&self) -> &'static str;
    fn handles_media(&self) -> bool {
        false
    }
    async fn run(&self, ctx: &PluginContext, args: &str, spec: &PluginSpec) -> Result<()>;

    async fn on_media(
        &self,
        _ctx: &PluginContext,
        _kind: MediaKind,
        _media: &IncomingMediaMessage,
        _spec: &PluginSpec,
    ) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct PluginTriggers {
    /// Command verbs, e.g. `send_message`.
    #[serde(default)]
    pub commands: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PluginSpec {
    pub id: String,
    #[serde(default = "enabled_true")]
    pub enabled: bool,
    #[serde(default)]
    pub triggers: PluginTriggers,
    #[serde(default)]
    pub config: serde_yaml::Value,
}

const fn enabled_true() -> bool {
    true
}

#[derive(Clone)]
pub struct PluginEntry {
    pub spec: PluginSpec,
    pub plugin: Arc<dyn Plugin>,
}

impl core::fmt::Debug for PluginEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PluginEntry")
            .field("id", &self.plugin.id())
            .field("spec", &self.spec)
            .finish()
    }
}

#[derive(Debug, Default)]
struct RegistryInner {
    by_id: HashMap<String, PluginEntry>,
    by_command: HashMap<String, String>,
}

#[derive(Clone, Debug, Default)]
pub struct PluginRegistry {
    inner: Arc<RwLock<RegistryInner>>,
}

impl PluginRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, spec: PluginSpec, plugin: Arc<dyn Plugin>) -> Option<PluginEntry> {
        let mut inner = self.inner.write().await;
        let id = spec.id.clone();
        let previous = inner.by_id.insert(
            id.clone(),
            PluginEntry {
                spec: spec.clone(),
                plugin,
            },
        );
        inner.by_command.retain(|_, existing| *existing != id);
        for cmd in &spec.triggers.commands {
            inner.by_command.insert(normalize_cmd(cmd), id.clone());
        }
        previous
    }

    pub async fn entry(&self, id: &str) -> Option<PluginEntry> {
        let inner = self.inner.read().await;
        inner.by_id.get(id).cloned()
    }

    pub async fn entry_by_command(&self, verb: &str) -> Option<PluginEntry> {
        let inner = self.inner.read().await;
        inner
            .by_command
            .get(&normalize_cmd(verb))
            .and_then(|id| inner.by_id.get(id))
            .cloned()
    }

    pub async fn entries(&self) -> Vec<(String, PluginEntry)> {
        let inner = self.inner.read().await;
        let mut entries: Vec<_> = inner
            .by_id
            .iter()
            .map(|(id, entry)| (id.clone(), entry.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    #[must_use]
    pub async fn is_enabled(&self, id: &str) -> bool {
        let inner = self.inner.read().await;
        inner.by_id.get(id).is_some_and(|entry| entry.spec.enabled)
    }
}

fn normalize_cmd(s: &str) -> String {
    s.trim().to_lowercase()
}

#[must_use]
pub fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Send a chat message to `peer_jid`.
///
/// # Errors
///
/// Returns an error if the client could not send the message.
pub async fn send_text(ctx: &PluginContext, peer_jid: &str, text: impl Into<String>) -> Result<()> {
    let text = text.into();
    info!(to = %peer_jid, body = %truncate(&text, 200), "Sending message");
    ctx.client.send_chat_message(peer_jid, &text).await
}

#[cfg(test)]
mod tests {
    use core::time::Duration;

    use admin_directory::NonAdminCache;
    use kik_core::{PendingLookups, testing::RecordingClient};

    use super::*;

    #[derive(Debug)]
    struct Noop;

    #[async_trait]
    impl Plugin for Noop {
        fn id(&self) -> &'static str {
            "noop"
        }
        fn help(&self) -> &'static str {
            ""
        }
        async fn run(&self, _ctx: &PluginContext, _args: &str, _spec: &PluginSpec) -> Result<()> {
            Ok(())
        }
    }

    fn spec(id: &str, commands: &[&str], enabled: bool) -> PluginSpec {
        PluginSpec {
            id: id.to_owned(),
            enabled,
            triggers: PluginTriggers {
                commands: commands.iter().map(|c| (*c).to_owned()).collect(),
            },
            config: serde_yaml::Value::default(),
        }
    }

    #[tokio::test]
    async fn commands_map_to_plugins_case_insensitively() {
        let registry = PluginRegistry::new();
        registry.register(spec("noop", &["Do_Thing"], true), Arc::new(Noop)).await;

        let entry = registry.entry_by_command("do_thing").await.unwrap();
        assert_eq!(entry.spec.id, "noop");
        assert!(registry.entry_by_command("other").await.is_none());
    }

    #[tokio::test]
    async fn re_registering_replaces_old_triggers() {
        let registry = PluginRegistry::new();
        registry.register(spec("noop", &["old"], true), Arc::new(Noop)).await;
        let previous = registry.register(spec("noop", &["new"], false), Arc::new(Noop)).await;

        assert!(previous.is_some());
        assert!(registry.entry_by_command("old").await.is_none());
        assert!(registry.entry_by_command("new").await.is_some());
        assert!(!registry.is_enabled("noop").await);
        assert!(!registry.is_enabled("missing").await);
    }

    #[test]
    fn spec_defaults_to_enabled() {
        let spec: PluginSpec = serde_yaml::from_str("id: relay").unwrap();
        assert!(spec.enabled);
        assert!(spec.triggers.commands.is_empty());
    }

    #[test]
    fn reply_goes_to_group_when_present() {
        let pending = Arc::new(PendingLookups::new());
        let client: Arc<dyn KikClient> = Arc::new(RecordingClient::new(Arc::clone(&pending)));
        let directory = Arc::new(AdminDirectory::new(
            Arc::clone(&client),
            pending,
            Vec::new(),
            Duration::from_secs(1),
            NonAdminCache::default(),
        ));
        let mut ctx = PluginContext {
            client,
            directory,
            sender_jid: "a@talk.kik.com".to_owned(),
            group_jid: None,
            admin: None,
        };
        assert_eq!(ctx.reply_target(), "a@talk.kik.com");
        ctx.group_jid = Some("g@groups.kik.com".to_owned());
        assert_eq!(ctx.reply_target(), "g@groups.kik.com");
    }
}
