use std::{collections::HashMap, sync::Arc};

use plugin_core::{Plugin, PluginRegistry, PluginSpec, factory::PluginFactory};
use tracing::{info, warn};

use crate::config::BotConfig;

fn factories() -> Vec<Box<dyn PluginFactory>> {
    vec![
        Box::new(plugin_friend::FriendPlugin),
        Box::new(plugin_relay::RelayPlugin),
        Box::new(plugin_moderation::ModerationPlugin),
        Box::new(plugin_admin_info::AdminInfoPlugin),
    ]
}

pub async fn build_registry(config: &BotConfig) -> Arc<PluginRegistry> {
    let mut plugins: HashMap<&'static str, Arc<dyn Plugin>> = HashMap::new();
    let mut specs = config.plugins.clone().unwrap_or_default();

    for factory in factories() {
        let plugin = factory.build();
        let mut defaults = Vec::new();
        factory.register_defaults(&mut defaults);
        for default in defaults {
            merge_default_spec(&mut specs, default);
        }
        plugins.insert(plugin.id(), plugin);
    }

    let registry = Arc::new(PluginRegistry::new());
    for spec in specs {
        let Some(plugin) = plugins.get(spec.id.as_str()) else {
            warn!("Unknown plugin ID: {}", spec.id);
            continue;
        };
        registry.register(spec, Arc::clone(plugin)).await;
    }

    for (id, entry) in registry.entries().await {
        info!(plugin = %id, enabled = entry.spec.enabled, commands = ?entry.spec.triggers.commands, help = entry.plugin.help(), "Registered plugin");
    }
    registry
}

fn merge_default_spec(specs: &mut Vec<PluginSpec>, default: PluginSpec) {
    if let Some(existing) = specs.iter_mut().find(|s| s.id == default.id) {
        // Merge triggers: add any commands not present
        for cmd in default.triggers.commands {
            if !existing
                .triggers
                .commands
                .iter()
                .any(|c| c.eq_ignore_ascii_case(&cmd))
            {
                existing.triggers.commands.push(cmd);
            }
        }
        if existing.config.is_null() {
            existing.config = default.config;
        }
    } else {
        specs.push(default);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(plugins: &str) -> BotConfig {
        serde_yaml::from_str(&format!(
            "credentials: {{ username: bot }}\nadmin: {{ usernames: alice }}\ndevice: {{ device_id: d, android_id: a }}\n{plugins}"
        ))
        .unwrap()
    }

    #[tokio::test]
    async fn every_verb_has_a_plugin_by_default() {
        let registry = build_registry(&config("")).await;
        for verb in crate::command::VERBS {
            assert!(registry.entry_by_command(verb).await.is_some(), "{verb} unmapped");
        }
    }

    #[tokio::test]
    async fn configured_spec_keeps_default_verbs_and_can_disable() {
        let registry = build_registry(&config(
            "plugins:\n  - id: relay\n    enabled: false\n  - id: moderation\n    config:\n      deny_list: [\"t@talk.kik.com\"]\n  - id: mystery\n",
        ))
        .await;

        let relay = registry.entry_by_command("send_message").await.unwrap();
        assert_eq!(relay.spec.id, "relay");
        assert!(!registry.is_enabled("relay").await);

        let moderation = registry.entry("moderation").await.unwrap();
        assert!(moderation.spec.triggers.commands.iter().any(|c| c == "send_troll_message"));
        assert!(moderation.spec.config.get("deny_list").is_some());

        assert!(registry.entry("mystery").await.is_none());
    }
}
