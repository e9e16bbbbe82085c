use std::{fs, path::Path};

use admin_directory::{LookupConfig, NonAdminCacheConfig};
use anyhow::{Context as _, Result, anyhow};
use plugin_core::PluginSpec;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct BotConfig {
    pub credentials: Credentials,
    pub admin: AdminSection,
    pub device: DeviceSection,
    #[serde(default)]
    pub lookup: LookupConfig,
    #[serde(default)]
    pub non_admin_cache: NonAdminCacheConfig,
    /// Send a keepalive ping this often once authenticated.
    #[serde(default)]
    pub keepalive_secs: Option<u64>,
    #[serde(default)]
    pub plugins: Option<Vec<PluginSpec>>,
}

#[derive(Deserialize, Clone)]
pub struct Credentials {
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// The bot's own JID; messages from it are ignored.
    #[serde(default)]
    pub user_jid: Option<String>,
}

impl core::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("user_jid", &self.user_jid)
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AdminSection {
    /// Comma-separated admin usernames.
    pub usernames: String,
}

impl AdminSection {
    #[must_use]
    pub fn usernames(&self) -> Vec<String> {
        self.usernames
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToOwned::to_owned)
            .collect()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DeviceSection {
    pub device_id: String,
    pub android_id: String,
}

pub fn load_config(path: &Path) -> Result<BotConfig> {
    if !path.exists() {
        return Err(anyhow!(
            "config file not found at {}. Create one or set --config",
            path.display()
        ));
    }
    let yaml = fs::read_to_string(path)
        .with_context(|| format!("reading config file at {}", path.display()))?;
    let cfg: BotConfig = serde_yaml::from_str(&yaml).context("parsing YAML config")?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r"
credentials:
  username: furbot
  password: hunter2
admin:
  usernames: ' alice, bob ,, carol'
device:
  device_id: 167da12427ee4dc4a36b40e8debafc25
  android_id: c10d47ba7ee17193
";

    #[test]
    fn admins_are_split_and_trimmed() {
        let cfg: BotConfig = serde_yaml::from_str(MINIMAL).unwrap();
        assert_eq!(cfg.admin.usernames(), vec!["alice", "bob", "carol"]);
    }

    #[test]
    fn optional_sections_take_defaults() {
        let cfg: BotConfig = serde_yaml::from_str(MINIMAL).unwrap();
        assert_eq!(cfg.lookup, LookupConfig::default());
        assert_eq!(cfg.lookup.timeout_secs, 30);
        assert_eq!(cfg.non_admin_cache, NonAdminCacheConfig::default());
        assert_eq!(cfg.keepalive_secs, None);
        assert!(cfg.plugins.is_none());
        assert_eq!(cfg.credentials.user_jid, None);
    }

    #[test]
    fn debug_output_hides_password() {
        let cfg: BotConfig = serde_yaml::from_str(MINIMAL).unwrap();
        let out = format!("{cfg:?}");
        assert!(!out.contains("hunter2"));
        assert!(out.contains("furbot"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(&dir.path().join("nope.yaml")).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, format!("{MINIMAL}keepalive_secs: 45\nlookup:\n  timeout_secs: 5\n")).unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.keepalive_secs, Some(45));
        assert_eq!(cfg.lookup.timeout_secs, 5);
        assert_eq!(cfg.device.android_id, "c10d47ba7ee17193");
    }
}
