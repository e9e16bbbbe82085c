mod bot;
mod captcha;
mod command;
mod config;
mod logging;
mod plugins;

use core::time::Duration;
use std::{io::IsTerminal as _, path::PathBuf, sync::Arc};

use admin_directory::{AdminDirectory, NonAdminCache};
use anyhow::{Context as _, Result, anyhow};
use clap::Parser;
use kik_bridge::{BridgeClient, DeviceIdentity};
use kik_core::{KikClient, PendingLookups};
use tracing::{info, warn};

use crate::{
    bot::{Bot, LoginParams},
    captcha::{TerminalSolver, load_captcha_result},
    config::load_config,
    logging::init_tracing,
};

#[derive(Parser, Debug)]
#[command(
    name = "kik-admin-bot",
    version,
    about = "Kik bot that runs commands sent by configured admins"
)]
struct Args {
    /// Path to the YAML config (credentials, admins, device identity, plugins)
    #[arg(long, env = "KIK_CONFIG", default_value = "./config.yaml")]
    config: PathBuf,

    /// File holding the last solved captcha token
    #[arg(
        long,
        env = "KIK_CAPTCHA_FILE",
        default_value = "./latest_captcha_result.txt"
    )]
    captcha_file: PathBuf,

    /// Program that speaks the Kik protocol over stdin/stdout JSON lines
    #[arg(long, env = "KIK_BRIDGE_CMD")]
    bridge_cmd: String,

    /// Extra argument for the bridge program (repeatable)
    #[arg(long = "bridge-arg")]
    bridge_args: Vec<String>,

    /// Overrides `credentials.username`
    #[arg(long, env = "KIK_USERNAME")]
    username: Option<String>,

    /// Overrides `credentials.password` (prompts if neither is set)
    #[arg(long, env = "KIK_PASSWORD")]
    password: Option<String>,
}

fn resolve_password(configured: String, username: &str) -> Result<String> {
    if !configured.is_empty() {
        return Ok(configured);
    }
    if !std::io::stdin().is_terminal() {
        return Err(anyhow!(
            "No password for {username}. In non-interactive mode set KIK_PASSWORD or credentials.password in the config"
        ));
    }
    warn!("No password provided via --password, KIK_PASSWORD or config. Prompting...");
    #[cfg(feature = "rpassword")]
    {
        rpassword::prompt_password("Kik password:").map_err(|e| anyhow!("Failed to read password: {e}"))
    }
    #[cfg(not(feature = "rpassword"))]
    {
        Err(anyhow!(
            "rpassword feature is not enabled. Cannot prompt for password."
        ))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env first so RUST_LOG, RUST_LOG_MODE and clap's env fallbacks see it.
    let _ = dotenvy::dotenv();
    init_tracing();
    let args = Args::parse();

    let cfg = load_config(&args.config)?;
    let username = args
        .username
        .unwrap_or_else(|| cfg.credentials.username.clone());
    let password = resolve_password(
        args.password
            .unwrap_or_else(|| cfg.credentials.password.clone()),
        &username,
    )?;

    let admins = cfg.admin.usernames();
    if admins.is_empty() {
        warn!("No admin usernames configured; every command will be ignored");
    }
    info!(?admins, config = %args.config.display(), "Loaded config");

    let captcha_result = load_captcha_result(&args.captcha_file)?;

    let (bridge, events) = BridgeClient::spawn(
        &args.bridge_cmd,
        &args.bridge_args,
        DeviceIdentity {
            device_id: cfg.device.device_id.clone(),
            android_id: cfg.device.android_id.clone(),
        },
    )
    .context("starting Kik bridge")?;
    let client: Arc<dyn KikClient> = Arc::clone(&bridge) as Arc<dyn KikClient>;

    let directory = Arc::new(AdminDirectory::new(
        Arc::clone(&client),
        Arc::new(PendingLookups::new()),
        admins,
        cfg.lookup.timeout(),
        NonAdminCache::new(cfg.non_admin_cache),
    ));
    let registry = plugins::build_registry(&cfg).await;

    let bot = Bot::new(
        client,
        directory,
        registry,
        LoginParams {
            username,
            password,
            captcha_file: args.captcha_file,
            solver: Arc::new(TerminalSolver),
        },
    )
    .with_own_jid(cfg.credentials.user_jid.clone())
    .with_keepalive(cfg.keepalive_secs.map(Duration::from_secs));

    let outcome = match bot.start(captcha_result.as_deref()).await {
        Ok(()) => bot.run(events).await,
        Err(e) => Err(e.context("sending login request")),
    };
    bridge.shutdown().await;
    outcome
}
