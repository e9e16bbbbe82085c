use core::{future::Future, time::Duration};
use std::{path::PathBuf, sync::Arc};

use admin_directory::AdminDirectory;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use kik_core::{
    ClientEvent, IncomingChatMessage, IncomingGroupChatMessage, IncomingMediaMessage, KikCallback,
    KikClient, LoginError, MediaKind, PeersInfoResponse, deliver,
};
use plugin_core::{PluginContext, PluginRegistry, truncate};
use tokio::{
    sync::{Mutex, mpsc},
    task::{AbortHandle, JoinSet},
};
use tracing::{debug, error, info, warn};

use crate::{
    captcha::{CaptchaSolver, save_captcha_result},
    command::parse_commands,
};

/// Login parameters kept around for captcha continuations.
#[derive(Clone)]
pub struct LoginParams {
    pub username: String,
    pub password: String,
    pub captcha_file: PathBuf,
    pub solver: Arc<dyn CaptchaSolver>,
}

impl core::fmt::Debug for LoginParams {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LoginParams")
            .field("username", &self.username)
            .field("captcha_file", &self.captcha_file)
            .field("solver", &self.solver)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct Bot {
    client: Arc<dyn KikClient>,
    directory: Arc<AdminDirectory>,
    registry: Arc<PluginRegistry>,
    login: LoginParams,
    own_jid: Option<String>,
    keepalive: Option<Duration>,
    pinger: Arc<Mutex<Option<AbortHandle>>>,
    tasks: Arc<Mutex<JoinSet<()>>>,
}

impl Bot {
    #[must_use]
    pub fn new(
        client: Arc<dyn KikClient>,
        directory: Arc<AdminDirectory>,
        registry: Arc<PluginRegistry>,
        login: LoginParams,
    ) -> Self {
        Self {
            client,
            directory,
            registry,
            login,
            own_jid: None,
            keepalive: None,
            pinger: Arc::new(Mutex::new(None)),
            tasks: Arc::new(Mutex::new(JoinSet::new())),
        }
    }

    #[must_use]
    pub fn with_own_jid(mut self, jid: Option<String>) -> Self {
        self.own_jid = jid.filter(|j| !j.trim().is_empty());
        self
    }

    #[must_use]
    pub const fn with_keepalive(mut self, every: Option<Duration>) -> Self {
        self.keepalive = every;
        self
    }

    pub async fn start(&self, captcha_result: Option<&str>) -> Result<()> {
        info!(username = %self.login.username, captcha = captcha_result.is_some(), "Logging in");
        self.client
            .login(&self.login.username, &self.login.password, captcha_result)
            .await
    }

    /// Deliver events until the stream ends or Ctrl+C, then abort whatever
    /// is still running.
    pub async fn run(&self, mut events: mpsc::Receiver<ClientEvent>) -> Result<()> {
        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);
        let result = loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else {
                        break Err(anyhow!("event stream from client closed"));
                    };
                    deliver(self, event).await;
                    self.reap().await;
                }
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break Ok(());
                }
            }
        };
        self.cancel_all().await;
        result
    }

    async fn spawn<F>(&self, fut: F) -> AbortHandle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tasks.lock().await.spawn(fut)
    }

    async fn reap(&self) {
        let mut tasks = self.tasks.lock().await;
        while let Some(res) = tasks.try_join_next() {
            if let Err(e) = res
                && e.is_panic()
            {
                error!(error = %e, "Handler task panicked");
            }
        }
    }

    /// Abort every outstanding task and wait for them to finish.
    pub async fn cancel_all(&self) {
        let mut tasks = self.tasks.lock().await;
        if !tasks.is_empty() {
            info!(outstanding = tasks.len(), "Cancelling outstanding tasks");
        }
        tasks.shutdown().await;
    }

    fn is_self(&self, jid: &str) -> bool {
        self.own_jid.as_deref() == Some(jid)
    }

    fn context(&self, sender_jid: &str, group_jid: Option<&str>, admin: Option<String>) -> PluginContext {
        PluginContext {
            client: Arc::clone(&self.client),
            directory: Arc::clone(&self.directory),
            sender_jid: sender_jid.to_owned(),
            group_jid: group_jid.map(ToOwned::to_owned),
            admin,
        }
    }

    /// Resolve the sender and, if they are an admin, run every command in
    /// `body`. Returns how many commands ran.
    pub async fn handle_message(
        &self,
        body: &str,
        sender_jid: &str,
        group_jid: Option<&str>,
    ) -> Result<usize> {
        let Some(admin) = self.directory.resolve_admin(sender_jid).await? else {
            debug!(sender = %sender_jid, "Sender is not an admin");
            return Ok(0);
        };

        let commands = parse_commands(body);
        info!(admin = %admin, sender = %sender_jid, group = ?group_jid, commands = ?commands, "Handling admin message");

        let ctx = self.context(sender_jid, group_jid, Some(admin));
        let mut ran = 0;
        for command in &commands {
            let verb = command.verb();
            let Some(entry) = self.registry.entry_by_command(verb).await else {
                debug!(verb, "No plugin for command");
                continue;
            };
            let plugin_id = entry.spec.id.clone();
            if !self.registry.is_enabled(&plugin_id).await {
                info!(plugin = %plugin_id, verb, "Plugin disabled");
                continue;
            }
            if let Err(e) = entry.plugin.run(&ctx, command.argument(), &entry.spec).await {
                warn!(error = %e, plugin = %plugin_id, verb, "Plugin failed");
            } else {
                ran += 1;
            }
        }
        Ok(ran)
    }

    /// Give every media-handling plugin a look at an image, video or GIF.
    pub async fn handle_media(&self, kind: MediaKind, media: &IncomingMediaMessage) {
        let ctx = self.context(&media.from_jid, media.group_jid.as_deref(), None);
        for (plugin_id, entry) in self.registry.entries().await {
            if !entry.plugin.handles_media() || !self.registry.is_enabled(&plugin_id).await {
                continue;
            }
            if let Err(e) = entry.plugin.on_media(&ctx, kind, media, &entry.spec).await {
                warn!(error = %e, plugin = %plugin_id, "Plugin on_media failed");
            }
        }
    }

    async fn dispatch(&self, body: String, sender_jid: String, group_jid: Option<String>) {
        if self.is_self(&sender_jid) {
            return;
        }
        let this = self.clone();
        self.spawn(async move {
            if let Err(e) = this
                .handle_message(&body, &sender_jid, group_jid.as_deref())
                .await
            {
                warn!(error = %e, sender = %sender_jid, "Failed to handle message");
            }
        })
        .await;
    }

    async fn media(&self, kind: MediaKind, media: IncomingMediaMessage) {
        info!(kind = kind.as_str(), from = %media.from_jid, group = ?media.group_jid, "Received media");
        let this = self.clone();
        self.spawn(async move { this.handle_media(kind, &media).await })
            .await;
    }

    async fn solve_captcha(&self, error: &LoginError) {
        let Some(challenge) = error.captcha() else {
            return;
        };
        info!(url = %challenge.url, "Captcha solving required");
        let this = self.clone();
        self.spawn(async move {
            let token = match this.login.solver.solve(&challenge).await {
                Ok(Some(token)) => token,
                Ok(None) => return,
                Err(e) => {
                    warn!(error = %e, "Failed to read captcha solution");
                    return;
                }
            };
            if let Err(e) = save_captcha_result(&this.login.captcha_file, &token) {
                warn!(error = %e, "Failed to save captcha result");
            }
            if let Err(e) = this.start(Some(&token)).await {
                error!(error = %e, "Login retry failed");
            }
        })
        .await;
    }

    /// Start pinging every `every`, replacing any pinger from an earlier
    /// authentication.
    async fn start_keepalive(&self, every: Duration) {
        let mut pinger = self.pinger.lock().await;
        if let Some(previous) = pinger.take() {
            debug!("Replacing keepalive task");
            previous.abort();
        }
        let client = Arc::clone(&self.client);
        let handle = self
            .spawn(async move {
                let mut ticker = tokio::time::interval(every);
                // the first tick completes immediately
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    if let Err(e) = client.send_ping().await {
                        warn!(error = %e, "Keepalive ping failed");
                    }
                }
            })
            .await;
        *pinger = Some(handle);
    }
}

#[async_trait]
impl KikCallback for Bot {
    async fn on_authenticated(&self) {
        info!("Bot has been authenticated successfully!");
        let directory = Arc::clone(&self.directory);
        self.spawn(async move {
            match directory.refresh().await {
                Ok(fingerprints) => info!(?fingerprints, "Got admin info"),
                Err(e) => warn!(error = %e, "Failed to get admin info"),
            }
        })
        .await;
        if let Some(every) = self.keepalive {
            self.start_keepalive(every).await;
        }
    }

    async fn on_login_error(&self, error: LoginError) {
        error!(message = %error.message, "Failed to login");
        self.solve_captcha(&error).await;
    }

    async fn on_chat_message_received(&self, message: IncomingChatMessage) {
        info!(from = %message.from_jid, body = %truncate(&message.body, 200), "Received a DM");
        self.dispatch(message.body, message.from_jid, None).await;
    }

    async fn on_group_message_received(&self, message: IncomingGroupChatMessage) {
        info!(from = %message.from_jid, group = %message.group_jid, body = %truncate(&message.body, 200), "Received a group message");
        self.dispatch(message.body, message.from_jid, Some(message.group_jid))
            .await;
    }

    async fn on_peer_info_received(&self, response: PeersInfoResponse) {
        debug!(users = response.users.len(), "Received peer info");
        self.directory.on_peer_info(&response).await;
    }

    async fn on_image_received(&self, media: IncomingMediaMessage) {
        self.media(MediaKind::Image, media).await;
    }

    async fn on_video_received(&self, media: IncomingMediaMessage) {
        self.media(MediaKind::Video, media).await;
    }

    async fn on_gif_received(&self, media: IncomingMediaMessage) {
        self.media(MediaKind::Gif, media).await;
    }
}
