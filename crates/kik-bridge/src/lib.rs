//! [`KikClient`] backed by a helper process that owns the protocol session.
//!
//! The helper reads one JSON request per line on stdin and writes one JSON
//! event per line on stdout. Its stderr is forwarded to the log.

mod wire;

pub use wire::BridgeRequest;

use std::{process::Stdio, sync::Arc};

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use kik_core::{ClientEvent, KikClient};
use tokio::{
    io::{AsyncBufReadExt as _, AsyncWriteExt as _, BufReader},
    process::{Child, Command},
    sync::{Mutex, mpsc},
};
use tracing::{debug, error, info};

const CHANNEL_CAPACITY: usize = 64;

/// Device identifiers presented at login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub device_id: String,
    pub android_id: String,
}

#[derive(Debug)]
pub struct BridgeClient {
    name: String,
    process: Mutex<Option<Child>>,
    tx: mpsc::Sender<BridgeRequest>,
    device: DeviceIdentity,
}

impl BridgeClient {
    /// Start the helper and return the client plus the stream of inbound
    /// events. The stream ends when the helper closes its stdout.
    pub fn spawn(
        cmd: &str,
        args: &[String],
        device: DeviceIdentity,
    ) -> Result<(Arc<Self>, mpsc::Receiver<ClientEvent>)> {
        let mut child = Command::new(cmd)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("spawning bridge process `{cmd}`"))?;

        let stdin = child.stdin.take().context("Failed to open bridge stdin")?;
        let stdout = child.stdout.take().context("Failed to open bridge stdout")?;
        let stderr = child.stderr.take().context("Failed to open bridge stderr")?;

        let (tx, mut rx) = mpsc::channel::<BridgeRequest>(CHANNEL_CAPACITY);
        let (events_tx, events_rx) = mpsc::channel::<ClientEvent>(CHANNEL_CAPACITY);

        // Writer task
        tokio::spawn(async move {
            let mut writer = stdin;
            while let Some(req) = rx.recv().await {
                let json = match serde_json::to_string(&req) {
                    Ok(json) => json,
                    Err(e) => {
                        error!(op = req.op(), error = %e, "Failed to encode bridge request");
                        continue;
                    }
                };
                debug!(op = req.op(), "Sending to bridge");
                if let Err(e) = writer.write_all(json.as_bytes()).await {
                    error!("Failed to write to bridge stdin: {e}");
                    break;
                }
                if let Err(e) = writer.write_all(b"\n").await {
                    error!("Failed to write newline to bridge stdin: {e}");
                    break;
                }
                if let Err(e) = writer.flush().await {
                    error!("Failed to flush bridge stdin: {e}");
                    break;
                }
            }
        });

        // Stderr reader task
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                info!(target: "kik_bridge::helper", "{line}");
            }
        });

        // Reader task
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let Some(event) = wire::parse_event(&line) else {
                    continue;
                };
                if events_tx.send(event).await.is_err() {
                    break;
                }
            }
            info!("Bridge reader task ended");
        });

        let client = Arc::new(Self {
            name: format!("{} {}", cmd, args.join(" ")).trim_end().to_owned(),
            process: Mutex::new(Some(child)),
            tx,
            device,
        });
        info!(bridge = %client.name, "Bridge process started");
        Ok((client, events_rx))
    }

    async fn send(&self, req: BridgeRequest) -> Result<()> {
        let op = req.op();
        self.tx
            .send(req)
            .await
            .with_context(|| format!("bridge writer closed while sending {op}"))
    }

    /// Kill the helper process if it is still running.
    pub async fn shutdown(&self) {
        if let Some(mut child) = self.process.lock().await.take() {
            if let Err(e) = child.kill().await {
                debug!(error = %e, "Bridge process already gone");
            }
            info!(bridge = %self.name, "Bridge process stopped");
        }
    }
}

#[async_trait]
impl KikClient for BridgeClient {
    async fn login(
        &self,
        username: &str,
        password: &str,
        captcha_result: Option<&str>,
    ) -> Result<()> {
        self.send(BridgeRequest::Login {
            username: username.to_owned(),
            password: password.to_owned(),
            captcha_result: captcha_result.map(ToOwned::to_owned),
            device_id: self.device.device_id.clone(),
            android_id: self.device.android_id.clone(),
        })
        .await
    }

    async fn request_info_of_username(&self, username: &str) -> Result<()> {
        self.send(BridgeRequest::RequestInfoOfUsername {
            username: username.to_owned(),
        })
        .await
    }

    async fn request_info_of_users(&self, peer_jids: &[String]) -> Result<()> {
        self.send(BridgeRequest::RequestInfoOfUsers {
            peer_jids: peer_jids.to_vec(),
        })
        .await
    }

    async fn send_chat_message(&self, peer_jid: &str, message: &str) -> Result<()> {
        self.send(BridgeRequest::SendChatMessage {
            peer_jid: peer_jid.to_owned(),
            message: message.to_owned(),
        })
        .await
    }

    async fn add_friend(&self, peer_jid: &str) -> Result<()> {
        self.send(BridgeRequest::AddFriend {
            peer_jid: peer_jid.to_owned(),
        })
        .await
    }

    async fn send_ping(&self) -> Result<()> {
        self.send(BridgeRequest::SendPing).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device() -> DeviceIdentity {
        DeviceIdentity {
            device_id: "dev".to_owned(),
            android_id: "and".to_owned(),
        }
    }

    #[tokio::test]
    async fn events_from_helper_stdout_reach_the_stream() {
        let script = r#"echo 'noise'; echo '{"event":"authenticated"}'"#.to_owned();
        let (client, mut events) =
            BridgeClient::spawn("sh", &["-c".to_owned(), script], device()).unwrap();

        assert_eq!(events.recv().await, Some(ClientEvent::Authenticated));
        // helper exits, so the stream closes
        assert_eq!(events.recv().await, None);
        client.shutdown().await;
    }

    #[tokio::test]
    async fn requests_are_written_to_helper_stdin() {
        // the helper answers only if it sees the expected request line
        let script = r#"read line; case "$line" in '{"op":"add_friend","peer_jid":"a@talk.kik.com"}') echo '{"event":"authenticated"}';; esac"#.to_owned();
        let (client, mut events) =
            BridgeClient::spawn("sh", &["-c".to_owned(), script], device()).unwrap();

        client.add_friend("a@talk.kik.com").await.unwrap();

        assert_eq!(events.recv().await, Some(ClientEvent::Authenticated));
        client.shutdown().await;
    }

    #[tokio::test]
    async fn spawn_failure_is_reported() {
        let err = BridgeClient::spawn("/nonexistent/kik-helper", &[], device()).unwrap_err();
        assert!(format!("{err:#}").contains("spawning bridge process"));
    }
}
