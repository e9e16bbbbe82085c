//! An in-memory [`KikClient`] for tests.

use core::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{KikClient, PeerUser, PeersInfoResponse, PendingLookups};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Login {
        username: String,
        password: String,
        captcha_result: Option<String>,
    },
    InfoOfUsername(String),
    InfoOfUsers(Vec<String>),
    SendChatMessage {
        peer_jid: String,
        message: String,
    },
    AddFriend(String),
    Ping,
}

/// Records every call and answers peer-info requests from a fixed table by
/// completing lookups on the shared [`PendingLookups`].
#[derive(Debug)]
pub struct RecordingClient {
    pending: Arc<PendingLookups>,
    calls: Mutex<Vec<Call>>,
    peers: Mutex<Vec<PeerUser>>,
    unanswered: AtomicUsize,
}

impl RecordingClient {
    #[must_use]
    pub fn new(pending: Arc<PendingLookups>) -> Self {
        Self {
            pending,
            calls: Mutex::new(Vec::new()),
            peers: Mutex::new(Vec::new()),
            unanswered: AtomicUsize::new(0),
        }
    }

    pub async fn add_peer(&self, jid: &str, username: Option<&str>, pic: Option<&str>) {
        let mut peers = self.peers.lock().await;
        peers.retain(|p| p.jid != jid);
        peers.push(PeerUser {
            jid: jid.to_owned(),
            username: username.map(ToOwned::to_owned),
            display_name: None,
            pic: pic.map(ToOwned::to_owned),
        });
    }

    /// Silently drop the next `n` peer-info requests.
    pub fn drop_next_lookups(&self, n: usize) {
        self.unanswered.store(n, Ordering::SeqCst);
    }

    pub async fn calls(&self) -> Vec<Call> {
        self.calls.lock().await.clone()
    }

    pub async fn lookup_count(&self) -> usize {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|c| matches!(c, Call::InfoOfUsername(_) | Call::InfoOfUsers(_)))
            .count()
    }

    /// `(peer_jid, message)` pairs in send order.
    pub async fn sent_messages(&self) -> Vec<(String, String)> {
        self.calls
            .lock()
            .await
            .iter()
            .filter_map(|c| match c {
                Call::SendChatMessage { peer_jid, message } => {
                    Some((peer_jid.clone(), message.clone()))
                }
                Call::Login { .. }
                | Call::InfoOfUsername(_)
                | Call::InfoOfUsers(_)
                | Call::AddFriend(_)
                | Call::Ping => None,
            })
            .collect()
    }

    async fn record(&self, call: Call) {
        self.calls.lock().await.push(call);
    }

    fn should_drop(&self) -> bool {
        self.unanswered
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn answer(&self, users: Vec<PeerUser>) {
        if users.is_empty() || self.should_drop() {
            return;
        }
        let pending = Arc::clone(&self.pending);
        tokio::spawn(async move {
            pending.complete(&PeersInfoResponse { users }).await;
        });
    }
}

#[async_trait]
impl KikClient for RecordingClient {
    async fn login(
        &self,
        username: &str,
        password: &str,
        captcha_result: Option<&str>,
    ) -> Result<()> {
        self.record(Call::Login {
            username: username.to_owned(),
            password: password.to_owned(),
            captcha_result: captcha_result.map(ToOwned::to_owned),
        })
        .await;
        Ok(())
    }

    async fn request_info_of_username(&self, username: &str) -> Result<()> {
        self.record(Call::InfoOfUsername(username.to_owned())).await;
        let found = self
            .peers
            .lock()
            .await
            .iter()
            .filter(|p| {
                p.username
                    .as_deref()
                    .is_some_and(|u| u.eq_ignore_ascii_case(username))
            })
            .cloned()
            .collect();
        self.answer(found);
        Ok(())
    }

    async fn request_info_of_users(&self, peer_jids: &[String]) -> Result<()> {
        self.record(Call::InfoOfUsers(peer_jids.to_vec())).await;
        let peers = self.peers.lock().await;
        let found = peer_jids
            .iter()
            .map(|jid| {
                peers.iter().find(|p| &p.jid == jid).cloned().unwrap_or_else(|| PeerUser {
                    jid: jid.clone(),
                    username: None,
                    display_name: None,
                    pic: None,
                })
            })
            .collect();
        drop(peers);
        self.answer(found);
        Ok(())
    }

    async fn send_chat_message(&self, peer_jid: &str, message: &str) -> Result<()> {
        self.record(Call::SendChatMessage {
            peer_jid: peer_jid.to_owned(),
            message: message.to_owned(),
        })
        .await;
        Ok(())
    }

    async fn add_friend(&self, peer_jid: &str) -> Result<()> {
        self.record(Call::AddFriend(peer_jid.to_owned())).await;
        Ok(())
    }

    async fn send_ping(&self) -> Result<()> {
        self.record(Call::Ping).await;
        Ok(())
    }
}
