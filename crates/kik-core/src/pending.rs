use core::sync::atomic::{AtomicU64, Ordering};
use std::collections::HashMap;

use tokio::sync::{Mutex, oneshot};
use tracing::debug;

use crate::events::{PeerUser, PeersInfoResponse};

/// What a peer-info request was issued for.
///
/// Usernames are case-insensitive on Kik, so they are stored lowercased.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LookupKey {
    Jid(String),
    Username(String),
}

impl LookupKey {
    #[must_use]
    pub fn jid(jid: &str) -> Self {
        Self::Jid(jid.to_owned())
    }

    #[must_use]
    pub fn username(username: &str) -> Self {
        Self::Username(username.trim().to_lowercase())
    }

    fn matching(user: &PeerUser) -> impl Iterator<Item = Self> + '_ {
        core::iter::once(Self::jid(&user.jid))
            .chain(user.username.as_deref().map(Self::username))
    }
}

#[derive(Debug)]
struct Waiter {
    ticket: u64,
    tx: oneshot::Sender<PeerUser>,
}

/// A registered wait for one peer-info answer.
#[derive(Debug)]
pub struct Registration {
    pub key: LookupKey,
    pub ticket: u64,
    pub rx: oneshot::Receiver<PeerUser>,
}

/// In-flight peer-info requests, keyed by what was asked for.
///
/// Register before sending the request, then await the receiver. Responses
/// complete every waiter whose key matches a returned user, so concurrent
/// lookups for different peers never see each other's answers.
#[derive(Debug, Default)]
pub struct PendingLookups {
    next_ticket: AtomicU64,
    waiters: Mutex<HashMap<LookupKey, Vec<Waiter>>>,
}

impl PendingLookups {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, key: LookupKey) -> Registration {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.waiters
            .lock()
            .await
            .entry(key.clone())
            .or_default()
            .push(Waiter { ticket, tx });
        Registration { key, ticket, rx }
    }

    /// Drop a waiter that gave up (e.g. timed out before a retry).
    pub async fn cancel(&self, key: &LookupKey, ticket: u64) {
        let mut map = self.waiters.lock().await;
        if let Some(list) = map.get_mut(key) {
            list.retain(|w| w.ticket != ticket);
            if list.is_empty() {
                map.remove(key);
            }
        }
    }

    /// Resolve waiters from a peer-info response. Returns how many were woken.
    pub async fn complete(&self, response: &PeersInfoResponse) -> usize {
        let mut map = self.waiters.lock().await;
        let mut woken = 0;
        for user in &response.users {
            for key in LookupKey::matching(user) {
                let Some(list) = map.remove(&key) else {
                    continue;
                };
                for waiter in list {
                    if waiter.tx.send(user.clone()).is_ok() {
                        woken += 1;
                    }
                }
            }
        }
        if woken == 0 {
            debug!(users = response.users.len(), "Peer info matched no pending lookup");
        }
        woken
    }

    /// Number of keys with at least one waiter.
    pub async fn outstanding(&self) -> usize {
        self.waiters.lock().await.len()
    }
}
