//! Admin identity resolution.
//!
//! Kik exposes no stable key for a user, so an admin is recognised by their
//! profile picture identifier (the "fingerprint"). Fingerprints are fetched
//! by username for every configured admin; inbound senders are looked up by
//! JID and compared against them.

mod non_admin_cache;

pub use non_admin_cache::{NonAdminCache, NonAdminCacheConfig};

use core::time::Duration;
use std::sync::Arc;

use anyhow::Result;
use kik_core::{KikClient, LookupKey, PeerUser, PeersInfoResponse, PendingLookups};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

const DEFAULT_LOOKUP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    /// How long to wait for a peer-info answer before asking again.
    pub timeout_secs: u64,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_LOOKUP_TIMEOUT_SECS,
        }
    }
}

impl LookupConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// One configured admin and the fingerprint last seen for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminFingerprint {
    pub admin: String,
    /// `None` when the admin has no profile picture and so cannot be matched.
    pub fingerprint: Option<String>,
}

#[derive(Debug)]
pub struct AdminDirectory {
    client: Arc<dyn KikClient>,
    pending: Arc<PendingLookups>,
    admins: Vec<String>,
    fingerprints: RwLock<Vec<AdminFingerprint>>,
    non_admins: NonAdminCache,
    lookup_timeout: Duration,
}

impl AdminDirectory {
    #[must_use]
    pub fn new(
        client: Arc<dyn KikClient>,
        pending: Arc<PendingLookups>,
        admins: Vec<String>,
        lookup_timeout: Duration,
        non_admins: NonAdminCache,
    ) -> Self {
        Self {
            client,
            pending,
            admins,
            fingerprints: RwLock::new(Vec::new()),
            non_admins,
            lookup_timeout,
        }
    }

    pub async fn fingerprints(&self) -> Vec<AdminFingerprint> {
        self.fingerprints.read().await.clone()
    }

    #[must_use]
    pub const fn non_admins(&self) -> &NonAdminCache {
        &self.non_admins
    }

    /// Feed a peer-info response to whoever is waiting for it.
    pub async fn on_peer_info(&self, response: &PeersInfoResponse) {
        let woken = self.pending.complete(response).await;
        debug!(woken, "Delivered peer info");
    }

    /// Look up a peer, asking again every time the answer takes longer than
    /// the lookup timeout. Only a failure to send the request is an error.
    pub async fn lookup(&self, key: LookupKey) -> Result<PeerUser> {
        let mut attempt: u32 = 1;
        loop {
            let registration = self.pending.register(key.clone()).await;
            let sent = match &key {
                LookupKey::Jid(jid) => {
                    self.client
                        .request_info_of_users(core::slice::from_ref(jid))
                        .await
                }
                LookupKey::Username(username) => {
                    self.client.request_info_of_username(username).await
                }
            };
            if let Err(e) = sent {
                self.pending.cancel(&key, registration.ticket).await;
                return Err(e.context(format!("requesting peer info for {key:?}")));
            }

            match tokio::time::timeout(self.lookup_timeout, registration.rx).await {
                Ok(Ok(user)) => return Ok(user),
                Ok(Err(_)) => {
                    debug!(?key, attempt, "Lookup waiter dropped, asking again");
                }
                Err(_) => {
                    self.pending.cancel(&key, registration.ticket).await;
                    warn!(?key, attempt, timeout = ?self.lookup_timeout, "Peer info lookup timed out, retrying");
                }
            }
            attempt = attempt.saturating_add(1);
        }
    }

    /// Map a sender JID to the admin it belongs to, if any.
    pub async fn resolve_admin(&self, sender_jid: &str) -> Result<Option<String>> {
        if self.non_admins.contains(sender_jid).await {
            debug!(sender = %sender_jid, "Known non-admin");
            return Ok(None);
        }

        let user = self.lookup(LookupKey::jid(sender_jid)).await?;
        if let Some(admin) = self.admin_for(user.fingerprint()).await {
            debug!(sender = %sender_jid, admin = %admin, "Resolved admin");
            return Ok(Some(admin));
        }

        self.non_admins.insert(sender_jid).await;
        debug!(sender = %sender_jid, "Cached as non-admin");
        Ok(None)
    }

    /// First configured admin whose fingerprint equals `fingerprint`.
    pub async fn admin_for(&self, fingerprint: Option<&str>) -> Option<String> {
        let fingerprint = fingerprint?;
        self.fingerprints
            .read()
            .await
            .iter()
            .find(|entry| entry.fingerprint.as_deref() == Some(fingerprint))
            .map(|entry| entry.admin.clone())
    }

    /// Fetch the fingerprint of every configured admin, in order, and
    /// replace the cached mapping.
    pub async fn refresh(&self) -> Result<Vec<AdminFingerprint>> {
        info!(admins = ?self.admins, "Getting admin info");
        let mut fresh = Vec::with_capacity(self.admins.len());
        for admin in &self.admins {
            let user = self.lookup(LookupKey::username(admin)).await?;
            let fingerprint = user.fingerprint().map(ToOwned::to_owned);
            if fingerprint.is_none() {
                warn!(admin = %admin, "Admin has no profile picture; they cannot be recognised");
            }
            fresh.push(AdminFingerprint {
                admin: admin.clone(),
                fingerprint,
            });
        }
        *self.fingerprints.write().await = fresh.clone();
        info!(fingerprints = ?fresh, "Admin fingerprints updated");
        Ok(fresh)
    }
}
