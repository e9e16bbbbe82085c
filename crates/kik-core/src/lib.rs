//! Types shared between the bot and the Kik protocol client.
//!
//! The protocol itself (XMPP framing, transport, captcha, login) lives behind
//! [`KikClient`]; inbound traffic arrives as [`ClientEvent`]s and is routed to a
//! [`KikCallback`] with [`deliver`].

pub mod callback;
pub mod events;
pub mod pending;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

use core::fmt::Debug;

use anyhow::Result;
use async_trait::async_trait;

pub use callback::{KikCallback, deliver};
pub use events::{
    CaptchaChallenge, ClientEvent, IncomingChatMessage, IncomingGroupChatMessage,
    IncomingMediaMessage, LoginError, MediaKind, PeerUser, PeersInfoResponse,
};
pub use pending::{LookupKey, PendingLookups, Registration};

/// Outbound operations of the protocol client.
///
/// Requests for peer info return once the request is sent; the answer comes
/// back later as [`ClientEvent::PeerInfo`].
#[async_trait]
pub trait KikClient: Send + Sync + Debug {
    async fn login(
        &self,
        username: &str,
        password: &str,
        captcha_result: Option<&str>,
    ) -> Result<()>;

    async fn request_info_of_username(&self, username: &str) -> Result<()>;

    async fn request_info_of_users(&self, peer_jids: &[String]) -> Result<()>;

    async fn send_chat_message(&self, peer_jid: &str, message: &str) -> Result<()>;

    async fn add_friend(&self, peer_jid: &str) -> Result<()>;

    async fn send_ping(&self) -> Result<()>;
}
