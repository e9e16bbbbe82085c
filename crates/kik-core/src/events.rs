use serde::{Deserialize, Serialize};

/// A text message received in a one-to-one chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingChatMessage {
    pub from_jid: String,
    #[serde(default)]
    pub body: String,
}

/// A text message received in a group. Media in groups arrives as
/// [`IncomingMediaMessage`] instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingGroupChatMessage {
    pub from_jid: String,
    pub group_jid: String,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
    Gif,
}

impl MediaKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Gif => "gif",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingMediaMessage {
    pub from_jid: String,
    #[serde(default)]
    pub group_jid: Option<String>,
}

/// Profile information for one peer.
///
/// `pic` is the profile picture identifier, which the bot uses as an identity
/// fingerprint. It is absent for peers without a picture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerUser {
    pub jid: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub pic: Option<String>,
}

impl PeerUser {
    /// The fingerprint, if the peer has a non-empty one.
    #[must_use]
    pub fn fingerprint(&self) -> Option<&str> {
        self.pic.as_deref().map(str::trim).filter(|p| !p.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeersInfoResponse {
    #[serde(default)]
    pub users: Vec<PeerUser>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginError {
    pub message: String,
    #[serde(default)]
    pub captcha_url: Option<String>,
}

impl LoginError {
    /// The challenge a human must solve before login can continue.
    #[must_use]
    pub fn captcha(&self) -> Option<CaptchaChallenge> {
        self.captcha_url
            .as_ref()
            .map(|url| CaptchaChallenge { url: url.clone() })
    }
}

/// A captcha challenge raised during login. Solving it happens outside the
/// bot; the solved token is fed back through [`crate::KikClient::login`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptchaChallenge {
    pub url: String,
}

/// Everything the protocol client can deliver to the bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ClientEvent {
    Authenticated,
    LoginError(LoginError),
    ChatMessage(IncomingChatMessage),
    GroupMessage(IncomingGroupChatMessage),
    PeerInfo(PeersInfoResponse),
    Image(IncomingMediaMessage),
    Video(IncomingMediaMessage),
    Gif(IncomingMediaMessage),
}
