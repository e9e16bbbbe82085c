use async_trait::async_trait;

use crate::events::{
    ClientEvent, IncomingChatMessage, IncomingGroupChatMessage, IncomingMediaMessage, LoginError,
    PeersInfoResponse,
};

/// Handlers invoked for events coming from the protocol client.
///
/// Every method defaults to a no-op so implementors only override what they
/// care about.
#[async_trait]
pub trait KikCallback: Send + Sync {
    async fn on_authenticated(&self) {}

    /// Called if login fails for any reason, including a captcha requirement.
    async fn on_login_error(&self, _error: LoginError) {}

    async fn on_chat_message_received(&self, _message: IncomingChatMessage) {}

    async fn on_group_message_received(&self, _message: IncomingGroupChatMessage) {}

    async fn on_peer_info_received(&self, _response: PeersInfoResponse) {}

    async fn on_image_received(&self, _media: IncomingMediaMessage) {}

    async fn on_video_received(&self, _media: IncomingMediaMessage) {}

    async fn on_gif_received(&self, _media: IncomingMediaMessage) {}
}

/// Route one event to the matching callback.
pub async fn deliver<C>(callback: &C, event: ClientEvent)
where
    C: KikCallback + ?Sized,
{
    match event {
        ClientEvent::Authenticated => callback.on_authenticated().await,
        ClientEvent::LoginError(error) => callback.on_login_error(error).await,
        ClientEvent::ChatMessage(message) => callback.on_chat_message_received(message).await,
        ClientEvent::GroupMessage(message) => callback.on_group_message_received(message).await,
        ClientEvent::PeerInfo(response) => callback.on_peer_info_received(response).await,
        ClientEvent::Image(media) => callback.on_image_received(media).await,
        ClientEvent::Video(media) => callback.on_video_received(media).await,
        ClientEvent::Gif(media) => callback.on_gif_received(media).await,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::events::PeerUser;

    #[derive(Default)]
    struct Seen(Mutex<Vec<&'static str>>);

    impl Seen {
        fn push(&self, name: &'static str) {
            self.0.lock().unwrap().push(name);
        }
    }

    #[async_trait]
    impl KikCallback for Seen {
        async fn on_authenticated(&self) {
            self.push("authenticated");
        }
        async fn on_group_message_received(&self, _message: IncomingGroupChatMessage) {
            self.push("group");
        }
        async fn on_gif_received(&self, _media: IncomingMediaMessage) {
            self.push("gif");
        }
    }

    #[tokio::test]
    async fn deliver_routes_to_matching_handler() {
        let seen = Seen::default();
        deliver(&seen, ClientEvent::Authenticated).await;
        deliver(
            &seen,
            ClientEvent::GroupMessage(IncomingGroupChatMessage {
                from_jid: "a@talk.kik.com".to_owned(),
                group_jid: "g@groups.kik.com".to_owned(),
                body: "hi".to_owned(),
            }),
        )
        .await;
        deliver(
            &seen,
            ClientEvent::Gif(IncomingMediaMessage {
                from_jid: "a@talk.kik.com".to_owned(),
                group_jid: None,
            }),
        )
        .await;
        // unhandled events fall through to the default no-op
        deliver(&seen, ClientEvent::PeerInfo(PeersInfoResponse::default())).await;

        assert_eq!(*seen.0.lock().unwrap(), vec!["authenticated", "group", "gif"]);
    }

    #[test]
    fn events_parse_from_tagged_json() {
        let ev: ClientEvent = serde_json::from_str(
            r#"{"event":"login_error","message":"captcha required","captcha_url":"https://captcha.kik.com/?id=1"}"#,
        )
        .unwrap();
        let ClientEvent::LoginError(err) = ev else {
            panic!("expected login error");
        };
        assert_eq!(
            err.captcha().map(|c| c.url).as_deref(),
            Some("https://captcha.kik.com/?id=1")
        );

        let ev: ClientEvent = serde_json::from_str(r#"{"event":"video","from_jid":"x@talk.kik.com"}"#).unwrap();
        assert!(matches!(ev, ClientEvent::Video(_)));
    }

    #[test]
    fn blank_pic_is_not_a_fingerprint() {
        let user = PeerUser {
            jid: "a@talk.kik.com".to_owned(),
            username: None,
            display_name: None,
            pic: Some("  ".to_owned()),
        };
        assert_eq!(user.fingerprint(), None);
    }
}
