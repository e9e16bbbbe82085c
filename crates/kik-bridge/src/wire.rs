use kik_core::ClientEvent;
use serde::Serialize;
use tracing::{debug, warn};

/// One outbound line to the bridge helper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum BridgeRequest {
    Login {
        username: String,
        password: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        captcha_result: Option<String>,
        device_id: String,
        android_id: String,
    },
    RequestInfoOfUsername {
        username: String,
    },
    RequestInfoOfUsers {
        peer_jids: Vec<String>,
    },
    SendChatMessage {
        peer_jid: String,
        message: String,
    },
    AddFriend {
        peer_jid: String,
    },
    SendPing,
}

impl BridgeRequest {
    /// Short name for logs; login lines carry the password.
    pub const fn op(&self) -> &'static str {
        match self {
            Self::Login { .. } => "login",
            Self::RequestInfoOfUsername { .. } => "request_info_of_username",
            Self::RequestInfoOfUsers { .. } => "request_info_of_users",
            Self::SendChatMessage { .. } => "send_chat_message",
            Self::AddFriend { .. } => "add_friend",
            Self::SendPing => "send_ping",
        }
    }
}

/// Parse one inbound line. Blank and malformed lines yield `None`.
pub fn parse_event(line: &str) -> Option<ClientEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str::<ClientEvent>(line) {
        Ok(ev) => Some(ev),
        Err(e) => {
            warn!(error = %e, "Failed to parse bridge event");
            debug!(line = %line, "Unparsed bridge line");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use kik_core::{IncomingGroupChatMessage, PeersInfoResponse};
    use serde_json::json;

    use super::*;

    #[test]
    fn login_omits_missing_captcha() {
        let req = BridgeRequest::Login {
            username: "bot".to_owned(),
            password: "pw".to_owned(),
            captcha_result: None,
            device_id: "dev".to_owned(),
            android_id: "and".to_owned(),
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "op": "login",
                "username": "bot",
                "password": "pw",
                "device_id": "dev",
                "android_id": "and",
            })
        );
    }

    #[test]
    fn unit_request_is_just_the_op() {
        assert_eq!(
            serde_json::to_string(&BridgeRequest::SendPing).unwrap(),
            r#"{"op":"send_ping"}"#
        );
    }

    #[test]
    fn parses_group_message_and_peer_info() {
        let ev = parse_event(
            r#"{"event":"group_message","from_jid":"a@talk.kik.com","group_jid":"1100_g@groups.kik.com","body":"hello"}"#,
        );
        assert_eq!(
            ev,
            Some(ClientEvent::GroupMessage(IncomingGroupChatMessage {
                from_jid: "a@talk.kik.com".to_owned(),
                group_jid: "1100_g@groups.kik.com".to_owned(),
                body: "hello".to_owned(),
            }))
        );

        let ev = parse_event(r#"{"event":"peer_info","users":[{"jid":"a@talk.kik.com","pic":"p1"}]}"#);
        let Some(ClientEvent::PeerInfo(PeersInfoResponse { users })) = ev else {
            panic!("expected peer info");
        };
        assert_eq!(users[0].pic.as_deref(), Some("p1"));
        assert_eq!(users[0].username, None);
    }

    #[test]
    fn garbage_and_blank_lines_are_skipped() {
        assert_eq!(parse_event("   "), None);
        assert_eq!(parse_event("not json"), None);
        assert_eq!(parse_event(r#"{"event":"unknown_thing"}"#), None);
    }
}
