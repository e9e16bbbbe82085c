//! Admin command grammar.
//!
//! A message may name several verbs anywhere in its text; every verb present
//! becomes one [`Command`], in the fixed order of [`VERBS`].

pub const ADD_AS_FRIEND: &str = "add_as_friend";
pub const SEND_MESSAGE: &str = "send_message";
pub const SEND_TROLL_MESSAGE: &str = "send_troll_message";
pub const GET_ADMIN_INFO: &str = "get_admin_info";

pub const VERBS: [&str; 4] = [ADD_AS_FRIEND, SEND_MESSAGE, SEND_TROLL_MESSAGE, GET_ADMIN_INFO];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    AddAsFriend,
    /// Text after the first `send_message`, up to a second one if present.
    SendMessage { body: String },
    SendTrollMessage,
    GetAdminInfo,
}

impl Command {
    #[must_use]
    pub const fn verb(&self) -> &'static str {
        match self {
            Self::AddAsFriend => ADD_AS_FRIEND,
            Self::SendMessage { .. } => SEND_MESSAGE,
            Self::SendTrollMessage => SEND_TROLL_MESSAGE,
            Self::GetAdminInfo => GET_ADMIN_INFO,
        }
    }

    #[must_use]
    pub fn argument(&self) -> &str {
        match self {
            Self::SendMessage { body } => body,
            Self::AddAsFriend | Self::SendTrollMessage | Self::GetAdminInfo => "",
        }
    }
}

#[must_use]
pub fn parse_commands(text: &str) -> Vec<Command> {
    VERBS
        .iter()
        .filter(|verb| text.contains(**verb))
        .map(|verb| match *verb {
            ADD_AS_FRIEND => Command::AddAsFriend,
            SEND_MESSAGE => Command::SendMessage {
                body: text.split(SEND_MESSAGE).nth(1).unwrap_or_default().trim().to_owned(),
            },
            SEND_TROLL_MESSAGE => Command::SendTrollMessage,
            _ => Command::GetAdminInfo,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_message_takes_trimmed_remainder() {
        assert_eq!(
            parse_commands("command send_message hello group"),
            vec![Command::SendMessage { body: "hello group".to_owned() }]
        );
    }

    #[test]
    fn body_stops_at_a_second_send_message() {
        assert_eq!(
            parse_commands("send_message one send_message two"),
            vec![Command::SendMessage { body: "one".to_owned() }]
        );
    }

    #[test]
    fn bare_send_message_has_empty_body() {
        assert_eq!(
            parse_commands("command send_message   "),
            vec![Command::SendMessage { body: String::new() }]
        );
    }

    #[test]
    fn every_verb_present_is_returned_in_order() {
        let cmds = parse_commands("get_admin_info please, then add_as_friend and send_message hi");
        let verbs: Vec<_> = cmds.iter().map(Command::verb).collect();
        assert_eq!(verbs, vec![ADD_AS_FRIEND, SEND_MESSAGE, GET_ADMIN_INFO]);
        assert_eq!(cmds[1].argument(), "hi");
    }

    #[test]
    fn troll_verb_does_not_imply_send_message() {
        assert_eq!(parse_commands("command send_troll_message"), vec![Command::SendTrollMessage]);
    }

    #[test]
    fn plain_chat_has_no_commands() {
        assert!(parse_commands("hey, what's up?").is_empty());
        // verbs are matched case-sensitively
        assert!(parse_commands("SEND_MESSAGE hi").is_empty());
    }
}
