use serde::{Deserialize, Serialize};

pub const MSG_INIT: &str = "init";
pub const MSG_UPDATE: &str = "update";
pub const MSG_USER_JOINED: &str = "userJoined";
pub const MSG_USER_LEFT: &str = "userLeft";

/// Event exchanged between a connection and its session.
///
/// `msg_type` stays an open string: clients may send edit-intent types the
/// server only relays. `update` is the one type that replaces the document.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(rename = "type")]
    pub msg_type: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor_pos: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Message {
    pub fn init(content: &str, user_id: &str, color: &str) -> Self {
        Self {
            msg_type: MSG_INIT.to_string(),
            content: content.to_string(),
            user_id: user_id.to_string(),
            cursor_pos: None,
            color: Some(color.to_string()),
        }
    }

    #[cfg(test)]
    pub fn update(content: &str) -> Self {
        Self {
            msg_type: MSG_UPDATE.to_string(),
            content: content.to_string(),
            user_id: String::new(),
            cursor_pos: None,
            color: None,
        }
    }

    pub fn user_joined(user_id: &str, color: &str) -> Self {
        Self {
            msg_type: MSG_USER_JOINED.to_string(),
            content: String::new(),
            user_id: user_id.to_string(),
            cursor_pos: None,
            color: Some(color.to_string()),
        }
    }

    pub fn user_left(user_id: &str) -> Self {
        Self {
            msg_type: MSG_USER_LEFT.to_string(),
            content: String::new(),
            user_id: user_id.to_string(),
            cursor_pos: None,
            color: None,
        }
    }

    pub fn is_update(&self) -> bool {
        self.msg_type == MSG_UPDATE
    }

    /// Overwrite the sender fields with the connection's own identity.
    pub fn stamp(&mut self, user_id: &str, color: &str) {
        self.user_id = user_id.to_string();
        self.color = Some(color.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_minimal_client_frame() {
        let msg: Message = serde_json::from_str(r#"{"type":"update","content":"hi"}"#).unwrap();
        assert!(msg.is_update());
        assert_eq!(msg.content, "hi");
        assert_eq!(msg.user_id, "");
        assert_eq!(msg.cursor_pos, None);
    }

    #[test]
    fn keeps_unknown_edit_types_and_cursor() {
        let msg: Message =
            serde_json::from_str(r#"{"type":"cursor","content":"","userId":"x","cursorPos":12}"#).unwrap();
        assert_eq!(msg.msg_type, "cursor");
        assert_eq!(msg.cursor_pos, Some(12));
        assert!(!msg.is_update());
    }

    #[test]
    fn rejects_frames_without_a_type() {
        assert!(serde_json::from_str::<Message>(r#"{"content":"hi"}"#).is_err());
        assert!(serde_json::from_str::<Message>("not json").is_err());
    }

    #[test]
    fn serializes_camel_case_and_skips_empty_optionals() {
        let json = serde_json::to_value(Message::user_left("alice")).unwrap();
        assert_eq!(json, serde_json::json!({"type": "userLeft", "content": "", "userId": "alice"}));

        let json = serde_json::to_value(Message::user_joined("bob", "#FF6B6B")).unwrap();
        assert_eq!(json["color"], "#FF6B6B");
        assert_eq!(json["type"], "userJoined");
    }

    #[test]
    fn stamp_overrides_claimed_identity() {
        let mut msg: Message =
            serde_json::from_str(r##"{"type":"update","content":"x","userId":"mallory","color":"#000000"}"##).unwrap();
        msg.stamp("alice", "#4ECDC4");
        assert_eq!(msg.user_id, "alice");
        assert_eq!(msg.color.as_deref(), Some("#4ECDC4"));
    }
}
