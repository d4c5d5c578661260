//! Telegram API wire types (the subset Warden consumes).

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    pub date: i64,
    pub text: Option<String>,
    pub caption: Option<String>,
    pub reply_to_message: Option<Box<Message>>,
    #[serde(default)]
    pub new_chat_members: Vec<User>,
}

impl Message {
    /// Message text or media caption, whichever is present.
    pub fn text_or_caption(&self) -> Option<&str> {
        self.text.as_deref().or(self.caption.as_deref())
    }

    /// Whether this is a membership-join service message.
    pub fn is_member_join(&self) -> bool {
        !self.new_chat_members.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

impl User {
    /// Best available display name for welcome templates.
    pub fn display_name(&self) -> &str {
        if !self.first_name.is_empty() {
            &self.first_name
        } else if let Some(username) = self.username.as_deref() {
            username
        } else {
            "member"
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
}

impl Chat {
    /// Display title with the same fallbacks the registration path uses.
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .or(self.username.as_deref())
            .or(self.first_name.as_deref())
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatMember {
    pub status: String,
    pub user: Option<User>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_deserializes_join_event() {
        let raw = r#"{
            "update_id": 10,
            "message": {
                "message_id": 5,
                "chat": {"id": -100, "type": "supergroup", "title": "Rustaceans"},
                "date": 1700000000,
                "new_chat_members": [{"id": 7, "is_bot": false, "first_name": "Ada"}]
            }
        }"#;
        let update: Update = serde_json::from_str(raw).unwrap();
        let msg = update.message.unwrap();
        assert!(msg.is_member_join());
        assert_eq!(msg.new_chat_members[0].display_name(), "Ada");
        assert_eq!(msg.chat.display_title(), "Rustaceans");
    }

    #[test]
    fn test_text_or_caption_prefers_text() {
        let raw = r#"{
            "message_id": 1,
            "chat": {"id": 1, "type": "group"},
            "date": 0,
            "caption": "cap"
        }"#;
        let msg: Message = serde_json::from_str(raw).unwrap();
        assert_eq!(msg.text_or_caption(), Some("cap"));
    }

    #[test]
    fn test_display_name_fallbacks() {
        let user: User = serde_json::from_str(r#"{"id": 1, "username": "ada_l"}"#).unwrap();
        assert_eq!(user.display_name(), "ada_l");
        let user: User = serde_json::from_str(r#"{"id": 1}"#).unwrap();
        assert_eq!(user.display_name(), "member");
    }
}
