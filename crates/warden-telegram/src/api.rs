//! The platform seam: what the moderation and broadcast components may ask of
//! the messaging platform.

use async_trait::async_trait;
use std::path::PathBuf;

use warden_core::error::Result;

/// Media payload for a send call: a remote URL the platform fetches itself, or
/// a local file uploaded with the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaUpload {
    Url(String),
    File(PathBuf),
}

/// One inline URL button. Warden only ever attaches a single-button row.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct InlineButton {
    pub text: String,
    pub url: String,
}

/// Platform calls the core depends on. Implemented by `TelegramClient`; tests
/// substitute a recording fake.
///
/// Send methods return the platform message id so callers can schedule a
/// delayed delete.
#[async_trait]
pub trait BotApi: Send + Sync {
    async fn send_text(&self, chat_id: i64, text: &str, buttons: &[InlineButton]) -> Result<i64>;

    async fn send_photo(
        &self,
        chat_id: i64,
        media: &MediaUpload,
        caption: &str,
        buttons: &[InlineButton],
    ) -> Result<i64>;

    async fn send_video(
        &self,
        chat_id: i64,
        media: &MediaUpload,
        caption: &str,
        buttons: &[InlineButton],
    ) -> Result<i64>;

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<()>;

    /// Restrict (or restore) a member's ability to send messages until
    /// `until_secs` (unix seconds; 0 = forever / lift per platform rules).
    async fn restrict_member(
        &self,
        chat_id: i64,
        user_id: i64,
        can_send: bool,
        until_secs: i64,
    ) -> Result<()>;

    /// Member status in the chat ("creator", "administrator", "member", ...).
    async fn member_status(&self, chat_id: i64, user_id: i64) -> Result<String>;
}
