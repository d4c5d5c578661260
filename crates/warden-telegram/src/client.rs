//! Bot API client over reqwest: long polling plus the send/moderation calls.

use async_trait::async_trait;
use futures::stream::Stream;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use warden_core::error::{Result, WardenError};

use crate::api::{BotApi, InlineButton, MediaUpload};
use crate::types::{ApiResponse, ChatMember, Message, Update, User};

/// Telegram Bot API client.
pub struct TelegramClient {
    token: String,
    client: reqwest::Client,
}

impl TelegramClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into(), client: reqwest::Client::new() }
    }

    fn api_url(&self, method: &str) -> String {
        format!("https://api.telegram.org/bot{}/{}", self.token, method)
    }

    async fn parse<T: DeserializeOwned>(method: &str, response: reqwest::Response) -> Result<T> {
        let body: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| WardenError::Delivery(format!("{method}: invalid response: {e}")))?;
        if !body.ok {
            return Err(WardenError::Delivery(format!(
                "{method}: {}",
                body.description.unwrap_or_default()
            )));
        }
        body.result
            .ok_or_else(|| WardenError::Delivery(format!("{method}: empty result")))
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: serde_json::Value) -> Result<T> {
        let response = self
            .client
            .post(self.api_url(method))
            .json(&body)
            .send()
            .await
            .map_err(|e| WardenError::Delivery(format!("{method} failed: {e}")))?;
        Self::parse(method, response).await
    }

    /// Long-poll for updates past `offset`.
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>> {
        let response = self
            .client
            .get(self.api_url("getUpdates"))
            .query(&[
                ("offset", offset.to_string()),
                ("timeout", "30".into()),
                ("allowed_updates", "[\"message\"]".into()),
            ])
            .send()
            .await
            .map_err(|e| WardenError::Delivery(format!("getUpdates failed: {e}")))?;
        Self::parse("getUpdates", response).await
    }

    /// Get bot info.
    pub async fn get_me(&self) -> Result<User> {
        let response = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map_err(|e| WardenError::Delivery(format!("getMe failed: {e}")))?;
        Self::parse("getMe", response).await
    }

    /// Start the polling loop; yields every update as a stream item. Poll
    /// errors back off for five seconds and the loop continues.
    pub fn start_polling(self: Arc<Self>) -> UpdateStream {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

        tokio::spawn(async move {
            let mut offset = 0i64;
            tracing::info!("telegram polling loop started");

            loop {
                match self.get_updates(offset).await {
                    Ok(updates) => {
                        for update in updates {
                            offset = offset.max(update.update_id + 1);
                            if tx.send(update).is_err() {
                                tracing::info!("telegram polling stopped (receiver dropped)");
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        tracing::error!("telegram polling error: {e}");
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        });

        UpdateStream { rx }
    }

    async fn send_media(
        &self,
        method: &str,
        field: &str,
        chat_id: i64,
        media: &MediaUpload,
        caption: &str,
        buttons: &[InlineButton],
    ) -> Result<i64> {
        match media {
            MediaUpload::Url(url) => {
                let mut body = json!({
                    "chat_id": chat_id,
                    "caption": caption,
                    "parse_mode": "HTML",
                });
                body[field] = json!(url);
                if let Some(markup) = reply_markup(buttons) {
                    body["reply_markup"] = markup;
                }
                let msg: Message = self.call(method, body).await?;
                Ok(msg.message_id)
            }
            MediaUpload::File(path) => {
                let bytes = tokio::fs::read(path).await.map_err(|e| {
                    WardenError::Delivery(format!("{method}: read {}: {e}", path.display()))
                })?;
                let file_name = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("upload")
                    .to_string();

                let mut form = reqwest::multipart::Form::new()
                    .text("chat_id", chat_id.to_string())
                    .text("caption", caption.to_string())
                    .text("parse_mode", "HTML")
                    .part(
                        field.to_string(),
                        reqwest::multipart::Part::bytes(bytes).file_name(file_name),
                    );
                if let Some(markup) = reply_markup(buttons) {
                    form = form.text("reply_markup", markup.to_string());
                }

                let response = self
                    .client
                    .post(self.api_url(method))
                    .multipart(form)
                    .send()
                    .await
                    .map_err(|e| WardenError::Delivery(format!("{method} failed: {e}")))?;
                let msg: Message = Self::parse(method, response).await?;
                Ok(msg.message_id)
            }
        }
    }
}

fn reply_markup(buttons: &[InlineButton]) -> Option<serde_json::Value> {
    if buttons.is_empty() {
        None
    } else {
        // Single row of buttons.
        Some(json!({ "inline_keyboard": [buttons] }))
    }
}

#[async_trait]
impl BotApi for TelegramClient {
    async fn send_text(&self, chat_id: i64, text: &str, buttons: &[InlineButton]) -> Result<i64> {
        let mut body = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "HTML",
        });
        if let Some(markup) = reply_markup(buttons) {
            body["reply_markup"] = markup;
        }
        let msg: Message = self.call("sendMessage", body).await?;
        Ok(msg.message_id)
    }

    async fn send_photo(
        &self,
        chat_id: i64,
        media: &MediaUpload,
        caption: &str,
        buttons: &[InlineButton],
    ) -> Result<i64> {
        self.send_media("sendPhoto", "photo", chat_id, media, caption, buttons).await
    }

    async fn send_video(
        &self,
        chat_id: i64,
        media: &MediaUpload,
        caption: &str,
        buttons: &[InlineButton],
    ) -> Result<i64> {
        self.send_media("sendVideo", "video", chat_id, media, caption, buttons).await
    }

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<()> {
        let _: bool = self
            .call("deleteMessage", json!({ "chat_id": chat_id, "message_id": message_id }))
            .await?;
        Ok(())
    }

    async fn restrict_member(
        &self,
        chat_id: i64,
        user_id: i64,
        can_send: bool,
        until_secs: i64,
    ) -> Result<()> {
        // Lifting a mute restores the full send permission set.
        let permissions = if can_send {
            json!({
                "can_send_messages": true,
                "can_send_audios": true,
                "can_send_documents": true,
                "can_send_photos": true,
                "can_send_videos": true,
                "can_send_video_notes": true,
                "can_send_voice_notes": true,
            })
        } else {
            json!({ "can_send_messages": false })
        };
        let _: bool = self
            .call(
                "restrictChatMember",
                json!({
                    "chat_id": chat_id,
                    "user_id": user_id,
                    "permissions": permissions,
                    "until_date": until_secs,
                }),
            )
            .await?;
        Ok(())
    }

    async fn member_status(&self, chat_id: i64, user_id: i64) -> Result<String> {
        let member: ChatMember = self
            .call("getChatMember", json!({ "chat_id": chat_id, "user_id": user_id }))
            .await
            .map_err(|e| WardenError::Lookup(e.to_string()))?;
        Ok(member.status)
    }
}

/// Stream of updates from the polling loop.
pub struct UpdateStream {
    rx: tokio::sync::mpsc::UnboundedReceiver<Update>,
}

impl Stream for UpdateStream {
    type Item = Update;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Unpin for UpdateStream {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_markup_single_row() {
        let buttons =
            vec![InlineButton { text: "Join".into(), url: "https://example.com".into() }];
        let markup = reply_markup(&buttons).unwrap();
        assert_eq!(markup["inline_keyboard"][0][0]["text"], "Join");
        assert_eq!(markup["inline_keyboard"][0][0]["url"], "https://example.com");
        assert!(markup["inline_keyboard"][1].is_null());
    }

    #[test]
    fn test_reply_markup_empty() {
        assert!(reply_markup(&[]).is_none());
    }

    #[test]
    fn test_api_url_shape() {
        let client = TelegramClient::new("123:abc");
        assert_eq!(client.api_url("getMe"), "https://api.telegram.org/bot123:abc/getMe");
    }
}
