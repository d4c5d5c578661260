//! Admin commands: `/ban` and `/unban`, reply-targeted mutes.

use std::sync::Arc;

use warden_core::types::now_ms;
use warden_store::Store;
use warden_telegram::{BotApi, Message};

use crate::pipeline::is_admin;

/// Seven days, the fixed mute duration.
const BAN_DURATION_MS: i64 = 7 * 24 * 60 * 60 * 1000;

pub struct CommandHandler {
    store: Arc<Store>,
    api: Arc<dyn BotApi>,
}

impl CommandHandler {
    pub fn new(store: Arc<Store>, api: Arc<dyn BotApi>) -> Self {
        Self { store, api }
    }

    /// Dispatch a recognized command. Returns false when the message is not a
    /// command, so the caller can treat it as ordinary traffic.
    pub async fn dispatch(&self, msg: &Message) -> bool {
        let Some(text) = msg.text.as_deref() else {
            return false;
        };
        let command = text.split_whitespace().next().unwrap_or("");
        // Strip the @botname suffix used in groups.
        let command = command.split('@').next().unwrap_or(command);
        match command {
            "/ban" => {
                self.ban(msg).await;
                true
            }
            "/unban" => {
                self.unban(msg).await;
                true
            }
            _ => false,
        }
    }

    async fn ban(&self, msg: &Message) {
        let Some((chat_id, admin_id)) = self.admin_context(msg).await else {
            return;
        };
        let Some(target) = reply_target(msg) else {
            self.reply(chat_id, "Reply to the user's message with /ban to mute them for 7 days.")
                .await;
            return;
        };

        let now = now_ms();
        let until_ms = now + BAN_DURATION_MS;
        if let Err(e) = self.api.restrict_member(chat_id, target, false, until_ms / 1000).await {
            tracing::warn!(chat_id, target, "restrict failed: {e}");
            self.reply(chat_id, "Could not restrict that user.").await;
            return;
        }
        if let Err(e) = self.store.set_ban(chat_id, target, until_ms) {
            tracing::warn!(chat_id, target, "failed to persist ban: {e}");
        }
        tracing::info!(chat_id, target, issued_by = admin_id, "user muted for 7 days");
        self.reply(chat_id, "✅ User muted for 7 days (not kicked).").await;
    }

    async fn unban(&self, msg: &Message) {
        let Some((chat_id, admin_id)) = self.admin_context(msg).await else {
            return;
        };
        let Some(target) = reply_target(msg) else {
            self.reply(chat_id, "Reply to the user's message with /unban to lift their mute.")
                .await;
            return;
        };

        if let Err(e) = self.api.restrict_member(chat_id, target, true, 0).await {
            tracing::warn!(chat_id, target, "unrestrict failed: {e}");
            self.reply(chat_id, "Could not lift the restriction.").await;
            return;
        }
        // Moving the expiry into the past deactivates the ban immediately;
        // the sweep deletes the row later.
        if let Err(e) = self.store.set_ban(chat_id, target, now_ms() - 1) {
            tracing::warn!(chat_id, target, "failed to persist unban: {e}");
        }
        tracing::info!(chat_id, target, issued_by = admin_id, "mute lifted");
        self.reply(chat_id, "✅ Mute lifted.").await;
    }

    /// Common command preamble: group chats only, sender must be an admin.
    /// The denial is a user-visible reply, not an error.
    async fn admin_context(&self, msg: &Message) -> Option<(i64, i64)> {
        if msg.chat.kind == "private" {
            return None;
        }
        let chat_id = msg.chat.id;
        let sender = msg.from.as_ref()?;
        if !is_admin(self.api.as_ref(), chat_id, sender.id).await {
            self.reply(chat_id, "Admins only.").await;
            return None;
        }
        Some((chat_id, sender.id))
    }

    async fn reply(&self, chat_id: i64, text: &str) {
        if let Err(e) = self.api.send_text(chat_id, text, &[]).await {
            tracing::warn!(chat_id, "reply failed: {e}");
        }
    }
}

/// The user the command replies to, if any.
fn reply_target(msg: &Message) -> Option<i64> {
    msg.reply_to_message.as_ref()?.from.as_ref().map(|u| u.id)
}
