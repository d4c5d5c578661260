//! The decision pipeline applied to every inbound message.
//!
//! Fixed order, short-circuiting on the first non-pass outcome:
//! banned sender → chat registration → schedule reconciliation → anti-link.
//! Membership-join events never come through here; the binary routes them
//! straight to the welcome path.

use std::sync::Arc;

use warden_core::types::{ChatKind, now_ms};
use warden_scheduler::ScheduleRegistry;
use warden_store::Store;
use warden_telegram::{BotApi, Message};

/// Outcome of the pipeline for one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationAction {
    Allow,
    DeleteSilently,
    DeleteAndWarn,
}

const LINK_WARNING: &str = "🚫 <b>Links are not allowed here.</b>";

pub struct ModerationPipeline {
    store: Arc<Store>,
    api: Arc<dyn BotApi>,
    registry: ScheduleRegistry,
}

impl ModerationPipeline {
    pub fn new(store: Arc<Store>, api: Arc<dyn BotApi>, registry: ScheduleRegistry) -> Self {
        Self { store, api, registry }
    }

    /// Evaluate one message and apply the resulting side effects. Returns the
    /// action so the caller can decide whether downstream handling (commands)
    /// may proceed.
    pub async fn handle(&self, msg: &Message) -> ModerationAction {
        let action = self.evaluate(msg, now_ms()).await;
        self.apply(msg, action).await;
        action
    }

    /// The decision, without side effects on the platform.
    pub async fn evaluate(&self, msg: &Message, now: i64) -> ModerationAction {
        let chat_id = msg.chat.id;
        let kind = ChatKind::parse(&msg.chat.kind);

        // 1. Banned senders are silenced before anything else happens.
        if let Some(user) = &msg.from {
            match self.store.is_active(chat_id, user.id, now) {
                Ok(true) => return ModerationAction::DeleteSilently,
                Ok(false) => {}
                Err(e) => tracing::warn!(chat_id, "ban check failed: {e}"),
            }
        }

        // 2. Register the chat transparently on every event.
        if let Err(e) = self.store.upsert_identity(chat_id, msg.chat.display_title(), kind) {
            tracing::warn!(chat_id, "chat registration failed: {e}");
        }

        // 3. Re-install the broadcast schedule if this process lost it.
        if let Err(e) = self.registry.ensure(chat_id).await {
            tracing::warn!(chat_id, "schedule reconciliation failed: {e}");
        }

        // 4. Anti-link, group chats only.
        if kind.is_private() {
            return ModerationAction::Allow;
        }
        let anti_link = match self.store.get(chat_id) {
            Ok(Some(cfg)) => cfg.anti_link,
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(chat_id, "config read failed: {e}");
                false
            }
        };
        if !anti_link {
            return ModerationAction::Allow;
        }
        let Some(text) = msg.text_or_caption() else {
            return ModerationAction::Allow;
        };
        if !crate::links::has_link(text) {
            return ModerationAction::Allow;
        }
        match &msg.from {
            Some(user) if is_admin(self.api.as_ref(), chat_id, user.id).await => {
                ModerationAction::Allow
            }
            _ => ModerationAction::DeleteAndWarn,
        }
    }

    /// Platform side effects for the action. All best-effort: a failed delete
    /// or warning is logged and never retried.
    async fn apply(&self, msg: &Message, action: ModerationAction) {
        let chat_id = msg.chat.id;
        match action {
            ModerationAction::Allow => {}
            ModerationAction::DeleteSilently => {
                if let Err(e) = self.api.delete_message(chat_id, msg.message_id).await {
                    tracing::warn!(chat_id, "failed to delete banned user's message: {e}");
                }
            }
            ModerationAction::DeleteAndWarn => {
                if let Err(e) = self.api.delete_message(chat_id, msg.message_id).await {
                    tracing::warn!(chat_id, "failed to delete link message: {e}");
                }
                if let Err(e) = self.api.send_text(chat_id, LINK_WARNING, &[]).await {
                    tracing::warn!(chat_id, "failed to post link warning: {e}");
                }
            }
        }
    }
}

/// Fresh administrator-status lookup. A failing lookup denies privilege, the
/// conservative fallback.
pub(crate) async fn is_admin(api: &dyn BotApi, chat_id: i64, user_id: i64) -> bool {
    match api.member_status(chat_id, user_id).await {
        Ok(status) => matches!(status.as_str(), "creator" | "administrator"),
        Err(e) => {
            tracing::debug!(chat_id, user_id, "admin lookup failed, denying privilege: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{Fixture, group_message};
    use warden_core::types::now_ms;

    #[tokio::test]
    async fn test_banned_sender_is_silenced() {
        let fx = Fixture::new();
        fx.store.set_ban(-100, 7, now_ms() + 60_000).unwrap();
        let msg = group_message(-100, 7, "hello");

        let action = fx.pipeline.handle(&msg).await;
        assert_eq!(action, ModerationAction::DeleteSilently);
        assert_eq!(fx.api.deleted(), vec![(-100, msg.message_id)]);
        // Short-circuit: no warning, and no registration either.
        assert!(fx.api.sent().is_empty());
        assert!(fx.store.get(-100).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_ban_does_not_silence() {
        let fx = Fixture::new();
        fx.store.set_ban(-100, 7, now_ms() - 1).unwrap();
        let action = fx.pipeline.handle(&group_message(-100, 7, "hello")).await;
        assert_eq!(action, ModerationAction::Allow);
    }

    #[tokio::test]
    async fn test_first_message_registers_chat_with_defaults() {
        let fx = Fixture::new();
        fx.pipeline.handle(&group_message(-100, 7, "hi all")).await;
        let cfg = fx.store.get(-100).unwrap().unwrap();
        assert_eq!(cfg.title, "Rustaceans");
        assert!(!cfg.auto_enabled);
        // Scenario A: auto disabled by default, so no timer armed.
        assert!(!fx.registry.is_armed(-100).await);
    }

    #[tokio::test]
    async fn test_link_from_member_is_deleted_and_warned() {
        let fx = Fixture::new();
        let msg = group_message(-100, 7, "check http://example.com");
        let action = fx.pipeline.handle(&msg).await;
        assert_eq!(action, ModerationAction::DeleteAndWarn);
        assert_eq!(fx.api.deleted(), vec![(-100, msg.message_id)]);
        assert_eq!(fx.api.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_link_from_admin_is_allowed() {
        let fx = Fixture::new();
        fx.api.set_status(7, "administrator");
        let action = fx.pipeline.handle(&group_message(-100, 7, "check http://example.com")).await;
        assert_eq!(action, ModerationAction::Allow);
        assert!(fx.api.deleted().is_empty());
    }

    #[tokio::test]
    async fn test_lookup_failure_is_treated_as_not_admin() {
        let fx = Fixture::new();
        fx.api.fail_lookups();
        let action = fx.pipeline.handle(&group_message(-100, 7, "t.me/spam")).await;
        assert_eq!(action, ModerationAction::DeleteAndWarn);
    }

    #[tokio::test]
    async fn test_anti_link_disabled_allows_links() {
        let fx = Fixture::new();
        fx.pipeline.handle(&group_message(-100, 7, "register me")).await;
        let mut settings = fx.store.get(-100).unwrap().unwrap().settings();
        settings.anti_link = false;
        fx.store.save(-100, &settings).unwrap();

        let action = fx.pipeline.handle(&group_message(-100, 7, "http://example.com")).await;
        assert_eq!(action, ModerationAction::Allow);
    }

    #[tokio::test]
    async fn test_private_chat_skips_anti_link() {
        let fx = Fixture::new();
        let mut msg = group_message(5, 5, "http://example.com");
        msg.chat.kind = "private".into();
        let action = fx.pipeline.handle(&msg).await;
        assert_eq!(action, ModerationAction::Allow);
    }

    #[tokio::test]
    async fn test_caption_is_checked_too() {
        let fx = Fixture::new();
        let mut msg = group_message(-100, 7, "x");
        msg.text = None;
        msg.caption = Some("grab it on bit.ly/xyz".into());
        let action = fx.pipeline.handle(&msg).await;
        assert_eq!(action, ModerationAction::DeleteAndWarn);
    }

    #[tokio::test]
    async fn test_message_arms_schedule_for_enabled_chat() {
        let fx = Fixture::new();
        fx.pipeline.handle(&group_message(-100, 7, "register me")).await;
        let mut settings = fx.store.get(-100).unwrap().unwrap().settings();
        settings.auto_enabled = true;
        settings.auto_interval_min = 30;
        fx.store.save(-100, &settings).unwrap();

        // Simulates a restart: config enabled but no in-process timer yet.
        fx.pipeline.handle(&group_message(-100, 7, "another message")).await;
        assert!(fx.registry.is_armed(-100).await);
    }
}
