//! Shared fixtures for moderation tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use warden_broadcast::BroadcastExecutor;
use warden_core::error::{Result, WardenError};
use warden_scheduler::ScheduleRegistry;
use warden_store::Store;
use warden_telegram::{BotApi, Chat, InlineButton, MediaUpload, Message, User};

use crate::ModerationPipeline;

/// Records every platform call; member statuses are configurable per user.
#[derive(Default)]
pub struct FakeApi {
    sent: Mutex<Vec<(i64, String)>>,
    deleted: Mutex<Vec<(i64, i64)>>,
    restricted: Mutex<Vec<(i64, i64, bool, i64)>>,
    statuses: Mutex<HashMap<i64, String>>,
    lookups_fail: Mutex<bool>,
}

impl FakeApi {
    pub fn sent(&self) -> Vec<(i64, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<(i64, i64)> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn restricted(&self) -> Vec<(i64, i64, bool, i64)> {
        self.restricted.lock().unwrap().clone()
    }

    pub fn set_status(&self, user_id: i64, status: &str) {
        self.statuses.lock().unwrap().insert(user_id, status.into());
    }

    pub fn fail_lookups(&self) {
        *self.lookups_fail.lock().unwrap() = true;
    }
}

#[async_trait]
impl BotApi for FakeApi {
    async fn send_text(&self, chat_id: i64, text: &str, _: &[InlineButton]) -> Result<i64> {
        self.sent.lock().unwrap().push((chat_id, text.into()));
        Ok(1)
    }

    async fn send_photo(&self, chat_id: i64, _: &MediaUpload, caption: &str, _: &[InlineButton]) -> Result<i64> {
        self.sent.lock().unwrap().push((chat_id, caption.into()));
        Ok(1)
    }

    async fn send_video(&self, chat_id: i64, _: &MediaUpload, caption: &str, _: &[InlineButton]) -> Result<i64> {
        self.sent.lock().unwrap().push((chat_id, caption.into()));
        Ok(1)
    }

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<()> {
        self.deleted.lock().unwrap().push((chat_id, message_id));
        Ok(())
    }

    async fn restrict_member(&self, chat_id: i64, user_id: i64, can_send: bool, until_secs: i64) -> Result<()> {
        self.restricted.lock().unwrap().push((chat_id, user_id, can_send, until_secs));
        Ok(())
    }

    async fn member_status(&self, _: i64, user_id: i64) -> Result<String> {
        if *self.lookups_fail.lock().unwrap() {
            return Err(WardenError::Lookup("timed out".into()));
        }
        Ok(self.statuses.lock().unwrap().get(&user_id).cloned().unwrap_or_else(|| "member".into()))
    }
}

pub struct Fixture {
    pub store: Arc<Store>,
    pub api: Arc<FakeApi>,
    pub registry: ScheduleRegistry,
    pub pipeline: ModerationPipeline,
}

impl Fixture {
    pub fn new() -> Self {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let api = Arc::new(FakeApi::default());
        let executor = Arc::new(BroadcastExecutor::new(api.clone(), PathBuf::from("/tmp")));
        let registry = ScheduleRegistry::new(store.clone(), executor);
        let pipeline = ModerationPipeline::new(store.clone(), api.clone(), registry.clone());
        Self { store, api, registry, pipeline }
    }
}

pub fn user(id: i64) -> User {
    User { id, is_bot: false, first_name: format!("user{id}"), last_name: None, username: None }
}

/// Plain text message from `user_id` in a supergroup named "Rustaceans".
pub fn group_message(chat_id: i64, user_id: i64, text: &str) -> Message {
    Message {
        message_id: 1000 + user_id,
        from: Some(user(user_id)),
        chat: Chat {
            id: chat_id,
            kind: "supergroup".into(),
            title: Some("Rustaceans".into()),
            username: None,
            first_name: None,
        },
        date: 0,
        text: Some(text.into()),
        caption: None,
        reply_to_message: None,
        new_chat_members: Vec::new(),
    }
}

/// `command` sent as a reply to a message from `target_id`.
pub fn reply_command(chat_id: i64, admin_id: i64, target_id: i64, command: &str) -> Message {
    let mut msg = group_message(chat_id, admin_id, command);
    msg.reply_to_message = Some(Box::new(group_message(chat_id, target_id, "earlier message")));
    msg
}
