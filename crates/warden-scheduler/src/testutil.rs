//! Shared fixtures for scheduler tests.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use warden_broadcast::BroadcastExecutor;
use warden_core::error::{Result, WardenError};
use warden_store::Store;
use warden_telegram::{BotApi, InlineButton, MediaUpload};

use crate::ScheduleRegistry;

/// Counts sends; optionally fails them all.
#[derive(Default)]
pub struct CountingApi {
    sends: AtomicUsize,
    failing: AtomicBool,
}

impl CountingApi {
    pub fn sends(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn record(&self) -> Result<i64> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            Err(WardenError::Delivery("unreachable chat".into()))
        } else {
            Ok(1)
        }
    }
}

#[async_trait]
impl BotApi for CountingApi {
    async fn send_text(&self, _: i64, _: &str, _: &[InlineButton]) -> Result<i64> {
        self.record()
    }

    async fn send_photo(&self, _: i64, _: &MediaUpload, _: &str, _: &[InlineButton]) -> Result<i64> {
        self.record()
    }

    async fn send_video(&self, _: i64, _: &MediaUpload, _: &str, _: &[InlineButton]) -> Result<i64> {
        self.record()
    }

    async fn delete_message(&self, _: i64, _: i64) -> Result<()> {
        Ok(())
    }

    async fn restrict_member(&self, _: i64, _: i64, _: bool, _: i64) -> Result<()> {
        Ok(())
    }

    async fn member_status(&self, _: i64, _: i64) -> Result<String> {
        Ok("member".into())
    }
}

pub fn registry_fixture() -> (Arc<Store>, Arc<CountingApi>, ScheduleRegistry) {
    let store = Arc::new(Store::open_in_memory().unwrap());
    let api = Arc::new(CountingApi::default());
    let executor = Arc::new(BroadcastExecutor::new(api.clone(), PathBuf::from("/tmp")));
    let registry = ScheduleRegistry::new(store.clone(), executor);
    (store, api, registry)
}

/// Turn the chat's auto-broadcast on with the given interval.
pub fn enable_auto(store: &Store, chat_id: i64, interval_min: i64) {
    let mut settings = store.get(chat_id).unwrap().unwrap().settings();
    settings.auto_enabled = true;
    settings.auto_interval_min = interval_min;
    settings.auto_text = Some("scheduled update".into());
    store.save(chat_id, &settings).unwrap();
}
