//! Per-chat timer registry.
//!
//! One cancellable task per chat with auto-broadcast enabled; the map is owned
//! here and mutated only under the cancel-before-arm discipline, so at most
//! one timer per chat exists at any instant. The persisted `next_run_at` is
//! ground truth; timer handles never survive a restart.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use warden_broadcast::BroadcastExecutor;
use warden_core::error::Result;
use warden_core::types::now_ms;
use warden_store::Store;

#[derive(Clone)]
pub struct ScheduleRegistry {
    store: Arc<Store>,
    executor: Arc<BroadcastExecutor>,
    timers: Arc<Mutex<HashMap<i64, JoinHandle<()>>>>,
}

impl ScheduleRegistry {
    pub fn new(store: Arc<Store>, executor: Arc<BroadcastExecutor>) -> Self {
        Self { store, executor, timers: Arc::new(Mutex::new(HashMap::new())) }
    }

    /// Cancel-before-arm: drop any existing timer for the chat, then arm a
    /// fresh one if the current config calls for it. Persists the new due
    /// time before the timer starts ticking.
    pub async fn rearm(&self, chat_id: i64) -> Result<()> {
        let cfg = self.store.get(chat_id)?;
        let mut timers = self.timers.lock().await;
        if let Some(handle) = timers.remove(&chat_id) {
            handle.abort();
        }
        let Some(cfg) = cfg else {
            return Ok(());
        };
        if !cfg.auto_armed() {
            tracing::debug!(chat_id, "auto broadcast unscheduled");
            return Ok(());
        }

        let delay_ms = cfg.interval_ms();
        self.store.set_next_run(chat_id, Some(now_ms() + delay_ms))?;

        let this = self.clone();
        let handle = tokio::spawn(async move { this.run_timer(chat_id, delay_ms).await });
        timers.insert(chat_id, handle);
        tracing::debug!(chat_id, interval_min = cfg.auto_interval_min, "auto broadcast armed");
        Ok(())
    }

    /// Arm the chat's timer only when none is tracked in-process. Called from
    /// the message path; an inbound message must not postpone an armed timer.
    pub async fn ensure(&self, chat_id: i64) -> Result<()> {
        if self.timers.lock().await.contains_key(&chat_id) {
            return Ok(());
        }
        self.rearm(chat_id).await
    }

    /// Whether an in-process timer exists for the chat.
    pub async fn is_armed(&self, chat_id: i64) -> bool {
        self.timers.lock().await.contains_key(&chat_id)
    }

    async fn run_timer(self, chat_id: i64, mut delay_ms: i64) {
        loop {
            tokio::time::sleep(Duration::from_millis(delay_ms.max(0) as u64)).await;
            let fired_at = now_ms();

            // Re-read the authoritative config at every fire.
            let cfg = match self.store.get(chat_id) {
                Ok(Some(cfg)) if cfg.auto_armed() => cfg,
                Ok(_) => {
                    self.timers.lock().await.remove(&chat_id);
                    tracing::debug!(chat_id, "auto broadcast timer stopped");
                    return;
                }
                Err(e) => {
                    tracing::warn!(chat_id, "schedule read failed: {e}");
                    continue;
                }
            };

            if let Err(e) = self.executor.send_auto(&cfg).await {
                tracing::warn!(chat_id, "auto broadcast failed: {e}");
            }

            // Forward progress regardless of send outcome: anchor the next due
            // time at this fire, with the freshly read interval.
            delay_ms = cfg.interval_ms();
            if let Err(e) = self.store.set_next_run(chat_id, Some(fired_at + delay_ms)) {
                tracing::warn!(chat_id, "failed to persist next due time: {e}");
            }
        }
    }
}
