//! Reconciliation sweep.
//!
//! Periodic pass over durable state: purge expired bans, then fire every
//! auto-broadcast whose persisted due time has elapsed. After a restart no
//! in-process timer exists, so this pass is what brings schedules back.
//! Rescheduling anchors at the fire time, never the stale due time, so a chat
//! that was down for hours gets one catch-up broadcast, not a burst.

use std::sync::Arc;
use std::time::Duration;

use warden_broadcast::BroadcastExecutor;
use warden_core::types::now_ms;
use warden_store::Store;

pub struct ReconciliationSweep {
    store: Arc<Store>,
    executor: Arc<BroadcastExecutor>,
    period: Duration,
}

impl ReconciliationSweep {
    pub fn new(store: Arc<Store>, executor: Arc<BroadcastExecutor>, period: Duration) -> Self {
        Self { store, executor, period }
    }

    /// Run forever. The first cycle happens immediately, which is what makes
    /// restart recovery prompt.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.period);
        tracing::info!(period_secs = self.period.as_secs(), "reconciliation sweep started");
        loop {
            ticker.tick().await;
            self.cycle(now_ms()).await;
        }
    }

    /// One sweep pass. Every step is fault-isolated: a failing chat never
    /// blocks the rest.
    pub async fn cycle(&self, now: i64) {
        match self.store.purge_expired(now) {
            Ok(0) => {}
            Ok(n) => tracing::debug!(purged = n, "expired bans removed"),
            Err(e) => tracing::warn!("ban purge failed: {e}"),
        }

        let due = match self.store.due_autos(now) {
            Ok(due) => due,
            Err(e) => {
                tracing::warn!("due-auto query failed: {e}");
                return;
            }
        };

        for cfg in due {
            let fired_at = now_ms();
            if let Err(e) = self.executor.send_auto(&cfg).await {
                tracing::warn!(chat_id = cfg.chat_id, "sweep broadcast failed: {e}");
            }
            if let Err(e) =
                self.store.set_next_run(cfg.chat_id, Some(fired_at + cfg.interval_ms()))
            {
                tracing::warn!(chat_id = cfg.chat_id, "failed to persist next due time: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{CountingApi, enable_auto};
    use std::path::PathBuf;
    use warden_core::types::ChatKind;

    fn sweep_fixture() -> (Arc<Store>, Arc<CountingApi>, ReconciliationSweep) {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let api = Arc::new(CountingApi::default());
        let executor = Arc::new(BroadcastExecutor::new(api.clone(), PathBuf::from("/tmp")));
        let sweep = ReconciliationSweep::new(store.clone(), executor, Duration::from_secs(60));
        (store, api, sweep)
    }

    #[tokio::test]
    async fn test_past_due_chat_fires_once_and_reschedules_forward() {
        let (store, api, sweep) = sweep_fixture();
        store.upsert_identity(1, "t", ChatKind::Group).unwrap();
        enable_auto(&store, 1, 10);
        // Restart scenario: due time ten minutes in the past.
        let now = now_ms();
        store.set_next_run(1, Some(now - 600_000)).unwrap();

        sweep.cycle(now).await;
        assert_eq!(api.sends(), 1);

        // Rescheduled from the fire time, not the stale due time.
        let next = store.get(1).unwrap().unwrap().next_run_at.unwrap();
        assert!(next >= now + 600_000);

        // Immediately running again produces no second fire.
        sweep.cycle(now_ms()).await;
        assert_eq!(api.sends(), 1);
    }

    #[tokio::test]
    async fn test_never_scheduled_chat_fires() {
        let (store, api, sweep) = sweep_fixture();
        store.upsert_identity(1, "t", ChatKind::Group).unwrap();
        enable_auto(&store, 1, 10);
        assert_eq!(store.get(1).unwrap().unwrap().next_run_at, None);

        sweep.cycle(now_ms()).await;
        assert_eq!(api.sends(), 1);
        assert!(store.get(1).unwrap().unwrap().next_run_at.is_some());
    }

    #[tokio::test]
    async fn test_failed_send_still_advances_due_time() {
        let (store, api, sweep) = sweep_fixture();
        api.set_failing(true);
        store.upsert_identity(1, "t", ChatKind::Group).unwrap();
        enable_auto(&store, 1, 10);
        let now = now_ms();
        store.set_next_run(1, Some(now - 1)).unwrap();

        sweep.cycle(now).await;
        assert_eq!(api.sends(), 1);
        assert!(store.get(1).unwrap().unwrap().next_run_at.unwrap() > now);
    }

    #[tokio::test]
    async fn test_one_failing_chat_does_not_block_others() {
        let (store, api, sweep) = sweep_fixture();
        for id in [1, 2] {
            store.upsert_identity(id, "t", ChatKind::Group).unwrap();
            enable_auto(&store, id, 10);
        }
        api.set_failing(true);

        sweep.cycle(now_ms()).await;
        assert_eq!(api.sends(), 2);
    }

    #[tokio::test]
    async fn test_cycle_purges_expired_bans() {
        let (store, _api, sweep) = sweep_fixture();
        store.set_ban(1, 9, 1_000).unwrap();
        store.set_ban(1, 10, i64::MAX).unwrap();

        sweep.cycle(now_ms()).await;
        assert!(store.get_ban(1, 9).unwrap().is_none());
        assert!(store.get_ban(1, 10).unwrap().is_some());
    }
}
