//! SQLite persistence for chat configs and bans.

use rusqlite::{Connection, Row, params};
use std::path::Path;
use std::sync::Mutex;

use warden_core::error::{Result, WardenError};
use warden_core::types::{Ban, ChatConfig, ChatKind, ChatSettings, MediaKind};

/// Chat configuration store + ban ledger on one connection.
pub struct Store {
    conn: Mutex<Connection>,
}

fn db_err(e: rusqlite::Error) -> WardenError {
    WardenError::Store(e.to_string())
}

impl Store {
    /// Open or create the database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(db_err)?;
        // WAL for better concurrent read behavior
        conn.execute_batch("PRAGMA journal_mode=WAL;").ok();
        let store = Self { conn: Mutex::new(conn) };
        store.migrate()?;
        tracing::debug!(path = %path.display(), "database opened");
        Ok(store)
    }

    /// In-memory store, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        let store = Self { conn: Mutex::new(conn) };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS chats (
                chat_id             INTEGER PRIMARY KEY,
                title               TEXT NOT NULL DEFAULT '',
                kind                TEXT NOT NULL DEFAULT 'group',
                anti_link           INTEGER NOT NULL DEFAULT 1,
                welcome_enabled     INTEGER NOT NULL DEFAULT 1,
                welcome_text        TEXT,
                welcome_media_kind  TEXT,
                welcome_media_path  TEXT,
                welcome_media_url   TEXT,
                welcome_button_text TEXT,
                welcome_button_url  TEXT,
                auto_enabled        INTEGER NOT NULL DEFAULT 0,
                auto_text           TEXT,
                auto_media_kind     TEXT,
                auto_media_path     TEXT,
                auto_media_url      TEXT,
                auto_interval_min   INTEGER NOT NULL DEFAULT 60,
                next_run_at         INTEGER
            );

            CREATE TABLE IF NOT EXISTS bans (
                chat_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                until   INTEGER NOT NULL,
                PRIMARY KEY (chat_id, user_id)
            );",
        )
        .map_err(db_err)?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| WardenError::Store(format!("lock: {e}")))
    }

    // ─── ConfigStore ──────────────────────────────────────

    /// Register a chat, touching only identity fields. Idempotent: an existing
    /// row keeps all its editable settings.
    pub fn upsert_identity(&self, chat_id: i64, title: &str, kind: ChatKind) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO chats (chat_id, title, kind) VALUES (?1, ?2, ?3)
             ON CONFLICT(chat_id) DO UPDATE SET title = excluded.title, kind = excluded.kind",
            params![chat_id, title, kind.as_str()],
        )
        .map_err(db_err)?;
        Ok(())
    }

    pub fn get(&self, chat_id: i64) -> Result<Option<ChatConfig>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT * FROM chats WHERE chat_id = ?1")
            .map_err(db_err)?;
        let mut rows = stmt
            .query_map(params![chat_id], row_to_config)
            .map_err(db_err)?;
        rows.next().transpose().map_err(db_err)
    }

    /// All registered chats ordered by title, case-insensitive. Admin surface
    /// only.
    pub fn list_all(&self) -> Result<Vec<ChatConfig>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT * FROM chats ORDER BY title COLLATE NOCASE")
            .map_err(db_err)?;
        let rows = stmt.query_map([], row_to_config).map_err(db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
    }

    /// Replace all editable fields. The interval is clamped to >= 1 minute.
    /// Fails with `ChatNotFound` when the chat never sent an event.
    pub fn save(&self, chat_id: i64, s: &ChatSettings) -> Result<()> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE chats SET
                    anti_link = ?2,
                    welcome_enabled = ?3,
                    welcome_text = ?4,
                    welcome_media_kind = ?5,
                    welcome_media_path = ?6,
                    welcome_media_url = ?7,
                    welcome_button_text = ?8,
                    welcome_button_url = ?9,
                    auto_enabled = ?10,
                    auto_text = ?11,
                    auto_media_kind = ?12,
                    auto_media_path = ?13,
                    auto_media_url = ?14,
                    auto_interval_min = ?15
                 WHERE chat_id = ?1",
                params![
                    chat_id,
                    s.anti_link,
                    s.welcome_enabled,
                    s.welcome_text,
                    s.welcome_media_kind.map(|k| k.as_str()),
                    s.welcome_media_path,
                    s.welcome_media_url,
                    s.welcome_button_text,
                    s.welcome_button_url,
                    s.auto_enabled,
                    s.auto_text,
                    s.auto_media_kind.map(|k| k.as_str()),
                    s.auto_media_path,
                    s.auto_media_url,
                    s.auto_interval_min.max(1),
                ],
            )
            .map_err(db_err)?;
        if changed == 0 {
            return Err(WardenError::ChatNotFound(chat_id));
        }
        Ok(())
    }

    /// Field-scoped update of the next due time; never disturbs concurrent
    /// edits to other columns.
    pub fn set_next_run(&self, chat_id: i64, next_run_at: Option<i64>) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE chats SET next_run_at = ?2 WHERE chat_id = ?1",
            params![chat_id, next_run_at],
        )
        .map_err(db_err)?;
        Ok(())
    }

    /// Chats whose auto-broadcast should have fired by `now_ms`: enabled, with
    /// a positive interval, and either never scheduled or past due. This is
    /// the recovery query after a restart.
    pub fn due_autos(&self, now_ms: i64) -> Result<Vec<ChatConfig>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT * FROM chats
                 WHERE auto_enabled = 1 AND auto_interval_min > 0
                   AND (next_run_at IS NULL OR next_run_at <= ?1)",
            )
            .map_err(db_err)?;
        let rows = stmt.query_map(params![now_ms], row_to_config).map_err(db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
    }

    // ─── BanLedger ──────────────────────────────────────

    /// Upsert a restriction record; last write wins.
    pub fn set_ban(&self, chat_id: i64, user_id: i64, until_ms: i64) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO bans (chat_id, user_id, until) VALUES (?1, ?2, ?3)
             ON CONFLICT(chat_id, user_id) DO UPDATE SET until = excluded.until",
            params![chat_id, user_id, until_ms],
        )
        .map_err(db_err)?;
        Ok(())
    }

    pub fn get_ban(&self, chat_id: i64, user_id: i64) -> Result<Option<Ban>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT chat_id, user_id, until FROM bans WHERE chat_id = ?1 AND user_id = ?2")
            .map_err(db_err)?;
        let mut rows = stmt
            .query_map(params![chat_id, user_id], |row| {
                Ok(Ban { chat_id: row.get(0)?, user_id: row.get(1)?, until_ms: row.get(2)? })
            })
            .map_err(db_err)?;
        rows.next().transpose().map_err(db_err)
    }

    /// A ban is active iff its expiry is strictly in the future. An expired
    /// record that the sweep has not yet deleted reads as inactive.
    pub fn is_active(&self, chat_id: i64, user_id: i64, now_ms: i64) -> Result<bool> {
        Ok(self.get_ban(chat_id, user_id)?.is_some_and(|b| b.is_active(now_ms)))
    }

    /// Delete every record whose expiry is in the past. Returns the number of
    /// records removed.
    pub fn purge_expired(&self, now_ms: i64) -> Result<usize> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM bans WHERE until < ?1", params![now_ms]).map_err(db_err)
    }
}

fn row_to_config(row: &Row) -> rusqlite::Result<ChatConfig> {
    let kind: String = row.get("kind")?;
    let welcome_media_kind: Option<String> = row.get("welcome_media_kind")?;
    let auto_media_kind: Option<String> = row.get("auto_media_kind")?;
    Ok(ChatConfig {
        chat_id: row.get("chat_id")?,
        title: row.get("title")?,
        kind: ChatKind::parse(&kind),
        anti_link: row.get("anti_link")?,
        welcome_enabled: row.get("welcome_enabled")?,
        welcome_text: row.get("welcome_text")?,
        welcome_media_kind: welcome_media_kind.as_deref().and_then(MediaKind::parse),
        welcome_media_path: row.get("welcome_media_path")?,
        welcome_media_url: row.get("welcome_media_url")?,
        welcome_button_text: row.get("welcome_button_text")?,
        welcome_button_url: row.get("welcome_button_url")?,
        auto_enabled: row.get("auto_enabled")?,
        auto_text: row.get("auto_text")?,
        auto_media_kind: auto_media_kind.as_deref().and_then(MediaKind::parse),
        auto_media_path: row.get("auto_media_path")?,
        auto_media_url: row.get("auto_media_url")?,
        auto_interval_min: row.get("auto_interval_min")?,
        next_run_at: row.get("next_run_at")?,
    })
}
