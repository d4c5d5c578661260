//! Composes one broadcast and hands it to the platform.
//!
//! Media priority: remote URL, then locally stored file, then text-only.
//! Welcome messages substitute the joining member's name, may carry one
//! call-to-action button, and are deleted again after five minutes.

use regex::Regex;
use std::path::PathBuf;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use warden_core::error::Result;
use warden_core::types::{ChatConfig, MediaKind, MediaSource};
use warden_telegram::{BotApi, InlineButton, MediaUpload};

const WELCOME_DELETE_AFTER: Duration = Duration::from_secs(5 * 60);
const DEFAULT_WELCOME: &str = "Welcome, @name!";

static NAME_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)@name").expect("static regex"));

pub struct BroadcastExecutor {
    api: Arc<dyn BotApi>,
    media_dir: PathBuf,
}

impl BroadcastExecutor {
    pub fn new(api: Arc<dyn BotApi>, media_dir: PathBuf) -> Self {
        Self { api, media_dir }
    }

    /// Send one recurring auto-broadcast. No button, no auto-delete.
    pub async fn send_auto(&self, cfg: &ChatConfig) -> Result<()> {
        let caption = cfg.auto_text.clone().unwrap_or_default();
        self.dispatch(cfg.chat_id, cfg.auto_media(), &caption, &[]).await?;
        tracing::debug!(chat_id = cfg.chat_id, "auto broadcast sent");
        Ok(())
    }

    /// Send one welcome message for the joined members and schedule its
    /// cleanup.
    pub async fn send_welcome(&self, cfg: &ChatConfig, member_names: &str) -> Result<()> {
        let template = cfg.welcome_text.as_deref().unwrap_or(DEFAULT_WELCOME);
        let text = render_welcome(template, member_names);
        let buttons: Vec<InlineButton> = cfg
            .welcome_button()
            .map(|b| vec![InlineButton { text: b.label, url: b.url }])
            .unwrap_or_default();

        let message_id = self.dispatch(cfg.chat_id, cfg.welcome_media(), &text, &buttons).await?;
        self.schedule_delete(cfg.chat_id, message_id);
        tracing::debug!(chat_id = cfg.chat_id, message_id, "welcome sent");
        Ok(())
    }

    async fn dispatch(
        &self,
        chat_id: i64,
        media: MediaSource,
        caption: &str,
        buttons: &[InlineButton],
    ) -> Result<i64> {
        match media {
            MediaSource::Remote { url, kind } => {
                let upload = MediaUpload::Url(url);
                match kind {
                    MediaKind::Video => self.api.send_video(chat_id, &upload, caption, buttons).await,
                    MediaKind::Photo => self.api.send_photo(chat_id, &upload, caption, buttons).await,
                }
            }
            MediaSource::Local { path, kind } => {
                let upload = MediaUpload::File(self.media_dir.join(path));
                match kind {
                    MediaKind::Video => self.api.send_video(chat_id, &upload, caption, buttons).await,
                    MediaKind::Photo => self.api.send_photo(chat_id, &upload, caption, buttons).await,
                }
            }
            MediaSource::None => self.api.send_text(chat_id, caption, buttons).await,
        }
    }

    /// Best-effort delayed delete; failure is logged, nothing awaits the
    /// result.
    fn schedule_delete(&self, chat_id: i64, message_id: i64) {
        let api = Arc::clone(&self.api);
        tokio::spawn(async move {
            tokio::time::sleep(WELCOME_DELETE_AFTER).await;
            if let Err(e) = api.delete_message(chat_id, message_id).await {
                tracing::warn!(chat_id, message_id, "welcome cleanup failed: {e}");
            }
        });
    }
}

/// Substitute the `@name` placeholder (case-insensitive) with the member
/// name(s).
fn render_welcome(template: &str, names: &str) -> String {
    NAME_TOKEN.replace_all(template, names).into_owned()
}
