//! Domain types: chat configuration, bans, media descriptors.

use serde::{Deserialize, Serialize};

/// Current wall-clock time in milliseconds since the Unix epoch.
///
/// All due times and ban expiries are stored in this unit.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Kind of chat as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    Group,
    Supergroup,
    Channel,
    Private,
}

impl ChatKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatKind::Group => "group",
            ChatKind::Supergroup => "supergroup",
            ChatKind::Channel => "channel",
            ChatKind::Private => "private",
        }
    }

    /// Unknown kinds map to `Group` so a new platform chat type never breaks
    /// registration.
    pub fn parse(s: &str) -> Self {
        match s {
            "supergroup" => ChatKind::Supergroup,
            "channel" => ChatKind::Channel,
            "private" => ChatKind::Private,
            _ => ChatKind::Group,
        }
    }

    pub fn is_private(&self) -> bool {
        matches!(self, ChatKind::Private)
    }
}

/// Kind of a media attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "photo" => Some(MediaKind::Photo),
            "video" => Some(MediaKind::Video),
            _ => None,
        }
    }
}

/// Resolved media source for one broadcast.
///
/// Resolution priority: remote URL first, then a locally stored file, then
/// plain text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    Remote { url: String, kind: MediaKind },
    Local { path: String, kind: MediaKind },
    None,
}

/// Single call-to-action button attached below a welcome message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WelcomeButton {
    pub label: String,
    pub url: String,
}

/// Editable per-chat settings. Everything except the identity columns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatSettings {
    pub anti_link: bool,
    pub welcome_enabled: bool,
    pub welcome_text: Option<String>,
    pub welcome_media_kind: Option<MediaKind>,
    pub welcome_media_path: Option<String>,
    pub welcome_media_url: Option<String>,
    pub welcome_button_text: Option<String>,
    pub welcome_button_url: Option<String>,
    pub auto_enabled: bool,
    pub auto_text: Option<String>,
    pub auto_media_kind: Option<MediaKind>,
    pub auto_media_path: Option<String>,
    pub auto_media_url: Option<String>,
    pub auto_interval_min: i64,
}

/// Full per-chat configuration row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    pub chat_id: i64,
    pub title: String,
    pub kind: ChatKind,

    pub anti_link: bool,

    pub welcome_enabled: bool,
    pub welcome_text: Option<String>,
    pub welcome_media_kind: Option<MediaKind>,
    pub welcome_media_path: Option<String>,
    pub welcome_media_url: Option<String>,
    pub welcome_button_text: Option<String>,
    pub welcome_button_url: Option<String>,

    pub auto_enabled: bool,
    pub auto_text: Option<String>,
    pub auto_media_kind: Option<MediaKind>,
    pub auto_media_path: Option<String>,
    pub auto_media_url: Option<String>,
    /// Clamped to >= 1 on every store write.
    pub auto_interval_min: i64,
    /// Next auto-broadcast due time (ms). `None` = never scheduled.
    pub next_run_at: Option<i64>,
}

impl ChatConfig {
    /// Auto-broadcast interval in milliseconds.
    pub fn interval_ms(&self) -> i64 {
        self.auto_interval_min * 60_000
    }

    /// Whether the auto-broadcast schedule should be armed at all.
    pub fn auto_armed(&self) -> bool {
        self.auto_enabled && self.auto_interval_min > 0
    }

    pub fn welcome_media(&self) -> MediaSource {
        resolve_media(
            self.welcome_media_url.as_deref(),
            self.welcome_media_path.as_deref(),
            self.welcome_media_kind,
        )
    }

    pub fn auto_media(&self) -> MediaSource {
        resolve_media(
            self.auto_media_url.as_deref(),
            self.auto_media_path.as_deref(),
            self.auto_media_kind,
        )
    }

    /// The welcome button, present only when both label and url are set.
    pub fn welcome_button(&self) -> Option<WelcomeButton> {
        match (&self.welcome_button_text, &self.welcome_button_url) {
            (Some(label), Some(url)) if !label.is_empty() && !url.is_empty() => {
                Some(WelcomeButton { label: label.clone(), url: url.clone() })
            }
            _ => None,
        }
    }

    /// Editable fields as a `ChatSettings`, for round-tripping through the
    /// admin API.
    pub fn settings(&self) -> ChatSettings {
        ChatSettings {
            anti_link: self.anti_link,
            welcome_enabled: self.welcome_enabled,
            welcome_text: self.welcome_text.clone(),
            welcome_media_kind: self.welcome_media_kind,
            welcome_media_path: self.welcome_media_path.clone(),
            welcome_media_url: self.welcome_media_url.clone(),
            welcome_button_text: self.welcome_button_text.clone(),
            welcome_button_url: self.welcome_button_url.clone(),
            auto_enabled: self.auto_enabled,
            auto_text: self.auto_text.clone(),
            auto_media_kind: self.auto_media_kind,
            auto_media_path: self.auto_media_path.clone(),
            auto_media_url: self.auto_media_url.clone(),
            auto_interval_min: self.auto_interval_min,
        }
    }
}

/// A remote URL wins over a local path. For URLs without an explicit kind the
/// file extension decides: `.mp4` is a video, everything else a photo.
fn resolve_media(
    url: Option<&str>,
    path: Option<&str>,
    kind: Option<MediaKind>,
) -> MediaSource {
    if let Some(url) = url.filter(|u| !u.is_empty()) {
        let kind = match kind {
            Some(k) => k,
            None if url.ends_with(".mp4") => MediaKind::Video,
            None => MediaKind::Photo,
        };
        return MediaSource::Remote { url: url.to_string(), kind };
    }
    match (path.filter(|p| !p.is_empty()), kind) {
        (Some(path), Some(kind)) => MediaSource::Local { path: path.to_string(), kind },
        _ => MediaSource::None,
    }
}

/// Time-bounded restriction record. Active iff `until_ms` is in the future.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ban {
    pub chat_id: i64,
    pub user_id: i64,
    pub until_ms: i64,
}

impl Ban {
    pub fn is_active(&self, now_ms: i64) -> bool {
        self.until_ms > now_ms
    }
}
