//! Telegram Bot API binding.
//!
//! Long polling plus the handful of calls the moderation and broadcast
//! components need: send text/photo/video, delete a message, restrict a
//! member, look up member status. The `BotApi` trait is the seam the rest of
//! the workspace (and the tests) program against.

mod api;
mod client;
mod types;

pub use api::{BotApi, InlineButton, MediaUpload};
pub use client::{TelegramClient, UpdateStream};
pub use types::{Chat, ChatMember, Message, Update, User};
