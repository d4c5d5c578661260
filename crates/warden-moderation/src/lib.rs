//! Moderation: the per-message decision pipeline and the admin commands.

mod commands;
mod links;
mod pipeline;

pub use commands::CommandHandler;
pub use links::has_link;
pub use pipeline::{ModerationAction, ModerationPipeline};

#[cfg(test)]
pub(crate) mod testutil;
