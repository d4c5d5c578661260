//! Warden error taxonomy.

use thiserror::Error;

/// All errors the Warden components can produce.
///
/// Delivery and lookup failures are caught and logged at the call site; they
/// never cross a component boundary. `ChatNotFound` and `PermissionDenied` are
/// the only variants surfaced to callers (admin API, command replies).
#[derive(Error, Debug)]
pub enum WardenError {
    #[error("chat {0} is not registered")]
    ChatNotFound(i64),

    #[error("admins only")]
    PermissionDenied,

    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("member lookup failed: {0}")]
    Lookup(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, WardenError>;
