//! Durable state: per-chat configuration and the ban ledger.
//!
//! The single source of truth for every other component. Each operation is one
//! serialized transaction against SQLite; callers re-read before acting instead
//! of holding long-lived copies.

mod db;

pub use db::Store;
