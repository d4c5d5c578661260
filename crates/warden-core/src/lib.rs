//! Core types shared across the Warden workspace.

pub mod config;
pub mod error;
pub mod types;

pub use error::{Result, WardenError};
