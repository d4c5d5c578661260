//! Admin HTTP gateway.
//!
//! Thin surface over the store and the scheduler: list configs, read one,
//! write one (which re-arms the chat's broadcast timer). Everything except
//! `/health` sits behind the shared admin token.

mod routes;
mod server;

pub use routes::router;
pub use server::{AppState, serve};
