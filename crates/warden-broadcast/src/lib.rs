//! Broadcast execution: one welcome or auto message, composed and sent.

mod executor;

pub use executor::BroadcastExecutor;
