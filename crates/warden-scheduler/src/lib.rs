//! Broadcast scheduling: in-process per-chat timers plus the periodic
//! reconciliation sweep that recovers schedules lost to a restart and purges
//! expired bans.

mod registry;
mod sweep;

pub use registry::ScheduleRegistry;
pub use sweep::ReconciliationSweep;

#[cfg(test)]
pub(crate) mod testutil;
