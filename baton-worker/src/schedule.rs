use baton_core::Role;
use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

/// How a role loop handed control back to the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopOutcome {
    /// The election controller settled on a different role
    Transition(Role),
    /// Shutdown was requested
    Shutdown,
}

/// Periodic timer whose first tick fires one full `period` from now.
///
/// Ticks missed while an action body was still running are dropped rather
/// than fired back to back.
pub(crate) fn periodic(period: Duration) -> Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}
