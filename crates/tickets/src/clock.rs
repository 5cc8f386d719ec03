//! Time source used by expiration policies and the ticket manager.

use std::fmt::Debug;

use chrono::{DateTime, Utc};

/// Source of the current time.
///
/// Injected into the factory and manager so expiration can be tested without
/// sleeping. See `testutil::ManualClock` for a controllable implementation.
pub trait Clock: Send + Sync + Debug {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time from the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
