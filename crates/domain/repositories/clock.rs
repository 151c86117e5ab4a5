use chrono::{DateTime, Utc};
use mockall::automock;

/// Injected time source so the poller is testable by simulated clock.
#[automock]
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
