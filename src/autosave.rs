use std::time::{Duration, Instant};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

/// The one clock behind both the autosave trigger and the countdown label.
#[derive(Debug, Clone)]
pub struct AutosaveClock {
    interval: Duration,
    next_due: Instant,
}

impl AutosaveClock {
    pub fn new(interval: Duration, now: Instant) -> Self {
        let interval = interval.max(Duration::from_secs(1));
        Self {
            interval,
            next_due: now + interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns true once per elapsed interval and schedules the next one.
    pub fn poll(&mut self, now: Instant) -> bool {
        if now < self.next_due {
            return false;
        }
        self.next_due += self.interval;
        // Skip missed slots after a long stall instead of firing repeatedly.
        if self.next_due <= now {
            self.next_due = now + self.interval;
        }
        true
    }

    /// Whole seconds until the next autosave, rounded up.
    pub fn remaining_secs(&self, now: Instant) -> u64 {
        let left = self.next_due.saturating_duration_since(now);
        let secs = left.as_secs();
        if left.subsec_nanos() > 0 { secs + 1 } else { secs }
    }

    pub fn countdown_label(&self, now: Instant) -> String {
        format!("Next autosave in: {} seconds", self.remaining_secs(now))
    }
}
