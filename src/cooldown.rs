//! Time gate for directory rescans.
//!
//! A [`Cooldown`] lives inside the same lock as the state it protects: the
//! caller that finds the gate open stamps it before scanning, so concurrent
//! callers arriving right after see a closed gate and use the cached state.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct Cooldown {
    period: Duration,
    last_scan: Option<Instant>,
}

impl Cooldown {
    /// A gate that opens once per `period`. The first check always opens.
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            last_scan: None,
        }
    }

    /// Open the gate if the period has elapsed since the last opening.
    ///
    /// Returns `true` and records `now` when a rescan should happen.
    pub fn try_begin(&mut self) -> bool {
        self.try_begin_at(Instant::now())
    }

    fn try_begin_at(&mut self, now: Instant) -> bool {
        let open = match self.last_scan {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.period,
        };
        if open {
            self.last_scan = Some(now);
        }
        open
    }
}
