//! Scheduling between reconciliation cycles

use std::thread;
use std::time::Duration;

/// The single suspension point of the loop, taken once after every cycle.
pub trait Ticker {
    fn wait(&mut self);
}

/// Sleeps for a fixed interval.
pub struct IntervalTicker {
    interval: Duration,
}

impl IntervalTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for IntervalTicker {
    fn wait(&mut self) {
        thread::sleep(self.interval);
    }
}
