//! # Server Tick Loop
//!
//! Fixed-interval pacing for the simulation thread.
//!
//! ## Design
//!
//! - A late loop catches up with back-to-back ticks, at most
//!   `MAX_CATCH_UP` of them; time beyond that is dropped, so the tick
//!   sequence slows down instead of bursting
//! - Tick numbers never skip; only wall-clock pacing is affected

use std::time::{Duration, Instant};

/// Most ticks run back to back after a stall.
const MAX_CATCH_UP: u32 = 5;

/// Tick timing statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickStats {
    /// Shortest tick observed.
    pub min_tick_us: u64,
    /// Longest tick observed.
    pub max_tick_us: u64,
    /// Rolling average tick duration.
    pub avg_tick_us: u64,
    /// Ticks that took longer than the interval.
    pub late_ticks: u64,
    /// Ticks measured.
    pub total_ticks: u64,
    /// Time dropped from the accumulator after long stalls.
    pub dropped_us: u64,
}

/// Fixed-interval tick controller.
#[derive(Debug)]
pub struct TickLoop {
    interval: Duration,
    last_poll: Instant,
    accumulator: Duration,
    tick_count: u64,
    stats: TickStats,
}

impl TickLoop {
    /// A loop ticking every `interval`.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_poll: Instant::now(),
            accumulator: Duration::ZERO,
            tick_count: 0,
            stats: TickStats {
                min_tick_us: u64::MAX,
                ..TickStats::default()
            },
        }
    }

    /// A loop ticking every `ms` milliseconds.
    #[must_use]
    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    /// Returns true while a tick is due. Call in a loop until it returns
    /// false.
    #[must_use]
    pub fn should_tick(&mut self) -> bool {
        let now = Instant::now();
        self.accumulator += now.duration_since(self.last_poll);
        self.last_poll = now;

        let cap = self.interval * MAX_CATCH_UP;
        if self.accumulator > cap {
            let dropped = self.accumulator - cap;
            self.stats.dropped_us += duration_us(dropped);
            self.accumulator = cap;
        }
        self.accumulator >= self.interval
    }

    /// Marks the start of a tick and returns its start time.
    #[must_use]
    pub fn begin_tick(&mut self) -> Instant {
        self.accumulator = self.accumulator.saturating_sub(self.interval);
        self.tick_count += 1;
        Instant::now()
    }

    /// Marks the end of a tick started at `start`.
    pub fn end_tick(&mut self, start: Instant) {
        let elapsed = start.elapsed();
        let us = duration_us(elapsed);
        let s = &mut self.stats;
        s.total_ticks += 1;
        s.min_tick_us = s.min_tick_us.min(us);
        s.max_tick_us = s.max_tick_us.max(us);
        s.avg_tick_us = if s.total_ticks == 1 {
            us
        } else {
            (s.avg_tick_us * 15 + us) / 16
        };
        if elapsed > self.interval {
            s.late_ticks += 1;
        }
    }

    /// Sleeps until the next tick is due.
    pub fn wait_for_next_tick(&self) {
        let since = self.last_poll.elapsed() + self.accumulator;
        if since < self.interval {
            std::thread::sleep(self.interval - since);
        }
    }

    /// Ticks started so far.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Timing statistics.
    #[must_use]
    pub const fn stats(&self) -> &TickStats {
        &self.stats
    }

    /// Target interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }
}

fn duration_us(d: Duration) -> u64 {
    u64::try_from(d.as_micros()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_becomes_due() {
        let mut tick_loop = TickLoop::from_millis(1);
        std::thread::sleep(Duration::from_millis(3));
        assert!(tick_loop.should_tick());
        let start = tick_loop.begin_tick();
        tick_loop.end_tick(start);
        assert_eq!(tick_loop.tick_count(), 1);
        assert_eq!(tick_loop.stats().total_ticks, 1);
    }

    #[test]
    fn test_not_due_before_interval() {
        let mut tick_loop = TickLoop::from_millis(10_000);
        assert!(!tick_loop.should_tick());
    }

    #[test]
    fn test_stall_catch_up_is_capped() {
        let mut tick_loop = TickLoop::from_millis(1);
        std::thread::sleep(Duration::from_millis(30));
        let mut ran = 0;
        while tick_loop.should_tick() {
            let start = tick_loop.begin_tick();
            tick_loop.end_tick(start);
            ran += 1;
        }
        assert!(ran >= MAX_CATCH_UP && ran <= MAX_CATCH_UP + 2, "ran {ran}");
        assert!(tick_loop.stats().dropped_us > 0);
    }
}
