//! Dwell-time measurement for the item currently on screen.

use std::time::{Duration, Instant};

use super::db::ItemId;

/// Source of monotonic timestamps.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Wall clock backed by [`Instant::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Measures how long a single item stays visible.
///
/// At most one interval is open at a time. Starting a new interval discards
/// any open one, so callers stop (and persist) before moving on.
#[derive(Debug, Default)]
pub struct DwellTimer {
    running: Option<(ItemId, Instant)>,
}

impl DwellTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin timing `item` at `now`.
    pub fn start(&mut self, item: ItemId, now: Instant) {
        self.running = Some((item, now));
    }

    /// Close the open interval, returning the item and elapsed milliseconds.
    ///
    /// Returns `None` when nothing was running or the interval was not positive.
    pub fn stop(&mut self, now: Instant) -> Option<(ItemId, u64)> {
        let (item, started) = self.running.take()?;
        let elapsed = now.checked_duration_since(started)?;
        let ms = duration_ms(elapsed);
        (ms > 0).then_some((item, ms))
    }

    /// Item being timed, if any.
    pub fn running_item(&self) -> Option<ItemId> {
        self.running.map(|(item, _)| item)
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }
}

fn duration_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

/// Hand-advanced clock for deterministic tests.
#[cfg(test)]
#[derive(Debug, Clone)]
pub(crate) struct ManualClock {
    now: std::rc::Rc<std::cell::Cell<Instant>>,
}

#[cfg(test)]
impl ManualClock {
    pub(crate) fn new() -> Self {
        Self {
            now: std::rc::Rc::new(std::cell::Cell::new(Instant::now())),
        }
    }

    pub(crate) fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + Duration::from_millis(ms));
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}
