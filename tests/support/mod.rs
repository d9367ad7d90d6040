#![allow(dead_code)]

pub mod config_env;

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use tweet_tagger::annotations::Clock;

/// Clock advanced by hand so dwell times are exact.
#[derive(Clone)]
pub struct StepClock {
    now: Rc<Cell<Instant>>,
}

impl StepClock {
    pub fn new() -> Self {
        Self {
            now: Rc::new(Cell::new(Instant::now())),
        }
    }

    pub fn advance_ms(&self, ms: u64) {
        self.now.set(self.now.get() + Duration::from_millis(ms));
    }
}

impl Clock for StepClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}
