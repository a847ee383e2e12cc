//! Fonte de tempo injetável.
//!
//! O cache mede idade com [`Instant`] e o ciclo de vida das ordens usa a data
//! do calendário local. Ambos passam pelo trait [`Clock`] para que testes
//! possam avançar o tempo sem `sleep`.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{Local, NaiveDate};

/// Source of monotonic instants and calendar dates.
pub trait Clock: Send + Sync {
    /// Monotonic instant used for cache entry age.
    fn instant(&self) -> Instant;

    /// Current calendar date used for opening and completion dates.
    fn today(&self) -> NaiveDate;
}

/// Wall clock backed by the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn instant(&self) -> Instant {
        Instant::now()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    state: Mutex<ManualState>,
}

#[derive(Debug)]
struct ManualState {
    elapsed: Duration,
    today: NaiveDate,
}

impl ManualClock {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            origin: Instant::now(),
            state: Mutex::new(ManualState {
                elapsed: Duration::ZERO,
                today,
            }),
        }
    }

    /// Moves the monotonic clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.elapsed += by;
    }

    pub fn set_today(&self, today: NaiveDate) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.today = today;
    }
}

impl Clock for ManualClock {
    fn instant(&self) -> Instant {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        self.origin + state.elapsed
    }

    fn today(&self) -> NaiveDate {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).today
    }
}
