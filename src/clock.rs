//! Injectable time and randomness, so backoff and claim-eligibility logic
//! can be tested deterministically instead of racing the wall clock.

use chrono::{DateTime, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The real clock, backed by `chrono::Utc::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

pub trait Randomness: Send + Sync {
    /// A uniform random value in `[0, 1)`.
    fn uniform(&self) -> f64;
}

/// The real source, backed by `rand::thread_rng()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRandomness;

impl Randomness for SystemRandomness {
    fn uniform(&self) -> f64 {
        rand::Rng::gen_range(&mut rand::thread_rng(), 0.0..1.0)
    }
}

#[cfg(test)]
pub mod fakes {
    use super::*;
    use std::sync::Mutex;

    /// A clock that returns a fixed instant until advanced.
    pub struct FixedClock(Mutex<DateTime<Utc>>);

    impl FixedClock {
        pub fn new(at: DateTime<Utc>) -> Self {
            Self(Mutex::new(at))
        }

        pub fn advance(&self, duration: chrono::Duration) {
            let mut guard = self.0.lock().unwrap();
            *guard += duration;
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    /// Randomness that always returns the same value - makes backoff maths
    /// exact in unit tests instead of merely bounded.
    pub struct FixedRandomness(pub f64);

    impl Randomness for FixedRandomness {
        fn uniform(&self) -> f64 {
            self.0
        }
    }
}
