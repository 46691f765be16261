use core::cmp::min;

use embassy_time::{Duration, Instant};

/// Deadline on the monotonic clock, polled by busy-waiting.
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    expires_at: Instant,
}

pub enum Error<E> {
    Timeout,
    Other(E),
}

impl Timer {
    pub fn after(duration: Duration) -> Self {
        Self {
            expires_at: Instant::now() + duration,
        }
    }

    pub fn expired(&self) -> bool {
        self.expires_at <= Instant::now()
    }

    pub fn remaining(&self) -> Duration {
        self.expires_at
            .checked_duration_since(Instant::now())
            .unwrap_or(Duration::from_ticks(0))
    }

    /// `duration`, shortened so it does not run past the deadline.
    pub fn clip(&self, duration: Duration) -> Duration {
        min(duration, self.remaining())
    }

    pub fn with_timeout<F, R, E>(timeout: Duration, mut e: F) -> Result<R, Error<E>>
    where
        F: FnMut() -> Option<Result<R, E>>,
    {
        let timer = Timer::after(timeout);

        loop {
            if let Some(res) = e() {
                return res.map_err(Error::Other);
            }
            if timer.expired() {
                return Err(Error::Timeout);
            }
        }
    }

    pub fn wait(self) {
        loop {
            if self.expired() {
                break;
            }
        }
    }
}
