//! Bounded polling for read-after-write consistency.
//!
//! Several vendors accept a write (fork, create pull request) before the
//! new resource can be read back. [`Retry`] re-runs a read until it
//! succeeds or the attempt budget runs out. It never re-issues the write.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::{Error, Result};

/// Attempts made when waiting for a freshly written resource.
pub const READ_BACK_ATTEMPTS: u32 = 30;

/// Pause between read-back attempts.
pub const READ_BACK_INTERVAL: Duration = Duration::from_secs(2);

/// Source of delays, swappable in tests.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Returns immediately and records every requested delay.
#[derive(Debug, Default)]
pub struct InstantSleeper {
    calls: Mutex<Vec<Duration>>,
}

impl InstantSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays requested so far.
    pub fn calls(&self) -> Vec<Duration> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Sum of all requested delays.
    pub fn total(&self) -> Duration {
        self.calls().iter().sum()
    }
}

#[async_trait]
impl Sleeper for InstantSleeper {
    async fn sleep(&self, duration: Duration) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(duration);
        }
    }
}

/// Retry policy: a fixed number of attempts at a fixed interval.
#[derive(Clone)]
pub struct Retry {
    attempts: u32,
    interval: Duration,
    sleeper: Arc<dyn Sleeper>,
}

impl std::fmt::Debug for Retry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retry")
            .field("attempts", &self.attempts)
            .field("interval", &self.interval)
            .finish()
    }
}

impl Default for Retry {
    fn default() -> Self {
        Self::read_back()
    }
}

impl Retry {
    pub fn new(attempts: u32, interval: Duration, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            attempts: attempts.max(1),
            interval,
            sleeper,
        }
    }

    /// 30 attempts, 2 seconds apart, on the tokio timer.
    pub fn read_back() -> Self {
        Self::new(READ_BACK_ATTEMPTS, READ_BACK_INTERVAL, Arc::new(TokioSleeper))
    }

    /// Same budget as [`Retry::read_back`] with a different sleeper.
    pub fn read_back_with(sleeper: Arc<dyn Sleeper>) -> Self {
        Self::new(READ_BACK_ATTEMPTS, READ_BACK_INTERVAL, sleeper)
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run `op` until it returns a value accepted by `ready`.
    ///
    /// Errors and rejected values both count as failed attempts. After the
    /// last attempt the final error is returned, or a `NotFound` naming
    /// `what` when the last value was rejected.
    pub async fn until<T, F, Fut, P>(&self, what: &str, mut op: F, ready: P) -> Result<T>
    where
        F: FnMut(u32) -> Fut + Send,
        Fut: Future<Output = Result<T>> + Send,
        P: Fn(&T) -> bool + Send,
        T: Send,
    {
        let mut last_error = None;
        for attempt in 1..=self.attempts {
            match op(attempt).await {
                Ok(value) if ready(&value) => {
                    if attempt > 1 {
                        debug!(what = what, attempt = attempt, "Resource became readable");
                    }
                    return Ok(value);
                }
                Ok(_) => {
                    debug!(what = what, attempt = attempt, "Resource not ready yet");
                    last_error = None;
                }
                Err(e) => {
                    debug!(what = what, attempt = attempt, error = %e, "Read-back failed");
                    last_error = Some(e);
                }
            }
            if attempt < self.attempts {
                self.sleeper.sleep(self.interval).await;
            }
        }
        Err(last_error.unwrap_or_else(|| {
            Error::NotFound(format!(
                "{} not ready after {} attempts",
                what, self.attempts
            ))
        }))
    }

    /// Run `op` until it returns `Ok`.
    pub async fn until_ok<T, F, Fut>(&self, what: &str, op: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut + Send,
        Fut: Future<Output = Result<T>> + Send,
        T: Send,
    {
        self.until(what, op, |_| true).await
    }
}
