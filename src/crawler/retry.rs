//! Rate-limit retry policy and the sleep it waits on.

use std::future::Future;
use std::time::Duration;

/// Something that can suspend the crawl for a server-requested delay.
pub trait Sleeper {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

/// Real sleeper backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}

/// How many times a rate-limited fetch is retried for the same repository.
///
/// The delay itself always comes from the server; the policy only bounds
/// the number of retries. The default is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: Option<u32>,
}

impl RetryPolicy {
    pub fn new(max_retries: Option<u32>) -> Self {
        Self { max_retries }
    }

    /// Retry forever.
    pub fn unbounded() -> Self {
        Self { max_retries: None }
    }

    pub fn max_retries(&self) -> Option<u32> {
        self.max_retries
    }

    /// Whether another retry is allowed after `retries` have already happened.
    pub fn allows_retry(&self, retries: u32) -> bool {
        self.max_retries.map_or(true, |max| retries < max)
    }
}
