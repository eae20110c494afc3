//! Minimum spacing between outgoing requests.
//!
//! [`ThrottleMiddleware`] sits inside the retry middleware, so every attempt
//! is paced, including the ones the retry policy issues on its own.

use std::sync::Arc;
use std::time::Duration;

use http::Extensions;
use reqwest::{Request, Response};
use reqwest_middleware::{Middleware, Next};
use tokio::sync::Mutex;
use tokio::time::{self, Instant};

/// Enforces a minimum interval between consecutive requests.
///
/// The lock is held while sleeping, so callers sharing one `Throttle` are
/// served one at a time, each at least `interval` after the previous one.
#[derive(Debug)]
pub struct Throttle {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl Throttle {
    /// A throttle whose first request goes out immediately.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(None),
        }
    }

    /// Minimum gap between two requests.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until the next request may go out, then claim the slot.
    pub async fn acquire(&self) {
        let mut last = self.last.lock().await;
        if let Some(previous) = *last {
            let ready = previous + self.interval;
            if ready > Instant::now() {
                tracing::trace!(wait_ms = (ready - Instant::now()).as_millis() as u64, "throttling");
                time::sleep_until(ready).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Middleware that waits on a shared [`Throttle`] before every attempt.
///
/// Register it after any retry middleware so retries are paced as well.
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// use lib_playstore::retrieve::{Throttle, ThrottleMiddleware};
///
/// let throttle = Arc::new(Throttle::new(Duration::from_millis(500)));
/// let client = reqwest_middleware::ClientBuilder::new(reqwest::Client::new())
///     .with(ThrottleMiddleware::new(throttle))
///     .build();
/// # drop(client);
/// ```
#[derive(Debug, Clone)]
pub struct ThrottleMiddleware {
    throttle: Arc<Throttle>,
}

impl ThrottleMiddleware {
    /// Pace requests through `throttle`, which may be shared by several stacks.
    pub fn new(throttle: Arc<Throttle>) -> Self {
        Self { throttle }
    }
}

#[async_trait::async_trait]
impl Middleware for ThrottleMiddleware {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        self.throttle.acquire().await;
        next.run(req, extensions).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn consecutive_calls_are_spaced() {
        let throttle = Throttle::new(Duration::from_millis(250));
        let start = Instant::now();
        for _ in 0..4 {
            throttle.acquire().await;
        }
        assert!(start.elapsed() >= Duration::from_millis(750));
    }

    #[tokio::test(start_paused = true)]
    async fn first_call_does_not_wait() {
        let throttle = Throttle::new(Duration::from_secs(5));
        let start = Instant::now();
        throttle.acquire().await;
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_are_serialized() {
        let throttle = Arc::new(Throttle::new(Duration::from_millis(100)));
        let start = Instant::now();
        let tasks: Vec<_> = (0..3)
            .map(|_| {
                let t = Arc::clone(&throttle);
                tokio::spawn(async move { t.acquire().await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }
        assert!(start.elapsed() >= Duration::from_millis(200));
    }
}
