//! Leading and trailing edge throttling on the tokio clock.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::trace;

/// Deferred unit of work run by a [`Throttle`].
pub type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct Inner {
    last_run: Option<Instant>,
    pending: Option<Job>,
    timer: Option<JoinHandle<()>>,
}

/// Time-window throttle with optional leading and trailing edges.
///
/// Runs at most one job per `interval`. With `leading` the first call of a
/// window runs immediately; with `trailing` the most recent call made inside
/// a window runs once the window closes. Dropping the throttle cancels the
/// pending trailing call.
pub struct Throttle {
    inner: Arc<Mutex<Inner>>,
    interval: Duration,
    leading: bool,
    trailing: bool,
}

impl Throttle {
    /// Throttle with the given edges. Prefer the named constructors.
    #[must_use]
    pub fn new(interval: Duration, leading: bool, trailing: bool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            interval,
            leading,
            trailing,
        }
    }

    /// Leading and trailing edges.
    #[must_use]
    pub fn leading_trailing(interval: Duration) -> Self {
        Self::new(interval, true, true)
    }

    /// Leading edge only; calls inside the window are dropped.
    #[must_use]
    pub fn leading_only(interval: Duration) -> Self {
        Self::new(interval, true, false)
    }

    /// Window length.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Submits `job`, running it now, later, or not at all.
    pub fn call(&self, job: impl FnOnce() + Send + 'static) {
        let now = Instant::now();
        let mut inner = self.inner.lock();

        let window_open = inner
            .last_run
            .is_some_and(|last| now.duration_since(last) < self.interval);

        if !window_open && inner.timer.is_none() && self.leading {
            inner.last_run = Some(now);
            drop(inner);
            job();
            return;
        }

        if !self.trailing {
            trace!("Throttled call dropped");
            return;
        }

        inner.pending = Some(Box::new(job));
        if inner.timer.is_some() {
            return;
        }

        let deadline = inner
            .last_run
            .map_or(now + self.interval, |last| last + self.interval);

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            // no runtime to wait on; settle immediately
            let job = inner.pending.take();
            inner.last_run = Some(now);
            drop(inner);
            if let Some(job) = job {
                job();
            }
            return;
        };

        let shared = Arc::clone(&self.inner);
        inner.timer = Some(handle.spawn(async move {
            sleep_until(deadline).await;
            let job = {
                let mut inner = shared.lock();
                inner.timer = None;
                let job = inner.pending.take();
                if job.is_some() {
                    inner.last_run = Some(Instant::now());
                }
                job
            };
            if let Some(job) = job {
                job();
            }
        }));
    }

    /// Drops the pending trailing call, if any.
    pub fn cancel(&self) {
        let mut inner = self.inner.lock();
        inner.pending = None;
        if let Some(timer) = inner.timer.take() {
            timer.abort();
        }
    }

    /// Returns true while a trailing call is scheduled.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.inner.lock().pending.is_some()
    }
}

impl Drop for Throttle {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for Throttle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Throttle")
            .field("interval", &self.interval)
            .field("leading", &self.leading)
            .field("trailing", &self.trailing)
            .field("pending", &self.has_pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> Job) {
        let count = Arc::new(AtomicUsize::new(0));
        let make = {
            let count = Arc::clone(&count);
            move || -> Job {
                let count = Arc::clone(&count);
                Box::new(move || {
                    count.fetch_add(1, Ordering::SeqCst);
                })
            }
        };
        (count, make)
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_collapses_to_leading_and_trailing() {
        let throttle = Throttle::leading_trailing(Duration::from_millis(500));
        let (count, job) = counter();

        for _ in 0..10 {
            throttle.call(job());
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(throttle.has_pending());

        tokio::time::sleep(Duration::from_millis(501)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert!(!throttle.has_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_trailing_runs_latest_job() {
        let throttle = Throttle::leading_trailing(Duration::from_millis(500));
        let seen = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3 {
            let seen = Arc::clone(&seen);
            throttle.call(move || seen.lock().push(i));
        }
        tokio::time::sleep(Duration::from_millis(600)).await;

        assert_eq!(*seen.lock(), vec![0, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_leading_only_drops_calls_inside_window() {
        let throttle = Throttle::leading_only(Duration::from_millis(500));
        let (count, job) = counter();

        throttle.call(job());
        throttle.call(job());
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        throttle.call(job());
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_pending_call() {
        let (count, job) = counter();
        {
            let throttle = Throttle::leading_trailing(Duration::from_millis(500));
            throttle.call(job());
            throttle.call(job());
        }

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_calls_spaced_beyond_interval_all_run() {
        let throttle = Throttle::leading_trailing(Duration::from_millis(100));
        let (count, job) = counter();

        for _ in 0..3 {
            throttle.call(job());
            tokio::time::sleep(Duration::from_millis(150)).await;
        }

        assert_eq!(count.load(Ordering::SeqCst), 3);
    }
}
