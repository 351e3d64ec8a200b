//! Debounce and throttle helpers on tokio timers
//!
//! Pending timers are tasks owned by the helper. A new value supersedes (and
//! aborts) the pending one, and dropping the helper aborts whatever is left.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};

/// Runs the most recent callback once `delay` has passed without another call.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule `callback`, cancelling any callback still waiting.
    pub fn call<F>(&mut self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.cancel();
        let deadline = Instant::now() + self.delay;
        self.pending = Some(tokio::spawn(async move {
            sleep_until(deadline).await;
            callback();
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(task) = self.pending.take() {
            task.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// A value whose published copy trails edits by `delay`.
#[derive(Debug)]
pub struct DebouncedValue<T> {
    current: T,
    published: Arc<watch::Sender<T>>,
    debouncer: Debouncer,
}

impl<T> DebouncedValue<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(initial: T, delay: Duration) -> Self {
        let (published, _) = watch::channel(initial.clone());
        Self {
            current: initial,
            published: Arc::new(published),
            debouncer: Debouncer::new(delay),
        }
    }

    /// Latest value set, published or not.
    pub fn current(&self) -> &T {
        &self.current
    }

    /// Value as of the last quiet period.
    pub fn value(&self) -> T {
        self.published.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.published.subscribe()
    }

    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    pub fn set(&mut self, value: T) {
        self.current = value.clone();
        let published = Arc::clone(&self.published);
        self.debouncer.call(move || {
            published.send_replace(value);
        });
    }

    /// Publish the current value now and drop the pending timer.
    pub fn flush(&mut self) {
        self.debouncer.cancel();
        self.published.send_replace(self.current.clone());
    }
}

/// A value published at most once per `interval`.
///
/// The first change after a quiet interval is published immediately; later
/// changes inside the interval collapse into one trailing publish.
#[derive(Debug)]
pub struct ThrottledValue<T> {
    interval: Duration,
    last_emit: Option<Instant>,
    published: Arc<watch::Sender<T>>,
    pending: Option<JoinHandle<()>>,
}

impl<T> ThrottledValue<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(initial: T, interval: Duration) -> Self {
        let (published, _) = watch::channel(initial);
        Self {
            interval,
            last_emit: None,
            published: Arc::new(published),
            pending: None,
        }
    }

    pub fn value(&self) -> T {
        self.published.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.published.subscribe()
    }

    pub fn set(&mut self, value: T) {
        let now = Instant::now();
        let next_slot = match self.pending.take() {
            // a superseded trailing publish keeps its slot
            Some(task) if !task.is_finished() => {
                task.abort();
                self.last_emit
            }
            _ => self.last_emit.map(|last| last + self.interval),
        };
        match next_slot {
            Some(slot) if slot > now => {
                let published = Arc::clone(&self.published);
                self.last_emit = Some(slot);
                self.pending = Some(tokio::spawn(async move {
                    sleep_until(slot).await;
                    published.send_replace(value);
                }));
            }
            _ => {
                self.last_emit = Some(now);
                self.published.send_replace(value);
            }
        }
    }
}

impl<T> Drop for ThrottledValue<T> {
    fn drop(&mut self) {
        if let Some(task) = self.pending.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn settle(duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_debouncer_runs_only_last_callback() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut debouncer = Debouncer::new(Duration::from_millis(300));

        for _ in 0..3 {
            let calls = calls.clone();
            debouncer.call(move || {
                calls.fetch_add(1, Ordering::SeqCst);
            });
            settle(Duration::from_millis(100)).await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        settle(Duration::from_millis(350)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debouncer_drop_cancels() {
        let calls = Arc::new(AtomicUsize::new(0));
        {
            let mut debouncer = Debouncer::new(Duration::from_millis(50));
            let calls = calls.clone();
            debouncer.call(move || {
                calls.fetch_add(1, Ordering::SeqCst);
            });
        }
        settle(Duration::from_millis(100)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounced_value_trails_edits() {
        let mut search = DebouncedValue::new(String::new(), Duration::from_millis(300));
        search.set("ad".into());
        search.set("ada".into());
        assert_eq!(search.current(), "ada");
        assert_eq!(search.value(), "");

        settle(Duration::from_millis(350)).await;
        assert_eq!(search.value(), "ada");
        assert!(!search.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounced_value_flush() {
        let mut search = DebouncedValue::new(0, Duration::from_secs(1));
        search.set(7);
        search.flush();
        assert_eq!(search.value(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttled_value_leading_and_trailing() {
        let mut position = ThrottledValue::new(0, Duration::from_millis(100));
        position.set(1);
        assert_eq!(position.value(), 1);

        position.set(2);
        position.set(3);
        assert_eq!(position.value(), 1);

        settle(Duration::from_millis(150)).await;
        assert_eq!(position.value(), 3);
    }
}
