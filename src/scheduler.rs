//! Timers driving the panel: the per-mint refresh loop and trailing debounces.

use crate::types::TokenAddress;
use std::future::Future;
use std::ops::ControlFlow;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::debug;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Spawn a loop calling `tick` every `period`, first after one full period.
/// The loop ends when `tick` breaks or the task is aborted. A slow tick
/// delays the next one instead of bursting to catch up.
pub fn spawn_periodic<F, Fut>(period: Duration, mut tick: F) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ControlFlow<()>> + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if tick().await.is_break() {
                break;
            }
        }
    })
}

struct ArmedTimer {
    mint: TokenAddress,
    handle: JoinHandle<()>,
}

/// At most one refresh loop, bound to one mint.
pub struct RefreshScheduler {
    interval: Duration,
    active: Mutex<Option<ArmedTimer>>,
}

impl RefreshScheduler {
    pub fn new(interval: Duration) -> Self {
        Self { interval, active: Mutex::new(None) }
    }

    /// Start refreshing `mint`, cancelling any previous loop first.
    pub fn arm<F, Fut>(&self, mint: TokenAddress, tick: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ControlFlow<()>> + Send + 'static,
    {
        let mut active = lock(&self.active);
        if let Some(previous) = active.take() {
            previous.handle.abort();
        }
        debug!("Refresh armed for {} every {:?}", mint, self.interval);
        let handle = spawn_periodic(self.interval, tick);
        *active = Some(ArmedTimer { mint, handle });
    }

    pub fn cancel(&self) {
        if let Some(previous) = lock(&self.active).take() {
            debug!("Refresh cancelled for {}", previous.mint);
            previous.handle.abort();
        }
    }

    /// Mint of the running loop, if one is still running.
    pub fn armed_mint(&self) -> Option<TokenAddress> {
        lock(&self.active)
            .as_ref()
            .filter(|t| !t.handle.is_finished())
            .map(|t| t.mint.clone())
    }

    pub fn is_armed(&self) -> bool {
        self.armed_mint().is_some()
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Trailing-edge debounce: only the last job scheduled within `delay` runs.
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self { delay, pending: Mutex::new(None) }
    }

    pub fn schedule<F>(&self, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let delay = self.delay;
        let mut pending = lock(&self.pending);
        if let Some(previous) = pending.take() {
            previous.abort();
        }
        *pending = Some(tokio::spawn(async move {
            time::sleep(delay).await;
            job.await;
        }));
    }

    pub fn cancel(&self) {
        if let Some(previous) = lock(&self.pending).take() {
            previous.abort();
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn mint() -> TokenAddress {
        TokenAddress::parse("7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU").unwrap()
    }

    fn counting_tick(count: Arc<AtomicUsize>) -> impl FnMut() -> std::future::Ready<ControlFlow<()>> {
        move || {
            count.fetch_add(1, Ordering::SeqCst);
            std::future::ready(ControlFlow::Continue(()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_ticks_at_interval() {
        let count = Arc::new(AtomicUsize::new(0));
        let scheduler = RefreshScheduler::new(Duration::from_millis(1500));
        scheduler.arm(mint(), counting_tick(count.clone()));

        time::sleep(Duration::from_millis(1400)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        time::sleep(Duration::from_millis(3200)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert_eq!(scheduler.armed_mint(), Some(mint()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_replaces_previous_loop() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let scheduler = RefreshScheduler::new(Duration::from_secs(1));

        scheduler.arm(mint(), counting_tick(first.clone()));
        time::sleep(Duration::from_millis(1500)).await;
        scheduler.arm(mint(), counting_tick(second.clone()));
        time::sleep(Duration::from_millis(2500)).await;

        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_and_break() {
        let scheduler = RefreshScheduler::new(Duration::from_secs(1));
        scheduler.arm(mint(), || std::future::ready(ControlFlow::Break(())));
        time::sleep(Duration::from_millis(1100)).await;
        assert!(!scheduler.is_armed());

        let count = Arc::new(AtomicUsize::new(0));
        scheduler.arm(mint(), counting_tick(count.clone()));
        scheduler.cancel();
        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(scheduler.armed_mint().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_debouncer_runs_last_job_only() {
        let count = Arc::new(AtomicUsize::new(0));
        let debouncer = Debouncer::new(Duration::from_millis(500));

        for _ in 0..5 {
            let count = count.clone();
            debouncer.schedule(async move {
                count.fetch_add(1, Ordering::SeqCst);
            });
            time::sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(count.load(Ordering::SeqCst), 0);

        time::sleep(Duration::from_millis(500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
