//! Live view model shared by all dashboard panels
//!
//! Owns a panel's refresh cycle:
//! - initial load when the panel is attached to a session
//! - manual refresh
//! - periodic auto-refresh while live mode is on
//! - loading/error state published to renderers through a watch channel
//!
//! Every refresh takes a sequence number. Only the response to the most
//! recently issued refresh is applied; anything older that completes late is
//! dropped, so a slow response can never roll the panel back to stale data.

use chrono::{DateTime, Utc};
use opsdeck_common::{RetryConfig, SessionContext};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::error::ApiError;

/// Something a panel can load a snapshot from
pub trait PanelSource: Send + Sync + 'static {
    type Snapshot: Send + Sync + 'static;

    /// Short name used in log lines
    fn name(&self) -> &'static str;

    /// Load one complete snapshot for the given subject (active event id)
    fn load(
        &self,
        subject: Option<u64>,
    ) -> impl Future<Output = Result<Self::Snapshot, ApiError>> + Send;
}

/// Everything a renderer needs to draw a panel
#[derive(Debug)]
pub struct PanelState<T> {
    /// Last successfully loaded snapshot
    pub data: Option<Arc<T>>,
    pub is_loading: bool,
    pub is_live: bool,
    /// Error from the latest refresh, cleared by the next success
    pub last_error: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
    /// Sequence number of the refresh that produced `data`
    pub applied_seq: u64,
}

impl<T> Default for PanelState<T> {
    fn default() -> Self {
        Self {
            data: None,
            is_loading: false,
            is_live: false,
            last_error: None,
            last_updated: None,
            applied_seq: 0,
        }
    }
}

impl<T> Clone for PanelState<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            is_loading: self.is_loading,
            is_live: self.is_live,
            last_error: self.last_error.clone(),
            last_updated: self.last_updated,
            applied_seq: self.applied_seq,
        }
    }
}

struct Inner<S: PanelSource> {
    source: S,
    state: watch::Sender<PanelState<S::Snapshot>>,
    issued_seq: AtomicU64,
    in_flight: AtomicUsize,
    attached: AtomicBool,
    subject: Mutex<Option<u64>>,
    timer: Mutex<Option<JoinHandle<()>>>,
    refresh_interval: Duration,
    retry: RetryConfig,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<S: PanelSource> Inner<S> {
    fn current_subject(&self) -> Option<u64> {
        *lock(&self.subject)
    }

    fn is_current(&self, seq: u64) -> bool {
        self.issued_seq.load(Ordering::SeqCst) == seq
    }

    fn stop_timer(&self) {
        if let Some(handle) = lock(&self.timer).take() {
            handle.abort();
        }
    }

    async fn load_with_retry(
        &self,
        seq: u64,
        subject: Option<u64>,
    ) -> Result<S::Snapshot, ApiError> {
        let mut attempt = 1;
        loop {
            match self.source.load(subject).await {
                Ok(snapshot) => return Ok(snapshot),
                Err(e) if e.is_retryable() && attempt < self.retry.max_attempts => {
                    if !self.is_current(seq) {
                        return Err(e);
                    }
                    let delay = self.retry.backoff_for(attempt);
                    log::debug!(
                        "{}: attempt {} failed ({}), retrying in {:?}",
                        self.source.name(),
                        attempt,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl<S: PanelSource> Drop for Inner<S> {
    fn drop(&mut self) {
        self.stop_timer();
    }
}

/// Keeps `is_loading` true while at least one refresh is running
///
/// Dropping the guard (on success, error, or cancellation of the refresh
/// future) recomputes the flag from the in-flight counter.
struct LoadingGuard<'a, S: PanelSource> {
    inner: &'a Inner<S>,
}

impl<'a, S: PanelSource> LoadingGuard<'a, S> {
    fn new(inner: &'a Inner<S>) -> Self {
        inner.in_flight.fetch_add(1, Ordering::SeqCst);
        inner
            .state
            .send_modify(|s| s.is_loading = inner.in_flight.load(Ordering::SeqCst) > 0);
        Self { inner }
    }
}

impl<S: PanelSource> Drop for LoadingGuard<'_, S> {
    fn drop(&mut self) {
        let inner = self.inner;
        inner.in_flight.fetch_sub(1, Ordering::SeqCst);
        inner
            .state
            .send_modify(|s| s.is_loading = inner.in_flight.load(Ordering::SeqCst) > 0);
    }
}

/// Refresh coordinator for one panel
///
/// Clones share the same state. Live mode needs a running tokio runtime.
pub struct LiveViewModel<S: PanelSource> {
    inner: Arc<Inner<S>>,
}

impl<S: PanelSource> Clone for LiveViewModel<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: PanelSource> LiveViewModel<S> {
    pub fn new(source: S, refresh_interval: Duration, retry: RetryConfig) -> Self {
        let (state, _) = watch::channel(PanelState::default());
        Self {
            inner: Arc::new(Inner {
                source,
                state,
                issued_seq: AtomicU64::new(0),
                in_flight: AtomicUsize::new(0),
                attached: AtomicBool::new(false),
                subject: Mutex::new(None),
                timer: Mutex::new(None),
                refresh_interval,
                retry,
            }),
        }
    }

    /// Point-in-time copy of the panel state
    pub fn state(&self) -> PanelState<S::Snapshot> {
        self.inner.state.borrow().clone()
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<PanelState<S::Snapshot>> {
        self.inner.state.subscribe()
    }

    pub fn is_live(&self) -> bool {
        self.inner.state.borrow().is_live
    }

    pub fn subject(&self) -> Option<u64> {
        self.inner.current_subject()
    }

    /// Bind the panel to a session and load it
    ///
    /// Re-attaching with an unchanged active event is a no-op. A changed
    /// event reloads immediately and restarts the live timer.
    pub async fn attach(&self, session: &SessionContext) {
        let subject = session.active_event_id();
        let changed = {
            let mut current = lock(&self.inner.subject);
            let was_attached = self.inner.attached.swap(true, Ordering::SeqCst);
            let changed = !was_attached || *current != subject;
            *current = subject;
            changed
        };

        if !changed {
            return;
        }

        log::debug!("{}: attached (event {:?})", self.inner.source.name(), subject);
        if self.is_live() {
            self.start_timer();
        }
        self.refresh().await;
    }

    /// Stop the timer and ignore any response still in flight
    pub fn detach(&self) {
        self.inner.stop_timer();
        self.inner.attached.store(false, Ordering::SeqCst);
        self.inner.issued_seq.fetch_add(1, Ordering::SeqCst);
        self.inner.state.send_modify(|s| s.is_live = false);
        log::debug!("{}: detached (event {:?})", self.inner.source.name(), self.subject());
    }

    /// Turn auto-refresh on or off
    pub fn set_live(&self, live: bool) {
        self.inner.state.send_modify(|s| s.is_live = live);
        if live {
            self.start_timer();
        } else {
            self.inner.stop_timer();
        }
    }

    /// Load a fresh snapshot and apply it if no newer refresh was issued
    ///
    /// Failures keep the previous snapshot and set `last_error`.
    pub async fn refresh(&self) {
        let inner = &*self.inner;
        let seq = inner.issued_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let subject = inner.current_subject();
        let _loading = LoadingGuard::new(inner);

        let result = inner.load_with_retry(seq, subject).await;

        if !inner.is_current(seq) {
            log::debug!("{}: dropping stale response #{}", inner.source.name(), seq);
            return;
        }

        match result {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                inner.state.send_modify(|s| {
                    s.data = Some(snapshot);
                    s.last_error = None;
                    s.last_updated = Some(Utc::now());
                    s.applied_seq = seq;
                });
            }
            Err(e) => {
                log::warn!("{}: refresh failed: {}", inner.source.name(), e);
                inner.state.send_modify(|s| s.last_error = Some(e.to_string()));
            }
        }
    }

    fn start_timer(&self) {
        let weak: Weak<Inner<S>> = Arc::downgrade(&self.inner);
        let period = self.inner.refresh_interval;

        // Ticks spawn their refresh so stopping the timer never cancels one
        // that is already running; a tick is skipped while the last is busy.
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut running: Option<JoinHandle<()>> = None;
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                if running.as_ref().is_some_and(|task| !task.is_finished()) {
                    log::debug!("{}: refresh still running, skipping tick", inner.source.name());
                    continue;
                }
                running = Some(tokio::spawn(async move {
                    LiveViewModel { inner }.refresh().await;
                }));
            }
        });

        if let Some(previous) = lock(&self.inner.timer).replace(handle) {
            previous.abort();
        }
    }
}
