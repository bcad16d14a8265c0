//! A background-refreshing cache around any set source.
//!
//! [`CachedSet`] owns exactly one refresh task per instance. The task pulls
//! a fresh snapshot immediately on creation and then once per refresh
//! period; readers wait only for the first snapshot ever (the readiness
//! gate) and afterwards get the latest snapshot or the latest failure
//! without touching the network. When the governing cancellation token
//! fires, the cache enters a terminal stopped state and every subsequent
//! read fails fast instead of serving stale data forever.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::set::DidSet;
use crate::source::{QueryableSource, SetError, SetSource, SharedSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Readiness {
    Pending,
    Ready,
    Stopped,
}

#[derive(Default)]
struct CacheState {
    entries: DidSet,
    last_error: Option<SetError>,
}

struct Shared {
    state: Mutex<CacheState>,
    ready: watch::Receiver<Readiness>,
}

fn lock(state: &Mutex<CacheState>) -> MutexGuard<'_, CacheState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A cache-coherent, queryable view over a set source.
///
/// Cloning yields another handle to the same cache; the background refresh
/// task runs once per [`CachedSet::spawn`] call, not per handle.
#[derive(Clone)]
pub struct CachedSet {
    shared: Arc<Shared>,
}

impl CachedSet {
    /// Wraps `source` with a refresh task bound to `token`, refreshing once
    /// immediately and then every `period`.
    pub fn spawn(token: CancellationToken, period: Duration, source: SharedSource) -> Self {
        let (ready_tx, ready_rx) = watch::channel(Readiness::Pending);
        let shared = Arc::new(Shared {
            state: Mutex::new(CacheState::default()),
            ready: ready_rx,
        });
        let task = RefreshTask {
            shared: Arc::clone(&shared),
            source,
            period,
            token,
            ready: ready_tx,
        };
        tokio::spawn(task.run());
        Self { shared }
    }

    /// Blocks until the first snapshot has ever been obtained, or fails if
    /// the refresh task has stopped.
    async fn wait_ready(&self) -> Result<(), SetError> {
        let mut ready = self.shared.ready.clone();
        let result = ready.wait_for(|r| *r != Readiness::Pending).await;
        match result {
            Ok(state) if *state == Readiness::Ready => Ok(()),
            _ => Err(SetError::Stopped("refresh task is gone")),
        }
    }
}

#[async_trait]
impl SetSource for CachedSet {
    async fn get_dids(&self) -> Result<DidSet, SetError> {
        self.wait_ready().await?;
        let state = lock(&self.shared.state);
        if let Some(err) = &state.last_error {
            return Err(err.clone());
        }
        Ok(state.entries.clone())
    }
}

#[async_trait]
impl QueryableSource for CachedSet {
    async fn contains(&self, did: &str) -> Result<bool, SetError> {
        self.wait_ready().await?;
        let state = lock(&self.shared.state);
        if let Some(err) = &state.last_error {
            return Err(err.clone());
        }
        Ok(state.entries.contains(did))
    }
}

struct RefreshTask {
    shared: Arc<Shared>,
    source: SharedSource,
    period: Duration,
    token: CancellationToken,
    ready: watch::Sender<Readiness>,
}

impl RefreshTask {
    async fn run(self) {
        let mut ticker = time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut marked_ready = false;
        let mut retry_at: Option<Instant> = None;

        loop {
            tokio::select! {
                _ = self.token.cancelled() => {
                    lock(&self.shared.state).last_error =
                        Some(SetError::Stopped("refresh task cancelled"));
                    let _ = self.ready.send(Readiness::Stopped);
                    tracing::debug!("cached set refresh task exiting");
                    return;
                }
                _ = ticker.tick() => {}
                _ = wait_until(retry_at) => {
                    retry_at = None;
                }
            }

            match self.source.get_dids().await {
                Ok(entries) => {
                    tracing::debug!(count = entries.len(), "refreshed cached set");
                    let mut state = lock(&self.shared.state);
                    state.entries = entries;
                    state.last_error = None;
                    drop(state);
                    if !marked_ready {
                        marked_ready = true;
                        let _ = self.ready.send(Readiness::Ready);
                    }
                }
                Err(err) => {
                    tracing::warn!(error = %err, "failed to refresh cached set");
                    if let Some(reset) = err.throttle_reset() {
                        // Throttled: wake up once more at the reset time
                        // instead of waiting out a full period.
                        let delay = (reset - Utc::now()).to_std().unwrap_or(Duration::ZERO);
                        retry_at = Some(Instant::now() + delay);
                        tracing::debug!(
                            delay_secs = delay.as_secs(),
                            "scheduling extra refresh at rate-limit reset"
                        );
                    }
                    lock(&self.shared.state).last_error = Some(err);
                }
            }
        }
    }
}

async fn wait_until(at: Option<Instant>) {
    match at {
        Some(at) => time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// Decorates `source` with a background-refreshing cache bound to a child
/// of `token`.
pub fn cached(token: &CancellationToken, period: Duration, source: SharedSource) -> SharedSource {
    Arc::new(CachedSet::spawn(token.child_token(), period, source))
}

/// Decorates each source with its own independent cache.
pub fn cached_each(
    token: &CancellationToken,
    period: Duration,
    sources: Vec<SharedSource>,
) -> Vec<SharedSource> {
    sources
        .into_iter()
        .map(|source| cached(token, period, source))
        .collect()
}
