//! # List Synchronization Manager
//!
//! The [`ListManager`] is a long-lived worker that keeps a remote
//! `app.bsky.graph.list` in step with a per-identity policy decision.
//!
//! ## Purpose
//! Producers observing identities (for example a change-stream consumer)
//! push candidates through the non-blocking [`ListManagerHandle::submit`].
//! The manager's single worker loop drains the queue, skips DIDs that are
//! already list members or recently got a negative decision, asks the
//! [`MembershipPolicy`] about the rest, and appends approved DIDs to the
//! remote list. A local mirror of the list's membership, rebuilt wholesale
//! on a periodic full refresh, keeps the remote service out of the hot
//! path.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use skymute_sets::{Did, DidSet};
use skymute_xrpc::{api, reduce_pages, AtUri, Page, XrpcError, XrpcTransport};

use crate::config::ListSyncConfig;
use crate::error::SyncError;

const PAGE_LIMIT: u32 = 100;

/// The add/skip decision made for each candidate identity.
///
/// The policy may perform its own I/O and may be slow; the manager imposes
/// no timeout. An error is logged and treated as a "skip" decision.
#[async_trait]
pub trait MembershipPolicy: Send + Sync {
    async fn should_add(&self, did: &str) -> anyhow::Result<bool>;
}

#[derive(Default)]
struct ListState {
    /// Local mirror of remote list membership. Authoritative until the
    /// next full refresh, which replaces it wholesale.
    mirror: DidSet,
    /// Timestamp of the last negative policy decision per DID.
    negative: HashMap<Did, Instant>,
}

fn lock(state: &Mutex<ListState>) -> MutexGuard<'_, ListState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A clonable handle for interacting with a running [`ListManager`].
#[derive(Clone)]
pub struct ListManagerHandle {
    queue_tx: mpsc::Sender<Did>,
    state: Arc<Mutex<ListState>>,
}

impl ListManagerHandle {
    /// Submits a candidate identity for evaluation.
    ///
    /// Best-effort and non-blocking: returns whether the candidate was
    /// accepted. Candidates are dropped when the queue is full or the
    /// manager has stopped; it is always safe to call.
    pub fn submit(&self, did: impl Into<Did>) -> bool {
        match self.queue_tx.try_send(did.into()) {
            Ok(()) => true,
            Err(TrySendError::Full(did)) => {
                tracing::debug!(%did, "candidate queue full, dropping");
                false
            }
            Err(TrySendError::Closed(did)) => {
                tracing::debug!(%did, "manager stopped, dropping candidate");
                false
            }
        }
    }

    /// Whether `did` is a member of the list according to the local mirror.
    pub fn is_member(&self, did: &str) -> bool {
        lock(&self.state).mirror.contains(did)
    }
}

/// The list synchronization worker.
///
/// Created together with its [`ListManagerHandle`]; the embedding
/// application spawns [`run`](ListManager::run) as a background task and
/// keeps only the handle.
pub struct ListManager<C> {
    list: AtUri,
    client: Arc<C>,
    policy: Arc<dyn MembershipPolicy>,
    config: ListSyncConfig,
    state: Arc<Mutex<ListState>>,
    queue_rx: mpsc::Receiver<Did>,
    token: CancellationToken,
}

impl<C: XrpcTransport> ListManager<C> {
    /// Creates a manager for the list at `list` (an `at://` URI) and its
    /// handle.
    pub fn new(
        list: &str,
        client: Arc<C>,
        policy: Arc<dyn MembershipPolicy>,
        config: ListSyncConfig,
        token: CancellationToken,
    ) -> Result<(Self, ListManagerHandle), SyncError> {
        let list: AtUri = list.parse()?;
        let (queue_tx, queue_rx) = mpsc::channel(config.queue_capacity.max(1));
        let state = Arc::new(Mutex::new(ListState::default()));

        let handle = ListManagerHandle {
            queue_tx,
            state: Arc::clone(&state),
        };
        let manager = Self {
            list,
            client,
            policy,
            config,
            state,
            queue_rx,
            token,
        };
        Ok((manager, handle))
    }

    /// Runs the worker until the governing token is cancelled.
    ///
    /// Bootstraps by refreshing the mirror (retrying with a fixed delay
    /// until it succeeds), then services refresh ticks and queued
    /// candidates from a single select loop. Cancellation is the only exit
    /// and is reported as [`SyncError::Cancelled`].
    pub async fn run(mut self) -> Result<(), SyncError> {
        loop {
            match self.refresh_mirror().await {
                Ok(()) => break,
                Err(err) => {
                    tracing::error!(list = %self.list, error = %err, "initial list refresh failed");
                    tokio::select! {
                        _ = self.token.cancelled() => return Err(SyncError::Cancelled),
                        _ = time::sleep(self.config.bootstrap_retry_delay()) => {}
                    }
                }
            }
        }
        tracing::info!(list = %self.list, "list synchronizer entering steady state");

        let period = self.config.list_refresh_interval();
        let mut refresh = time::interval_at(Instant::now() + period, period);
        refresh.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.token.cancelled() => {
                    tracing::info!(list = %self.list, "list synchronizer shutting down");
                    return Err(SyncError::Cancelled);
                }
                _ = refresh.tick() => {
                    match self.refresh_mirror().await {
                        Ok(()) => self.prune_negative_cache(),
                        Err(err) => {
                            tracing::error!(list = %self.list, error = %err, "failed to refresh list");
                        }
                    }
                }
                Some(did) = self.queue_rx.recv() => self.process_candidate(&did).await,
            }
        }
    }

    /// Rebuilds the local mirror from the remote list, end to end, and
    /// swaps it in wholesale.
    async fn refresh_mirror(&self) -> Result<(), XrpcError> {
        let members = reduce_pages(
            DidSet::new(),
            |cursor| {
                let list = self.list.to_string();
                async move {
                    let page =
                        api::get_list(self.client.as_ref(), &list, PAGE_LIMIT, cursor).await?;
                    Ok::<_, XrpcError>(Page {
                        items: page.items,
                        cursor: page.cursor,
                    })
                }
            },
            |mut acc, items| {
                acc.extend(items.into_iter().filter_map(|item| item.subject.map(|s| s.did)));
                acc
            },
        )
        .await?;

        tracing::debug!(list = %self.list, count = members.len(), "refreshed list mirror");
        lock(&self.state).mirror = members;
        Ok(())
    }

    async fn process_candidate(&self, did: &str) {
        let skip = {
            let state = lock(&self.state);
            state.mirror.contains(did)
                || state
                    .negative
                    .get(did)
                    .is_some_and(|at| at.elapsed() < self.config.check_result_expiration())
        };
        if skip {
            return;
        }

        let add = match self.policy.should_add(did).await {
            Ok(add) => add,
            Err(err) => {
                tracing::error!(%did, error = ?err, "policy check failed");
                false
            }
        };

        if add {
            if let Err(err) = api::create_list_item(self.client.as_ref(), &self.list, did).await {
                // Not cached either way: the candidate stays eligible for a
                // future submission.
                tracing::error!(%did, list = %self.list, error = %err, "failed to add entry to list");
                return;
            }
            tracing::debug!(%did, list = %self.list, "added to list");
            lock(&self.state).mirror.insert(did);
        } else {
            lock(&self.state).negative.insert(did.to_string(), Instant::now());
        }
    }

    /// Drops negative-cache entries that no longer suppress evaluation.
    fn prune_negative_cache(&self) {
        let expiration = self.config.check_result_expiration();
        let mut state = lock(&self.state);
        let before = state.negative.len();
        state.negative.retain(|_, at| at.elapsed() < expiration);
        let dropped = before - state.negative.len();
        if dropped > 0 {
            tracing::debug!(dropped, "pruned expired negative-cache entries");
        }
    }
}
