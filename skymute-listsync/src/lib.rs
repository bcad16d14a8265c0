//! Concurrent synchronization of a remote list against a membership policy.
//!
//! This crate provides the [`ListManager`], a single-worker service that
//! consumes a stream of candidate DIDs, decides per candidate whether it
//! belongs on a remote `app.bsky.graph.list`, and reconciles that decision
//! against the remote list while avoiding redundant remote calls.
//!
//! # Key Components
//!
//! *   [`ListManager`]: The worker. Owns a local mirror of list membership
//!     (rebuilt wholesale on a periodic full refresh) and a negative-result
//!     cache that suppresses re-evaluation of recently rejected DIDs.
//! *   [`ListManagerHandle`]: A clonable handle offering the non-blocking
//!     [`submit`](ListManagerHandle::submit) entrypoint for producers and a
//!     mirror-backed [`is_member`](ListManagerHandle::is_member) query.
//! *   [`MembershipPolicy`]: The pluggable add/skip decision, supplied by
//!     the embedding application.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use tokio_util::sync::CancellationToken;
//!
//! use skymute_listsync::{ListManager, ListSyncConfig, MembershipPolicy};
//! use skymute_xrpc::{Credentials, XrpcClient};
//!
//! struct Everyone;
//!
//! #[async_trait]
//! impl MembershipPolicy for Everyone {
//!     async fn should_add(&self, _did: &str) -> anyhow::Result<bool> {
//!         Ok(true)
//!     }
//! }
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let client = Arc::new(XrpcClient::with_credentials(
//!     "https://bsky.social",
//!     Credentials {
//!         identifier: "example.bsky.social".into(),
//!         password: "app-password".into(),
//!     },
//! ));
//! let token = CancellationToken::new();
//! let (manager, handle) = ListManager::new(
//!     "at://did:plc:abc123/app.bsky.graph.list/3kxyz",
//!     client,
//!     Arc::new(Everyone),
//!     ListSyncConfig::default(),
//!     token.clone(),
//! )?;
//! tokio::spawn(manager.run());
//!
//! // Producers feed the manager as identities are observed.
//! handle.submit("did:plc:someone");
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod manager;

pub use config::ListSyncConfig;
pub use error::SyncError;
pub use manager::{ListManager, ListManagerHandle, MembershipPolicy};
