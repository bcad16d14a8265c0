//! Composable, lazily-evaluated set membership for atproto identities.
//!
//! This crate answers questions of the form "is this DID currently in that
//! remotely-hosted set" without hammering the remote service. Sets are
//! modeled as pull-based [`SetSource`]s producing point-in-time snapshots;
//! sources compose through lazy algebra combinators and gain cache
//! coherence through a background-refreshing decorator.
//!
//! # Key Components
//!
//! *   [`DidSet`]: The snapshot value type, a set of DIDs with
//!     value-semantics cloning.
//! *   [`SetSource`] / [`QueryableSource`]: The pull-based snapshot
//!     capability and its point-lookup extension.
//! *   [`algebra`]: `union`, `difference`, `intersection` combinators plus
//!     the in-memory [`algebra::FixedSet`] leaf. Every evaluation re-pulls
//!     all operands.
//! *   [`cache::CachedSet`]: Wraps any source with a background refresh
//!     task, a one-time readiness gate, and rate-limit-aware retry, turning
//!     it into a queryable view that never performs I/O on the read path.
//! *   [`remote`]: Sources backed by a PDS: blocked accounts, followers of
//!     an actor, members of a list.

/// Lazy combinators over set sources.
pub mod algebra;
/// The background-refreshing caching decorator.
pub mod cache;
/// PDS-backed set sources.
pub mod remote;
mod set;
mod source;

pub use set::{Did, DidSet};
pub use source::{QueryableSource, SetError, SetSource, SharedSource};
