//! Lazy combinators over set sources.
//!
//! Combinators are themselves sources: nothing is fetched at construction
//! time, and every evaluation re-pulls all operands. Operands of `union`
//! and `intersection` are evaluated concurrently; a failing operand fails
//! the whole evaluation (lowest index wins) and no partial result escapes.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future;

use crate::set::{Did, DidSet};
use crate::source::{QueryableSource, SetError, SetSource, SharedSource};

struct Union {
    sources: Vec<SharedSource>,
}

#[async_trait]
impl SetSource for Union {
    async fn get_dids(&self) -> Result<DidSet, SetError> {
        let results = future::join_all(self.sources.iter().map(|s| s.get_dids())).await;

        let mut out = DidSet::new();
        for (index, result) in results.into_iter().enumerate() {
            let entries = result.map_err(|err| SetError::operand("union", index, err))?;
            out.extend(entries);
        }
        tracing::debug!(count = out.len(), "union evaluated");
        Ok(out)
    }
}

/// A source yielding every DID present in at least one of `sources`.
pub fn union(sources: Vec<SharedSource>) -> SharedSource {
    Arc::new(Union { sources })
}

struct Difference {
    left: SharedSource,
    right: SharedSource,
}

#[async_trait]
impl SetSource for Difference {
    async fn get_dids(&self) -> Result<DidSet, SetError> {
        let mut out = self
            .left
            .get_dids()
            .await
            .map_err(|err| SetError::side("left", err))?;
        let right = self
            .right
            .get_dids()
            .await
            .map_err(|err| SetError::side("right", err))?;

        for did in &right {
            out.remove(did);
        }
        tracing::debug!(count = out.len(), "difference evaluated");
        Ok(out)
    }
}

/// A source yielding the DIDs of `left` that are not in `right`.
pub fn difference(left: SharedSource, right: SharedSource) -> SharedSource {
    Arc::new(Difference { left, right })
}

struct Intersection {
    sources: Vec<SharedSource>,
}

#[async_trait]
impl SetSource for Intersection {
    async fn get_dids(&self) -> Result<DidSet, SetError> {
        if self.sources.is_empty() {
            return Ok(DidSet::new());
        }

        let results = future::join_all(self.sources.iter().map(|s| s.get_dids())).await;
        let mut sets = Vec::with_capacity(results.len());
        for (index, result) in results.into_iter().enumerate() {
            sets.push(result.map_err(|err| SetError::operand("intersection", index, err))?);
        }

        let mut out = sets[0].clone();
        out.retain(|did| sets.iter().all(|set| set.contains(did)));
        tracing::debug!(count = out.len(), "intersection evaluated");
        Ok(out)
    }
}

/// A source yielding the DIDs present in every one of `sources`.
///
/// With no operands the result is the empty set.
pub fn intersection(sources: Vec<SharedSource>) -> SharedSource {
    Arc::new(Intersection { sources })
}

/// An in-memory source wrapping a fixed set of DIDs.
///
/// The queryable leaf of the algebra: membership is a direct lookup and
/// evaluation clones the stored set.
#[derive(Debug, Clone, Default)]
pub struct FixedSet {
    entries: DidSet,
}

impl FixedSet {
    pub fn new(entries: DidSet) -> Self {
        Self { entries }
    }

    pub fn from_dids<I>(dids: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Did>,
    {
        Self {
            entries: dids.into_iter().collect(),
        }
    }
}

#[async_trait]
impl SetSource for FixedSet {
    async fn get_dids(&self) -> Result<DidSet, SetError> {
        Ok(self.entries.clone())
    }
}

#[async_trait]
impl QueryableSource for FixedSet {
    async fn contains(&self, did: &str) -> Result<bool, SetError> {
        Ok(self.entries.contains(did))
    }
}

/// Convenience constructor for a shared [`FixedSet`].
pub fn fixed<I>(dids: I) -> SharedSource
where
    I: IntoIterator,
    I::Item: Into<Did>,
{
    Arc::new(FixedSet::from_dids(dids))
}
