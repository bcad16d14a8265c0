use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use skymute_xrpc::XrpcError;

use crate::set::DidSet;

/// A capability producing a point-in-time snapshot of a set of DIDs.
///
/// Every call is a fresh, independent evaluation: implementations may
/// perform I/O and must not assume callers cache results. Wrap a source in
/// [`crate::cache::CachedSet`] when repeated evaluation is too expensive.
#[async_trait]
pub trait SetSource: Send + Sync {
    async fn get_dids(&self) -> Result<DidSet, SetError>;
}

/// A source that can answer point-membership without recomputing the whole
/// snapshot.
#[async_trait]
pub trait QueryableSource: SetSource {
    /// Whether `did` is in the snapshot [`SetSource::get_dids`] would return.
    async fn contains(&self, did: &str) -> Result<bool, SetError>;
}

/// A shareable, composable source handle.
pub type SharedSource = Arc<dyn SetSource>;

#[async_trait]
impl SetSource for SharedSource {
    async fn get_dids(&self) -> Result<DidSet, SetError> {
        self.as_ref().get_dids().await
    }
}

/// Errors produced while evaluating a set source.
///
/// The enum is `Clone` so a caching layer can hand the most recent failure
/// to every reader.
#[derive(Debug, Clone, Error)]
pub enum SetError {
    /// An operand of a multi-operand combinator failed.
    #[error("evaluating operand {index} of {op}: {source}")]
    Operand {
        op: &'static str,
        index: usize,
        #[source]
        source: Box<SetError>,
    },

    /// One side of a difference failed.
    #[error("evaluating {side} side of a difference: {source}")]
    Side {
        side: &'static str,
        #[source]
        source: Box<SetError>,
    },

    #[error(transparent)]
    Xrpc(Arc<XrpcError>),

    /// The background task backing this source has stopped; the source will
    /// never produce data again.
    #[error("set source stopped: {0}")]
    Stopped(&'static str),
}

impl SetError {
    pub(crate) fn operand(op: &'static str, index: usize, source: SetError) -> Self {
        SetError::Operand {
            op,
            index,
            source: Box::new(source),
        }
    }

    pub(crate) fn side(side: &'static str, source: SetError) -> Self {
        SetError::Side {
            side,
            source: Box::new(source),
        }
    }

    /// If the underlying failure was an upstream throttle carrying a reset
    /// time, returns that time.
    pub fn throttle_reset(&self) -> Option<DateTime<Utc>> {
        match self {
            SetError::Operand { source, .. } | SetError::Side { source, .. } => {
                source.throttle_reset()
            }
            SetError::Xrpc(err) => err.throttle_reset(),
            SetError::Stopped(_) => None,
        }
    }
}

impl From<XrpcError> for SetError {
    fn from(err: XrpcError) -> Self {
        SetError::Xrpc(Arc::new(err))
    }
}
