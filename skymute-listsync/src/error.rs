use thiserror::Error;

use skymute_xrpc::AtUriError;

/// Errors surfaced by the list synchronization manager.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The governing cancellation token fired; this is the manager's only
    /// exit status.
    #[error("list synchronizer cancelled")]
    Cancelled,

    #[error("invalid list uri: {0}")]
    Uri(#[from] AtUriError),
}
