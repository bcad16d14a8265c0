#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use std::time::Duration;

/// Behavior of a [`crate::ListManager`].
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub struct ListSyncConfig {
    /// How long a negative policy decision suppresses re-evaluation of the
    /// same DID, in seconds.
    pub check_result_expiration_secs: u64,
    /// Interval between full refreshes of the remote list, in seconds.
    pub list_refresh_interval_secs: u64,
    /// Delay between attempts of the initial full refresh, in seconds.
    pub bootstrap_retry_delay_secs: u64,
    /// Capacity of the bounded candidate queue. Submissions to a full
    /// queue are dropped.
    pub queue_capacity: usize,
}

impl ListSyncConfig {
    pub fn check_result_expiration(&self) -> Duration {
        Duration::from_secs(self.check_result_expiration_secs)
    }

    pub fn list_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.list_refresh_interval_secs)
    }

    pub fn bootstrap_retry_delay(&self) -> Duration {
        Duration::from_secs(self.bootstrap_retry_delay_secs)
    }
}

impl Default for ListSyncConfig {
    fn default() -> Self {
        Self {
            check_result_expiration_secs: 24 * 60 * 60,
            list_refresh_interval_secs: 30 * 60,
            bootstrap_retry_delay_secs: 5,
            queue_capacity: 50,
        }
    }
}
