//! Process resource samples

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One memory sample taken by the resource monitor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceStatus {
    /// Resident memory of this process in bytes
    pub process_memory_bytes: u64,

    /// Memory in use on the host, in MB
    pub system_used_memory_mb: u64,

    /// Total host memory, in MB
    pub system_total_memory_mb: u64,

    /// When the sample was taken
    pub timestamp: DateTime<Utc>,
}

impl ResourceStatus {
    pub const fn process_memory_mb(&self) -> u64 {
        self.process_memory_bytes / 1024 / 1024
    }
}
