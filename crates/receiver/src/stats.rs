use std::sync::{Mutex, PoisonError};

use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub total_uploads: u64,
    pub total_bytes: u64,
    pub failed_auth: u64,
    /// Unix seconds of the last accepted upload.
    pub last_upload: Option<i64>,
}

/// Per-process upload counters, shown on the service info endpoint.
#[derive(Debug, Default)]
pub struct UploadStats(Mutex<StatsSnapshot>);

impl UploadStats {
    pub fn record_upload(&self, size: u64, now: i64) {
        let mut stats = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        stats.total_uploads += 1;
        stats.total_bytes += size;
        stats.last_upload = Some(now);
    }

    pub fn record_failed_auth(&self) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).failed_auth += 1;
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}
