//! Driver-wide operation counters.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counter storage shared by all clones of a driver.
#[derive(Debug, Default)]
pub(crate) struct DriverMetricsStorage {
    pub(crate) volumes_created: AtomicU64,
    pub(crate) volumes_removed: AtomicU64,
    pub(crate) links_created: AtomicU64,
    pub(crate) links_removed: AtomicU64,
    pub(crate) failed_operations: AtomicU64,
}

impl DriverMetricsStorage {
    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Read handle over the driver's monotonic counters.
///
/// Counters never reset; delta calculation is the caller's responsibility.
#[derive(Debug, Clone)]
pub struct DriverMetrics {
    storage: Arc<DriverMetricsStorage>,
}

impl DriverMetrics {
    pub(crate) fn new(storage: Arc<DriverMetricsStorage>) -> Self {
        Self { storage }
    }

    /// Volumes registered since startup (idempotent re-creates excluded).
    pub fn volumes_created_total(&self) -> u64 {
        self.storage.volumes_created.load(Ordering::Relaxed)
    }

    pub fn volumes_removed_total(&self) -> u64 {
        self.storage.volumes_removed.load(Ordering::Relaxed)
    }

    /// Physical links created (adopted links excluded).
    pub fn links_created_total(&self) -> u64 {
        self.storage.links_created.load(Ordering::Relaxed)
    }

    pub fn links_removed_total(&self) -> u64 {
        self.storage.links_removed.load(Ordering::Relaxed)
    }

    /// Operations that returned an error of any kind.
    pub fn failed_operations_total(&self) -> u64 {
        self.storage.failed_operations.load(Ordering::Relaxed)
    }
}
