//! Lock-free license status shared between the engine and the host UI.
//!
//! The flags are independent atomics rather than a mutex-guarded struct:
//! readers are UI code on hot paths, and a snapshot assembled from five
//! separate loads is acceptable. A reader racing an engine operation may
//! briefly observe a partially-updated snapshot (e.g. a freshly raised
//! `online_validation_pending` next to a stale `active`); hosts poll, so
//! eventual consistency is sufficient.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;

use serde::Serialize;

/// Snapshot of the license state at a moment in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LicenseStatus {
    /// The license currently entitles the user to run the product.
    pub active: bool,
    pub trial: bool,
    /// The license was activated through the offline handshake.
    pub offline: bool,
    /// Online revalidation failed on the last check; the license is
    /// running on its grace period.
    pub online_validation_pending: bool,
    /// The grace period is exhausted; use should be blocked.
    pub offline_grace_period_exceeded: bool,
    /// Whole days until trial expiry, -1 when not a trial.
    pub trial_days_remaining: i64,
}

/// Atomic backing for [`LicenseStatus`].
#[derive(Debug)]
pub(crate) struct StatusFlags {
    active: AtomicBool,
    trial: AtomicBool,
    offline: AtomicBool,
    online_validation_pending: AtomicBool,
    offline_grace_period_exceeded: AtomicBool,
    trial_days_remaining: AtomicI64,
}

impl StatusFlags {
    pub fn new() -> Self {
        Self {
            active: AtomicBool::new(false),
            trial: AtomicBool::new(false),
            offline: AtomicBool::new(false),
            online_validation_pending: AtomicBool::new(false),
            offline_grace_period_exceeded: AtomicBool::new(false),
            trial_days_remaining: AtomicI64::new(-1),
        }
    }

    pub fn set_active(&self, value: bool) {
        self.active.store(value, Ordering::Release);
    }

    pub fn set_trial(&self, value: bool) {
        self.trial.store(value, Ordering::Release);
    }

    pub fn set_offline(&self, value: bool) {
        self.offline.store(value, Ordering::Release);
    }

    pub fn set_online_validation_pending(&self, value: bool) {
        self.online_validation_pending.store(value, Ordering::Release);
    }

    pub fn set_offline_grace_period_exceeded(&self, value: bool) {
        self.offline_grace_period_exceeded.store(value, Ordering::Release);
    }

    pub fn set_trial_days_remaining(&self, days: i64) {
        self.trial_days_remaining.store(days, Ordering::Release);
    }

    pub fn snapshot(&self) -> LicenseStatus {
        LicenseStatus {
            active: self.active.load(Ordering::Acquire),
            trial: self.trial.load(Ordering::Acquire),
            offline: self.offline.load(Ordering::Acquire),
            online_validation_pending: self.online_validation_pending.load(Ordering::Acquire),
            offline_grace_period_exceeded: self
                .offline_grace_period_exceeded
                .load(Ordering::Acquire),
            trial_days_remaining: self.trial_days_remaining.load(Ordering::Acquire),
        }
    }
}

/// Cloneable, any-thread handle onto the engine's status flags.
///
/// Hand one of these to the UI so it can poll without touching the engine.
#[derive(Debug, Clone)]
pub struct StatusView {
    flags: Arc<StatusFlags>,
}

impl StatusView {
    pub(crate) fn new(flags: Arc<StatusFlags>) -> Self {
        Self { flags }
    }

    pub fn get(&self) -> LicenseStatus {
        self.flags.snapshot()
    }
}
