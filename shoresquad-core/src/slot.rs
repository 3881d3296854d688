//! The single current snapshot, replaced whole and only by the latest refresh.

use parking_lot::RwLock;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use crate::model::WeatherSnapshot;

/// Proof that a refresh was issued, stamped with its sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RefreshTicket(u64);

impl RefreshTicket {
    pub fn sequence(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Default)]
pub struct SnapshotSlot {
    issued: AtomicU64,
    current: RwLock<Option<Arc<WeatherSnapshot>>>,
}

impl SnapshotSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp a new refresh. Any ticket issued earlier becomes stale.
    pub fn begin_refresh(&self) -> RefreshTicket {
        RefreshTicket(self.issued.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn latest_issued(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }

    /// Replace the current snapshot if `ticket` is still the latest issued and
    /// return the installed snapshot. A stale ticket yields `None` and leaves
    /// the current snapshot alone.
    pub fn publish(
        &self,
        ticket: RefreshTicket,
        snapshot: WeatherSnapshot,
    ) -> Option<Arc<WeatherSnapshot>> {
        let mut current = self.current.write();
        let latest = self.latest_issued();
        if ticket.0 != latest {
            tracing::warn!(
                sequence = ticket.0,
                latest,
                "discarding result of superseded refresh"
            );
            return None;
        }
        let installed = Arc::new(snapshot);
        *current = Some(Arc::clone(&installed));
        Some(installed)
    }

    /// Install a snapshot that did not come from a refresh (e.g. one restored from cache).
    /// Ignored once any refresh has been issued.
    pub fn seed(&self, snapshot: WeatherSnapshot) -> bool {
        let mut current = self.current.write();
        if self.latest_issued() != 0 || current.is_some() {
            return false;
        }
        *current = Some(Arc::new(snapshot));
        true
    }

    pub fn current(&self) -> Option<Arc<WeatherSnapshot>> {
        self.current.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::fallback_snapshot;
    use chrono::{Duration, Utc};

    fn snapshot_with_temp(temperature: f64) -> WeatherSnapshot {
        WeatherSnapshot {
            temperature,
            ..fallback_snapshot(Utc::now())
        }
    }

    #[test]
    fn tickets_are_monotonic() {
        let slot = SnapshotSlot::new();
        let a = slot.begin_refresh();
        let b = slot.begin_refresh();
        assert!(b > a);
        assert_eq!(slot.latest_issued(), b.sequence());
    }

    #[test]
    fn late_older_refresh_is_discarded() {
        let slot = SnapshotSlot::new();
        let a = slot.begin_refresh();
        let b = slot.begin_refresh();

        assert!(slot.publish(b, snapshot_with_temp(31.0)).is_some());
        assert!(slot.publish(a, snapshot_with_temp(25.0)).is_none());

        assert_eq!(slot.current().map(|s| s.temperature), Some(31.0));
    }

    #[test]
    fn older_refresh_is_discarded_even_if_it_lands_first() {
        let slot = SnapshotSlot::new();
        let a = slot.begin_refresh();
        let b = slot.begin_refresh();

        assert!(slot.publish(a, snapshot_with_temp(25.0)).is_none());
        assert!(slot.current().is_none());
        assert!(slot.publish(b, snapshot_with_temp(31.0)).is_some());
        assert_eq!(slot.current().map(|s| s.temperature), Some(31.0));
    }

    #[test]
    fn readers_keep_their_snapshot_after_replacement() {
        let slot = SnapshotSlot::new();
        let first = slot.begin_refresh();
        slot.publish(first, snapshot_with_temp(27.0));
        let held = slot.current().expect("snapshot");

        let second = slot.begin_refresh();
        slot.publish(second, snapshot_with_temp(30.0));

        assert_eq!(held.temperature, 27.0);
        assert_eq!(slot.current().map(|s| s.temperature), Some(30.0));
    }

    #[test]
    fn publish_returns_the_snapshot_it_installed() {
        let slot = SnapshotSlot::new();
        let first = slot.begin_refresh();
        let installed = slot.publish(first, snapshot_with_temp(28.5)).expect("installed");

        // a later refresh replacing the slot does not change what this one got back
        let second = slot.begin_refresh();
        slot.publish(second, snapshot_with_temp(30.0));

        assert_eq!(installed.temperature, 28.5);
        assert_eq!(slot.current().map(|s| s.temperature), Some(30.0));
    }

    #[test]
    fn seed_only_fills_an_untouched_slot() {
        let slot = SnapshotSlot::new();
        let cached = WeatherSnapshot {
            captured_at: Utc::now() - Duration::minutes(10),
            ..snapshot_with_temp(26.0)
        };
        assert!(slot.seed(cached.clone()));
        assert!(!slot.seed(cached));

        let fresh = SnapshotSlot::new();
        let _ticket = fresh.begin_refresh();
        assert!(!fresh.seed(snapshot_with_temp(26.0)));
    }
}
