//! Snapshot publication over a watch channel

use crate::snapshot::VehicleSnapshot;
use std::sync::Arc;
use tokio::sync::watch;

/// Single owner of the current snapshot. Writers mutate it in place under
/// the channel's lock; readers always get a whole, consistent copy.
#[derive(Clone)]
pub struct SnapshotPublisher {
    tx: Arc<watch::Sender<VehicleSnapshot>>,
}

impl SnapshotPublisher {
    pub fn new(initial: VehicleSnapshot) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// Apply `f` to the current snapshot and notify subscribers
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut VehicleSnapshot),
    {
        self.tx.send_modify(f);
    }

    /// Copy of the current snapshot
    pub fn latest(&self) -> VehicleSnapshot {
        self.tx.borrow().clone()
    }

    /// Receiver woken on every update
    pub fn subscribe(&self) -> watch::Receiver<VehicleSnapshot> {
        self.tx.subscribe()
    }
}

impl Default for SnapshotPublisher {
    fn default() -> Self {
        Self::new(VehicleSnapshot::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_without_subscribers() {
        let publisher = SnapshotPublisher::default();
        publisher.update(|s| s.rpm = 5500);
        assert_eq!(publisher.latest().rpm, 5500);
    }

    #[tokio::test]
    async fn test_subscriber_sees_whole_update() {
        let publisher = SnapshotPublisher::default();
        let mut rx = publisher.subscribe();

        let writer = publisher.clone();
        tokio::spawn(async move {
            writer.update(|s| {
                s.rpm = 9000;
                s.fuel_percent = 42.0;
            });
        });

        rx.changed().await.unwrap();
        let seen = rx.borrow_and_update().clone();
        assert_eq!(seen.rpm, 9000);
        assert_eq!(seen.fuel_percent, 42.0);
    }

    #[tokio::test]
    async fn test_latest_is_a_copy() {
        let publisher = SnapshotPublisher::default();
        let before = publisher.latest();
        publisher.update(|s| s.lap_count = 3);
        assert_eq!(before.lap_count, 0);
        assert_eq!(publisher.latest().lap_count, 3);
    }
}
