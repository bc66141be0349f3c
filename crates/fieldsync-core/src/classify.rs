//! Pickup bucket assignment and batch reconciliation.
//!
//! # Invariants
//!
//! - A pickup id appears in at most one bucket at any time.
//! - [`bucket`] is a pure function of the status.
//! - Within a batch, deletions are applied before upserts, so an id that is
//!   both deleted and updated in the same window survives with the update.

use fieldsync_proto::{Pickup, PickupId, PickupStatus};

use crate::BufferedEvents;

/// View-level grouping of pickups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    /// Assigned to this worker and not yet completed
    Pending,
    /// Open to any worker
    Available,
    /// Done
    Completed,
}

impl Bucket {
    /// All buckets, in display order.
    pub const ALL: [Self; 3] = [Self::Pending, Self::Available, Self::Completed];
}

/// Bucket a pickup with this status belongs to.
///
/// Unrecognised statuses land in [`Bucket::Available`].
pub fn bucket(status: &PickupStatus) -> Bucket {
    match status {
        PickupStatus::Completed => Bucket::Completed,
        PickupStatus::Pending | PickupStatus::Accepted | PickupStatus::InProgress => {
            Bucket::Pending
        },
        PickupStatus::Available | PickupStatus::Other(_) => Bucket::Available,
    }
}

/// The three pickup collections of a view. Most recent first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Buckets {
    pending: Vec<Pickup>,
    available: Vec<Pickup>,
    completed: Vec<Pickup>,
}

impl Buckets {
    /// Empty collections.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pickups in `bucket`, most recent first.
    pub fn get(&self, bucket: Bucket) -> &[Pickup] {
        match bucket {
            Bucket::Pending => &self.pending,
            Bucket::Available => &self.available,
            Bucket::Completed => &self.completed,
        }
    }

    fn get_mut(&mut self, bucket: Bucket) -> &mut Vec<Pickup> {
        match bucket {
            Bucket::Pending => &mut self.pending,
            Bucket::Available => &mut self.available,
            Bucket::Completed => &mut self.completed,
        }
    }

    /// Which bucket holds `id`, if any.
    pub fn locate(&self, id: PickupId) -> Option<Bucket> {
        Bucket::ALL.into_iter().find(|b| self.get(*b).iter().any(|p| p.id == id))
    }

    /// Total number of pickups across buckets.
    pub fn len(&self) -> usize {
        self.pending.len() + self.available.len() + self.completed.len()
    }

    /// Whether every bucket is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every pickup with its bucket.
    pub fn iter(&self) -> impl Iterator<Item = (Bucket, &Pickup)> {
        Bucket::ALL.into_iter().flat_map(move |b| self.get(b).iter().map(move |p| (b, p)))
    }

    /// Remove `id` from every bucket. Returns whether anything was removed.
    pub fn remove(&mut self, id: PickupId) -> bool {
        let before = self.len();
        for bucket in Bucket::ALL {
            self.get_mut(bucket).retain(|p| p.id != id);
        }
        self.len() != before
    }

    /// Strip `pickup.id` everywhere, then insert the snapshot at the head of
    /// its bucket.
    pub fn upsert(&mut self, pickup: Pickup) {
        self.remove(pickup.id);
        self.get_mut(bucket(&pickup.status)).insert(0, pickup);
    }

    /// Reconcile one batch: deletions first, then updates and creations in
    /// arrival order.
    pub fn apply(&mut self, batch: BufferedEvents) {
        for id in batch.deleted {
            self.remove(id);
        }
        for pickup in batch.updated.into_iter().chain(batch.created) {
            self.upsert(pickup);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(buckets: &Buckets, bucket: Bucket) -> Vec<PickupId> {
        buckets.get(bucket).iter().map(|p| p.id).collect()
    }

    #[test]
    fn bucket_mapping() {
        assert_eq!(bucket(&PickupStatus::Completed), Bucket::Completed);
        assert_eq!(bucket(&PickupStatus::Pending), Bucket::Pending);
        assert_eq!(bucket(&PickupStatus::Accepted), Bucket::Pending);
        assert_eq!(bucket(&PickupStatus::InProgress), Bucket::Pending);
        assert_eq!(bucket(&PickupStatus::Available), Bucket::Available);
        assert_eq!(bucket(&PickupStatus::Other("disputed".into())), Bucket::Available);
    }

    #[test]
    fn upsert_moves_between_buckets() {
        let mut buckets = Buckets::new();
        buckets.upsert(Pickup::new(1, "available"));
        buckets.upsert(Pickup::new(1, "accepted"));

        assert!(buckets.get(Bucket::Available).is_empty());
        assert_eq!(ids(&buckets, Bucket::Pending), vec![1]);
    }

    #[test]
    fn upsert_inserts_at_head() {
        let mut buckets = Buckets::new();
        buckets.upsert(Pickup::new(1, "pending"));
        buckets.upsert(Pickup::new(2, "pending"));
        buckets.upsert(Pickup::new(1, "in_progress"));

        assert_eq!(ids(&buckets, Bucket::Pending), vec![1, 2]);
    }

    #[test]
    fn deletes_apply_before_upserts() {
        let mut buckets = Buckets::new();
        buckets.upsert(Pickup::new(5, "available"));

        buckets.apply(BufferedEvents {
            created: vec![],
            updated: vec![Pickup::new(5, "accepted")],
            deleted: vec![5],
        });

        assert_eq!(buckets.locate(5), Some(Bucket::Pending));
    }

    #[test]
    fn created_survives_delete_of_same_id_in_batch() {
        let mut buckets = Buckets::new();
        buckets.upsert(Pickup::new(6, "pending"));

        buckets.apply(BufferedEvents {
            created: vec![Pickup::new(6, "available")],
            updated: vec![],
            deleted: vec![6],
        });

        assert_eq!(buckets.locate(6), Some(Bucket::Available));
        assert!(buckets.get(Bucket::Pending).is_empty());
    }

    #[test]
    fn created_follow_updated_in_batch() {
        let mut buckets = Buckets::new();
        buckets.apply(BufferedEvents {
            created: vec![Pickup::new(2, "pending")],
            updated: vec![Pickup::new(1, "pending")],
            deleted: vec![],
        });

        assert_eq!(ids(&buckets, Bucket::Pending), vec![2, 1]);
    }

    #[test]
    fn delete_of_unknown_id_is_noop() {
        let mut buckets = Buckets::new();
        buckets.upsert(Pickup::new(1, "completed"));
        assert!(!buckets.remove(99));
        assert_eq!(buckets.len(), 1);
    }
}
