use std::collections::HashMap;

use super::models::{EventKey, NotificationEvent};

/// How many times an event tuple is delivered before being forgotten.
const DELIVERY_QUOTA: u32 = 1;

/// Tracks which event tuples have been announced, across polling cycles.
///
/// Every tuple present in the table during a cycle is delivered once that
/// cycle, its count incremented, and the entry dropped once the count reaches
/// the quota. A tuple the service keeps reporting after its entry was dropped
/// counts as a new occurrence and is announced again. That re-announcement is
/// an observable property of the relay, not an accident to be optimized away.
///
/// Owned solely by the broadcaster task; no synchronization needed.
#[derive(Debug, Default)]
pub struct DeliveryTracker {
    cycles: HashMap<EventKey, u32>,
}

impl DeliveryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs one tracking pass over a freshly fetched batch and returns the
    /// keys to deliver this cycle.
    pub fn observe(&mut self, fetched: &[NotificationEvent]) -> Vec<EventKey> {
        for event in fetched {
            self.cycles.entry(EventKey::from(event)).or_insert(0);
        }

        let mut delivered = Vec::new();
        let mut expired = Vec::new();
        for (key, count) in self.cycles.iter_mut() {
            delivered.push(key.clone());
            *count += 1;
            if *count >= DELIVERY_QUOTA {
                expired.push(key.clone());
            }
        }
        for key in &expired {
            self.cycles.remove(key);
        }

        delivered
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.cycles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(saga_id: &str, ucid: &str, op: &str, status: &str) -> NotificationEvent {
        NotificationEvent {
            saga_id: saga_id.to_string(),
            ucid: ucid.to_string(),
            operation_type: op.to_string(),
            operation_status: status.to_string(),
        }
    }

    #[test]
    fn delivered_once_then_forgotten() {
        let mut tracker = DeliveryTracker::new();
        let fetched = vec![event("s1", "u1", "TRANSFER", "COMPLETED")];

        let delivered = tracker.observe(&fetched);
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].saga_id, "s1");
        assert_eq!(
            delivered[0].message(),
            "Request ID: s1. The TRANSFER operation's status is: COMPLETED"
        );
        // entry expired after meeting the quota
        assert_eq!(tracker.tracked(), 0);
    }

    #[test]
    fn duplicates_within_one_batch_collapse() {
        let mut tracker = DeliveryTracker::new();
        let fetched = vec![
            event("s1", "u1", "TRANSFER", "ONGOING"),
            event("s1", "u1", "TRANSFER", "ONGOING"),
        ];

        let delivered = tracker.observe(&fetched);
        assert_eq!(delivered.len(), 1);
    }

    #[test]
    fn empty_cycle_delivers_nothing() {
        let mut tracker = DeliveryTracker::new();
        tracker.observe(&[event("s1", "u1", "TRANSFER", "COMPLETED")]);

        let delivered = tracker.observe(&[]);
        assert!(delivered.is_empty());
        assert_eq!(tracker.tracked(), 0);
    }

    #[test]
    fn resurfaced_tuple_is_announced_again() {
        let mut tracker = DeliveryTracker::new();
        let fetched = vec![event("s1", "u1", "NEW_BANK_ACCOUNT", "ONGOING")];

        assert_eq!(tracker.observe(&fetched).len(), 1);
        assert!(tracker.observe(&[]).is_empty());
        // service reports the same tuple again two cycles later
        assert_eq!(tracker.observe(&fetched).len(), 1);
    }

    #[test]
    fn distinct_statuses_track_separately() {
        let mut tracker = DeliveryTracker::new();
        let delivered = tracker.observe(&[
            event("s1", "u1", "TRANSFER", "ONGOING"),
            event("s1", "u1", "TRANSFER", "COMPLETED"),
        ]);
        assert_eq!(delivered.len(), 2);
        assert_eq!(tracker.tracked(), 0);
    }
}
