use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

use super::fetcher;
use super::models::NotificationEvent;
use super::registry::SessionRegistry;
use super::tracker::DeliveryTracker;
use crate::bank::BankClient;

/// Drives the poll -> dedupe -> publish cycle on a fixed interval.
///
/// Runs as one long-lived task for the process lifetime. Delivery is
/// best-effort: an event whose user has no open channel is dropped, never
/// queued, and a failed poll just means an empty cycle.
pub struct Broadcaster {
    bank: BankClient,
    registry: SessionRegistry,
    tracker: DeliveryTracker,
    interval: Duration,
}

impl Broadcaster {
    pub fn new(bank: BankClient, registry: SessionRegistry, interval: Duration) -> Self {
        Broadcaster {
            bank,
            registry,
            tracker: DeliveryTracker::new(),
            interval,
        }
    }

    /// Polls until the shutdown signal flips. Per-cycle failures are handled
    /// inside the fetch and dispatch steps; nothing here can end the loop
    /// early.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "notification relay polling every {}s",
            self.interval.as_secs()
        );
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let fetched = fetcher::fetch_new_events(&self.bank).await;
                    self.dispatch(&fetched).await;
                }
                _ = shutdown.changed() => {
                    info!("notification relay stopping");
                    return;
                }
            }
        }
    }

    /// One dedupe-and-publish pass over a fetched batch.
    async fn dispatch(&mut self, fetched: &[NotificationEvent]) {
        for key in self.tracker.observe(fetched) {
            match self.registry.lookup(&key.ucid).await {
                Some(sender) => {
                    if sender.send(key.message()).is_err() {
                        debug!("channel for {} closed before delivery", key.ucid);
                    }
                }
                None => {
                    debug!("no live channel for {}, dropping notification", key.ucid);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn event(saga_id: &str, ucid: &str, op: &str, status: &str) -> NotificationEvent {
        NotificationEvent {
            saga_id: saga_id.to_string(),
            ucid: ucid.to_string(),
            operation_type: op.to_string(),
            operation_status: status.to_string(),
        }
    }

    fn broadcaster(registry: SessionRegistry) -> Broadcaster {
        let bank = BankClient::new(
            "http://127.0.0.1:1/cloudbank".to_string(),
            Duration::from_millis(100),
        )
        .unwrap();
        Broadcaster::new(bank, registry, Duration::from_secs(15))
    }

    #[tokio::test]
    async fn delivers_to_registered_channel_exactly_once() {
        let registry = SessionRegistry::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.register("u1", tx).await;

        let mut broadcaster = broadcaster(registry);
        let fetched = vec![event("s1", "u1", "TRANSFER", "COMPLETED")];
        broadcaster.dispatch(&fetched).await;

        assert_eq!(
            rx.recv().await.unwrap(),
            "Request ID: s1. The TRANSFER operation's status is: COMPLETED"
        );

        // the tuple was forgotten; an empty cycle delivers nothing more
        broadcaster.dispatch(&[]).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn missing_channel_drops_silently() {
        let mut broadcaster = broadcaster(SessionRegistry::new());
        let fetched = vec![event("s1", "ghost", "NEW_CREDIT_CARD", "ONGOING")];
        broadcaster.dispatch(&fetched).await;
    }

    #[tokio::test]
    async fn empty_fetch_completes_the_cycle() {
        let registry = SessionRegistry::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.register("u1", tx).await;

        let mut broadcaster = broadcaster(registry);
        broadcaster.dispatch(&[]).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn resurfaced_tuple_is_delivered_again() {
        let registry = SessionRegistry::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.register("u1", tx).await;

        let mut broadcaster = broadcaster(registry);
        let fetched = vec![event("s1", "u1", "NEW_BANK_ACCOUNT", "ONGOING")];
        broadcaster.dispatch(&fetched).await;
        broadcaster.dispatch(&[]).await;
        broadcaster.dispatch(&fetched).await;

        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_some());
        assert!(rx.try_recv().is_err());
    }
}
