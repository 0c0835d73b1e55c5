//! Signals that tell dashboard views to refetch after a settlement.

use tokio::sync::broadcast;
use tracing::debug;

use crate::model::AccountId;

/// A cached view that went stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    DriverDashboard(AccountId),
    RiderWallet(AccountId),
}

#[derive(Debug, Clone)]
pub struct Invalidations {
    sender: broadcast::Sender<View>,
}

impl Invalidations {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<View> {
        self.sender.subscribe()
    }

    pub fn publish(&self, view: View) {
        // nobody listening is fine
        if self.sender.send(view).is_err() {
            debug!(?view, "no subscribers for invalidation");
        }
    }
}

impl Default for Invalidations {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_views() {
        let invalidations = Invalidations::default();
        let mut rx = invalidations.subscribe();
        invalidations.publish(View::DriverDashboard(3));
        assert_eq!(rx.recv().await.unwrap(), View::DriverDashboard(3));
    }

    #[test]
    fn publish_without_subscribers_does_not_panic() {
        Invalidations::new(1).publish(View::RiderWallet(1));
    }
}
