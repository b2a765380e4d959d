//! Per-batch outcome notifications.

use serde::Serialize;
use tokio::sync::mpsc;

use crate::gateway::UpdatedId;

/// Receives each batch's incremental outcome lists as soon as the batch
/// completes, ahead of the aggregate report.
///
/// Only non-empty lists are delivered, in the order removed, updated,
/// invalid, and in strict batch order.
pub trait OutcomeObserver: Send + Sync {
    fn on_removed(&self, _removed: &[String]) {}

    fn on_updated(&self, _updated: &[UpdatedId]) {}

    fn on_invalid(&self, _invalid: &[String]) {}
}

/// A category update forwarded by [`ChannelObserver`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "ids", rename_all = "lowercase")]
pub enum OutcomeEvent {
    Removed(Vec<String>),
    Updated(Vec<UpdatedId>),
    Invalid(Vec<String>),
}

/// Observer that turns notifications into channel messages.
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<OutcomeEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutcomeEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn forward(&self, event: OutcomeEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("Outcome receiver dropped, discarding event");
        }
    }
}

impl OutcomeObserver for ChannelObserver {
    fn on_removed(&self, removed: &[String]) {
        self.forward(OutcomeEvent::Removed(removed.to_vec()));
    }

    fn on_updated(&self, updated: &[UpdatedId]) {
        self.forward(OutcomeEvent::Updated(updated.to_vec()));
    }

    fn on_invalid(&self, invalid: &[String]) {
        self.forward(OutcomeEvent::Invalid(invalid.to_vec()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_observer_forwards_in_order() {
        let (observer, mut rx) = ChannelObserver::new();

        observer.on_removed(&["a".to_string()]);
        observer.on_invalid(&["b".to_string()]);

        assert_eq!(rx.try_recv().unwrap(), OutcomeEvent::Removed(vec!["a".to_string()]));
        assert_eq!(rx.try_recv().unwrap(), OutcomeEvent::Invalid(vec!["b".to_string()]));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_dropped_receiver_is_ignored() {
        let (observer, rx) = ChannelObserver::new();
        drop(rx);
        observer.on_removed(&["a".to_string()]);
    }

    #[test]
    fn test_event_serialization() {
        let event = OutcomeEvent::Updated(vec![UpdatedId {
            old_id: "a".to_string(),
            new_id: "b".to_string(),
        }]);
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "updated");
        assert_eq!(value["ids"][0]["new_id"], "b");
    }
}
