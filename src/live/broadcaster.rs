//! Subscriber registry and fan-out.
//!
//! Every broadcast serialises the message once, then sends to all current
//! subscribers concurrently. A failed send is logged and counted; it never
//! reaches the caller and never delays the other subscribers: each send is
//! bounded by the broadcaster's send timeout, and a send that overruns it
//! counts as a closed connection. Subscribers whose connection is closed are
//! dropped from the registry.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::LiveMessage;
use crate::error::{PulseError, Result};

pub type SubscriberId = Uuid;

/// Upper bound on one send before the subscriber is treated as gone.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// A send to one subscriber failed.
#[derive(Debug, Clone, Error)]
#[error("{reason}")]
pub struct DeliveryFailure {
    /// The connection is gone; the subscriber should be removed.
    pub closed: bool,
    pub reason: String,
}

impl DeliveryFailure {
    pub fn closed(reason: impl Into<String>) -> Self {
        Self {
            closed: true,
            reason: reason.into(),
        }
    }

    pub fn transient(reason: impl Into<String>) -> Self {
        Self {
            closed: false,
            reason: reason.into(),
        }
    }
}

impl From<DeliveryFailure> for PulseError {
    fn from(failure: DeliveryFailure) -> Self {
        Self::Delivery(failure.reason)
    }
}

/// One live connection.
#[async_trait]
pub trait Subscriber: Send + Sync {
    /// Deliver one serialised frame.
    async fn send(&self, frame: &str) -> std::result::Result<(), DeliveryFailure>;
}

/// Outcome of one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
    /// Subscribers removed because their connection was closed.
    pub removed: usize,
}

#[derive(Default)]
struct Registry {
    subscribers: RwLock<Vec<(SubscriberId, Arc<dyn Subscriber>)>>,
    /// Last `item_info` frame, replayed to late joiners.
    last_item: RwLock<Option<String>>,
}

/// Shared handle to the subscriber set. Clones share state.
#[derive(Clone)]
pub struct Broadcaster {
    registry: Arc<Registry>,
    send_timeout: Duration,
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self {
            registry: Arc::default(),
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }
}

impl Broadcaster {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_send_timeout(mut self, send_timeout: Duration) -> Self {
        self.send_timeout = send_timeout;
        self
    }

    /// Register a subscriber and replay the latest `item_info`, if any.
    ///
    /// Fails with [`PulseError::Delivery`] when the replay finds the
    /// connection already closed; the subscriber is not registered then.
    pub async fn add(&self, subscriber: Arc<dyn Subscriber>) -> Result<SubscriberId> {
        let id = Uuid::new_v4();
        let replay = self.registry.last_item.read().await.clone();
        if let Some(frame) = replay {
            if let Err(e) = self.deliver(subscriber.as_ref(), &frame).await {
                warn!(%id, "Replaying item info failed: {e}");
                if e.closed {
                    return Err(e.into());
                }
            }
        }

        let mut subscribers = self.registry.subscribers.write().await;
        subscribers.push((id, subscriber));
        info!(%id, "Subscriber connected, {} total", subscribers.len());
        Ok(id)
    }

    /// Drop a subscriber. Removing an unknown id is a no-op.
    pub async fn remove(&self, id: SubscriberId) -> bool {
        let mut subscribers = self.registry.subscribers.write().await;
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        let removed = subscribers.len() != before;
        if removed {
            info!(%id, "Subscriber disconnected, {} total", subscribers.len());
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.registry.subscribers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Send `message` to every current subscriber.
    pub async fn broadcast(&self, message: &LiveMessage) -> DeliveryReport {
        let frame = match message.to_json() {
            Ok(frame) => frame,
            Err(e) => {
                warn!(kind = message.kind(), "Failed to serialise live message: {e}");
                return DeliveryReport::default();
            }
        };
        if matches!(message, LiveMessage::ItemInfo(_)) {
            *self.registry.last_item.write().await = Some(frame.clone());
        }

        let targets: Vec<(SubscriberId, Arc<dyn Subscriber>)> =
            self.registry.subscribers.read().await.clone();
        let frame = frame.as_str();
        let results = join_all(
            targets
                .iter()
                .map(|(id, subscriber)| async move { (*id, self.deliver(subscriber.as_ref(), frame).await) }),
        )
        .await;

        let mut report = DeliveryReport::default();
        let mut closed = Vec::new();
        for (id, result) in results {
            match result {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(%id, kind = message.kind(), "Delivery failed: {e}");
                    if e.closed {
                        closed.push(id);
                    }
                }
            }
        }
        for id in closed {
            if self.remove(id).await {
                report.removed += 1;
            }
        }

        debug!(
            kind = message.kind(),
            delivered = report.delivered,
            failed = report.failed,
            "Broadcast complete"
        );
        report
    }

    async fn deliver(&self, subscriber: &dyn Subscriber, frame: &str) -> std::result::Result<(), DeliveryFailure> {
        tokio::time::timeout(self.send_timeout, subscriber.send(frame))
            .await
            .unwrap_or_else(|_| {
                Err(DeliveryFailure::closed(format!(
                    "send timed out after {:?}",
                    self.send_timeout
                )))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::acquire::SyntheticGenerator;
    use crate::sentiment::SentimentScorer;
    use crate::store::tests::comment;

    /// Records frames, or fails every send.
    #[derive(Default)]
    struct Recorder {
        frames: Mutex<Vec<String>>,
        fail: Option<bool>,
    }

    impl Recorder {
        fn failing(closed: bool) -> Self {
            Self {
                fail: Some(closed),
                ..Self::default()
            }
        }

        fn frames(&self) -> Vec<String> {
            self.frames.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Subscriber for Recorder {
        async fn send(&self, frame: &str) -> std::result::Result<(), DeliveryFailure> {
            match self.fail {
                Some(true) => Err(DeliveryFailure::closed("connection reset")),
                Some(false) => Err(DeliveryFailure::transient("send buffer full")),
                None => {
                    self.frames.lock().unwrap().push(frame.to_string());
                    Ok(())
                }
            }
        }
    }

    fn comments_message() -> LiveMessage {
        LiveMessage::NewComments(vec![comment("a", 0, 0, 0.0)])
    }

    #[tokio::test]
    async fn failing_subscriber_does_not_block_others() {
        let broadcaster = Broadcaster::new();
        let first = Arc::new(Recorder::default());
        let last = Arc::new(Recorder::default());
        broadcaster.add(first.clone()).await.unwrap();
        broadcaster.add(Arc::new(Recorder::failing(false))).await.unwrap();
        broadcaster.add(last.clone()).await.unwrap();

        let report = broadcaster.broadcast(&comments_message()).await;
        assert_eq!(
            report,
            DeliveryReport {
                delivered: 2,
                failed: 1,
                removed: 0
            }
        );
        assert_eq!(first.frames().len(), 1);
        assert_eq!(last.frames().len(), 1);
        assert_eq!(broadcaster.len().await, 3);
    }

    #[tokio::test]
    async fn closed_subscribers_are_removed() {
        let broadcaster = Broadcaster::new();
        let ok = Arc::new(Recorder::default());
        broadcaster.add(ok.clone()).await.unwrap();
        broadcaster.add(Arc::new(Recorder::failing(true))).await.unwrap();

        let report = broadcaster.broadcast(&comments_message()).await;
        assert_eq!(report.removed, 1);
        assert_eq!(broadcaster.len().await, 1);

        let report = broadcaster.broadcast(&comments_message()).await;
        assert_eq!(report.failed, 0);
        assert_eq!(ok.frames().len(), 2);
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let broadcaster = Broadcaster::new();
        let id = broadcaster.add(Arc::new(Recorder::default())).await.unwrap();
        assert!(broadcaster.remove(id).await);
        assert!(!broadcaster.remove(id).await);
        assert!(broadcaster.is_empty().await);
    }

    #[tokio::test]
    async fn broadcast_without_subscribers_is_a_no_op() {
        let report = Broadcaster::new().broadcast(&comments_message()).await;
        assert_eq!(report, DeliveryReport::default());
    }

    #[tokio::test]
    async fn late_joiner_receives_last_item_info() {
        let broadcaster = Broadcaster::new();
        let generator = SyntheticGenerator::seeded(SentimentScorer::lexical(), 3);
        broadcaster.broadcast(&LiveMessage::ItemInfo(generator.item("vid"))).await;

        let late = Arc::new(Recorder::default());
        broadcaster.add(late.clone()).await.unwrap();
        let frames = late.frames();
        assert_eq!(frames.len(), 1);
        let json: serde_json::Value = serde_json::from_str(&frames[0]).unwrap();
        assert_eq!(json["type"], "item_info");
        assert_eq!(json["data"]["item_id"], "vid");
    }

    /// Accepts the frame and never finishes sending it.
    struct Stalled;

    #[async_trait]
    impl Subscriber for Stalled {
        async fn send(&self, _frame: &str) -> std::result::Result<(), DeliveryFailure> {
            futures::future::pending().await
        }
    }

    #[tokio::test]
    async fn stalled_subscriber_times_out_and_is_removed() {
        let broadcaster = Broadcaster::new().with_send_timeout(Duration::from_millis(50));
        let healthy = Arc::new(Recorder::default());
        broadcaster.add(healthy.clone()).await.unwrap();
        broadcaster.add(Arc::new(Stalled)).await.unwrap();

        let report = tokio::time::timeout(Duration::from_secs(2), broadcaster.broadcast(&comments_message()))
            .await
            .expect("broadcast finishes despite a stalled subscriber");
        assert_eq!(
            report,
            DeliveryReport {
                delivered: 1,
                failed: 1,
                removed: 1
            }
        );
        assert_eq!(healthy.frames().len(), 1);
        assert_eq!(broadcaster.len().await, 1);
    }

    #[tokio::test]
    async fn closed_late_joiner_is_rejected() {
        let broadcaster = Broadcaster::new();
        let generator = SyntheticGenerator::seeded(SentimentScorer::lexical(), 3);
        broadcaster.broadcast(&LiveMessage::ItemInfo(generator.item("vid"))).await;

        let err = broadcaster.add(Arc::new(Recorder::failing(true))).await.unwrap_err();
        assert!(matches!(err, PulseError::Delivery(reason) if reason == "connection reset"));
        assert!(broadcaster.is_empty().await);
    }

    #[test]
    fn delivery_failure_converts_to_pulse_error() {
        let err: PulseError = DeliveryFailure::closed("gone").into();
        assert!(matches!(err, PulseError::Delivery(reason) if reason == "gone"));
    }
}
