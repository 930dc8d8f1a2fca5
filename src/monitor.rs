//! Periodic acquire → persist → aggregate → broadcast loop for one item.
//!
//! # Architecture
//!
//! - [`PublishLoop`]: owns everything one monitoring session needs
//! - [`MonitorHandle`]: returned by [`PublishLoop::spawn`], stops the session
//!
//! The loop sends `item_info` once, then runs cycles until stopped. Within
//! a cycle the messages go out as `new_comments` then `analytics_update`.
//! A cycle that panics is logged and followed by the longer backoff sleep;
//! only [`MonitorHandle::stop`] ends the loop. Stopping is checked between
//! cycles, so a cycle in flight always completes.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::acquire::Acquirer;
use crate::analytics::AnalyticsAggregator;
use crate::config::MonitorConfig;
use crate::live::{Broadcaster, LiveMessage};
use crate::store::CommentStore;

/// Cycle sizing and timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSettings {
    /// Comments requested per cycle.
    pub batch_size: usize,
    /// Trailing comments of each batch sent as `new_comments`.
    pub recent_slice: usize,
    pub interval: Duration,
    pub backoff: Duration,
}

impl From<&MonitorConfig> for MonitorSettings {
    fn from(config: &MonitorConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            recent_slice: config.recent_slice,
            interval: config.interval(),
            backoff: config.backoff(),
        }
    }
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self::from(&MonitorConfig::default())
    }
}

/// What one cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub fetched: usize,
    pub persisted: bool,
    pub total_comments: usize,
    pub subscribers_reached: usize,
}

/// One monitoring session.
pub struct PublishLoop {
    acquirer: Arc<Acquirer>,
    store: Arc<dyn CommentStore>,
    aggregator: Arc<AnalyticsAggregator>,
    broadcaster: Broadcaster,
    settings: MonitorSettings,
}

impl PublishLoop {
    pub fn new(
        acquirer: Arc<Acquirer>,
        store: Arc<dyn CommentStore>,
        aggregator: Arc<AnalyticsAggregator>,
        broadcaster: Broadcaster,
        settings: MonitorSettings,
    ) -> Self {
        Self {
            acquirer,
            store,
            aggregator,
            broadcaster,
            settings,
        }
    }

    #[must_use]
    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    /// Run the session on its own task.
    #[must_use]
    pub fn spawn(self, item_id: String) -> MonitorHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(async move { self.run(&item_id, stop_rx).await });
        MonitorHandle { stop: stop_tx, task }
    }

    /// Publish `item_info`, then cycle until `stop` turns true or its sender is dropped.
    ///
    /// A panic while publishing the item is treated like a failed cycle:
    /// logged, backed off, and retried.
    pub async fn run(&self, item_id: &str, mut stop: watch::Receiver<bool>) {
        info!(item_id, "Starting monitoring");

        let mut announced = self.announce(item_id).await;
        let mut cycles: u64 = 0;
        while !*stop.borrow() {
            let pause = if announced {
                cycles += 1;
                match AssertUnwindSafe(self.cycle(item_id)).catch_unwind().await {
                    Ok(report) => {
                        info!(
                            item_id,
                            cycle = cycles,
                            fetched = report.fetched,
                            total = report.total_comments,
                            "Broadcast updates"
                        );
                        self.settings.interval
                    }
                    Err(panic) => {
                        error!(item_id, cycle = cycles, "Monitoring cycle failed: {}", panic_message(&*panic));
                        self.settings.backoff
                    }
                }
            } else {
                self.settings.backoff
            };

            tokio::select! {
                () = tokio::time::sleep(pause) => {}
                changed = stop.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }

            if !announced && !*stop.borrow() {
                announced = self.announce(item_id).await;
            }
        }
        info!(item_id, cycles, "Monitoring stopped");
    }

    /// Publish `item_info`; false if that panicked.
    async fn announce(&self, item_id: &str) -> bool {
        match AssertUnwindSafe(self.publish_item(item_id)).catch_unwind().await {
            Ok(()) => true,
            Err(panic) => {
                error!(item_id, "Publishing item info failed: {}", panic_message(&*panic));
                false
            }
        }
    }

    async fn publish_item(&self, item_id: &str) {
        let item = self.acquirer.get_item(item_id).await;
        if let Err(e) = self.store.upsert_item(&item).await {
            warn!(item_id, "Failed to store item metadata: {e}");
        }
        self.broadcaster.broadcast(&LiveMessage::ItemInfo(item)).await;
    }

    /// One acquire → persist → aggregate → broadcast pass.
    pub async fn cycle(&self, item_id: &str) -> CycleReport {
        debug!(item_id, "Fetching new comments");
        let comments = self
            .acquirer
            .get_comments(item_id, self.settings.batch_size)
            .await;

        let persisted = match self.store.upsert_comments(item_id, &comments).await {
            Ok(()) => true,
            Err(e) => {
                warn!(item_id, "Failed to store comments: {e}");
                false
            }
        };

        let snapshot = self.aggregator.compute(item_id).await;
        let total_comments = snapshot.total_comments;

        let recent_start = comments.len().saturating_sub(self.settings.recent_slice);
        let fetched = comments.len();
        let mut recent = comments;
        let recent = recent.split_off(recent_start);

        let reached = self
            .broadcaster
            .broadcast(&LiveMessage::NewComments(recent))
            .await
            .delivered;
        self.broadcaster
            .broadcast(&LiveMessage::AnalyticsUpdate(snapshot))
            .await;

        CycleReport {
            fetched,
            persisted,
            total_comments,
            subscribers_reached: reached,
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// Handle to a spawned [`PublishLoop`].
pub struct MonitorHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Ask the loop to stop and wait for the current cycle to finish.
    pub async fn stop(self) {
        let _ = self.stop.send(true);
        if let Err(e) = self.task.await {
            warn!("Monitoring task ended abnormally: {e}");
        }
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::acquire::{AcquisitionTier, SyntheticGenerator, TierOutcome};
    use crate::error::{PulseError, Result};
    use crate::live::{DeliveryFailure, Subscriber};
    use crate::model::{Comment, Item, RawComment};
    use crate::sentiment::SentimentScorer;
    use crate::store::MemoryStore;

    #[derive(Default)]
    struct Recorder {
        kinds: Mutex<Vec<String>>,
        batches: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl Subscriber for Recorder {
        async fn send(&self, frame: &str) -> std::result::Result<(), DeliveryFailure> {
            let json: serde_json::Value = serde_json::from_str(frame).unwrap();
            if let Some(batch) = json["data"].as_array() {
                self.batches.lock().unwrap().push(batch.len());
            }
            self.kinds
                .lock()
                .unwrap()
                .push(json["type"].as_str().unwrap_or_default().to_string());
            Ok(())
        }
    }

    impl Recorder {
        fn kinds(&self) -> Vec<String> {
            self.kinds.lock().unwrap().clone()
        }
    }

    fn fast() -> MonitorSettings {
        MonitorSettings {
            batch_size: 12,
            recent_slice: 5,
            interval: Duration::from_millis(5),
            backoff: Duration::from_millis(20),
        }
    }

    fn session(acquirer: Acquirer, store: Arc<dyn CommentStore>) -> PublishLoop {
        let aggregator = AnalyticsAggregator::with_rng(store.clone(), StdRng::seed_from_u64(3));
        PublishLoop::new(
            Arc::new(acquirer),
            store,
            Arc::new(aggregator),
            Broadcaster::new(),
            fast(),
        )
    }

    async fn wait_for(recorder: &Recorder, frames: usize) {
        for _ in 0..500 {
            if recorder.kinds().len() >= frames {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("only {} frames arrived", recorder.kinds().len());
    }

    #[tokio::test]
    async fn cycle_persists_and_broadcasts_recent_slice() {
        let store = Arc::new(MemoryStore::new());
        let publish = session(Acquirer::synthetic_only(SentimentScorer::lexical()), store.clone());
        let recorder = Arc::new(Recorder::default());
        publish.broadcaster().add(recorder.clone()).await.unwrap();

        let report = publish.cycle("vid").await;
        assert_eq!(report.fetched, 12);
        assert!(report.persisted);
        assert_eq!(report.total_comments, 12);
        assert_eq!(report.subscribers_reached, 1);
        assert_eq!(store.query_top_level_comments("vid").await.unwrap().len(), 12);
        assert_eq!(recorder.kinds(), ["new_comments", "analytics_update"]);
        assert_eq!(recorder.batches.lock().unwrap()[0], 5);
    }

    #[tokio::test]
    async fn loop_sends_item_info_once_then_ordered_cycles() {
        let publish = session(
            Acquirer::synthetic_only(SentimentScorer::lexical()),
            Arc::new(MemoryStore::new()),
        );
        let recorder = Arc::new(Recorder::default());
        publish.broadcaster().add(recorder.clone()).await.unwrap();

        let handle = publish.spawn("vid".to_string());
        wait_for(&recorder, 5).await;
        handle.stop().await;

        let kinds = recorder.kinds();
        assert_eq!(kinds[0], "item_info");
        assert_eq!(kinds.iter().filter(|k| *k == "item_info").count(), 1);
        for pair in kinds[1..].chunks(2) {
            assert_eq!(pair[0], "new_comments");
            if pair.len() == 2 {
                assert_eq!(pair[1], "analytics_update");
            }
        }
    }

    /// Panics on the first comment fetch, then defers to the next tier.
    struct FlakyTier {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AcquisitionTier for FlakyTier {
        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn fetch_item(&self, _item_id: &str) -> TierOutcome<Item> {
            TierOutcome::unsupported("item metadata")
        }

        async fn fetch_comments(&self, _item_id: &str, _max: usize) -> TierOutcome<Vec<RawComment>> {
            assert!(self.calls.fetch_add(1, Ordering::SeqCst) != 0, "tier exploded");
            TierOutcome::Fallthrough("warming up".into())
        }
    }

    #[tokio::test]
    async fn failed_cycle_backs_off_and_loop_continues() {
        let scorer = SentimentScorer::lexical();
        let flaky = Arc::new(FlakyTier {
            calls: AtomicUsize::new(0),
        });
        let acquirer = Acquirer::new(
            vec![flaky.clone()],
            SyntheticGenerator::seeded(scorer.clone(), 5),
            scorer,
        );
        let publish = session(acquirer, Arc::new(MemoryStore::new()));
        let recorder = Arc::new(Recorder::default());
        publish.broadcaster().add(recorder.clone()).await.unwrap();

        let handle = publish.spawn("vid".to_string());
        // item_info plus one full cycle after the failed one
        wait_for(&recorder, 3).await;
        assert!(!handle.is_finished());
        handle.stop().await;

        assert!(flaky.calls.load(Ordering::SeqCst) >= 2);
        assert_eq!(recorder.kinds()[..3], ["item_info", "new_comments", "analytics_update"]);
    }

    /// Panics on the first item fetch, then defers to the next tier.
    struct FlakyItemTier {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AcquisitionTier for FlakyItemTier {
        fn name(&self) -> &'static str {
            "flaky-item"
        }

        async fn fetch_item(&self, _item_id: &str) -> TierOutcome<Item> {
            assert!(self.calls.fetch_add(1, Ordering::SeqCst) != 0, "metadata exploded");
            TierOutcome::Fallthrough("warming up".into())
        }

        async fn fetch_comments(&self, _item_id: &str, _max: usize) -> TierOutcome<Vec<RawComment>> {
            TierOutcome::unsupported("comments")
        }
    }

    #[tokio::test]
    async fn failed_item_publish_is_retried() {
        let scorer = SentimentScorer::lexical();
        let flaky = Arc::new(FlakyItemTier {
            calls: AtomicUsize::new(0),
        });
        let acquirer = Acquirer::new(
            vec![flaky.clone()],
            SyntheticGenerator::seeded(scorer.clone(), 8),
            scorer,
        );
        let publish = session(acquirer, Arc::new(MemoryStore::new()));
        let recorder = Arc::new(Recorder::default());
        publish.broadcaster().add(recorder.clone()).await.unwrap();

        let handle = publish.spawn("vid".to_string());
        wait_for(&recorder, 3).await;
        assert!(!handle.is_finished());
        handle.stop().await;

        assert_eq!(flaky.calls.load(Ordering::SeqCst), 2);
        assert_eq!(recorder.kinds()[..3], ["item_info", "new_comments", "analytics_update"]);
    }

    struct ReadOnlyStore;

    #[async_trait]
    impl CommentStore for ReadOnlyStore {
        async fn upsert_comments(&self, _: &str, _: &[Comment]) -> Result<()> {
            Err(PulseError::StoreUnavailable("read-only".into()))
        }

        async fn upsert_item(&self, _: &Item) -> Result<()> {
            Err(PulseError::StoreUnavailable("read-only".into()))
        }

        async fn query_top_level_comments(&self, _: &str) -> Result<Vec<Comment>> {
            Ok(Vec::new())
        }

        async fn get_item(&self, _: &str) -> Result<Option<Item>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn store_failure_does_not_stop_the_cycle() {
        let publish = session(
            Acquirer::synthetic_only(SentimentScorer::lexical()),
            Arc::new(ReadOnlyStore),
        );
        let report = publish.cycle("vid").await;
        assert!(!report.persisted);
        // analytics fall back to a synthetic snapshot
        assert!(report.total_comments > 0);
    }

    #[tokio::test]
    async fn stop_before_first_cycle_only_sends_item_info() {
        let publish = session(
            Acquirer::synthetic_only(SentimentScorer::lexical()),
            Arc::new(MemoryStore::new()),
        );
        let recorder = Arc::new(Recorder::default());
        publish.broadcaster().add(recorder.clone()).await.unwrap();

        let (_tx, rx) = watch::channel(true);
        publish.run("vid", rx).await;
        assert_eq!(recorder.kinds(), ["item_info"]);
    }
}
