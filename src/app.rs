//! Wiring: build the pipeline from [`Config`] and run it.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{info, warn};

use crate::acquire::{extract_item_id, Acquirer, SyntheticGenerator};
use crate::analytics::{AnalyticsAggregator, AnalyticsSnapshot};
use crate::config::Config;
use crate::error::{PulseError, Result};
use crate::live::Broadcaster;
use crate::model::{Comment, Item};
use crate::monitor::{MonitorHandle, MonitorSettings, PublishLoop};
use crate::sentiment::SentimentScorer;
use crate::store::{CommentStore, MemoryStore, SqliteStore};

/// Comments fetched by a one-shot analysis.
pub const ANALYSIS_BATCH: usize = 100;

/// Comments included in [`AnalysisReport::recent_comments`].
pub const REPORT_COMMENTS: usize = 10;

/// Result of [`Analyzer::analyze`].
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub item: Item,
    pub analytics: AnalyticsSnapshot,
    pub recent_comments: Vec<Comment>,
    /// Tiers that fell through before a value was found, as error messages.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped_tiers: Vec<String>,
}

/// The assembled pipeline: scorer, acquisition chain, store and aggregator.
pub struct Analyzer {
    scorer: SentimentScorer,
    acquirer: Arc<Acquirer>,
    store: Arc<dyn CommentStore>,
    aggregator: Arc<AnalyticsAggregator>,
    monitor: MonitorSettings,
}

impl Analyzer {
    pub fn new(scorer: SentimentScorer, acquirer: Acquirer, store: Arc<dyn CommentStore>) -> Self {
        let aggregator = AnalyticsAggregator::new(store.clone());
        Self {
            scorer,
            acquirer: Arc::new(acquirer),
            store,
            aggregator: Arc::new(aggregator),
            monitor: MonitorSettings::default(),
        }
    }

    /// Build from config. A store that cannot be opened is replaced by an
    /// in-memory one.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let scorer = SentimentScorer::from_config(&config.scoring);
        let acquirer = Acquirer::from_config(&config.acquisition, scorer.clone());

        let path = config.store.resolved_path();
        let store: Arc<dyn CommentStore> = match SqliteStore::open(&path) {
            Ok(store) => Arc::new(store),
            Err(e) => {
                warn!("Comment store unavailable ({e}), keeping comments in memory");
                Arc::new(MemoryStore::new())
            }
        };

        Self::new(scorer, acquirer, store).with_monitor_settings(MonitorSettings::from(&config.monitor))
    }

    /// Offline pipeline: synthetic data only, in-memory store, seeded randomness.
    #[must_use]
    pub fn offline(seed: u64) -> Self {
        let scorer = SentimentScorer::lexical();
        let acquirer = Acquirer::new(
            Vec::new(),
            SyntheticGenerator::seeded(scorer.clone(), seed),
            scorer.clone(),
        );
        let store: Arc<dyn CommentStore> = Arc::new(MemoryStore::new());
        let aggregator = AnalyticsAggregator::with_rng(store.clone(), StdRng::seed_from_u64(seed));
        Self {
            scorer,
            acquirer: Arc::new(acquirer),
            store,
            aggregator: Arc::new(aggregator),
            monitor: MonitorSettings::default(),
        }
    }

    #[must_use]
    pub fn with_monitor_settings(mut self, settings: MonitorSettings) -> Self {
        self.monitor = settings;
        self
    }

    #[must_use]
    pub fn scorer(&self) -> &SentimentScorer {
        &self.scorer
    }

    pub fn store(&self) -> Arc<dyn CommentStore> {
        self.store.clone()
    }

    /// Metadata for the item at `source`. Fails only on an unparseable reference.
    pub async fn get_item(&self, source: &str) -> Result<Item> {
        let item_id = extract_item_id(source)?;
        Ok(self.acquirer.get_item(&item_id).await)
    }

    /// Up to `max_count` labelled comments for the item at `source`.
    pub async fn get_comments(&self, source: &str, max_count: usize) -> Result<Vec<Comment>> {
        let item_id = extract_item_id(source)?;
        Ok(self.acquirer.get_comments(&item_id, max_count).await)
    }

    /// One-shot analysis: fetch, persist, aggregate.
    pub async fn analyze(&self, source: &str) -> Result<AnalysisReport> {
        let item_id = extract_item_id(source)?;
        info!(item_id, "Analyzing");

        let acquired_item = self.acquirer.acquire_item(&item_id).await;
        let item = acquired_item.value;
        info!(item_id, source = acquired_item.source, "Item: {}", item.title);
        if let Err(e) = self.store.upsert_item(&item).await {
            warn!(item_id, "Failed to store item metadata: {e}");
        }

        let acquired_comments = self.acquirer.acquire_comments(&item_id, ANALYSIS_BATCH).await;
        let comments = acquired_comments.value;
        info!(item_id, source = acquired_comments.source, "Fetched {} comments", comments.len());
        if let Err(e) = self.store.upsert_comments(&item_id, &comments).await {
            warn!(item_id, "Failed to store comments: {e}");
        }

        let analytics = self.aggregator.compute(&item_id).await;
        Ok(AnalysisReport {
            item,
            analytics,
            recent_comments: comments.into_iter().take(REPORT_COMMENTS).collect(),
            skipped_tiers: acquired_item
                .skipped
                .into_iter()
                .chain(acquired_comments.skipped)
                .map(|skip| PulseError::from(skip).to_string())
                .collect(),
        })
    }

    /// Start a monitoring session for `source`, publishing through `broadcaster`.
    pub fn monitor(&self, source: &str, broadcaster: Broadcaster) -> Result<MonitorHandle> {
        let item_id = extract_item_id(source)?;
        let session = PublishLoop::new(
            self.acquirer.clone(),
            self.store.clone(),
            self.aggregator.clone(),
            broadcaster,
            self.monitor,
        );
        Ok(session.spawn(item_id))
    }
}
