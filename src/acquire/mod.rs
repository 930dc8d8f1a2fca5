//! Tiered acquisition of item metadata and comments.
//!
//! # Architecture
//!
//! - [`AcquisitionTier`]: one ranked strategy (API client, page fetch, browser)
//! - [`TierOutcome`]: what a tier reports, either a hit or a request to try the next tier
//! - [`Acquirer`]: walks the tiers in order and ends at the [`SyntheticGenerator`],
//!   which cannot fail, so both operations always produce a result
//!
//! # Example
//!
//! ```rust,no_run
//! use commentpulse::acquire::{extract_item_id, Acquirer};
//! use commentpulse::sentiment::SentimentScorer;
//!
//! # async fn example() -> commentpulse::Result<()> {
//! let acquirer = Acquirer::synthetic_only(SentimentScorer::lexical());
//! let id = extract_item_id("https://youtu.be/O6DTtVOPwEU")?;
//! let comments = acquirer.get_comments(&id, 20).await;
//! assert!(comments.len() <= 20);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod browser;
pub mod http;
pub mod page;
pub mod synthetic;

use std::fmt;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::config::AcquisitionConfig;
use crate::error::{PulseError, Result};
use crate::model::{Comment, Item, RawComment};
use crate::sentiment::SentimentScorer;

pub use api::ApiTier;
pub use browser::BrowserTier;
pub use http::HttpClient;
pub use page::PageTier;
pub use synthetic::SyntheticGenerator;

/// Result of asking one tier for data.
#[derive(Debug)]
pub enum TierOutcome<T> {
    /// The tier produced a value.
    Hit(T),
    /// The tier could not help; the reason is logged and the next tier runs.
    Fallthrough(String),
}

impl<T> TierOutcome<T> {
    /// Fallthrough for an operation the tier does not implement.
    pub fn unsupported(what: &str) -> Self {
        Self::Fallthrough(format!("{what} not supported by this tier"))
    }
}

impl<T> From<anyhow::Result<T>> for TierOutcome<T> {
    fn from(result: anyhow::Result<T>) -> Self {
        match result {
            Ok(value) => Self::Hit(value),
            Err(e) => Self::Fallthrough(format!("{e:#}")),
        }
    }
}

/// One ranked acquisition strategy.
#[async_trait]
pub trait AcquisitionTier: Send + Sync {
    /// Tier name for logs (e.g. "api", "page").
    fn name(&self) -> &'static str;

    async fn fetch_item(&self, item_id: &str) -> TierOutcome<Item>;

    /// Up to `max_count` comments, in the tier's own order.
    async fn fetch_comments(&self, item_id: &str, max_count: usize) -> TierOutcome<Vec<RawComment>>;
}

/// Where an acquired value came from and which tiers were skipped on the way.
#[derive(Debug, Clone)]
pub struct Acquired<T> {
    pub value: T,
    pub source: &'static str,
    pub skipped: Vec<TierSkip>,
}

/// A tier that fell through, with its reason.
#[derive(Debug, Clone)]
pub struct TierSkip {
    pub tier: &'static str,
    pub reason: String,
}

impl fmt::Display for TierSkip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.tier, self.reason)
    }
}

impl From<TierSkip> for PulseError {
    fn from(skip: TierSkip) -> Self {
        Self::AcquisitionTier {
            tier: skip.tier,
            reason: skip.reason,
        }
    }
}

/// Name reported when the synthetic generator supplied the value.
pub const SYNTHETIC_SOURCE: &str = "synthetic";

/// Ordered fallback chain over acquisition tiers.
///
/// Tiers are tried in registration order; the synthetic generator always
/// closes the chain. Tier failures never escape these methods.
pub struct Acquirer {
    tiers: Vec<Arc<dyn AcquisitionTier>>,
    synthetic: SyntheticGenerator,
    scorer: SentimentScorer,
}

impl Acquirer {
    pub fn new(
        tiers: Vec<Arc<dyn AcquisitionTier>>,
        synthetic: SyntheticGenerator,
        scorer: SentimentScorer,
    ) -> Self {
        Self {
            tiers,
            synthetic,
            scorer,
        }
    }

    /// Chain with no live tiers at all.
    #[must_use]
    pub fn synthetic_only(scorer: SentimentScorer) -> Self {
        Self::new(Vec::new(), SyntheticGenerator::new(scorer.clone()), scorer)
    }

    /// Resolve the tier registry from config.
    ///
    /// The API tier is registered only with a key; the page tier only when
    /// an HTTP client can be built; the browser tier only when enabled.
    #[must_use]
    pub fn from_config(config: &AcquisitionConfig, scorer: SentimentScorer) -> Self {
        let mut tiers: Vec<Arc<dyn AcquisitionTier>> = Vec::new();

        match HttpClient::new(config) {
            Ok(client) => {
                if let Some(key) = config.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
                    tiers.push(Arc::new(ApiTier::new(client.clone(), key)));
                }
                tiers.push(Arc::new(PageTier::new(client)));
            }
            Err(e) => warn!("HTTP client unavailable, network tiers disabled: {e:#}"),
        }
        if config.browser_enabled {
            tiers.push(Arc::new(BrowserTier));
        }

        let names: Vec<&str> = tiers.iter().map(|t| t.name()).collect();
        info!("Acquisition tiers: {:?} -> {}", names, SYNTHETIC_SOURCE);

        Self::new(tiers, SyntheticGenerator::new(scorer.clone()), scorer)
    }

    /// Names of the registered tiers, in order, excluding the synthetic fallback.
    #[must_use]
    pub fn tier_names(&self) -> Vec<&'static str> {
        self.tiers.iter().map(|t| t.name()).collect()
    }

    /// Item metadata from the first tier that has it.
    pub async fn acquire_item(&self, item_id: &str) -> Acquired<Item> {
        let mut skipped = Vec::new();
        for tier in &self.tiers {
            debug!(tier = tier.name(), item_id, "Fetching item");
            match tier.fetch_item(item_id).await {
                TierOutcome::Hit(item) => {
                    return Acquired {
                        value: item,
                        source: tier.name(),
                        skipped,
                    }
                }
                TierOutcome::Fallthrough(reason) => {
                    warn!(tier = tier.name(), item_id, "Item fetch fell through: {reason}");
                    skipped.push(TierSkip {
                        tier: tier.name(),
                        reason,
                    });
                }
            }
        }
        info!(item_id, "Using synthetic item metadata");
        Acquired {
            value: self.synthetic.item(item_id),
            source: SYNTHETIC_SOURCE,
            skipped,
        }
    }

    /// Up to `max_count` labelled comments from the first tier that has any.
    ///
    /// An empty batch from a live tier counts as a fallthrough.
    pub async fn acquire_comments(&self, item_id: &str, max_count: usize) -> Acquired<Vec<Comment>> {
        let mut skipped = Vec::new();
        for tier in &self.tiers {
            debug!(tier = tier.name(), item_id, max_count, "Fetching comments");
            let reason = match tier.fetch_comments(item_id, max_count).await {
                TierOutcome::Hit(raw) if !raw.is_empty() => {
                    let comments: Vec<Comment> = raw
                        .into_iter()
                        .take(max_count)
                        .map(|c| c.label(&self.scorer))
                        .collect();
                    info!(tier = tier.name(), item_id, "Fetched {} comments", comments.len());
                    return Acquired {
                        value: comments,
                        source: tier.name(),
                        skipped,
                    };
                }
                TierOutcome::Hit(_) => "returned no comments".to_string(),
                TierOutcome::Fallthrough(reason) => reason,
            };
            warn!(tier = tier.name(), item_id, "Comment fetch fell through: {reason}");
            skipped.push(TierSkip {
                tier: tier.name(),
                reason,
            });
        }
        info!(item_id, "Using synthetic comments");
        let comments = self.synthetic.comments(item_id, max_count);
        Acquired {
            value: comments,
            source: SYNTHETIC_SOURCE,
            skipped,
        }
    }

    pub async fn get_item(&self, item_id: &str) -> Item {
        self.acquire_item(item_id).await.value
    }

    pub async fn get_comments(&self, item_id: &str, max_count: usize) -> Vec<Comment> {
        self.acquire_comments(item_id, max_count).await.value
    }
}

static ID_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:v=|/)([0-9A-Za-z_-]{11})").expect("valid id regex"));
static BARE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9A-Za-z_-]{11}$").expect("valid bare id regex"));

const WATCH_HOSTS: &[&str] = &["youtube.com", "www.youtube.com", "m.youtube.com", "music.youtube.com"];
const SHORT_HOSTS: &[&str] = &["youtu.be", "www.youtu.be"];

/// Extract the item id from a source URL.
///
/// Recognises `…/watch?v=<id>`, `youtu.be/<id>`, then any 11-character id
/// token after `v=` or `/`. A bare 11-character id is accepted as-is.
pub fn extract_item_id(source: &str) -> Result<String> {
    let source = source.trim();
    if BARE_ID_RE.is_match(source) {
        return Ok(source.to_string());
    }

    if let Ok(parsed) = url::Url::parse(source) {
        let host = parsed.host_str().unwrap_or_default().to_ascii_lowercase();
        if WATCH_HOSTS.contains(&host.as_str()) && parsed.path() == "/watch" {
            if let Some((_, id)) = parsed.query_pairs().find(|(k, _)| k == "v") {
                if !id.is_empty() {
                    return Ok(id.into_owned());
                }
            }
        } else if SHORT_HOSTS.contains(&host.as_str()) {
            if let Some(id) = parsed.path_segments().and_then(|mut s| s.next()) {
                if !id.is_empty() {
                    return Ok(id.to_string());
                }
            }
        }
    }

    ID_TOKEN_RE
        .captures(source)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| PulseError::InvalidReference(format!("no item id in {source}")))
}
