//! Rolling analytics over stored comments.
//!
//! A snapshot is always recomputed from scratch for one item. When the
//! store has nothing for the item (or cannot be read) the aggregator
//! returns a synthetic, well-formed snapshot instead of an empty one.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::model::{Comment, SentimentLabel};
use crate::store::CommentStore;

/// Number of terms reported in `top_words`.
pub const TOP_TERMS: usize = 20;

/// Upper bound on `time_trend` length.
pub const MAX_TREND_BUCKETS: usize = 10;

static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\w+\b").expect("valid word regex"));

/// Per-label comment counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCounts {
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
}

impl LabelCounts {
    fn add(&mut self, label: SentimentLabel) {
        match label {
            SentimentLabel::Positive => self.positive += 1,
            SentimentLabel::Negative => self.negative += 1,
            SentimentLabel::Neutral => self.neutral += 1,
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.positive + self.negative + self.neutral
    }

    /// Share of `count` in the total, in percent. 0 for an empty set.
    fn percent(&self, count: usize) -> f64 {
        match self.total() {
            0 => 0.0,
            total => count as f64 / total as f64 * 100.0,
        }
    }
}

/// One bucket of the sentiment trend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub timestamp: DateTime<Utc>,
    pub sentiment: f64,
}

/// Analytics for one item at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSnapshot {
    pub total_comments: usize,
    pub avg_sentiment: f64,
    /// Like-weighted mean score; 0 when no comment has likes.
    pub weighted_sentiment: f64,
    pub sentiment_distribution: LabelCounts,
    pub positive_percentage: f64,
    pub negative_percentage: f64,
    pub neutral_percentage: f64,
    pub time_trend: Vec<TrendPoint>,
    /// `(term, count)` pairs, most frequent first.
    pub top_words: Vec<(String, usize)>,
    /// Mean likes per comment.
    pub engagement_score: f64,
}

impl AnalyticsSnapshot {
    /// Compute analytics from comments ordered newest first.
    ///
    /// Returns `None` for an empty set; callers decide what a zero-data
    /// snapshot should look like.
    #[must_use]
    pub fn from_comments(comments: &[Comment]) -> Option<Self> {
        if comments.is_empty() {
            return None;
        }
        let total = comments.len();

        let mut distribution = LabelCounts::default();
        let mut score_sum = 0.0;
        let mut weighted_sum = 0.0;
        let mut like_sum: u64 = 0;
        for c in comments {
            distribution.add(c.sentiment_label);
            score_sum += c.sentiment_score;
            weighted_sum += c.sentiment_score * c.like_count as f64;
            like_sum += c.like_count;
        }

        Some(Self {
            total_comments: total,
            avg_sentiment: score_sum / total as f64,
            weighted_sentiment: weighted_mean(weighted_sum, like_sum),
            sentiment_distribution: distribution,
            positive_percentage: distribution.percent(distribution.positive),
            negative_percentage: distribution.percent(distribution.negative),
            neutral_percentage: distribution.percent(distribution.neutral),
            time_trend: time_trend(comments),
            top_words: top_terms(comments.iter().map(|c| c.text.as_str()), TOP_TERMS),
            engagement_score: like_sum as f64 / total as f64,
        })
    }

    /// Plausible snapshot for an item with no stored comments.
    ///
    /// Percentages are derived from the generated counts, so the
    /// distribution invariants hold here too.
    pub fn synthetic<R: Rng>(rng: &mut R) -> Self {
        let distribution = LabelCounts {
            positive: rng.gen_range(20..=60),
            negative: rng.gen_range(10..=40),
            neutral: rng.gen_range(15..=45),
        };
        let now = Utc::now();
        let time_trend = (1..=MAX_TREND_BUCKETS as i64)
            .rev()
            .map(|hours| TrendPoint {
                timestamp: now - Duration::hours(hours),
                sentiment: round_to(rng.gen_range(-0.5..=0.8), 2),
            })
            .collect();
        let top_words = SYNTHETIC_TERMS
            .iter()
            .map(|(term, count)| ((*term).to_string(), *count))
            .collect();

        Self {
            total_comments: distribution.total(),
            avg_sentiment: round_to(rng.gen_range(-0.5..=0.7), 3),
            weighted_sentiment: round_to(rng.gen_range(-0.3..=0.8), 3),
            sentiment_distribution: distribution,
            positive_percentage: distribution.percent(distribution.positive),
            negative_percentage: distribution.percent(distribution.negative),
            neutral_percentage: distribution.percent(distribution.neutral),
            time_trend,
            top_words,
            engagement_score: round_to(rng.gen_range(3.0..=15.0), 1),
        }
    }
}

const SYNTHETIC_TERMS: &[(&str, usize)] = &[
    ("analysis", 25),
    ("great", 20),
    ("political", 18),
    ("excellent", 15),
    ("good", 12),
    ("interesting", 10),
    ("helpful", 8),
    ("thanks", 7),
    ("policy", 6),
    ("insightful", 5),
];

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

fn weighted_mean(weighted_sum: f64, like_sum: u64) -> f64 {
    if like_sum == 0 {
        0.0
    } else {
        weighted_sum / like_sum as f64
    }
}

/// Consecutive batches of `ceil(n / 10)` comments, each reported at its
/// first member's timestamp with the batch mean score.
fn time_trend(comments: &[Comment]) -> Vec<TrendPoint> {
    let batch = comments.len().div_ceil(MAX_TREND_BUCKETS).max(1);
    comments
        .chunks(batch)
        .map(|chunk| TrendPoint {
            timestamp: chunk[0].timestamp,
            sentiment: chunk.iter().map(|c| c.sentiment_score).sum::<f64>() / chunk.len() as f64,
        })
        .collect()
}

/// The `limit` most frequent lowercase word tokens across `texts`.
///
/// Ties keep the order in which terms were first seen.
pub fn top_terms<'a>(texts: impl IntoIterator<Item = &'a str>, limit: usize) -> Vec<(String, usize)> {
    let joined = texts.into_iter().collect::<Vec<_>>().join(" ").to_lowercase();

    // term -> (count, first position)
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (pos, m) in WORD_RE.find_iter(&joined).enumerate() {
        counts.entry(m.as_str()).or_insert((0, pos)).0 += 1;
    }

    let mut ranked: Vec<(&str, usize, usize)> = counts
        .into_iter()
        .map(|(term, (count, first))| (term, count, first))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
    ranked
        .into_iter()
        .take(limit)
        .map(|(term, count, _)| (term.to_string(), count))
        .collect()
}

/// Computes [`AnalyticsSnapshot`]s from the comment store.
pub struct AnalyticsAggregator {
    store: Arc<dyn CommentStore>,
    rng: Mutex<StdRng>,
}

impl AnalyticsAggregator {
    pub fn new(store: Arc<dyn CommentStore>) -> Self {
        Self::with_rng(store, StdRng::from_entropy())
    }

    /// Aggregator whose zero-data fallback draws from `rng`.
    pub fn with_rng(store: Arc<dyn CommentStore>, rng: StdRng) -> Self {
        Self {
            store,
            rng: Mutex::new(rng),
        }
    }

    /// Snapshot for `item_id`. Never fails.
    pub async fn compute(&self, item_id: &str) -> AnalyticsSnapshot {
        let comments = match self.store.query_top_level_comments(item_id).await {
            Ok(comments) => comments,
            Err(e) => {
                warn!(item_id, "Store read failed, using synthetic analytics: {e}");
                Vec::new()
            }
        };

        if let Some(snapshot) = AnalyticsSnapshot::from_comments(&comments) {
            debug!(item_id, total = snapshot.total_comments, "Computed analytics");
            return snapshot;
        }

        debug!(item_id, "No stored comments, using synthetic analytics");
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        AnalyticsSnapshot::synthetic(&mut *rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::error::{PulseError, Result};
    use crate::model::Item;
    use crate::store::tests::comment;
    use crate::store::MemoryStore;

    fn assert_distribution_sums(snapshot: &AnalyticsSnapshot) {
        let sum = snapshot.positive_percentage + snapshot.negative_percentage + snapshot.neutral_percentage;
        assert!((sum - 100.0).abs() < 1e-9, "percentages sum to {sum}");
        for p in [
            snapshot.positive_percentage,
            snapshot.negative_percentage,
            snapshot.neutral_percentage,
        ] {
            assert!((0.0..=100.0).contains(&p));
        }
        assert_eq!(snapshot.sentiment_distribution.total(), snapshot.total_comments);
    }

    #[test]
    fn empty_set_has_no_snapshot() {
        assert!(AnalyticsSnapshot::from_comments(&[]).is_none());
    }

    #[test]
    fn distribution_and_means() {
        let comments = vec![
            comment("a", 3, 2, 0.5),
            comment("b", 2, 0, -0.5),
            comment("c", 1, 6, 0.0),
        ];
        let s = AnalyticsSnapshot::from_comments(&comments).unwrap();
        assert_eq!(s.total_comments, 3);
        assert_eq!(
            s.sentiment_distribution,
            LabelCounts {
                positive: 1,
                negative: 1,
                neutral: 1
            }
        );
        assert!(s.avg_sentiment.abs() < 1e-12);
        // (0.5*2 + 0*6) / 8
        assert!((s.weighted_sentiment - 0.125).abs() < 1e-12);
        assert!((s.engagement_score - 8.0 / 3.0).abs() < 1e-12);
        assert_distribution_sums(&s);
    }

    #[test]
    fn weighted_sentiment_is_zero_without_likes() {
        let comments = vec![comment("a", 1, 0, 0.9), comment("b", 0, 0, 0.7)];
        let s = AnalyticsSnapshot::from_comments(&comments).unwrap();
        assert!(s.weighted_sentiment.abs() < f64::EPSILON);
        assert!(s.engagement_score.abs() < f64::EPSILON);
    }

    #[test]
    fn small_sets_have_one_trend_bucket() {
        let comments: Vec<Comment> = (0..7).map(|i| comment(&i.to_string(), -i, 0, 0.2)).collect();
        let s = AnalyticsSnapshot::from_comments(&comments).unwrap();
        assert_eq!(s.time_trend.len(), 1);
        assert_eq!(s.time_trend[0].timestamp, comments[0].timestamp);
        assert!((s.time_trend[0].sentiment - 0.2).abs() < 1e-12);
    }

    #[test]
    fn trend_never_exceeds_ten_buckets() {
        for n in [1, 9, 10, 11, 25, 99, 100, 101, 457] {
            let comments: Vec<Comment> = (0..n).map(|i| comment(&i.to_string(), -i, 0, 0.0)).collect();
            let trend = AnalyticsSnapshot::from_comments(&comments).unwrap().time_trend;
            assert!(trend.len() <= MAX_TREND_BUCKETS, "{n} comments gave {} buckets", trend.len());
            assert!(!trend.is_empty());
        }
    }

    #[test]
    fn trend_buckets_average_their_batch() {
        // 20 comments -> batches of 2
        let comments: Vec<Comment> = (0..20)
            .map(|i| comment(&i.to_string(), -i, 0, if i % 2 == 0 { 1.0 } else { 0.0 }))
            .collect();
        let trend = AnalyticsSnapshot::from_comments(&comments).unwrap().time_trend;
        assert_eq!(trend.len(), 10);
        assert!(trend.iter().all(|p| (p.sentiment - 0.5).abs() < 1e-12));
        assert_eq!(trend[1].timestamp, comments[2].timestamp);
    }

    #[test]
    fn top_terms_break_ties_by_first_seen() {
        let terms = top_terms(["Beta alpha beta", "gamma ALPHA delta"], 3);
        assert_eq!(
            terms,
            vec![("beta".to_string(), 2), ("alpha".to_string(), 2), ("gamma".to_string(), 1)]
        );
    }

    #[test]
    fn top_terms_are_capped() {
        let text: String = (0..50).map(|i| format!("w{i} ")).collect();
        assert_eq!(top_terms([text.as_str()], TOP_TERMS).len(), TOP_TERMS);
    }

    #[test]
    fn synthetic_snapshot_is_well_formed() {
        let mut rng = StdRng::seed_from_u64(9);
        let s = AnalyticsSnapshot::synthetic(&mut rng);
        assert!(s.total_comments > 0);
        assert_eq!(s.time_trend.len(), MAX_TREND_BUCKETS);
        assert!(s.time_trend.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        assert_eq!(s.top_words[0], ("analysis".to_string(), 25));
        assert_distribution_sums(&s);
    }

    #[tokio::test]
    async fn empty_store_yields_synthetic_snapshot() {
        let aggregator = AnalyticsAggregator::with_rng(Arc::new(MemoryStore::new()), StdRng::seed_from_u64(1));
        let s = aggregator.compute("nothing-stored").await;
        assert!(s.total_comments > 0);
        assert_distribution_sums(&s);
    }

    #[tokio::test]
    async fn stored_comments_drive_snapshot() {
        let store = Arc::new(MemoryStore::new());
        store
            .upsert_comments("vid", &[comment("a", 1, 1, 0.5), comment("b", 2, 1, -0.5)])
            .await
            .unwrap();
        let aggregator = AnalyticsAggregator::new(store);
        let s = aggregator.compute("vid").await;
        assert_eq!(s.total_comments, 2);
        assert!((s.positive_percentage - 50.0).abs() < 1e-12);
    }

    struct BrokenStore;

    #[async_trait]
    impl CommentStore for BrokenStore {
        async fn upsert_comments(&self, _: &str, _: &[Comment]) -> Result<()> {
            Err(PulseError::StoreUnavailable("disk gone".into()))
        }

        async fn upsert_item(&self, _: &Item) -> Result<()> {
            Err(PulseError::StoreUnavailable("disk gone".into()))
        }

        async fn query_top_level_comments(&self, _: &str) -> Result<Vec<Comment>> {
            Err(PulseError::StoreUnavailable("disk gone".into()))
        }

        async fn get_item(&self, _: &str) -> Result<Option<Item>> {
            Err(PulseError::StoreUnavailable("disk gone".into()))
        }
    }

    #[tokio::test]
    async fn unavailable_store_degrades_to_synthetic() {
        let aggregator = AnalyticsAggregator::with_rng(Arc::new(BrokenStore), StdRng::seed_from_u64(2));
        assert!(aggregator.compute("vid").await.total_comments > 0);
    }
}
