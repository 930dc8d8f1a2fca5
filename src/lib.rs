//! `CommentPulse` - Live comment sentiment analytics
//!
//! # Features
//!
//! - **Tiered acquisition**: API, watch page and browser tiers, with a synthetic fallback that never fails
//! - **Sentiment scoring**: lexicon keywords blended with a pluggable polarity provider
//! - **Analytics**: label distribution, like-weighted sentiment, time trend, top terms
//! - **Live updates**: WebSocket fan-out with per-subscriber failure isolation
//!
//! # Example
//!
//! ```rust,no_run
//! use commentpulse::Analyzer;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let analyzer = Analyzer::offline(7);
//!     let report = analyzer.analyze("https://youtu.be/O6DTtVOPwEU").await?;
//!     println!(
//!         "{}: {:.1}% positive",
//!         report.item.title, report.analytics.positive_percentage
//!     );
//!     Ok(())
//! }
//! ```

pub mod acquire;
pub mod analytics;
pub mod app;
pub mod config;
pub mod error;
pub mod live;
pub mod model;
pub mod monitor;
pub mod sentiment;
pub mod store;

pub use acquire::{extract_item_id, Acquirer, AcquisitionTier, TierOutcome};
pub use analytics::{AnalyticsAggregator, AnalyticsSnapshot};
pub use app::{AnalysisReport, Analyzer};
pub use config::Config;
pub use error::{PulseError, Result};
pub use live::{Broadcaster, LiveMessage, LiveServer};
pub use model::{Comment, Emotion, Item, SentimentLabel};
pub use monitor::{MonitorHandle, MonitorSettings, PublishLoop};
pub use sentiment::{SentimentResult, SentimentScorer};
pub use store::{CommentStore, MemoryStore, SqliteStore};

/// Version of commentpulse
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
