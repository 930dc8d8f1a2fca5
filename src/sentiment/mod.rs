//! Sentiment and emotion scoring for comment text.
//!
//! Every score goes through the same steps: normalise the text, compute
//! the lexicon affinity, detect the emotion, then let the configured
//! [`ScoringStrategy`] turn that into a score and label. The strategy is
//! chosen once when the [`SentimentScorer`] is built:
//!
//! - [`LexicalStrategy`]: keyword counts only
//! - [`AugmentedStrategy`]: a [`PolarityProvider`] blended with the lexicon
//!
//! # Example
//!
//! ```rust
//! use commentpulse::sentiment::SentimentScorer;
//! use commentpulse::SentimentLabel;
//!
//! let scorer = SentimentScorer::lexical();
//! let result = scorer.score("This is terrible and awful, total garbage");
//! assert_eq!(result.label, SentimentLabel::Negative);
//! ```

pub mod lexicon;
pub mod pattern;

use std::sync::Arc;

use serde::Serialize;

use crate::config::{ScoringConfig, ScoringStrategy as StrategyKind};
use crate::model::{Emotion, SentimentLabel};

pub use pattern::PatternPolarity;

/// Output of a general-purpose polarity estimator.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Polarity {
    /// -1.0 ..= 1.0
    pub polarity: f64,
    /// 0.0 ..= 1.0
    pub subjectivity: f64,
}

/// Capability: produce polarity and subjectivity from normalised text.
pub trait PolarityProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn polarity(&self, normalized: &str) -> Polarity;
}

/// Score and label a strategy assigns to one text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub score: f64,
    pub label: SentimentLabel,
    pub polarity: f64,
    pub subjectivity: f64,
}

/// Turns normalised words and lexicon affinity into a classification.
pub trait ScoringStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn classify(&self, normalized: &str, words: &[&str], affinity: f64) -> Classification;
}

/// Full scoring result for one text. Folded into [`crate::Comment`], never stored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SentimentResult {
    pub score: f64,
    pub label: SentimentLabel,
    pub polarity: f64,
    pub subjectivity: f64,
    pub affinity: f64,
    pub confidence: f64,
    pub emotion: Emotion,
}

/// Keyword-count strategy.
///
/// The label follows whichever lexicon side has more hits; the magnitude
/// starts at 0.3 and grows 0.1 per extra hit, capped at 0.8.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalStrategy;

const LEXICAL_BASE: f64 = 0.3;
const LEXICAL_STEP: f64 = 0.1;
const LEXICAL_CAP: f64 = 0.8;

impl ScoringStrategy for LexicalStrategy {
    fn name(&self) -> &'static str {
        "lexical"
    }

    fn classify(&self, _normalized: &str, words: &[&str], _affinity: f64) -> Classification {
        let (positive, negative) = lexicon::keyword_counts(words);
        let (label, score) = match positive.cmp(&negative) {
            std::cmp::Ordering::Greater => (
                SentimentLabel::Positive,
                (LEXICAL_BASE + (positive - negative) as f64 * LEXICAL_STEP).min(LEXICAL_CAP),
            ),
            std::cmp::Ordering::Less => (
                SentimentLabel::Negative,
                (-LEXICAL_BASE - (negative - positive) as f64 * LEXICAL_STEP).max(-LEXICAL_CAP),
            ),
            std::cmp::Ordering::Equal => (SentimentLabel::Neutral, 0.0),
        };
        Classification {
            score,
            label,
            polarity: score,
            subjectivity: 0.5,
        }
    }
}

/// Blend of a general-purpose polarity with the lexicon affinity.
pub struct AugmentedStrategy {
    provider: Arc<dyn PolarityProvider>,
    blend_weight: f64,
    positive_threshold: f64,
    negative_threshold: f64,
}

impl AugmentedStrategy {
    pub fn new(provider: Arc<dyn PolarityProvider>, config: &ScoringConfig) -> Self {
        Self {
            provider,
            blend_weight: config.blend_weight.clamp(0.0, 1.0),
            positive_threshold: config.positive_threshold,
            negative_threshold: config.negative_threshold,
        }
    }
}

impl ScoringStrategy for AugmentedStrategy {
    fn name(&self) -> &'static str {
        "augmented"
    }

    fn classify(&self, normalized: &str, _words: &[&str], affinity: f64) -> Classification {
        let external = self.provider.polarity(normalized);
        let score = (self.blend_weight * external.polarity
            + (1.0 - self.blend_weight) * affinity)
            .clamp(-1.0, 1.0);
        let label = if score > self.positive_threshold {
            SentimentLabel::Positive
        } else if score < self.negative_threshold {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        };
        Classification {
            score,
            label,
            polarity: external.polarity,
            subjectivity: external.subjectivity,
        }
    }
}

/// Scores comment text. Cheap to clone.
#[derive(Clone)]
pub struct SentimentScorer {
    strategy: Arc<dyn ScoringStrategy>,
}

impl SentimentScorer {
    pub fn new(strategy: Arc<dyn ScoringStrategy>) -> Self {
        Self { strategy }
    }

    /// Lexicon-only scorer.
    #[must_use]
    pub fn lexical() -> Self {
        Self::new(Arc::new(LexicalStrategy))
    }

    /// Augmented scorer over the built-in [`PatternPolarity`].
    #[must_use]
    pub fn augmented(config: &ScoringConfig) -> Self {
        Self::with_provider(Arc::new(PatternPolarity), config)
    }

    /// Augmented scorer over a caller-supplied polarity provider.
    pub fn with_provider(provider: Arc<dyn PolarityProvider>, config: &ScoringConfig) -> Self {
        Self::new(Arc::new(AugmentedStrategy::new(provider, config)))
    }

    /// Resolve the strategy named in the config.
    #[must_use]
    pub fn from_config(config: &ScoringConfig) -> Self {
        let scorer = match config.strategy {
            StrategyKind::Lexical => Self::lexical(),
            StrategyKind::Augmented => Self::augmented(config),
        };
        tracing::debug!("Sentiment strategy: {}", scorer.strategy_name());
        scorer
    }

    #[must_use]
    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Score `text`. Total over all inputs, including the empty string.
    #[must_use]
    pub fn score(&self, text: &str) -> SentimentResult {
        let normalized = lexicon::normalize(text);
        let words: Vec<&str> = normalized.split_whitespace().collect();
        let affinity = lexicon::affinity(&words);
        let emotion = lexicon::detect_emotion(&normalized);
        let c = self.strategy.classify(&normalized, &words, affinity);
        let score = if c.score.is_finite() { c.score.clamp(-1.0, 1.0) } else { 0.0 };

        SentimentResult {
            score,
            label: c.label,
            polarity: c.polarity,
            subjectivity: c.subjectivity,
            affinity,
            confidence: score.abs(),
            emotion,
        }
    }
}

impl Default for SentimentScorer {
    fn default() -> Self {
        Self::augmented(&ScoringConfig::default())
    }
}

impl std::fmt::Debug for SentimentScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SentimentScorer")
            .field("strategy", &self.strategy.name())
            .finish()
    }
}
