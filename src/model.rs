//! Core records: comments, items and their sentiment labels.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sentiment::SentimentScorer;

/// Three-way sentiment classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    /// All labels in reporting order.
    pub const ALL: [SentimentLabel; 3] = [Self::Positive, Self::Negative, Self::Neutral];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for SentimentLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "positive" => Ok(Self::Positive),
            "negative" => Ok(Self::Negative),
            "neutral" => Ok(Self::Neutral),
            other => Err(format!("unknown sentiment label: {other}")),
        }
    }
}

/// Primary emotion detected in a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Anger,
    Joy,
    Fear,
    Sadness,
    Surprise,
    Neutral,
}

impl Emotion {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Anger => "anger",
            Self::Joy => "joy",
            Self::Fear => "fear",
            Self::Sadness => "sadness",
            Self::Surprise => "surprise",
            Self::Neutral => "neutral",
        }
    }
}

/// A single comment on an item, already labelled.
///
/// Comments are immutable once built. A later acquisition cycle that
/// yields the same `comment_id` replaces the stored row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub comment_id: String,
    pub author: String,
    pub text: String,
    pub like_count: u64,
    pub timestamp: DateTime<Utc>,
    pub sentiment_score: f64,
    pub sentiment_label: SentimentLabel,
    #[serde(default)]
    pub reply_count: u32,
    #[serde(default)]
    pub is_reply: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

/// A comment as delivered by an acquisition tier, before labelling.
///
/// Tiers that score their own output fill `sentiment`; the rest leave it
/// `None` and the orchestrator scores the text.
#[derive(Debug, Clone, PartialEq)]
pub struct RawComment {
    pub comment_id: String,
    pub author: String,
    pub text: String,
    pub like_count: u64,
    pub timestamp: DateTime<Utc>,
    pub reply_count: u32,
    pub is_reply: bool,
    pub parent_id: Option<String>,
    pub sentiment: Option<(f64, SentimentLabel)>,
}

impl RawComment {
    /// Finish the comment, scoring it with `scorer` if the tier did not.
    #[must_use]
    pub fn label(self, scorer: &SentimentScorer) -> Comment {
        let (sentiment_score, sentiment_label) = self.sentiment.unwrap_or_else(|| {
            let result = scorer.score(&self.text);
            (result.score, result.label)
        });
        Comment {
            comment_id: self.comment_id,
            author: self.author,
            text: self.text,
            like_count: self.like_count,
            timestamp: self.timestamp,
            sentiment_score,
            sentiment_label,
            reply_count: self.reply_count,
            is_reply: self.is_reply,
            parent_id: self.parent_id,
        }
    }
}

/// Metadata for the monitored content item (a video).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub item_id: String,
    pub title: String,
    pub description: String,
    pub view_count: u64,
    pub like_count: u64,
    pub comment_count: u64,
    /// ISO-8601 duration as reported by the source, e.g. `PT12M45S`.
    pub duration: String,
    pub published_at: DateTime<Utc>,
    pub channel: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}
