//! Domain keyword lexicon, text normalisation and emotion keywords.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::Emotion;

pub const POSITIVE: &[&str] = &[
    "great", "excellent", "amazing", "fantastic", "wonderful", "brilliant", "outstanding",
    "perfect", "love", "awesome", "incredible", "superb",
];

pub const NEGATIVE: &[&str] = &[
    "terrible", "awful", "horrible", "disgusting", "pathetic", "waste", "stupid", "ridiculous",
    "hate", "worst", "trash", "garbage",
];

/// Emotion keyword sets in priority order. First set with a hit wins.
pub const EMOTIONS: &[(Emotion, &[&str])] = &[
    (
        Emotion::Anger,
        &["angry", "mad", "furious", "outraged", "livid", "pissed", "rage"],
    ),
    (
        Emotion::Joy,
        &["happy", "excited", "thrilled", "delighted", "ecstatic", "cheerful", "joyful"],
    ),
    (
        Emotion::Fear,
        &["scared", "afraid", "worried", "anxious", "concerned", "nervous"],
    ),
    (
        Emotion::Sadness,
        &["sad", "disappointed", "depressed", "upset", "heartbroken", "miserable"],
    ),
    (
        Emotion::Surprise,
        &["surprised", "shocked", "amazed", "astonished", "stunned", "wow"],
    ),
];

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)https?\S+|www\S+").expect("valid URL regex"));
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[@#]\w+").expect("valid mention regex"));
static NON_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s]").expect("valid punctuation regex"));

/// Strip URLs, @-mentions, #-tags and punctuation, then lowercase.
#[must_use]
pub fn normalize(text: &str) -> String {
    let text = URL_RE.replace_all(text, "");
    let text = TAG_RE.replace_all(&text, "");
    let text = NON_WORD_RE.replace_all(&text, " ");
    text.to_lowercase().trim().to_string()
}

/// Positive and negative lexicon hits among `words`.
#[must_use]
pub fn keyword_counts(words: &[&str]) -> (usize, usize) {
    let positive = words.iter().filter(|w| POSITIVE.contains(w)).count();
    let negative = words.iter().filter(|w| NEGATIVE.contains(w)).count();
    (positive, negative)
}

/// `(positive - negative) / words`, or 0 for no words.
#[must_use]
pub fn affinity(words: &[&str]) -> f64 {
    if words.is_empty() {
        return 0.0;
    }
    let (positive, negative) = keyword_counts(words);
    (positive as f64 - negative as f64) / words.len() as f64
}

/// Substring match against the emotion sets, in priority order.
#[must_use]
pub fn detect_emotion(normalized: &str) -> Emotion {
    EMOTIONS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| normalized.contains(k)))
        .map_or(Emotion::Neutral, |(emotion, _)| *emotion)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_urls_mentions_and_punctuation() {
        let text = "https://example.com/x?y=1 @someone #politics GREAT video!!!";
        assert_eq!(normalize(text), "great video");
    }

    #[test]
    fn normalize_keeps_underscores_and_digits() {
        assert_eq!(normalize("top_10 reasons, 2025."), "top_10 reasons  2025");
    }

    #[test]
    fn affinity_is_zero_without_words() {
        assert!(affinity(&[]).abs() < f64::EPSILON);
    }

    #[test]
    fn affinity_balances_hits_over_word_count() {
        let words = ["great", "but", "awful", "and", "worst"];
        assert!((affinity(&words) + 0.2).abs() < 1e-9);
    }

    #[test]
    fn emotion_priority_prefers_anger_over_joy() {
        assert_eq!(detect_emotion("i am happy but also furious"), Emotion::Anger);
        assert_eq!(detect_emotion("so happy and sad"), Emotion::Joy);
        assert_eq!(detect_emotion("wow"), Emotion::Surprise);
        assert_eq!(detect_emotion("plain statement"), Emotion::Neutral);
    }
}
