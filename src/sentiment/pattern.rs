//! Built-in general-purpose polarity provider.
//!
//! Averages (polarity, subjectivity) over adjectives found in a small
//! lexicon. An intensifier multiplies the next hit; a negation flips it
//! at half strength. Pending modifiers expire after a few unrelated words.

use std::collections::HashMap;
use std::sync::LazyLock;

use super::{Polarity, PolarityProvider};

/// (word, polarity, subjectivity)
const ADJECTIVES: &[(&str, f64, f64)] = &[
    ("good", 0.7, 0.6),
    ("great", 0.8, 0.75),
    ("excellent", 1.0, 1.0),
    ("amazing", 0.6, 0.9),
    ("awesome", 1.0, 1.0),
    ("brilliant", 0.9, 1.0),
    ("fantastic", 0.4, 0.9),
    ("wonderful", 1.0, 1.0),
    ("perfect", 1.0, 1.0),
    ("outstanding", 0.5, 0.5),
    ("superb", 1.0, 1.0),
    ("incredible", 0.9, 0.9),
    ("nice", 0.6, 1.0),
    ("best", 1.0, 0.3),
    ("better", 0.5, 0.5),
    ("love", 0.5, 0.6),
    ("helpful", 0.5, 0.5),
    ("insightful", 0.5, 0.6),
    ("informative", 0.5, 0.6),
    ("interesting", 0.5, 0.5),
    ("valuable", 0.5, 0.6),
    ("clear", 0.1, 0.4),
    ("clearly", 0.1, 0.4),
    ("thorough", 0.3, 0.5),
    ("thoughtful", 0.4, 0.6),
    ("balanced", 0.3, 0.4),
    ("refreshing", 0.4, 0.6),
    ("commendable", 0.5, 0.7),
    ("accessible", 0.2, 0.4),
    ("original", 0.4, 0.75),
    ("objective", 0.2, 0.3),
    ("informed", 0.3, 0.4),
    ("quality", 0.3, 0.4),
    ("important", 0.4, 1.0),
    ("critical", 0.0, 0.8),
    ("decent", 0.17, 0.5),
    ("adequate", 0.1, 0.4),
    ("okay", 0.5, 0.5),
    ("fine", 0.42, 0.5),
    ("average", -0.15, 0.4),
    ("bad", -0.7, 0.67),
    ("poor", -0.4, 0.6),
    ("worse", -0.4, 0.6),
    ("worst", -1.0, 1.0),
    ("terrible", -1.0, 1.0),
    ("awful", -1.0, 1.0),
    ("horrible", -1.0, 1.0),
    ("disgusting", -1.0, 1.0),
    ("pathetic", -1.0, 1.0),
    ("stupid", -0.8, 1.0),
    ("ridiculous", -0.33, 0.67),
    ("hate", -0.8, 0.9),
    ("garbage", -0.8, 0.8),
    ("trash", -0.8, 0.8),
    ("waste", -0.2, 0.0),
    ("wrong", -0.5, 0.9),
    ("incomplete", -0.2, 0.4),
    ("problematic", -0.4, 0.6),
    ("questionable", -0.3, 0.7),
    ("concerning", -0.3, 0.6),
    ("divisive", -0.3, 0.6),
    ("biased", -0.4, 0.7),
    ("bias", -0.3, 0.6),
    ("disappointing", -0.6, 0.7),
    ("boring", -1.0, 1.0),
    ("misleading", -0.5, 0.7),
    ("complex", -0.1, 0.4),
    ("sad", -0.5, 1.0),
    ("angry", -0.5, 1.0),
    ("happy", 0.8, 1.0),
];

const INTENSIFIERS: &[(&str, f64)] = &[
    ("very", 1.3),
    ("really", 1.2),
    ("extremely", 1.5),
    ("so", 1.2),
    ("truly", 1.2),
    ("quite", 1.1),
    ("somewhat", 0.8),
    ("rather", 0.9),
    ("slightly", 0.7),
];

/// `t` is what remains of "n't" after punctuation is stripped.
const NEGATIONS: &[&str] = &["not", "no", "never", "nothing", "cannot", "t"];

/// Words a pending modifier survives before it lapses.
const MODIFIER_WINDOW: usize = 3;

static ADJECTIVE_INDEX: LazyLock<HashMap<&'static str, (f64, f64)>> = LazyLock::new(|| {
    ADJECTIVES
        .iter()
        .map(|&(word, polarity, subjectivity)| (word, (polarity, subjectivity)))
        .collect()
});

/// Lexicon-based polarity/subjectivity estimator.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternPolarity;

impl PolarityProvider for PatternPolarity {
    fn name(&self) -> &'static str {
        "pattern"
    }

    fn polarity(&self, normalized: &str) -> Polarity {
        let mut hits: Vec<(f64, f64)> = Vec::new();
        let mut intensity = 1.0;
        let mut negated = false;
        let mut since_modifier = 0;

        for word in normalized.split_whitespace() {
            if let Some(&(polarity, subjectivity)) = ADJECTIVE_INDEX.get(word) {
                let mut polarity = polarity * intensity;
                if negated {
                    polarity *= -0.5;
                }
                hits.push((
                    polarity.clamp(-1.0, 1.0),
                    (subjectivity * intensity).clamp(0.0, 1.0),
                ));
                intensity = 1.0;
                negated = false;
                since_modifier = 0;
            } else if let Some(&(_, factor)) = INTENSIFIERS.iter().find(|(w, _)| *w == word) {
                intensity *= factor;
                since_modifier = 0;
            } else if NEGATIONS.contains(&word) {
                negated = !negated;
                since_modifier = 0;
            } else {
                since_modifier += 1;
                if since_modifier > MODIFIER_WINDOW {
                    intensity = 1.0;
                    negated = false;
                }
            }
        }

        if hits.is_empty() {
            return Polarity::default();
        }
        let n = hits.len() as f64;
        Polarity {
            polarity: (hits.iter().map(|h| h.0).sum::<f64>() / n).clamp(-1.0, 1.0),
            subjectivity: (hits.iter().map(|h| h.1).sum::<f64>() / n).clamp(0.0, 1.0),
        }
    }
}
