//! Synthetic item metadata and comments, the tier that cannot fail.
//!
//! Comments come from a curated table first (in table order), then from
//! templates filled with random vocabulary. Every comment is scored with
//! the same [`SentimentScorer`] the live tiers use.

use std::collections::BTreeSet;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::{AcquisitionTier, TierOutcome, SYNTHETIC_SOURCE};
use crate::model::{Comment, Item, RawComment};
use crate::sentiment::SentimentScorer;

const CURATED: &[&str] = &[
    "Excellent analysis! This really breaks down the complex issues clearly.",
    "I disagree with some of the conclusions drawn here. More research needed.",
    "Thank you for explaining this so well. Very informative content.",
    "This perspective is interesting but I think there are other factors to consider.",
    "Great work! Your political insights are always spot on.",
    "I'm not convinced by this argument. What about the opposing viewpoint?",
    "This video opened my eyes to issues I hadn't considered before.",
    "The data presented here seems incomplete. Can you provide sources?",
    "Finally, someone who explains politics without bias. Refreshing!",
    "This is exactly the kind of analysis we need more of in media.",
    "I appreciate the balanced approach to such a divisive topic.",
    "Some good points, but I think you're missing the bigger picture.",
    "Your research is thorough and your presentation is clear. Well done!",
    "I wish more political commentators were as thoughtful as this.",
    "This analysis helps me understand the complexity of the situation.",
    "Great job breaking down the policy implications step by step.",
    "I don't usually comment but this deserved recognition. Excellent work!",
    "This is why I subscribe to this channel. Quality content always.",
    "The graphics and explanations make complex topics accessible. Thank you!",
    "I shared this with my family. Everyone should watch this analysis.",
    "Looking forward to your take on the upcoming policy changes.",
    "This kind of informed discussion is what democracy needs.",
    "Your ability to remain objective while explaining is commendable.",
    "This video should be shown in political science classes.",
    "I learned more in these 10 minutes than from hours of news coverage.",
    "The research behind this content is evident. Keep up the great work!",
    "Finally someone who doesn't just echo talking points. Original thinking!",
    "This analysis will help me make more informed decisions. Thank you.",
    "Your channel has become my go-to source for political analysis.",
    "The way you connect different policy areas is brilliant.",
];

const PROFESSIONS: &[&str] = &[
    "teacher", "student", "researcher", "journalist", "analyst", "citizen", "voter", "activist",
];
const FIELDS: &[&str] = &["policy", "government", "academia", "journalism", "research", "public service"];
const OPINIONS: &[&str] = &[
    "very insightful", "somewhat problematic", "quite helpful", "rather concerning", "extremely valuable",
];
const AGREEMENTS: &[&str] = &["aligns", "conflicts", "partially matches", "strongly supports", "challenges"];
const ASPECTS: &[&str] = &["point", "argument", "data", "conclusion", "perspective", "analysis"];
const TOPICS: &[&str] = &["policy", "governance", "democracy", "legislation", "reform", "leadership"];
const EVALUATIONS: &[&str] = &["spot on", "questionable", "well researched", "needs more context", "brilliant"];
const QUALITIES: &[&str] = &[
    "provides excellent", "offers decent", "gives poor", "delivers outstanding", "presents adequate",
];
const GROUPS: &[&str] = &["young voters", "working families", "small businesses", "rural communities", "urban areas"];
const IMPORTANCES: &[&str] = &["very important", "often overlooked", "critical to address", "worth considering"];

/// Comment shapes filled from the vocabularies above.
#[derive(Debug, Clone, Copy)]
enum Template {
    Profession,
    Field,
    Aspect,
    Following,
    Impact,
}

const TEMPLATES: &[Template] = &[
    Template::Profession,
    Template::Field,
    Template::Aspect,
    Template::Following,
    Template::Impact,
];

fn pick<R: Rng>(rng: &mut R, words: &'static [&'static str]) -> &'static str {
    words.choose(rng).copied().unwrap_or_default()
}

impl Template {
    fn render<R: Rng>(self, rng: &mut R) -> String {
        match self {
            Self::Profession => format!(
                "As a {}, I find this analysis {}.",
                pick(rng, PROFESSIONS),
                pick(rng, OPINIONS)
            ),
            Self::Field => format!(
                "From my experience in {}, this {} with what I've observed.",
                pick(rng, FIELDS),
                pick(rng, AGREEMENTS)
            ),
            Self::Aspect => format!(
                "The {} you mentioned about {} is {}.",
                pick(rng, ASPECTS),
                pick(rng, TOPICS),
                pick(rng, EVALUATIONS)
            ),
            Self::Following => format!(
                "I've been following {} for years and this {} explanation.",
                pick(rng, TOPICS),
                pick(rng, QUALITIES)
            ),
            Self::Impact => format!(
                "What about the impact on {}? That seems {}.",
                pick(rng, GROUPS),
                pick(rng, IMPORTANCES)
            ),
        }
    }
}

/// Generator for plausible, labelled data when no live source is available.
pub struct SyntheticGenerator {
    scorer: SentimentScorer,
    rng: Mutex<StdRng>,
}

impl SyntheticGenerator {
    /// Generator with an entropy-seeded random source.
    #[must_use]
    pub fn new(scorer: SentimentScorer) -> Self {
        Self::with_rng(scorer, StdRng::from_entropy())
    }

    /// Generator with a fixed seed; output text and counts are reproducible.
    #[must_use]
    pub fn seeded(scorer: SentimentScorer, seed: u64) -> Self {
        Self::with_rng(scorer, StdRng::seed_from_u64(seed))
    }

    #[must_use]
    pub fn with_rng(scorer: SentimentScorer, rng: StdRng) -> Self {
        Self {
            scorer,
            rng: Mutex::new(rng),
        }
    }

    /// Number of curated comments emitted before templates kick in.
    #[must_use]
    pub fn curated_len() -> usize {
        CURATED.len()
    }

    /// Plausible metadata for `item_id`.
    pub fn item(&self, item_id: &str) -> Item {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let tags: BTreeSet<String> = ["politics", "analysis", "current events", "news", "discussion"]
            .into_iter()
            .map(String::from)
            .collect();
        Item {
            item_id: item_id.to_string(),
            title: "Political Analysis & Current Events".to_string(),
            description: "In-depth analysis of current political developments and their implications for society."
                .to_string(),
            view_count: rng.gen_range(15_000..=75_000),
            like_count: rng.gen_range(800..=3_000),
            comment_count: rng.gen_range(100..=800),
            duration: "PT12M45S".to_string(),
            published_at: Utc::now() - Duration::days(rng.gen_range(1..=14)),
            channel: "PolicyFocus".to_string(),
            tags,
        }
    }

    /// Exactly `max_count` labelled comments: curated first, then templated.
    pub fn comments(&self, item_id: &str, max_count: usize) -> Vec<Comment> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Utc::now();
        let mut out = Vec::with_capacity(max_count);

        for (i, text) in CURATED.iter().take(max_count).enumerate() {
            out.push(self.labelled(RawComment {
                comment_id: format!("synthetic_{item_id}_{i}"),
                author: format!("Viewer{}", i + 1),
                text: (*text).to_string(),
                like_count: rng.gen_range(0..=100),
                timestamp: now - Duration::minutes(rng.gen_range(1..=2880)),
                reply_count: rng.gen_range(0..=8),
                is_reply: false,
                parent_id: None,
                sentiment: None,
            }));
        }

        for i in out.len()..max_count {
            let template = TEMPLATES.choose(&mut *rng).copied().unwrap_or(Template::Impact);
            let text = template.render(&mut *rng);
            out.push(self.labelled(RawComment {
                comment_id: format!("synthetic_{item_id}_{i}"),
                author: format!("User{}", rng.gen_range(100..=9999)),
                text,
                like_count: rng.gen_range(0..=50),
                timestamp: now - Duration::minutes(rng.gen_range(1..=1440)),
                reply_count: rng.gen_range(0..=5),
                is_reply: false,
                parent_id: None,
                sentiment: None,
            }));
        }

        out
    }

    fn labelled(&self, raw: RawComment) -> Comment {
        raw.label(&self.scorer)
    }
}

/// The generator can also sit in a tier list, e.g. ahead of a slow live tier.
#[async_trait]
impl AcquisitionTier for SyntheticGenerator {
    fn name(&self) -> &'static str {
        SYNTHETIC_SOURCE
    }

    async fn fetch_item(&self, item_id: &str) -> TierOutcome<Item> {
        TierOutcome::Hit(self.item(item_id))
    }

    async fn fetch_comments(&self, item_id: &str, max_count: usize) -> TierOutcome<Vec<RawComment>> {
        let raw = self
            .comments(item_id, max_count)
            .into_iter()
            .map(|c| RawComment {
                sentiment: Some((c.sentiment_score, c.sentiment_label)),
                comment_id: c.comment_id,
                author: c.author,
                text: c.text,
                like_count: c.like_count,
                timestamp: c.timestamp,
                reply_count: c.reply_count,
                is_reply: c.is_reply,
                parent_id: c.parent_id,
            })
            .collect();
        TierOutcome::Hit(raw)
    }
}
