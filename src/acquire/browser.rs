//! Browser-automation comment tier.
//!
//! Holds the slot in the comment chain for a driver that renders the
//! page and scrolls the comment section. No driver is wired up, so the
//! tier always defers to the next one.

use async_trait::async_trait;

use super::{AcquisitionTier, TierOutcome};
use crate::model::{Item, RawComment};

pub struct BrowserTier;

#[async_trait]
impl AcquisitionTier for BrowserTier {
    fn name(&self) -> &'static str {
        "browser"
    }

    async fn fetch_item(&self, _item_id: &str) -> TierOutcome<Item> {
        TierOutcome::unsupported("item metadata")
    }

    async fn fetch_comments(&self, _item_id: &str, _max_count: usize) -> TierOutcome<Vec<RawComment>> {
        TierOutcome::Fallthrough("no browser driver configured".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn always_defers() {
        assert!(matches!(BrowserTier.fetch_item("x").await, TierOutcome::Fallthrough(_)));
        assert!(matches!(
            BrowserTier.fetch_comments("x", 10).await,
            TierOutcome::Fallthrough(_)
        ));
    }
}
