//! Live updates for connected subscribers.
//!
//! # Architecture
//!
//! - [`LiveMessage`]: the wire protocol, a JSON object `{"type": ..., "data": ...}`
//! - [`Broadcaster`]: subscriber registry with isolated, concurrent fan-out
//! - [`LiveServer`]: WebSocket accept loop that registers each connection
//!
//! # Example
//!
//! ```rust,no_run
//! use commentpulse::live::{Broadcaster, LiveServer};
//!
//! # async fn example() -> commentpulse::Result<()> {
//! let broadcaster = Broadcaster::new();
//! let server = LiveServer::bind("127.0.0.1:8765".parse().unwrap(), broadcaster.clone()).await?;
//! tokio::spawn(server.run());
//! # Ok(())
//! # }
//! ```

pub mod broadcaster;
pub mod server;

use serde::{Deserialize, Serialize};

use crate::analytics::AnalyticsSnapshot;
use crate::error::Result;
use crate::model::{Comment, Item};

pub use broadcaster::{Broadcaster, DeliveryFailure, DeliveryReport, Subscriber, SubscriberId};
pub use server::LiveServer;

/// One message on the live-update channel.
///
/// Timestamps inside the payload serialise as ISO-8601 strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum LiveMessage {
    ItemInfo(Item),
    NewComments(Vec<Comment>),
    AnalyticsUpdate(AnalyticsSnapshot),
}

impl LiveMessage {
    /// Value of the `type` field.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ItemInfo(_) => "item_info",
            Self::NewComments(_) => "new_comments",
            Self::AnalyticsUpdate(_) => "analytics_update",
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::comment;

    #[test]
    fn messages_are_tagged_with_type_and_data() {
        let message = LiveMessage::NewComments(vec![comment("a", 0, 2, 0.5)]);
        let json: serde_json::Value = serde_json::from_str(&message.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], message.kind());
        assert_eq!(json["data"][0]["comment_id"], "a");
        assert_eq!(json["data"][0]["timestamp"], "2025-03-01T12:00:00Z");
    }

    #[test]
    fn analytics_update_round_trips() {
        let snapshot = AnalyticsSnapshot::from_comments(&[comment("a", 0, 1, -0.4)]).unwrap();
        let message = LiveMessage::AnalyticsUpdate(snapshot);
        let back: LiveMessage = serde_json::from_str(&message.to_json().unwrap()).unwrap();
        assert_eq!(back, message);
        assert_eq!(back.kind(), "analytics_update");
    }
}
