//! The domain message distributed through the pub/sub channel and fanned
//! out to connected clients.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single published event.
///
/// Events are immutable once published: the bridge re-broadcasts the raw
/// received bytes without touching the decoded value. The `content` field
/// is opaque to the fan-out core; only collaborators interpret it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Principal that published the event.
    pub publisher_id: String,
    /// Opaque event payload.
    pub content: String,
    /// When the event was published.
    pub timestamp: DateTime<Utc>,
    /// Optional structured metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

impl Event {
    /// Create a new event stamped with the current time.
    pub fn new(
        publisher_id: impl Into<String>,
        content: impl Into<String>,
        metadata: Option<HashMap<String, serde_json::Value>>,
    ) -> Self {
        Self {
            publisher_id: publisher_id.into(),
            content: content.into(),
            timestamp: Utc::now(),
            metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_round_trip() {
        let mut metadata = HashMap::new();
        metadata.insert("file".to_string(), serde_json::json!("report.pdf"));
        metadata.insert("size".to_string(), serde_json::json!(1024));

        let event = Event::new("u1", "file uploaded", Some(metadata));
        let bytes = serde_json::to_vec(&event).unwrap();
        let decoded: Event = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(decoded, event);
    }

    #[test]
    fn test_event_without_metadata_omits_field() {
        let event = Event::new("u1", "hello", None);
        let json = serde_json::to_string(&event).unwrap();

        assert!(!json.contains("metadata"));

        let decoded: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, event);
    }
}
