//! Request DTOs with validation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Publish event request body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PublishEventRequest {
    /// Event payload.
    #[validate(length(min = 1, max = 65536, message = "Content is required"))]
    pub content: String,
    /// Optional structured metadata.
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}
