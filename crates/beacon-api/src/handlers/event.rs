//! Event publish handler.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use validator::Validate;

use beacon_core::error::AppError;
use beacon_core::event::Event;

use crate::dto::request::PublishEventRequest;
use crate::dto::response::{ApiResponse, PublishEventResponse};
use crate::error::ApiError;
use crate::extractors::Principal;
use crate::state::AppState;

/// POST /api/events — publish an event to all server processes.
///
/// The event is handed to the pub/sub channel and acknowledged; delivery
/// to connected clients and persistence happen asynchronously in every
/// process's subscriber.
pub async fn publish_event(
    State(state): State<AppState>,
    principal: Principal,
    Json(body): Json<PublishEventRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PublishEventResponse>>), ApiError> {
    body.validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let event = Event::new(principal.id, body.content, body.metadata);
    state.bridge.publish(&event).await?;

    tracing::debug!(publisher_id = %event.publisher_id, "Event published");

    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse::ok(PublishEventResponse {
            timestamp: event.timestamp,
        })),
    ))
}
