//! Principal extraction from the auth collaborator's header.
//!
//! Authentication happens upstream (reverse proxy or gateway); by the time
//! a request reaches Beacon, the authenticated principal id is carried in
//! the `X-Principal-Id` header. Requests without it are rejected before
//! any upgrade or publish.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use beacon_core::error::AppError;

use crate::error::ApiError;

/// Header installed by the upstream authentication layer.
pub const PRINCIPAL_HEADER: &str = "x-principal-id";

/// The authenticated principal making the request.
#[derive(Debug, Clone)]
pub struct Principal {
    /// Opaque principal identifier.
    pub id: String,
}

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(PRINCIPAL_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| AppError::authentication("Missing principal header"))?;

        Ok(Self { id: id.to_string() })
    }
}
