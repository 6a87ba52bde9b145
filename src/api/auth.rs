// =============================================================================
// Session Gate — Axum extractor
// =============================================================================
//
// Broker-backed routes need the tokens from a prior /api/login. This
// extractor pulls the in-memory session record out of AppState and
// short-circuits the request with 401 when none exists.
//
// Usage:
//
//   async fn handler(ActiveSession(session): ActiveSession, ...) { ... }
// =============================================================================

use std::sync::Arc;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::warn;

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::types::Session;

/// Extractor that yields a clone of the active broker session, rejecting the
/// request with 401 when no login has happened yet.
pub struct ActiveSession(pub Session);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for ActiveSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        match state.active_session() {
            Some(session) => Ok(ActiveSession(session)),
            None => {
                warn!(path = %parts.uri.path(), "session-gated route hit without an active login");
                Err(ApiError::AuthRequired)
            }
        }
    }
}
