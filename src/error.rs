// =============================================================================
// ApiError — HTTP boundary error taxonomy
// =============================================================================
//
// Every handler returns Result<_, ApiError>. Upstream failures are caught at
// the endpoint boundary and converted to a JSON error response; nothing in
// the request path panics or crashes the process.
//
//   Config       -> 500  missing credentials/keys, reported before any
//                        network call is attempted
//   Upstream     -> 500  broker or AI call failed; the upstream error body
//                        is attached when one was captured
//   Validation   -> 400  missing/invalid required request field
//   AuthRequired -> 401  no active broker session
// =============================================================================

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("upstream error: {message}")]
    Upstream {
        message: String,
        /// Best-effort capture of the upstream error payload.
        body: Option<serde_json::Value>,
    },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("authentication required")]
    AuthRequired,
}

impl ApiError {
    /// Wrap a failed upstream call, keeping whatever error body was captured.
    pub fn upstream(message: impl Into<String>, body: Option<serde_json::Value>) -> Self {
        Self::Upstream {
            message: message.into(),
            body,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Config(_) | Self::Upstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::AuthRequired => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::Upstream {
                message,
                body: Some(upstream),
            } => serde_json::json!({
                "error": message,
                "upstream": upstream,
            }),
            other => serde_json::json!({
                "error": other.to_string(),
            }),
        };
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        // Upstream clients bail with an ApiError when they captured an error
        // body; recover it instead of flattening to a string.
        match err.downcast::<ApiError>() {
            Ok(api) => api,
            Err(err) => ApiError::Upstream {
                message: format!("{err:#}"),
                body: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_maps_to_500() {
        let err = ApiError::Config("BROKER_API_KEY not set".into());
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn validation_maps_to_400() {
        let err = ApiError::Validation("companyName is required".into());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn auth_required_maps_to_401() {
        assert_eq!(ApiError::AuthRequired.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn upstream_maps_to_500_and_keeps_body() {
        let err = ApiError::upstream(
            "broker login failed",
            Some(serde_json::json!({"errorcode": "AB1007"})),
        );
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        match err {
            ApiError::Upstream { body, .. } => assert!(body.is_some()),
            _ => unreachable!(),
        }
    }
}
