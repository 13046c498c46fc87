//! HTTP error surface.
//!
//! CSP endpoints are fire-and-forget from the browser's perspective, so the
//! visible error space is deliberately tiny: 400 for bodies we cannot read
//! or parse, 429 when the rate limiter says no. Per-record validation issues
//! and pipeline drops never change the HTTP status.
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Invalid request body")]
    InvalidBody,

    #[error("Empty request body")]
    EmptyBody,

    #[error("Invalid CSP report format")]
    InvalidReport(#[from] report::ParseError),

    #[error("Rate limit exceeded")]
    RateLimited,
}

impl ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServerError::InvalidBody | ServerError::EmptyBody | ServerError::InvalidReport(_) => {
                StatusCode::BAD_REQUEST
            }
            ServerError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_the_wire_contract() {
        assert_eq!(ServerError::InvalidBody.to_string(), "Invalid request body");
        assert_eq!(ServerError::EmptyBody.to_string(), "Empty request body");
        assert_eq!(
            ServerError::RateLimited.to_string(),
            "Rate limit exceeded"
        );
        assert_eq!(
            ServerError::InvalidReport(report::ParseError::UnsupportedShape).to_string(),
            "Invalid CSP report format"
        );
    }

    #[test]
    fn status_codes_match_the_contract() {
        assert_eq!(ServerError::InvalidBody.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ServerError::EmptyBody.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ServerError::RateLimited.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }
}
