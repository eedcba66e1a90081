use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Unprocessable(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Generation quota exceeded: {message}")]
    QuotaExceeded { message: String, retry_after_secs: u64 },

    #[error("Generation service error: {message}")]
    Upstream { message: String, timed_out: bool },

    #[error("Generation service rejected credentials: {0}")]
    GenerationAuth(String),

    #[error("Generation halted until reconfigured: {0}")]
    GenerationHalted(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut retry_after_secs = None;

        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            AppError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::QuotaExceeded {
                message,
                retry_after_secs: secs,
            } => {
                tracing::warn!("Generation quota exceeded: {message}");
                retry_after_secs = Some(*secs);
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    "The AI service is temporarily busy due to high usage. Please wait and try again."
                        .to_string(),
                )
            }
            AppError::Upstream { message, timed_out } => {
                tracing::error!("Generation service error: {message}");
                let status = if *timed_out {
                    StatusCode::SERVICE_UNAVAILABLE
                } else {
                    StatusCode::BAD_GATEWAY
                };
                (status, self.to_string())
            }
            AppError::GenerationAuth(msg) => {
                tracing::error!("Generation credentials rejected: {msg}");
                (StatusCode::SERVICE_UNAVAILABLE, self.to_string())
            }
            AppError::GenerationHalted(_) => (StatusCode::SERVICE_UNAVAILABLE, self.to_string()),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = axum::Json(ErrorResponse {
            error: message,
            status: status.as_u16(),
            retry_after_secs,
        });

        let mut response = (status, body).into_response();
        if let Some(secs) = retry_after_secs {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (AppError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (AppError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (AppError::Unprocessable("x".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (AppError::Conflict("x".into()), StatusCode::CONFLICT),
            (
                AppError::Upstream { message: "x".into(), timed_out: false },
                StatusCode::BAD_GATEWAY,
            ),
            (
                AppError::Upstream { message: "x".into(), timed_out: true },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (AppError::GenerationHalted("x".into()), StatusCode::SERVICE_UNAVAILABLE),
            (
                AppError::Internal(anyhow::anyhow!("boom")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn test_quota_sets_retry_after() {
        let response = AppError::QuotaExceeded {
            message: "429".into(),
            retry_after_secs: 60,
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "60");
    }
}
