use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::errors::AppError;
use crate::state::AppState;

/// Guards process-wide settings behind the configured bearer token. With no
/// token configured, every request is refused.
pub async fn admin_middleware(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let expected = state.config.admin.token.as_str();
    if expected.is_empty() {
        return AppError::Forbidden("Settings changes are disabled: no admin token configured".to_string())
            .into_response();
    }

    let authorized = extract_token(&req).is_some_and(|token| token_matches(token, expected));
    if !authorized {
        tracing::warn!("Rejected settings change without a valid admin token");
        return AppError::Unauthorized("A valid admin bearer token is required".to_string()).into_response();
    }

    next.run(req).await
}

fn extract_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
}

/// Compare without returning early on the first differing byte.
fn token_matches(given: &str, expected: &str) -> bool {
    let (given, expected) = (given.as_bytes(), expected.as_bytes());
    given.len() == expected.len()
        && given
            .iter()
            .zip(expected)
            .fold(0u8, |diff, (a, b)| diff | (a ^ b))
            == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_matches() {
        assert!(token_matches("s3cret", "s3cret"));
        assert!(!token_matches("s3cre", "s3cret"));
        assert!(!token_matches("s3creT", "s3cret"));
        assert!(!token_matches("", "s3cret"));
    }

    #[test]
    fn test_extract_token() {
        let req = Request::builder()
            .header(header::AUTHORIZATION, "Bearer abc")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(extract_token(&req), Some("abc"));

        let req = Request::builder()
            .header(header::AUTHORIZATION, "Basic abc")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(extract_token(&req), None);
    }
}
