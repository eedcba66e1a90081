use axum::{
    extract::{FromRequestParts, Request},
    http::{request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::errors::AppError;

pub const SESSION_HEADER: &str = "x-session-id";

const MAX_SESSION_ID_LEN: usize = 128;

/// The session a request acts on, taken from the `x-session-id` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub session_id: String,
}

impl<S: Send + Sync> FromRequestParts<S> for SessionContext {
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionContext>()
            .cloned()
            .ok_or(StatusCode::BAD_REQUEST)
    }
}

pub async fn session_middleware(mut req: Request, next: Next) -> Response {
    let header = req
        .headers()
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim);

    let session_id = match header {
        Some(id) if is_valid_session_id(id) => id.to_string(),
        Some(_) => {
            return AppError::Validation(format!(
                "{SESSION_HEADER} must be 1-{MAX_SESSION_ID_LEN} characters of [A-Za-z0-9_-]"
            ))
            .into_response();
        }
        None => {
            return AppError::Validation(format!("Missing {SESSION_HEADER} header")).into_response();
        }
    };

    req.extensions_mut().insert(SessionContext { session_id });
    next.run(req).await
}

fn is_valid_session_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_SESSION_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
