use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value as JsonValue, json};

use crate::client::ApiError;

/// Errors returned by the portal's auth routes.
///
/// Every variant renders as `{"errors": {...}}` with a matching status.
#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    /// No logged-in session.
    #[error("Unauthorized")]
    Unauthorized,

    /// Backend refused the login, or could not be asked.
    #[error("{message}")]
    LoginRejected { status: u16, message: &'static str },

    /// Backend issued a token that does not verify against our secret.
    #[error("Can't verify token authenticity")]
    TokenRejected,

    #[error("Could not connect to the server")]
    Unreachable,

    /// Backend rejection passed through as-is.
    #[error("Backend error ({status})")]
    Backend { status: u16, errors: JsonValue },

    /// Email-confirmation or password-reset hash is unknown or expired.
    #[error("This link is invalid or has expired")]
    InvalidLink { status: u16 },

    #[error("Method not allowed")]
    MethodNotAllowed,

    /// Request body could not be read.
    #[error("{message}")]
    BadRequest { status: u16, message: String },

    /// Session cookie could not be written.
    #[error("Session error: {0}")]
    Session(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PortalError {
    /// Maps a failed backend login onto the fixed login messages.
    pub(crate) fn login(error: ApiError) -> Self {
        let status = match error.status() {
            Some(status @ (401 | 422)) => status,
            Some(500) | None => 500,
            Some(status) => status,
        };
        Self::LoginRejected {
            status,
            message: error.login_message(),
        }
    }

    /// Maps a failed confirm/reset call, singling out dead links.
    pub(crate) fn verification(error: ApiError) -> Self {
        match error.status() {
            Some(status @ (404 | 410 | 422)) => Self::InvalidLink { status },
            _ => error.into(),
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized | Self::TokenRejected => StatusCode::UNAUTHORIZED,
            Self::LoginRejected { status, .. }
            | Self::Backend { status, .. }
            | Self::InvalidLink { status }
            | Self::BadRequest { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Unreachable | Self::Session(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<ApiError> for PortalError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::AuthenticationRequired => Self::Unauthorized,
            ApiError::Unreachable(_) => Self::Unreachable,
            ApiError::Backend { status, errors } => Self::Backend { status, errors },
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for PortalError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest {
            status: rejection.status().as_u16(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for PortalError {
    fn into_response(self) -> Response {
        let status = self.status();
        let errors = match self {
            Self::Backend { errors, .. } => errors,
            Self::InvalidLink { .. } => json!({
                "kind": "invalid_or_expired_link",
                "message": self.to_string(),
            }),
            Self::Session(_) | Self::Internal(_) => {
                tracing::error!(error = %self, "Portal internal error");
                json!({ "message": "Internal error" })
            }
            _ => json!({ "message": self.to_string() }),
        };
        (status, Json(json!({ "errors": errors }))).into_response()
    }
}
