use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::bank::BankError;

#[derive(Error, Debug)]
pub enum PortalError {
    #[error("Not logged in")]
    NotLoggedIn,
    #[error("Corrupt session")]
    CorruptSession,
    #[error("Login failed. Please check your credentials.")]
    LoginFailed,
    #[error("Invalid request")]
    InvalidRequest,
    #[error(transparent)]
    Bank(#[from] BankError),
}

impl IntoResponse for PortalError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            PortalError::NotLoggedIn => (StatusCode::UNAUTHORIZED, "Not logged in"),
            PortalError::CorruptSession => (StatusCode::BAD_REQUEST, "Corrupt session"),
            PortalError::LoginFailed => (StatusCode::UNAUTHORIZED, "Login failed"),
            PortalError::InvalidRequest => (StatusCode::BAD_REQUEST, "Invalid request"),
            PortalError::Bank(BankError::Refused(reason)) => {
                (StatusCode::BAD_REQUEST, reason.as_str())
            }
            PortalError::Bank(_) => (StatusCode::BAD_GATEWAY, "Banking service unavailable"),
        };

        let body = Json(json!({
            "error": error_message,
            "details": self.to_string()
        }));

        (status, body).into_response()
    }
}

impl From<tower_sessions::session::Error> for PortalError {
    fn from(_: tower_sessions::session::Error) -> Self {
        PortalError::CorruptSession
    }
}
