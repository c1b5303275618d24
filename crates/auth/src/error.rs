// SPDX-License-Identifier: MIT

//! Error taxonomy for the auth subsystem.
//!
//! Callers care about three things: configuration errors are fatal and
//! surfaced immediately, verification errors fail a single login/refresh
//! attempt, and network errors are retryable. The background refresh loop
//! never lets any of these escape to `get_token()` callers.

use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Missing or invalid local configuration: no credential supplied,
    /// callback port range exhausted.
    Config(String),
    /// JWT verification failed: bad signature, unknown key id, wrong
    /// algorithm, expired token.
    Verification(String),
    /// Transient network failure (timeouts, 5xx). Safe to retry.
    Network(String),
    /// The interactive login flow failed or never completed.
    LoginFailed(String),
    /// Context file or lock file I/O failed.
    Storage(String),
}

impl AuthError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG",
            Self::Verification(_) => "VERIFICATION",
            Self::Network(_) => "NETWORK",
            Self::LoginFailed(_) => "LOGIN_FAILED",
            Self::Storage(_) => "STORAGE",
        }
    }

    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Config(_) | Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Verification(_) => StatusCode::UNAUTHORIZED,
            Self::Network(_) => StatusCode::BAD_GATEWAY,
            Self::LoginFailed(_) => StatusCode::CONFLICT,
        }
    }

    pub fn to_http_response(&self) -> (StatusCode, Json<ErrorResponse>) {
        let body = ErrorResponse {
            error: ErrorBody { code: self.code().to_owned(), message: self.to_string() },
        };
        (self.http_status(), Json(body))
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
            Self::Verification(msg) => write!(f, "token verification failed: {msg}"),
            Self::Network(msg) => write!(f, "network error: {msg}"),
            Self::LoginFailed(msg) => write!(f, "login failed: {msg}"),
            Self::Storage(msg) => write!(f, "storage error: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<reqwest::Error> for AuthError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        Self::Verification(e.to_string())
    }
}

/// Top-level error response envelope for the callback server's API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Error body with machine-readable code and human-readable message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}
