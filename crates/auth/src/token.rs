// SPDX-License-Identifier: MIT

//! Access token value types.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// A token endpoint response with the absolute expiry stamped in.
///
/// `expires_at` is epoch seconds, computed locally from `expires_in` when
/// the exchange/refresh response arrives. It is the authoritative value for
/// refresh scheduling and is never read off the wire or from user input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub scope: String,
    pub expires_at: u64,
}

/// Raw token endpoint document. Deliberately has no `expires_at` field, so
/// a server cannot smuggle one in.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenEndpointResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub scope: String,
}

impl AccessTokenResponse {
    pub fn from_endpoint(raw: TokenEndpointResponse, now: u64) -> Self {
        Self {
            expires_at: now + raw.expires_in,
            access_token: raw.access_token,
            refresh_token: raw.refresh_token,
            expires_in: raw.expires_in,
            token_type: raw.token_type,
            scope: raw.scope,
        }
    }
}

/// A verified access token and its claim set.
///
/// Constructed only by the JWKS verification path; never from unverified
/// input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedAccessToken {
    pub access_token_response: AccessTokenResponse,
    pub decoded_claims: serde_json::Map<String, serde_json::Value>,
}

impl DecodedAccessToken {
    /// The `sub` claim, parsed as a numeric user id.
    pub fn user_id(&self) -> Option<u64> {
        self.decoded_claims.get("sub").and_then(|v| v.as_str()).and_then(|s| s.parse().ok())
    }
}

pub fn epoch_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

#[cfg(test)]
#[path = "token_tests.rs"]
mod tests;
