// SPDX-License-Identifier: MIT

//! The persisted session context and its merge rule.

use serde::{Deserialize, Serialize};

use crate::token::DecodedAccessToken;

/// Safety margin on the fast path: a persisted token with less than this
/// many seconds of life left does not excuse a new login attempt from
/// running.
pub const LOGIN_FRESHNESS_BUFFER_SECS: u64 = 120;

/// An environment descriptor persisted after project selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub id: u64,
    pub name: String,
    pub deployment_type: String,
}

/// The session context persisted under the tool's config directory.
///
/// Every field is optional because the context is built incrementally: the
/// OAuth callback writes the token, project selection writes the account
/// and environments. Sibling processes reuse whatever is on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decoded_access_token: Option<DecodedAccessToken>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dev_environment: Option<Environment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prod_environment: Option<Environment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<u64>,
}

impl PlatformContext {
    /// Field-wise override: `other`'s value wins where present, otherwise
    /// the existing value is kept. This is what lets a later step (project
    /// selection) write only the fields it knows without erasing the token
    /// written by the callback.
    pub fn merged(&self, other: &PlatformContext) -> PlatformContext {
        PlatformContext {
            decoded_access_token: other
                .decoded_access_token
                .clone()
                .or_else(|| self.decoded_access_token.clone()),
            host_prefix: other.host_prefix.clone().or_else(|| self.host_prefix.clone()),
            dev_environment: other
                .dev_environment
                .clone()
                .or_else(|| self.dev_environment.clone()),
            prod_environment: other
                .prod_environment
                .clone()
                .or_else(|| self.prod_environment.clone()),
            account_id: other.account_id.or(self.account_id),
        }
    }

    pub fn access_token(&self) -> Option<&str> {
        self.decoded_access_token.as_ref().map(|d| d.access_token_response.access_token.as_str())
    }

    pub fn expires_at(&self) -> Option<u64> {
        self.decoded_access_token.as_ref().map(|d| d.access_token_response.expires_at)
    }

    pub fn user_id(&self) -> Option<u64> {
        self.decoded_access_token.as_ref().and_then(|d| d.user_id())
    }

    /// True when a login request can be satisfied from this context alone:
    /// all selection fields are present and the token has more than the
    /// freshness buffer left before expiry.
    pub fn is_login_skippable(&self, now: u64) -> bool {
        self.account_id.is_some()
            && self.host_prefix.is_some()
            && self.dev_environment.is_some()
            && self.prod_environment.is_some()
            && self.expires_at().is_some_and(|e| e > now + LOGIN_FRESHNESS_BUFFER_SECS)
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
