// SPDX-License-Identifier: MIT

//! Background token refresh: timing policy, the refresh-token grant, and
//! the per-provider refresh loop.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use crate::context::PlatformContext;
use crate::error::AuthError;
use crate::jwks;
use crate::store::ContextStore;
use crate::token::{epoch_secs, AccessTokenResponse, DecodedAccessToken, TokenEndpointResponse};

/// Timing policy for proactive refresh.
#[derive(Debug, Clone)]
pub struct RefreshStrategy {
    /// Seconds before expiry at which a refresh is triggered.
    pub buffer_secs: u64,
    /// Delay before retrying after a failed iteration.
    pub error_retry: Duration,
}

impl Default for RefreshStrategy {
    fn default() -> Self {
        Self { buffer_secs: 300, error_retry: Duration::from_secs(5) }
    }
}

impl RefreshStrategy {
    /// How long to wait before refreshing a token expiring at `expires_at`:
    /// `max(expires_at - buffer - now, 0)`.
    pub fn refresh_wait(&self, expires_at: u64, now: u64) -> Duration {
        Duration::from_secs(expires_at.saturating_sub(self.buffer_secs).saturating_sub(now))
    }

    pub async fn wait_until_refresh_needed(&self, expires_at: u64) {
        let wait = self.refresh_wait(expires_at, epoch_secs());
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
    }

    pub async fn wait_after_error(&self) {
        tokio::time::sleep(self.error_retry).await;
    }
}

/// Perform a single refresh-token grant. Stamps `expires_at` locally.
pub async fn do_refresh(
    client: &reqwest::Client,
    token_url: &str,
    client_id: &str,
    refresh_token: &str,
) -> Result<AccessTokenResponse, AuthError> {
    let resp = client
        .post(token_url)
        .form(&[
            ("grant_type", "refresh_token"),
            ("client_id", client_id),
            ("refresh_token", refresh_token),
        ])
        .send()
        .await?;

    if !resp.status().is_success() {
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        return Err(AuthError::Network(format!("refresh failed ({status}): {text}")));
    }

    let raw: TokenEndpointResponse = resp.json().await?;
    Ok(AccessTokenResponse::from_endpoint(raw, epoch_secs()))
}

/// State for one provider's refresh loop.
///
/// The loop runs for the life of the process. Every failure is contained
/// within its iteration: log, wait the error delay, loop again with the
/// last known expiry so a token already near expiry is retried promptly.
pub struct RefreshWorker {
    pub(crate) http: reqwest::Client,
    pub(crate) token_url: String,
    pub(crate) jwks_url: String,
    pub(crate) client_id: String,
    pub(crate) store: ContextStore,
    pub(crate) strategy: RefreshStrategy,
    pub(crate) current: Arc<RwLock<AccessTokenResponse>>,
}

impl RefreshWorker {
    async fn refresh_once(&self) -> Result<(), AuthError> {
        let refresh_token = self
            .current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .refresh_token
            .clone()
            .ok_or_else(|| AuthError::Config("token has no refresh token".to_owned()))?;

        let token = do_refresh(&self.http, &self.token_url, &self.client_id, &refresh_token).await?;
        // A refreshed token is re-verified through the same JWKS path as
        // login, never trusted blindly.
        let claims = jwks::fetch_jwks_and_verify(&self.http, &self.jwks_url, &token.access_token).await?;
        let decoded =
            DecodedAccessToken { access_token_response: token.clone(), decoded_claims: claims };
        self.store.update(&PlatformContext {
            decoded_access_token: Some(decoded),
            ..Default::default()
        })?;
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = token;
        tracing::info!("access token refreshed");
        Ok(())
    }

    /// Run until the process exits. Never returns, never panics out.
    pub async fn run(self) {
        tracing::info!("background token refresh worker started");
        loop {
            let expires_at =
                self.current.read().unwrap_or_else(PoisonError::into_inner).expires_at;
            self.strategy.wait_until_refresh_needed(expires_at).await;
            match self.refresh_once().await {
                Ok(()) => {}
                Err(e @ AuthError::Verification(_)) => {
                    // No safe fallback: the old token stays in place and may
                    // expire while we retry.
                    tracing::error!(err = %e, "refreshed token failed verification");
                    self.strategy.wait_after_error().await;
                }
                Err(e) => {
                    tracing::warn!(err = %e, "token refresh failed");
                    self.strategy.wait_after_error().await;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "refresh_tests.rs"]
mod tests;
