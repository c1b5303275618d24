// SPDX-License-Identifier: MIT

//! The token-provider capability handed to API-calling collaborators.
//!
//! `get_token()` is cheap: it never suspends and never touches the
//! network, so callers invoke it per outbound request.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::error::AuthError;
use crate::refresh::{RefreshStrategy, RefreshWorker};
use crate::store::ContextStore;
use crate::token::AccessTokenResponse;

/// The sole interface boundary exposed outward from this subsystem.
pub trait TokenProvider: Send + Sync {
    fn get_token(&self) -> Result<String, AuthError>;
}

/// Wraps a fixed credential (service token or PAT). No background activity.
pub struct StaticTokenProvider {
    token: Option<String>,
}

impl StaticTokenProvider {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }
}

impl TokenProvider for StaticTokenProvider {
    fn get_token(&self) -> Result<String, AuthError> {
        self.token.clone().ok_or_else(|| AuthError::Config("no token provided".to_owned()))
    }
}

/// OAuth-backed provider with lazy background refresh.
///
/// Must be used from within a tokio runtime: the first `get_token()` call
/// spawns the refresh loop.
pub struct OAuthTokenProvider {
    current: Arc<RwLock<AccessTokenResponse>>,
    worker: Mutex<Option<RefreshWorker>>,
    refresh_started: AtomicBool,
}

impl OAuthTokenProvider {
    pub fn new(
        initial: AccessTokenResponse,
        platform_url: &str,
        client_id: &str,
        store: ContextStore,
        strategy: RefreshStrategy,
    ) -> Self {
        let base = platform_url.trim_end_matches('/');
        let current = Arc::new(RwLock::new(initial));
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        let worker = RefreshWorker {
            http,
            token_url: format!("{base}/oauth/token"),
            jwks_url: format!("{base}/.well-known/jwks.json"),
            client_id: client_id.to_owned(),
            store,
            strategy,
            current: Arc::clone(&current),
        };
        Self { current, worker: Mutex::new(Some(worker)), refresh_started: AtomicBool::new(false) }
    }

    /// Whether the background refresh loop has been started.
    pub fn refresh_started(&self) -> bool {
        self.refresh_started.load(Ordering::SeqCst)
    }
}

impl TokenProvider for OAuthTokenProvider {
    fn get_token(&self) -> Result<String, AuthError> {
        // Idempotent start: exactly one loop regardless of call count.
        if self.refresh_started.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_ok() {
            if let Some(worker) =
                self.worker.lock().unwrap_or_else(PoisonError::into_inner).take()
            {
                tracing::info!("starting background token refresh");
                tokio::spawn(worker.run());
            }
        }
        Ok(self.current.read().unwrap_or_else(PoisonError::into_inner).access_token.clone())
    }
}

#[cfg(test)]
#[path = "provider_tests.rs"]
mod tests;
