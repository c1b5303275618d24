// SPDX-License-Identifier: MIT

//! Ephemeral local HTTP server completing one OAuth redirect.
//!
//! Routes: `GET /` handles the provider redirect (code, error, or a bare
//! visit), `POST /shutdown` stops the server, and `GET /projects`,
//! `GET /context`, `POST /selection` back the selection UI. The real asset
//! bundle is served by the platform's web tooling; a minimal inline page
//! stands in here so the redirect target always resolves.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse, Redirect};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use crate::config::AuthConfig;
use crate::context::{Environment, PlatformContext};
use crate::error::AuthError;
use crate::jwks;
use crate::pkce;
use crate::platform::PlatformClient;
use crate::store::ContextStore;
use crate::token::DecodedAccessToken;

/// Login flow phase, advanced by the callback handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginPhase {
    AwaitingRedirect,
    ExchangingCode,
    VerifyingToken,
    ContextReady,
    Failed,
}

/// Shared state for one login attempt's callback server.
pub struct CallbackState {
    platform_url: String,
    client_id: String,
    token_url: String,
    jwks_url: String,
    redirect_uri: String,
    http: reqwest::Client,
    store: ContextStore,
    /// Outstanding `state` parameters; a verifier is consumed on first use
    /// so a replayed redirect is rejected.
    state_to_verifier: Mutex<HashMap<String, String>>,
    decoded: RwLock<Option<DecodedAccessToken>>,
    phase: RwLock<LoginPhase>,
    failure_tx: watch::Sender<Option<String>>,
    shutdown: CancellationToken,
}

impl CallbackState {
    pub fn new(
        config: &AuthConfig,
        redirect_uri: String,
        store: ContextStore,
        state_to_verifier: HashMap<String, String>,
        failure_tx: watch::Sender<Option<String>>,
        shutdown: CancellationToken,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            platform_url: config.platform_url.trim_end_matches('/').to_owned(),
            client_id: config.client_id.clone(),
            token_url: config.token_url(),
            jwks_url: config.jwks_url(),
            redirect_uri,
            http,
            store,
            state_to_verifier: Mutex::new(state_to_verifier),
            decoded: RwLock::new(None),
            phase: RwLock::new(LoginPhase::AwaitingRedirect),
            failure_tx,
            shutdown,
        }
    }

    pub async fn phase(&self) -> LoginPhase {
        *self.phase.read().await
    }

    async fn set_phase(&self, phase: LoginPhase) {
        *self.phase.write().await = phase;
    }

    /// Record a terminal failure and release the waiting login caller.
    /// Nothing is persisted on any failure path.
    async fn fail(&self, reason: &str) {
        tracing::error!(reason, "login attempt failed");
        self.set_phase(LoginPhase::Failed).await;
        let _ = self.failure_tx.send(Some(reason.to_owned()));
    }

    async fn bearer_token(&self) -> Option<String> {
        self.decoded
            .read()
            .await
            .as_ref()
            .map(|d| d.access_token_response.access_token.clone())
    }
}

pub fn build_router(state: Arc<CallbackState>) -> Router {
    Router::new()
        .route("/", get(oauth_callback))
        .route("/shutdown", post(shutdown_server))
        .route("/projects", get(list_projects))
        .route("/context", get(get_context))
        .route("/selection", post(set_selection))
        .fallback(index_page)
        .with_state(state)
}

/// `GET /` — the provider redirect, or a bare visit.
async fn oauth_callback(
    State(s): State<Arc<CallbackState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Redirect {
    if let Some(error) = params.get("error") {
        s.fail(&format!("authorization server returned error: {error}")).await;
        return Redirect::to("/index.html#status=error");
    }
    let Some(code) = params.get("code") else {
        // Bare visit: serve the UI.
        return Redirect::to("/index.html");
    };
    let Some(state_param) = params.get("state") else {
        s.fail("redirect is missing the state parameter").await;
        return Redirect::to("/index.html#status=error");
    };
    let Some(code_verifier) = s.state_to_verifier.lock().await.remove(state_param) else {
        s.fail("unknown or replayed state parameter").await;
        return Redirect::to("/index.html#status=error");
    };

    s.set_phase(LoginPhase::ExchangingCode).await;
    let token = match pkce::exchange_code(
        &s.http,
        &s.token_url,
        &s.client_id,
        code,
        &code_verifier,
        &s.redirect_uri,
    )
    .await
    {
        Ok(token) => token,
        Err(e) => {
            s.fail(&e.to_string()).await;
            return Redirect::to("/index.html#status=error");
        }
    };

    s.set_phase(LoginPhase::VerifyingToken).await;
    let claims = match jwks::fetch_jwks_and_verify(&s.http, &s.jwks_url, &token.access_token).await
    {
        Ok(claims) => claims,
        Err(e) => {
            s.fail(&e.to_string()).await;
            return Redirect::to("/index.html#status=error");
        }
    };

    let decoded = DecodedAccessToken { access_token_response: token, decoded_claims: claims };
    if let Err(e) = s.store.update(&PlatformContext {
        decoded_access_token: Some(decoded.clone()),
        ..Default::default()
    }) {
        s.fail(&e.to_string()).await;
        return Redirect::to("/index.html#status=error");
    }
    *s.decoded.write().await = Some(decoded);
    s.set_phase(LoginPhase::ContextReady).await;
    tracing::info!("access token exchanged and verified");
    Redirect::to("/index.html#status=success")
}

#[derive(Debug, Serialize)]
struct ShutdownResponse {
    ok: bool,
}

/// `POST /shutdown` — the UI calls this once the user is done.
async fn shutdown_server(State(s): State<Arc<CallbackState>>) -> impl IntoResponse {
    tracing::info!("callback server shutdown requested");
    s.shutdown.cancel();
    Json(ShutdownResponse { ok: true })
}

/// `GET /projects` — projects across every usable account, for the picker.
async fn list_projects(State(s): State<Arc<CallbackState>>) -> impl IntoResponse {
    let Some(token) = s.bearer_token().await else {
        return AuthError::LoginFailed("no access token yet; complete the OAuth redirect first".to_owned())
            .to_http_response()
            .into_response();
    };
    let client = PlatformClient::new(&s.platform_url, token);
    match client.list_all_projects().await {
        Ok(projects) => Json(projects).into_response(),
        Err(e) => e.to_http_response().into_response(),
    }
}

/// `GET /context` — the currently persisted context.
async fn get_context(State(s): State<Arc<CallbackState>>) -> impl IntoResponse {
    Json(s.store.read().unwrap_or_default())
}

#[derive(Debug, Deserialize)]
pub struct SelectionRequest {
    pub account_id: u64,
    pub project_id: u64,
}

/// `POST /selection` — resolve the chosen project's environments and merge
/// the selection into the context.
async fn set_selection(
    State(s): State<Arc<CallbackState>>,
    Json(req): Json<SelectionRequest>,
) -> impl IntoResponse {
    let Some(token) = s.bearer_token().await else {
        return AuthError::LoginFailed("no access token yet; complete the OAuth redirect first".to_owned())
            .to_http_response()
            .into_response();
    };
    let client = PlatformClient::new(&s.platform_url, token);

    let accounts = match client.list_accounts().await {
        Ok(accounts) => accounts,
        Err(e) => return e.to_http_response().into_response(),
    };
    let Some(account) = accounts.iter().find(|a| a.id == req.account_id) else {
        return AuthError::LoginFailed(format!("account {} not found", req.account_id))
            .to_http_response()
            .into_response();
    };

    let environments = match client.list_environments(account.id, req.project_id).await {
        Ok(environments) => environments,
        Err(e) => return e.to_http_response().into_response(),
    };

    let mut dev_environment = None;
    let mut prod_environment = None;
    for env in environments {
        let Some(deployment_type) = env.deployment_type else { continue };
        let classified = Environment { id: env.id, name: env.name, deployment_type };
        match classified.deployment_type.to_lowercase().as_str() {
            "production" => prod_environment = Some(classified),
            "development" => dev_environment = Some(classified),
            _ => {}
        }
    }

    let update = PlatformContext {
        decoded_access_token: None,
        host_prefix: account.host_prefix().map(str::to_owned),
        dev_environment,
        prod_environment,
        account_id: Some(account.id),
    };
    match s.store.update(&update) {
        Ok(ctx) => Json(ctx).into_response(),
        Err(e) => e.to_http_response().into_response(),
    }
}

/// Minimal inline stand-in for the login UI bundle.
async fn index_page() -> Html<&'static str> {
    Html(INDEX_HTML)
}

const INDEX_HTML: &str = r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>platform-auth</title></head>
<body>
<h1 id="heading">Signing in&hellip;</h1>
<p id="detail">Waiting for the authorization redirect.</p>
<script>
  const status = new URLSearchParams(location.hash.slice(1)).get("status");
  if (status === "success") {
    document.getElementById("heading").textContent = "Signed in";
    document.getElementById("detail").textContent =
      "You can close this window once you have picked a project.";
  } else if (status === "error") {
    document.getElementById("heading").textContent = "Sign-in failed";
    document.getElementById("detail").textContent =
      "Close this window and retry from the terminal.";
  }
</script>
</body>
</html>
"#;

#[cfg(test)]
#[path = "callback_tests.rs"]
mod tests;
