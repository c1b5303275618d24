// SPDX-License-Identifier: MIT

//! Interactive login orchestration.
//!
//! `acquire_context` is the entry point: fast-path freshness check, then
//! the cross-process login lock, a re-check under the lock, and finally
//! the browser flow. The lock is what keeps multiple concurrently starting
//! instances from each opening a browser window.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::callback::{build_router, CallbackState, LoginPhase};
use crate::config::{AuthConfig, OAUTH_SCOPES};
use crate::context::PlatformContext;
use crate::error::AuthError;
use crate::pkce;
use crate::store::ContextStore;
use crate::token::epoch_secs;

/// How many sequential ports to probe for the callback listener.
const PORT_PROBE_ATTEMPTS: u16 = 20;

/// Return a usable, non-expired context, logging in only when necessary.
pub async fn acquire_context(
    config: &AuthConfig,
    store: &ContextStore,
) -> Result<PlatformContext, AuthError> {
    // Fast path: a sibling process may already have a fresh session.
    if let Some(ctx) = store.read() {
        if ctx.is_login_skippable(epoch_secs()) {
            return Ok(ctx);
        }
    }
    store
        .with_login_lock(async {
            // Re-check under the lock: whoever held it before us may have
            // just finished logging in.
            if let Some(ctx) = store.read() {
                if ctx.is_login_skippable(epoch_secs()) {
                    tracing::info!("session context already fresh, skipping login");
                    return Ok(ctx);
                }
            }
            login(config, store).await
        })
        .await
}

/// Bind the callback listener on the first free port at or above
/// `start_port`, probing up to `attempts` candidates.
///
/// The bound listener is kept and handed to the server, so there is no
/// close-and-rebind race. Exhausting the range is a configuration error;
/// a single port in use just advances to the next candidate.
pub async fn bind_callback_listener(
    start_port: u16,
    attempts: u16,
) -> Result<TcpListener, AuthError> {
    for port in start_port..start_port.saturating_add(attempts) {
        match TcpListener::bind(("127.0.0.1", port)).await {
            Ok(listener) => return Ok(listener),
            Err(e) => {
                tracing::debug!(port, err = %e, "callback port unavailable, trying next");
            }
        }
    }
    Err(AuthError::Config(format!(
        "no available callback port found starting at {start_port} after {attempts} attempts"
    )))
}

/// Run one browser-based PKCE login and return the persisted context.
pub async fn login(
    config: &AuthConfig,
    store: &ContextStore,
) -> Result<PlatformContext, AuthError> {
    let listener = bind_callback_listener(config.callback_port, PORT_PROBE_ATTEMPTS).await?;
    let port = listener
        .local_addr()
        .map_err(|e| AuthError::Config(format!("callback listener address: {e}")))?
        .port();
    let redirect_uri = format!("http://localhost:{port}");

    let code_verifier = pkce::generate_code_verifier();
    let code_challenge = pkce::compute_code_challenge(&code_verifier);
    let oauth_state = pkce::generate_state();
    let authorization_url = pkce::build_authorization_url(
        &config.authorize_url(),
        &config.client_id,
        &redirect_uri,
        OAUTH_SCOPES,
        &code_challenge,
        &oauth_state,
    );

    let (failure_tx, mut failure_rx) = watch::channel(None::<String>);
    let shutdown = CancellationToken::new();
    let state = Arc::new(CallbackState::new(
        config,
        redirect_uri,
        store.clone(),
        HashMap::from([(oauth_state, code_verifier)]),
        failure_tx,
        shutdown.clone(),
    ));
    let router = build_router(Arc::clone(&state));

    let server_shutdown = shutdown.clone();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(server_shutdown.cancelled_owned())
            .await
    });

    tracing::info!(port, "opening authorization url");
    if let Err(e) = open::that(&authorization_url) {
        tracing::warn!(err = %e, url = %authorization_url, "could not open a browser; open the URL manually");
    }

    tokio::select! {
        // A failure anywhere in the callback path releases us immediately;
        // the server is cancelled so the in-flight error redirect still
        // completes under graceful shutdown. The channel cannot close while
        // `state` is held here; a closed channel is not a failure.
        changed = failure_rx.changed() => {
            if changed.is_ok() {
                let reason = failure_rx
                    .borrow()
                    .clone()
                    .unwrap_or_else(|| "login failed".to_owned());
                shutdown.cancel();
                let _ = (&mut server).await;
                return Err(AuthError::LoginFailed(reason));
            }
            let _ = (&mut server).await;
        }
        // Normal completion: the UI posted /shutdown.
        res = &mut server => {
            match res {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    return Err(AuthError::LoginFailed(format!("callback server error: {e}")));
                }
                Err(e) => {
                    return Err(AuthError::LoginFailed(format!("callback server task failed: {e}")));
                }
            }
        }
    }

    // Judge the outcome by this attempt's own state, not by whatever is on
    // disk: a shutdown before the redirect completed must not surface a
    // previously persisted (possibly expired) context.
    if state.phase().await != LoginPhase::ContextReady {
        return Err(AuthError::LoginFailed(
            "login ended before a token was issued".to_owned(),
        ));
    }
    let ctx = store
        .read()
        .ok_or_else(|| AuthError::LoginFailed("login did not produce a session context".to_owned()))?;
    if ctx.decoded_access_token.is_none() {
        return Err(AuthError::LoginFailed("login completed without an access token".to_owned()));
    }
    tracing::info!("login successful");
    Ok(ctx)
}

#[cfg(test)]
#[path = "login_tests.rs"]
mod tests;
