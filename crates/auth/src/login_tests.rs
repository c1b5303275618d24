// SPDX-License-Identifier: MIT

use super::*;
use crate::context::{Environment, LOGIN_FRESHNESS_BUFFER_SECS};
use crate::token::{AccessTokenResponse, DecodedAccessToken};

fn test_config(dir: &std::path::Path) -> AuthConfig {
    AuthConfig {
        // Unreachable on purpose: the fast path must not touch the network.
        platform_url: "http://127.0.0.1:1".into(),
        token: None,
        client_id: "client-id".into(),
        config_dir: Some(dir.to_path_buf()),
        callback_port: 0,
        refresh_buffer_secs: 300,
    }
}

fn fresh_context() -> PlatformContext {
    PlatformContext {
        decoded_access_token: Some(DecodedAccessToken {
            access_token_response: AccessTokenResponse {
                access_token: "tok".into(),
                refresh_token: Some("ref".into()),
                expires_in: 3600,
                token_type: "Bearer".into(),
                scope: "user_access offline_access".into(),
                expires_at: epoch_secs() + LOGIN_FRESHNESS_BUFFER_SECS + 3600,
            },
            decoded_claims: serde_json::Map::new(),
        }),
        host_prefix: Some("acme".into()),
        dev_environment: Some(Environment {
            id: 1,
            name: "dev".into(),
            deployment_type: "development".into(),
        }),
        prod_environment: Some(Environment {
            id: 2,
            name: "prod".into(),
            deployment_type: "production".into(),
        }),
        account_id: Some(100),
    }
}

#[tokio::test]
async fn acquire_context_reuses_fresh_session() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = ContextStore::new(dir.path());
    let ctx = fresh_context();
    store.write(&ctx)?;

    let got = acquire_context(&test_config(dir.path()), &store).await?;
    assert_eq!(got, ctx);
    Ok(())
}

#[tokio::test]
async fn bind_listener_takes_first_free_port() -> anyhow::Result<()> {
    let listener = bind_callback_listener(0, 1).await?;
    assert_ne!(listener.local_addr()?.port(), 0);
    Ok(())
}

#[tokio::test]
async fn bind_listener_skips_occupied_ports() -> anyhow::Result<()> {
    let occupied = TcpListener::bind(("127.0.0.1", 0)).await?;
    let taken = occupied.local_addr()?.port();

    let listener = bind_callback_listener(taken, 20).await?;
    assert_ne!(listener.local_addr()?.port(), taken);
    Ok(())
}

#[tokio::test]
async fn bind_listener_exhaustion_is_config_error() -> anyhow::Result<()> {
    let occupied = TcpListener::bind(("127.0.0.1", 0)).await?;
    let taken = occupied.local_addr()?.port();

    let err = bind_callback_listener(taken, 1).await.unwrap_err();
    assert!(matches!(err, AuthError::Config(_)), "got {err}");
    Ok(())
}
