// SPDX-License-Identifier: MIT

use super::*;
use crate::context::Environment;
use crate::token::{AccessTokenResponse, DecodedAccessToken};

fn sample_context() -> PlatformContext {
    PlatformContext {
        decoded_access_token: Some(DecodedAccessToken {
            access_token_response: AccessTokenResponse {
                access_token: "tok".into(),
                refresh_token: Some("ref".into()),
                expires_in: 3600,
                token_type: "Bearer".into(),
                scope: "user_access offline_access".into(),
                expires_at: 1_003_600,
            },
            decoded_claims: serde_json::Map::new(),
        }),
        host_prefix: Some("acme".into()),
        dev_environment: None,
        prod_environment: None,
        account_id: Some(100),
    }
}

#[test]
fn read_missing_file_is_none() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = ContextStore::new(dir.path());
    assert_eq!(store.read(), None);
    Ok(())
}

#[test]
fn read_empty_file_is_none() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = ContextStore::new(dir.path());
    std::fs::write(store.path(), "   \n")?;
    assert_eq!(store.read(), None);
    Ok(())
}

#[test]
fn read_corrupt_file_is_none() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = ContextStore::new(dir.path());
    std::fs::write(store.path(), "{{{ not yaml ]]]")?;
    assert_eq!(store.read(), None);
    Ok(())
}

#[test]
fn write_then_read_roundtrips() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = ContextStore::new(dir.path());
    let ctx = sample_context();
    store.write(&ctx)?;
    assert_eq!(store.read(), Some(ctx));
    Ok(())
}

#[test]
fn write_creates_missing_parent_dirs() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = ContextStore::new(&dir.path().join("nested/deeper"));
    store.write(&sample_context())?;
    assert!(store.read().is_some());
    Ok(())
}

#[test]
fn write_leaves_no_tmp_files_behind() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = ContextStore::new(dir.path());
    store.write(&sample_context())?;
    store.write(&sample_context())?;
    let leftovers: Vec<_> = std::fs::read_dir(dir.path())?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty(), "tmp files left behind: {leftovers:?}");
    Ok(())
}

#[test]
fn update_merges_over_existing_context() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = ContextStore::new(dir.path());
    store.write(&sample_context())?;

    let update = PlatformContext {
        account_id: Some(200),
        dev_environment: Some(Environment {
            id: 1,
            name: "dev".into(),
            deployment_type: "development".into(),
        }),
        ..Default::default()
    };
    let merged = store.update(&update)?;
    assert_eq!(merged.account_id, Some(200));
    assert_eq!(merged.host_prefix.as_deref(), Some("acme"));
    assert!(merged.decoded_access_token.is_some());
    assert_eq!(store.read(), Some(merged));
    Ok(())
}

#[tokio::test]
async fn login_lock_is_mutually_exclusive() -> anyhow::Result<()> {
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::Arc;

    let dir = tempfile::tempdir()?;
    let store = ContextStore::new(dir.path());
    let inside = Arc::new(AtomicBool::new(false));
    let overlaps = Arc::new(AtomicU32::new(0));

    let critical = |store: ContextStore, inside: Arc<AtomicBool>, overlaps: Arc<AtomicU32>| async move {
        store
            .with_login_lock(async {
                if inside.swap(true, Ordering::SeqCst) {
                    overlaps.fetch_add(1, Ordering::SeqCst);
                }
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                inside.store(false, Ordering::SeqCst);
                Ok::<_, AuthError>(())
            })
            .await
    };

    let (a, b) = tokio::join!(
        critical(store.clone(), Arc::clone(&inside), Arc::clone(&overlaps)),
        critical(store.clone(), Arc::clone(&inside), Arc::clone(&overlaps)),
    );
    a?;
    b?;
    assert_eq!(overlaps.load(Ordering::SeqCst), 0, "both tasks were inside the lock at once");
    Ok(())
}

#[tokio::test]
async fn login_lock_passes_through_result() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = ContextStore::new(dir.path());

    let ok = store.with_login_lock(async { Ok::<_, AuthError>(7) }).await?;
    assert_eq!(ok, 7);

    let err = store
        .with_login_lock(async { Err::<(), _>(AuthError::LoginFailed("nope".into())) })
        .await;
    assert!(matches!(err, Err(AuthError::LoginFailed(_))));
    // The lock is released after a failed attempt.
    let again = store.with_login_lock(async { Ok::<_, AuthError>(()) }).await;
    assert!(again.is_ok());
    Ok(())
}
