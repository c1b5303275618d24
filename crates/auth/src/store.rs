// SPDX-License-Identifier: MIT

//! Context persistence: YAML file with atomic writes and an advisory
//! login lock.
//!
//! The context file is the only resource shared across process instances;
//! everything goes through this store. A corrupt, empty or missing file is
//! "no context", never an error.

use std::fs::OpenOptions;
use std::future::Future;
use std::path::{Path, PathBuf};

use nix::fcntl::{Flock, FlockArg};

use crate::context::PlatformContext;
use crate::error::AuthError;

const CONTEXT_FILE: &str = "context.yml";
const LOCK_FILE: &str = "login.lock";

/// Reads, writes and merges the persisted session context.
#[derive(Debug, Clone)]
pub struct ContextStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl ContextStore {
    pub fn new(config_dir: &Path) -> Self {
        Self { path: config_dir.join(CONTEXT_FILE), lock_path: config_dir.join(LOCK_FILE) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted context. Missing file, empty content or any
    /// parse error yields `None`.
    pub fn read(&self) -> Option<PlatformContext> {
        let contents = std::fs::read_to_string(&self.path).ok()?;
        if contents.trim().is_empty() {
            return None;
        }
        match serde_yaml::from_str(&contents) {
            Ok(ctx) => Some(ctx),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), err = %e, "context file is invalid, treating as absent");
                None
            }
        }
    }

    /// Serialize the full context atomically (write tmp + rename).
    ///
    /// Uses a unique temp filename (PID + counter) so concurrent saves
    /// racing on the same `.tmp` file cannot corrupt each other, and a
    /// concurrent reader never observes a half-written file.
    pub fn write(&self, ctx: &PlatformContext) -> Result<(), AuthError> {
        use std::sync::atomic::{AtomicU32, Ordering};
        static COUNTER: AtomicU32 = AtomicU32::new(0);

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AuthError::Storage(format!("create {}: {e}", parent.display())))?;
        }
        let yaml = serde_yaml::to_string(ctx)
            .map_err(|e| AuthError::Storage(format!("serialize context: {e}")))?;
        let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
        let tmp_name = format!(
            "{}.{}.{}.tmp",
            self.path.file_name().unwrap_or_default().to_string_lossy(),
            std::process::id(),
            seq,
        );
        let tmp_path = self.path.with_file_name(tmp_name);
        std::fs::write(&tmp_path, yaml)
            .map_err(|e| AuthError::Storage(format!("write {}: {e}", tmp_path.display())))?;
        std::fs::rename(&tmp_path, &self.path)
            .map_err(|e| AuthError::Storage(format!("rename {}: {e}", self.path.display())))?;
        Ok(())
    }

    /// Read-merge-write: merge `new` over the current context per the
    /// field-wise override rule, persist, and return the result.
    pub fn update(&self, new: &PlatformContext) -> Result<PlatformContext, AuthError> {
        let merged = self.read().unwrap_or_default().merged(new);
        self.write(&merged)?;
        Ok(merged)
    }

    /// Run `fut` while holding an exclusive advisory lock on the sibling
    /// lock file.
    ///
    /// This is what serializes concurrently starting process instances
    /// racing to log in: the second blocks here until the first finishes,
    /// then re-reads the context the first persisted. The flock is tied to
    /// process lifetime, so a crashed holder releases it automatically.
    pub async fn with_login_lock<F, T>(&self, fut: F) -> Result<T, AuthError>
    where
        F: Future<Output = Result<T, AuthError>>,
    {
        let lock_path = self.lock_path.clone();
        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AuthError::Storage(format!("create {}: {e}", parent.display())))?;
        }
        // flock(2) blocks; take it on a blocking thread.
        let guard = tokio::task::spawn_blocking(move || {
            let file = OpenOptions::new()
                .create(true)
                .truncate(false)
                .write(true)
                .open(&lock_path)
                .map_err(|e| AuthError::Storage(format!("open {}: {e}", lock_path.display())))?;
            Flock::lock(file, FlockArg::LockExclusive)
                .map_err(|(_file, errno)| AuthError::Storage(format!("flock failed: {errno}")))
        })
        .await
        .map_err(|e| AuthError::Storage(format!("lock task failed: {e}")))??;

        let result = fut.await;
        // Flock released on drop.
        drop(guard);
        result
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
