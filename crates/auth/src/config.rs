// SPDX-License-Identifier: MIT

use std::path::PathBuf;

/// Scopes requested during login. `offline_access` asks the platform for a
/// refresh token; `user_access` is equivalent to a personal access token.
pub const OAUTH_SCOPES: &str = "user_access offline_access";

/// Configuration for the auth subsystem.
#[derive(Debug, Clone, clap::Args)]
pub struct AuthConfig {
    /// Base URL of the platform (serves the authorization, token, JWKS and
    /// v3 API endpoints).
    #[arg(long, env = "PLATFORM_URL")]
    pub platform_url: String,

    /// Static service/personal access token. When set, the OAuth flow and
    /// background refresh are bypassed entirely.
    #[arg(long, env = "PLATFORM_TOKEN")]
    pub token: Option<String>,

    /// OAuth client id registered for this tool.
    #[arg(long, default_value = "platform-auth-cli", env = "PLATFORM_CLIENT_ID")]
    pub client_id: String,

    /// Override the config directory holding the context and lock files.
    #[arg(long, env = "PLATFORM_AUTH_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    /// First port probed for the local OAuth callback listener.
    #[arg(long, default_value_t = 6785, env = "PLATFORM_AUTH_CALLBACK_PORT")]
    pub callback_port: u16,

    /// Seconds before token expiry at which the background refresh fires.
    #[arg(long, default_value_t = 300, env = "PLATFORM_AUTH_REFRESH_BUFFER_SECS")]
    pub refresh_buffer_secs: u64,
}

impl AuthConfig {
    /// Resolve the config directory for context and lock files.
    ///
    /// Checks the explicit override, then `$XDG_CONFIG_HOME/platform-auth`,
    /// then `$HOME/.config/platform-auth`.
    pub fn config_dir(&self) -> PathBuf {
        if let Some(dir) = &self.config_dir {
            return dir.clone();
        }
        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join("platform-auth");
        }
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(".config/platform-auth");
        }
        PathBuf::from(".platform-auth")
    }

    fn base_url(&self) -> &str {
        self.platform_url.trim_end_matches('/')
    }

    pub fn authorize_url(&self) -> String {
        format!("{}/oauth/authorize", self.base_url())
    }

    pub fn token_url(&self) -> String {
        format!("{}/oauth/token", self.base_url())
    }

    pub fn jwks_url(&self) -> String {
        format!("{}/.well-known/jwks.json", self.base_url())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
