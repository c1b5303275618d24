// SPDX-License-Identifier: MIT

//! OAuth session lifecycle for locally running platform tools.
//!
//! One browser-based PKCE login shared across concurrently starting
//! process instances, a merged YAML context file, and a background
//! refresh loop behind a non-blocking [`provider::TokenProvider`].

pub mod callback;
pub mod config;
pub mod context;
pub mod error;
pub mod jwks;
pub mod login;
pub mod pkce;
pub mod platform;
pub mod provider;
pub mod refresh;
pub mod store;
pub mod token;

pub use config::AuthConfig;
pub use context::PlatformContext;
pub use error::AuthError;
pub use login::acquire_context;
pub use provider::{OAuthTokenProvider, StaticTokenProvider, TokenProvider};
pub use store::ContextStore;
