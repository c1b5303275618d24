// SPDX-License-Identifier: MIT

//! RS256 token verification against the platform's published key set.

use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};

use crate::error::AuthError;

pub type Claims = serde_json::Map<String, serde_json::Value>;

/// Fetch the platform's JWKS and verify an access token against it.
///
/// Returns the verified claim set. Any failure (unknown key id, wrong
/// algorithm, bad signature, expired token) fails the whole attempt.
pub async fn fetch_jwks_and_verify(
    client: &reqwest::Client,
    jwks_url: &str,
    access_token: &str,
) -> Result<Claims, AuthError> {
    let jwks: JwkSet = client.get(jwks_url).send().await?.error_for_status()?.json().await?;
    verify_with_jwks(&jwks, access_token)
}

/// Verify a token against an already-fetched key set.
pub fn verify_with_jwks(jwks: &JwkSet, token: &str) -> Result<Claims, AuthError> {
    let header = decode_header(token)?;
    if header.alg != Algorithm::RS256 {
        return Err(AuthError::Verification(format!(
            "unexpected signing algorithm {:?}",
            header.alg
        )));
    }
    let kid = header
        .kid
        .ok_or_else(|| AuthError::Verification("token header has no key id".to_owned()))?;
    let jwk = jwks
        .find(&kid)
        .ok_or_else(|| AuthError::Verification(format!("no key {kid} in JWKS")))?;
    let key = DecodingKey::from_jwk(jwk)?;

    let mut validation = Validation::new(Algorithm::RS256);
    // The platform issues tokens for several first-party consumers; the
    // audience claim is not checked, matching the server's own tooling.
    validation.validate_aud = false;

    let data = decode::<Claims>(token, &key, &validation)?;
    Ok(data.claims)
}

#[cfg(test)]
#[path = "jwks_tests.rs"]
mod tests;
