// SPDX-License-Identifier: MIT

use super::*;

// RSA key set and pre-signed tokens generated for these tests; the signing
// key itself is not checked in.
const JWKS_JSON: &str = include_str!("../tests/fixtures/jwks.json");
const TOKEN_OK: &str = include_str!("../tests/fixtures/token_login.jwt");
const TOKEN_UNKNOWN_KID: &str = include_str!("../tests/fixtures/token_unknown_kid.jwt");
const TOKEN_NO_KID: &str = include_str!("../tests/fixtures/token_no_kid.jwt");
const TOKEN_EXPIRED: &str = include_str!("../tests/fixtures/token_expired.jwt");
const TOKEN_HS256: &str = include_str!("../tests/fixtures/token_hs256.jwt");

fn key_set() -> JwkSet {
    serde_json::from_str(JWKS_JSON).unwrap()
}

#[test]
fn valid_token_yields_claims() -> anyhow::Result<()> {
    let claims = verify_with_jwks(&key_set(), TOKEN_OK)?;
    assert_eq!(claims.get("sub").and_then(|v| v.as_str()), Some("42"));
    assert_eq!(
        claims.get("scope").and_then(|v| v.as_str()),
        Some("user_access offline_access")
    );
    Ok(())
}

#[test]
fn unknown_key_id_is_rejected() {
    let err = verify_with_jwks(&key_set(), TOKEN_UNKNOWN_KID).unwrap_err();
    assert!(matches!(err, AuthError::Verification(_)), "got {err}");
    assert!(err.to_string().contains("rotated-away"), "got {err}");
}

#[test]
fn missing_key_id_is_rejected() {
    let err = verify_with_jwks(&key_set(), TOKEN_NO_KID).unwrap_err();
    assert!(matches!(err, AuthError::Verification(_)), "got {err}");
    assert!(err.to_string().contains("no key id"), "got {err}");
}

#[test]
fn non_rs256_token_is_rejected() {
    // Algorithm confusion: HS256 token naming a valid RSA kid.
    let err = verify_with_jwks(&key_set(), TOKEN_HS256).unwrap_err();
    assert!(matches!(err, AuthError::Verification(_)), "got {err}");
}

#[test]
fn expired_token_is_rejected() {
    let err = verify_with_jwks(&key_set(), TOKEN_EXPIRED).unwrap_err();
    assert!(matches!(err, AuthError::Verification(_)), "got {err}");
}

#[test]
fn tampered_payload_is_rejected() {
    // Re-sign nothing: splice the expired token's payload under the valid
    // token's signature.
    let parts: Vec<&str> = TOKEN_OK.split('.').collect();
    let other: Vec<&str> = TOKEN_EXPIRED.split('.').collect();
    let tampered = format!("{}.{}.{}", parts[0], other[1], parts[2]);
    let err = verify_with_jwks(&key_set(), &tampered).unwrap_err();
    assert!(matches!(err, AuthError::Verification(_)), "got {err}");
}

#[test]
fn garbage_token_is_rejected() {
    let err = verify_with_jwks(&key_set(), "not.a.jwt").unwrap_err();
    assert!(matches!(err, AuthError::Verification(_)), "got {err}");
}
