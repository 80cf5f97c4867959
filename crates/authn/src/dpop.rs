//! DPoP proof checks tied to an access token.
//!
//! A DPoP proof presented with a bound access token carries an `ath` claim,
//! the base64url SHA-256 hash of the access token, and is signed by the key
//! whose thumbprint the token carries in `cnf.jkt`. Proof parsing and
//! signature checks are the caller's; this module checks the two values that
//! link the proof to the token.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::{access_token::VerifiedAccessToken, error::AuthError};

/// Computes the `ath` value for `token`: base64url (no padding) of its SHA-256 hash.
#[must_use]
pub fn compute_access_token_hash(token: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(token.as_bytes()))
}

/// Checks that `claimed` is the `ath` value of `token`.
///
/// The comparison is exact: no trimming or case folding is applied.
///
/// # Errors
///
/// Returns [`AuthError::AccessTokenHash`] carrying `claimed` if it differs
/// from the computed hash.
pub fn verify_access_token_hash(token: &str, claimed: &str) -> Result<(), AuthError> {
    let expected = compute_access_token_hash(token);
    if constant_time_eq(&expected, claimed) {
        Ok(())
    } else {
        tracing::debug!(claimed = %claimed, "Access token hash mismatch");
        Err(AuthError::AccessTokenHash { claimed: claimed.to_owned() })
    }
}

/// Checks that a DPoP-bound token is bound to the key with thumbprint `proof_jkt`.
///
/// # Errors
///
/// - [`AuthError::MissingTokenBinding`] if `token` is a Bearer token
/// - [`AuthError::ThumbprintMismatch`] if the thumbprints differ
pub fn verify_confirmation(token: &VerifiedAccessToken, proof_jkt: &str) -> Result<(), AuthError> {
    let cnf = token.payload().confirmation().ok_or(AuthError::MissingTokenBinding)?;

    if !constant_time_eq(&cnf.jkt, proof_jkt) {
        tracing::warn!(
            token_jkt = %cnf.jkt,
            proof_jkt = %proof_jkt,
            "DPoP proof key does not match token binding"
        );
        return Err(AuthError::ThumbprintMismatch {
            expected: cnf.jkt.clone(),
            actual: proof_jkt.to_owned(),
        });
    }

    Ok(())
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
