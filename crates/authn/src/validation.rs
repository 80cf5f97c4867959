//! JWT algorithm validation.
//!
//! This module provides security checks for JWT algorithms, ensuring only
//! approved asymmetric algorithms are accepted for access tokens.
//!
//! # Security
//!
//! - Strict algorithm checks to prevent algorithm substitution attacks
//! - Only asymmetric algorithms are allowed, since issuer keys are public
//! - Symmetric algorithms and "none" are always rejected

use crate::error::AuthError;

/// Forbidden JWT algorithms that are never accepted for security reasons.
///
/// - `none`: No signature verification (trivially bypassable)
/// - `HS256`, `HS384`, `HS512`: Symmetric algorithms (an issuer's public key
///   would double as the HMAC secret)
pub const FORBIDDEN_ALGORITHMS: &[&str] = &["none", "HS256", "HS384", "HS512"];

/// Accepted JWT algorithms.
///
/// These are the asymmetric JWS algorithms an OpenID provider may publish
/// keys for. `ES256` is the algorithm most Solid identity providers sign
/// access tokens with.
pub const ACCEPTED_ALGORITHMS: &[&str] =
    &["ES256", "ES384", "RS256", "RS384", "RS512", "PS256", "PS384", "PS512", "EdDSA"];

/// Validate JWT algorithm against security policies.
///
/// - ALWAYS rejects symmetric algorithms (HS256, HS384, HS512)
/// - ALWAYS rejects "none" algorithm
/// - Only accepts algorithms in `allowed`
///
/// # Errors
///
/// Returns [`AuthError::UnsupportedAlgorithm`] if the algorithm is forbidden
/// or not in `allowed`.
///
/// # Examples
///
/// ```
/// use solid_authn::validation::{ACCEPTED_ALGORITHMS, validate_algorithm};
///
/// assert!(validate_algorithm("ES256", ACCEPTED_ALGORITHMS).is_ok());
/// assert!(validate_algorithm("HS256", ACCEPTED_ALGORITHMS).is_err());
/// assert!(validate_algorithm("RS256", &["ES256"]).is_err());
/// ```
pub fn validate_algorithm<S: AsRef<str>>(alg: &str, allowed: &[S]) -> Result<(), AuthError> {
    if FORBIDDEN_ALGORITHMS.contains(&alg) {
        return Err(AuthError::unsupported_algorithm(format!(
            "Algorithm '{}' is not allowed for security reasons",
            alg
        )));
    }

    if !allowed.iter().any(|candidate| candidate.as_ref() == alg) {
        return Err(AuthError::unsupported_algorithm(format!(
            "Algorithm '{}' is not in accepted list",
            alg
        )));
    }

    Ok(())
}
