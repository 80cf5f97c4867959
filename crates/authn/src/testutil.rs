//! Shared test utilities for access token verification.
//!
//! This module provides helpers for generating Ed25519 key pairs and their
//! JWKs, signing access tokens, crafting unsigned tokens from arbitrary JSON,
//! and stand-in resolvers and verifiers for exercising the verification
//! pipeline without real keys. It is feature-gated behind `testutil` to
//! prevent leaking into production builds.
//!
//! # Usage
//!
//! In integration tests, enable the feature in `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! solid-authn = { path = "../authn", features = ["testutil"] }
//! ```
//!
//! Then import helpers:
//!
//! ```no_run
//! // Requires the `testutil` feature to be enabled.
//! use solid_authn::testutil::{bearer_claims, craft_raw_token, es256_header};
//! ```

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use ed25519_dalek::SigningKey;
use jsonwebtoken::{Algorithm, EncodingKey, Header, jwk::Jwk};
use rand_core::OsRng;
use serde_json::{Value, json};
use zeroize::Zeroizing;

use crate::{
    error::{ResolverError, VerificationError},
    resolver::KeySetResolver,
    signature::{DecodedJws, SignatureVerifier, VerificationConstraints},
    token::SignedToken,
};

/// `cnf.jkt` thumbprint carried by [`dpop_bound_claims`].
pub const FIXTURE_JKT: &str = "0ZcOCORZNYy-DWpqq30jZyJGHTN0d2HglBV3uiguA4I";

/// Generates a test Ed25519 key pair.
///
/// Returns `(pkcs8_der, public_key_base64url)` where:
/// - `pkcs8_der` is the private key in PKCS#8 DER format wrapped in [`Zeroizing`] (suitable for
///   [`EncodingKey::from_ed_der`])
/// - `public_key_base64url` is the 32-byte public key encoded as base64url without padding
///   (suitable for the `x` member of an OKP JWK)
///
/// Each call generates a fresh random key pair.
pub fn generate_test_keypair() -> (Zeroizing<Vec<u8>>, String) {
    let signing_key = SigningKey::generate(&mut OsRng);
    let public_key_b64 = URL_SAFE_NO_PAD.encode(signing_key.verifying_key().to_bytes());

    let private_bytes: Zeroizing<[u8; 32]> = Zeroizing::new(signing_key.to_bytes());
    let mut pkcs8_der = Zeroizing::new(vec![
        0x30, 0x2e, // SEQUENCE, 46 bytes
        0x02, 0x01, 0x00, // INTEGER version 0
        0x30, 0x05, // SEQUENCE, 5 bytes (algorithm identifier)
        0x06, 0x03, 0x2b, 0x65, 0x70, // OID 1.3.101.112 (Ed25519)
        0x04, 0x22, // OCTET STRING, 34 bytes
        0x04, 0x20, // OCTET STRING, 32 bytes (the actual key)
    ]);
    pkcs8_der.extend_from_slice(&*private_bytes);

    (pkcs8_der, public_key_b64)
}

/// Builds the public Ed25519 JWK for a key from [`generate_test_keypair`].
///
/// # Panics
///
/// Panics if the JWK does not deserialize (should not happen).
pub fn ed25519_jwk(public_key_b64: &str, kid: &str) -> Jwk {
    serde_json::from_value(json!({
        "kty": "OKP",
        "crv": "Ed25519",
        "x": public_key_b64,
        "kid": kid,
        "alg": "EdDSA",
        "use": "sig",
    }))
    .expect("Failed to build test JWK")
}

/// Signs `claims` as an `at+jwt` access token with an Ed25519 key in PKCS#8 DER format.
///
/// # Panics
///
/// Panics if JWT encoding fails (should not happen with valid inputs).
pub fn create_signed_token(pkcs8_der: &[u8], kid: Option<&str>, claims: &Value) -> String {
    let mut header = Header::new(Algorithm::EdDSA);
    header.typ = Some("at+jwt".to_string());
    header.kid = kid.map(str::to_string);

    let encoding_key = EncodingKey::from_ed_der(pkcs8_der);
    jsonwebtoken::encode(&header, claims, &encoding_key).expect("Failed to encode test token")
}

/// Creates a raw token string from arbitrary header and payload JSON.
///
/// The signature segment is a fixed placeholder that no key verifies.
///
/// # Panics
///
/// Panics if JSON serialization fails.
pub fn craft_raw_token(header_json: &Value, payload_json: &Value) -> String {
    let header_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(header_json).expect("header json"));
    let payload_b64 =
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(payload_json).expect("payload json"));
    let signature_b64 = URL_SAFE_NO_PAD.encode(b"not a real signature");
    format!("{header_b64}.{payload_b64}.{signature_b64}")
}

/// An `ES256` access token header.
pub fn es256_header() -> Value {
    json!({"alg": "ES256", "typ": "at+jwt", "kid": "es256-key"})
}

/// Claims of a Bearer access token issued by `https://example.com/issuer`
/// for the WebID `https://example.com/webid`, valid for one hour.
pub fn bearer_claims() -> Value {
    let now = Utc::now().timestamp();
    json!({
        "iss": "https://example.com/issuer",
        "aud": "https://example.com/resource",
        "webid": "https://example.com/webid",
        "sub": "https://example.com/subject",
        "client_id": "https://example.com/client",
        "scope": "openid webid",
        "exp": now + 3600,
        "iat": now,
    })
}

/// [`bearer_claims`] bound to the key with thumbprint [`FIXTURE_JKT`].
pub fn dpop_bound_claims() -> Value {
    let mut claims = bearer_claims();
    claims["cnf"] = json!({ "jkt": FIXTURE_JKT });
    claims
}

/// Key set resolver for verifiers that need no keys.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoKeySet;

#[async_trait]
impl KeySetResolver for NoKeySet {
    type KeySet = ();

    async fn key_set(&self, _issuer: &str) -> Result<(), ResolverError> {
        Ok(())
    }
}

/// Verifier that accepts any well-formed token without checking anything.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnverifiedDecoder;

impl SignatureVerifier for UnverifiedDecoder {
    type KeySet = ();

    fn verify(
        &self,
        token: &str,
        _key_set: &(),
        _constraints: &VerificationConstraints<'_>,
    ) -> Result<DecodedJws, VerificationError> {
        let decoded =
            SignedToken::decode(token).map_err(|e| VerificationError::Other(e.to_string()))?;
        Ok(DecodedJws { header: decoded.header, payload: decoded.payload })
    }
}

/// Verifier that rejects every token with the wrapped error.
#[derive(Clone, Debug)]
pub struct FailingVerifier(pub VerificationError);

impl SignatureVerifier for FailingVerifier {
    type KeySet = ();

    fn verify(
        &self,
        _token: &str,
        _key_set: &(),
        _constraints: &VerificationConstraints<'_>,
    ) -> Result<DecodedJws, VerificationError> {
        Err(self.0.clone())
    }
}

/// Asserts that a [`Result<T, AuthError>`] is an `Err` matching the given [`AuthError`] variant.
///
/// Works with any `AuthError` variant. On failure, prints the expected variant
/// and the actual result for debugging.
///
/// # Examples
///
/// ```no_run
/// // Requires the `testutil` feature to be enabled.
/// use solid_authn::assert_auth_error;
/// use solid_authn::error::AuthError;
///
/// let result: Result<(), AuthError> = Err(AuthError::EmptyAudience);
/// assert_auth_error!(result, EmptyAudience);
/// ```
///
/// [`AuthError`]: crate::error::AuthError
#[macro_export]
macro_rules! assert_auth_error {
    ($result:expr, $variant:ident) => {
        assert!(
            matches!($result, Err($crate::error::AuthError::$variant { .. })),
            "expected AuthError::{}, got: {:?}",
            stringify!($variant),
            $result,
        );
    };
    ($result:expr, $variant:ident, $msg:expr) => {
        assert!(
            matches!($result, Err($crate::error::AuthError::$variant { .. })),
            "{}: expected AuthError::{}, got: {:?}",
            $msg,
            stringify!($variant),
            $result,
        );
    };
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_test_keypair_produces_valid_key() {
        let (pkcs8_der, public_key_b64) = generate_test_keypair();
        // PKCS#8 DER for Ed25519 is 48 bytes (16 header + 32 key)
        assert_eq!(pkcs8_der.len(), 48);
        // Base64url of 32 bytes = 43 characters (no padding)
        assert_eq!(public_key_b64.len(), 43);
    }

    #[test]
    fn test_generate_test_keypair_unique() {
        let (_, pk1) = generate_test_keypair();
        let (_, pk2) = generate_test_keypair();
        assert_ne!(pk1, pk2, "each call should produce a unique key pair");
    }

    #[test]
    fn test_ed25519_jwk_members() {
        let (_, public_key_b64) = generate_test_keypair();
        let jwk = ed25519_jwk(&public_key_b64, "kid-001");
        assert_eq!(jwk.common.key_id.as_deref(), Some("kid-001"));
        assert!(jwk.common.key_algorithm.is_some());
    }

    #[test]
    fn test_create_signed_token_header() {
        let (pkcs8_der, _) = generate_test_keypair();
        let token = create_signed_token(&pkcs8_der, Some("kid-001"), &bearer_claims());
        let decoded = SignedToken::decode(&token).unwrap();
        assert_eq!(decoded.header.alg, "EdDSA");
        assert_eq!(decoded.header.typ.as_deref(), Some("at+jwt"));
        assert_eq!(decoded.header.kid.as_deref(), Some("kid-001"));
        assert!(!decoded.signature.is_empty());
    }

    #[test]
    fn test_craft_raw_token_format() {
        let token = craft_raw_token(&json!({"alg": "none"}), &json!({"iss": "x"}));
        let parts: Vec<&str> = token.split('.').collect();
        assert_eq!(parts.len(), 3);
        assert!(!parts[2].is_empty());
    }

    #[test]
    fn test_assert_auth_error_unit_variant() {
        use crate::error::AuthError;
        let result: Result<(), AuthError> = Err(AuthError::MissingTokenBinding);
        assert_auth_error!(result, MissingTokenBinding);
    }

    #[test]
    fn test_assert_auth_error_with_message() {
        use crate::error::AuthError;
        let result: Result<(), AuthError> = Err(AuthError::missing_claim("webid"));
        assert_auth_error!(result, MissingClaim, "subject should be required");
    }
}
