//! # Solid Authentication
//!
//! Verification of Solid-OIDC access tokens presented to a resource server.
//!
//! This crate provides:
//! - **Token classification**: Bearer and DPoP-bound tokens, decided by the `cnf` claim
//! - **Issuer trust**: the token issuer must be trusted by the subject's WebID
//! - **Claim policy**: `iss`, `webid` and `aud` must be absolute secure URIs
//! - **DPoP binding**: `ath` access token hash and `cnf.jkt` thumbprint checks
//!
//! ## Features
//!
//! - Trusted issuer and key set lookups are injected, sync or async
//! - Signature checks are delegated to a [`SignatureVerifier`]; the default
//!   [`JwksSignatureVerifier`] verifies against a JSON Web Key Set
//! - Symmetric algorithms (HS256, etc.) and `none` are explicitly rejected
//!
//! ## Example
//!
//! ```no_run
//! use jsonwebtoken::jwk::JwkSet;
//! use solid_authn::{
//!     JwksSignatureVerifier, ResolverError, StaticTrustedIssuers, verify_access_token_hash,
//!     verify_solid_access_token,
//! };
//!
//! # async fn example(token: &str, ath: &str, jwks: JwkSet) -> Result<(), Box<dyn std::error::Error>> {
//! let issuers = StaticTrustedIssuers::new(["https://idp.example.com"]);
//! let key_sets = move |_issuer: &str| {
//!     let jwks = jwks.clone();
//!     async move { Ok::<_, ResolverError>(jwks) }
//! };
//!
//! let verified =
//!     verify_solid_access_token(token, &issuers, &key_sets, &JwksSignatureVerifier::new())
//!         .await?;
//! if verified.payload().is_dpop_bound() {
//!     verify_access_token_hash(token, ath)?;
//! }
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Access token verification pipeline.
pub mod access_token;
/// Verification options.
pub mod config;
/// DPoP access token hash and key binding checks.
pub mod dpop;
/// Authentication error types.
pub mod error;
/// Injected trusted issuer and key set lookups.
pub mod resolver;
/// Signature verification primitive.
pub mod signature;
#[cfg(any(test, feature = "testutil"))]
pub mod testutil;
/// Access token structure and decoding.
pub mod token;
/// Secure URI claim policy.
pub mod uri;
/// Algorithm validation.
pub mod validation;

// Re-export key types for convenience
pub use access_token::{
    VerifiedAccessToken, verify_solid_access_token, verify_solid_access_token_with_options,
};
pub use config::VerificationOptions;
pub use dpop::{compute_access_token_hash, verify_access_token_hash, verify_confirmation};
pub use error::{AuthError, ResolverError, Result, VerificationError};
pub use resolver::{KeySetResolver, StaticTrustedIssuers, TrustedIssuerResolver};
pub use signature::{JwksSignatureVerifier, SignatureVerifier};
pub use token::{AccessTokenPayload, SignedToken, TokenType};
pub use validation::{ACCEPTED_ALGORITHMS, FORBIDDEN_ALGORITHMS, validate_algorithm};
