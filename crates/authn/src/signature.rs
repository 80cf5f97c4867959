//! Signature verification primitive.
//!
//! The verification pipeline hands the raw token, the key set returned by
//! the [`KeySetResolver`](crate::KeySetResolver) and a set of
//! [`VerificationConstraints`] to a [`SignatureVerifier`]. The verifier owns
//! every cryptographic and temporal check; the pipeline owns claim policy.
//!
//! [`JwksSignatureVerifier`] is the default implementation, verifying tokens
//! with `jsonwebtoken` against a [`JwkSet`].

use std::time::Duration;

use jsonwebtoken::{
    Algorithm, DecodingKey, Validation, decode, decode_header,
    jwk::{Jwk, JwkSet},
};

use crate::{
    error::VerificationError,
    token::{AccessTokenHeader, AccessTokenPayload, SignedToken},
    validation::validate_algorithm,
};

/// Constraints the verifier must enforce on top of the signature itself.
#[derive(Clone, Copy, Debug)]
pub struct VerificationConstraints<'a> {
    /// Issuers the token may come from. Empty means none.
    pub issuers: &'a [String],
    /// Algorithms the token may be signed with.
    pub algorithms: &'a [String],
    /// Clock skew tolerance for `exp` and `nbf`.
    pub leeway: Duration,
}

/// Header and payload of a token whose signature was verified.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedJws {
    /// Protected header.
    pub header: AccessTokenHeader,
    /// Verified claims.
    pub payload: AccessTokenPayload,
}

/// JOSE verification primitive.
///
/// Implementations verify the token signature with `key_set`, reject tokens
/// that are expired or not yet valid, enforce the algorithm and issuer
/// constraints, and return the decoded header and payload.
pub trait SignatureVerifier: Send + Sync {
    /// Key set type, produced by the paired [`KeySetResolver`](crate::KeySetResolver).
    type KeySet: Send + Sync;

    /// Verify `token`.
    ///
    /// # Errors
    ///
    /// Returns a [`VerificationError`] describing why the token was rejected.
    /// An issuer outside `constraints.issuers` must be reported as
    /// [`VerificationError::IssuerNotAllowed`].
    fn verify(
        &self,
        token: &str,
        key_set: &Self::KeySet,
        constraints: &VerificationConstraints<'_>,
    ) -> Result<DecodedJws, VerificationError>;
}

/// [`SignatureVerifier`] backed by `jsonwebtoken` and a JSON Web Key Set.
///
/// The key is selected by the header `kid`. A token without `kid` is only
/// accepted when the key set holds exactly one key. `exp` and `iss` are
/// required; audience is left to the claim policy.
#[derive(Clone, Copy, Debug, Default)]
pub struct JwksSignatureVerifier;

impl JwksSignatureVerifier {
    /// Creates a verifier.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl SignatureVerifier for JwksSignatureVerifier {
    type KeySet = JwkSet;

    fn verify(
        &self,
        token: &str,
        key_set: &JwkSet,
        constraints: &VerificationConstraints<'_>,
    ) -> Result<DecodedJws, VerificationError> {
        let raw_header = SignedToken::decode(token)
            .map_err(|e| VerificationError::Other(e.to_string()))?
            .header;
        validate_algorithm(&raw_header.alg, constraints.algorithms)
            .map_err(|_| VerificationError::UnsupportedAlgorithm(raw_header.alg.clone()))?;

        let header = decode_header(token)?;
        let alg = algorithm_name(header.alg);

        let jwk = select_key(key_set, header.kid.as_deref())?;
        if let Some(key_alg) = &jwk.common.key_algorithm {
            let key_alg = format!("{:?}", key_alg);
            if key_alg != alg {
                return Err(VerificationError::InvalidKey(format!(
                    "key algorithm '{key_alg}' does not match token algorithm '{alg}'"
                )));
            }
        }
        let key =
            DecodingKey::from_jwk(jwk).map_err(|e| VerificationError::InvalidKey(e.to_string()))?;

        // jsonwebtoken checks every listed algorithm against the key family,
        // so only the header algorithm is listed here.
        let mut validation = Validation::new(header.alg);
        validation.leeway = constraints.leeway.as_secs();
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "iss"]);
        validation.set_issuer(constraints.issuers);

        let data = decode::<AccessTokenPayload>(token, &key, &validation)?;

        Ok(DecodedJws { header: raw_header, payload: data.claims })
    }
}

fn algorithm_name(alg: Algorithm) -> String {
    format!("{:?}", alg)
}

fn select_key<'a>(key_set: &'a JwkSet, kid: Option<&str>) -> Result<&'a Jwk, VerificationError> {
    match kid {
        Some(kid) => {
            key_set.find(kid).ok_or_else(|| VerificationError::KeyNotFound { kid: kid.to_owned() })
        },
        None => match key_set.keys.as_slice() {
            [key] => Ok(key),
            keys => Err(VerificationError::AmbiguousKey { count: keys.len() }),
        },
    }
}
