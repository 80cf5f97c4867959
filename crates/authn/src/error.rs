//! Authentication error types.
//!
//! This module defines the errors that can occur while verifying a Solid
//! access token or the DPoP binding that accompanies it. Claim-policy
//! failures ([`AuthError`]) are kept apart from failures reported by the
//! signature verification primitive ([`VerificationError`]) so callers can
//! match on the kind of failure instead of its message.

use thiserror::Error;

/// Error type returned by the injected resolvers.
///
/// Resolver failures are propagated to the caller unchanged through
/// [`AuthError::Resolver`].
pub type ResolverError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Access token verification errors.
///
/// # Non-exhaustive
///
/// This enum is marked `#[non_exhaustive]`: new variants may be added in
/// future minor releases without a semver-breaking change. Downstream match
/// expressions must include a wildcard arm (`_ =>`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    /// The token could not be decoded into header, payload and signature.
    #[error("Malformed token: {message}")]
    MalformedToken {
        /// Description of the structural problem.
        message: String,
    },

    /// The signature verification primitive rejected the token.
    #[error("Token verification failed: {0}")]
    Verification(#[from] VerificationError),

    /// The token issuer is not trusted for the token subject.
    #[error("Incorrect issuer {issuer} for WebID {webid}")]
    IssuerMismatch {
        /// Issuer claimed by the token.
        issuer: String,
        /// Subject the trusted issuers were resolved for.
        webid: String,
    },

    /// A claim required to be an absolute secure URI is not one.
    #[error("Claim {claim} is not a secure URI: {value}")]
    SecureUriClaim {
        /// Name of the offending claim.
        claim: String,
        /// Value of the offending claim.
        value: String,
    },

    /// The audience claim is present but lists no audience.
    #[error("Audience claim is empty")]
    EmptyAudience,

    /// Required claim is missing.
    #[error("Missing claim: {claim}")]
    MissingClaim {
        /// Name of the missing claim.
        claim: String,
    },

    /// The DPoP proof `ath` claim does not match the access token.
    #[error("Access token hash mismatch: {claimed}")]
    AccessTokenHash {
        /// Hash value claimed by the DPoP proof.
        claimed: String,
    },

    /// The DPoP proof key does not match the token's `cnf.jkt` binding.
    #[error("Thumbprint mismatch (token_jkt={expected}, proof_jkt={actual})")]
    ThumbprintMismatch {
        /// Thumbprint bound into the access token.
        expected: String,
        /// Thumbprint of the key that signed the proof.
        actual: String,
    },

    /// A binding check was requested for a Bearer token.
    #[error("Token missing cnf.jkt claim")]
    MissingTokenBinding,

    /// Algorithm not in allowed list.
    #[error("Unsupported algorithm: {message}")]
    UnsupportedAlgorithm {
        /// Why the algorithm was refused.
        message: String,
    },

    /// Verification options are unusable.
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration {
        /// What is wrong with the configuration.
        message: String,
    },

    /// An injected resolver failed.
    #[error(transparent)]
    Resolver(ResolverError),
}

impl AuthError {
    /// Creates an [`AuthError::MalformedToken`].
    pub fn malformed_token(message: impl Into<String>) -> Self {
        Self::MalformedToken { message: message.into() }
    }

    /// Creates an [`AuthError::IssuerMismatch`].
    pub fn issuer_mismatch(issuer: impl Into<String>, webid: impl Into<String>) -> Self {
        Self::IssuerMismatch { issuer: issuer.into(), webid: webid.into() }
    }

    /// Creates an [`AuthError::SecureUriClaim`].
    pub fn secure_uri_claim(claim: impl Into<String>, value: impl Into<String>) -> Self {
        Self::SecureUriClaim { claim: claim.into(), value: value.into() }
    }

    /// Creates an [`AuthError::MissingClaim`].
    pub fn missing_claim(claim: impl Into<String>) -> Self {
        Self::MissingClaim { claim: claim.into() }
    }

    /// Creates an [`AuthError::UnsupportedAlgorithm`].
    pub fn unsupported_algorithm(message: impl Into<String>) -> Self {
        Self::UnsupportedAlgorithm { message: message.into() }
    }

    /// Creates an [`AuthError::InvalidConfiguration`].
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration { message: message.into() }
    }
}

/// Failures reported by a signature verification primitive.
///
/// These cover cryptographic and temporal checks. They are wrapped in
/// [`AuthError::Verification`] when surfaced by the verification pipeline.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum VerificationError {
    /// Signature verification failed.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Token has expired.
    #[error("Token expired")]
    TokenExpired,

    /// Token not yet valid (nbf claim in future).
    #[error("Token not yet valid")]
    TokenNotYetValid,

    /// Header algorithm is not accepted.
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// No key in the key set matches the token `kid`.
    #[error("Key not found: {kid}")]
    KeyNotFound {
        /// Key ID from the token header.
        kid: String,
    },

    /// The token has no `kid` and the key set does not hold exactly one key.
    #[error("Key ID required: key set contains {count} keys")]
    AmbiguousKey {
        /// Number of keys in the key set.
        count: usize,
    },

    /// The selected key cannot be used to verify the token.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// The token issuer is outside the issuers passed as a constraint.
    #[error("Issuer not allowed")]
    IssuerNotAllowed,

    /// A claim required by the primitive is absent.
    #[error("Missing claim: {0}")]
    MissingClaim(String),

    /// Any other primitive failure.
    #[error("{0}")]
    Other(String),
}

impl From<jsonwebtoken::errors::Error> for VerificationError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            ErrorKind::ExpiredSignature => Self::TokenExpired,
            ErrorKind::ImmatureSignature => Self::TokenNotYetValid,
            ErrorKind::InvalidIssuer => Self::IssuerNotAllowed,
            ErrorKind::MissingRequiredClaim(claim) => Self::MissingClaim(claim.clone()),
            ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidAlgorithmName
            | ErrorKind::MissingAlgorithm => {
                Self::UnsupportedAlgorithm("Algorithm not supported".into())
            },
            ErrorKind::InvalidEcdsaKey
            | ErrorKind::InvalidRsaKey(_)
            | ErrorKind::InvalidKeyFormat => Self::InvalidKey(err.to_string()),
            _ => Self::Other(format!("JWT error: {}", err)),
        }
    }
}

/// Result type alias for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;
