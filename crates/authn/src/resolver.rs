//! Injected lookups used during verification.
//!
//! The verification pipeline never performs network or key-store access
//! itself. Instead it asks two collaborators:
//!
//! - a [`TrustedIssuerResolver`], mapping the token subject (normally its
//!   WebID) to the issuers trusted to speak for it;
//! - a [`KeySetResolver`], mapping an issuer to the key set its tokens are
//!   verified against.
//!
//! Both traits are implemented for async closures, so simple callers can
//! pass a closure instead of a dedicated type:
//!
//! ```no_run
//! use solid_authn::{ResolverError, TrustedIssuerResolver};
//!
//! # async fn example() -> Result<(), ResolverError> {
//! let issuers = |_webid: &str| async {
//!     Ok::<_, ResolverError>(vec!["https://idp.example.com".to_string()])
//! };
//! let trusted = issuers.trusted_issuers("https://alice.example.com/profile#me").await?;
//! assert_eq!(trusted, vec!["https://idp.example.com"]);
//! # Ok(())
//! # }
//! ```

use std::future::Future;

use async_trait::async_trait;

use crate::error::ResolverError;

/// Resolves the issuers trusted for a subject.
///
/// An empty list means no issuer is trusted, which makes verification fail.
#[async_trait]
pub trait TrustedIssuerResolver: Send + Sync {
    /// Returns the trusted issuer URIs for `subject`, in preference order.
    ///
    /// # Errors
    ///
    /// Any error is propagated unchanged to the caller of the verification.
    async fn trusted_issuers(&self, subject: &str) -> Result<Vec<String>, ResolverError>;
}

/// Resolves the key set used to verify tokens from an issuer.
#[async_trait]
pub trait KeySetResolver: Send + Sync {
    /// Key set handed to the signature verifier, opaque to the pipeline.
    type KeySet: Send + Sync;

    /// Returns the key set for `issuer`.
    ///
    /// # Errors
    ///
    /// Any error is propagated unchanged to the caller of the verification.
    async fn key_set(&self, issuer: &str) -> Result<Self::KeySet, ResolverError>;
}

#[async_trait]
impl<F, Fut> TrustedIssuerResolver for F
where
    F: Fn(&str) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<String>, ResolverError>> + Send + 'static,
{
    async fn trusted_issuers(&self, subject: &str) -> Result<Vec<String>, ResolverError> {
        self(subject).await
    }
}

#[async_trait]
impl<F, Fut, K> KeySetResolver for F
where
    F: Fn(&str) -> Fut + Send + Sync,
    Fut: Future<Output = Result<K, ResolverError>> + Send + 'static,
    K: Send + Sync + 'static,
{
    type KeySet = K;

    async fn key_set(&self, issuer: &str) -> Result<K, ResolverError> {
        self(issuer).await
    }
}

/// A fixed issuer list trusted for every subject.
///
/// Suitable for deployments that accept tokens from a known set of identity
/// providers regardless of what the WebID profile says.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StaticTrustedIssuers {
    issuers: Vec<String>,
}

impl StaticTrustedIssuers {
    /// Trust exactly `issuers`.
    pub fn new<I, S>(issuers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { issuers: issuers.into_iter().map(Into::into).collect() }
    }

    /// The trusted issuers.
    #[must_use]
    pub fn issuers(&self) -> &[String] {
        &self.issuers
    }
}

#[async_trait]
impl TrustedIssuerResolver for StaticTrustedIssuers {
    async fn trusted_issuers(&self, _subject: &str) -> Result<Vec<String>, ResolverError> {
        Ok(self.issuers.clone())
    }
}
