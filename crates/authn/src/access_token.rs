//! Solid access token verification.
//!
//! [`verify_solid_access_token`] runs the whole pipeline:
//!
//! ```text
//! raw token → decode header, payload, signature
//!           → secure URI policy on iss, webid, aud
//!           → resolve trusted issuers (subject) ∥ resolve key set (issuer)
//!           → signature verifier (key set, issuer/algorithm constraints)
//!           → secure URI policy and issuer membership on the verified payload
//!           → VerifiedAccessToken
//! ```
//!
//! The secure URI policy runs before any resolver is called, so a token with
//! an insecure claim is rejected whatever its signature.

use crate::{
    config::VerificationOptions,
    error::{AuthError, VerificationError},
    resolver::{KeySetResolver, TrustedIssuerResolver},
    signature::{SignatureVerifier, VerificationConstraints},
    token::{AccessTokenHeader, AccessTokenPayload, SignedToken, TokenType},
    uri::verify_secure_uri_claims,
};

/// An access token that passed signature verification and issuer policy.
///
/// Only the verification functions of this crate construct it.
#[derive(Clone, Debug, PartialEq)]
pub struct VerifiedAccessToken {
    header: AccessTokenHeader,
    payload: AccessTokenPayload,
    signature: String,
}

impl VerifiedAccessToken {
    /// Protected header.
    #[must_use]
    pub fn header(&self) -> &AccessTokenHeader {
        &self.header
    }

    /// Verified claims.
    #[must_use]
    pub fn payload(&self) -> &AccessTokenPayload {
        &self.payload
    }

    /// Signature segment, base64url encoded.
    #[must_use]
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Bearer or DPoP-bound.
    #[must_use]
    pub fn token_type(&self) -> TokenType {
        self.payload.token_type()
    }

    /// Split into header, payload and signature.
    #[must_use]
    pub fn into_parts(self) -> (AccessTokenHeader, AccessTokenPayload, String) {
        (self.header, self.payload, self.signature)
    }
}

/// Verify a Solid access token with default [`VerificationOptions`].
///
/// # Errors
///
/// See [`verify_solid_access_token_with_options`].
///
/// # Example
///
/// ```no_run
/// use jsonwebtoken::jwk::JwkSet;
/// use solid_authn::{
///     JwksSignatureVerifier, ResolverError, StaticTrustedIssuers, verify_solid_access_token,
/// };
///
/// # async fn example(token: &str, jwks: JwkSet) -> Result<(), Box<dyn std::error::Error>> {
/// let issuers = StaticTrustedIssuers::new(["https://idp.example.com"]);
/// let key_sets = move |_issuer: &str| {
///     let jwks = jwks.clone();
///     async move { Ok::<_, ResolverError>(jwks) }
/// };
///
/// let verified =
///     verify_solid_access_token(token, &issuers, &key_sets, &JwksSignatureVerifier::new())
///         .await?;
/// println!("{} token from {}", verified.token_type(), verified.payload().issuer());
/// # Ok(())
/// # }
/// ```
pub async fn verify_solid_access_token<I, K, V>(
    token: &str,
    issuers: &I,
    key_sets: &K,
    verifier: &V,
) -> Result<VerifiedAccessToken, AuthError>
where
    I: TrustedIssuerResolver + ?Sized,
    K: KeySetResolver,
    V: SignatureVerifier<KeySet = K::KeySet>,
{
    verify_solid_access_token_with_options(
        token,
        issuers,
        key_sets,
        verifier,
        &VerificationOptions::default(),
    )
    .await
}

/// Verify a Solid access token.
///
/// 1. Decodes the token into header, payload and signature
/// 2. Applies the secure URI policy to `iss`, `webid` and `aud`
/// 3. Resolves the trusted issuers for the subject (`webid`, else `sub`, else `client_id`) and the
///    key set for the claimed issuer, concurrently
/// 4. Verifies the signature with the injected verifier, constrained to the trusted issuers
/// 5. Checks the verified issuer against the trusted issuers
///
/// # Errors
///
/// Returns an error if:
/// - `options` fail [`VerificationOptions::validate`]
/// - The token is malformed or longer than `options.max_token_length`
///   ([`AuthError::MalformedToken`])
/// - A URI-valued claim is not secure ([`AuthError::SecureUriClaim`],
///   [`AuthError::EmptyAudience`])
/// - The token has none of `webid`, `sub` and `client_id` ([`AuthError::MissingClaim`])
/// - A resolver fails ([`AuthError::Resolver`], unchanged)
/// - The verifier rejects the token ([`AuthError::Verification`])
/// - The issuer is not trusted for the subject ([`AuthError::IssuerMismatch`])
#[tracing::instrument(name = "verify_solid_access_token", skip_all)]
pub async fn verify_solid_access_token_with_options<I, K, V>(
    token: &str,
    issuers: &I,
    key_sets: &K,
    verifier: &V,
    options: &VerificationOptions,
) -> Result<VerifiedAccessToken, AuthError>
where
    I: TrustedIssuerResolver + ?Sized,
    K: KeySetResolver,
    V: SignatureVerifier<KeySet = K::KeySet>,
{
    options.validate()?;

    if token.len() > options.max_token_length {
        return Err(AuthError::malformed_token(format!(
            "token length {} exceeds maximum {}",
            token.len(),
            options.max_token_length
        )));
    }

    // 1. Decode without verification to learn the subject and issuer
    let decoded = SignedToken::decode(token)?;
    verify_secure_uri_claims(&decoded.payload, &options.secure_uri_schemes)?;

    let claims = decoded.payload.claims();
    let subject = claims.subject().ok_or_else(|| AuthError::missing_claim("webid"))?;
    let claimed_issuer = claims.iss.as_str();

    // 2. Both lookups are independent; both must finish before verification
    let (trusted, key_set) = tokio::try_join!(
        issuers.trusted_issuers(subject),
        key_sets.key_set(claimed_issuer),
    )
    .map_err(|e| {
        tracing::warn!(issuer = %claimed_issuer, subject = %subject, error = %e, "Resolver failed");
        AuthError::Resolver(e)
    })?;

    // 3. Signature, expiry and algorithm checks belong to the verifier
    let constraints = VerificationConstraints {
        issuers: &trusted,
        algorithms: &options.algorithms,
        leeway: options.leeway,
    };
    let verified = verifier.verify(token, &key_set, &constraints).map_err(|e| match e {
        VerificationError::IssuerNotAllowed => issuer_mismatch(claimed_issuer, subject),
        other => AuthError::Verification(other),
    })?;

    // 4. Claim policy again, on what the verifier vouched for
    verify_secure_uri_claims(&verified.payload, &options.secure_uri_schemes)?;
    let verified_issuer = verified.payload.issuer();
    if !trusted.iter().any(|issuer| issuer == verified_issuer) {
        return Err(issuer_mismatch(verified_issuer, subject));
    }

    tracing::debug!(
        issuer = %verified_issuer,
        subject = %subject,
        token_type = %verified.payload.token_type(),
        "Access token verified"
    );

    Ok(VerifiedAccessToken {
        header: verified.header,
        payload: verified.payload,
        signature: decoded.signature,
    })
}

fn issuer_mismatch(issuer: &str, subject: &str) -> AuthError {
    tracing::warn!(issuer = %issuer, subject = %subject, "Issuer not trusted for subject");
    AuthError::issuer_mismatch(issuer, subject)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use serde_json::json;

    use super::*;
    use crate::{
        error::ResolverError,
        resolver::StaticTrustedIssuers,
        testutil::{
            FailingVerifier, NoKeySet, UnverifiedDecoder, bearer_claims, craft_raw_token,
            dpop_bound_claims, es256_header,
        },
    };

    const ISSUER: &str = "https://example.com/issuer";
    const WEBID: &str = "https://example.com/webid";

    fn trusted() -> StaticTrustedIssuers {
        StaticTrustedIssuers::new(["https://example.com/abc", ISSUER])
    }

    #[tokio::test]
    async fn test_dpop_bound_token_verified() {
        let token = craft_raw_token(&es256_header(), &dpop_bound_claims());

        let verified =
            verify_solid_access_token(&token, &trusted(), &NoKeySet, &UnverifiedDecoder)
                .await
                .unwrap();

        assert_eq!(verified.token_type(), TokenType::DPoP);
        let decoded = SignedToken::decode(&token).unwrap();
        assert_eq!(verified.header(), &decoded.header);
        assert_eq!(verified.payload(), &decoded.payload);
        assert_eq!(verified.signature(), decoded.signature);
    }

    #[tokio::test]
    async fn test_audience_array_verified() {
        let mut claims = dpop_bound_claims();
        claims["aud"] = json!(["https://example.com/resource", "https://example.com/other"]);
        let token = craft_raw_token(&es256_header(), &claims);

        let verified =
            verify_solid_access_token(&token, &trusted(), &NoKeySet, &UnverifiedDecoder)
                .await
                .unwrap();
        assert_eq!(serde_json::to_value(verified.payload()).unwrap(), claims);
    }

    #[tokio::test]
    async fn test_bearer_token_verified() {
        let token = craft_raw_token(&es256_header(), &bearer_claims());

        let verified =
            verify_solid_access_token(&token, &trusted(), &NoKeySet, &UnverifiedDecoder)
                .await
                .unwrap();

        assert_eq!(verified.token_type(), TokenType::Bearer);
        let (header, payload, signature) = verified.into_parts();
        let decoded = SignedToken::decode(&token).unwrap();
        assert_eq!(header, decoded.header);
        assert_eq!(payload, decoded.payload);
        assert_eq!(signature, decoded.signature);
    }

    #[tokio::test]
    async fn test_insecure_claim_rejected_before_signature_check() {
        let mut claims = dpop_bound_claims();
        claims["webid"] = json!("http://example.com/webid");
        let token = craft_raw_token(&es256_header(), &claims);

        // The verifier would reject the signature; the claim policy wins first.
        let verifier = FailingVerifier(VerificationError::InvalidSignature);
        let result = verify_solid_access_token(&token, &trusted(), &NoKeySet, &verifier).await;

        assert!(matches!(
            result,
            Err(AuthError::SecureUriClaim { ref claim, ref value })
                if claim == "webid" && value == "http://example.com/webid"
        ));
    }

    #[tokio::test]
    async fn test_issuer_mismatch_rejected() {
        let token = craft_raw_token(&es256_header(), &dpop_bound_claims());
        let issuers = StaticTrustedIssuers::new(["https://example.com/not_the_issuer"]);

        let err = verify_solid_access_token(&token, &issuers, &NoKeySet, &UnverifiedDecoder)
            .await
            .unwrap_err();

        assert!(matches!(
            &err,
            AuthError::IssuerMismatch { issuer, webid } if issuer == ISSUER && webid == WEBID
        ));
        assert_eq!(
            err.to_string(),
            "Incorrect issuer https://example.com/issuer for WebID https://example.com/webid"
        );
    }

    #[tokio::test]
    async fn test_empty_trusted_issuers_rejected() {
        let token = craft_raw_token(&es256_header(), &bearer_claims());
        let issuers = StaticTrustedIssuers::default();

        let result =
            verify_solid_access_token(&token, &issuers, &NoKeySet, &UnverifiedDecoder).await;
        assert!(matches!(result, Err(AuthError::IssuerMismatch { .. })));
    }

    #[tokio::test]
    async fn test_verifier_issuer_rejection_reported_as_mismatch() {
        let token = craft_raw_token(&es256_header(), &bearer_claims());
        let verifier = FailingVerifier(VerificationError::IssuerNotAllowed);

        let result = verify_solid_access_token(&token, &trusted(), &NoKeySet, &verifier).await;
        assert!(matches!(
            result,
            Err(AuthError::IssuerMismatch { ref issuer, .. }) if issuer == ISSUER
        ));
    }

    #[tokio::test]
    async fn test_verifier_failure_passed_through() {
        let token = craft_raw_token(&es256_header(), &bearer_claims());
        let verifier = FailingVerifier(VerificationError::TokenExpired);

        let result = verify_solid_access_token(&token, &trusted(), &NoKeySet, &verifier).await;
        assert!(matches!(result, Err(AuthError::Verification(VerificationError::TokenExpired))));
    }

    #[tokio::test]
    async fn test_issuer_resolver_failure_propagated() {
        let token = craft_raw_token(&es256_header(), &bearer_claims());
        let issuers = |_webid: &str| async {
            Err::<Vec<String>, ResolverError>("profile unreachable".into())
        };

        let err = verify_solid_access_token(&token, &issuers, &NoKeySet, &UnverifiedDecoder)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Resolver(_)));
        assert_eq!(err.to_string(), "profile unreachable");
    }

    #[tokio::test]
    async fn test_key_set_resolver_failure_propagated() {
        let token = craft_raw_token(&es256_header(), &bearer_claims());
        let key_sets =
            |_issuer: &str| async { Err::<(), ResolverError>("jwks unreachable".into()) };

        let err = verify_solid_access_token(&token, &trusted(), &key_sets, &UnverifiedDecoder)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "jwks unreachable");
    }

    #[tokio::test]
    async fn test_resolvers_called_once_with_subject_and_issuer() {
        let token = craft_raw_token(&es256_header(), &bearer_claims());
        let calls = Arc::new(AtomicUsize::new(0));

        let issuer_calls = Arc::clone(&calls);
        let issuers = move |webid: &str| {
            assert_eq!(webid, WEBID);
            issuer_calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, ResolverError>(vec![ISSUER.to_string()]) }
        };
        let key_calls = Arc::clone(&calls);
        let key_sets = move |issuer: &str| {
            assert_eq!(issuer, ISSUER);
            key_calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, ResolverError>(()) }
        };

        verify_solid_access_token(&token, &issuers, &key_sets, &UnverifiedDecoder).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_sub_used_without_webid() {
        let mut claims = bearer_claims();
        claims.as_object_mut().unwrap().remove("webid");
        let token = craft_raw_token(&es256_header(), &claims);
        let issuers = StaticTrustedIssuers::new(["https://example.com/elsewhere"]);

        let err = verify_solid_access_token(&token, &issuers, &NoKeySet, &UnverifiedDecoder)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AuthError::IssuerMismatch { ref webid, .. } if webid == "https://example.com/subject"
        ));
    }

    #[tokio::test]
    async fn test_client_id_used_without_webid_or_sub() {
        let mut claims = bearer_claims();
        let object = claims.as_object_mut().unwrap();
        object.remove("webid");
        object.remove("sub");
        let token = craft_raw_token(&es256_header(), &claims);

        let issuers = |subject: &str| {
            assert_eq!(subject, "https://example.com/client");
            async { Ok::<_, ResolverError>(vec![ISSUER.to_string()]) }
        };

        let verified = verify_solid_access_token(&token, &issuers, &NoKeySet, &UnverifiedDecoder)
            .await
            .unwrap();
        assert_eq!(verified.payload().claims().subject(), Some("https://example.com/client"));
    }

    #[tokio::test]
    async fn test_untyped_claims_verified() {
        let mut claims = dpop_bound_claims();
        claims["scope"] = json!(["openid", "webid"]);
        claims["iat"] = json!(1_700_000_000.5);
        let token = craft_raw_token(&es256_header(), &claims);

        let verified =
            verify_solid_access_token(&token, &trusted(), &NoKeySet, &UnverifiedDecoder)
                .await
                .unwrap();
        let decoded = SignedToken::decode(&token).unwrap();
        assert_eq!(verified.payload(), &decoded.payload);
        assert_eq!(serde_json::to_value(verified.payload()).unwrap(), claims);
    }

    #[tokio::test]
    async fn test_missing_subject_rejected() {
        let mut claims = bearer_claims();
        let object = claims.as_object_mut().unwrap();
        object.remove("webid");
        object.remove("sub");
        object.remove("client_id");
        let token = craft_raw_token(&es256_header(), &claims);

        let result =
            verify_solid_access_token(&token, &trusted(), &NoKeySet, &UnverifiedDecoder).await;
        assert!(matches!(result, Err(AuthError::MissingClaim { ref claim }) if claim == "webid"));
    }

    #[tokio::test]
    async fn test_malformed_token_rejected() {
        let result =
            verify_solid_access_token("not-a-token", &trusted(), &NoKeySet, &UnverifiedDecoder)
                .await;
        assert!(matches!(result, Err(AuthError::MalformedToken { .. })));
    }

    #[tokio::test]
    async fn test_oversized_token_rejected() {
        let token = craft_raw_token(&es256_header(), &bearer_claims());
        let options = VerificationOptions::builder().max_token_length(16).build();

        let result = verify_solid_access_token_with_options(
            &token,
            &trusted(),
            &NoKeySet,
            &UnverifiedDecoder,
            &options,
        )
        .await;
        assert!(matches!(
            result,
            Err(AuthError::MalformedToken { ref message }) if message.contains("exceeds")
        ));
    }

    #[tokio::test]
    async fn test_scheme_allow_list_from_options() {
        let mut claims = bearer_claims();
        claims["aud"] = json!("http://localhost:3000/resource");
        let token = craft_raw_token(&es256_header(), &claims);

        let strict =
            verify_solid_access_token(&token, &trusted(), &NoKeySet, &UnverifiedDecoder).await;
        assert!(matches!(strict, Err(AuthError::SecureUriClaim { .. })));

        let options = VerificationOptions::builder()
            .secure_uri_schemes(vec!["https".to_string(), "http".to_string()])
            .build();
        let relaxed = verify_solid_access_token_with_options(
            &token,
            &trusted(),
            &NoKeySet,
            &UnverifiedDecoder,
            &options,
        )
        .await;
        assert!(relaxed.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_options_rejected() {
        let token = craft_raw_token(&es256_header(), &bearer_claims());
        let options = VerificationOptions::builder().algorithms(vec![]).build();

        let result = verify_solid_access_token_with_options(
            &token,
            &trusted(),
            &NoKeySet,
            &UnverifiedDecoder,
            &options,
        )
        .await;
        assert!(matches!(result, Err(AuthError::InvalidConfiguration { .. })));
    }
}
