//! Secure URI claim policy.
//!
//! Some claims of a Solid access token identify parties by URI: the issuer,
//! the WebID and every audience member. Each of them must be an absolute URI
//! with a host and a scheme from an allow-list (by default only `https`).

use url::Url;

use crate::{error::AuthError, token::AccessTokenPayload};

/// Schemes accepted by default for secure URI claims.
pub const DEFAULT_SECURE_SCHEMES: &[&str] = &["https"];

/// Check one claim value against the secure URI policy.
///
/// # Errors
///
/// Returns [`AuthError::SecureUriClaim`] naming `claim` and `value` if the
/// value is not an absolute URI, has no host, or uses a scheme outside
/// `schemes`.
///
/// # Examples
///
/// ```
/// use solid_authn::uri::verify_secure_uri_claim;
///
/// let schemes = ["https".to_string()];
/// assert!(verify_secure_uri_claim("iss", "https://idp.example.com", &schemes).is_ok());
/// assert!(verify_secure_uri_claim("iss", "http://idp.example.com", &schemes).is_err());
/// assert!(verify_secure_uri_claim("iss", "/relative", &schemes).is_err());
/// ```
pub fn verify_secure_uri_claim(
    claim: &str,
    value: &str,
    schemes: &[String],
) -> Result<(), AuthError> {
    let secure = Url::parse(value)
        .map(|url| {
            schemes.iter().any(|scheme| scheme.eq_ignore_ascii_case(url.scheme()))
                && url.host_str().is_some_and(|host| !host.is_empty())
        })
        .unwrap_or(false);

    if secure { Ok(()) } else { Err(AuthError::secure_uri_claim(claim, value)) }
}

/// Apply the secure URI policy to every URI-valued claim of a payload.
///
/// Checks `iss`, `webid` when present, and every `aud` member. A present but
/// empty audience list is rejected; an absent `aud` is accepted.
///
/// # Errors
///
/// Returns [`AuthError::SecureUriClaim`] for the first offending claim, or
/// [`AuthError::EmptyAudience`].
pub fn verify_secure_uri_claims(
    payload: &AccessTokenPayload,
    schemes: &[String],
) -> Result<(), AuthError> {
    let claims = payload.claims();

    verify_secure_uri_claim("iss", &claims.iss, schemes)?;

    if let Some(webid) = &claims.webid {
        verify_secure_uri_claim("webid", webid, schemes)?;
    }

    if let Some(aud) = &claims.aud {
        if aud.is_empty() {
            return Err(AuthError::EmptyAudience);
        }
        for member in aud.iter() {
            verify_secure_uri_claim("aud", member, schemes)?;
        }
    }

    Ok(())
}
