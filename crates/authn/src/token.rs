//! Access token structure and decoding.
//!
//! A Solid access token is a compact JWS: three dot-separated base64url
//! segments holding the header, the claims payload and the signature. This
//! module decodes the first two into typed structures without verifying the
//! signature. The payload is classified once, at decode time, as either a
//! Bearer token or a DPoP-bound token.
//!
//! # Example
//!
//! ```no_run
//! use solid_authn::token::SignedToken;
//!
//! # fn example(raw: &str) -> Result<(), Box<dyn std::error::Error>> {
//! let token = SignedToken::decode(raw)?;
//!
//! println!("Algorithm: {}", token.header.alg);
//! println!("Issuer: {}", token.payload.issuer());
//! println!("DPoP bound: {}", token.payload.is_dpop_bound());
//! # Ok(())
//! # }
//! ```

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize, Serializer, de::DeserializeOwned};
use serde_json::{Map, Number, Value};

use crate::error::AuthError;

/// Protected header of an access token.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccessTokenHeader {
    /// Signature algorithm (e.g. `ES256`).
    pub alg: String,
    /// Media type of the token (e.g. `at+jwt`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
    /// Key ID used to select the verification key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    /// Any other header members.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Audience claim, either a single value or an ordered list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    /// `"aud": "https://example.com"`
    Single(String),
    /// `"aud": ["https://a.example", "https://b.example"]`
    Multiple(Vec<String>),
}

impl Audience {
    /// Iterates over every audience member in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let members: &[String] = match self {
            Self::Single(aud) => std::slice::from_ref(aud),
            Self::Multiple(auds) => auds,
        };
        members.iter().map(String::as_str)
    }

    /// Whether the audience lists no member at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Multiple(auds) if auds.is_empty())
    }
}

/// Claims common to Bearer and DPoP-bound access tokens.
///
/// Only the claims the verification policy reads are typed. Every other
/// claim (`scope`, `azp`, `jti`, ...) is kept verbatim in `extra`, whatever
/// its JSON shape.
///
/// ```json
/// {
///   "iss": "https://idp.example.com",
///   "aud": ["https://pod.example.com"],
///   "webid": "https://alice.example.com/profile#me",
///   "sub": "alice",
///   "client_id": "https://app.example.com/id",
///   "exp": 1234567890,
///   "iat": 1234567800
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SolidClaims {
    /// Issuer of the token.
    pub iss: String,
    /// Intended audience.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<Audience>,
    /// WebID of the agent the token was issued for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webid: Option<String>,
    /// Subject identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Client the token was issued to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// Expiration time (NumericDate, possibly fractional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<Number>,
    /// Issued at (NumericDate, possibly fractional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<Number>,
    /// Any other claims, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SolidClaims {
    /// Subject the trusted issuers are resolved for.
    ///
    /// Prefers the `webid` claim, then `sub`, then `client_id`. Empty values
    /// are skipped.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        [&self.webid, &self.sub, &self.client_id]
            .into_iter()
            .filter_map(|claim| claim.as_deref())
            .find(|claim| !claim.is_empty())
    }
}

/// Confirmation claim binding a token to a DPoP key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Confirmation {
    /// JWK SHA-256 thumbprint of the bound key.
    pub jkt: String,
    /// Any other confirmation members.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Claims of a DPoP-bound access token.
#[derive(Clone, Debug, PartialEq)]
pub struct DPoPBoundClaims {
    /// Claims shared with Bearer tokens.
    pub claims: SolidClaims,
    /// Key binding.
    pub cnf: Confirmation,
}

/// Access token type, as inferred from the payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenType {
    /// Plain bearer token.
    Bearer,
    /// Token bound to a DPoP key through `cnf.jkt`.
    DPoP,
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bearer => f.write_str("Bearer"),
            Self::DPoP => f.write_str("DPoP"),
        }
    }
}

/// Access token payload, classified by its `cnf` claim.
///
/// A `cnf` carrying a non-empty `jkt` thumbprint marks the token DPoP-bound.
/// Any other `cnf` (an mTLS `x5t#S256` binding, for instance) leaves the
/// token Bearer, with the claim kept in [`SolidClaims::extra`].
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(from = "PayloadRepr")]
pub enum AccessTokenPayload {
    /// No DPoP key binding.
    Bearer(SolidClaims),
    /// Confirmation claim with a JWK thumbprint.
    DPoPBound(DPoPBoundClaims),
}

impl AccessTokenPayload {
    /// Claims shared by both token types.
    #[must_use]
    pub fn claims(&self) -> &SolidClaims {
        match self {
            Self::Bearer(claims) => claims,
            Self::DPoPBound(bound) => &bound.claims,
        }
    }

    /// Issuer of the token.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.claims().iss
    }

    /// Token type.
    #[must_use]
    pub fn token_type(&self) -> TokenType {
        match self {
            Self::Bearer(_) => TokenType::Bearer,
            Self::DPoPBound(_) => TokenType::DPoP,
        }
    }

    /// Whether the token is bound to a DPoP key.
    #[must_use]
    pub fn is_dpop_bound(&self) -> bool {
        matches!(self, Self::DPoPBound(_))
    }

    /// Key binding, if any.
    #[must_use]
    pub fn confirmation(&self) -> Option<&Confirmation> {
        match self {
            Self::Bearer(_) => None,
            Self::DPoPBound(bound) => Some(&bound.cnf),
        }
    }
}

/// Wire shape of the payload: shared claims plus an optional `cnf`.
#[derive(Deserialize)]
struct PayloadRepr {
    #[serde(default)]
    cnf: Option<Value>,
    #[serde(flatten)]
    claims: SolidClaims,
}

#[derive(Serialize)]
struct PayloadRef<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    cnf: Option<&'a Confirmation>,
    #[serde(flatten)]
    claims: &'a SolidClaims,
}

impl From<PayloadRepr> for AccessTokenPayload {
    fn from(repr: PayloadRepr) -> Self {
        let PayloadRepr { cnf, mut claims } = repr;
        let Some(cnf) = cnf else {
            return Self::Bearer(claims);
        };

        match serde_json::from_value::<Confirmation>(cnf.clone()) {
            Ok(confirmation) if !confirmation.jkt.is_empty() => {
                Self::DPoPBound(DPoPBoundClaims { claims, cnf: confirmation })
            },
            _ => {
                claims.extra.insert("cnf".to_owned(), cnf);
                Self::Bearer(claims)
            },
        }
    }
}

impl Serialize for AccessTokenPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let repr = match self {
            Self::Bearer(claims) => PayloadRef { cnf: None, claims },
            Self::DPoPBound(bound) => PayloadRef { cnf: Some(&bound.cnf), claims: &bound.claims },
        };
        repr.serialize(serializer)
    }
}

/// A decoded, not yet verified, access token.
#[derive(Clone, Debug, PartialEq)]
pub struct SignedToken {
    /// Protected header.
    pub header: AccessTokenHeader,
    /// Classified claims.
    pub payload: AccessTokenPayload,
    /// Signature segment, still base64url encoded.
    pub signature: String,
}

impl SignedToken {
    /// Decode a compact token without verifying its signature.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MalformedToken`] if:
    /// - The token does not have exactly 3 parts
    /// - The header or payload is not valid base64url or JSON
    /// - The header has an empty `alg` or the payload an empty `iss`
    /// - A typed claim (`iss`, `aud`, `webid`, `sub`, `client_id`, `exp`,
    ///   `iat`) has the wrong JSON type
    pub fn decode(token: &str) -> Result<Self, AuthError> {
        let parts: Vec<&str> = token.split('.').collect();
        let [header_b64, payload_b64, signature] = parts.as_slice() else {
            return Err(AuthError::malformed_token("token must have 3 parts separated by dots"));
        };

        let header: AccessTokenHeader = decode_segment(header_b64, "header")?;
        if header.alg.is_empty() {
            return Err(AuthError::malformed_token("header has an empty 'alg'"));
        }

        let payload: AccessTokenPayload = decode_segment(payload_b64, "payload")?;
        if payload.issuer().is_empty() {
            return Err(AuthError::malformed_token("payload has an empty 'iss'"));
        }

        Ok(Self { header, payload, signature: (*signature).to_owned() })
    }
}

fn decode_segment<T: DeserializeOwned>(segment: &str, name: &str) -> Result<T, AuthError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| AuthError::malformed_token(format!("failed to decode {name}: {e}")))?;

    serde_json::from_slice(&bytes)
        .map_err(|e| AuthError::malformed_token(format!("failed to parse {name}: {e}")))
}
