//! Structured fuzz target for access token claim decoding and policy.
//!
//! Uses the `arbitrary` crate to generate structured token inputs,
//! assembles base64-encoded tokens from them, and feeds them through
//! decoding and the secure URI policy. This reaches deeper code paths than
//! raw byte fuzzing because the inputs are plausible access tokens.

#![no_main]

use arbitrary::Arbitrary;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use libfuzzer_sys::fuzz_target;
use serde_json::{Map, Value, json};
use solid_authn::{token::SignedToken, uri::verify_secure_uri_claims};

/// Structured input representing a fuzzed access token.
#[derive(Debug, Arbitrary)]
struct FuzzedToken {
    alg: FuzzedAlg,
    kid: Option<String>,
    iss: FuzzedUri,
    webid: Option<FuzzedUri>,
    sub: Option<String>,
    aud: FuzzedAudience,
    exp: u64,
    /// `Some(jkt)` adds a `cnf` claim with that thumbprint
    jkt: Option<String>,
    /// Include a `cnf` claim without `jkt` (a Bearer token)
    bare_cnf: bool,
    signature_bytes: Vec<u8>,
    /// Schemes allowed by the claim policy
    allow_http: bool,
}

/// Fuzzed algorithm values covering known attack vectors.
#[derive(Debug, Arbitrary)]
enum FuzzedAlg {
    ES256,
    EdDSA,
    None,
    HS256,
    Other(String),
}

impl FuzzedAlg {
    fn as_str(&self) -> &str {
        match self {
            Self::ES256 => "ES256",
            Self::EdDSA => "EdDSA",
            Self::None => "none",
            Self::HS256 => "HS256",
            Self::Other(s) => s,
        }
    }
}

/// URI-ish claim values: secure, insecure, relative, or arbitrary.
#[derive(Debug, Arbitrary)]
enum FuzzedUri {
    Https(String),
    Http(String),
    Path(String),
    Raw(String),
}

impl FuzzedUri {
    fn render(&self) -> String {
        match self {
            Self::Https(rest) => format!("https://{rest}"),
            Self::Http(rest) => format!("http://{rest}"),
            Self::Path(rest) => format!("/{rest}"),
            Self::Raw(raw) => raw.clone(),
        }
    }
}

#[derive(Debug, Arbitrary)]
enum FuzzedAudience {
    Absent,
    Single(FuzzedUri),
    Multiple(Vec<FuzzedUri>),
}

fn build_token(input: &FuzzedToken) -> String {
    let mut header = Map::new();
    header.insert("alg".into(), Value::String(input.alg.as_str().to_string()));
    if let Some(kid) = &input.kid {
        header.insert("kid".into(), Value::String(kid.clone()));
    }

    let mut payload = Map::new();
    payload.insert("iss".into(), Value::String(input.iss.render()));
    payload.insert("exp".into(), json!(input.exp));
    if let Some(webid) = &input.webid {
        payload.insert("webid".into(), Value::String(webid.render()));
    }
    if let Some(sub) = &input.sub {
        payload.insert("sub".into(), Value::String(sub.clone()));
    }
    match &input.aud {
        FuzzedAudience::Absent => {},
        FuzzedAudience::Single(aud) => {
            payload.insert("aud".into(), Value::String(aud.render()));
        },
        FuzzedAudience::Multiple(auds) => {
            let auds = auds.iter().map(|aud| Value::String(aud.render())).collect();
            payload.insert("aud".into(), Value::Array(auds));
        },
    }
    if let Some(jkt) = &input.jkt {
        payload.insert("cnf".into(), json!({ "jkt": jkt }));
    } else if input.bare_cnf {
        payload.insert("cnf".into(), json!({}));
    }

    let header_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header).unwrap_or_default());
    let payload_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&payload).unwrap_or_default());
    let sig_b64 = URL_SAFE_NO_PAD.encode(&input.signature_bytes);

    format!("{header_b64}.{payload_b64}.{sig_b64}")
}

fuzz_target!(|input: FuzzedToken| {
    let token = build_token(&input);

    let mut schemes = vec!["https".to_string()];
    if input.allow_http {
        schemes.push("http".to_string());
    }

    if let Ok(decoded) = SignedToken::decode(&token) {
        // Only a non-empty thumbprint binds the token
        let bound = input.jkt.as_deref().is_some_and(|jkt| !jkt.is_empty());
        assert_eq!(decoded.payload.is_dpop_bound(), bound);
        let _ = verify_secure_uri_claims(&decoded.payload, &schemes);
    }
});
