//! Fuzz target for access token decoding.
//!
//! Feeds arbitrary byte strings as access tokens to the decoding and claim
//! policy functions. Every result must be either `Ok(...)` or
//! `Err(AuthError)`; no input may panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use solid_authn::{
    compute_access_token_hash,
    token::SignedToken,
    uri::{DEFAULT_SECURE_SCHEMES, verify_secure_uri_claims},
    validate_algorithm, verify_access_token_hash, ACCEPTED_ALGORITHMS,
};

fuzz_target!(|data: &[u8]| {
    // Access tokens are always UTF-8 strings
    let Ok(token) = std::str::from_utf8(data) else {
        return;
    };

    let schemes: Vec<String> = DEFAULT_SECURE_SCHEMES.iter().map(|s| s.to_string()).collect();

    if let Ok(decoded) = SignedToken::decode(token) {
        let _ = validate_algorithm(&decoded.header.alg, ACCEPTED_ALGORITHMS);
        let _ = verify_secure_uri_claims(&decoded.payload, &schemes);
        let _ = decoded.payload.claims().subject();
    }

    // The hash of a token always verifies against itself
    let ath = compute_access_token_hash(token);
    assert!(verify_access_token_hash(token, &ath).is_ok());
});
