//! Verification options.
//!
//! [`VerificationOptions`] holds the policy knobs of the verification
//! pipeline. It can be built in code or deserialized from a service's
//! configuration file.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use solid_authn::VerificationOptions;
//!
//! let options = VerificationOptions::builder()
//!     .secure_uri_schemes(vec!["https".to_string()])
//!     .leeway(Duration::from_secs(30))
//!     .build();
//! options.validate()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    error::AuthError,
    uri::DEFAULT_SECURE_SCHEMES,
    validation::{ACCEPTED_ALGORITHMS, validate_algorithm},
};

/// Default clock skew tolerance for `exp` and `nbf` (60 seconds).
pub const DEFAULT_LEEWAY: Duration = Duration::from_secs(60);

/// Default upper bound on the raw token length (16 KiB).
pub const DEFAULT_MAX_TOKEN_LENGTH: usize = 16 * 1024;

/// Policy applied by [`verify_solid_access_token_with_options`].
///
/// [`verify_solid_access_token_with_options`]: crate::verify_solid_access_token_with_options
#[derive(Debug, Clone, PartialEq, bon::Builder, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerificationOptions {
    /// URI schemes accepted for `iss`, `webid` and `aud` claims.
    #[serde(default = "default_secure_uri_schemes")]
    #[builder(default = default_secure_uri_schemes())]
    pub secure_uri_schemes: Vec<String>,

    /// Clock skew tolerance passed to the signature verifier.
    #[serde(with = "humantime_serde", default = "default_leeway")]
    #[builder(default = DEFAULT_LEEWAY)]
    pub leeway: Duration,

    /// Tokens longer than this are rejected before decoding.
    #[serde(default = "default_max_token_length")]
    #[builder(default = DEFAULT_MAX_TOKEN_LENGTH)]
    pub max_token_length: usize,

    /// Signature algorithms the verifier may accept.
    #[serde(default = "default_algorithms")]
    #[builder(default = default_algorithms())]
    pub algorithms: Vec<String>,
}

fn default_secure_uri_schemes() -> Vec<String> {
    DEFAULT_SECURE_SCHEMES.iter().map(|s| (*s).to_string()).collect()
}

fn default_leeway() -> Duration {
    DEFAULT_LEEWAY
}

fn default_max_token_length() -> usize {
    DEFAULT_MAX_TOKEN_LENGTH
}

fn default_algorithms() -> Vec<String> {
    ACCEPTED_ALGORITHMS.iter().map(|s| (*s).to_string()).collect()
}

impl Default for VerificationOptions {
    fn default() -> Self {
        Self {
            secure_uri_schemes: default_secure_uri_schemes(),
            leeway: DEFAULT_LEEWAY,
            max_token_length: DEFAULT_MAX_TOKEN_LENGTH,
            algorithms: default_algorithms(),
        }
    }
}

impl VerificationOptions {
    /// Check that the options describe a usable policy.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidConfiguration`] if no scheme or no
    /// algorithm is allowed or the token length limit is zero, and
    /// [`AuthError::UnsupportedAlgorithm`] if a forbidden algorithm is listed.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.secure_uri_schemes.is_empty() {
            return Err(AuthError::invalid_configuration("secure_uri_schemes cannot be empty"));
        }
        if self.algorithms.is_empty() {
            return Err(AuthError::invalid_configuration("algorithms cannot be empty"));
        }
        if self.max_token_length == 0 {
            return Err(AuthError::invalid_configuration("max_token_length must be positive"));
        }
        for alg in &self.algorithms {
            validate_algorithm(alg, ACCEPTED_ALGORITHMS)?;
        }
        Ok(())
    }
}
