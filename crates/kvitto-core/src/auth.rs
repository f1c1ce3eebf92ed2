//! Bearer-token verification
//!
//! Tokens are issued by the external auth provider and signed HS256 with a
//! shared secret. Verification extracts the `sub` claim; no user record is
//! consulted beyond that.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

const BEARER_PREFIX: &str = "Bearer ";

#[derive(Debug, Deserialize)]
struct Claims {
    #[serde(default)]
    sub: Option<String>,
}

/// Verify an `Authorization` header value and return the subject id.
///
/// The header must carry a `Bearer ` prefix. A missing or empty `secret` is
/// an operator error and fails as `Misconfigured`, never as a caller error.
pub fn verify_bearer(header: Option<&str>, secret: Option<&str>) -> Result<String> {
    let token = header
        .and_then(|h| h.strip_prefix(BEARER_PREFIX))
        .ok_or(Error::MissingCredential)?;

    let secret = match secret {
        Some(s) if !s.is_empty() => s,
        _ => return Err(Error::Misconfigured("token-verification secret not set")),
    };

    let mut validation = Validation::new(Algorithm::HS256);
    // Tokens carry a provider-specific audience; the subject is all we need.
    validation.validate_aud = false;

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        debug!(error = %e, "bearer token rejected");
        Error::InvalidCredential
    })?;

    match data.claims.sub {
        Some(sub) if !sub.is_empty() => Ok(sub),
        _ => Err(Error::InvalidCredential),
    }
}
