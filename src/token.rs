use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::entities::Role;
use crate::error::Error;
use crate::types::EntityId;

/// Shared HS256 secret used by the backend to sign access tokens.
#[derive(Clone)]
pub struct JwtSecret {
    key: DecodingKey,
}

impl std::fmt::Debug for JwtSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("JwtSecret(..)")
    }
}

impl JwtSecret {
    /// Wraps the raw secret.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the secret is empty.
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, Error> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(Error::Config("JWT secret must not be empty".into()));
        }
        Ok(Self {
            key: DecodingKey::from_secret(secret),
        })
    }
}

/// Claims the portal reads from a backend access token.
///
/// The payload carries more fields; only these are mirrored into the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub id: EntityId,
    pub role: Role,
    #[serde(default)]
    pub iat: Option<i64>,
    pub exp: i64,
}

/// Verifies an HS256 access token issued by the backend.
///
/// Signature, algorithm and `exp` are checked, with no clock leeway.
/// Audience is not: backend tokens do not carry one.
///
/// # Errors
///
/// Returns `Error::Token` if the token is malformed, the signature does not
/// match, the token has expired, or the `id`/`role`/`exp` claims are missing.
pub fn verify_access_token(secret: &JwtSecret, token: &str) -> Result<AccessClaims, Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_aud = false;
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp"]);

    jsonwebtoken::decode::<AccessClaims>(token, &secret.key, &validation)
        .map(|data| data.claims)
        .map_err(|e| Error::Token(e.to_string()))
}
