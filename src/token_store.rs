//! Client-side persistence of the bearer token issued at login.

use std::sync::{PoisonError, RwLock};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::entities::User;
use crate::error::Error;

/// Bearer token, its expiry and the user it was issued for.
///
/// Replaced wholesale on every login; never mutated in place.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCredentialToken {
    #[serde(default)]
    pub bearer_token: Option<String>,
    #[serde(default)]
    pub expiry_epoch_millis: Option<i64>,
    #[serde(default)]
    pub cached_user: Option<User>,
}

impl StoredCredentialToken {
    #[must_use]
    pub fn new(bearer_token: impl Into<String>, expiry_epoch_millis: i64) -> Self {
        Self {
            bearer_token: Some(bearer_token.into()),
            expiry_epoch_millis: Some(expiry_epoch_millis),
            cached_user: None,
        }
    }

    /// Builds the stored token from a login response, reading the expiry
    /// from the JWT's `exp` claim.
    ///
    /// # Errors
    ///
    /// Returns `Error::Token` if the JWT payload cannot be decoded or has no
    /// numeric `exp`.
    pub fn from_jwt(token: impl Into<String>, user: Option<User>) -> Result<Self, Error> {
        let token = token.into();
        let expiry = jwt_expiry_millis(&token)?;
        Ok(Self {
            bearer_token: Some(token),
            expiry_epoch_millis: Some(expiry),
            cached_user: user,
        })
    }

    #[must_use]
    pub fn with_cached_user(mut self, user: User) -> Self {
        self.cached_user = Some(user);
        self
    }

    /// A token is expired when it is missing, has no expiry, or its expiry
    /// is at or before `now_millis`.
    #[must_use]
    pub fn is_expired_at(&self, now_millis: i64) -> bool {
        let has_token = self.bearer_token.as_deref().is_some_and(|t| !t.is_empty());
        match self.expiry_epoch_millis {
            Some(expiry) if has_token && expiry > 0 => now_millis >= expiry,
            _ => true,
        }
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_millis())
    }
}

/// Expiry check over an optional stored token; a missing token is expired.
#[must_use]
pub fn user_token_is_expired(token: Option<&StoredCredentialToken>, now_millis: i64) -> bool {
    token.is_none_or(|t| t.is_expired_at(now_millis))
}

/// Current time in epoch milliseconds.
#[must_use]
pub fn now_millis() -> i64 {
    (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// Reads `exp` (seconds) from a JWT payload without verifying the signature
/// and returns it in epoch milliseconds.
///
/// Only for client-side bookkeeping; the server verifies tokens separately.
pub(crate) fn jwt_expiry_millis(token: &str) -> Result<i64, Error> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(Error::Token("invalid token format".into()));
    }

    let payload = URL_SAFE_NO_PAD
        .decode(parts[1].trim_end_matches('='))
        .map_err(|_| Error::Token("invalid payload".into()))?;
    let payload: JsonValue =
        serde_json::from_slice(&payload).map_err(|_| Error::Token("invalid payload".into()))?;

    payload
        .get("exp")
        .and_then(JsonValue::as_i64)
        .map(|exp| exp.saturating_mul(1000))
        .ok_or_else(|| Error::Token("missing claim: exp".into()))
}

/// Where the client keeps its credential between requests.
pub trait TokenStore: Send + Sync + 'static {
    fn load(&self) -> Option<StoredCredentialToken>;

    fn store(&self, token: StoredCredentialToken);

    fn clear(&self);

    /// Clears the store only if it still holds `expected`, atomically.
    /// Returns whether it was cleared.
    fn clear_if(&self, expected: &StoredCredentialToken) -> bool;

    /// Bearer token if one is stored and unexpired. An expired token is
    /// cleared, unless another one was stored in the meantime.
    fn valid_bearer(&self, now_millis: i64) -> Option<String> {
        let token = self.load()?;
        if token.is_expired_at(now_millis) {
            self.clear_if(&token);
            return None;
        }
        token.bearer_token
    }
}

/// Process-local token store.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    inner: RwLock<Option<StoredCredentialToken>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_token(token: StoredCredentialToken) -> Self {
        Self {
            inner: RwLock::new(Some(token)),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<StoredCredentialToken> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn store(&self, token: StoredCredentialToken) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    fn clear(&self) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn clear_if(&self, expected: &StoredCredentialToken) -> bool {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if guard.as_ref() == Some(expected) {
            *guard = None;
            true
        } else {
            false
        }
    }
}
