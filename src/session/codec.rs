//! Encrypted session cookie: what it holds and how it is read and written.

use std::ops::{Deref, DerefMut};

use axum_extra::extract::PrivateCookieJar;
use serde::{Deserialize, Serialize};

use super::config::CookieOptions;
use super::cookies;
use super::error::PortalError;
use crate::entities::{Role, User};
use crate::types::EntityId;

/// Claims mirrored from the access token at login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSession {
    pub id: EntityId,
    pub role: Role,
    pub is_logged_in: bool,
}

/// Registration awaiting email confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingEmailValidation {
    pub email: String,
}

/// Contents of the session cookie.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<UserSession>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validate_email: Option<PendingEmailValidation>,
}

impl SessionData {
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.data.as_ref().is_some_and(|d| d.is_logged_in)
    }
}

/// Serialized cookie payload: the session plus its absolute expiry, so that
/// a replayed cookie stops working after the TTL even if the browser kept it.
#[derive(Serialize, Deserialize)]
struct Sealed {
    exp: i64,
    session: SessionData,
}

/// Session read from the request, with the jar it came from.
///
/// Mutate through `Deref`/`DerefMut`, then hand the jar returned by
/// [`save`](Session::save) or [`destroy`](Session::destroy) back in the
/// response.
pub struct Session {
    jar: PrivateCookieJar,
    options: CookieOptions,
    data: SessionData,
}

impl Session {
    /// Decrypts the session cookie. A missing, undecryptable, malformed or
    /// expired cookie reads as an empty session.
    pub(crate) fn read(jar: PrivateCookieJar, options: CookieOptions) -> Self {
        let data = jar
            .get(&options.name)
            .and_then(|cookie| match serde_json::from_str::<Sealed>(cookie.value()) {
                Ok(sealed) if sealed.exp > now_secs() => Some(sealed.session),
                Ok(_) => {
                    tracing::debug!("Session cookie past its TTL");
                    None
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Discarding malformed session cookie");
                    None
                }
            })
            .unwrap_or_default();

        Self { jar, options, data }
    }

    /// Encrypts the current contents into the jar.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::Session`] if the contents cannot be serialized.
    pub fn save(self) -> Result<PrivateCookieJar, PortalError> {
        let sealed = Sealed {
            exp: now_secs()
                .saturating_add(self.options.ttl_days.saturating_mul(24 * 60 * 60)),
            session: self.data,
        };
        let value =
            serde_json::to_string(&sealed).map_err(|e| PortalError::Session(e.to_string()))?;
        Ok(self.jar.add(cookies::session_cookie(&self.options, value)))
    }

    /// Clears the session cookie.
    #[must_use]
    pub fn destroy(self) -> PrivateCookieJar {
        self.jar.remove(cookies::clear_session_cookie(&self.options))
    }

    #[must_use]
    pub fn into_data(self) -> SessionData {
        self.data
    }
}

impl Deref for Session {
    type Target = SessionData;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

impl DerefMut for Session {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.data
    }
}

fn now_secs() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}
