use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::PrivateCookieJar;

use super::codec::Session;
use super::error::PortalError;
use super::state::PortalState;

/// Reads the session cookie. Never rejects: without a cookie the session
/// is empty.
///
/// ```rust,ignore
/// async fn profile(session: Session) -> impl IntoResponse {
///     match &session.user {
///         Some(user) => user.display_name(),
///         None => "guest".to_string(),
///     }
/// }
/// ```
impl FromRequestParts<PortalState> for Session {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &PortalState,
    ) -> Result<Self, Self::Rejection> {
        let jar = PrivateCookieJar::from_request_parts(parts, state).await?;
        Ok(Session::read(jar, state.settings.cookie.clone()))
    }
}

/// Session of a logged-in user, with the JWT to forward to the backend.
///
/// Rejects with `401 Unauthorized` otherwise.
pub struct LoggedIn {
    pub session: Session,
    pub jwt: String,
}

impl FromRequestParts<PortalState> for LoggedIn {
    type Rejection = PortalError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &PortalState,
    ) -> Result<Self, Self::Rejection> {
        let session = match Session::from_request_parts(parts, state).await {
            Ok(session) => session,
            Err(never) => match never {},
        };

        if !session.is_logged_in() {
            return Err(PortalError::Unauthorized);
        }

        let jwt = session.jwt.clone().ok_or(PortalError::Unauthorized)?;
        Ok(Self { session, jwt })
    }
}
