//! Redirects anonymous visitors away from protected pages.

use std::str::FromStr;

use axum::Router;
use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::PrivateCookieJar;

use super::codec::Session;
use super::state::PortalState;
use crate::error::Error;

/// Path matcher in the `/profile/:path*` style.
///
/// `/profile/:path*` (or `/profile/*`) matches `/profile` and everything
/// below it; a plain `/profile` matches only itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    prefix: String,
    subtree: bool,
}

impl PathPattern {
    #[must_use]
    pub fn exact(path: impl Into<String>) -> Self {
        Self {
            prefix: path.into(),
            subtree: false,
        }
    }

    #[must_use]
    pub fn subtree(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            subtree: true,
        }
    }

    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        match path.strip_prefix(self.prefix.as_str()) {
            Some("") => true,
            Some(rest) => self.subtree && rest.starts_with('/'),
            None => false,
        }
    }
}

impl FromStr for PathPattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !s.starts_with('/') {
            return Err(Error::Config(format!("path pattern must start with '/': {s}")));
        }

        let subtree_prefix = s
            .rsplit_once('/')
            .filter(|(_, last)| *last == "*" || (last.starts_with(':') && last.ends_with('*')))
            .map(|(prefix, _)| prefix);

        Ok(match subtree_prefix {
            Some(prefix) => Self::subtree(prefix.trim_end_matches('/')),
            None => match s.trim_end_matches('/') {
                "" => Self::exact("/"),
                trimmed => Self::exact(trimmed),
            },
        })
    }
}

/// Middleware: requests to a protected path without session data are
/// redirected to the login page; everything else passes through unchanged.
pub async fn require_session(
    State(state): State<PortalState>,
    jar: PrivateCookieJar,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path();
    let protected = state.settings.protected_paths.iter().any(|p| p.matches(path));
    if !protected {
        return next.run(request).await;
    }

    let session = Session::read(jar, state.settings.cookie.clone());
    if session.data.is_none() {
        tracing::debug!(path = %request.uri().path(), "Redirecting anonymous visitor to login");
        return Redirect::temporary(&state.settings.login_url()).into_response();
    }

    next.run(request).await
}

/// Wraps `router` with [`require_session`].
pub fn protect<S>(router: Router<S>, state: &PortalState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(state.clone(), require_session))
}
