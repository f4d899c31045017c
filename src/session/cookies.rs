use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

use super::config::CookieOptions;

/// Create session cookie.
pub(super) fn session_cookie(options: &CookieOptions, value: String) -> Cookie<'static> {
    Cookie::build((options.name.clone(), value))
        .http_only(true)
        .secure(options.secure)
        .same_site(SameSite::Lax)
        .path("/".to_string())
        .max_age(Duration::days(options.ttl_days))
        .build()
}

/// Create removal cookie for session.
pub(super) fn clear_session_cookie(options: &CookieOptions) -> Cookie<'static> {
    Cookie::build((options.name.clone(), ""))
        .path("/".to_string())
        .max_age(Duration::ZERO)
        .build()
}
