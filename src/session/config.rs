use axum_extra::extract::cookie::Key;

use super::guard::PathPattern;
use crate::client::ApiConfig;
use crate::error::Error;
use crate::token::JwtSecret;

/// Minimum length of the cookie password, in bytes.
pub const MIN_COOKIE_PASSWORD_LEN: usize = 32;

/// Upper bound for the session lifetime, in days.
pub const MAX_SESSION_TTL_DAYS: i64 = 400;

/// Attributes of the session cookie.
#[derive(Debug, Clone)]
pub(crate) struct CookieOptions {
    pub(crate) name: String,
    pub(crate) ttl_days: i64,
    pub(crate) secure: bool,
}

/// Shared settings used by both config and runtime state.
#[derive(Clone)]
pub(crate) struct PortalSettings {
    pub(crate) cookie_key: Key,
    pub(crate) cookie: CookieOptions,
    pub(crate) auth_path: String,
    pub(crate) public_url: String,
    pub(crate) login_page: String,
    pub(crate) register_page: String,
    pub(crate) protected_paths: Vec<PathPattern>,
}

impl PortalSettings {
    fn defaults() -> Self {
        Self {
            cookie_key: Key::generate(),
            cookie: CookieOptions {
                name: "auth.session".into(),
                ttl_days: 7,
                secure: true,
            },
            auth_path: "/api/auth".into(),
            public_url: String::new(),
            login_page: "/auth/login".into(),
            register_page: "/auth/register".into(),
            protected_paths: vec![PathPattern::subtree("/profile")],
        }
    }

    /// Absolute (or, without a public URL, root-relative) login page URL.
    pub(crate) fn login_url(&self) -> String {
        format!("{}{}", self.public_url.trim_end_matches('/'), self.login_page)
    }
}

/// Portal configuration.
///
/// Required collaborators (`api`, `jwt_secret`) are constructor parameters.
///
/// Use [`from_env()`](PortalConfig::from_env) for convention-based setup,
/// or [`new()`](PortalConfig::new) with `with_*` methods for full control.
pub struct PortalConfig {
    pub(super) api: ApiConfig,
    pub(super) jwt_secret: JwtSecret,
    pub(super) settings: PortalSettings,
}

impl PortalConfig {
    /// Create config with the required backend and JWT settings.
    ///
    /// The cookie key defaults to an ephemeral random key: sessions do not
    /// survive a restart until [`with_cookie_password`](Self::with_cookie_password)
    /// or [`with_cookie_key`](Self::with_cookie_key) is used.
    #[must_use]
    pub fn new(api: ApiConfig, jwt_secret: JwtSecret) -> Self {
        Self {
            api,
            jwt_secret,
            settings: PortalSettings::defaults(),
        }
    }

    /// Create config from environment variables.
    ///
    /// # Required env vars
    /// - `NEXT_PUBLIC_API_BASE_URL`: backend base URL
    /// - `AUTH_JWT_SECRET`: HS256 secret the backend signs access tokens with
    /// - `COOKIE_SECRET_PASSWORD`: session cookie password (at least 32 bytes)
    ///
    /// # Optional env vars
    /// - `API_TIMEOUT_MS`: backend request timeout
    /// - `NODE_ENV`: `production` enables `Secure` cookies
    /// - `NEXT_PUBLIC_URL`: public origin prepended to login redirects
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if required env vars are missing or invalid.
    pub fn from_env() -> Result<Self, Error> {
        let api = ApiConfig::from_env()?;

        let jwt_secret = std::env::var("AUTH_JWT_SECRET")
            .map_err(|_| Error::Config("AUTH_JWT_SECRET is required".into()))?;
        let jwt_secret = JwtSecret::new(jwt_secret)?;

        let password = std::env::var("COOKIE_SECRET_PASSWORD")
            .map_err(|_| Error::Config("COOKIE_SECRET_PASSWORD is required".into()))?;

        let production = std::env::var("NODE_ENV").is_ok_and(|env| env == "production");

        let mut config = Self::new(api, jwt_secret)
            .with_cookie_password(&password)?
            .with_secure_cookies(production);

        if let Ok(public_url) = std::env::var("NEXT_PUBLIC_URL") {
            config = config.with_public_url(public_url);
        }

        Ok(config)
    }

    /// Derive the cookie encryption key from a password.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the password is shorter than
    /// [`MIN_COOKIE_PASSWORD_LEN`] bytes.
    pub fn with_cookie_password(self, password: &str) -> Result<Self, Error> {
        if password.len() < MIN_COOKIE_PASSWORD_LEN {
            return Err(Error::Config(format!(
                "COOKIE_SECRET_PASSWORD must be at least {MIN_COOKIE_PASSWORD_LEN} bytes"
            )));
        }
        Ok(self.with_cookie_key(Key::derive_from(password.as_bytes())))
    }

    #[must_use]
    pub fn with_cookie_key(mut self, key: Key) -> Self {
        self.settings.cookie_key = key;
        self
    }

    #[must_use]
    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.settings.cookie.name = name.into();
        self
    }

    /// Session lifetime, clamped to `0..=MAX_SESSION_TTL_DAYS`.
    #[must_use]
    pub fn with_session_ttl_days(mut self, days: i64) -> Self {
        self.settings.cookie.ttl_days = days.clamp(0, MAX_SESSION_TTL_DAYS);
        self
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.settings.cookie.secure = secure;
        self
    }

    #[must_use]
    pub fn with_auth_path(mut self, path: impl Into<String>) -> Self {
        self.settings.auth_path = path.into();
        self
    }

    #[must_use]
    pub fn with_public_url(mut self, url: impl Into<String>) -> Self {
        self.settings.public_url = url.into();
        self
    }

    #[must_use]
    pub fn with_login_page(mut self, path: impl Into<String>) -> Self {
        self.settings.login_page = path.into();
        self
    }

    #[must_use]
    pub fn with_register_page(mut self, path: impl Into<String>) -> Self {
        self.settings.register_page = path.into();
        self
    }

    /// Replace the protected path patterns (default: `/profile/:path*`).
    #[must_use]
    pub fn with_protected_paths(mut self, patterns: Vec<PathPattern>) -> Self {
        self.settings.protected_paths = patterns;
        self
    }
}
