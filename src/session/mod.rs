//! Server-side session handling for Axum.
//!
//! The session lives entirely in an encrypted cookie (`auth.session` by
//! default). Auth routes forward to the backend, verify the token it issues
//! and mirror the claims into the cookie; [`protect`] keeps anonymous
//! visitors out of the configured paths.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use blood_portal::session::{PortalConfig, PortalState, auth_routes, protect};
//!
//! let state = PortalState::new(PortalConfig::from_env()?);
//!
//! let pages = axum::Router::new().route("/profile", get(profile));
//! let app = protect(pages, &state).merge(auth_routes(state.clone()));
//! ```

mod codec;
mod config;
mod cookies;
mod error;
mod extractor;
mod guard;
mod routes;
mod state;

pub use codec::{PendingEmailValidation, Session, SessionData, UserSession};
pub use config::{MAX_SESSION_TTL_DAYS, MIN_COOKIE_PASSWORD_LEN, PortalConfig};
pub use error::PortalError;
pub use extractor::LoggedIn;
pub use guard::{PathPattern, protect, require_session};
pub use routes::auth_routes;
pub use state::PortalState;

/// Re-export cookie key type for builder API.
pub use axum_extra::extract::cookie::Key as CookieKey;
