use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;

use super::config::{PortalConfig, PortalSettings};
use crate::client::ApiClient;
use crate::token::JwtSecret;

/// Shared state for the portal's routes and route guard.
#[derive(Clone)]
pub struct PortalState {
    pub(crate) client: ApiClient,
    pub(crate) jwt_secret: JwtSecret,
    pub(crate) settings: Arc<PortalSettings>,
}

impl PortalState {
    #[must_use]
    pub fn new(config: PortalConfig) -> Self {
        Self {
            client: ApiClient::new(config.api),
            jwt_secret: config.jwt_secret,
            settings: Arc::new(config.settings),
        }
    }

    /// Use a preconfigured backend client (shared pool, custom token store).
    #[must_use]
    pub fn with_client(mut self, client: ApiClient) -> Self {
        self.client = client;
        self
    }

    #[must_use]
    pub fn client(&self) -> &ApiClient {
        &self.client
    }
}

// PrivateCookieJar requires Key to be extractable from state
impl FromRef<PortalState> for Key {
    fn from_ref(state: &PortalState) -> Self {
        state.settings.cookie_key.clone()
    }
}
