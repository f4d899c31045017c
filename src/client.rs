use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use url::Url;

use crate::error::Error;
use crate::token_store::{MemoryTokenStore, StoredCredentialToken, TokenStore, now_millis};

/// Request timeout applied to every backend call unless overridden.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Shown when the backend rejects the email/password pair (401, 422).
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Email ou mot de passe incorrect !";
/// Shown when the backend fails (500) or cannot be reached.
pub const RETRY_MESSAGE: &str = "Une erreur est survenue, Veuillez réessayer !";
/// Shown for any other login failure.
pub const GENERIC_ERROR_MESSAGE: &str = "Une erreur est survenue !";

/// Backend API configuration.
///
/// ```rust,ignore
/// use blood_portal::ApiConfig;
///
/// let config = ApiConfig::new("https://api.example.com/api/v1".parse()?)
///     .with_timeout(std::time::Duration::from_secs(10));
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ApiConfig {
    pub(crate) base_url: Url,
    pub(crate) timeout: Duration,
}

impl ApiConfig {
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Create config from environment variables.
    ///
    /// # Required env vars
    /// - `NEXT_PUBLIC_API_BASE_URL`: backend base URL
    ///
    /// # Optional env vars
    /// - `API_TIMEOUT_MS`: request timeout in milliseconds (default 5000)
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the base URL is missing or invalid, or the
    /// timeout is not a positive integer.
    pub fn from_env() -> Result<Self, Error> {
        let base_url = std::env::var("NEXT_PUBLIC_API_BASE_URL")
            .map_err(|_| Error::Config("NEXT_PUBLIC_API_BASE_URL is required".into()))?;
        let base_url: Url = base_url
            .parse()
            .map_err(|e| Error::Config(format!("NEXT_PUBLIC_API_BASE_URL: {e}")))?;

        let mut config = Self::new(base_url);

        if let Ok(ms) = std::env::var("API_TIMEOUT_MS") {
            let ms: u64 = ms
                .trim()
                .parse()
                .ok()
                .filter(|ms| *ms > 0)
                .ok_or_else(|| Error::Config(format!("API_TIMEOUT_MS: invalid value '{ms}'")))?;
            config = config.with_timeout(Duration::from_millis(ms));
        }

        Ok(config)
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Appends `path` to the base URL, keeping the base path prefix.
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
            .parse()
            .map_err(|e| ApiError::InvalidUrl(format!("{path}: {e}")))
    }

    /// URL of one item of `collection`. `id` is escaped as a single path
    /// segment, so it cannot leave the collection.
    pub(crate) fn item_endpoint(&self, collection: &str, id: &str) -> Result<Url, ApiError> {
        if matches!(id, "" | "." | "..") {
            return Err(ApiError::InvalidUrl(format!("invalid entity id '{id}'")));
        }
        let mut url = self.endpoint(collection)?;
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidUrl(format!("{collection}: cannot be a base")))?
            .pop_if_empty()
            .push(id);
        Ok(url)
    }
}

/// Backend route relative to the base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ApiPath<'a> {
    Fixed(&'a str),
    Item { collection: &'a str, id: &'a str },
}

impl ApiPath<'_> {
    fn resolve(self, config: &ApiConfig) -> Result<Url, ApiError> {
        match self {
            Self::Fixed(path) => config.endpoint(path),
            Self::Item { collection, id } => config.item_endpoint(collection, id),
        }
    }
}

impl<'a> From<&'a str> for ApiPath<'a> {
    fn from(path: &'a str) -> Self {
        Self::Fixed(path)
    }
}

impl std::fmt::Display for ApiPath<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fixed(path) => f.write_str(path),
            Self::Item { collection, id } => write!(f, "{collection}/{id}"),
        }
    }
}

/// Whether a call carries the stored bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Login, registration, password recovery and email confirmation.
    Public,
    /// Requires an unexpired stored token.
    Authenticated,
}

/// Failure of a backend call.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ApiError {
    /// No stored token, or it has expired. Nothing was sent.
    #[error("authentication required")]
    AuthenticationRequired,

    /// Transport failure: connection refused, DNS, TLS or timeout.
    #[error("could not connect to the server: {0}")]
    Unreachable(#[source] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("backend responded with status {status}")]
    Backend { status: u16, errors: JsonValue },

    /// A success response whose body did not have the expected shape.
    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error("invalid request URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// HTTP status of a backend rejection.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Backend { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// User-facing message for a failed login.
    #[must_use]
    pub fn login_message(&self) -> &'static str {
        match self.status() {
            Some(401 | 422) => INVALID_CREDENTIALS_MESSAGE,
            Some(500) | None => RETRY_MESSAGE,
            Some(_) => GENERIC_ERROR_MESSAGE,
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Client for the blood-donation backend.
///
/// Cheap to clone; clones share the connection pool and the token store.
#[derive(Clone)]
pub struct ApiClient {
    config: ApiConfig,
    http: reqwest::Client,
    tokens: Arc<dyn TokenStore>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client with an empty in-memory token store.
    #[must_use]
    pub fn new(config: ApiConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            tokens: Arc::new(MemoryTokenStore::new()),
        }
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    #[must_use]
    pub fn with_token_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.tokens = store;
        self
    }

    /// A view of this client that authenticates with `token` instead of the
    /// shared store. Used by server handlers forwarding a session's JWT.
    #[must_use]
    pub fn with_bearer(&self, token: &str) -> Self {
        let stored = StoredCredentialToken::from_jwt(token, None).unwrap_or_else(|e| {
            tracing::debug!(error = %e, "Forwarded token has no readable expiry");
            StoredCredentialToken {
                bearer_token: Some(token.to_owned()),
                ..StoredCredentialToken::default()
            }
        });

        Self {
            config: self.config.clone(),
            http: self.http.clone(),
            tokens: Arc::new(MemoryTokenStore::with_token(stored)),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    #[must_use]
    pub fn token_store(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    /// Sends a request and returns the success response.
    pub(crate) async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: impl Into<ApiPath<'_>>,
        body: Option<&B>,
        access: Access,
    ) -> ApiResult<reqwest::Response> {
        let path = path.into();
        let url = path.resolve(&self.config)?;

        let mut request = self
            .http
            .request(method.clone(), url)
            .timeout(self.config.timeout);

        if access == Access::Authenticated {
            let bearer = self
                .tokens
                .valid_bearer(now_millis())
                .ok_or(ApiError::AuthenticationRequired)?;
            request = request.bearer_auth(bearer);
        }

        if let Some(body) = body {
            request = request.json(body);
        }

        tracing::debug!(%method, %path, ?access, "Backend request");

        let response = request.send().await.map_err(|e| {
            tracing::warn!(error = %e, %method, %path, "Backend unreachable");
            ApiError::Unreachable(e)
        })?;

        Self::ensure_success(response).await
    }

    /// Sends a request and decodes the JSON body into `T`.
    pub(crate) async fn send_json<B, T>(
        &self,
        method: Method,
        path: impl Into<ApiPath<'_>>,
        body: Option<&B>,
        access: Access,
    ) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.send(method, path, body, access).await?;
        let bytes = response.bytes().await.map_err(ApiError::Unreachable)?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Sends a request whose success body is ignored.
    pub(crate) async fn send_empty<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: impl Into<ApiPath<'_>>,
        body: Option<&B>,
        access: Access,
    ) -> ApiResult<()> {
        self.send(method, path, body, access).await.map(drop)
    }

    /// Checks HTTP response status; returns the response on success or the
    /// backend's `errors` payload.
    async fn ensure_success(response: reqwest::Response) -> ApiResult<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Backend {
            status,
            errors: backend_errors(&body),
        })
    }
}

/// Extracts `errors` from a `{status, errors}` body, falling back to the
/// whole JSON body, or to `{message}` for non-JSON bodies.
fn backend_errors(body: &str) -> JsonValue {
    match serde_json::from_str::<JsonValue>(body) {
        Ok(JsonValue::Object(mut map)) => match map.remove("errors") {
            Some(errors) => errors,
            None => JsonValue::Object(map),
        },
        Ok(other) => other,
        Err(_) if body.is_empty() => JsonValue::Null,
        Err(_) => serde_json::json!({ "message": body }),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn test_config() -> ApiConfig {
        ApiConfig::new("https://api.example.com/api/v1/".parse().unwrap())
    }

    #[test]
    fn endpoint_keeps_base_path() {
        let config = test_config();
        assert_eq!(
            config.endpoint("/auth/me").unwrap().as_str(),
            "https://api.example.com/api/v1/auth/me"
        );
        assert_eq!(
            config.endpoint("donors/4").unwrap().as_str(),
            "https://api.example.com/api/v1/donors/4"
        );
    }

    #[test]
    fn item_endpoint_escapes_id() {
        let config = test_config();
        assert_eq!(
            config.item_endpoint("/donors", "4").unwrap().as_str(),
            "https://api.example.com/api/v1/donors/4"
        );
        assert_eq!(
            config.item_endpoint("/donors", "a/b?c").unwrap().as_str(),
            "https://api.example.com/api/v1/donors/a%2Fb%3Fc"
        );

        let url = config.item_endpoint("/donors", "../users/1?x=y#").unwrap();
        assert!(url.path().starts_with("/api/v1/donors/"));
        assert_eq!(url.path_segments().unwrap().count(), 4);
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn item_endpoint_rejects_dot_segments() {
        let config = test_config();
        for id in ["", ".", ".."] {
            assert!(matches!(
                config.item_endpoint("/donors", id),
                Err(ApiError::InvalidUrl(_))
            ));
        }
    }

    #[test]
    fn default_timeout_is_five_seconds() {
        assert_eq!(test_config().timeout(), Duration::from_secs(5));
        let config = test_config().with_timeout(Duration::from_millis(250));
        assert_eq!(config.timeout(), Duration::from_millis(250));
    }

    #[test]
    fn backend_errors_prefers_errors_field() {
        let body = r#"{"status":422,"errors":{"email":"emailAlreadyExists"}}"#;
        assert_eq!(backend_errors(body), json!({ "email": "emailAlreadyExists" }));
    }

    #[test]
    fn backend_errors_fallbacks() {
        assert_eq!(backend_errors(r#"{"message":"nope"}"#), json!({ "message": "nope" }));
        assert_eq!(backend_errors("Bad Gateway"), json!({ "message": "Bad Gateway" }));
        assert_eq!(backend_errors(""), JsonValue::Null);
    }

    fn backend(status: u16) -> ApiError {
        ApiError::Backend {
            status,
            errors: JsonValue::Null,
        }
    }

    #[test]
    fn login_messages() {
        assert_eq!(backend(401).login_message(), "Email ou mot de passe incorrect !");
        assert_eq!(backend(422).login_message(), "Email ou mot de passe incorrect !");
        assert_eq!(
            backend(500).login_message(),
            "Une erreur est survenue, Veuillez réessayer !"
        );
        assert_eq!(backend(403).login_message(), "Une erreur est survenue !");
        assert_eq!(
            ApiError::Decode("x".into()).login_message(),
            "Une erreur est survenue, Veuillez réessayer !"
        );
    }

    #[tokio::test]
    async fn authenticated_request_without_token_is_not_sent() {
        // Port 9 (discard) is never contacted: the call must fail before dispatch.
        let client = ApiClient::new(ApiConfig::new("http://127.0.0.1:9".parse().unwrap()));
        let result = client
            .send_empty(Method::GET, "/auth/me", None::<&()>, Access::Authenticated)
            .await;
        assert!(matches!(result, Err(ApiError::AuthenticationRequired)));
    }

    #[test]
    fn with_bearer_seeds_separate_store() {
        let client = ApiClient::new(test_config());
        let view = client.with_bearer("not.a.jwt");
        assert!(client.token_store().load().is_none());
        let stored = view.token_store().load().unwrap();
        assert_eq!(stored.bearer_token.as_deref(), Some("not.a.jwt"));
        assert!(stored.is_expired());
    }
}
