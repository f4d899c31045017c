//! Fake backend and portal harness shared by the integration tests.

#![allow(dead_code)]

use std::time::Duration;

use axum::body::Body;
use axum::extract::Path;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use blood_portal::session::{PortalConfig, PortalState, auth_routes, protect};
use blood_portal::{ApiConfig, JwtSecret};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower::ServiceExt;

pub const JWT_SECRET: &str = "backend-jwt-secret";
pub const COOKIE_PASSWORD: &str = "complex_password_at_least_32_characters_long";
pub const SESSION_COOKIE: &str = "auth.session";

pub fn now() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

pub fn sign_token(secret: &str, exp: i64) -> String {
    let claims = json!({
        "id": 7,
        "role": { "id": 2, "name": "User", "__entity": "Role" },
        "iat": now(),
        "exp": exp,
    });
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

pub fn user_json() -> Value {
    json!({
        "id": 7,
        "email": "ok@example.com",
        "firstName": "Efua",
        "lastName": "Sutherland",
        "role": { "id": 2, "name": "User" },
        "status": { "id": 1, "name": "Active" },
        "createdAt": "2023-03-01T12:00:00.000Z"
    })
}

fn backend_error(status: StatusCode, errors: Value) -> Response {
    (
        status,
        Json(json!({ "status": status.as_u16(), "errors": errors })),
    )
        .into_response()
}

fn bearer_is_valid(headers: &HeaderMap) -> bool {
    let Some(token) = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    else {
        return false;
    };
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_aud = false;
    jsonwebtoken::decode::<Value>(
        token,
        &DecodingKey::from_secret(JWT_SECRET.as_bytes()),
        &validation,
    )
    .is_ok()
}

async fn login(Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default();
    match email {
        "ok@example.com" => Json(json!({
            "token": sign_token(JWT_SECRET, now() + 3600),
            "user": user_json(),
        }))
        .into_response(),
        "tampered@example.com" => Json(json!({
            "token": sign_token("someone-else", now() + 3600),
            "user": user_json(),
        }))
        .into_response(),
        "unauthorized@example.com" => {
            backend_error(StatusCode::UNAUTHORIZED, json!({ "email": "notFound" }))
        }
        "crash@example.com" => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        "teapot@example.com" => StatusCode::IM_A_TEAPOT.into_response(),
        _ => backend_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({ "password": "incorrectPassword" }),
        ),
    }
}

async fn social_login(Json(body): Json<Value>) -> Response {
    if body["token"].as_str().is_some_and(|t| !t.is_empty()) {
        Json(json!({ "token": sign_token(JWT_SECRET, now() + 3600) })).into_response()
    } else {
        backend_error(StatusCode::UNPROCESSABLE_ENTITY, json!({ "token": "required" }))
    }
}

async fn register(Json(body): Json<Value>) -> Response {
    if body["email"] == "taken@example.com" {
        return backend_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({ "email": "emailAlreadyExists" }),
        );
    }
    StatusCode::CREATED.into_response()
}

async fn confirm(Json(body): Json<Value>) -> Response {
    if body["hash"] == "good-hash" {
        StatusCode::NO_CONTENT.into_response()
    } else {
        backend_error(StatusCode::NOT_FOUND, json!({ "hash": "notFound" }))
    }
}

async fn forgot(Json(body): Json<Value>) -> Response {
    if body["email"] == "slow@example.com" {
        tokio::time::sleep(Duration::from_secs(2)).await;
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn reset(Json(body): Json<Value>) -> Response {
    if body["hash"] == "good-hash" && body["password"].is_string() {
        StatusCode::NO_CONTENT.into_response()
    } else {
        backend_error(StatusCode::UNPROCESSABLE_ENTITY, json!({ "hash": "invalidHash" }))
    }
}

async fn me(headers: HeaderMap) -> Response {
    if !bearer_is_valid(&headers) {
        return backend_error(StatusCode::UNAUTHORIZED, json!({ "message": "Unauthorized" }));
    }
    Json(user_json()).into_response()
}

async fn update_me(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !bearer_is_valid(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let mut user = user_json();
    if let Some(first_name) = body.get("firstName") {
        user["firstName"] = first_name.clone();
    }
    Json(user).into_response()
}

async fn delete_me(headers: HeaderMap) -> StatusCode {
    if bearer_is_valid(&headers) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::UNAUTHORIZED
    }
}

fn donor(id: &str) -> Value {
    json!({ "id": id, "firstName": "Kwame", "lastName": "Nkrumah", "user": null })
}

async fn donors(headers: HeaderMap) -> Response {
    if !bearer_is_valid(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({ "data": [donor("1"), donor("2")], "hasNextPage": false })).into_response()
}

async fn one_donor(headers: HeaderMap, Path(id): Path<String>) -> Response {
    if !bearer_is_valid(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if id == "404" {
        return backend_error(StatusCode::NOT_FOUND, json!({ "donor": "notFound" }));
    }
    Json(donor(&id)).into_response()
}

async fn hospitals(headers: HeaderMap) -> Response {
    if !bearer_is_valid(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!([{ "id": "h1", "name": "CHU Campus", "city": { "id": "c1", "name": "Lomé" } }]))
        .into_response()
}

fn backend_router() -> Router {
    let api = Router::new()
        .route("/auth/email/login", post(login))
        .route("/auth/admin/email/login", post(login))
        .route("/auth/google/login", post(social_login))
        .route("/auth/email/register", post(register))
        .route("/auth/email/confirm", post(confirm))
        .route("/auth/forgot/password", post(forgot))
        .route("/auth/reset/password", post(reset))
        .route("/auth/me", get(me).patch(update_me).delete(delete_me))
        .route("/donors", get(donors))
        .route("/donors/{id}", get(one_donor))
        .route("/hospitals", get(hospitals));

    Router::new().nest("/api/v1", api)
}

/// Serves the fake backend on an ephemeral port; returns its base URL.
pub async fn spawn_backend() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, backend_router()).await.unwrap();
    });
    format!("http://{addr}/api/v1")
}

/// Base URL of a port nothing listens on.
pub async fn dead_backend() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/api/v1")
}

pub fn portal_state(base_url: &str) -> PortalState {
    let config = PortalConfig::new(
        ApiConfig::new(base_url.parse().unwrap()),
        JwtSecret::new(JWT_SECRET).unwrap(),
    )
    .with_cookie_password(COOKIE_PASSWORD)
    .unwrap()
    .with_secure_cookies(false);
    PortalState::new(config)
}

/// Portal app: auth routes plus a protected `/profile` area and a public `/`.
pub fn portal_app(base_url: &str) -> Router {
    let state = portal_state(base_url);
    let pages = Router::new()
        .route("/", get(|| async { "home page" }))
        .route("/profile", get(|| async { "profile page" }))
        .route("/profile/settings", get(|| async { "settings page" }));
    protect(pages, &state).merge(auth_routes(state))
}

pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    cookie: Option<&str>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    let request = match body {
        Some(body) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// `name=value` pair of the session cookie set by `response`, if any.
pub fn session_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&format!("{SESSION_COOKIE}=")))
        .and_then(|v| v.split(';').next())
        .map(str::to_owned)
}

/// Logs in as the fake backend's valid user and returns the session cookie.
pub async fn logged_in_cookie(app: &Router) -> String {
    let response = send(
        app,
        "POST",
        "/api/auth/login",
        Some(json!({ "email": "ok@example.com", "password": "Secret#123" })),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    session_cookie(&response).expect("login sets the session cookie")
}
