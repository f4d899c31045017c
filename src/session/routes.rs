use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header::LOCATION;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::PrivateCookieJar;
use serde::Serialize;
use serde_json::{Value as JsonValue, json};

use super::codec::{PendingEmailValidation, Session, UserSession};
use super::error::PortalError;
use super::extractor::LoggedIn;
use super::state::PortalState;
use crate::client::ApiResult;
use crate::dto::{
    ConfirmEmailDto, ForgotPasswordDto, LoginResponse, LoginUserDto, RegisterDto,
    ResetPasswordDto,
};
use crate::token::verify_access_token;

/// Create the portal's auth router, mounted under the configured auth path
/// (default `/api/auth`).
pub fn auth_routes(state: PortalState) -> Router {
    let auth_path = state.settings.auth_path.clone();

    Router::new()
        .route(
            &format!("{auth_path}/login"),
            post(login).fallback(method_not_allowed),
        )
        .route(
            &format!("{auth_path}/admin/login"),
            post(admin_login).fallback(method_not_allowed),
        )
        .route(
            &format!("{auth_path}/register"),
            post(register).fallback(method_not_allowed),
        )
        .route(
            &format!("{auth_path}/validation-email"),
            get(validation_email).fallback(method_not_allowed),
        )
        .route(
            &format!("{auth_path}/confirm"),
            post(confirm_email).fallback(method_not_allowed),
        )
        .route(
            &format!("{auth_path}/forgot"),
            post(forgot_password).fallback(method_not_allowed),
        )
        .route(
            &format!("{auth_path}/reset"),
            post(reset_password).fallback(method_not_allowed),
        )
        .route(
            &format!("{auth_path}/logout"),
            post(logout).fallback(method_not_allowed),
        )
        .route(
            &format!("{auth_path}/me"),
            get(me)
                .patch(update_me)
                .delete(delete_me)
                .fallback(method_not_allowed),
        )
        .with_state(state)
}

#[derive(Serialize)]
struct LoginReply {
    token: String,
    exp: i64,
}

fn message(text: &str) -> Json<JsonValue> {
    Json(json!({ "message": text }))
}

// ── Login ──────────────────────────────────────────────────────────

async fn login(
    State(state): State<PortalState>,
    session: Session,
    body: Result<Json<LoginUserDto>, JsonRejection>,
) -> Result<(PrivateCookieJar, Json<LoginReply>), PortalError> {
    let Json(dto) = body?;
    let result = state.client.login_email(&dto).await;
    complete_login(&state, session, result)
}

async fn admin_login(
    State(state): State<PortalState>,
    session: Session,
    body: Result<Json<LoginUserDto>, JsonRejection>,
) -> Result<(PrivateCookieJar, Json<LoginReply>), PortalError> {
    let Json(dto) = body?;
    let result = state.client.login_admin_email(&dto).await;
    complete_login(&state, session, result)
}

/// Verifies the backend's token and mirrors its claims into the session.
fn complete_login(
    state: &PortalState,
    mut session: Session,
    result: ApiResult<LoginResponse>,
) -> Result<(PrivateCookieJar, Json<LoginReply>), PortalError> {
    let LoginResponse { token, user } = result.map_err(|e| {
        tracing::warn!(error = %e, "Backend login failed");
        PortalError::login(e)
    })?;

    let claims = verify_access_token(&state.jwt_secret, &token).map_err(|e| {
        tracing::warn!(error = %e, "Backend token failed verification");
        PortalError::TokenRejected
    })?;

    let user_id = claims.id.clone();
    session.data = Some(UserSession {
        id: claims.id,
        role: claims.role,
        is_logged_in: true,
    });
    session.jwt = Some(token.clone());
    session.user = user;
    session.validate_email = None;

    let jar = session.save()?;

    tracing::info!(user_id = %user_id, "Login successful");

    Ok((
        jar,
        Json(LoginReply {
            token,
            exp: claims.exp,
        }),
    ))
}

// ── Registration ───────────────────────────────────────────────────

async fn register(
    State(state): State<PortalState>,
    mut session: Session,
    body: Result<Json<RegisterDto>, JsonRejection>,
) -> Result<(StatusCode, PrivateCookieJar, Json<JsonValue>), PortalError> {
    let Json(dto) = body?;
    state.client.register_email(&dto).await?;

    session.validate_email = Some(PendingEmailValidation {
        email: dto.email().to_owned(),
    });
    let jar = session.save()?;

    tracing::info!("Account created, awaiting email confirmation");

    Ok((StatusCode::CREATED, jar, message("Account created")))
}

/// Pending email of a just-registered visitor; others go back to the
/// registration page.
async fn validation_email(State(state): State<PortalState>, session: Session) -> Response {
    match &session.validate_email {
        Some(pending) => Json(pending.clone()).into_response(),
        None => (
            StatusCode::FOUND,
            [(LOCATION, state.settings.register_page.clone())],
        )
            .into_response(),
    }
}

async fn confirm_email(
    State(state): State<PortalState>,
    mut session: Session,
    body: Result<Json<ConfirmEmailDto>, JsonRejection>,
) -> Result<(PrivateCookieJar, Json<JsonValue>), PortalError> {
    let Json(dto) = body?;
    state
        .client
        .confirm_email(&dto.hash)
        .await
        .map_err(PortalError::verification)?;

    session.validate_email = None;
    Ok((session.save()?, message("Email confirmed")))
}

// ── Password recovery ──────────────────────────────────────────────

async fn forgot_password(
    State(state): State<PortalState>,
    body: Result<Json<ForgotPasswordDto>, JsonRejection>,
) -> Result<Json<JsonValue>, PortalError> {
    let Json(dto) = body?;
    state.client.forgot_password(&dto.email).await?;
    Ok(message("Email sent"))
}

async fn reset_password(
    State(state): State<PortalState>,
    body: Result<Json<ResetPasswordDto>, JsonRejection>,
) -> Result<Json<JsonValue>, PortalError> {
    let Json(dto) = body?;
    state
        .client
        .reset_password(&dto.hash, &dto.password)
        .await
        .map_err(PortalError::verification)?;
    Ok(message("Password reset"))
}

// ── Logout ─────────────────────────────────────────────────────────

async fn logout(session: Session) -> (PrivateCookieJar, Json<JsonValue>) {
    (session.destroy(), message("Logged out"))
}

// ── Current user ───────────────────────────────────────────────────

async fn me(
    State(state): State<PortalState>,
    LoggedIn { mut session, jwt }: LoggedIn,
) -> Result<Response, PortalError> {
    let user = state.client.with_bearer(&jwt).me().await?;
    session.user = Some(user.clone());
    Ok((session.save()?, Json(user)).into_response())
}

async fn update_me(
    State(state): State<PortalState>,
    LoggedIn { mut session, jwt }: LoggedIn,
    body: Result<Json<JsonValue>, JsonRejection>,
) -> Result<Response, PortalError> {
    let Json(changes) = body?;
    let user = state.client.with_bearer(&jwt).update_me(&changes).await?;
    session.user = Some(user.clone());
    Ok((session.save()?, Json(user)).into_response())
}

async fn delete_me(
    State(state): State<PortalState>,
    LoggedIn { session, jwt }: LoggedIn,
) -> Result<(PrivateCookieJar, StatusCode), PortalError> {
    state.client.with_bearer(&jwt).delete_me().await?;
    tracing::info!("Account deleted");
    Ok((session.destroy(), StatusCode::NO_CONTENT))
}

async fn method_not_allowed() -> PortalError {
    PortalError::MethodNotAllowed
}
