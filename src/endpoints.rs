//! Typed wrappers for every backend route the portal uses.

use std::marker::PhantomData;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::client::{Access, ApiClient, ApiError, ApiPath, ApiResult};
use crate::dto::{
    AppleLoginDto, ConfirmEmailDto, ForgotPasswordDto, LoginResponse, LoginUserDto, RegisterDto,
    ResetPasswordDto, SocialTokenDto, TwitterLoginDto,
};
use crate::entities::{BloodBank, BloodDonation, BloodRequest, Donor, Hospital, User};
use crate::token_store::StoredCredentialToken;
use crate::types::{EntityId, VerificationHash};

/// CRUD access to one backend collection. All calls are authenticated.
pub struct Resource<'a, T> {
    client: &'a ApiClient,
    path: &'static str,
    _entity: PhantomData<fn() -> T>,
}

/// List bodies come either bare or wrapped in a page envelope.
#[derive(Deserialize)]
#[serde(untagged)]
enum ListBody<T> {
    Plain(Vec<T>),
    Paged { data: Vec<T> },
}

impl<T: DeserializeOwned> Resource<'_, T> {
    pub async fn create<B: Serialize + ?Sized>(&self, data: &B) -> ApiResult<T> {
        self.client
            .send_json(Method::POST, self.path, Some(data), Access::Authenticated)
            .await
    }

    pub async fn get(&self, id: &EntityId) -> ApiResult<T> {
        self.client
            .send_json(Method::GET, self.item(id), None::<&()>, Access::Authenticated)
            .await
    }

    pub async fn list(&self) -> ApiResult<Vec<T>> {
        let body: ListBody<T> = self
            .client
            .send_json(Method::GET, self.path, None::<&()>, Access::Authenticated)
            .await?;
        Ok(match body {
            ListBody::Plain(items) | ListBody::Paged { data: items } => items,
        })
    }

    pub async fn update<B: Serialize + ?Sized>(&self, id: &EntityId, data: &B) -> ApiResult<T> {
        self.client
            .send_json(Method::PATCH, self.item(id), Some(data), Access::Authenticated)
            .await
    }

    pub async fn delete(&self, id: &EntityId) -> ApiResult<()> {
        self.client
            .send_empty(Method::DELETE, self.item(id), None::<&()>, Access::Authenticated)
            .await
    }

    fn item<'i>(&self, id: &'i EntityId) -> ApiPath<'i> {
        ApiPath::Item {
            collection: self.path,
            id: id.as_str(),
        }
    }
}

impl ApiClient {
    fn resource<T>(&self, path: &'static str) -> Resource<'_, T> {
        Resource {
            client: self,
            path,
            _entity: PhantomData,
        }
    }

    #[must_use]
    pub fn users(&self) -> Resource<'_, User> {
        self.resource("/users")
    }

    #[must_use]
    pub fn donors(&self) -> Resource<'_, Donor> {
        self.resource("/donors")
    }

    #[must_use]
    pub fn hospitals(&self) -> Resource<'_, Hospital> {
        self.resource("/hospitals")
    }

    #[must_use]
    pub fn blood_banks(&self) -> Resource<'_, BloodBank> {
        self.resource("/blood-banks")
    }

    #[must_use]
    pub fn blood_requests(&self) -> Resource<'_, BloodRequest> {
        self.resource("/blood-requests")
    }

    #[must_use]
    pub fn blood_donations(&self) -> Resource<'_, BloodDonation> {
        self.resource("/blood-donations")
    }

    // ── Email auth ────────────────────────────────────────────────────

    pub async fn login_email(&self, dto: &LoginUserDto) -> ApiResult<LoginResponse> {
        self.send_json(Method::POST, "/auth/email/login", Some(dto), Access::Public)
            .await
    }

    pub async fn login_admin_email(&self, dto: &LoginUserDto) -> ApiResult<LoginResponse> {
        self.send_json(Method::POST, "/auth/admin/email/login", Some(dto), Access::Public)
            .await
    }

    pub async fn register_email(&self, dto: &RegisterDto) -> ApiResult<()> {
        self.send_empty(Method::POST, "/auth/email/register", Some(dto), Access::Public)
            .await
    }

    pub async fn confirm_email(&self, hash: &VerificationHash) -> ApiResult<()> {
        let body = ConfirmEmailDto { hash: hash.clone() };
        self.send_empty(Method::POST, "/auth/email/confirm", Some(&body), Access::Public)
            .await
    }

    pub async fn forgot_password(&self, email: &str) -> ApiResult<()> {
        let body = ForgotPasswordDto {
            email: email.to_owned(),
        };
        self.send_empty(Method::POST, "/auth/forgot/password", Some(&body), Access::Public)
            .await
    }

    pub async fn reset_password(&self, hash: &VerificationHash, password: &str) -> ApiResult<()> {
        let body = ResetPasswordDto {
            password: password.to_owned(),
            hash: hash.clone(),
        };
        self.send_empty(Method::POST, "/auth/reset/password", Some(&body), Access::Public)
            .await
    }

    // ── Current user ──────────────────────────────────────────────────

    pub async fn me(&self) -> ApiResult<User> {
        self.send_json(Method::GET, "/auth/me", None::<&()>, Access::Authenticated)
            .await
    }

    pub async fn update_me<B: Serialize + ?Sized>(&self, data: &B) -> ApiResult<User> {
        self.send_json(Method::PATCH, "/auth/me", Some(data), Access::Authenticated)
            .await
    }

    pub async fn delete_me(&self) -> ApiResult<()> {
        self.send_empty(Method::DELETE, "/auth/me", None::<&()>, Access::Authenticated)
            .await
    }

    // ── Social logins ─────────────────────────────────────────────────

    pub async fn login_facebook(&self, token: &str) -> ApiResult<LoginResponse> {
        let body = SocialTokenDto {
            token: token.to_owned(),
        };
        self.send_json(Method::POST, "/auth/facebook/login", Some(&body), Access::Public)
            .await
    }

    pub async fn login_google(&self, token: &str) -> ApiResult<LoginResponse> {
        let body = SocialTokenDto {
            token: token.to_owned(),
        };
        self.send_json(Method::POST, "/auth/google/login", Some(&body), Access::Public)
            .await
    }

    pub async fn login_twitter(&self, token: &str, token_secret: &str) -> ApiResult<LoginResponse> {
        let body = TwitterLoginDto {
            token: token.to_owned(),
            token_secret: token_secret.to_owned(),
        };
        self.send_json(Method::POST, "/auth/twitter/login", Some(&body), Access::Public)
            .await
    }

    pub async fn login_apple(&self, dto: &AppleLoginDto) -> ApiResult<LoginResponse> {
        self.send_json(Method::POST, "/auth/apple/login", Some(dto), Access::Public)
            .await
    }

    // ── Token lifecycle ───────────────────────────────────────────────

    /// Logs in with email/password and keeps the returned token in the
    /// client's token store.
    ///
    /// # Errors
    ///
    /// Any login failure, or [`ApiError::Decode`] if the returned token has
    /// no readable `exp`.
    pub async fn sign_in(&self, dto: &LoginUserDto) -> ApiResult<StoredCredentialToken> {
        let LoginResponse { token, user } = self.login_email(dto).await?;
        let stored = StoredCredentialToken::from_jwt(token, user)
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        self.token_store().store(stored.clone());
        Ok(stored)
    }

    /// Forgets the stored token.
    pub fn sign_out(&self) {
        self.token_store().clear();
    }
}
