#![doc = include_str!("../README.md")]

pub mod dto;
pub mod entities;
pub mod error;
pub mod password;
pub mod token_store;
pub mod types;

#[cfg(feature = "client")]
pub mod client;
#[cfg(feature = "client")]
pub mod endpoints;
#[cfg(feature = "server")]
pub mod session;
#[cfg(feature = "token")]
pub mod token;

// Re-exports for convenient access
pub use error::Error;
pub use password::{password_strength, progress_bar_color};
pub use token_store::{MemoryTokenStore, StoredCredentialToken, TokenStore, user_token_is_expired};
pub use types::{EntityId, VerificationHash};

#[cfg(feature = "client")]
pub use client::{Access, ApiClient, ApiConfig, ApiError, ApiResult};
#[cfg(feature = "client")]
pub use endpoints::Resource;
#[cfg(feature = "token")]
pub use token::{AccessClaims, JwtSecret, verify_access_token};
