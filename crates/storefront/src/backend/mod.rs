//! TechHub backend REST client.
//!
//! # Architecture
//!
//! - [`StoreBackend`] has one method per remote endpoint and returns
//!   normalized domain types; services only ever talk to this trait
//! - [`HttpBackend`] implements it with `reqwest` (JSON over HTTPS, bearer
//!   token in the `Authorization` header where required)
//! - The backend is the source of truth; no local caching
//! - Response-shape tolerance lives in `conversions`: each logical entity is
//!   parsed into a tagged union of the shapes the backend is known to send,
//!   then normalized by a single function
//!
//! # Example
//!
//! ```rust,ignore
//! use techhub_storefront::backend::{HttpBackend, StoreBackend};
//!
//! let backend = HttpBackend::new(&config)?;
//! let page = backend.list_products(1, 10).await?;
//! ```

mod client;
mod conversions;
pub mod types;

use std::future::Future;

use secrecy::SecretString;
use thiserror::Error;

use techhub_core::{CartLine, EstimateId, ProductId, ProductPage, UserProfile};

pub use client::HttpBackend;
pub use types::{EstimateItem, EstimateRequest, ProfileUpdateRequest, RegisterRequest};

/// Errors that can occur when talking to the backend.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// Transport failure (connection, timeout, TLS).
    #[error("HTTP error: {0}")]
    Network(String),

    /// Rate limited by the backend (HTTP 429).
    #[error("Rate limited, retry after {retry_after} seconds")]
    RateLimited {
        /// Seconds suggested by `Retry-After`, 0 if absent.
        retry_after: u64,
    },

    /// Non-success status, with the backend's message when it sent one.
    #[error("Rejected with HTTP {status}: {}", message.as_deref().unwrap_or("(no message)"))]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// `message` (or `error`) field from the response body.
        message: Option<String>,
    },

    /// The response body could not be understood.
    #[error("Unexpected response: {0}")]
    Parse(String),
}

impl BackendError {
    /// Whether the backend refused the credential (401/403).
    #[must_use]
    pub const fn is_auth_rejection(&self) -> bool {
        matches!(self, Self::Rejected { status: 401 | 403, .. })
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Parse(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Result of a login or registration call.
#[derive(Debug, Clone, Default)]
pub struct AuthSession {
    /// Bearer token, when the backend issued one.
    pub token: Option<SecretString>,
    /// User payload returned alongside the token, if any.
    pub profile: Option<UserProfile>,
    /// Backend message, if any.
    pub message: Option<String>,
}

/// Result of creating an estimate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EstimateReceipt {
    /// Identifier of the created estimate, when the backend returned one.
    pub id: Option<EstimateId>,
    /// Backend message, if any.
    pub message: Option<String>,
}

/// One method per backend endpoint.
///
/// Implementations return normalized domain types. Tokens are passed per
/// call; the trait holds no session state.
pub trait StoreBackend: Send + Sync + 'static {
    /// `POST /auth/login`.
    fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> impl Future<Output = Result<AuthSession, BackendError>> + Send;

    /// `POST /auth/register`.
    fn register(
        &self,
        request: &RegisterRequest,
    ) -> impl Future<Output = Result<AuthSession, BackendError>> + Send;

    /// `POST /auth/forgot-password`. Returns the backend message, if any.
    fn forgot_password(
        &self,
        username: &str,
        current_password: &SecretString,
        new_password: &SecretString,
    ) -> impl Future<Output = Result<Option<String>, BackendError>> + Send;

    /// `GET /auth/me`. `None` when the response shape is unrecognized.
    fn me(
        &self,
        token: &SecretString,
    ) -> impl Future<Output = Result<Option<UserProfile>, BackendError>> + Send;

    /// `PUT /auth/updateprofile`.
    fn update_profile(
        &self,
        token: &SecretString,
        request: &ProfileUpdateRequest,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// `GET /products?page=&limit=`.
    fn list_products(
        &self,
        page: u32,
        limit: u32,
    ) -> impl Future<Output = Result<ProductPage, BackendError>> + Send;

    /// `GET /cart`.
    fn get_cart(
        &self,
        token: &SecretString,
    ) -> impl Future<Output = Result<Vec<CartLine>, BackendError>> + Send;

    /// `POST /cart`.
    fn add_to_cart(
        &self,
        token: &SecretString,
        product_id: &ProductId,
        quantity: u32,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// `PUT /cart/item/:id`. Not every deployment supports it.
    fn update_cart_item(
        &self,
        token: &SecretString,
        product_id: &ProductId,
        quantity: u32,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// `DELETE /cart/item/:id`.
    fn remove_cart_item(
        &self,
        token: &SecretString,
        product_id: &ProductId,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// `DELETE /cart`.
    fn clear_cart(
        &self,
        token: &SecretString,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// `POST /estimate/create`.
    fn create_estimate(
        &self,
        token: &SecretString,
        request: &EstimateRequest,
    ) -> impl Future<Output = Result<EstimateReceipt, BackendError>> + Send;
}
