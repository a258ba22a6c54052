//! `reqwest` implementation of [`StoreBackend`].

use std::sync::Arc;

use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use techhub_core::{CartLine, ProductId, ProductPage, UserProfile};

use super::conversions::{
    message_of, normalize_auth, normalize_cart, normalize_estimate, normalize_identity,
    normalize_product_page,
};
use super::types::{
    AddToCartBody, CartEnvelope, ForgotPasswordBody, IdentityEnvelope, LoginBody,
    RawAuthResponse, RawEstimateResponse, RawProductList, RegisterBody, StatusBody,
    UpdateQuantityBody,
};
use super::{
    AuthSession, BackendError, EstimateReceipt, EstimateRequest, ProfileUpdateRequest,
    RegisterRequest, StoreBackend,
};
use crate::config::StorefrontConfig;

/// Longest body excerpt written to logs.
const LOG_BODY_LIMIT: usize = 500;

/// HTTP client for the TechHub REST API.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct HttpBackend {
    inner: Arc<HttpBackendInner>,
}

struct HttpBackendInner {
    client: reqwest::Client,
    /// Always ends with `/` so relative joins keep the version segment.
    base_url: Url,
}

impl std::fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBackend")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl HttpBackend {
    /// Create a client for the configured API base URL.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &StorefrontConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        let mut base_url = config.api_base_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            inner: Arc::new(HttpBackendInner { client, base_url }),
        })
    }

    /// The API root every endpoint is resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        self.inner
            .base_url
            .join(path)
            .map_err(|e| BackendError::Parse(format!("invalid endpoint {path}: {e}")))
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&SecretString>,
    ) -> Result<RequestBuilder, BackendError> {
        let url = self.endpoint(path)?;
        let builder = self.inner.client.request(method, url);
        Ok(match token {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        })
    }

    /// Send a request and return the body of a successful response.
    ///
    /// 429 becomes [`BackendError::RateLimited`]; any other non-2xx, or a 2xx
    /// body with `"success": false`, becomes [`BackendError::Rejected`].
    async fn send(&self, request: RequestBuilder) -> Result<String, BackendError> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(0);
            return Err(BackendError::RateLimited { retry_after });
        }

        let body = response.text().await?;
        let summary: StatusBody = serde_json::from_str(&body).unwrap_or_default();

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %excerpt(&body),
                "TechHub API returned non-success status"
            );
            return Err(BackendError::Rejected {
                status: status.as_u16(),
                message: message_of(&summary),
            });
        }

        if summary.success == Some(false) {
            tracing::error!(
                status = %status,
                body = %excerpt(&body),
                "TechHub API reported failure"
            );
            return Err(BackendError::Rejected {
                status: status.as_u16(),
                message: message_of(&summary),
            });
        }

        debug!(status = %status, bytes = body.len(), "TechHub API response");
        Ok(body)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, BackendError> {
        let body = self.send(request).await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %excerpt(&body),
                "Failed to parse TechHub API response"
            );
            BackendError::from(e)
        })
    }

    fn item_path(product_id: &ProductId) -> String {
        format!("cart/item/{}", urlencoding::encode(product_id.as_str()))
    }
}

fn excerpt(body: &str) -> String {
    body.chars().take(LOG_BODY_LIMIT).collect()
}

impl StoreBackend for HttpBackend {
    #[instrument(skip(self, password))]
    async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<AuthSession, BackendError> {
        let body = LoginBody {
            username,
            password: password.expose_secret(),
        };
        let request = self.request(Method::POST, "auth/login", None)?.json(&body);
        let raw: RawAuthResponse = self.send_json(request).await?;
        Ok(normalize_auth(raw))
    }

    #[instrument(skip(self, request), fields(username = %request.username))]
    async fn register(&self, request: &RegisterRequest) -> Result<AuthSession, BackendError> {
        let builder = self
            .request(Method::POST, "auth/register", None)?
            .json(&RegisterBody::from(request));
        let raw: RawAuthResponse = self.send_json(builder).await?;
        Ok(normalize_auth(raw))
    }

    #[instrument(skip(self, current_password, new_password))]
    async fn forgot_password(
        &self,
        username: &str,
        current_password: &SecretString,
        new_password: &SecretString,
    ) -> Result<Option<String>, BackendError> {
        let body = ForgotPasswordBody {
            username,
            current_password: current_password.expose_secret(),
            new_password: new_password.expose_secret(),
        };
        let request = self
            .request(Method::POST, "auth/forgot-password", None)?
            .json(&body);
        let body = self.send(request).await?;
        let status: StatusBody = serde_json::from_str(&body).unwrap_or_default();
        Ok(message_of(&status))
    }

    #[instrument(skip_all)]
    async fn me(&self, token: &SecretString) -> Result<Option<UserProfile>, BackendError> {
        let request = self.request(Method::GET, "auth/me", Some(token))?;
        let envelope: IdentityEnvelope = self.send_json(request).await?;
        Ok(normalize_identity(envelope))
    }

    #[instrument(skip_all)]
    async fn update_profile(
        &self,
        token: &SecretString,
        request: &ProfileUpdateRequest,
    ) -> Result<(), BackendError> {
        let builder = self
            .request(Method::PUT, "auth/updateprofile", Some(token))?
            .json(request);
        self.send(builder).await.map(drop)
    }

    #[instrument(skip(self))]
    async fn list_products(&self, page: u32, limit: u32) -> Result<ProductPage, BackendError> {
        let mut url = self.endpoint("products")?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("limit", &limit.to_string());

        let request = self.inner.client.get(url);
        let raw: RawProductList = self.send_json(request).await?;
        Ok(normalize_product_page(raw, page, limit))
    }

    #[instrument(skip_all)]
    async fn get_cart(&self, token: &SecretString) -> Result<Vec<CartLine>, BackendError> {
        let request = self.request(Method::GET, "cart", Some(token))?;
        let envelope: CartEnvelope = self.send_json(request).await?;
        normalize_cart(envelope)
    }

    #[instrument(skip(self, token), fields(product_id = %product_id))]
    async fn add_to_cart(
        &self,
        token: &SecretString,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<(), BackendError> {
        let request = self
            .request(Method::POST, "cart", Some(token))?
            .json(&AddToCartBody {
                product_id,
                quantity,
            });
        self.send(request).await.map(drop)
    }

    #[instrument(skip(self, token), fields(product_id = %product_id))]
    async fn update_cart_item(
        &self,
        token: &SecretString,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<(), BackendError> {
        let request = self
            .request(Method::PUT, &Self::item_path(product_id), Some(token))?
            .json(&UpdateQuantityBody { quantity });
        self.send(request).await.map(drop)
    }

    #[instrument(skip(self, token), fields(product_id = %product_id))]
    async fn remove_cart_item(
        &self,
        token: &SecretString,
        product_id: &ProductId,
    ) -> Result<(), BackendError> {
        let request = self.request(Method::DELETE, &Self::item_path(product_id), Some(token))?;
        self.send(request).await.map(drop)
    }

    #[instrument(skip_all)]
    async fn clear_cart(&self, token: &SecretString) -> Result<(), BackendError> {
        let request = self.request(Method::DELETE, "cart", Some(token))?;
        self.send(request).await.map(drop)
    }

    #[instrument(skip_all, fields(items = request.items.len()))]
    async fn create_estimate(
        &self,
        token: &SecretString,
        request: &EstimateRequest,
    ) -> Result<EstimateReceipt, BackendError> {
        let builder = self
            .request(Method::POST, "estimate/create", Some(token))?
            .json(request);
        let raw: RawEstimateResponse = self.send_json(builder).await?;
        Ok(normalize_estimate(raw))
    }
}
