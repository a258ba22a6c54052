//! Checkout: turn the cart into an estimate.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

use techhub_core::{CartLine, EstimateId, Price};

use crate::backend::{EstimateRequest, StoreBackend};
use crate::error::{AppError, Result, ValidationError, add_breadcrumb};
use crate::services::cart::CartSynchronizer;
use crate::session::SessionStore;

/// Message used when the backend confirms without one of its own.
pub const ESTIMATE_CREATED_MESSAGE: &str = "Estimate created successfully!";

/// What was submitted, as confirmed by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutReceipt {
    pub estimate_id: Option<EstimateId>,
    /// Text to show the user.
    pub message: String,
    /// Lines submitted, in submission order.
    pub items: Vec<CartLine>,
    pub total: Price,
    pub submitted_at: DateTime<Utc>,
}

/// Submits the cart as an estimate and empties it on success.
pub struct CheckoutService<B> {
    backend: Arc<B>,
    session: SessionStore,
    cart: CartSynchronizer<B>,
    settle: Duration,
}

impl<B> Clone for CheckoutService<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            session: self.session.clone(),
            cart: self.cart.clone(),
            settle: self.settle,
        }
    }
}

impl<B: StoreBackend> CheckoutService<B> {
    /// `settle` is the pause between the pre-submit refresh and reading the
    /// snapshot.
    #[must_use]
    pub const fn new(
        backend: Arc<B>,
        session: SessionStore,
        cart: CartSynchronizer<B>,
        settle: Duration,
    ) -> Self {
        Self {
            backend,
            session,
            cart,
            settle,
        }
    }

    /// Create an estimate from the current cart.
    ///
    /// Refreshes the cart first (best effort). On success the remote cart is
    /// cleared (failure only logged) and the local cart always is.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unauthenticated` without a session,
    /// `ValidationError::EmptyCart` for an empty cart, or the backend's
    /// failure, in which case the cart is left untouched.
    #[instrument(skip(self))]
    pub async fn checkout(&self) -> Result<CheckoutReceipt> {
        let token = self.session.require_token().await?;

        if self.cart.snapshot().await.is_empty() {
            return Err(ValidationError::EmptyCart.into());
        }

        self.cart.fetch_cart().await;
        tokio::time::sleep(self.settle).await;

        let snapshot = self.cart.snapshot().await;
        if snapshot.is_empty() {
            return Err(ValidationError::EmptyCart.into());
        }

        let request = EstimateRequest::from_snapshot(&snapshot);
        add_breadcrumb("checkout", "Submit estimate", None);

        let estimate = self
            .backend
            .create_estimate(&token, &request)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to create estimate");
                AppError::from_backend(e, "Failed to create estimate")
            })?;

        info!(
            estimate_id = estimate.id.as_ref().map(EstimateId::as_str),
            items = snapshot.len(),
            "Estimate created"
        );

        self.cart.cancel_pending().await;
        if let Err(e) = self.backend.clear_cart(&token).await {
            warn!(error = %e, "Estimate created but remote cart clear failed");
        }
        self.cart.clear_local().await;

        Ok(CheckoutReceipt {
            estimate_id: estimate.id,
            message: estimate
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| ESTIMATE_CREATED_MESSAGE.to_string()),
            total: snapshot.total(),
            items: snapshot.into_iter().collect(),
            submitted_at: Utc::now(),
        })
    }
}
