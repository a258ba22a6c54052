//! Remote catalog client.
//!
//! Paged product listing with one retry when rate limited, plus the local
//! category filter and price sort applied to a fetched page.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument, warn};

use techhub_core::{Product, ProductPage};

use crate::backend::{BackendError, StoreBackend};
use crate::error::{AppError, Result, ValidationError};

/// Shown for any listing failure other than rate limiting.
pub const CATALOG_UNAVAILABLE_MESSAGE: &str = "Failed to fetch products";

/// How a product list is ordered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Backend order.
    #[default]
    Featured,
    PriceLowToHigh,
    PriceHighToLow,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "featured" => Ok(Self::Featured),
            "price-low" | "price-asc" | "low-high" => Ok(Self::PriceLowToHigh),
            "price-high" | "price-desc" | "high-low" => Ok(Self::PriceHighToLow),
            other => Err(format!("unknown sort order: {other}")),
        }
    }
}

/// Unique categories in first-seen order. Empty categories are skipped.
#[must_use]
pub fn categories(products: &[Product]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for product in products {
        if !product.category.is_empty() && !seen.contains(&product.category) {
            seen.push(product.category.clone());
        }
    }
    seen
}

/// Keep products in `category` (all when `None`), then order them.
///
/// Price sorts are stable, so equal prices keep backend order.
#[must_use]
pub fn filter_and_sort(
    products: &[Product],
    category: Option<&str>,
    sort: SortOrder,
) -> Vec<Product> {
    let mut selected: Vec<Product> = products
        .iter()
        .filter(|p| category.is_none_or(|c| p.category == c))
        .cloned()
        .collect();

    match sort {
        SortOrder::Featured => {}
        SortOrder::PriceLowToHigh => selected.sort_by(|a, b| a.price.cmp(&b.price)),
        SortOrder::PriceHighToLow => selected.sort_by(|a, b| b.price.cmp(&a.price)),
    }
    selected
}

/// Reads the product catalog. No session required.
pub struct CatalogService<B> {
    backend: Arc<B>,
    page_size: u32,
    backoff: Duration,
}

impl<B> Clone for CatalogService<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            page_size: self.page_size,
            backoff: self.backoff,
        }
    }
}

impl<B: StoreBackend> CatalogService<B> {
    #[must_use]
    pub const fn new(backend: Arc<B>, page_size: u32, backoff: Duration) -> Self {
        Self {
            backend,
            page_size,
            backoff,
        }
    }

    /// Products per page.
    #[must_use]
    pub const fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Fetch one page (1-based).
    ///
    /// A rate-limited request is retried once after the backoff.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidPage` for page 0, `AppError::RateLimited`
    /// if the retry is rate limited too, and `AppError::Unavailable` for any
    /// other failure.
    #[instrument(skip(self))]
    pub async fn list_products(&self, page: u32) -> Result<ProductPage> {
        if page == 0 {
            return Err(ValidationError::InvalidPage.into());
        }

        let result = match self.backend.list_products(page, self.page_size).await {
            Err(BackendError::RateLimited { retry_after }) => {
                warn!(retry_after, "Catalog rate limited; retrying once");
                tokio::time::sleep(self.backoff).await;
                self.backend.list_products(page, self.page_size).await
            }
            other => other,
        };

        let listing = result.map_err(|e| {
            tracing::error!(error = %e, page, "Failed to fetch products");
            match e {
                BackendError::RateLimited { .. } => AppError::RateLimited,
                other => AppError::Unavailable {
                    message: CATALOG_UNAVAILABLE_MESSAGE,
                    detail: other.to_string(),
                },
            }
        })?;

        debug!(
            page,
            total_pages = listing.total_pages,
            products = listing.products.len(),
            "Catalog page loaded"
        );
        Ok(listing)
    }
}
