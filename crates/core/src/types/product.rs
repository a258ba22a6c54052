//! Catalog product model.

use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::Price;

/// Product image reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductImage {
    /// Image host identifier.
    pub public_id: String,
    /// Public URL.
    pub url: String,
}

/// A product as listed in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub category: String,
    pub price: Price,
    /// List price before discount, when the product is on sale.
    pub original_price: Option<Price>,
    pub discount_percentage: Option<f64>,
    /// Average review score (0-5).
    pub rating: Option<f64>,
    pub number_of_reviews: Option<u32>,
    pub main_image: Option<ProductImage>,
    /// Units in stock.
    pub quantity: u32,
    pub is_active: bool,
}

impl Product {
    /// Whether the product can currently be ordered.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.is_active && self.quantity > 0
    }
}

/// One page of the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    pub products: Vec<Product>,
    /// 1-based page number.
    pub page: u32,
    /// Always at least one.
    pub total_pages: u32,
}

impl ProductPage {
    /// Whether a later page exists.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    /// Whether an earlier page exists.
    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.page > 1
    }
}
