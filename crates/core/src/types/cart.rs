//! Cart lines and the local cart snapshot.
//!
//! A [`CartSnapshot`] holds at most one [`CartLine`] per product and never a
//! line with quantity zero: setting a quantity of zero removes the line.

use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::Price;

/// One product in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Product this line refers to.
    #[serde(rename = "id")]
    pub product_id: ProductId,
    /// Display name captured when the line was loaded.
    pub name: String,
    /// Price of a single unit.
    #[serde(rename = "price")]
    pub unit_price: Price,
    /// Number of units, always at least one.
    pub quantity: u32,
}

impl CartLine {
    /// Create a new cart line.
    #[must_use]
    pub fn new(
        product_id: impl Into<ProductId>,
        name: impl Into<String>,
        unit_price: Price,
        quantity: u32,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            name: name.into(),
            unit_price,
            quantity,
        }
    }

    /// Unit price multiplied by quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.unit_price.times(self.quantity)
    }
}

/// The local copy of the cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartSnapshot {
    lines: Vec<CartLine>,
}

impl CartSnapshot {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Build a snapshot from lines reported by the server.
    ///
    /// Duplicate product IDs are merged by summing quantities, and lines with
    /// a zero quantity are dropped.
    #[must_use]
    pub fn from_lines(lines: impl IntoIterator<Item = CartLine>) -> Self {
        let mut snapshot = Self::new();
        for line in lines {
            if line.quantity == 0 {
                continue;
            }
            match snapshot.get_mut(&line.product_id) {
                Some(existing) => {
                    existing.quantity = existing.quantity.saturating_add(line.quantity);
                }
                None => snapshot.lines.push(line),
            }
        }
        snapshot
    }

    /// All lines.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Look up the line for a product.
    #[must_use]
    pub fn get(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| &l.product_id == product_id)
    }

    fn get_mut(&mut self, product_id: &ProductId) -> Option<&mut CartLine> {
        self.lines.iter_mut().find(|l| &l.product_id == product_id)
    }

    /// Whether the cart holds a line for this product.
    #[must_use]
    pub fn contains(&self, product_id: &ProductId) -> bool {
        self.get(product_id).is_some()
    }

    /// Insert a line, replacing any existing line for the same product.
    ///
    /// A line with quantity zero removes the product instead.
    pub fn upsert(&mut self, line: CartLine) {
        if line.quantity == 0 {
            self.remove(&line.product_id);
            return;
        }
        match self.get_mut(&line.product_id) {
            Some(existing) => *existing = line,
            None => self.lines.push(line),
        }
    }

    /// Set the quantity of an existing line; zero removes it.
    ///
    /// Returns `false` when the product is not in the cart.
    pub fn set_quantity(&mut self, product_id: &ProductId, quantity: u32) -> bool {
        if quantity == 0 {
            return self.remove(product_id).is_some();
        }
        match self.get_mut(product_id) {
            Some(line) => {
                line.quantity = quantity;
                true
            }
            None => false,
        }
    }

    /// Remove a product's line, returning it if present.
    pub fn remove(&mut self, product_id: &ProductId) -> Option<CartLine> {
        let index = self.lines.iter().position(|l| &l.product_id == product_id)?;
        Some(self.lines.remove(index))
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Number of distinct products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines
            .iter()
            .fold(0u32, |acc, l| acc.saturating_add(l.quantity))
    }

    /// Sum of all line totals.
    #[must_use]
    pub fn total(&self) -> Price {
        self.lines.iter().map(CartLine::line_total).sum()
    }
}

impl IntoIterator for CartSnapshot {
    type Item = CartLine;
    type IntoIter = std::vec::IntoIter<CartLine>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.into_iter()
    }
}
