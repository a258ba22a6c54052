//! Catalog, cart and checkout commands.

use std::io::{self, Write};

use techhub_core::{CartSnapshot, Product, ProductId, ProductPage};
use techhub_storefront::services::cart::ClearOutcome;
use techhub_storefront::services::catalog::{self, SortOrder};
use techhub_storefront::state::Storefront;

use super::{CliError, ask};

pub async fn products(
    shop: &Storefront,
    out: &mut impl Write,
    page: u32,
    category: Option<&str>,
    sort: SortOrder,
) -> Result<(), CliError> {
    let listing = shop.catalog().list_products(page).await?;

    let categories = catalog::categories(&listing.products);
    if !categories.is_empty() {
        writeln!(out, "Categories: {}", categories.join(", "))?;
    }

    let shown = catalog::filter_and_sort(&listing.products, category, sort);
    if shown.is_empty() {
        writeln!(out, "No products found")?;
    }
    for product in &shown {
        render_product(out, product)?;
    }
    render_footer(out, &listing, shop.catalog().page_size())?;
    Ok(())
}

pub async fn show_cart(shop: &Storefront, out: &mut impl Write) -> Result<(), CliError> {
    shop.session().require_token().await?;
    shop.cart().fetch_cart().await;
    render_cart(out, &shop.cart().snapshot().await)?;
    Ok(())
}

/// Adds one unit. Name and price come from the catalog.
pub async fn add(shop: &Storefront, out: &mut impl Write, id: ProductId) -> Result<(), CliError> {
    shop.session().require_token().await?;

    let product = find_product(shop, &id)
        .await?
        .ok_or_else(|| CliError::Usage(format!("No product with id {id}")))?;
    if !product.is_available() {
        return Err(CliError::Usage(format!("{} is out of stock", product.name)));
    }

    shop.cart()
        .add_item(product.id, product.name.clone(), product.price)
        .await?;
    writeln!(out, "Added {} to cart", product.name)?;
    render_cart(out, &shop.cart().snapshot().await)?;
    Ok(())
}

pub async fn remove(shop: &Storefront, out: &mut impl Write, id: &ProductId) -> Result<(), CliError> {
    shop.cart().fetch_cart().await;
    shop.cart().remove_item(id).await?;
    writeln!(out, "Removed {id}")?;
    render_cart(out, &shop.cart().snapshot().await)?;
    Ok(())
}

/// Waits for the debounced sync before returning so the edit is not lost.
pub async fn set_quantity(
    shop: &Storefront,
    out: &mut impl Write,
    id: &ProductId,
    quantity: u32,
) -> Result<(), CliError> {
    let cart = shop.cart();
    cart.fetch_cart().await;
    if !cart.snapshot().await.contains(id) {
        return Err(CliError::Usage(format!("{id} is not in your cart")));
    }

    cart.update_quantity(id, quantity).await;
    cart.settle().await;
    render_cart(out, &cart.snapshot().await)?;
    Ok(())
}

pub async fn clear(shop: &Storefront, out: &mut impl Write, yes: bool) -> Result<(), CliError> {
    shop.cart().fetch_cart().await;
    let outcome = shop
        .cart()
        .clear_all(|prompt: &str| yes || ask(&mut *out, prompt))
        .await?;

    match outcome {
        ClearOutcome::Cleared => writeln!(out, "Cart cleared")?,
        ClearOutcome::Declined => writeln!(out, "Cart left unchanged")?,
    }
    Ok(())
}

pub async fn checkout(shop: &Storefront, out: &mut impl Write) -> Result<(), CliError> {
    shop.session().require_token().await?;
    shop.cart().fetch_cart().await;

    let receipt = shop.checkout().checkout().await?;
    writeln!(out, "{}", receipt.message)?;
    if let Some(id) = &receipt.estimate_id {
        writeln!(out, "Estimate: {id}")?;
    }
    for line in &receipt.items {
        writeln!(
            out,
            "  {} x{} @ {} = {}",
            line.name,
            line.quantity,
            line.unit_price,
            line.line_total()
        )?;
    }
    writeln!(
        out,
        "Total: {} (submitted {})",
        receipt.total,
        receipt.submitted_at.format("%Y-%m-%d %H:%M UTC")
    )?;
    Ok(())
}

async fn find_product(shop: &Storefront, id: &ProductId) -> Result<Option<Product>, CliError> {
    let mut page = 1;
    loop {
        let listing = shop.catalog().list_products(page).await?;
        if let Some(product) = listing.products.into_iter().find(|p| &p.id == id) {
            return Ok(Some(product));
        }
        if page >= listing.total_pages {
            return Ok(None);
        }
        page += 1;
    }
}

fn render_product(out: &mut impl Write, product: &Product) -> io::Result<()> {
    let stock = if product.is_available() {
        format!("{} in stock", product.quantity)
    } else {
        "out of stock".to_string()
    };
    let sale = product
        .original_price
        .filter(|original| *original > product.price)
        .map(|original| format!(" (was {original})"))
        .unwrap_or_default();
    writeln!(
        out,
        "{:<24} {:<40} {:<14} {}{}  [{}]",
        product.id.as_str(),
        product.name,
        product.category,
        product.price,
        sale,
        stock
    )
}

fn render_footer(out: &mut impl Write, listing: &ProductPage, page_size: u32) -> io::Result<()> {
    writeln!(
        out,
        "Page {} of {} ({page_size} per page)",
        listing.page, listing.total_pages
    )
}

fn render_cart(out: &mut impl Write, cart: &CartSnapshot) -> io::Result<()> {
    if cart.is_empty() {
        return writeln!(out, "Your cart is empty");
    }
    for line in cart.lines() {
        writeln!(
            out,
            "{:<24} {:<40} x{:<4} {}",
            line.product_id.as_str(),
            line.name,
            line.quantity,
            line.line_total()
        )?;
    }
    writeln!(out, "{} item(s), total {}", cart.item_count(), cart.total())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use techhub_core::{CartLine, Price};

    use super::*;

    #[test]
    fn test_render_cart_totals() {
        let cart = CartSnapshot::from_lines([
            CartLine::new("A", "CPU", Price::from_units(300), 2),
            CartLine::new("B", "RAM", Price::from_units(50), 1),
        ]);
        let mut out = Vec::new();
        render_cart(&mut out, &cart).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.ends_with("3 item(s), total $650.00\n"));
    }

    #[test]
    fn test_footer_shows_page_size() {
        let listing = ProductPage {
            products: Vec::new(),
            page: 2,
            total_pages: 5,
        };
        let mut out = Vec::new();
        render_footer(&mut out, &listing, 10).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Page 2 of 5 (10 per page)\n");
    }

    #[test]
    fn test_render_empty_cart() {
        let mut out = Vec::new();
        render_cart(&mut out, &CartSnapshot::new()).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Your cart is empty\n");
    }
}
