//! Normalization of raw backend responses into `techhub_core` types.
//!
//! Every entity the backend returns in more than one shape is parsed into a
//! tagged union first (see `types`); the functions here collapse each union
//! into the single canonical form the rest of the crate works with.

use secrecy::SecretString;
use serde_json::Value;
use tracing::warn;

use techhub_core::{
    CartLine, DEFAULT_CATEGORY, EstimateId, Price, Product, ProductId, ProductImage, ProductPage,
    UserProfile,
};

use super::types::{
    CartEnvelope, IdentityEnvelope, PopulatedProduct, ProductRef, RawAuthResponse, RawCartItem,
    RawEstimateResponse, RawProduct, RawProductList, RawProfile, StatusBody,
};
use super::{AuthSession, BackendError, EstimateReceipt};

/// Loose text value: empty strings count as absent, numbers are rendered.
fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// First candidate that carries text.
fn first_text<const N: usize>(candidates: [Option<&Value>; N]) -> Option<String> {
    candidates.into_iter().find_map(text)
}

/// Backend message from a `message` (or `error`) field.
pub(super) fn message_of(status: &StatusBody) -> Option<String> {
    first_text([status.message.as_ref(), status.error.as_ref()])
}

pub(super) fn profile_from_raw(raw: &RawProfile) -> UserProfile {
    UserProfile {
        username: first_text([raw.username.as_ref(), raw.name.as_ref()]).unwrap_or_default(),
        email: text(raw.email.as_ref()).unwrap_or_default(),
        company_name: first_text([
            raw.company_name_camel.as_ref(),
            raw.company_name_snake.as_ref(),
            raw.company.as_ref(),
        ])
        .unwrap_or_default(),
        contact_person: first_text([
            raw.contact_person_camel.as_ref(),
            raw.contact_person_snake.as_ref(),
            raw.contact_name.as_ref(),
        ])
        .unwrap_or_default(),
        phone: first_text([
            raw.phone.as_ref(),
            raw.phone_number_camel.as_ref(),
            raw.phone_number_snake.as_ref(),
        ])
        .unwrap_or_default(),
        category: first_text([raw.role.as_ref(), raw.category.as_ref()])
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
    }
}

/// Normalize a `/auth/me` body.
///
/// Returns `None` when the payload matches no known shape or carries no
/// profile fields at all.
pub(super) fn normalize_identity(envelope: IdentityEnvelope) -> Option<UserProfile> {
    let raw = match envelope {
        IdentityEnvelope::Data { data } => data,
        IdentityEnvelope::User { user } => user,
        IdentityEnvelope::Bare(raw) => raw,
        IdentityEnvelope::Unknown(value) => {
            warn!(shape = %value_kind(&value), "Unrecognized identity payload");
            return None;
        }
    };

    let profile = profile_from_raw(&raw);
    let has_fields = !UserProfile {
        category: String::new(),
        ..profile.clone()
    }
    .is_blank();

    if has_fields {
        Some(profile)
    } else {
        warn!("Identity payload carried no profile fields");
        None
    }
}

/// Normalize a login or register body.
pub(super) fn normalize_auth(raw: RawAuthResponse) -> AuthSession {
    let RawAuthResponse {
        token,
        user,
        data,
        message,
    } = raw;

    let (data_token, data_user, data_profile) = match data {
        Some(d) => (d.token, d.user, Some(d.profile)),
        None => (None, None, None),
    };

    let token = token
        .or(data_token)
        .filter(|t| !t.is_empty())
        .map(SecretString::from);

    let profile = user
        .or(data_user)
        .or(data_profile)
        .map(|raw| profile_from_raw(&raw))
        .filter(|p| !p.username.is_empty() || !p.email.is_empty());

    AuthSession {
        token,
        profile,
        message: text(message.as_ref()),
    }
}

fn product_id_of(populated: &PopulatedProduct) -> Option<ProductId> {
    populated
        .object_id
        .as_deref()
        .or(populated.id.as_deref())
        .filter(|id| !id.is_empty())
        .map(ProductId::from)
}

fn cart_line_from_raw(item: Value) -> Option<CartLine> {
    let item: RawCartItem = match serde_json::from_value(item) {
        Ok(item) => item,
        Err(e) => {
            warn!(error = %e, "Skipping unreadable cart item");
            return None;
        }
    };
    let reference = item.product_id.or(item.product);

    let (product_id, populated) = match reference {
        Some(ProductRef::Id(id)) if !id.is_empty() => (ProductId::new(id), None),
        Some(ProductRef::Populated(p)) => (product_id_of(&p)?, Some(p)),
        _ => return None,
    };

    let (populated_name, populated_price) = populated.map_or((None, None), |p| (p.name, p.price));

    Some(CartLine {
        product_id,
        name: item
            .name
            .filter(|n| !n.is_empty())
            .or(populated_name)
            .unwrap_or_default(),
        unit_price: item.price.or(populated_price).unwrap_or(Price::ZERO),
        quantity: item.quantity.unwrap_or(1),
    })
}

/// Normalize a `GET /cart` body into cart lines.
///
/// Items that do not parse or have no resolvable product ID are skipped.
/// An unrecognized
/// envelope is a parse error so the caller keeps its current snapshot.
pub(super) fn normalize_cart(envelope: CartEnvelope) -> Result<Vec<CartLine>, BackendError> {
    let items = match envelope {
        CartEnvelope::Data { data: body }
        | CartEnvelope::Cart { cart: body }
        | CartEnvelope::Bare(body) => body.items,
        CartEnvelope::DataItems { data } => data,
        CartEnvelope::NoCart { .. } => Vec::new(),
        CartEnvelope::Unknown(value) => {
            return Err(BackendError::Parse(format!(
                "unrecognized cart payload ({})",
                value_kind(&value)
            )));
        }
    };

    let total = items.len();
    let lines: Vec<CartLine> = items.into_iter().filter_map(cart_line_from_raw).collect();
    if lines.len() < total {
        warn!(
            skipped = total - lines.len(),
            "Skipped cart items that could not be used"
        );
    }
    Ok(lines)
}

fn product_from_raw(raw: RawProduct) -> Option<Product> {
    let id = raw
        .object_id
        .or(raw.id)
        .filter(|id| !id.is_empty())
        .map(ProductId::new)?;

    Some(Product {
        id,
        name: raw.name,
        category: raw.category,
        price: raw.price,
        original_price: raw.original_price,
        discount_percentage: raw.discount_percentage,
        rating: raw.rating,
        number_of_reviews: raw.number_of_reviews,
        main_image: raw.main_image.map(|img| ProductImage {
            public_id: img.public_id,
            url: img.url,
        }),
        quantity: raw.quantity,
        is_active: raw.is_active,
    })
}

/// Normalize a `GET /products` body.
///
/// Total pages comes from `totalPages` when positive, otherwise from
/// `total` (or `count`) divided by `limit`, and is never below one.
pub(super) fn normalize_product_page(raw: RawProductList, page: u32, limit: u32) -> ProductPage {
    let total_pages = raw
        .total_pages
        .filter(|&n| n > 0)
        .or_else(|| {
            let total = raw.total.or(raw.count)?;
            let per_page = u64::from(limit.max(1));
            u32::try_from(total.div_ceil(per_page)).ok()
        })
        .unwrap_or(1)
        .max(1);

    let raw_products = raw.products.or(raw.data).unwrap_or_default();
    let total = raw_products.len();
    let products: Vec<Product> = raw_products.into_iter().filter_map(product_from_raw).collect();
    if products.len() < total {
        warn!(
            skipped = total - products.len(),
            "Skipped products without an ID"
        );
    }

    ProductPage {
        products,
        page,
        total_pages,
    }
}

/// Normalize a `POST /estimate/create` body.
pub(super) fn normalize_estimate(raw: RawEstimateResponse) -> EstimateReceipt {
    let id = raw
        .data
        .into_iter()
        .chain(raw.estimate)
        .find_map(|e| e.object_id.or(e.id))
        .filter(|id| !id.is_empty())
        .map(EstimateId::new);

    EstimateReceipt {
        id,
        message: text(raw.message.as_ref()),
    }
}

const fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
