//! Request bodies and raw response shapes of the backend.
//!
//! Response types mirror what the backend actually sends, including its
//! inconsistencies; `conversions` turns them into `techhub_core` types.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use techhub_core::{CartSnapshot, Price, ProductId};

// =============================================================================
// Requests
// =============================================================================

/// Input for `POST /auth/register`.
#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: SecretString,
    pub company_name: String,
    pub contact_person: String,
    pub phone: String,
    pub category: String,
}

/// Body for `PUT /auth/updateprofile`.
///
/// Email is immutable and deliberately has no field here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdateRequest {
    pub company_name: String,
    pub contact_person: String,
    pub phone: String,
}

/// One estimate line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub price: Price,
}

/// Body for `POST /estimate/create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EstimateRequest {
    pub items: Vec<EstimateItem>,
}

impl EstimateRequest {
    /// One item per cart line, in snapshot order.
    #[must_use]
    pub fn from_snapshot(snapshot: &CartSnapshot) -> Self {
        Self {
            items: snapshot
                .lines()
                .iter()
                .map(|line| EstimateItem {
                    product_id: line.product_id.clone(),
                    quantity: line.quantity,
                    price: line.unit_price,
                })
                .collect(),
        }
    }
}

#[derive(Serialize)]
pub(super) struct LoginBody<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RegisterBody<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub company_name: &'a str,
    pub contact_person: &'a str,
    pub phone: &'a str,
    pub category: &'a str,
}

impl<'a> From<&'a RegisterRequest> for RegisterBody<'a> {
    fn from(r: &'a RegisterRequest) -> Self {
        Self {
            username: &r.username,
            email: &r.email,
            password: r.password.expose_secret(),
            company_name: &r.company_name,
            contact_person: &r.contact_person,
            phone: &r.phone,
            category: &r.category,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ForgotPasswordBody<'a> {
    pub username: &'a str,
    pub current_password: &'a str,
    pub new_password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AddToCartBody<'a> {
    pub product_id: &'a ProductId,
    pub quantity: u32,
}

#[derive(Serialize)]
pub(super) struct UpdateQuantityBody {
    pub quantity: u32,
}

// =============================================================================
// Responses
// =============================================================================

/// Fields every response may carry.
#[derive(Debug, Default, Deserialize)]
pub(super) struct StatusBody {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
}

/// A user object under any of the aliases the backend has used.
///
/// Values stay loosely typed: phone numbers sometimes arrive as numbers.
#[derive(Debug, Default, Deserialize)]
pub(super) struct RawProfile {
    pub username: Option<Value>,
    pub name: Option<Value>,
    pub email: Option<Value>,
    #[serde(rename = "companyName")]
    pub company_name_camel: Option<Value>,
    #[serde(rename = "company_name")]
    pub company_name_snake: Option<Value>,
    pub company: Option<Value>,
    #[serde(rename = "contactPerson")]
    pub contact_person_camel: Option<Value>,
    #[serde(rename = "contact_person")]
    pub contact_person_snake: Option<Value>,
    #[serde(rename = "contactName")]
    pub contact_name: Option<Value>,
    pub phone: Option<Value>,
    #[serde(rename = "phoneNumber")]
    pub phone_number_camel: Option<Value>,
    #[serde(rename = "phone_number")]
    pub phone_number_snake: Option<Value>,
    pub role: Option<Value>,
    pub category: Option<Value>,
}

/// Known envelopes around the identity payload.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum IdentityEnvelope {
    Data { data: RawProfile },
    User { user: RawProfile },
    Bare(RawProfile),
    Unknown(Value),
}

/// Login / register response. Token and user may sit at the top level or
/// under `data`.
#[derive(Debug, Default, Deserialize)]
pub(super) struct RawAuthResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<RawProfile>,
    #[serde(default)]
    pub data: Option<RawAuthData>,
    #[serde(default)]
    pub message: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct RawAuthData {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<RawProfile>,
    #[serde(flatten)]
    pub profile: RawProfile,
}

/// `productId` on a cart item: a bare ID or a populated product document.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum ProductRef {
    Id(String),
    Populated(PopulatedProduct),
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct PopulatedProduct {
    #[serde(rename = "_id")]
    pub object_id: Option<String>,
    pub id: Option<String>,
    pub name: Option<String>,
    pub price: Option<Price>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RawCartItem {
    #[serde(rename = "productId")]
    pub product_id: Option<ProductRef>,
    pub product: Option<ProductRef>,
    pub name: Option<String>,
    pub price: Option<Price>,
    pub quantity: Option<u32>,
}

/// Items stay raw here so one malformed item cannot sink the whole cart.
#[derive(Debug, Deserialize)]
pub(super) struct RawCartBody {
    pub items: Vec<Value>,
}

/// Known envelopes around the cart.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum CartEnvelope {
    Data { data: RawCartBody },
    DataItems { data: Vec<Value> },
    Cart { cart: RawCartBody },
    Bare(RawCartBody),
    /// `{"data": null}`: the account has no cart yet.
    NoCart { data: () },
    Unknown(Value),
}

#[derive(Debug, Deserialize)]
pub(super) struct RawImage {
    #[serde(default)]
    pub public_id: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RawProduct {
    #[serde(rename = "_id")]
    pub object_id: Option<String>,
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub price: Price,
    pub original_price: Option<Price>,
    pub discount_percentage: Option<f64>,
    pub rating: Option<f64>,
    pub number_of_reviews: Option<u32>,
    pub main_image: Option<RawImage>,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

const fn default_true() -> bool {
    true
}

/// Product listing; products under `products` or `data`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RawProductList {
    #[serde(default)]
    pub products: Option<Vec<RawProduct>>,
    #[serde(default)]
    pub data: Option<Vec<RawProduct>>,
    #[serde(default)]
    pub total_pages: Option<u32>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub count: Option<u64>,
}

/// Estimate creation response.
#[derive(Debug, Default, Deserialize)]
pub(super) struct RawEstimateResponse {
    #[serde(default)]
    pub data: Option<RawEstimate>,
    #[serde(default)]
    pub estimate: Option<RawEstimate>,
    #[serde(default)]
    pub message: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct RawEstimate {
    #[serde(rename = "_id")]
    pub object_id: Option<String>,
    pub id: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use techhub_core::CartLine;

    use super::*;

    #[test]
    fn test_profile_update_body_has_no_email() {
        let body = serde_json::to_value(ProfileUpdateRequest {
            company_name: "Acme".to_string(),
            contact_person: "Jane".to_string(),
            phone: "5551234567".to_string(),
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "companyName": "Acme",
                "contactPerson": "Jane",
                "phone": "5551234567"
            })
        );
    }

    #[test]
    fn test_estimate_request_from_snapshot() {
        let snapshot = CartSnapshot::from_lines([
            CartLine::new("p1", "CPU", Price::from_units(300), 2),
            CartLine::new("p2", "RAM", Price::from_cents(4999), 1),
        ]);
        let body = serde_json::to_value(EstimateRequest::from_snapshot(&snapshot)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "items": [
                    {"productId": "p1", "quantity": 2, "price": 300.0},
                    {"productId": "p2", "quantity": 1, "price": 49.99}
                ]
            })
        );
    }

    #[test]
    fn test_register_body_exposes_password_only_on_wire() {
        let request = RegisterRequest {
            username: "jane".to_string(),
            email: "jane@acme.com".to_string(),
            password: SecretString::from("hunter22"),
            company_name: "Acme".to_string(),
            contact_person: "Jane".to_string(),
            phone: "5551234567".to_string(),
            category: "Retail".to_string(),
        };
        assert!(!format!("{request:?}").contains("hunter22"));
        let body = serde_json::to_value(RegisterBody::from(&request)).unwrap();
        assert_eq!(body["password"], "hunter22");
        assert_eq!(body["companyName"], "Acme");
    }
}
