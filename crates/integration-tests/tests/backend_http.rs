//! `HttpBackend` wire behavior against the in-process mock API.

#![allow(clippy::unwrap_used)]

use axum::http::Method;
use secrecy::SecretString;
use serde_json::{Value, json};

use techhub_core::{CartLine, Price, ProductId};
use techhub_integration_tests::{MockBackend, Reply};
use techhub_storefront::backend::{
    BackendError, EstimateRequest, HttpBackend, ProfileUpdateRequest, StoreBackend,
};

async fn setup() -> (MockBackend, HttpBackend) {
    let mock = MockBackend::start().await.unwrap();
    let backend = HttpBackend::new(&mock.config()).unwrap();
    (mock, backend)
}

fn token() -> SecretString {
    SecretString::from("tok-123")
}

// ============================================================================
// Auth
// ============================================================================

#[tokio::test]
async fn test_login_token_at_top_level() {
    let (mock, backend) = setup().await;
    mock.on(
        Method::POST,
        "/auth/login",
        Reply::ok(json!({ "success": true, "token": "abc", "user": { "username": "jane" } })),
    );

    let session = backend
        .login("jane", &SecretString::from("hunter22"))
        .await
        .unwrap();

    assert!(session.token.is_some());
    assert_eq!(session.profile.unwrap().username, "jane");
    let sent = mock.received_for(&Method::POST, "/auth/login");
    assert_eq!(
        sent[0].body,
        json!({ "username": "jane", "password": "hunter22" })
    );
    assert_eq!(sent[0].authorization, None);
}

#[tokio::test]
async fn test_login_token_nested_under_data() {
    let (mock, backend) = setup().await;
    mock.on(
        Method::POST,
        "/auth/login",
        Reply::ok(json!({ "data": { "token": "abc", "username": "jane", "companyName": "Acme" } })),
    );

    let session = backend
        .login("jane", &SecretString::from("hunter22"))
        .await
        .unwrap();

    assert!(session.token.is_some());
    assert_eq!(session.profile.unwrap().company_name, "Acme");
}

#[tokio::test]
async fn test_rejected_login_surfaces_message() {
    let (mock, backend) = setup().await;
    mock.on(
        Method::POST,
        "/auth/login",
        Reply::new(401, json!({ "success": false, "message": "Invalid credentials" })),
    );

    let err = backend
        .login("jane", &SecretString::from("wrong-pass"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        BackendError::Rejected { status: 401, message: Some(ref m) } if m == "Invalid credentials"
    ));
}

#[tokio::test]
async fn test_success_false_on_200_is_rejected() {
    let (mock, backend) = setup().await;
    mock.on(
        Method::POST,
        "/auth/forgot-password",
        Reply::ok(json!({ "success": false, "error": "Current password is incorrect" })),
    );

    let err = backend
        .forgot_password(
            "jane",
            &SecretString::from("old-pass"),
            &SecretString::from("new-pass"),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        BackendError::Rejected { status: 200, message: Some(ref m) } if m == "Current password is incorrect"
    ));
    let sent = mock.received_for(&Method::POST, "/auth/forgot-password");
    assert_eq!(
        sent[0].body,
        json!({ "username": "jane", "currentPassword": "old-pass", "newPassword": "new-pass" })
    );
}

#[tokio::test]
async fn test_identity_shapes() {
    let (mock, backend) = setup().await;
    mock.on(
        Method::GET,
        "/auth/me",
        Reply::ok(json!({ "data": { "username": "jane", "company": "Acme", "phoneNumber": "5551234567" } })),
    );
    mock.on(
        Method::GET,
        "/auth/me",
        Reply::ok(json!({ "user": { "username": "jane", "contactName": "Jane Doe", "role": "Retailer" } })),
    );
    mock.on(Method::GET, "/auth/me", Reply::ok(json!(42)));

    let first = backend.me(&token()).await.unwrap().unwrap();
    assert_eq!(first.company_name, "Acme");
    assert_eq!(first.phone, "5551234567");

    let second = backend.me(&token()).await.unwrap().unwrap();
    assert_eq!(second.contact_person, "Jane Doe");
    assert_eq!(second.category, "Retailer");

    assert_eq!(backend.me(&token()).await.unwrap(), None);

    let sent = mock.received_for(&Method::GET, "/auth/me");
    assert_eq!(sent[0].authorization.as_deref(), Some("Bearer tok-123"));
}

#[tokio::test]
async fn test_profile_update_never_sends_email() {
    let (mock, backend) = setup().await;
    mock.on(
        Method::PUT,
        "/auth/updateprofile",
        Reply::ok(json!({ "success": true })),
    );

    let request = ProfileUpdateRequest {
        company_name: "Acme Ltd".to_string(),
        contact_person: "J. Doe".to_string(),
        phone: "5559876543".to_string(),
    };
    backend.update_profile(&token(), &request).await.unwrap();

    let body = &mock.received_for(&Method::PUT, "/auth/updateprofile")[0].body;
    assert_eq!(
        body,
        &json!({ "companyName": "Acme Ltd", "contactPerson": "J. Doe", "phone": "5559876543" })
    );
    assert!(body.get("email").is_none());
}

// ============================================================================
// Catalog
// ============================================================================

#[tokio::test]
async fn test_product_list_query_and_page_count() {
    let (mock, backend) = setup().await;
    mock.on(
        Method::GET,
        "/products",
        Reply::ok(json!({
            "data": [
                { "_id": "p1", "name": "CPU", "category": "Processors", "price": 300, "quantity": 4 },
                { "name": "No id" }
            ],
            "total": 21
        })),
    );

    let page = backend.list_products(2, 10).await.unwrap();

    assert_eq!(page.page, 2);
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.products.len(), 1);
    assert_eq!(page.products[0].id, ProductId::new("p1"));
    let sent = mock.received_for(&Method::GET, "/products");
    assert_eq!(sent[0].query.as_deref(), Some("page=2&limit=10"));
}

#[tokio::test]
async fn test_rate_limit_reports_retry_after() {
    let (mock, backend) = setup().await;
    mock.on(Method::GET, "/products", Reply::rate_limited(7));

    let err = backend.list_products(1, 10).await.unwrap_err();
    assert!(matches!(err, BackendError::RateLimited { retry_after: 7 }));
}

// ============================================================================
// Cart
// ============================================================================

#[tokio::test]
async fn test_cart_envelopes() {
    let (mock, backend) = setup().await;
    let expected = vec![CartLine::new("p1", "X", Price::from_units(10), 2)];

    let bodies = [
        json!({ "success": true, "data": { "items": [
            { "productId": { "id": "p1" }, "name": "X", "price": 10, "quantity": 2 }
        ] } }),
        json!({ "cart": { "items": [
            { "productId": { "_id": "p1", "name": "X", "price": 10 }, "quantity": 2 }
        ] } }),
        json!({ "items": [
            { "productId": "p1", "name": "X", "price": 10, "quantity": 2 }
        ] }),
    ];
    for body in &bodies {
        mock.on(Method::GET, "/cart", Reply::ok(body.clone()));
    }

    for _ in &bodies {
        assert_eq!(backend.get_cart(&token()).await.unwrap(), expected);
    }
    assert_eq!(mock.received_for(&Method::GET, "/cart").len(), 3);
}

#[tokio::test]
async fn test_cart_writes_hit_expected_routes() {
    let (mock, backend) = setup().await;
    let ok = Reply::ok(json!({ "success": true }));
    mock.on(Method::POST, "/cart", ok.clone());
    mock.on(Method::PUT, "/cart/item/sku%201%2Fa", ok.clone());
    mock.on(Method::DELETE, "/cart/item/sku%201%2Fa", ok.clone());
    mock.on(Method::DELETE, "/cart", ok);

    let id = ProductId::new("sku 1/a");
    backend.add_to_cart(&token(), &id, 1).await.unwrap();
    backend.update_cart_item(&token(), &id, 4).await.unwrap();
    backend.remove_cart_item(&token(), &id).await.unwrap();
    backend.clear_cart(&token()).await.unwrap();

    let received = mock.received();
    let routes: Vec<(Method, &str)> = received
        .iter()
        .map(|r| (r.method.clone(), r.path.as_str()))
        .collect();
    assert_eq!(
        routes,
        vec![
            (Method::POST, "/cart"),
            (Method::PUT, "/cart/item/sku%201%2Fa"),
            (Method::DELETE, "/cart/item/sku%201%2Fa"),
            (Method::DELETE, "/cart"),
        ]
    );
    assert_eq!(received[0].body, json!({ "productId": "sku 1/a", "quantity": 1 }));
    assert_eq!(received[1].body, json!({ "quantity": 4 }));
    assert_eq!(received[2].body, Value::Null);
}

#[tokio::test]
async fn test_missing_cart_line_is_rejected_with_message() {
    let (mock, backend) = setup().await;
    mock.on(
        Method::DELETE,
        "/cart/item/gone",
        Reply::new(404, json!({ "message": "Cart item not found" })),
    );

    let err = backend
        .remove_cart_item(&token(), &ProductId::new("gone"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BackendError::Rejected { status: 404, message: Some(ref m) } if m == "Cart item not found"
    ));
}

// ============================================================================
// Estimates
// ============================================================================

#[tokio::test]
async fn test_estimate_body_and_receipt() {
    let (mock, backend) = setup().await;
    mock.on(
        Method::POST,
        "/estimate/create",
        Reply::ok(json!({ "success": true, "data": { "_id": "est-9" }, "message": "Estimate created" })),
    );

    let snapshot = techhub_core::CartSnapshot::from_lines([
        CartLine::new("A", "CPU", Price::from_units(300), 2),
        CartLine::new("B", "RAM", Price::from_units(50), 1),
    ]);
    let receipt = backend
        .create_estimate(&token(), &EstimateRequest::from_snapshot(&snapshot))
        .await
        .unwrap();

    assert_eq!(receipt.id.unwrap().as_str(), "est-9");
    assert_eq!(receipt.message.as_deref(), Some("Estimate created"));
    let body = &mock.received_for(&Method::POST, "/estimate/create")[0].body;
    assert_eq!(
        body,
        &json!({ "items": [
            { "productId": "A", "quantity": 2, "price": 300.0 },
            { "productId": "B", "quantity": 1, "price": 50.0 }
        ] })
    );
}

#[tokio::test]
async fn test_unparseable_body_is_parse_error() {
    let (mock, backend) = setup().await;
    mock.on(Method::POST, "/estimate/create", Reply::ok(json!("not an object")));

    let snapshot =
        techhub_core::CartSnapshot::from_lines([CartLine::new("A", "CPU", Price::from_units(1), 1)]);
    let err = backend
        .create_estimate(&token(), &EstimateRequest::from_snapshot(&snapshot))
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::Parse(_)));
}
