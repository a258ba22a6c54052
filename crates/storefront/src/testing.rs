//! In-memory recording backend for unit tests.

#![allow(clippy::unwrap_used)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use secrecy::SecretString;

use techhub_core::{CartLine, Price, Product, ProductId, ProductPage, UserProfile};

use crate::backend::{
    AuthSession, BackendError, EstimateReceipt, EstimateRequest, ProfileUpdateRequest,
    RegisterRequest, StoreBackend,
};

/// Endpoint selector for scripted failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Login,
    Register,
    ForgotPassword,
    Me,
    UpdateProfile,
    ListProducts,
    GetCart,
    Add,
    Update,
    Remove,
    Clear,
    Estimate,
}

/// One recorded request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Login(String),
    Register(String),
    ForgotPassword(String),
    Me,
    UpdateProfile(ProfileUpdateRequest),
    ListProducts { page: u32, limit: u32 },
    GetCart,
    Add(ProductId, u32),
    Update(ProductId, u32),
    Remove(ProductId),
    Clear,
    Estimate(EstimateRequest),
}

impl Call {
    /// Whether the call mutates the remote cart.
    pub const fn is_cart_write(&self) -> bool {
        matches!(
            self,
            Self::Add(..) | Self::Update(..) | Self::Remove(_) | Self::Clear
        )
    }
}

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    failures: HashMap<Op, VecDeque<BackendError>>,
    catalog: HashMap<ProductId, (String, Price)>,
    cart: Vec<CartLine>,
    get_cart_delays: VecDeque<Duration>,
    updates_unsupported: bool,
    identity: Option<UserProfile>,
    login: AuthSession,
    register: AuthSession,
    forgot_password_message: Option<String>,
    products: Vec<Product>,
    total_pages: u32,
    estimate: EstimateReceipt,
}

/// A scriptable [`StoreBackend`] that keeps a server-side cart in memory and
/// records every call.
#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<State>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    /// Register a product so server-side adds know its name and price.
    pub fn with_product(self, id: &str, name: &str, price: Price) -> Self {
        self.with_state(|s| {
            s.catalog
                .insert(ProductId::new(id), (name.to_string(), price));
        });
        self
    }

    /// Make the next call to `op` fail with `err`. Failures queue up.
    pub fn fail_next(&self, op: Op, err: BackendError) {
        self.with_state(|s| s.failures.entry(op).or_default().push_back(err));
    }

    /// Reject every `PUT /cart/item/:id` with 404.
    pub fn reject_updates(&self) {
        self.with_state(|s| s.updates_unsupported = true);
    }

    /// Delay the response of the next `GET /cart`. The response content is
    /// taken when the request arrives, not when it completes.
    pub fn delay_next_get_cart(&self, delay: Duration) {
        self.with_state(|s| s.get_cart_delays.push_back(delay));
    }

    /// Replace the server cart, as another device would.
    pub fn set_server_cart(&self, lines: Vec<CartLine>) {
        self.with_state(|s| s.cart = lines);
    }

    pub fn server_cart(&self) -> Vec<CartLine> {
        self.with_state(|s| s.cart.clone())
    }

    pub fn set_identity(&self, profile: UserProfile) {
        self.with_state(|s| s.identity = Some(profile));
    }

    pub fn set_login_response(&self, session: AuthSession) {
        self.with_state(|s| s.login = session);
    }

    pub fn set_register_response(&self, session: AuthSession) {
        self.with_state(|s| s.register = session);
    }

    pub fn set_forgot_password_message(&self, message: &str) {
        self.with_state(|s| s.forgot_password_message = Some(message.to_string()));
    }

    pub fn set_products(&self, products: Vec<Product>, total_pages: u32) {
        self.with_state(|s| {
            s.products = products;
            s.total_pages = total_pages;
        });
    }

    pub fn set_estimate_receipt(&self, receipt: EstimateReceipt) {
        self.with_state(|s| s.estimate = receipt);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.with_state(|s| s.calls.clone())
    }

    /// Recorded calls that mutate the remote cart, in order.
    pub fn cart_writes(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(Call::is_cart_write)
            .collect()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| matches(c)).count()
    }

    fn record(&self, op: Op, call: Call) -> Result<(), BackendError> {
        self.with_state(|s| {
            s.calls.push(call);
            s.failures
                .get_mut(&op)
                .and_then(VecDeque::pop_front)
                .map_or(Ok(()), Err)
        })
    }
}

fn not_found() -> BackendError {
    BackendError::Rejected {
        status: 404,
        message: Some("Cart item not found".to_string()),
    }
}

impl StoreBackend for FakeBackend {
    async fn login(
        &self,
        username: &str,
        _password: &SecretString,
    ) -> Result<AuthSession, BackendError> {
        self.record(Op::Login, Call::Login(username.to_string()))?;
        Ok(self.with_state(|s| s.login.clone()))
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthSession, BackendError> {
        self.record(Op::Register, Call::Register(request.username.clone()))?;
        Ok(self.with_state(|s| s.register.clone()))
    }

    async fn forgot_password(
        &self,
        username: &str,
        _current_password: &SecretString,
        _new_password: &SecretString,
    ) -> Result<Option<String>, BackendError> {
        self.record(Op::ForgotPassword, Call::ForgotPassword(username.to_string()))?;
        Ok(self.with_state(|s| s.forgot_password_message.clone()))
    }

    async fn me(&self, _token: &SecretString) -> Result<Option<UserProfile>, BackendError> {
        self.record(Op::Me, Call::Me)?;
        Ok(self.with_state(|s| s.identity.clone()))
    }

    async fn update_profile(
        &self,
        _token: &SecretString,
        request: &ProfileUpdateRequest,
    ) -> Result<(), BackendError> {
        self.record(Op::UpdateProfile, Call::UpdateProfile(request.clone()))
    }

    async fn list_products(&self, page: u32, limit: u32) -> Result<ProductPage, BackendError> {
        self.record(Op::ListProducts, Call::ListProducts { page, limit })?;
        Ok(self.with_state(|s| ProductPage {
            products: s.products.clone(),
            page,
            total_pages: s.total_pages.max(1),
        }))
    }

    async fn get_cart(&self, _token: &SecretString) -> Result<Vec<CartLine>, BackendError> {
        self.record(Op::GetCart, Call::GetCart)?;
        let (lines, delay) = self.with_state(|s| (s.cart.clone(), s.get_cart_delays.pop_front()));
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(lines)
    }

    async fn add_to_cart(
        &self,
        _token: &SecretString,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<(), BackendError> {
        self.record(Op::Add, Call::Add(product_id.clone(), quantity))?;
        self.with_state(|s| {
            if let Some(line) = s.cart.iter_mut().find(|l| &l.product_id == product_id) {
                line.quantity = line.quantity.saturating_add(quantity);
            } else {
                let (name, price) = s
                    .catalog
                    .get(product_id)
                    .cloned()
                    .unwrap_or_else(|| (String::new(), Price::ZERO));
                s.cart
                    .push(CartLine::new(product_id.clone(), name, price, quantity));
            }
        });
        Ok(())
    }

    async fn update_cart_item(
        &self,
        _token: &SecretString,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<(), BackendError> {
        self.record(Op::Update, Call::Update(product_id.clone(), quantity))?;
        self.with_state(|s| {
            if s.updates_unsupported {
                return Err(BackendError::Rejected {
                    status: 404,
                    message: None,
                });
            }
            let line = s
                .cart
                .iter_mut()
                .find(|l| &l.product_id == product_id)
                .ok_or_else(not_found)?;
            line.quantity = quantity;
            Ok(())
        })
    }

    async fn remove_cart_item(
        &self,
        _token: &SecretString,
        product_id: &ProductId,
    ) -> Result<(), BackendError> {
        self.record(Op::Remove, Call::Remove(product_id.clone()))?;
        self.with_state(|s| {
            let before = s.cart.len();
            s.cart.retain(|l| &l.product_id != product_id);
            if s.cart.len() == before {
                Err(not_found())
            } else {
                Ok(())
            }
        })
    }

    async fn clear_cart(&self, _token: &SecretString) -> Result<(), BackendError> {
        self.record(Op::Clear, Call::Clear)?;
        self.with_state(|s| s.cart.clear());
        Ok(())
    }

    async fn create_estimate(
        &self,
        _token: &SecretString,
        request: &EstimateRequest,
    ) -> Result<EstimateReceipt, BackendError> {
        self.record(Op::Estimate, Call::Estimate(request.clone()))?;
        Ok(self.with_state(|s| s.estimate.clone()))
    }
}
