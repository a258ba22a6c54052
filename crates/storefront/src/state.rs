//! Storefront state shared by every presentation entry point.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, instrument};

use techhub_core::UserProfile;

use crate::backend::{BackendError, HttpBackend, StoreBackend};
use crate::config::StorefrontConfig;
use crate::error::Result;
use crate::services::auth::AccountService;
use crate::services::cart::CartSynchronizer;
use crate::services::catalog::CatalogService;
use crate::services::checkout::CheckoutService;
use crate::services::profile::ProfileService;
use crate::session::{FileTokenStore, SessionError, SessionState, SessionStore, TokenStore};

/// Every service wired over one backend and one session.
///
/// This struct is cheaply cloneable via `Arc`; clones share the cart, the
/// profile and the session.
pub struct Storefront<B = HttpBackend> {
    inner: Arc<StorefrontInner<B>>,
}

struct StorefrontInner<B> {
    config: StorefrontConfig,
    backend: Arc<B>,
    session: SessionStore,
    cart: CartSynchronizer<B>,
    checkout: CheckoutService<B>,
    profile: ProfileService<B>,
    catalog: CatalogService<B>,
    account: AccountService<B>,
}

impl<B> Clone for Storefront<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Storefront {
    /// Create a storefront talking HTTP to the configured backend, with the
    /// token persisted in the configured session file.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: StorefrontConfig) -> std::result::Result<Self, BackendError> {
        let backend = HttpBackend::new(&config)?;
        let store = FileTokenStore::new(config.session_file.clone());
        Ok(Self::with_backend(config, backend, store))
    }
}

impl<B: StoreBackend> Storefront<B> {
    /// Create a storefront over any backend and token store.
    #[must_use]
    pub fn with_backend(
        config: StorefrontConfig,
        backend: B,
        store: impl TokenStore + 'static,
    ) -> Self {
        let backend = Arc::new(backend);
        let session = SessionStore::new(store);
        let cart = CartSynchronizer::new(Arc::clone(&backend), session.clone(), config.cart);
        let checkout = CheckoutService::new(
            Arc::clone(&backend),
            session.clone(),
            cart.clone(),
            config.checkout_settle,
        );
        let profile = ProfileService::new(Arc::clone(&backend), session.clone());
        let catalog = CatalogService::new(
            Arc::clone(&backend),
            config.page_size,
            config.cart.rate_limit_backoff,
        );
        let account = AccountService::new(Arc::clone(&backend), session.clone(), profile.clone());

        Self {
            inner: Arc::new(StorefrontInner {
                config,
                backend,
                session,
                cart,
                checkout,
                profile,
                catalog,
                account,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.inner.backend
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    #[must_use]
    pub fn cart(&self) -> &CartSynchronizer<B> {
        &self.inner.cart
    }

    #[must_use]
    pub fn checkout(&self) -> &CheckoutService<B> {
        &self.inner.checkout
    }

    #[must_use]
    pub fn profile(&self) -> &ProfileService<B> {
        &self.inner.profile
    }

    #[must_use]
    pub fn catalog(&self) -> &CatalogService<B> {
        &self.inner.catalog
    }

    #[must_use]
    pub fn account(&self) -> &AccountService<B> {
        &self.inner.account
    }

    /// Restore the persisted session.
    ///
    /// A stored token makes the session authenticated right away. The
    /// identity check runs in the background and only enriches the profile;
    /// await the returned handle to wait for it.
    ///
    /// # Errors
    ///
    /// Returns error if the token store cannot be read.
    #[instrument(skip(self))]
    pub async fn bootstrap(
        &self,
    ) -> std::result::Result<(SessionState, JoinHandle<Option<UserProfile>>), SessionError> {
        let state = self.inner.session.bootstrap().await?;

        let this = self.clone();
        let verify = tokio::spawn(async move {
            let inner = &this.inner;
            let profile = inner
                .session
                .verify(inner.backend.as_ref(), inner.config.strict_session_validation)
                .await?;
            if inner.session.is_authenticated().await {
                inner.profile.overlay(profile.clone()).await;
                debug!(username = %profile.username, "Profile seeded from identity check");
            }
            Some(profile)
        });

        Ok((state, verify))
    }

    /// Sign out: forget the token, the cart and the profile.
    ///
    /// Local state is dropped even if the token file cannot be removed.
    ///
    /// # Errors
    ///
    /// Returns error if the token store cannot be cleared.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<()> {
        self.inner.cart.cancel_pending().await;
        self.inner.cart.clear_local().await;
        self.inner.profile.reset().await;
        self.inner.session.clear_session().await?;
        debug!("Logged out");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use techhub_core::{CartLine, Price};

    use super::*;
    use crate::session::MemoryTokenStore;
    use crate::testing::{Call, FakeBackend, Op};

    fn jane() -> UserProfile {
        UserProfile {
            email: "jane@acme.com".to_string(),
            ..UserProfile::for_username("jane")
        }
    }

    fn storefront(store: MemoryTokenStore) -> Storefront<FakeBackend> {
        Storefront::with_backend(StorefrontConfig::default(), FakeBackend::new(), store)
    }

    #[tokio::test]
    async fn test_bootstrap_without_token_is_anonymous() {
        let shop = storefront(MemoryTokenStore::new());

        let (state, verify) = shop.bootstrap().await.unwrap();
        assert_eq!(state, SessionState::Anonymous);
        assert_eq!(verify.await.unwrap(), None);
        assert!(shop.backend().calls().is_empty());
    }

    #[tokio::test]
    async fn test_bootstrap_seeds_profile() {
        let shop = storefront(MemoryTokenStore::with_token("tok"));
        shop.backend().set_identity(jane());

        let (state, verify) = shop.bootstrap().await.unwrap();
        assert_eq!(state, SessionState::Unverified);
        assert_eq!(verify.await.unwrap(), Some(jane()));
        assert_eq!(shop.session().state().await, SessionState::Verified);
        assert_eq!(shop.profile().profile().await, jane());
    }

    #[tokio::test]
    async fn test_bootstrap_keeps_rejected_token_by_default() {
        let shop = storefront(MemoryTokenStore::with_token("stale"));
        shop.backend().fail_next(
            Op::Me,
            BackendError::Rejected {
                status: 401,
                message: None,
            },
        );

        let (_, verify) = shop.bootstrap().await.unwrap();
        assert_eq!(verify.await.unwrap(), None);
        assert!(shop.session().is_authenticated().await);
        assert_eq!(shop.session().state().await, SessionState::Unverified);
    }

    #[tokio::test]
    async fn test_logout_drops_local_state() {
        let shop = storefront(MemoryTokenStore::with_token("tok"));
        shop.backend().set_identity(jane());
        shop.backend()
            .set_server_cart(vec![CartLine::new("A", "CPU", Price::from_units(300), 1)]);
        let (_, verify) = shop.bootstrap().await.unwrap();
        verify.await.unwrap();
        shop.cart().fetch_cart().await;
        assert_eq!(shop.cart().snapshot().await.len(), 1);

        shop.logout().await.unwrap();

        assert!(!shop.session().is_authenticated().await);
        assert!(shop.cart().snapshot().await.is_empty());
        assert_eq!(shop.profile().profile().await, UserProfile::default());
        assert!(!shop.backend().calls().contains(&Call::Clear));
    }
}
