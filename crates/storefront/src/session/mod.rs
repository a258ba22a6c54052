//! Session store: the bearer credential and its verification state.
//!
//! The token is persisted through a [`TokenStore`] so it survives restarts.
//! A token read back from storage is trusted for presence only
//! ([`SessionState::Unverified`]); it becomes [`SessionState::Verified`] when
//! the backend issues it (login, registration) or when `GET /auth/me`
//! accepts it. A failed identity check never drops the session unless strict
//! validation is configured.

mod token_store;

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use techhub_core::UserProfile;

use crate::backend::StoreBackend;
use crate::error::AppError;

pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore};

/// Errors from the durable token store.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("session file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("session store lock poisoned")]
    Poisoned,
}

/// Verification state of the current session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionState {
    /// No token.
    #[default]
    Anonymous,
    /// Token restored from storage, not yet confirmed by the backend.
    Unverified,
    /// Token issued or confirmed by the backend.
    Verified,
}

impl SessionState {
    /// Whether a token is held, verified or not.
    #[must_use]
    pub const fn is_authenticated(self) -> bool {
        !matches!(self, Self::Anonymous)
    }
}

#[derive(Default)]
struct Slot {
    token: Option<SecretString>,
    state: SessionState,
}

struct SessionInner {
    store: Box<dyn TokenStore>,
    slot: RwLock<Slot>,
}

/// Process-wide session. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionInner>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore").finish_non_exhaustive()
    }
}

impl SessionStore {
    /// A session backed by `store`. Nothing is read until [`Self::bootstrap`].
    #[must_use]
    pub fn new(store: impl TokenStore + 'static) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                store: Box::new(store),
                slot: RwLock::new(Slot::default()),
            }),
        }
    }

    /// Restore the token from durable storage.
    ///
    /// A present token marks the session authenticated but unverified.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be read.
    #[instrument(skip(self))]
    pub async fn bootstrap(&self) -> Result<SessionState, SessionError> {
        let token = self.inner.store.load()?;
        let mut slot = self.inner.slot.write().await;
        slot.state = if token.is_some() {
            SessionState::Unverified
        } else {
            SessionState::Anonymous
        };
        slot.token = token;
        debug!(state = ?slot.state, "Session restored");
        Ok(slot.state)
    }

    /// Persist a token the backend just issued.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be written; the in-memory session is
    /// still replaced so the current run stays signed in.
    #[instrument(skip_all)]
    pub async fn set_session(&self, token: SecretString) -> Result<(), SessionError> {
        let saved = self.inner.store.save(&token);
        {
            let mut slot = self.inner.slot.write().await;
            slot.token = Some(token);
            slot.state = SessionState::Verified;
        }
        info!("Session established");
        saved
    }

    /// Forget the token, in memory and on disk.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be erased; the in-memory session is
    /// cleared regardless.
    #[instrument(skip(self))]
    pub async fn clear_session(&self) -> Result<(), SessionError> {
        {
            let mut slot = self.inner.slot.write().await;
            *slot = Slot::default();
        }
        info!("Session cleared");
        self.inner.store.clear()
    }

    /// Explicit revocation. Clears the session and records why.
    pub async fn revoke(&self, reason: &str) {
        warn!(reason, "Revoking session");
        crate::error::add_breadcrumb("session", "Session revoked", Some(&[("reason", reason)]));
        if let Err(e) = self.clear_session().await {
            tracing::error!(error = %e, "Failed to erase revoked session token");
        }
    }

    /// The current token, if any.
    pub async fn token(&self) -> Option<SecretString> {
        self.inner.slot.read().await.token.clone()
    }

    /// The current token, or [`AppError::Unauthenticated`].
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unauthenticated` when no token is held.
    pub async fn require_token(&self) -> Result<SecretString, AppError> {
        self.token().await.ok_or(AppError::Unauthenticated)
    }

    /// Whether a token is held.
    pub async fn is_authenticated(&self) -> bool {
        self.state().await.is_authenticated()
    }

    /// Current verification state.
    pub async fn state(&self) -> SessionState {
        self.inner.slot.read().await.state
    }

    /// Confirm the held token with `GET /auth/me`.
    ///
    /// Returns the backend's profile on success. Failures are logged and leave
    /// the session untouched, except that with `strict` a 401/403 revokes it.
    #[instrument(skip(self, backend))]
    pub async fn verify<B: StoreBackend>(&self, backend: &B, strict: bool) -> Option<UserProfile> {
        let token = self.token().await?;

        match backend.me(&token).await {
            Ok(profile) => {
                let mut slot = self.inner.slot.write().await;
                // A login or logout may have replaced the token meanwhile.
                if is_same_token(slot.token.as_ref(), &token) {
                    slot.state = SessionState::Verified;
                    debug!("Session verified");
                }
                if profile.is_none() {
                    debug!("Identity response carried no profile");
                }
                profile
            }
            Err(e) if strict && e.is_auth_rejection() => {
                if is_same_token(self.token().await.as_ref(), &token) {
                    self.revoke(&format!("identity check rejected: {e}")).await;
                }
                None
            }
            Err(e) => {
                warn!(error = %e, "Identity check failed; keeping session");
                None
            }
        }
    }
}

fn is_same_token(current: Option<&SecretString>, expected: &SecretString) -> bool {
    current.is_some_and(|t| t.expose_secret() == expected.expose_secret())
}
