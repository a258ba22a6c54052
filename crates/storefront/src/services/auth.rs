//! Account service.
//!
//! Login, registration and password reset against the TechHub backend. Every
//! form is validated before any request is made.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tracing::{info, instrument};

use techhub_core::UserProfile;

use crate::backend::{AuthSession, RegisterRequest, StoreBackend};
use crate::error::{AppError, Result, ValidationError, add_breadcrumb};
use crate::services::profile::ProfileService;
use crate::services::validation;
use crate::session::SessionStore;

/// Message shown when a password change is confirmed without one.
pub const PASSWORD_UPDATED_MESSAGE: &str = "Password updated successfully!";

/// Sign-up form.
#[derive(Debug, Clone)]
pub struct RegistrationForm {
    pub username: String,
    pub email: String,
    pub password: SecretString,
    pub company_name: String,
    pub contact_person: String,
    pub phone: String,
    /// Business category, chosen from the storefront's list.
    pub category: String,
}

/// Result of a registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// The backend issued a token; the user is signed in.
    SignedIn(UserProfile),
    /// Account created; the user still has to log in.
    LoginRequired { message: Option<String> },
}

/// Login, registration and password reset.
pub struct AccountService<B> {
    backend: Arc<B>,
    session: SessionStore,
    profiles: ProfileService<B>,
}

impl<B> Clone for AccountService<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            session: self.session.clone(),
            profiles: self.profiles.clone(),
        }
    }
}

impl<B: StoreBackend> AccountService<B> {
    #[must_use]
    pub const fn new(backend: Arc<B>, session: SessionStore, profiles: ProfileService<B>) -> Self {
        Self {
            backend,
            session,
            profiles,
        }
    }

    /// Sign in and persist the issued token.
    ///
    /// The profile is seeded from the login payload (or just the username)
    /// until a full fetch replaces it.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` before any request, the backend's failure,
    /// or `AppError::RemoteRejected` when no token is issued.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &SecretString) -> Result<UserProfile> {
        validation::require_filled(&[username, password.expose_secret()])?;
        validation::password(password.expose_secret(), ValidationError::PasswordTooShort)?;

        add_breadcrumb("auth", "Login", None);
        let session = self
            .backend
            .login(username, password)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Login failed");
                AppError::from_backend(e, "Login failed")
            })?;

        let Some(profile) = self.establish(session, username).await? else {
            return Err(AppError::RemoteRejected {
                status: 200,
                message: "Login failed: no token received".to_string(),
            });
        };
        info!("Logged in");
        Ok(profile)
    }

    /// Create an account. Signs in immediately if the backend issues a token.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` before any request, or the backend's
    /// failure.
    #[instrument(skip(self, form), fields(username = %form.username))]
    pub async fn register(&self, form: RegistrationForm) -> Result<Registration> {
        validation::require_filled(&[
            form.username.as_str(),
            form.email.as_str(),
            form.password.expose_secret(),
            form.company_name.as_str(),
            form.contact_person.as_str(),
            form.phone.as_str(),
            form.category.as_str(),
        ])?;
        validation::email(&form.email)?;
        validation::password(form.password.expose_secret(), ValidationError::PasswordTooShort)?;
        validation::phone(&form.phone)?;

        let request = RegisterRequest {
            username: form.username,
            email: form.email,
            password: form.password,
            company_name: form.company_name,
            contact_person: form.contact_person,
            phone: form.phone,
            category: form.category,
        };

        add_breadcrumb("auth", "Register", None);
        let session = self.backend.register(&request).await.map_err(|e| {
            tracing::error!(error = %e, "Registration failed");
            AppError::from_backend(e, "Registration failed")
        })?;

        let message = session.message.clone();
        match self.establish(session, &request.username).await? {
            Some(profile) => {
                info!("Registered and signed in");
                Ok(Registration::SignedIn(profile))
            }
            None => {
                info!("Registered; login required");
                Ok(Registration::LoginRequired { message })
            }
        }
    }

    /// Change the password of `username`. Does not touch the session.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` before any request, or the backend's
    /// failure.
    #[instrument(skip(self, current_password, new_password))]
    pub async fn forgot_password(
        &self,
        username: &str,
        current_password: &SecretString,
        new_password: &SecretString,
    ) -> Result<String> {
        validation::require_filled(&[
            username,
            current_password.expose_secret(),
            new_password.expose_secret(),
        ])?;
        validation::password(
            new_password.expose_secret(),
            ValidationError::NewPasswordTooShort,
        )?;

        let message = self
            .backend
            .forgot_password(username, current_password, new_password)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Password reset failed");
                AppError::from_backend(e, "Failed to update password")
            })?;

        info!("Password updated");
        Ok(message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| PASSWORD_UPDATED_MESSAGE.to_string()))
    }

    /// Persist the token and seed the profile. `None` when no token was issued.
    async fn establish(&self, session: AuthSession, username: &str) -> Result<Option<UserProfile>> {
        let Some(token) = session.token else {
            return Ok(None);
        };

        self.session.set_session(token).await?;

        let profile = session
            .profile
            .unwrap_or_else(|| UserProfile::for_username(username));
        self.profiles.overlay(profile.clone()).await;
        Ok(Some(profile))
    }
}
