//! Profile synchronizer.
//!
//! Holds the signed-in account's profile, fetched from `GET /auth/me` and
//! edited through `PUT /auth/updateprofile`. Email is read-only: it is
//! validated as part of the form but never sent.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use techhub_core::{DEFAULT_CATEGORY, UserProfile};

use crate::backend::{ProfileUpdateRequest, StoreBackend};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::services::validation;
use crate::session::SessionStore;

/// Editable profile form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileFields {
    pub company_name: String,
    pub contact_person: String,
    /// Checked for well-formedness only; the backend never receives it.
    pub email: String,
    pub phone: String,
}

impl From<&UserProfile> for ProfileFields {
    fn from(profile: &UserProfile) -> Self {
        Self {
            company_name: profile.company_name.clone(),
            contact_person: profile.contact_person.clone(),
            email: profile.email.clone(),
            phone: profile.phone.clone(),
        }
    }
}

#[derive(Default)]
struct ProfileState {
    profile: UserProfile,
    editing: bool,
}

/// Local copy of the account profile. Cheap to clone; clones share state.
pub struct ProfileService<B> {
    backend: Arc<B>,
    session: SessionStore,
    state: Arc<Mutex<ProfileState>>,
}

impl<B> Clone for ProfileService<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            session: self.session.clone(),
            state: Arc::clone(&self.state),
        }
    }
}

impl<B: StoreBackend> ProfileService<B> {
    #[must_use]
    pub fn new(backend: Arc<B>, session: SessionStore) -> Self {
        Self {
            backend,
            session,
            state: Arc::new(Mutex::new(ProfileState::default())),
        }
    }

    /// Copy of the local profile.
    pub async fn profile(&self) -> UserProfile {
        self.state.lock().await.profile.clone()
    }

    /// Seed the profile with what login returned, until a fetch replaces it.
    pub async fn overlay(&self, profile: UserProfile) {
        self.state.lock().await.profile = profile;
    }

    /// Forget the profile (logout).
    pub async fn reset(&self) {
        *self.state.lock().await = ProfileState::default();
    }

    /// Load the profile from the backend, replacing the local copy.
    ///
    /// A response in no recognized shape yields an empty profile.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unauthenticated` without a session, or the backend's
    /// failure.
    #[instrument(skip(self))]
    pub async fn fetch_profile(&self) -> Result<UserProfile> {
        let token = self.session.require_token().await?;

        let fetched = self.backend.me(&token).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to fetch profile");
            AppError::from_backend(e, "Failed to fetch user data")
        })?;

        let profile = fetched.unwrap_or_else(|| {
            warn!("Profile response not recognized; showing an empty profile");
            UserProfile {
                category: DEFAULT_CATEGORY.to_string(),
                ..UserProfile::default()
            }
        });

        self.state.lock().await.profile = profile.clone();
        debug!(username = %profile.username, "Profile loaded");
        Ok(profile)
    }

    pub async fn begin_edit(&self) {
        self.state.lock().await.editing = true;
    }

    pub async fn cancel_edit(&self) {
        self.state.lock().await.editing = false;
    }

    pub async fn is_editing(&self) -> bool {
        self.state.lock().await.editing
    }

    /// Validate and save the editable fields.
    ///
    /// On success the confirmed fields are merged into the local profile and
    /// edit mode ends.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` (no request is made),
    /// `AppError::Unauthenticated`, or the backend's failure.
    #[instrument(skip(self, fields))]
    pub async fn update_profile(&self, fields: ProfileFields) -> Result<UserProfile> {
        validation::require_filled(&[
            fields.company_name.as_str(),
            fields.contact_person.as_str(),
            fields.email.as_str(),
            fields.phone.as_str(),
        ])?;
        validation::email(&fields.email)?;
        validation::phone(&fields.phone)?;

        let token = self.session.require_token().await?;

        let request = ProfileUpdateRequest {
            company_name: fields.company_name,
            contact_person: fields.contact_person,
            phone: fields.phone,
        };

        add_breadcrumb("profile", "Update profile", None);
        self.backend
            .update_profile(&token, &request)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to update profile");
                AppError::from_backend(e, "Failed to update profile")
            })?;

        let mut state = self.state.lock().await;
        state.profile.company_name = request.company_name;
        state.profile.contact_person = request.contact_person;
        state.profile.phone = request.phone;
        state.editing = false;
        info!("Profile updated");
        Ok(state.profile.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::backend::BackendError;
    use crate::error::ValidationError;
    use crate::session::MemoryTokenStore;
    use crate::testing::{Call, FakeBackend, Op};

    async fn service(token: Option<&str>) -> (Arc<FakeBackend>, ProfileService<FakeBackend>) {
        let backend = Arc::new(FakeBackend::new());
        let store = token.map_or_else(MemoryTokenStore::new, MemoryTokenStore::with_token);
        let session = SessionStore::new(store);
        session.bootstrap().await.unwrap();
        (Arc::clone(&backend), ProfileService::new(backend, session))
    }

    fn jane() -> UserProfile {
        UserProfile {
            username: "jane".to_string(),
            email: "jane@acme.com".to_string(),
            company_name: "Acme".to_string(),
            contact_person: "Jane Doe".to_string(),
            phone: "5551234567".to_string(),
            category: "Retailer".to_string(),
        }
    }

    fn form() -> ProfileFields {
        ProfileFields {
            company_name: "Acme Ltd".to_string(),
            contact_person: "J. Doe".to_string(),
            email: "ignored@acme.com".to_string(),
            phone: "(555) 987-6543".to_string(),
        }
    }

    #[tokio::test]
    async fn test_fetch_replaces_overlay() {
        let (backend, profiles) = service(Some("tok")).await;
        profiles.overlay(UserProfile::for_username("jane")).await;
        backend.set_identity(jane());

        let profile = profiles.fetch_profile().await.unwrap();
        assert_eq!(profile, jane());
        assert_eq!(profiles.profile().await, jane());
    }

    #[tokio::test]
    async fn test_unrecognized_identity_yields_empty_profile() {
        let (_backend, profiles) = service(Some("tok")).await;
        profiles.overlay(UserProfile::for_username("jane")).await;

        let profile = profiles.fetch_profile().await.unwrap();
        assert_eq!(profile.username, "");
        assert_eq!(profile.category, DEFAULT_CATEGORY);
    }

    #[tokio::test]
    async fn test_fetch_requires_session() {
        let (backend, profiles) = service(None).await;
        assert!(matches!(
            profiles.fetch_profile().await,
            Err(AppError::Unauthenticated)
        ));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_failure_message() {
        let (backend, profiles) = service(Some("tok")).await;
        backend.fail_next(
            Op::Me,
            BackendError::Rejected {
                status: 500,
                message: None,
            },
        );
        let err = profiles.fetch_profile().await.unwrap_err();
        assert_eq!(err.user_message(), "Failed to fetch user data");
    }

    #[tokio::test]
    async fn test_validation_order_and_no_request() {
        let (backend, profiles) = service(Some("tok")).await;

        let cases = [
            (
                ProfileFields {
                    company_name: String::new(),
                    ..form()
                },
                ValidationError::MissingFields,
            ),
            (
                ProfileFields {
                    email: "not-an-email".to_string(),
                    phone: "12".to_string(),
                    ..form()
                },
                ValidationError::InvalidEmail,
            ),
            (
                ProfileFields {
                    phone: "555-1234".to_string(),
                    ..form()
                },
                ValidationError::InvalidPhone,
            ),
        ];

        for (fields, expected) in cases {
            let err = profiles.update_profile(fields).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(v) if v == expected));
        }
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_update_merges_and_never_sends_email() {
        let (backend, profiles) = service(Some("tok")).await;
        profiles.overlay(jane()).await;
        profiles.begin_edit().await;

        let updated = profiles.update_profile(form()).await.unwrap();

        assert_eq!(
            backend.calls(),
            vec![Call::UpdateProfile(ProfileUpdateRequest {
                company_name: "Acme Ltd".to_string(),
                contact_person: "J. Doe".to_string(),
                phone: "(555) 987-6543".to_string(),
            })]
        );
        assert_eq!(updated.company_name, "Acme Ltd");
        assert_eq!(updated.email, "jane@acme.com");
        assert!(!profiles.is_editing().await);
    }

    #[tokio::test]
    async fn test_update_failure_keeps_edit_mode() {
        let (backend, profiles) = service(Some("tok")).await;
        profiles.overlay(jane()).await;
        profiles.begin_edit().await;
        backend.fail_next(
            Op::UpdateProfile,
            BackendError::Rejected {
                status: 400,
                message: Some("Phone already in use".to_string()),
            },
        );

        let err = profiles.update_profile(form()).await.unwrap_err();
        assert_eq!(err.user_message(), "Phone already in use");
        assert!(profiles.is_editing().await);
        assert_eq!(profiles.profile().await, jane());
    }

    #[tokio::test]
    async fn test_update_requires_session_after_validation() {
        let (_backend, profiles) = service(None).await;
        let err = profiles
            .update_profile(ProfileFields::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = profiles.update_profile(form()).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated));
    }
}
