//! Unified error handling with Sentry breadcrumbs.
//!
//! Provides a unified `AppError` type for every user-facing operation. The
//! presentation layer shows [`AppError::user_message`]; the `Display` output
//! is meant for logs.

use thiserror::Error;

use crate::backend::BackendError;
use crate::session::SessionError;

/// Generic message shown for transport failures.
pub const NETWORK_ERROR_MESSAGE: &str = "Network error. Please try again.";

/// Message shown when a read stays rate limited after its retry.
pub const RATE_LIMITED_MESSAGE: &str = "Too many requests. Please wait a moment...";

/// Client-side validation failures, caught before any network call.
///
/// The `Display` text is the exact message shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please fill in all fields")]
    MissingFields,
    #[error("Please enter a valid email")]
    InvalidEmail,
    #[error("Password must be at least 6 characters")]
    PasswordTooShort,
    #[error("New password must be at least 6 characters")]
    NewPasswordTooShort,
    #[error("Please enter a valid phone number")]
    InvalidPhone,
    #[error("Your cart is empty")]
    EmptyCart,
    #[error("Page numbers start at 1")]
    InvalidPage,
}

/// Application-level error type for the storefront client.
#[derive(Debug, Error)]
pub enum AppError {
    /// No session token is available.
    #[error("Unauthenticated: no session token")]
    Unauthenticated,

    /// Input failed a client-side check.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Still rate limited after the single retry.
    #[error("Rate limited")]
    RateLimited,

    /// The backend answered with a non-success status.
    #[error("Remote rejected ({status}): {message}")]
    RemoteRejected {
        /// HTTP status code.
        status: u16,
        /// Backend message, or a per-operation fallback.
        message: String,
    },

    /// Transport failure or unreadable response.
    #[error("Network error: {0}")]
    Network(String),

    /// A read failed; the user only sees the operation's generic message.
    #[error("{message}: {detail}")]
    Unavailable {
        message: &'static str,
        /// Underlying failure, for logs.
        detail: String,
    },

    /// The persisted session could not be read or written.
    #[error("Session storage error: {0}")]
    Session(#[from] SessionError),
}

impl AppError {
    /// The text to show the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthenticated => "Please log in to continue.".to_string(),
            Self::Validation(err) => err.to_string(),
            Self::RateLimited => RATE_LIMITED_MESSAGE.to_string(),
            Self::RemoteRejected { message, .. } => message.clone(),
            Self::Network(_) => NETWORK_ERROR_MESSAGE.to_string(),
            Self::Unavailable { message, .. } => (*message).to_string(),
            Self::Session(_) => "Could not access the saved session.".to_string(),
        }
    }

    /// Build from a backend failure, using `fallback` when the backend gave
    /// no message of its own.
    #[must_use]
    pub fn from_backend(err: BackendError, fallback: &str) -> Self {
        match err {
            BackendError::Network(detail) | BackendError::Parse(detail) => Self::Network(detail),
            BackendError::RateLimited { .. } => Self::RateLimited,
            BackendError::Rejected { status, message } => Self::RemoteRejected {
                status,
                message: message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| fallback.to_string()),
            },
        }
    }
}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        Self::from_backend(err, "Request failed")
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error. Without an initialized Sentry client this is a no-op.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added item", Some(&[("product_id", "p1")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
