//! Account profile model.

use serde::{Deserialize, Serialize};

/// Category assigned when the backend reports neither a role nor a category.
pub const DEFAULT_CATEGORY: &str = "Customer";

/// Canonical profile of the signed-in account.
///
/// Every field is a plain string; fields the backend did not supply are
/// empty rather than absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub username: String,
    pub email: String,
    pub company_name: String,
    pub contact_person: String,
    pub phone: String,
    pub category: String,
}

impl UserProfile {
    /// A profile that only knows the username, as seeded right after login.
    #[must_use]
    pub fn for_username(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Self::default()
        }
    }

    /// Whether no field carries a value.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        [
            &self.username,
            &self.email,
            &self.company_name,
            &self.contact_person,
            &self.phone,
            &self.category,
        ]
        .iter()
        .all(|f| f.is_empty())
    }
}
