//! Profile commands.

use std::io::{self, Write};

use techhub_core::UserProfile;
use techhub_storefront::services::profile::ProfileFields;
use techhub_storefront::state::Storefront;

use super::CliError;

/// Field overrides from the command line.
#[derive(Debug, Default)]
pub struct Changes {
    pub company_name: Option<String>,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
}

impl Changes {
    fn apply(self, mut fields: ProfileFields) -> ProfileFields {
        if let Some(company_name) = self.company_name {
            fields.company_name = company_name;
        }
        if let Some(contact_person) = self.contact_person {
            fields.contact_person = contact_person;
        }
        if let Some(phone) = self.phone {
            fields.phone = phone;
        }
        fields
    }
}

pub async fn show(shop: &Storefront, out: &mut impl Write) -> Result<(), CliError> {
    let profile = shop.profile().fetch_profile().await?;
    render(out, &profile)?;
    Ok(())
}

pub async fn update(
    shop: &Storefront,
    out: &mut impl Write,
    changes: Changes,
) -> Result<(), CliError> {
    let profiles = shop.profile();
    let current = profiles.fetch_profile().await?;

    profiles.begin_edit().await;
    let fields = changes.apply(ProfileFields::from(&current));
    let result = profiles.update_profile(fields).await;
    if result.is_err() {
        profiles.cancel_edit().await;
    }

    let updated = result?;
    writeln!(out, "Profile updated successfully!")?;
    render(out, &updated)?;
    Ok(())
}

pub fn render(out: &mut impl Write, profile: &UserProfile) -> io::Result<()> {
    let rows = [
        ("Username", &profile.username),
        ("Email", &profile.email),
        ("Company", &profile.company_name),
        ("Contact", &profile.contact_person),
        ("Phone", &profile.phone),
        ("Category", &profile.category),
    ];
    for (label, value) in rows {
        let value = if value.is_empty() { "-" } else { value.as_str() };
        writeln!(out, "{label:<10} {value}")?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_changes_override_only_given_fields() {
        let current = ProfileFields {
            company_name: "Acme".to_string(),
            contact_person: "Jane".to_string(),
            email: "jane@acme.com".to_string(),
            phone: "5551234567".to_string(),
        };
        let changes = Changes {
            phone: Some("555-987-6543".to_string()),
            ..Changes::default()
        };

        let fields = changes.apply(current.clone());
        assert_eq!(fields.phone, "555-987-6543");
        assert_eq!(fields.company_name, current.company_name);
        assert_eq!(fields.email, current.email);
    }

    #[test]
    fn test_render_marks_missing_fields() {
        let mut out = Vec::new();
        render(&mut out, &UserProfile::for_username("jane")).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Username   jane\n"));
        assert!(text.contains("Email      -\n"));
    }
}
