//! Session commands: login, register, password change, logout, whoami.

use std::io::Write;

use secrecy::SecretString;
use tokio::task::JoinHandle;

use techhub_core::UserProfile;
use techhub_storefront::services::auth::{Registration, RegistrationForm};
use techhub_storefront::session::SessionState;
use techhub_storefront::state::Storefront;

use super::CliError;

pub async fn login(
    shop: &Storefront,
    out: &mut impl Write,
    username: &str,
    password: &SecretString,
) -> Result<(), CliError> {
    let profile = shop.account().login(username, password).await?;
    writeln!(out, "Logged in as {}", profile.username)?;
    Ok(())
}

pub async fn register(
    shop: &Storefront,
    out: &mut impl Write,
    form: RegistrationForm,
) -> Result<(), CliError> {
    match shop.account().register(form).await? {
        Registration::SignedIn(profile) => {
            writeln!(out, "Account created. Logged in as {}", profile.username)?;
        }
        Registration::LoginRequired { message } => {
            let message = message.unwrap_or_else(|| "Account created.".to_string());
            writeln!(out, "{message} Please log in.")?;
        }
    }
    Ok(())
}

pub async fn forgot_password(
    shop: &Storefront,
    out: &mut impl Write,
    username: &str,
    current_password: &SecretString,
    new_password: &SecretString,
) -> Result<(), CliError> {
    let message = shop
        .account()
        .forgot_password(username, current_password, new_password)
        .await?;
    writeln!(out, "{message}")?;
    Ok(())
}

pub async fn logout(shop: &Storefront, out: &mut impl Write) -> Result<(), CliError> {
    shop.logout().await?;
    writeln!(out, "Logged out")?;
    Ok(())
}

/// Waits for the bootstrap identity check so the state shown is settled.
pub async fn whoami(
    shop: &Storefront,
    out: &mut impl Write,
    verify: JoinHandle<Option<UserProfile>>,
) -> Result<(), CliError> {
    if let Err(e) = verify.await {
        tracing::warn!(error = %e, "Identity check did not finish");
    }

    let state = shop.session().state().await;
    if !state.is_authenticated() {
        writeln!(out, "Not logged in")?;
        return Ok(());
    }

    let label = match state {
        SessionState::Verified => "verified",
        _ => "not verified",
    };
    writeln!(out, "Session: {label}")?;
    super::profile::render(out, &shop.profile().profile().await)?;
    Ok(())
}
