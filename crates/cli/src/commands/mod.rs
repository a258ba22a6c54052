//! Command handlers. Each renders to the writer it is given.

pub mod account;
pub mod profile;
pub mod shop;

use std::io::{self, BufRead, Write};

use thiserror::Error;

use techhub_storefront::backend::BackendError;
use techhub_storefront::config::ConfigError;
use techhub_storefront::error::AppError;
use techhub_storefront::session::SessionError;

/// Errors that end a command.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Could not start the HTTP client: {0}")]
    Client(#[from] BackendError),

    #[error(transparent)]
    App(#[from] AppError),

    /// Writing output or reading a prompt answer failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The request makes no sense for the current cart or catalog.
    #[error("{0}")]
    Usage(String),
}

impl From<SessionError> for CliError {
    fn from(err: SessionError) -> Self {
        Self::App(AppError::Session(err))
    }
}

impl CliError {
    /// The text to print for the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::App(err) => err.user_message(),
            other => other.to_string(),
        }
    }
}

/// Ask a yes/no question on the terminal. Anything but `y`/`yes` is a no.
pub fn ask(out: &mut impl Write, prompt: &str) -> bool {
    if write!(out, "{prompt} [y/N] ").and_then(|()| out.flush()).is_err() {
        return false;
    }

    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    is_yes(&answer)
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
